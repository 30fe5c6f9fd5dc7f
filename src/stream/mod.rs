//! Endian-aware bounded byte stream layer: [`Reader`] and [`Writer`].

mod breakpoints;
mod reader;
mod writer;

pub use breakpoints::{BreakpointSet, ByteRange};
pub use reader::{Reader, ScopedRegion};
pub use writer::{LinkReservation, PadFiller, Writer};
