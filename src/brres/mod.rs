//! BRRES/G3D: the Wii multi-resource archive. [`archive`] owns the
//! top-level header, root/folder dictionaries, and fixed folder order;
//! [`model`] and [`texture`] hold the per-resource bodies; [`anim`] holds
//! the five keyframe-driven animation streams, all built on the shared
//! [`keyframe`] track representation.

pub mod anim;
pub mod archive;
pub mod keyframe;
pub mod model;
pub mod texture;

pub use archive::{read, write, Archive};
