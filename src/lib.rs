//! **nw4rkit** - a reusable Rust library for the binary container formats
//! Nintendo's GameCube/Wii "J3D"/"G3D" toolchains used for 3D models,
//! textures, and particle effects.
//!
//! # Layers
//! | Module | Purpose |
//! |--------|---------|
//! | [`stream`]      | Endian-aware bounded reader/writer, breakpoints |
//! | [`safe_reader`]  | Offset-aware, `Result`-returning read facade |
//! | [`link_graph`]   | Deferred-write node tree / symbol linker |
//! | [`name_pool`]    | Write-time name dedup + relative-offset patching |
//! | [`brres_dict`]   | BRRES balanced binary-tree directory |
//! | [`endian`]       | Endian selection and raw pack/unpack |
//! | [`diagnostics`]  | Pluggable warning/trace sink |
//!
//! # Formats
//! | Module | Format |
//! |--------|--------|
//! | [`j3d`]   | J3D - BMD/BDL 3D model container |
//! | [`brres`] | G3D - BRRES 3D asset archive |
//! | [`jpa`]   | JPA - particle effect resource |

pub mod brres;
pub mod brres_dict;
pub mod diagnostics;
pub mod dl_codec;
pub mod endian;
pub mod error;
pub mod j3d;
pub mod jpa;
pub mod link_graph;
pub mod math;
pub mod name_pool;
pub mod safe_reader;
pub mod stream;

pub use error::{Error, Result};
