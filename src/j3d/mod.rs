//! J3D (BMD/BDL): the GameCube/Wii static-model container. [`bmd`] owns the
//! top-level file framing and fixed section read order; [`sections`] holds
//! one codec per chunk magic; [`model`] is the in-memory scene assembled
//! from them.

pub mod bmd;
pub mod material;
pub mod model;
pub mod name_table;
pub mod scenegraph;
pub mod sections;
pub mod texture;

pub use bmd::{read, write};
pub use model::J3dModel;
