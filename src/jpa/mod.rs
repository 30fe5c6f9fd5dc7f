//! The particle-resource codec: a container holding any number of
//! particle effects (`BEM1` dynamics, shape and field blocks, `KFA1`
//! key-frame curves) plus the texture table they share.
//!
//! Unlike [`crate::j3d`] and [`crate::brres`], a JPA archive carries no
//! scene graph of its own — every resource is addressed by index, not by
//! name, so there is no dictionary or name pool here.

pub mod container;
pub mod dynamics;
pub mod field;
pub mod keyframe;
pub mod shape;
pub mod texture;

pub use container::{read, write, Archive, ContainerFormat, Resource};
pub use dynamics::DynamicsBlock;
pub use field::FieldBlock;
pub use keyframe::KeyBlock;
pub use shape::RawBlock;
pub use texture::TextureBlock;
