//! The in-memory J3D scene model: joints, envelopes, shapes, and the
//! top-level aggregate tying every section's decoded output together.

use crate::dl_codec::{MatrixPrimitive, VertexDescriptor};
use crate::j3d::material::Material;
use crate::math::{Aabb, Srt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillboardKind {
    #[default]
    None,
    BillboardXY,
    BillboardY,
    RotateYXY,
    RotateYY,
}

impl BillboardKind {
    pub fn from_u16(v: u16) -> Self {
        match v {
            1 => Self::BillboardXY,
            2 => Self::BillboardY,
            3 => Self::RotateYXY,
            4 => Self::RotateYY,
            _ => Self::None,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::None => 0,
            Self::BillboardXY => 1,
            Self::BillboardY => 2,
            Self::RotateYXY => 3,
            Self::RotateYY => 4,
        }
    }
}

/// One entry of a joint's display list: a (material, shape) pair attached
/// by the scene-graph bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Display {
    pub material: u16,
    pub shape: u16,
}

#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub srt: Srt,
    pub bounding_sphere_radius: f32,
    pub aabb: Aabb,
    pub billboard: BillboardKind,
    /// Segment-scale-compensate: disables parent scale inheritance.
    pub ssc: bool,
    pub parent: Option<u32>,
    pub children: Vec<u32>,
    pub displays: Vec<Display>,
}

impl Joint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            srt: Srt::default(),
            bounding_sphere_radius: 0.0,
            aabb: Aabb::default(),
            billboard: BillboardKind::None,
            ssc: false,
            parent: None,
            children: Vec::new(),
            displays: Vec::new(),
        }
    }
}

/// A single bone/weight pair of an [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneWeight {
    pub joint: u16,
    pub weight: f32,
}

/// One DRW1 entry: either a rigid bind to a single joint, or a blended
/// envelope referencing a weighted set of joints.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawMatrix {
    SingleBind(u16),
    Envelope(Envelope),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub weights: Vec<BoneWeight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonMode {
    #[default]
    Normal,
    BillboardXY,
    BillboardY,
    Skinned,
}

#[derive(Debug, Clone)]
pub struct Polygon {
    pub id: u16,
    pub bounding_sphere_radius: f32,
    pub aabb: Aabb,
    pub visible: bool,
    pub mode: PolygonMode,
    pub descriptor: VertexDescriptor,
    pub matrix_primitives: Vec<MatrixPrimitive>,
}

impl Polygon {
    pub fn new(id: u16) -> Self {
        Self {
            id,
            bounding_sphere_radius: 0.0,
            aabb: Aabb::default(),
            visible: true,
            mode: PolygonMode::Normal,
            descriptor: VertexDescriptor::new(),
            matrix_primitives: Vec::new(),
        }
    }
}

/// Raw per-attribute vertex buffers, quantized on read exactly as VTX1
/// stores them; decoding to `f32`/`Vec3` is left to the caller since J3D
/// keeps component count and quantization per-buffer rather than forcing a
/// single in-memory representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    U8,
    I8,
    U16,
    I16,
    F32,
}

impl ComponentType {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::U8),
            1 => Some(Self::I8),
            2 => Some(Self::U16),
            3 => Some(Self::I16),
            4 => Some(Self::F32),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::U8 => 0,
            Self::I8 => 1,
            Self::U16 => 2,
            Self::I16 => 3,
            Self::F32 => 4,
        }
    }

    pub fn byte_size(self) -> u32 {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::F32 => 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VertexBuffer {
    pub component_count: u32,
    pub component_type: ComponentType,
    /// Power-of-two divisor shift applied to fixed-point components;
    /// meaningless (and stored as 0) for `F32` buffers.
    pub quantization_shift: u8,
    pub stride: u8,
    pub raw: Vec<u8>,
}

/// The fully assembled J3D scene graph: every section's decoded content in
/// one place, indexed by the bone-tree arena built from INF1.
#[derive(Debug, Clone, Default)]
pub struct J3dModel {
    pub name: String,
    pub joints: Vec<Joint>,
    pub draw_matrices: Vec<DrawMatrix>,
    pub materials: Vec<Material>,
    pub shapes: Vec<Polygon>,
    pub textures: Vec<crate::j3d::texture::Texture>,
    /// The shared vertex buffers shapes' display lists index into.
    pub vertex_buffers: crate::j3d::sections::vtx1::Vtx1,
    pub is_bdl: bool,
}

impl J3dModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn root_joint(&self) -> Option<u32> {
        self.joints
            .iter()
            .position(|j| j.parent.is_none())
            .map(|i| i as u32)
    }
}
