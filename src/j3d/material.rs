//! The J3D material: every field MAT3 stores, grouped the way the 26-pool
//! compression cache (see [`super::sections::mat3_pools`]) keys on them.
//!
//! In memory a [`Material`] owns real values, not pool indices — the
//! indirection only exists on the wire. The MAT3 writer deduplicates values
//! into pools and emits indices; the reader dereferences pool entries back
//! into these fields.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    None,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelControl {
    pub enabled: bool,
    pub material_source: u8,
    pub lit_mask: u8,
    pub ambient_source: u8,
    pub diffuse_fn: u8,
    pub attenuation_fn: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexGen {
    pub kind: u8,
    pub source: u8,
    pub matrix: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexMatrix {
    pub projection: u8,
    pub kind: u8,
    pub center: [f32; 2],
    pub scale: [f32; 2],
    pub rotate: f32,
    pub translate: [f32; 2],
    pub effect_matrix: [f32; 16],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TevOrder {
    pub tex_coord: u8,
    pub tex_map: u8,
    pub color_chan: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TevStage {
    pub color_a: u8,
    pub color_b: u8,
    pub color_c: u8,
    pub color_d: u8,
    pub color_op: u8,
    pub color_bias: u8,
    pub color_scale: u8,
    pub color_clamp: bool,
    pub color_out_reg: u8,
    pub alpha_a: u8,
    pub alpha_b: u8,
    pub alpha_c: u8,
    pub alpha_d: u8,
    pub alpha_op: u8,
    pub alpha_bias: u8,
    pub alpha_scale: u8,
    pub alpha_clamp: bool,
    pub alpha_out_reg: u8,
    pub konst_color_sel: u8,
    pub konst_alpha_sel: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapTable {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Fog {
    pub kind: u8,
    pub enabled: bool,
    pub center: u16,
    pub start_z: f32,
    pub end_z: f32,
    pub near_z: f32,
    pub far_z: f32,
    pub color: [u8; 4],
    pub range_adjust_table: [u16; 10],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlphaCompare {
    pub comp0: u8,
    pub ref0: u8,
    pub op: u8,
    pub comp1: u8,
    pub ref1: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlendMode {
    pub kind: u8,
    pub src_factor: u8,
    pub dst_factor: u8,
    pub logic_op: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZMode {
    pub compare_enable: bool,
    pub func: u8,
    pub update_enable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NbtScale {
    pub enable: bool,
    pub scale: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndTexOrder {
    pub tex_coord: u8,
    pub tex_map: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndTexStage {
    pub order: IndTexOrder,
    pub scale_s: u8,
    pub scale_t: u8,
    pub format: u8,
    pub bias_sel: u8,
    pub matrix_sel: u8,
    pub wrap_s: u8,
    pub wrap_t: u8,
    pub add_prev: bool,
    pub utc_lod: bool,
    pub alpha_sel: u8,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndirectBlock {
    pub stages: Vec<IndTexStage>,
}

/// A fully-dereferenced J3D material. `stack_trash` preserves the 24 bytes
/// of uninitialized-memory padding the original tool emits per material;
/// round-tripped files must keep them byte-identical, synthesized ones may
/// zero them (see the design notes on preserving known quirks byte-exact).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub name: String,
    pub flag: u8,
    pub cull_mode: CullMode,
    pub early_z_compare: bool,
    pub z_mode: ZMode,
    pub dither: bool,
    pub color_channels: Vec<ChannelControl>,
    pub ambient_colors: Vec<[u8; 4]>,
    pub material_colors: Vec<[u8; 4]>,
    pub light_colors: Vec<[u8; 4]>,
    pub tex_gens: Vec<TexGen>,
    pub tex_matrices: Vec<TexMatrix>,
    pub post_tex_matrices: Vec<TexMatrix>,
    /// Indices into the model's texture table; `None` for an unused slot.
    pub samplers: Vec<Option<u16>>,
    pub tev_konst_colors: Vec<[u8; 4]>,
    pub tev_konst_selectors: Vec<u8>,
    pub tev_register_colors: Vec<[i16; 4]>,
    pub tev_orders: Vec<TevOrder>,
    pub tev_stages: Vec<TevStage>,
    pub swap_tables: Vec<SwapTable>,
    pub tev_swap_selectors: Vec<u8>,
    pub indirect: Option<IndirectBlock>,
    pub fog: Fog,
    pub alpha_compare: AlphaCompare,
    pub blend_mode: BlendMode,
    pub nbt_scale: NbtScale,
    pub stack_trash: [u8; 24],
}
