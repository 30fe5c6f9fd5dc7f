//! MAT3's 26-pool compression cache. Each material field group is stored
//! once per *distinct value* across the whole material table; a material
//! only carries a `u16` index into the matching pool. Two byte-identical
//! materials therefore collapse to a single set of pool entries, the same
//! `CompressableVector::append` (linear find-or-insert) deduplication the
//! original tool's material writer uses.

use crate::j3d::material::{
    AlphaCompare, BlendMode, ChannelControl, CullMode, Fog, IndTexOrder, IndTexStage, Material,
    NbtScale, SwapTable, TevOrder, TevStage, TexGen, TexMatrix, ZMode,
};

/// A single deduplicating pool: `intern` returns the index of an existing
/// equal entry, appending a new one only when none matches.
#[derive(Debug, Clone, Default)]
pub struct Pool<T> {
    items: Vec<T>,
}

impl<T: PartialEq + Clone> Pool<T> {
    pub fn intern(&mut self, value: T) -> u16 {
        if let Some(pos) = self.items.iter().position(|existing| *existing == value) {
            pos as u16
        } else {
            self.items.push(value);
            (self.items.len() - 1) as u16
        }
    }

    pub fn get(&self, idx: u16) -> Option<&T> {
        self.items.get(idx as usize)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// One material's worth of indices into every pool, in declaration order
/// of [`Mat3Pools`].
#[derive(Debug, Clone, Default)]
pub struct MaterialIndices {
    pub flag: u16,
    pub cull_mode: u16,
    pub z_mode: u16,
    pub early_z_compare: u16,
    pub dither: u16,
    pub color_channels: Vec<u16>,
    pub ambient_colors: Vec<u16>,
    pub material_colors: Vec<u16>,
    pub light_colors: Vec<u16>,
    pub tex_gens: Vec<u16>,
    pub tex_matrices: Vec<u16>,
    pub post_tex_matrices: Vec<u16>,
    pub samplers: Vec<u16>,
    pub tev_konst_colors: Vec<u16>,
    pub tev_konst_selectors: Vec<u16>,
    pub tev_register_colors: Vec<u16>,
    pub tev_orders: Vec<u16>,
    pub tev_stages: Vec<u16>,
    pub swap_tables: Vec<u16>,
    pub tev_swap_selectors: Vec<u16>,
    pub ind_tex_orders: Vec<u16>,
    pub ind_tex_stages: Vec<u16>,
    pub fog: u16,
    pub alpha_compare: u16,
    pub blend_mode: u16,
    pub nbt_scale: u16,
}

/// The 26 parallel pools MAT3 stores: every compressible field group a
/// [`Material`] carries, one pool per group.
#[derive(Debug, Clone, Default)]
pub struct Mat3Pools {
    pub flags: Pool<u8>,
    pub cull_modes: Pool<CullMode>,
    pub z_modes: Pool<ZMode>,
    pub early_z_compares: Pool<bool>,
    pub dithers: Pool<bool>,
    pub color_channels: Pool<ChannelControl>,
    pub ambient_colors: Pool<[u8; 4]>,
    pub material_colors: Pool<[u8; 4]>,
    pub light_colors: Pool<[u8; 4]>,
    pub tex_gens: Pool<TexGen>,
    pub tex_matrices: Pool<TexMatrix>,
    pub post_tex_matrices: Pool<TexMatrix>,
    pub samplers: Pool<Option<u16>>,
    pub tev_konst_colors: Pool<[u8; 4]>,
    pub tev_konst_selectors: Pool<u8>,
    pub tev_register_colors: Pool<[i16; 4]>,
    pub tev_orders: Pool<TevOrder>,
    pub tev_stages: Pool<TevStage>,
    pub swap_tables: Pool<SwapTable>,
    pub tev_swap_selectors: Pool<u8>,
    pub ind_tex_orders: Pool<IndTexOrder>,
    pub ind_tex_stages: Pool<IndTexStage>,
    pub fogs: Pool<Fog>,
    pub alpha_compares: Pool<AlphaCompare>,
    pub blend_modes: Pool<BlendMode>,
    pub nbt_scales: Pool<NbtScale>,
}

impl Mat3Pools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dedup `material`'s fields into every pool, returning the indices
    /// this material will be written with.
    pub fn intern(&mut self, material: &Material) -> MaterialIndices {
        MaterialIndices {
            flag: self.flags.intern(material.flag),
            cull_mode: self.cull_modes.intern(material.cull_mode),
            z_mode: self.z_modes.intern(material.z_mode),
            early_z_compare: self.early_z_compares.intern(material.early_z_compare),
            dither: self.dithers.intern(material.dither),
            color_channels: material.color_channels.iter().map(|v| self.color_channels.intern(*v)).collect(),
            ambient_colors: material.ambient_colors.iter().map(|v| self.ambient_colors.intern(*v)).collect(),
            material_colors: material.material_colors.iter().map(|v| self.material_colors.intern(*v)).collect(),
            light_colors: material.light_colors.iter().map(|v| self.light_colors.intern(*v)).collect(),
            tex_gens: material.tex_gens.iter().map(|v| self.tex_gens.intern(*v)).collect(),
            tex_matrices: material.tex_matrices.iter().map(|v| self.tex_matrices.intern(*v)).collect(),
            post_tex_matrices: material.post_tex_matrices.iter().map(|v| self.post_tex_matrices.intern(*v)).collect(),
            samplers: material.samplers.iter().map(|v| self.samplers.intern(*v)).collect(),
            tev_konst_colors: material.tev_konst_colors.iter().map(|v| self.tev_konst_colors.intern(*v)).collect(),
            tev_konst_selectors: material.tev_konst_selectors.iter().map(|v| self.tev_konst_selectors.intern(*v)).collect(),
            tev_register_colors: material.tev_register_colors.iter().map(|v| self.tev_register_colors.intern(*v)).collect(),
            tev_orders: material.tev_orders.iter().map(|v| self.tev_orders.intern(*v)).collect(),
            tev_stages: material.tev_stages.iter().map(|v| self.tev_stages.intern(*v)).collect(),
            swap_tables: material.swap_tables.iter().map(|v| self.swap_tables.intern(*v)).collect(),
            tev_swap_selectors: material.tev_swap_selectors.iter().map(|v| self.tev_swap_selectors.intern(*v)).collect(),
            ind_tex_orders: material
                .indirect
                .iter()
                .flat_map(|ind| ind.stages.iter().map(|s| s.order))
                .map(|v| self.ind_tex_orders.intern(v))
                .collect(),
            ind_tex_stages: material
                .indirect
                .iter()
                .flat_map(|ind| ind.stages.iter().cloned())
                .map(|v| self.ind_tex_stages.intern(v))
                .collect(),
            fog: self.fogs.intern(material.fog),
            alpha_compare: self.alpha_compares.intern(material.alpha_compare),
            blend_mode: self.blend_modes.intern(material.blend_mode),
            nbt_scale: self.nbt_scales.intern(material.nbt_scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_values_collapse_to_one_entry() {
        let mut pool: Pool<u8> = Pool::default();
        let a = pool.intern(7);
        let b = pool.intern(7);
        let c = pool.intern(9);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.items().len(), 2);
    }

    #[test]
    fn two_identical_materials_share_every_pool_entry() {
        let mut pools = Mat3Pools::new();
        let mat = Material { name: "a".into(), ..Default::default() };
        let mat2 = Material { name: "b".into(), ..Default::default() };
        let ia = pools.intern(&mat);
        let ib = pools.intern(&mat2);
        assert_eq!(ia.flag, ib.flag);
        assert_eq!(ia.cull_mode, ib.cull_mode);
        assert_eq!(pools.cull_modes.items().len(), 1);
    }
}
