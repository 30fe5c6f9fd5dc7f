//! BRRES `MDL0`: the G3D model body. NW4R's MDL0 and J3D's BMD describe the
//! same geometry (bones, vertex buffers, materials, polygons) in slightly
//! different outer framing, so this reuses the J3D section codecs verbatim
//! as MDL0's sub-chunks rather than re-deriving bone/material/polygon I/O —
//! the only new framing is MDL0's own header and fixed sub-chunk order
//! (bones, hierarchy, vertex buffers, materials, polygons).

use crate::diagnostics::Diagnostics;
use crate::dl_codec::NativeDisplayListDecoder;
use crate::endian::Endian;
use crate::error::Result;
use crate::j3d::material::Material;
use crate::j3d::model::{J3dModel, Joint, Polygon};
use crate::j3d::scenegraph;
use crate::j3d::sections::{jnt1, mat3, shp1, vtx1::Vtx1};
use crate::name_pool::NamePool;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

const MAGIC: &[u8; 4] = b"MDL0";

#[derive(Debug, Clone, Default)]
pub struct Mdl0 {
    pub name: String,
    pub joints: Vec<Joint>,
    pub vertex_buffers: Vtx1,
    pub materials: Vec<Material>,
    pub shapes: Vec<Polygon>,
}

impl Mdl0 {
    pub fn from_model(model: &J3dModel) -> Self {
        Self {
            name: model.name.clone(),
            joints: model.joints.clone(),
            vertex_buffers: Vtx1::default(),
            materials: model.materials.clone(),
            shapes: model.shapes.clone(),
        }
    }

    pub fn write(&self, writer: &mut Writer, names: &mut NamePool) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(MAGIC);
        writer.write::<u32>(0, Endian::Current); // size placeholder
        writer.write::<u32>(11, Endian::Current); // revision, matches modern MDL0 tooling
        writer.write::<i32>(0, Endian::Current); // ofs_parent_dict, unused on write

        let name_field = writer.tell();
        writer.write::<u32>(0, Endian::Current);
        names.reserve(self.name.clone(), start, name_field);

        jnt1::write(writer, &self.joints)?;
        writer.align_to(32);

        if let Some(root) = self.joints.iter().position(|j| j.parent.is_none()) {
            let hierarchy_start = writer.tell();
            scenegraph::write(writer, &self.joints, root as u32)?;
            let _ = hierarchy_start;
        }
        writer.align_to(32);

        self.vertex_buffers.write(writer)?;
        writer.align_to(32);

        mat3::write(writer, &self.materials)?;
        writer.align_to(32);

        shp1::write(writer, &self.shapes)?;

        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    /// Reads a sub-chunk at `r`'s current position, then forces the cursor
    /// to the aligned end of the chunk as declared by its own size field —
    /// J3D section codecs seek around internally (name tables, buffers)
    /// and don't reliably leave the cursor at the chunk boundary.
    fn read_chunk<D: Diagnostics, T>(r: &mut SafeReader<'_, D>, read: impl FnOnce(&mut SafeReader<'_, D>) -> Result<T>) -> Result<T> {
        let chunk_start = r.tell();
        let size = r.reader_mut().peek_at::<u32>(chunk_start + 4, Endian::Current, false)?;
        let value = read(r)?;
        r.seek_set((chunk_start + size + 31) & !31);
        Ok(value)
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        let start = r.tell();
        r.magic(MAGIC)?;
        let _size = r.u32()?;
        let _revision = r.u32()?;
        r.i32()?;
        let name = r.string_ofs32(start)?;

        let mut joints = Self::read_chunk(r, jnt1::read)?;
        scenegraph::read(r, &mut joints)?;
        r.seek_set((r.tell() + 31) & !31);

        let vertex_buffers = Self::read_chunk(r, Vtx1::read)?;
        let materials = Self::read_chunk(r, mat3::read)?;
        let shapes = Self::read_chunk(r, |r| shp1::read(r, &NativeDisplayListDecoder))?;

        Ok(Self {
            name,
            joints,
            vertex_buffers,
            materials,
            shapes,
        })
    }
}
