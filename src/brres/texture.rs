//! BRRES `TEX0`: one mipmapped GX image. Shares [`ImageFormat`] with J3D's
//! TEX1 since both containers use the same GX texel formats; BRRES stores
//! one texture per named dictionary entry rather than J3D's shared table,
//! so there is no sampler/wrap state here — that lives on the material
//! that references this texture by name.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::j3d::texture::ImageFormat;
use crate::name_pool::NamePool;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

const MAGIC: &[u8; 4] = b"TEX0";

#[derive(Debug, Clone)]
pub struct Texture0 {
    pub name: String,
    pub format: ImageFormat,
    pub width: u16,
    pub height: u16,
    pub mipmap_count: u32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub data: Vec<u8>,
}

impl Texture0 {
    /// Writes the header and image payload at the writer's current
    /// position, reserving the name pointer in `names` so the caller can
    /// resolve it once the archive's shared name pool is laid out — the
    /// same pattern [`super::archive`] uses for every dictionary entry.
    pub fn write(&self, writer: &mut Writer, names: &mut NamePool) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(MAGIC);
        writer.write::<u32>(0, Endian::Current); // size placeholder
        writer.write::<u32>(1, Endian::Current); // revision
        writer.write::<i32>(0, Endian::Current); // ofs_parent_dict, unused on write

        let name_field = writer.tell();
        writer.write::<u32>(0, Endian::Current); // name pointer placeholder
        names.reserve(self.name.clone(), start, name_field);
        writer.write::<u32>(self.format.as_u8() as u32, Endian::Current);
        writer.write::<u16>(self.width, Endian::Current);
        writer.write::<u16>(self.height, Endian::Current);
        writer.write::<u32>(self.mipmap_count, Endian::Current);
        writer.write::<f32>(self.min_lod, Endian::Current);
        writer.write::<f32>(self.max_lod, Endian::Current);

        writer.write_bytes(&self.data);

        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        let start = r.tell();
        r.magic(MAGIC)?;
        let _size = r.u32()?;
        let _revision = r.u32()?;
        r.i32()?;
        let name = r.string_ofs32(start)?;
        let format_raw = r.u32()? as u8;
        let format = ImageFormat::from_u8(format_raw).ok_or_else(|| Error::DecodeError("TEX0: unknown image format".into()))?;
        let width = r.u16()?;
        let height = r.u16()?;
        let mipmap_count = r.u32()?;
        let min_lod = r.f32()?;
        let max_lod = r.f32()?;
        let remaining = (r.end_pos() as usize).saturating_sub(r.tell() as usize);
        let data = r.reader_mut().read_bytes(remaining)?;
        Ok(Self {
            name,
            format,
            width,
            height,
            mipmap_count,
            min_lod,
            max_lod,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_header_fields() {
        let tex = Texture0 {
            name: "metal_01".into(),
            format: ImageFormat::CMPR,
            width: 64,
            height: 64,
            mipmap_count: 1,
            min_lod: 0.0,
            max_lod: 0.0,
            data: vec![0u8; 2048],
        };

        let mut writer = Writer::new();
        let mut names = NamePool::new();
        tex.write(&mut writer, &mut names).unwrap();
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = Texture0::read(&mut safe).unwrap();
        assert_eq!(back.format, ImageFormat::CMPR);
        assert_eq!(back.width, 64);
        assert_eq!(back.height, 64);
    }
}
