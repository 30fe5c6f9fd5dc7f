//! `TEX1`: one shared texture referenced by index from `BSP1`/`SSP1`. Every
//! particle resource in an archive points into the same texture table, so
//! this block (like [`crate::brres::texture::Texture0`]) carries only the
//! GX image itself — no sampler/wrap state, which lives on whichever shape
//! block references the texture by index.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::j3d::texture::ImageFormat;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

pub const MAGIC: &[u8; 4] = b"TEX1";
const NAME_FIELD_SIZE: usize = 0x14;
const HEADER_SIZE: u32 = 4 + NAME_FIELD_SIZE as u32 + 1 + 2 + 2 + 1 + 4 + 4;

#[derive(Debug, Clone, PartialEq)]
pub struct TextureBlock {
    pub name: String,
    pub format: ImageFormat,
    pub width: u16,
    pub height: u16,
    pub mipmap_count: u8,
    pub min_lod: f32,
    pub max_lod: f32,
    pub data: Vec<u8>,
}

impl TextureBlock {
    pub fn write(&self, writer: &mut Writer) {
        let start = writer.tell();
        writer.write_bytes(MAGIC);
        writer.write::<u32>(0, Endian::Current); // size placeholder
        writer.write::<u32>(0, Endian::Current); // reserved

        let mut name_bytes = [0u8; NAME_FIELD_SIZE];
        let src = self.name.as_bytes();
        let copy_len = src.len().min(NAME_FIELD_SIZE - 1);
        name_bytes[..copy_len].copy_from_slice(&src[..copy_len]);
        writer.write_bytes(&name_bytes);

        writer.write::<u8>(self.format.as_u8(), Endian::Current);
        writer.write::<u16>(self.width, Endian::Current);
        writer.write::<u16>(self.height, Endian::Current);
        writer.write::<u8>(self.mipmap_count, Endian::Current);
        writer.write::<f32>(self.min_lod, Endian::Current);
        writer.write::<f32>(self.max_lod, Endian::Current);
        writer.write_bytes(&self.data);

        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        let start = r.tell();
        r.magic(MAGIC)?;
        let size = r.u32()?;
        r.u32()?;

        let name_bytes = r.reader_mut().read_bytes(NAME_FIELD_SIZE)?;
        let nul = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
        let name = String::from_utf8_lossy(&name_bytes[..nul]).into_owned();

        let format_raw = r.u8()?;
        let format = ImageFormat::from_u8(format_raw).ok_or_else(|| Error::DecodeError(format!("JPA TEX1: unknown image format {format_raw}")))?;
        let width = r.u16()?;
        let height = r.u16()?;
        let mipmap_count = r.u8()?;
        let min_lod = r.f32()?;
        let max_lod = r.f32()?;

        let data_len = (size.saturating_sub(HEADER_SIZE)) as usize;
        let _ = start;
        let data = r.reader_mut().read_bytes(data_len)?;

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
    fn round_trips_shared_texture() {
        let tex = TextureBlock {
            name: "spark01".into(),
            format: ImageFormat::RGBA32,
            width: 16,
            height: 16,
            mipmap_count: 1,
            min_lod: 0.0,
            max_lod: 0.0,
            data: vec![0u8; 16 * 16 * 4],
        };
        let mut writer = Writer::new();
        tex.write(&mut writer);
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = TextureBlock::read(&mut safe).unwrap();
        assert_eq!(back, tex);
    }
}
