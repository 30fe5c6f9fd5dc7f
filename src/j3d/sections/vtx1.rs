//! VTX1: the model's shared vertex buffers. Every `Polygon` draws indices
//! into these buffers rather than owning its own vertex data.
//!
//! Layout: a magic/size header, a quantization-descriptor table (one entry
//! per populated attribute, terminated by a sentinel), a fixed-slot table
//! of buffer offsets (one slot per attribute this section can carry, `0`
//! when unused), then the raw buffers themselves, 32-byte aligned.

use crate::diagnostics::Diagnostics;
use crate::dl_codec::Attribute;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::j3d::model::{ComponentType, VertexBuffer};
use crate::j3d::sections::read_section_header;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

const MAGIC: &[u8; 4] = b"VTX1";
const NULL_ATTR: u32 = 0xff;

/// Fixed attribute slot order for the buffer-offset table, matching the
/// order VTX1 stores its offsets in.
const ATTR_SLOTS: [Attribute; 12] = [
    Attribute::Position,
    Attribute::Normal,
    Attribute::Color0,
    Attribute::Color1,
    Attribute::TexCoord0,
    Attribute::TexCoord1,
    Attribute::TexCoord2,
    Attribute::TexCoord3,
    Attribute::TexCoord4,
    Attribute::TexCoord5,
    Attribute::TexCoord6,
    Attribute::TexCoord7,
];

#[derive(Debug, Clone, Default)]
pub struct Vtx1 {
    /// Populated buffers, in `ATTR_SLOTS` order.
    pub buffers: Vec<(Attribute, VertexBuffer)>,
}

impl Vtx1 {
    pub fn get(&self, attr: Attribute) -> Option<&VertexBuffer> {
        self.buffers.iter().find(|(a, _)| *a == attr).map(|(_, b)| b)
    }

    pub fn set(&mut self, attr: Attribute, buffer: VertexBuffer) {
        if let Some(slot) = self.buffers.iter_mut().find(|(a, _)| *a == attr) {
            slot.1 = buffer;
        } else {
            self.buffers.push((attr, buffer));
        }
    }

    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(MAGIC);
        writer.write::<u32>(0, Endian::Current); // size placeholder

        for (attr, buf) in &self.buffers {
            writer.write::<u32>(*attr as u32, Endian::Current);
            writer.write::<u32>(buf.component_count, Endian::Current);
            writer.write::<u32>(buf.component_type.as_u32(), Endian::Current);
            writer.write::<u8>(buf.quantization_shift, Endian::Current);
            writer.write_bytes(&[0u8; 3]);
        }
        writer.write::<u32>(NULL_ATTR, Endian::Current);
        writer.write::<u32>(0, Endian::Current);
        writer.write::<u32>(0, Endian::Current);
        writer.write::<u8>(0, Endian::Current);
        writer.write_bytes(&[0u8; 3]);

        let offset_table_pos = writer.tell();
        for _ in ATTR_SLOTS {
            writer.write::<u32>(0, Endian::Current);
        }

        let mut offsets = [0u32; ATTR_SLOTS.len()];
        for (slot, attr) in ATTR_SLOTS.iter().enumerate() {
            if let Some(buf) = self.get(*attr) {
                writer.align_to(32);
                offsets[slot] = writer.tell() - start;
                writer.write_bytes(&buf.raw);
            }
        }

        let end = writer.tell();
        for (slot, ofs) in offsets.iter().enumerate() {
            writer.write_at::<u32>(*ofs, offset_table_pos + slot as u32 * 4, Endian::Current);
        }
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        let start = r.tell();
        let size = read_section_header(r, MAGIC)?;
        let section_end = start + size;

        let mut descriptors = Vec::new();
        loop {
            let attr_raw = r.u32()?;
            if attr_raw == NULL_ATTR {
                r.u32()?;
                r.u32()?;
                r.u32()?;
                break;
            }
            let attr = Attribute::from_u32(attr_raw)
                .ok_or_else(|| Error::DecodeError(format!("VTX1: unknown attribute id {attr_raw}")))?;
            let comp_count = r.u32()?;
            let comp_type_raw = r.u32()?;
            let comp_type = ComponentType::from_u32(comp_type_raw)
                .ok_or_else(|| Error::DecodeError(format!("VTX1: unknown component type {comp_type_raw}")))?;
            let shift = r.u8()? as u8;
            r.u8()?;
            r.u8()?;
            r.u8()?;
            descriptors.push((attr, comp_count, comp_type, shift));
        }

        let mut populated = Vec::new();
        for attr in ATTR_SLOTS {
            let ofs = r.u32()?;
            let Some((_, comp_count, comp_type, shift)) = descriptors.iter().find(|(a, ..)| *a == attr).copied()
            else {
                if ofs != 0 {
                    return Err(Error::DecodeError(format!(
                        "VTX1: buffer offset present for attribute {attr:?} with no descriptor"
                    )));
                }
                continue;
            };
            if ofs == 0 {
                continue;
            }
            populated.push((attr, ofs, comp_count, comp_type, shift));
        }
        // Buffer length isn't stored directly: each buffer runs from its own
        // offset to whichever comes first, the next populated buffer's
        // offset or the section end.
        populated.sort_by_key(|(_, ofs, ..)| *ofs);

        let mut out = Vtx1::default();
        for (i, (attr, ofs, comp_count, comp_type, shift)) in populated.iter().copied().enumerate() {
            let stride = comp_count as u8 * comp_type.byte_size() as u8;
            let abs = start + ofs;
            let next_abs = populated.get(i + 1).map(|(_, next_ofs, ..)| start + next_ofs).unwrap_or(section_end);
            let len = next_abs.saturating_sub(abs) as usize;
            r.seek_set(abs);
            let bytes = r.reader_mut().read_bytes(len)?;
            out.set(
                attr,
                VertexBuffer {
                    component_count: comp_count,
                    component_type: comp_type,
                    quantization_shift: shift,
                    stride,
                    raw: bytes,
                },
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_position_buffer() {
        let mut vtx1 = Vtx1::default();
        vtx1.set(
            Attribute::Position,
            VertexBuffer {
                component_count: 3,
                component_type: ComponentType::F32,
                quantization_shift: 0,
                stride: 12,
                raw: vec![0u8; 12 * 4],
            },
        );

        let mut writer = Writer::new();
        vtx1.write(&mut writer).unwrap();
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = Vtx1::read(&mut safe).unwrap();
        let buf = back.get(Attribute::Position).unwrap();
        assert_eq!(buf.component_count, 3);
        assert_eq!(buf.component_type, ComponentType::F32);
    }
}
