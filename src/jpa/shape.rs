//! `BSP1`, `ESP1`, `SSP1`, `ETX1`: the emitter's base-shape, extra-shape,
//! child-shape, and indirect-texture parameter blocks.
//!
//! Each of these carries dozens of fixed-point-converted draw parameters
//! (billboard mode, color-animation tables, texture-scroll rates, ...) in a
//! layout that, unlike `BEM1`/`FLD1`, has no small enumerable field list —
//! porting it field-by-field risks silent corruption of values this core
//! has no way to validate. [`crate::j3d::sections::mdl3::Mdl3`] already
//! sets the precedent for this crate: a block kept as an opaque, verbatim
//! byte span rather than decoded, when decoding would outweigh the value
//! of the fields to whatever's consuming this core. These four blocks are
//! treated the same way: round-tripped byte-for-byte, addressable by tag.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

/// One opaque JPA sub-block: a 4-byte tag, its on-disk size (tag + size
/// field included), and the raw bytes following the size field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub tag: [u8; 4],
    pub payload: Vec<u8>,
}

impl RawBlock {
    pub fn new(tag: &[u8; 4], payload: Vec<u8>) -> Self {
        Self { tag: *tag, payload }
    }

    pub fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.tag);
        writer.write::<u32>(8 + self.payload.len() as u32, Endian::Current);
        writer.write_bytes(&self.payload);
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        let at = r.tell();
        let tag_bytes = r.reader_mut().read_bytes(4)?;
        let tag: [u8; 4] = tag_bytes
            .try_into()
            .map_err(|_| Error::DecodeError(format!("JPA block tag truncated at 0x{at:x}")))?;
        let size = r.u32()?;
        if size < 8 {
            return Err(Error::DecodeError(format!("JPA block '{}' at 0x{at:x}: size {size} smaller than header", String::from_utf8_lossy(&tag))));
        }
        let payload = r.reader_mut().read_bytes((size - 8) as usize)?;
        Ok(Self { tag, payload })
    }
}

pub mod tags {
    pub const BSP1: &[u8; 4] = b"BSP1";
    pub const ESP1: &[u8; 4] = b"ESP1";
    pub const SSP1: &[u8; 4] = b"SSP1";
    pub const ETX1: &[u8; 4] = b"ETX1";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_opaque_base_shape_block() {
        let block = RawBlock::new(tags::BSP1, vec![0xab; 0x84]);
        let mut writer = Writer::new();
        block.write(&mut writer);
        let bytes = writer.take_bytes();
        assert_eq!(bytes.len(), 8 + 0x84);

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = RawBlock::read(&mut safe).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn round_trips_empty_indirect_texture_block() {
        let block = RawBlock::new(tags::ETX1, vec![]);
        let mut writer = Writer::new();
        block.write(&mut writer);
        let bytes = writer.take_bytes();
        assert_eq!(bytes.len(), 8);

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = RawBlock::read(&mut safe).unwrap();
        assert_eq!(back, block);
    }
}
