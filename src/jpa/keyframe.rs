//! `KFA1`: a key-frame curve that drives one of the emitter's own scalar
//! properties over the particle system's lifetime (its identity is a
//! [`KeyType`] selected from `BEM1`'s `kfa1_key_type_mask`, not stored in
//! the block itself — the mask's bit position is the type).

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::Result;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

pub const MAGIC: &[u8; 4] = b"KFA1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rate = 0x00,
    VolumeSize = 0x01,
    VolumeSweep = 0x02,
    VolumeMinRad = 0x03,
    LifeTime = 0x04,
    Moment = 0x05,
    InitialVelOmni = 0x06,
    InitialVelAxis = 0x07,
    InitialVelDir = 0x08,
    Spread = 0x09,
    Scale = 0x0a,
}

impl KeyType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x00 => Self::Rate,
            0x01 => Self::VolumeSize,
            0x02 => Self::VolumeSweep,
            0x03 => Self::VolumeMinRad,
            0x04 => Self::LifeTime,
            0x05 => Self::Moment,
            0x06 => Self::InitialVelOmni,
            0x07 => Self::InitialVelAxis,
            0x08 => Self::InitialVelDir,
            0x09 => Self::Spread,
            0x0a => Self::Scale,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyBlock {
    pub key_type: KeyType,
    pub is_loop_enable: bool,
    pub key_values: Vec<f32>,
}

impl KeyBlock {
    pub fn write(&self, writer: &mut Writer) {
        let start = writer.tell();
        writer.write_bytes(MAGIC);
        writer.write::<u32>(0, Endian::Current); // size placeholder
        writer.write::<u8>(self.key_type as u8, Endian::Current);
        writer.write::<u8>(u8::from(self.is_loop_enable), Endian::Current);
        writer.write::<u16>(self.key_values.len() as u16, Endian::Current);
        for &v in &self.key_values {
            writer.write::<f32>(v, Endian::Current);
        }
        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        r.magic(MAGIC)?;
        let _size = r.u32()?;
        let key_type_raw = r.u8()?;
        let key_type = KeyType::from_u8(key_type_raw)
            .ok_or_else(|| crate::error::Error::DecodeError(format!("KFA1: unknown key type {key_type_raw}")))?;
        let is_loop_enable = r.u8()? != 0;
        let count = r.u16()? as usize;
        let mut key_values = Vec::with_capacity(count);
        for _ in 0..count {
            key_values.push(r.f32()?);
        }
        Ok(Self { key_type, is_loop_enable, key_values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_scale_curve() {
        let block = KeyBlock { key_type: KeyType::Scale, is_loop_enable: true, key_values: vec![0.0, 1.0, 0.5] };
        let mut writer = Writer::new();
        block.write(&mut writer);
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = KeyBlock::read(&mut safe).unwrap();
        assert_eq!(back, block);
    }
}
