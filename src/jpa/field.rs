//! `FLD1`: one force field applied to live particles (gravity, a vortex, a
//! magnet, ...). A `JPAResource` may carry several; `type`/`add_type`
//! select which of `mag`/`param1..3` apply, mirroring the original tool's
//! tagged-union-by-enum layout.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

pub const MAGIC: &[u8; 4] = b"FLD1";
const BODY_SIZE: u32 = 0x60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Gravity = 0x00,
    Air = 0x01,
    Magnet = 0x02,
    Newton = 0x03,
    Vortex = 0x04,
    Random = 0x05,
    Drag = 0x06,
    Convection = 0x07,
    Spin = 0x08,
}

impl FieldType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x00 => Self::Gravity,
            0x01 => Self::Air,
            0x02 => Self::Magnet,
            0x03 => Self::Newton,
            0x04 => Self::Vortex,
            0x05 => Self::Random,
            0x06 => Self::Drag,
            0x07 => Self::Convection,
            0x08 => Self::Spin,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAddType {
    FieldAccel = 0x00,
    BaseVelocity = 0x01,
    FieldVelocity = 0x02,
}

impl FieldAddType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x00 => Self::FieldAccel,
            0x01 => Self::BaseVelocity,
            0x02 => Self::FieldVelocity,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldBlock {
    pub field_type: FieldType,
    pub add_type: FieldAddType,
    pub cycle: u8,
    pub status_flag: u8,
    pub mag: f32,
    pub mag_rndm: f32,
    pub max_dist: f32,
    pub pos: [f32; 3],
    pub dir: [f32; 3],
    /// `FieldType`-dependent extra parameters (`refDistance`/`innerSpeed`/
    /// `outerSpeed` in the friendly form, left undecoded here).
    pub param: [f32; 3],
    pub fade_in: u16,
    pub fade_out: u16,
    pub en_time: u16,
    pub dis_time: u16,
}

impl FieldBlock {
    pub fn write(&self, writer: &mut Writer) {
        writer.write_bytes(MAGIC);
        writer.write::<u32>(BODY_SIZE + 8, Endian::Current);
        writer.write::<u32>(0, Endian::Current);

        writer.write::<u8>(self.field_type as u8, Endian::Current);
        writer.write::<u8>(0, Endian::Current);
        writer.write::<u8>(self.add_type as u8, Endian::Current);
        writer.write::<u8>(self.cycle, Endian::Current);
        writer.write::<u8>(self.status_flag, Endian::Current);
        writer.write::<u8>(0, Endian::Current);
        writer.write::<u16>(0, Endian::Current);
        writer.write::<f32>(self.mag, Endian::Current);
        writer.write::<f32>(self.mag_rndm, Endian::Current);
        writer.write::<f32>(self.max_dist, Endian::Current);
        for v in self.pos {
            writer.write::<f32>(v, Endian::Current);
        }
        for v in self.dir {
            writer.write::<f32>(v, Endian::Current);
        }
        for v in self.param {
            writer.write::<f32>(v, Endian::Current);
        }
        writer.write::<u16>(self.fade_in, Endian::Current);
        writer.write::<u16>(self.fade_out, Endian::Current);
        writer.write::<u16>(self.en_time, Endian::Current);
        writer.write::<u16>(self.dis_time, Endian::Current);
        for _ in 0..5 {
            writer.write::<u32>(0, Endian::Current);
        }
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        r.magic(MAGIC)?;
        let size = r.u32()?;
        if size != BODY_SIZE + 8 {
            return Err(Error::DecodeError(format!("FLD1: unexpected size 0x{size:x}")));
        }
        r.u32()?;

        let type_raw = r.u8()?;
        let field_type = FieldType::from_u8(type_raw).ok_or_else(|| Error::DecodeError(format!("FLD1: unknown field type {type_raw}")))?;
        r.u8()?;
        let add_type_raw = r.u8()?;
        let add_type = FieldAddType::from_u8(add_type_raw).ok_or_else(|| Error::DecodeError(format!("FLD1: unknown add type {add_type_raw}")))?;
        let cycle = r.u8()?;
        let status_flag = r.u8()?;
        r.u8()?;
        r.u16()?;
        let mag = r.f32()?;
        let mag_rndm = r.f32()?;
        let max_dist = r.f32()?;
        let pos = [r.f32()?, r.f32()?, r.f32()?];
        let dir = [r.f32()?, r.f32()?, r.f32()?];
        let param = [r.f32()?, r.f32()?, r.f32()?];
        let fade_in = r.u16()?;
        let fade_out = r.u16()?;
        let en_time = r.u16()?;
        let dis_time = r.u16()?;
        for _ in 0..5 {
            r.u32()?;
        }

        Ok(Self {
            field_type,
            add_type,
            cycle,
            status_flag,
            mag,
            mag_rndm,
            max_dist,
            pos,
            dir,
            param,
            fade_in,
            fade_out,
            en_time,
            dis_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_vortex_field() {
        let block = FieldBlock {
            field_type: FieldType::Vortex,
            add_type: FieldAddType::FieldVelocity,
            cycle: 1,
            status_flag: 0,
            mag: 2.5,
            mag_rndm: 0.0,
            max_dist: 100.0,
            pos: [0.0, 0.0, 0.0],
            dir: [0.0, 1.0, 0.0],
            param: [1.0, 2.0, 0.0],
            fade_in: 0,
            fade_out: 0,
            en_time: 0,
            dis_time: 0,
        };
        let mut writer = Writer::new();
        block.write(&mut writer);
        let bytes = writer.take_bytes();
        assert_eq!(bytes.len(), (BODY_SIZE + 8) as usize);

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = FieldBlock::read(&mut safe).unwrap();
        assert_eq!(back, block);
    }
}
