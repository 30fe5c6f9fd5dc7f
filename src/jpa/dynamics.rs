//! `BEM1`: the particle emitter's own transform, spawn rate, and initial
//! velocity. Field layout and sizes are taken directly from the JEFFjpa1
//! on-disk struct; this core keeps the raw fixed-point/angle encodings
//! rather than converting them to friendly units, the same way [`super`]
//! keeps every other JPA block close to its disk representation.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

pub const MAGIC: &[u8; 4] = b"BEM1";
const BODY_SIZE: u32 = 0xa0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeType {
    Cube = 0x00,
    Sphere = 0x01,
    Cylinder = 0x02,
    Torus = 0x03,
    Point = 0x04,
    Circle = 0x05,
    Line = 0x06,
}

impl VolumeType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x00 => Self::Cube,
            0x01 => Self::Sphere,
            0x02 => Self::Cylinder,
            0x03 => Self::Torus,
            0x04 => Self::Point,
            0x05 => Self::Circle,
            0x06 => Self::Line,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsBlock {
    pub emitter_scale: [f32; 3],
    pub emitter_translate: [f32; 3],
    pub emitter_rotate: [u16; 3],
    pub volume_type: VolumeType,
    pub rate_step: u8,
    pub div_number: u16,
    pub rate: f32,
    pub rate_rndm: u16,
    pub max_frame: u16,
    pub start_frame: u16,
    pub volume_size: u16,
    pub volume_sweep: u16,
    pub volume_min_rad: u16,
    pub life_time: u16,
    pub life_time_rndm: u16,
    pub moment: u16,
    pub moment_rndm: u16,
    pub initial_vel_ratio: u16,
    pub accel_rndm: u16,
    pub air_resist: u16,
    pub air_resist_rndm: u16,
    pub initial_vel_omni: f32,
    pub initial_vel_axis: f32,
    pub initial_vel_rndm: f32,
    pub initial_vel_dir: f32,
    pub accel: f32,
    pub emitter_dir: [u16; 3],
    pub spread: u16,
    pub emit_flags: u32,
    /// Bitmask of [`crate::jpa::keyframe::KeyType`]s this emitter's `KFA1`
    /// blocks animate.
    pub kfa1_key_type_mask: u32,
}

impl DynamicsBlock {
    pub fn write(&self, writer: &mut Writer) {
        writer.write_bytes(MAGIC);
        writer.write::<u32>(BODY_SIZE + 8, Endian::Current);
        writer.write::<u32>(0, Endian::Current); // padding

        for v in self.emitter_scale {
            writer.write::<f32>(v, Endian::Current);
        }
        for v in self.emitter_translate {
            writer.write::<f32>(v, Endian::Current);
        }
        for v in self.emitter_rotate {
            writer.write::<u16>(v, Endian::Current);
        }
        writer.write::<u8>(self.volume_type as u8, Endian::Current);
        writer.write::<u8>(self.rate_step, Endian::Current);
        writer.write::<u8>(0, Endian::Current);
        writer.write::<u8>(0, Endian::Current);
        writer.write::<u16>(self.div_number, Endian::Current);
        writer.write::<f32>(self.rate, Endian::Current);
        writer.write::<u16>(self.rate_rndm, Endian::Current);
        writer.write::<u16>(self.max_frame, Endian::Current);
        writer.write::<u16>(self.start_frame, Endian::Current);
        writer.write::<u16>(self.volume_size, Endian::Current);
        writer.write::<u16>(self.volume_sweep, Endian::Current);
        writer.write::<u16>(self.volume_min_rad, Endian::Current);
        writer.write::<u16>(self.life_time, Endian::Current);
        writer.write::<u16>(self.life_time_rndm, Endian::Current);
        writer.write::<u16>(self.moment, Endian::Current);
        writer.write::<u16>(self.moment_rndm, Endian::Current);
        writer.write::<u16>(self.initial_vel_ratio, Endian::Current);
        writer.write::<u16>(self.accel_rndm, Endian::Current);
        writer.write::<u16>(self.air_resist, Endian::Current);
        writer.write::<u16>(self.air_resist_rndm, Endian::Current);
        writer.write::<f32>(self.initial_vel_omni, Endian::Current);
        writer.write::<f32>(self.initial_vel_axis, Endian::Current);
        writer.write::<f32>(self.initial_vel_rndm, Endian::Current);
        writer.write::<f32>(self.initial_vel_dir, Endian::Current);
        writer.write::<f32>(self.accel, Endian::Current);
        for v in self.emitter_dir {
            writer.write::<u16>(v, Endian::Current);
        }
        writer.write::<u16>(self.spread, Endian::Current);
        writer.write::<u32>(self.emit_flags, Endian::Current);
        writer.write::<u32>(self.kfa1_key_type_mask, Endian::Current);
        for _ in 0..11 {
            writer.write::<u32>(0, Endian::Current);
        }
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        r.magic(MAGIC)?;
        let size = r.u32()?;
        if size != BODY_SIZE + 8 {
            return Err(Error::DecodeError(format!("BEM1: unexpected size 0x{size:x}")));
        }
        r.u32()?;

        let emitter_scale = [r.f32()?, r.f32()?, r.f32()?];
        let emitter_translate = [r.f32()?, r.f32()?, r.f32()?];
        let emitter_rotate = [r.u16()?, r.u16()?, r.u16()?];
        let volume_type_raw = r.u8()?;
        let volume_type = VolumeType::from_u8(volume_type_raw).ok_or_else(|| Error::DecodeError(format!("BEM1: unknown volume type {volume_type_raw}")))?;
        let rate_step = r.u8()?;
        r.u8()?;
        r.u8()?;
        let div_number = r.u16()?;
        let rate = r.f32()?;
        let rate_rndm = r.u16()?;
        let max_frame = r.u16()?;
        let start_frame = r.u16()?;
        let volume_size = r.u16()?;
        let volume_sweep = r.u16()?;
        let volume_min_rad = r.u16()?;
        let life_time = r.u16()?;
        let life_time_rndm = r.u16()?;
        let moment = r.u16()?;
        let moment_rndm = r.u16()?;
        let initial_vel_ratio = r.u16()?;
        let accel_rndm = r.u16()?;
        let air_resist = r.u16()?;
        let air_resist_rndm = r.u16()?;
        let initial_vel_omni = r.f32()?;
        let initial_vel_axis = r.f32()?;
        let initial_vel_rndm = r.f32()?;
        let initial_vel_dir = r.f32()?;
        let accel = r.f32()?;
        let emitter_dir = [r.u16()?, r.u16()?, r.u16()?];
        let spread = r.u16()?;
        let emit_flags = r.u32()?;
        let kfa1_key_type_mask = r.u32()?;
        for _ in 0..11 {
            r.u32()?;
        }

        Ok(Self {
            emitter_scale,
            emitter_translate,
            emitter_rotate,
            volume_type,
            rate_step,
            div_number,
            rate,
            rate_rndm,
            max_frame,
            start_frame,
            volume_size,
            volume_sweep,
            volume_min_rad,
            life_time,
            life_time_rndm,
            moment,
            moment_rndm,
            initial_vel_ratio,
            accel_rndm,
            air_resist,
            air_resist_rndm,
            initial_vel_omni,
            initial_vel_axis,
            initial_vel_rndm,
            initial_vel_dir,
            accel,
            emitter_dir,
            spread,
            emit_flags,
            kfa1_key_type_mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    fn sample() -> DynamicsBlock {
        DynamicsBlock {
            emitter_scale: [1.0, 1.0, 1.0],
            emitter_translate: [0.0, 5.0, 0.0],
            emitter_rotate: [0, 0, 0],
            volume_type: VolumeType::Sphere,
            rate_step: 1,
            div_number: 8,
            rate: 1.0,
            rate_rndm: 0,
            max_frame: -1i16 as u16,
            start_frame: 0,
            volume_size: 100,
            volume_sweep: 0,
            volume_min_rad: 0,
            life_time: 60,
            life_time_rndm: 0,
            moment: 0,
            moment_rndm: 0,
            initial_vel_ratio: 0,
            accel_rndm: 0,
            air_resist: 0,
            air_resist_rndm: 0,
            initial_vel_omni: 1.0,
            initial_vel_axis: 0.0,
            initial_vel_rndm: 0.0,
            initial_vel_dir: 0.0,
            accel: 0.0,
            emitter_dir: [0, 0, 0],
            spread: 0,
            emit_flags: 0,
            kfa1_key_type_mask: 0,
        }
    }

    #[test]
    fn round_trips_emitter_fields() {
        let block = sample();
        let mut writer = Writer::new();
        block.write(&mut writer);
        let bytes = writer.take_bytes();
        assert_eq!(bytes.len(), (BODY_SIZE + 8) as usize);

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = DynamicsBlock::read(&mut safe).unwrap();
        assert_eq!(back, block);
    }
}
