//! Top-level JPA particle-resource archive framing, in both variants this
//! format has shipped as: the legacy flat `"JEFF" "jpa1"` stream (a single
//! resource's blocks one after another) and the later `"JPAC"` container
//! (an indexed table of resources followed by a shared texture table).
//!
//! A resource is itself a flat sequence of tagged blocks — `BEM1` at most
//! once, `FLD1`/`KFA1` any number of times, `BSP1`/`ESP1`/`SSP1`/`ETX1` at
//! most once each, and `TDB1` at most once. [`Resource::write`] always
//! emits them in that order; [`Resource::read`] accepts any order and
//! skips past each block via its own size field, same as a BRRES folder
//! dictionary accepts entries independent of emission order.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::jpa::dynamics::DynamicsBlock;
use crate::jpa::field::FieldBlock;
use crate::jpa::keyframe::KeyBlock;
use crate::jpa::shape::{tags, RawBlock};
use crate::jpa::texture::TextureBlock;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

const TAG_BEM1: &[u8; 4] = b"BEM1";
const TAG_FLD1: &[u8; 4] = b"FLD1";
const TAG_KFA1: &[u8; 4] = b"KFA1";
const TAG_TDB1: &[u8; 4] = b"TDB1";
const TAG_TEX1: &[u8; 4] = b"TEX1";

/// One particle effect: an emitter's dynamics, its shape blocks, the
/// forces acting on its particles, and the key-frame curves driving it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource {
    pub dynamics: Option<DynamicsBlock>,
    pub base_shape: Option<RawBlock>,
    pub extra_shape: Option<RawBlock>,
    pub child_shape: Option<RawBlock>,
    pub indirect_texture: Option<RawBlock>,
    pub fields: Vec<FieldBlock>,
    pub key_frames: Vec<KeyBlock>,
    /// Maps the texture indices `BSP1`/`SSP1` reference locally to indices
    /// into the archive's shared [`Archive::textures`].
    pub texture_id_table: Vec<u16>,
}

impl Resource {
    fn block_count(&self) -> usize {
        self.dynamics.is_some() as usize
            + self.fields.len()
            + self.key_frames.len()
            + self.base_shape.is_some() as usize
            + self.extra_shape.is_some() as usize
            + self.child_shape.is_some() as usize
            + self.indirect_texture.is_some() as usize
            + (!self.texture_id_table.is_empty()) as usize
    }

    /// Writes this resource's blocks with no resource-table header, the
    /// framing the `"JEFF"` container uses.
    fn write_blocks(&self, writer: &mut Writer) {
        if let Some(bem1) = &self.dynamics {
            bem1.write(writer);
        }
        for fld1 in &self.fields {
            fld1.write(writer);
        }
        for kfa1 in &self.key_frames {
            kfa1.write(writer);
        }
        if let Some(bsp1) = &self.base_shape {
            bsp1.write(writer);
        }
        if let Some(esp1) = &self.extra_shape {
            esp1.write(writer);
        }
        if let Some(ssp1) = &self.child_shape {
            ssp1.write(writer);
        }
        if let Some(etx1) = &self.indirect_texture {
            etx1.write(writer);
        }
        if !self.texture_id_table.is_empty() {
            writer.write_bytes(TAG_TDB1);
            writer.write::<u32>(8 + self.texture_id_table.len() as u32 * 2, Endian::Current);
            for &idx in &self.texture_id_table {
                writer.write::<u16>(idx, Endian::Current);
            }
        }
    }

    /// Writes this resource prefixed by the 8-byte per-effect header the
    /// `"JPAC"` container's effect table requires.
    fn write_with_header(&self, writer: &mut Writer) {
        writer.write::<u16>(0, Endian::Current); // resource id, assigned by the archive
        writer.write::<u16>(self.block_count() as u16, Endian::Current);
        writer.write::<u8>(self.fields.len() as u8, Endian::Current);
        writer.write::<u8>(self.key_frames.len() as u8, Endian::Current);
        writer.write::<u8>(0, Endian::Current); // tdb1 entry count lives in the TDB1 block itself
        writer.write::<u8>(0, Endian::Current);
        self.write_blocks(writer);
    }

    fn read_block<D: Diagnostics>(&mut self, r: &mut SafeReader<'_, D>) -> Result<()> {
        let tag_start = r.tell();
        let tag = r.reader_mut().read_bytes(4)?;
        r.seek_set(tag_start);
        match &tag[..] {
            t if t == TAG_BEM1 => self.dynamics = Some(DynamicsBlock::read(r)?),
            t if t == TAG_FLD1 => self.fields.push(FieldBlock::read(r)?),
            t if t == TAG_KFA1 => self.key_frames.push(KeyBlock::read(r)?),
            t if t == tags::BSP1 => self.base_shape = Some(RawBlock::read(r)?),
            t if t == tags::ESP1 => self.extra_shape = Some(RawBlock::read(r)?),
            t if t == tags::SSP1 => self.child_shape = Some(RawBlock::read(r)?),
            t if t == tags::ETX1 => self.indirect_texture = Some(RawBlock::read(r)?),
            t if t == TAG_TDB1 => {
                r.reader_mut().read_bytes(4)?;
                let size = r.u32()?;
                let count = (size.saturating_sub(8)) / 2;
                let mut table = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    table.push(r.u16()?);
                }
                self.texture_id_table = table;
            }
            other => {
                let block = RawBlock::read(r)?;
                log::warn!("jpa: skipping unrecognized resource block '{}' at 0x{tag_start:x}", String::from_utf8_lossy(other).trim());
                let _ = block;
            }
        }
        Ok(())
    }
}

/// A particle archive: the resources it defines, plus the shared texture
/// table every `BSP1`/`SSP1` indexes into via [`Resource::texture_id_table`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Archive {
    pub resources: Vec<Resource>,
    pub textures: Vec<TextureBlock>,
}

/// Which of the two top-level framings an archive was read from, or should
/// be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Jeff,
    Jpac,
}

pub fn write(archive: &Archive, format: ContainerFormat) -> Vec<u8> {
    match format {
        ContainerFormat::Jeff => write_jeff(archive),
        ContainerFormat::Jpac => write_jpac(archive),
    }
}

fn write_jeff(archive: &Archive) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.write_bytes(b"JEFF");
    writer.write_bytes(b"jpa1");
    writer.write::<u32>(0, Endian::Current); // file size placeholder
    writer.write::<u32>(0, Endian::Current); // section count placeholder
    for _ in 0..4 {
        writer.write::<u32>(0, Endian::Current);
    }

    let mut section_count = 0u32;
    for resource in &archive.resources {
        section_count += resource.block_count() as u32;
        resource.write_blocks(&mut writer);
    }
    for texture in &archive.textures {
        section_count += 1;
        texture.write(&mut writer);
    }

    let file_size = writer.tell();
    writer.write_at::<u32>(file_size, 0x08, Endian::Current);
    writer.write_at::<u32>(section_count, 0x0c, Endian::Current);
    writer.take_bytes()
}

fn write_jpac(archive: &Archive) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.write_bytes(b"JPAC");
    writer.write_bytes(b"2-10");
    writer.write::<u16>(archive.resources.len() as u16, Endian::Current);
    writer.write::<u16>(archive.textures.len() as u16, Endian::Current);
    let texture_table_ofs_field = writer.tell();
    writer.write::<u32>(0, Endian::Current); // texture table offset placeholder

    for (i, resource) in archive.resources.iter().enumerate() {
        let entry_start = writer.tell();
        resource.write_with_header(&mut writer);
        writer.write_at::<u16>(i as u16, entry_start, Endian::Current);
    }

    let texture_table_ofs = writer.tell();
    writer.write_at::<u32>(texture_table_ofs, texture_table_ofs_field, Endian::Current);
    for texture in &archive.textures {
        texture.write(&mut writer);
    }

    writer.take_bytes()
}

pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<(ContainerFormat, Archive)> {
    let start = r.tell();
    let magic = r.reader_mut().read_bytes(4)?;
    match &magic[..] {
        b"JEFF" => read_jeff(r, start),
        b"JPAC" => read_jpac(r, start),
        other => Err(Error::DecodeError(format!("jpa: not a JPA container (magic {:?})", String::from_utf8_lossy(other)))),
    }
}

fn read_jeff<D: Diagnostics>(r: &mut SafeReader<'_, D>, start: u32) -> Result<(ContainerFormat, Archive)> {
    r.magic(b"jpa1")?;
    let _file_size = r.u32()?;
    let section_count = r.u32()?;
    r.seek_set(start + 0x20);

    let mut resource = Resource::default();
    let mut textures = Vec::new();
    for _ in 0..section_count {
        let tag_start = r.tell();
        let tag = r.reader_mut().read_bytes(4)?;
        if tag == TAG_TEX1 {
            r.seek_set(tag_start);
            textures.push(TextureBlock::read(r)?);
        } else {
            r.seek_set(tag_start);
            resource.read_block(r)?;
        }
    }

    Ok((
        ContainerFormat::Jeff,
        Archive {
            resources: vec![resource],
            textures,
        },
    ))
}

fn read_jpac<D: Diagnostics>(r: &mut SafeReader<'_, D>, start: u32) -> Result<(ContainerFormat, Archive)> {
    r.magic(b"2-10")?;
    let effect_count = r.u16()?;
    let texture_count = r.u16()?;
    let texture_table_ofs = r.u32()?;

    let mut resources = Vec::with_capacity(effect_count as usize);
    let mut effect_table_idx = start + 0x10;
    for _ in 0..effect_count {
        let resource_begin = effect_table_idx;
        r.seek_set(resource_begin + 0x02);
        let block_count = r.u16()?;
        r.u8()?; // field_block_count, redundant with fields.len() after decode
        r.u8()?; // key_block_count
        r.u8()?; // tdb1_count, redundant with texture_id_table.len() after decode
        r.u8()?;

        let mut resource = Resource::default();
        for _ in 0..block_count {
            resource.read_block(r)?;
        }
        resources.push(resource);

        r.seek_set(resource_begin + 0x02);
        let mut cursor = resource_begin + 0x08;
        for _ in 0..block_count {
            r.seek_set(cursor + 0x04);
            let block_size = r.u32()?;
            cursor += block_size;
        }
        effect_table_idx = cursor;
    }

    let mut textures = Vec::with_capacity(texture_count as usize);
    let mut texture_table_idx = start + texture_table_ofs;
    for _ in 0..texture_count {
        r.seek_set(texture_table_idx);
        let size_field = r.tell() + 4;
        textures.push(TextureBlock::read(r)?);
        r.seek_set(size_field);
        let block_size = r.u32()?;
        texture_table_idx += block_size;
    }

    Ok((ContainerFormat::Jpac, Archive { resources, textures }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpa::dynamics::VolumeType;
    use crate::jpa::field::{FieldAddType, FieldType};
    use crate::jpa::keyframe::KeyType;
    use crate::j3d::texture::ImageFormat;
    use crate::stream::Reader;

    fn sample_resource() -> Resource {
        Resource {
            dynamics: Some(DynamicsBlock {
                emitter_scale: [1.0, 1.0, 1.0],
                emitter_translate: [0.0, 0.0, 0.0],
                emitter_rotate: [0, 0, 0],
                volume_type: VolumeType::Point,
                rate_step: 0,
                div_number: 1,
                rate: 1.0,
                rate_rndm: 0,
                max_frame: 0,
                start_frame: 0,
                volume_size: 0,
                volume_sweep: 0,
                volume_min_rad: 0,
                life_time: 30,
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
                kfa1_key_type_mask: 1 << (KeyType::Scale as u32),
            }),
            base_shape: Some(RawBlock::new(tags::BSP1, vec![0x11; 0x40])),
            extra_shape: Some(RawBlock::new(tags::ESP1, vec![0x22; 0x20])),
            child_shape: None,
            indirect_texture: None,
            fields: vec![FieldBlock {
                field_type: FieldType::Gravity,
                add_type: FieldAddType::FieldAccel,
                cycle: 0,
                status_flag: 0,
                mag: 1.0,
                mag_rndm: 0.0,
                max_dist: 0.0,
                pos: [0.0; 3],
                dir: [0.0, -1.0, 0.0],
                param: [0.0; 3],
                fade_in: 0,
                fade_out: 0,
                en_time: 0,
                dis_time: 0,
            }],
            key_frames: vec![KeyBlock {
                key_type: KeyType::Scale,
                is_loop_enable: false,
                key_values: vec![1.0, 0.0],
            }],
            texture_id_table: vec![0],
        }
    }

    fn sample_texture() -> TextureBlock {
        TextureBlock {
            name: "spark01".into(),
            format: ImageFormat::RGBA32,
            width: 8,
            height: 8,
            mipmap_count: 1,
            min_lod: 0.0,
            max_lod: 0.0,
            data: vec![0u8; 8 * 8 * 4],
        }
    }

    #[test]
    fn jeff_round_trips_single_resource_and_texture() {
        let archive = Archive {
            resources: vec![sample_resource()],
            textures: vec![sample_texture()],
        };
        let bytes = write(&archive, ContainerFormat::Jeff);

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let (format, back) = read(&mut safe).unwrap();
        assert_eq!(format, ContainerFormat::Jeff);
        assert_eq!(back.resources.len(), 1);
        assert_eq!(back.resources[0], archive.resources[0]);
        assert_eq!(back.textures, archive.textures);
    }

    #[test]
    fn jpac_round_trips_multiple_resources() {
        let archive = Archive {
            resources: vec![sample_resource(), sample_resource()],
            textures: vec![sample_texture()],
        };
        let bytes = write(&archive, ContainerFormat::Jpac);

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let (format, back) = read(&mut safe).unwrap();
        assert_eq!(format, ContainerFormat::Jpac);
        assert_eq!(back.resources.len(), 2);
        assert_eq!(back.resources[0], archive.resources[0]);
        assert_eq!(back.resources[1], archive.resources[1]);
        assert_eq!(back.textures, archive.textures);
    }
}
