//! The five G3D animation streams. Every kind is a named, framerate-bearing
//! header plus a list of per-target (material/bone) entries built from
//! [`Track`]s; `SRT0` and `CHR0` use a small enabled-attribute bitmask the
//! same way the original tool's `SrtMatDataHeader` does, so an unanimated
//! attribute costs 4 bytes (a fixed `f32`) instead of a whole curve.

use crate::brres::keyframe::{KeyFrameCollection, Track};
use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::Result;
use crate::name_pool::NamePool;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

/// Reserves a per-entry name pointer the same way every other G3D target
/// entry does: a `u32` offset relative to the entry's own start, resolved
/// later against the archive's shared name pool.
fn reserve_entry_name(writer: &mut Writer, names: &mut NamePool, entry_start: u32, name: &str) {
    let field_pos = writer.tell();
    writer.write::<u32>(0, Endian::Current);
    names.reserve(name.to_string(), entry_start, field_pos);
}

fn write_track(writer: &mut Writer, track: &Track) {
    match track {
        Track::Fixed(v) => writer.write::<f32>(*v, Endian::Current),
        Track::Animated(coll) => coll.write(writer),
    }
}

fn read_track<D: Diagnostics>(r: &mut SafeReader<'_, D>, fixed: bool) -> Result<Track> {
    if fixed {
        Ok(Track::Fixed(r.f32()?))
    } else {
        Ok(Track::Animated(KeyFrameCollection::read(r)?))
    }
}

/// One texture-coordinate generator's scale/rotate/translate tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct SrtTexGen {
    pub scale_u: Track,
    pub scale_v: Track,
    pub rotation: Track,
    pub translate_u: Track,
    pub translate_v: Track,
}

impl Default for SrtTexGen {
    fn default() -> Self {
        Self {
            scale_u: Track::Fixed(1.0),
            scale_v: Track::Fixed(1.0),
            rotation: Track::Fixed(0.0),
            translate_u: Track::Fixed(0.0),
            translate_v: Track::Fixed(0.0),
        }
    }
}

impl SrtTexGen {
    fn enabled_mask(&self) -> u8 {
        let bit = |t: &Track| u8::from(!t.is_fixed());
        bit(&self.scale_u) | bit(&self.scale_v) << 1 | bit(&self.rotation) << 2 | bit(&self.translate_u) << 3 | bit(&self.translate_v) << 4
    }

    fn write(&self, writer: &mut Writer) {
        for (track, bit) in [
            (&self.scale_u, 0),
            (&self.scale_v, 1),
            (&self.rotation, 2),
            (&self.translate_u, 3),
            (&self.translate_v, 4),
        ] {
            let _ = bit;
            write_track(writer, track);
        }
    }

    fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>, mask: u8) -> Result<Self> {
        Ok(Self {
            scale_u: read_track(r, mask & 1 == 0)?,
            scale_v: read_track(r, mask & 2 == 0)?,
            rotation: read_track(r, mask & 4 == 0)?,
            translate_u: read_track(r, mask & 8 == 0)?,
            translate_v: read_track(r, mask & 16 == 0)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SrtMaterial {
    pub material_name: String,
    pub tex_gens: Vec<SrtTexGen>,
}

#[derive(Debug, Clone, Default)]
pub struct Srt0 {
    pub name: String,
    pub frame_duration: u16,
    pub looping: bool,
    pub materials: Vec<SrtMaterial>,
}

const SRT0_MAGIC: &[u8; 4] = b"SRT0";

impl Srt0 {
    pub fn write(&self, writer: &mut Writer, names: &mut NamePool) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(SRT0_MAGIC);
        writer.write::<u32>(0, Endian::Current); // size placeholder
        writer.write::<u32>(5, Endian::Current); // revision
        writer.write::<i32>(0, Endian::Current); // ofs_parent_dict
        writer.write::<u16>(self.frame_duration, Endian::Current);
        writer.write::<u16>(self.materials.len() as u16, Endian::Current);
        writer.write::<u32>(u32::from(self.looping), Endian::Current);

        for mat in &self.materials {
            let entry_start = writer.tell();
            reserve_entry_name(writer, names, entry_start, &mat.material_name);
            let mask = mat.tex_gens.iter().fold(0u32, |acc, t| (acc << 5) | t.enabled_mask() as u32);
            writer.write::<u32>(mask, Endian::Current);
            for tex_gen in &mat.tex_gens {
                tex_gen.write(writer);
            }
        }

        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>, tex_gens_per_material: usize) -> Result<Self> {
        r.magic(SRT0_MAGIC)?;
        let _size = r.u32()?;
        let _revision = r.u32()?;
        r.i32()?;
        let frame_duration = r.u16()?;
        let material_count = r.u16()? as usize;
        let looping = r.u32()? != 0;

        let mut materials = Vec::with_capacity(material_count);
        for _ in 0..material_count {
            let entry_start = r.tell();
            let material_name = r.string_ofs32(entry_start)?;
            let combined_mask = r.u32()?;
            let mut tex_gens = Vec::with_capacity(tex_gens_per_material);
            for slot in 0..tex_gens_per_material {
                let mask = ((combined_mask >> (5 * slot)) & 0x1f) as u8;
                tex_gens.push(SrtTexGen::read(r, mask)?);
            }
            materials.push(SrtMaterial { material_name, tex_gens });
        }
        Ok(Self {
            name: String::new(),
            frame_duration,
            looping,
            materials,
        })
    }
}

/// One bone's nine transform tracks (scale/rotation/translation xyz).
#[derive(Debug, Clone)]
pub struct Chr0Bone {
    pub bone_name: String,
    pub tracks: [Track; 9],
}

#[derive(Debug, Clone, Default)]
pub struct Chr0 {
    pub name: String,
    pub frame_duration: u16,
    pub looping: bool,
    pub bones: Vec<Chr0Bone>,
}

const CHR0_MAGIC: &[u8; 4] = b"CHR0";

impl Chr0 {
    pub fn write(&self, writer: &mut Writer, names: &mut NamePool) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(CHR0_MAGIC);
        writer.write::<u32>(0, Endian::Current);
        writer.write::<u32>(5, Endian::Current);
        writer.write::<i32>(0, Endian::Current);
        writer.write::<u16>(self.frame_duration, Endian::Current);
        writer.write::<u16>(self.bones.len() as u16, Endian::Current);
        writer.write::<u32>(u32::from(self.looping), Endian::Current);
        for bone in &self.bones {
            let entry_start = writer.tell();
            reserve_entry_name(writer, names, entry_start, &bone.bone_name);
            let mask = bone.tracks.iter().enumerate().fold(0u16, |acc, (i, t)| acc | (u16::from(!t.is_fixed()) << i));
            writer.write::<u16>(mask, Endian::Current);
            writer.write::<u16>(0, Endian::Current);
            for track in &bone.tracks {
                write_track(writer, track);
            }
        }
        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        r.magic(CHR0_MAGIC)?;
        let _size = r.u32()?;
        let _revision = r.u32()?;
        r.i32()?;
        let frame_duration = r.u16()?;
        let bone_count = r.u16()? as usize;
        let looping = r.u32()? != 0;

        let mut bones = Vec::with_capacity(bone_count);
        for _ in 0..bone_count {
            let entry_start = r.tell();
            let bone_name = r.string_ofs32(entry_start)?;
            let mask = r.u16()?;
            r.u16()?;
            let mut tracks: [Track; 9] = std::array::from_fn(|_| Track::Fixed(0.0));
            for (i, track) in tracks.iter_mut().enumerate() {
                *track = read_track(r, mask & (1 << i) == 0)?;
            }
            bones.push(Chr0Bone { bone_name, tracks });
        }
        Ok(Self {
            name: String::new(),
            frame_duration,
            looping,
            bones,
        })
    }
}

/// One material's uniform-color track set (register colors, up to 8).
#[derive(Debug, Clone, Default)]
pub struct Clr0Material {
    pub material_name: String,
    pub colors: Vec<Track>,
}

#[derive(Debug, Clone, Default)]
pub struct Clr0 {
    pub name: String,
    pub frame_duration: u16,
    pub looping: bool,
    pub materials: Vec<Clr0Material>,
}

const CLR0_MAGIC: &[u8; 4] = b"CLR0";

impl Clr0 {
    pub fn write(&self, writer: &mut Writer, names: &mut NamePool) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(CLR0_MAGIC);
        writer.write::<u32>(0, Endian::Current);
        writer.write::<u32>(4, Endian::Current);
        writer.write::<i32>(0, Endian::Current);
        writer.write::<u16>(self.frame_duration, Endian::Current);
        writer.write::<u16>(self.materials.len() as u16, Endian::Current);
        writer.write::<u32>(u32::from(self.looping), Endian::Current);
        for mat in &self.materials {
            let entry_start = writer.tell();
            reserve_entry_name(writer, names, entry_start, &mat.material_name);
            writer.write::<u8>(mat.colors.len() as u8, Endian::Current);
            let mask = mat.colors.iter().enumerate().fold(0u32, |acc, (i, t)| acc | (u32::from(!t.is_fixed()) << i));
            writer.write::<u32>(mask, Endian::Current);
            for color in &mat.colors {
                write_track(writer, color);
            }
        }
        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        r.magic(CLR0_MAGIC)?;
        let _size = r.u32()?;
        let _revision = r.u32()?;
        r.i32()?;
        let frame_duration = r.u16()?;
        let material_count = r.u16()? as usize;
        let looping = r.u32()? != 0;
        let mut materials = Vec::with_capacity(material_count);
        for _ in 0..material_count {
            let entry_start = r.tell();
            let material_name = r.string_ofs32(entry_start)?;
            let count = r.u8()? as usize;
            let mask = r.u32()?;
            let mut colors = Vec::with_capacity(count);
            for i in 0..count {
                colors.push(read_track(r, mask & (1 << i) == 0)?);
            }
            materials.push(Clr0Material { material_name, colors });
        }
        Ok(Self {
            name: String::new(),
            frame_duration,
            looping,
            materials,
        })
    }
}

/// PAT0 does not curve-interpolate: each key names which texture (by pool
/// index) is active starting at that frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatKey {
    pub frame: f32,
    pub texture_index: u16,
}

#[derive(Debug, Clone, Default)]
pub struct Pat0Material {
    pub material_name: String,
    pub keys: Vec<PatKey>,
}

#[derive(Debug, Clone, Default)]
pub struct Pat0 {
    pub name: String,
    pub frame_duration: u16,
    pub looping: bool,
    pub materials: Vec<Pat0Material>,
}

const PAT0_MAGIC: &[u8; 4] = b"PAT0";

impl Pat0 {
    pub fn write(&self, writer: &mut Writer, names: &mut NamePool) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(PAT0_MAGIC);
        writer.write::<u32>(0, Endian::Current);
        writer.write::<u32>(4, Endian::Current);
        writer.write::<i32>(0, Endian::Current);
        writer.write::<u16>(self.frame_duration, Endian::Current);
        writer.write::<u16>(self.materials.len() as u16, Endian::Current);
        writer.write::<u32>(u32::from(self.looping), Endian::Current);
        for mat in &self.materials {
            let entry_start = writer.tell();
            reserve_entry_name(writer, names, entry_start, &mat.material_name);
            writer.write::<u16>(mat.keys.len() as u16, Endian::Current);
            writer.write::<u16>(0, Endian::Current);
            for key in &mat.keys {
                writer.write::<f32>(key.frame, Endian::Current);
                writer.write::<u16>(key.texture_index, Endian::Current);
                writer.write::<u16>(0, Endian::Current);
            }
        }
        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        r.magic(PAT0_MAGIC)?;
        let _size = r.u32()?;
        let _revision = r.u32()?;
        r.i32()?;
        let frame_duration = r.u16()?;
        let material_count = r.u16()? as usize;
        let looping = r.u32()? != 0;
        let mut materials = Vec::with_capacity(material_count);
        for _ in 0..material_count {
            let entry_start = r.tell();
            let material_name = r.string_ofs32(entry_start)?;
            let count = r.u16()? as usize;
            r.u16()?;
            let mut keys = Vec::with_capacity(count);
            for _ in 0..count {
                let frame = r.f32()?;
                let texture_index = r.u16()?;
                r.u16()?;
                keys.push(PatKey { frame, texture_index });
            }
            materials.push(Pat0Material { material_name, keys });
        }
        Ok(Self {
            name: String::new(),
            frame_duration,
            looping,
            materials,
        })
    }
}

/// VIS0 keys a single visibility bit per bone per frame, stored as a
/// run-length-free bitstream (one byte per frame, 0/1) rather than a curve
/// — visibility has no meaningful interpolation.
#[derive(Debug, Clone, Default)]
pub struct Vis0Bone {
    pub bone_name: String,
    pub visible_per_frame: Vec<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct Vis0 {
    pub name: String,
    pub frame_duration: u16,
    pub looping: bool,
    pub bones: Vec<Vis0Bone>,
}

const VIS0_MAGIC: &[u8; 4] = b"VIS0";

impl Vis0 {
    pub fn write(&self, writer: &mut Writer, names: &mut NamePool) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(VIS0_MAGIC);
        writer.write::<u32>(0, Endian::Current);
        writer.write::<u32>(3, Endian::Current);
        writer.write::<i32>(0, Endian::Current);
        writer.write::<u16>(self.frame_duration, Endian::Current);
        writer.write::<u16>(self.bones.len() as u16, Endian::Current);
        writer.write::<u32>(u32::from(self.looping), Endian::Current);
        for bone in &self.bones {
            let entry_start = writer.tell();
            reserve_entry_name(writer, names, entry_start, &bone.bone_name);
            writer.write::<u16>(bone.visible_per_frame.len() as u16, Endian::Current);
            writer.write::<u16>(0, Endian::Current);
            for &v in &bone.visible_per_frame {
                writer.write::<u8>(u8::from(v), Endian::Current);
            }
        }
        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        r.magic(VIS0_MAGIC)?;
        let _size = r.u32()?;
        let _revision = r.u32()?;
        r.i32()?;
        let frame_duration = r.u16()?;
        let bone_count = r.u16()? as usize;
        let looping = r.u32()? != 0;
        let mut bones = Vec::with_capacity(bone_count);
        for _ in 0..bone_count {
            let entry_start = r.tell();
            let bone_name = r.string_ofs32(entry_start)?;
            let count = r.u16()? as usize;
            r.u16()?;
            let mut visible_per_frame = Vec::with_capacity(count);
            for _ in 0..count {
                visible_per_frame.push(r.u8()? != 0);
            }
            bones.push(Vis0Bone { bone_name, visible_per_frame });
        }
        Ok(Self {
            name: String::new(),
            frame_duration,
            looping,
            bones,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_pool::PoolEncoding;
    use crate::stream::Reader;

    /// Writes `chunk` through `write_fn`, then pools and resolves the name
    /// reservations it collected, mirroring how [`super::super::archive`]
    /// lays out the shared name blob after every sub-resource is written.
    fn write_with_names(write_fn: impl FnOnce(&mut Writer, &mut NamePool) -> Result<()>) -> Vec<u8> {
        let mut writer = Writer::new();
        let mut names = NamePool::new();
        write_fn(&mut writer, &mut names).unwrap();
        names.pool_names(PoolEncoding::NPrefixed);
        let pool_ofs = writer.tell();
        writer.write_bytes(names.blob());
        names.resolve(&mut writer, pool_ofs).unwrap();
        writer.take_bytes()
    }

    fn default_key_frame() -> crate::brres::keyframe::KeyFrame {
        crate::brres::keyframe::KeyFrame { frame: 0.0, value: 0.0, slope: 0.0 }
    }

    #[test]
    fn srt0_round_trips_fixed_and_animated_tracks() {
        let mut mat = SrtMaterial { material_name: "brick".into(), tex_gens: vec![SrtTexGen::default()] };
        mat.tex_gens[0].rotation = Track::Animated(KeyFrameCollection {
            step: 1.0,
            keys: vec![default_key_frame(), default_key_frame()],
        });
        let srt0 = Srt0 { name: "anim".into(), frame_duration: 30, looping: true, materials: vec![mat] };

        let bytes = write_with_names(|w, n| srt0.write(w, n));

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = Srt0::read(&mut safe, 1).unwrap();
        assert_eq!(back.frame_duration, 30);
        assert!(back.looping);
        assert_eq!(back.materials.len(), 1);
        assert_eq!(back.materials[0].material_name, "brick");
        assert!(back.materials[0].tex_gens[0].scale_u.is_fixed());
        assert!(!back.materials[0].tex_gens[0].rotation.is_fixed());
    }

    #[test]
    fn vis0_round_trips_per_frame_visibility() {
        let vis0 = Vis0 {
            name: "vis".into(),
            frame_duration: 4,
            looping: false,
            bones: vec![Vis0Bone { bone_name: "arm".into(), visible_per_frame: vec![true, true, false, true] }],
        };

        let bytes = write_with_names(|w, n| vis0.write(w, n));

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = Vis0::read(&mut safe).unwrap();
        assert_eq!(back.bones[0].bone_name, "arm");
        assert_eq!(back.bones[0].visible_per_frame, vec![true, true, false, true]);
    }

    #[test]
    fn pat0_round_trips_texture_index_keys() {
        let pat0 = Pat0 {
            name: "pat".into(),
            frame_duration: 20,
            looping: true,
            materials: vec![Pat0Material {
                material_name: "leaf".into(),
                keys: vec![PatKey { frame: 0.0, texture_index: 0 }, PatKey { frame: 10.0, texture_index: 1 }],
            }],
        };

        let bytes = write_with_names(|w, n| pat0.write(w, n));

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = Pat0::read(&mut safe).unwrap();
        assert_eq!(back.materials[0].material_name, "leaf");
        assert_eq!(back.materials[0].keys, pat0.materials[0].keys);
    }
}
