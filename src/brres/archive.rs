//! The BRRES/G3D top-level container: a `bres` header, a root dictionary
//! naming each resource-kind folder, a per-folder dictionary naming its
//! sub-resources, then the sub-resources themselves in fixed folder order,
//! trailed by the archive's shared name pool.
//!
//! Folder dictionaries and the resources they name are written as two
//! separate passes: dictionary space is reserved (its byte size is
//! deterministic from the entry count alone) before any resource is
//! written, then filled in once every resource's start position is known.
//! This mirrors [`crate::j3d::bmd`]'s fixed-order section emission, just
//! with a name-indexed directory in front of each group instead of a flat
//! sequence.

use crate::brres::anim::{Chr0, Clr0, Pat0, Srt0, Vis0};
use crate::brres::model::Mdl0;
use crate::brres::texture::Texture0;
use crate::brres_dict::Dictionary;
use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::name_pool::{NamePool, PoolEncoding};
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

const MAGIC: &[u8; 4] = b"bres";
const BOM: u16 = 0xfeff;
const DATA_OFS: u16 = 0x10;

/// The number of GX texture-coordinate generators a material may use.
/// SRT0's per-material enabled-bitmask packs 5 bits per tex-gen slot but
/// the stream itself never records how many slots a given material
/// occupies, so the reader falls back to hardware's fixed maximum.
const MAX_TEX_GENS: usize = 8;

const FOLDER_MODELS: &str = "3DModels(NW4R)";
const FOLDER_TEXTURES: &str = "Textures(NW4R)";
const FOLDER_CHR0: &str = "AnmChr(NW4R)";
const FOLDER_CLR0: &str = "AnmClr(NW4R)";
const FOLDER_PAT0: &str = "AnmTexPat(NW4R)";
const FOLDER_SRT0: &str = "AnmTexSrt(NW4R)";
const FOLDER_VIS0: &str = "AnmVis(NW4R)";

/// A complete BRRES archive held in memory: every resource folder this
/// core understands, keyed by each resource's own `name` field.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    pub models: Vec<Mdl0>,
    pub textures: Vec<Texture0>,
    pub chr0: Vec<Chr0>,
    pub clr0: Vec<Clr0>,
    pub pat0: Vec<Pat0>,
    pub srt0: Vec<Srt0>,
    pub vis0: Vec<Vis0>,
}

fn dict_byte_size(entry_count: usize) -> u32 {
    8 + 16 * (entry_count as u32 + 1)
}

pub fn write(archive: &Archive) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    let mut names = NamePool::new();

    writer.write_bytes(MAGIC);
    writer.write::<u16>(BOM, Endian::Current);
    writer.write::<u16>(0, Endian::Current); // revision
    let file_size_field = writer.tell();
    writer.write::<u32>(0, Endian::Current); // file_size placeholder
    writer.write::<u16>(DATA_OFS, Endian::Current);
    let section_count_field = writer.tell();
    writer.write::<u16>(0, Endian::Current); // section_count placeholder
    debug_assert_eq!(writer.tell(), DATA_OFS as u32);

    let folder_counts = [
        (FOLDER_MODELS, archive.models.len()),
        (FOLDER_TEXTURES, archive.textures.len()),
        (FOLDER_CHR0, archive.chr0.len()),
        (FOLDER_CLR0, archive.clr0.len()),
        (FOLDER_PAT0, archive.pat0.len()),
        (FOLDER_SRT0, archive.srt0.len()),
        (FOLDER_VIS0, archive.vis0.len()),
    ];
    let active_folders: Vec<(&str, usize)> = folder_counts.into_iter().filter(|(_, n)| *n > 0).collect();
    writer.write_at::<u16>(active_folders.len() as u16 + 1, section_count_field, Endian::Current);

    writer.write_bytes(b"root");
    let root_dict_size = dict_byte_size(active_folders.len());
    writer.write::<u32>(8 + root_dict_size, Endian::Current);
    let root_dict_start = writer.reserve_next(root_dict_size);

    let mut folder_dict_reserved = Vec::with_capacity(active_folders.len());
    for (name, count) in &active_folders {
        let pos = writer.reserve_next(dict_byte_size(*count));
        folder_dict_reserved.push((*name, pos));
    }

    let mut model_entries = Vec::with_capacity(archive.models.len());
    for model in &archive.models {
        writer.align_to(32);
        let start = writer.tell();
        model.write(&mut writer, &mut names)?;
        model_entries.push((model.name.clone(), start));
    }

    let mut texture_entries = Vec::with_capacity(archive.textures.len());
    for tex in &archive.textures {
        writer.align_to(32);
        let start = writer.tell();
        tex.write(&mut writer, &mut names)?;
        texture_entries.push((tex.name.clone(), start));
    }

    let mut chr0_entries = Vec::with_capacity(archive.chr0.len());
    for chr0 in &archive.chr0 {
        writer.align_to(4);
        let start = writer.tell();
        chr0.write(&mut writer, &mut names)?;
        chr0_entries.push((chr0.name.clone(), start));
    }

    let mut clr0_entries = Vec::with_capacity(archive.clr0.len());
    for clr0 in &archive.clr0 {
        writer.align_to(4);
        let start = writer.tell();
        clr0.write(&mut writer, &mut names)?;
        clr0_entries.push((clr0.name.clone(), start));
    }

    let mut pat0_entries = Vec::with_capacity(archive.pat0.len());
    for pat0 in &archive.pat0 {
        writer.align_to(4);
        let start = writer.tell();
        pat0.write(&mut writer, &mut names)?;
        pat0_entries.push((pat0.name.clone(), start));
    }

    // SRT0 carries no internal alignment padding between entries per the
    // container's item-alignment table.
    let mut srt0_entries = Vec::with_capacity(archive.srt0.len());
    for srt0 in &archive.srt0 {
        let start = writer.tell();
        srt0.write(&mut writer, &mut names)?;
        srt0_entries.push((srt0.name.clone(), start));
    }

    let mut vis0_entries = Vec::with_capacity(archive.vis0.len());
    for vis0 in &archive.vis0 {
        writer.align_to(4);
        let start = writer.tell();
        vis0.write(&mut writer, &mut names)?;
        vis0_entries.push((vis0.name.clone(), start));
    }

    let content_end = writer.tell();

    let all_folders: [(&str, Vec<(String, u32)>); 7] = [
        (FOLDER_MODELS, model_entries),
        (FOLDER_TEXTURES, texture_entries),
        (FOLDER_CHR0, chr0_entries),
        (FOLDER_CLR0, clr0_entries),
        (FOLDER_PAT0, pat0_entries),
        (FOLDER_SRT0, srt0_entries),
        (FOLDER_VIS0, vis0_entries),
    ];
    let populated_folders: Vec<&(&str, Vec<(String, u32)>)> = all_folders.iter().filter(|(_, entries)| !entries.is_empty()).collect();

    let mut root_entries = Vec::with_capacity(folder_dict_reserved.len());
    for ((folder_name, dict_pos), (_, entries)) in folder_dict_reserved.iter().zip(populated_folders.iter()) {
        let mut dict = Dictionary::new();
        for (name, pos) in entries {
            dict.insert(name.clone(), *pos);
        }
        writer.seek_set(*dict_pos);
        dict.write(&mut writer, &mut names)?;
        root_entries.push((folder_name.to_string(), *dict_pos));
    }

    let mut root_dict = Dictionary::new();
    for (name, pos) in &root_entries {
        root_dict.insert(name.clone(), *pos);
    }
    writer.seek_set(root_dict_start);
    root_dict.write(&mut writer, &mut names)?;

    writer.seek_set(content_end);
    names.pool_names(PoolEncoding::NPrefixed);
    let pool_ofs = writer.tell();
    writer.write_bytes(names.blob());
    names.resolve(&mut writer, pool_ofs)?;

    writer.align_to(128);
    let total_size = writer.tell();
    writer.write_at::<u32>(total_size, file_size_field, Endian::Current);

    Ok(writer.take_bytes())
}

pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Archive> {
    let start = r.tell();
    r.magic(MAGIC)?;
    let bom = r.u16()?;
    if bom != BOM {
        return Err(Error::DecodeError(format!("bres: unexpected byte-order-mark 0x{bom:04x}")));
    }
    let _revision = r.u16()?;
    let _file_size = r.u32()?;
    let data_ofs = r.u16()?;
    let _section_count = r.u16()?;

    r.seek_set(start + data_ofs as u32);
    r.magic(b"root")?;
    let _root_size = r.u32()?;
    let root_dict = Dictionary::read(r)?;

    let mut archive = Archive::default();
    for folder in root_dict.entries() {
        let Some(folder_pos) = folder.data_pos else { continue };
        if let Err(e) = read_folder(r, folder_pos, &folder.name, &mut archive) {
            r.reader_mut().warn_at(&format!("bres: folder '{}' failed to decode: {e}", folder.name), folder_pos, folder_pos);
        }
    }
    Ok(archive)
}

fn read_folder<D: Diagnostics>(r: &mut SafeReader<'_, D>, folder_pos: u32, folder_name: &str, archive: &mut Archive) -> Result<()> {
    r.seek_set(folder_pos);
    let folder_dict = Dictionary::read(r)?;

    for sub in folder_dict.entries() {
        let Some(pos) = sub.data_pos else { continue };
        r.seek_set(pos);
        match folder_name {
            FOLDER_MODELS => archive.models.push(Mdl0::read(r)?),
            FOLDER_TEXTURES => archive.textures.push(Texture0::read(r)?),
            FOLDER_CHR0 => {
                let mut chr0 = Chr0::read(r)?;
                chr0.name = sub.name.clone();
                archive.chr0.push(chr0);
            }
            FOLDER_CLR0 => {
                let mut clr0 = Clr0::read(r)?;
                clr0.name = sub.name.clone();
                archive.clr0.push(clr0);
            }
            FOLDER_PAT0 => {
                let mut pat0 = Pat0::read(r)?;
                pat0.name = sub.name.clone();
                archive.pat0.push(pat0);
            }
            FOLDER_SRT0 => {
                let mut srt0 = Srt0::read(r, MAX_TEX_GENS)?;
                srt0.name = sub.name.clone();
                archive.srt0.push(srt0);
            }
            FOLDER_VIS0 => {
                let mut vis0 = Vis0::read(r)?;
                vis0.name = sub.name.clone();
                archive.vis0.push(vis0);
            }
            other => r.reader_mut().warn_at(&format!("bres: unknown folder '{other}'"), pos, pos),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brres::keyframe::Track;
    use crate::diagnostics::NullDiagnostics;
    use crate::j3d::model::{J3dModel, Joint};
    use crate::stream::Reader;

    fn one_joint_model(name: &str) -> J3dModel {
        let mut model = J3dModel::new(name);
        model.joints.push(Joint::new("root"));
        model
    }

    #[test]
    fn round_trips_model_and_texture_folders() {
        let mut archive = Archive::default();
        archive.models.push(Mdl0::from_model(&one_joint_model("mymodel")));
        archive.textures.push(Texture0 {
            name: "mytex".into(),
            format: crate::j3d::texture::ImageFormat::CMPR,
            width: 32,
            height: 32,
            mipmap_count: 1,
            min_lod: 0.0,
            max_lod: 0.0,
            data: vec![0u8; 512],
        });

        let bytes = write(&archive).unwrap();

        let mut reader = Reader::with_diagnostics(bytes, NullDiagnostics);
        let mut safe = SafeReader::new(&mut reader);
        let back = read(&mut safe).unwrap();

        assert_eq!(back.models.len(), 1);
        assert_eq!(back.models[0].name, "mymodel");
        assert_eq!(back.textures.len(), 1);
        assert_eq!(back.textures[0].name, "mytex");
    }

    #[test]
    fn round_trips_vis0_folder_with_dictionary_naming() {
        let mut archive = Archive::default();
        archive.vis0.push(Vis0 {
            name: "visibility".into(),
            frame_duration: 10,
            looping: false,
            bones: vec![crate::brres::anim::Vis0Bone { bone_name: "leaf".into(), visible_per_frame: vec![true, false] }],
        });

        let bytes = write(&archive).unwrap();
        let mut reader = Reader::with_diagnostics(bytes, NullDiagnostics);
        let mut safe = SafeReader::new(&mut reader);
        let back = read(&mut safe).unwrap();

        assert_eq!(back.vis0.len(), 1);
        assert_eq!(back.vis0[0].name, "visibility");
        assert_eq!(back.vis0[0].bones[0].bone_name, "leaf");
    }

    #[test]
    fn empty_archive_round_trips_to_no_folders() {
        let archive = Archive::default();
        let bytes = write(&archive).unwrap();
        let mut reader = Reader::with_diagnostics(bytes, NullDiagnostics);
        let mut safe = SafeReader::new(&mut reader);
        let back = read(&mut safe).unwrap();
        assert!(back.models.is_empty());
        assert!(back.vis0.is_empty());
    }

    #[test]
    fn srt0_tex_gen_slot_constant_covers_gx_maximum() {
        assert_eq!(MAX_TEX_GENS, 8);
        let _ = Track::Fixed(0.0);
    }
}
