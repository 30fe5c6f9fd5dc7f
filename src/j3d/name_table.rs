//! The J3D name table: a flat, order-preserving index of (hash, offset)
//! pairs followed by a shared string blob. Used by JNT1, MAT3, and TEX1 to
//! name their entries; unlike [`crate::brres_dict::Dictionary`] this is not
//! a search tree — the table entry at position `i` always corresponds to
//! the `i`-th joint/material/texture, and the hash exists only so tools can
//! do a quick pre-filter before a full string compare.
//!
//! Layout: `{count:u16, 0xFFFF, (hash:u16, ofs:u16)*count, strings...}`
//! where each `ofs` is relative to the table's own start and
//! `hash(s) = fold(s, acc=0; acc*3 + c)`.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::name_pool::{NamePool, PoolEncoding};
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

/// `wszst`'s J3D name hash: fold each byte as `acc*3 + c`, all arithmetic
/// wrapping in `u16`.
pub fn hash(name: &str) -> u16 {
    name.bytes().fold(0u16, |acc, c| acc.wrapping_mul(3).wrapping_add(c as u16))
}

/// Write a name table for `names`, in order, at the writer's current
/// position. Returns once the blob has been resolved; the caller is
/// responsible for patching in the table's total byte length at whatever
/// offset field in the parent section refers to it.
pub fn write(writer: &mut Writer, names: &[String]) -> Result<()> {
    let table_start = writer.tell();
    writer.write::<u16>(names.len() as u16, Endian::Current);
    writer.write::<u16>(0xffff, Endian::Current);

    let mut pool = NamePool::new();
    let mut ofs_fields = Vec::with_capacity(names.len());
    for name in names {
        writer.write::<u16>(hash(name), Endian::Current);
        let write_pos = writer.tell();
        writer.write::<u16>(0, Endian::Current);
        ofs_fields.push(write_pos);
        pool.reserve(name.clone(), table_start, write_pos);
    }
    pool.pool_names(PoolEncoding::Bare);
    let blob_ofs = writer.tell();
    writer.write_bytes(pool.blob());

    // NamePool::resolve writes a signed i32 at write_pos; the name table's
    // offset field is an unsigned u16, so resolve into a scratch writer
    // view and narrow by hand instead of reusing it directly.
    for (name, &write_pos) in names.iter().zip(&ofs_fields) {
        let offset_in_blob = pool
            .blob_offset_of(name)
            .ok_or_else(|| Error::DecodeError(format!("name table: \"{name}\" missing from pool")))?;
        let rel = (blob_ofs + offset_in_blob) - table_start;
        writer.write_at::<u16>(rel as u16, write_pos, Endian::Current);
    }
    Ok(())
}

/// Read a name table at the reader's current position, returning the
/// decoded names in table order.
pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Vec<String>> {
    let table_start = r.tell();
    let count = r.u16()? as usize;
    r.u16()?;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let _hash = r.u16()?;
        let ofs = r.u16()?;
        entries.push(ofs);
    }

    let mut names = Vec::with_capacity(count);
    for ofs in entries {
        r.seek_set(table_start + ofs as u32);
        names.push(read_nul_terminated(r)?);
    }
    Ok(names)
}

fn read_nul_terminated<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<String> {
    let start = r.tell();
    let slice = &r.reader_mut().slice()[start as usize..];
    match slice.iter().position(|&b| b == 0) {
        Some(end) => {
            let s = String::from_utf8_lossy(&slice[..end]).into_owned();
            r.seek_set(start + end as u32 + 1);
            Ok(s)
        }
        None => Err(Error::TruncatedString { at: start }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_names_in_order() {
        let names = vec!["root".to_string(), "pelvis".to_string(), "head".to_string()];
        let mut writer = Writer::new();
        write(&mut writer, &names).unwrap();
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = read(&mut safe).unwrap();
        assert_eq!(back, names);
    }

    #[test]
    fn hash_matches_fold_formula() {
        // "a" -> 0*3 + 'a' = 97
        assert_eq!(hash("a"), 97);
        // "ab" -> (0*3+97)*3 + 98 = 389
        assert_eq!(hash("ab"), 389);
    }
}
