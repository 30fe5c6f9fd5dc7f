//! Write-time name deduplication with back-patched relative offsets.
//!
//! Callers reserve a name wherever they need one written (a dictionary
//! node, a BTI header, ...), writing a zero placeholder at that position.
//! Once every name in the file is known, [`NamePool::pool_names`] sorts and
//! deduplicates them into a single blob, and [`NamePool::resolve`]
//! back-patches every reservation with `(pool_ofs + string_offset) -
//! struct_pos` as a signed 32-bit delta.

use crate::endian::Endian;
use crate::error::Result;
use crate::stream::Writer;

/// Encoding used for the emitted name blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolEncoding {
    /// Each string is preceded by a big-endian `u32` length, then NUL, then
    /// padded to 4 bytes. Used by BRRES and J3D name tables.
    #[default]
    NPrefixed,
    /// Just NUL-terminated strings, no length prefix or padding.
    Bare,
}

struct Reservation {
    name: String,
    struct_pos: u32,
    write_pos: u32,
}

/// A write-time bag of name reservations.
#[derive(Default)]
pub struct NamePool {
    reservations: Vec<Reservation>,
    /// Offset of each unique name within the pooled blob, keyed by name.
    offsets: Vec<(String, u32)>,
    blob: Vec<u8>,
}

impl NamePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a name. `struct_pos` is the position of the struct that
    /// owns the offset field; `write_pos` is the position of the 4-byte
    /// placeholder itself (already written as zero by the caller).
    pub fn reserve(&mut self, name: impl Into<String>, struct_pos: u32, write_pos: u32) {
        self.reservations.push(Reservation {
            name: name.into(),
            struct_pos,
            write_pos,
        });
    }

    /// Sort, deduplicate, and build the blob. Must be called before
    /// [`NamePool::resolve`].
    pub fn pool_names(&mut self, encoding: PoolEncoding) {
        let mut names: Vec<&str> = self.reservations.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();

        self.blob.clear();
        self.offsets.clear();
        for name in names {
            let offset = self.blob.len() as u32;
            self.offsets.push((name.to_string(), offset));
            if encoding == PoolEncoding::NPrefixed {
                self.blob.extend_from_slice(&(name.len() as u32).to_be_bytes());
            }
            self.blob.extend_from_slice(name.as_bytes());
            self.blob.push(0);
            if encoding == PoolEncoding::NPrefixed {
                while self.blob.len() % 4 != 0 {
                    self.blob.push(0);
                }
            }
        }
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Offset of `name` within the pooled blob, once [`Self::pool_names`]
    /// has run. Used by callers that need to compute an unsigned,
    /// table-relative offset themselves instead of going through
    /// [`Self::resolve`]'s signed struct-relative delta.
    pub fn blob_offset_of(&self, name: &str) -> Option<u32> {
        self.offsets.iter().find(|(n, _)| n == name).map(|(_, ofs)| *ofs)
    }

    fn offset_of(&self, name: &str) -> u32 {
        self.offsets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ofs)| *ofs)
            .expect("pool_names must run before resolve")
    }

    /// Back-patch every reservation now that the pool itself has been
    /// written at `pool_ofs`.
    pub fn resolve(&mut self, writer: &mut Writer, pool_ofs: u32) -> Result<()> {
        for reservation in &self.reservations {
            let string_offset = self.offset_of(&reservation.name);
            let delta = (pool_ofs + string_offset) as i64 - reservation.struct_pos as i64;
            writer.write_at::<i32>(delta as i32, reservation.write_pos, Endian::Current);
        }
        self.reservations.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_repeated_names() {
        let mut pool = NamePool::new();
        pool.reserve("a", 0, 4);
        pool.reserve("bb", 0, 8);
        pool.reserve("a", 0, 12);
        pool.reserve("ccc", 0, 16);
        pool.pool_names(PoolEncoding::NPrefixed);
        assert_eq!(pool.offsets.len(), 3);

        let mut writer = Writer::new();
        writer.reserve_next(20);
        pool.resolve(&mut writer, 20).unwrap();

        let bytes = writer.take_bytes();
        let read_s32 = |pos: usize| i32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap());
        let a1 = read_s32(4);
        let a2 = read_s32(12);
        assert_eq!(a1, a2, "both reservations of \"a\" resolve to the same offset");
    }

    #[test]
    fn bare_encoding_has_no_length_prefix() {
        let mut pool = NamePool::new();
        pool.reserve("hi", 0, 0);
        pool.pool_names(PoolEncoding::Bare);
        assert_eq!(pool.blob(), b"hi\0");
    }
}
