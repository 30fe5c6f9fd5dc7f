//! BRRES dictionary: a balanced binary tree mapping short names to stream
//! positions, with deterministic tree shape derived from a per-byte
//! high-bit differentiation algorithm (the same one `wszst`/NW4R tools
//! use).

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::name_pool::NamePool;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

/// One node of a [`Dictionary`]. Index 0 of the owning vector is always the
/// sentinel root (`id = 0xffff`, empty name, no data).
#[derive(Debug, Clone)]
pub struct DictNode {
    pub name: String,
    pub id: u16,
    pub flag: u16,
    pub idx_prev: u16,
    pub idx_next: u16,
    /// Absolute stream position of the referenced data. `None` for the
    /// sentinel root.
    pub data_pos: Option<u32>,
}

impl DictNode {
    fn sentinel() -> Self {
        Self {
            name: String::new(),
            id: 0xffff,
            flag: 0,
            idx_prev: 0,
            idx_next: 0,
            data_pos: None,
        }
    }
}

/// A BRRES directory: a balanced binary tree over a name set, always
/// headed by a sentinel root node.
#[derive(Debug, Clone)]
pub struct Dictionary {
    nodes: Vec<DictNode>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            nodes: vec![DictNode::sentinel()],
        }
    }

    /// Register an entry. `data_pos` is the absolute stream position the
    /// entry refers to; it must already be known (dictionaries are filled
    /// in only after every sub-resource has been written).
    pub fn insert(&mut self, name: impl Into<String>, data_pos: u32) {
        self.nodes.push(DictNode {
            name: name.into(),
            id: 0,
            flag: 0,
            idx_prev: 0,
            idx_next: 0,
            data_pos: Some(data_pos),
        });
    }

    /// Number of real entries (excludes the sentinel root).
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in insertion order, skipping the sentinel root.
    pub fn entries(&self) -> impl Iterator<Item = &DictNode> {
        self.nodes[1..].iter()
    }

    pub fn find(&self, name: &str) -> Option<&DictNode> {
        self.entries().find(|n| n.name == name)
    }

    /// Byte size this dictionary will occupy once written:
    /// `8 + 16 * (entry_count + 1)`.
    pub fn byte_size(&self) -> u32 {
        8 + 16 * self.nodes.len() as u32
    }

    fn build_tree(&mut self) {
        self.nodes[0].id = 0xffff;
        self.nodes[0].idx_prev = 0;
        self.nodes[0].idx_next = 0;
        for i in 0..self.nodes.len() {
            calc_node(&mut self.nodes, i);
        }
    }

    /// Lay out the balanced tree and write it. `names` receives a
    /// reservation for every non-empty entry name; its pool must be
    /// resolved later by the caller once the shared name blob position is
    /// known.
    pub fn write(&mut self, writer: &mut Writer, names: &mut NamePool) -> Result<()> {
        self.build_tree();

        let group_start = writer.tell();
        writer.write::<u32>(0, Endian::Current); // total_size placeholder
        writer.write::<u32>((self.nodes.len() - 1) as u32, Endian::Current);

        for node in &self.nodes {
            writer.write::<u16>(node.id, Endian::Current);
            writer.write::<u16>(node.flag, Endian::Current);
            writer.write::<u16>(node.idx_prev, Endian::Current);
            writer.write::<u16>(node.idx_next, Endian::Current);

            if node.name.is_empty() {
                writer.write::<u32>(0, Endian::Current);
            } else {
                let write_pos = writer.tell();
                writer.write::<u32>(0, Endian::Current);
                names.reserve(node.name.clone(), group_start, write_pos);
            }

            let rel = match node.data_pos {
                Some(pos) if pos != group_start => pos as i32 - group_start as i32,
                _ => 0,
            };
            writer.write::<i32>(rel, Endian::Current);
        }

        let total_size = writer.tell() - group_start;
        writer.write_at::<u32>(total_size, group_start, Endian::Current);
        Ok(())
    }

    /// Parse a dictionary at the reader's current position.
    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        let group_start = r.tell();
        let total_size = r.u32()?;
        let n_entries = r.u32()?;

        let mut nodes = Vec::with_capacity(n_entries as usize + 1);
        for _ in 0..=n_entries {
            let id = r.u16()?;
            let flag = r.u16()?;
            let idx_prev = r.u16()?;
            let idx_next = r.u16()?;
            let name = r.string_ofs32(group_start)?;
            let rel = r.i32()?;
            let data_pos = if rel == 0 {
                None
            } else {
                Some((group_start as i64 + rel as i64) as u32)
            };
            nodes.push(DictNode {
                name,
                id,
                flag,
                idx_prev,
                idx_next,
                data_pos,
            });
        }

        let expected = 8 + 16 * (n_entries + 1);
        if total_size != expected {
            return Err(Error::DecodeError(format!(
                "dictionary total_size {total_size} does not match computed size {expected}"
            )));
        }

        Ok(Self { nodes })
    }
}

fn highest_bit(mut val: u8) -> u16 {
    let mut i: u16 = 7;
    while i > 0 && val & 0x80 == 0 {
        i -= 1;
        val <<= 1;
    }
    i
}

/// `wszst`'s key-bit algorithm: the bit position (byte index << 3 | bit
/// index) of the first byte at which `object` and `subject` differ, walked
/// from the end.
fn calc_brres_id(object: &[u8], subject: &[u8]) -> u16 {
    if object.len() < subject.len() {
        return (((subject.len() - 1) as u16) << 3) | highest_bit(subject[subject.len() - 1]);
    }
    let mut idx = subject.len();
    while idx > 0 {
        idx -= 1;
        let ch = object[idx] ^ subject[idx];
        if ch != 0 {
            return ((idx as u16) << 3) | highest_bit(ch);
        }
    }
    0xffff
}

fn calc_id_bit(name: &[u8], id: u16) -> bool {
    let char_idx = (id >> 3) as usize;
    char_idx < name.len() && (name[char_idx] >> (id & 7)) & 1 != 0
}

fn calc_node(nodes: &mut [DictNode], entry_idx: usize) {
    let entry_name = nodes[entry_idx].name.clone();
    let mut entry_id = calc_brres_id(&[], entry_name.as_bytes());
    nodes[entry_idx].id = entry_id;
    nodes[entry_idx].idx_prev = entry_idx as u16;
    nodes[entry_idx].idx_next = entry_idx as u16;

    let mut prev_idx = 0usize;
    let mut current_idx = nodes[0].idx_prev as usize;
    let mut is_right = false;

    while entry_id <= nodes[current_idx].id && nodes[current_idx].id < nodes[prev_idx].id {
        if entry_id == nodes[current_idx].id {
            let current_name = nodes[current_idx].name.clone();
            entry_id = calc_brres_id(current_name.as_bytes(), entry_name.as_bytes());
            nodes[entry_idx].id = entry_id;
            if calc_id_bit(current_name.as_bytes(), entry_id) {
                nodes[entry_idx].idx_prev = entry_idx as u16;
                nodes[entry_idx].idx_next = current_idx as u16;
            } else {
                nodes[entry_idx].idx_prev = current_idx as u16;
                nodes[entry_idx].idx_next = entry_idx as u16;
            }
        }

        prev_idx = current_idx;
        is_right = calc_id_bit(entry_name.as_bytes(), nodes[current_idx].id);
        current_idx = if is_right {
            nodes[current_idx].idx_next as usize
        } else {
            nodes[current_idx].idx_prev as usize
        };
    }

    let current_name = nodes[current_idx].name.clone();
    if current_name.len() == entry_name.len() && calc_id_bit(current_name.as_bytes(), entry_id) {
        nodes[entry_idx].idx_next = current_idx as u16;
    } else {
        nodes[entry_idx].idx_prev = current_idx as u16;
    }

    if is_right {
        nodes[prev_idx].idx_next = entry_idx as u16;
    } else {
        nodes[prev_idx].idx_prev = entry_idx as u16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_pool::PoolEncoding;
    use crate::stream::Reader;

    #[test]
    fn single_entry_dictionary_matches_expected_layout() {
        let mut dict = Dictionary::new();
        dict.insert("foo", 0x1000);

        let mut writer = Writer::new();
        let mut names = NamePool::new();
        dict.write(&mut writer, &mut names).unwrap();
        names.pool_names(PoolEncoding::NPrefixed);
        let pool_ofs = writer.tell();
        writer.write_bytes(names.blob());
        names.resolve(&mut writer, pool_ofs).unwrap();

        let bytes = writer.take_bytes();
        let total_size = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        let entry_count = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(total_size, 0x28);
        assert_eq!(entry_count, 1);

        // sentinel root
        assert_eq!(&bytes[8..16], &[0xff, 0xff, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn round_trips_through_read() {
        let mut dict = Dictionary::new();
        dict.insert("alpha", 0x40);
        dict.insert("beta", 0x80);
        dict.insert("gamma", 0xc0);

        let mut writer = Writer::new();
        let mut names = NamePool::new();
        dict.write(&mut writer, &mut names).unwrap();
        names.pool_names(PoolEncoding::NPrefixed);
        let pool_ofs = writer.tell();
        writer.write_bytes(names.blob());
        names.resolve(&mut writer, pool_ofs).unwrap();

        let bytes = writer.take_bytes();
        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let read_back = Dictionary::read(&mut safe).unwrap();

        let mut got: Vec<_> = read_back.entries().map(|e| e.name.clone()).collect();
        got.sort();
        assert_eq!(got, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn determinism_same_names_same_order_same_tree() {
        let names = ["zeta", "alpha", "nu", "beta"];
        let build = || {
            let mut dict = Dictionary::new();
            for (i, n) in names.iter().enumerate() {
                dict.insert(*n, i as u32 * 4);
            }
            dict.build_tree();
            dict.nodes.clone()
        };
        let a = build();
        let b = build();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.idx_prev, y.idx_prev);
            assert_eq!(x.idx_next, y.idx_next);
        }
    }
}
