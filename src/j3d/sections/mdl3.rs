//! MDL3: a BDL-only section holding a precomputed display-list-optimization
//! cache (GX command lists the runtime can upload directly instead of
//! reinterpreting MAT3/SHP1 state each frame). The data is opaque to this
//! crate — there is no portable way to regenerate it without the target
//! runtime's exact command-list compiler — so it is kept as an opaque,
//! byte-exact blob that round-trips untouched through BDL files.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::Result;
use crate::j3d::sections::read_section_header;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

const MAGIC: &[u8; 4] = b"MDL3";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mdl3 {
    pub raw: Vec<u8>,
}

impl Mdl3 {
    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(MAGIC);
        writer.write::<u32>(0, Endian::Current);
        writer.write_bytes(&self.raw);
        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        let start = r.tell();
        let size = read_section_header(r, MAGIC)?;
        let raw = r.reader_mut().read_bytes((size - 8) as usize)?;
        let _ = start;
        Ok(Self { raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_opaque_payload() {
        let mdl3 = Mdl3 { raw: vec![1, 2, 3, 4, 5, 6, 7, 8] };
        let mut writer = Writer::new();
        mdl3.write(&mut writer).unwrap();
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = Mdl3::read(&mut safe).unwrap();
        assert_eq!(back, mdl3);
    }
}
