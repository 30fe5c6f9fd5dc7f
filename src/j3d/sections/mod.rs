//! J3D section codecs. Each section is a self-contained, 4-byte-aligned
//! chunk inside a BMD/BDL file: a 4-byte magic, a `u32` byte size covering
//! the whole chunk (magic included), and section-specific content.

pub mod evp1_drw1;
pub mod jnt1;
pub mod mat3;
pub mod mat3_pools;
pub mod mdl3;
pub mod shp1;
pub mod tex1;
pub mod vtx1;

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::safe_reader::SafeReader;

/// Validate a section's 4-byte magic and return the declared chunk size.
pub(crate) fn read_section_header<D: Diagnostics>(
    r: &mut SafeReader<'_, D>,
    expected_magic: &'static [u8; 4],
) -> Result<u32> {
    r.magic(expected_magic)?;
    let size = r.u32()?;
    if size < 8 {
        return Err(Error::DecodeError(format!(
            "section {:?} declares impossible size {size}",
            std::str::from_utf8(expected_magic).unwrap_or("????")
        )));
    }
    Ok(size)
}
