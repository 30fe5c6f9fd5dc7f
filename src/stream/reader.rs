//! Endian-aware bounded byte reader.

use crate::diagnostics::{Diagnostic, Diagnostics, StderrDiagnostics};
use crate::endian::{Endian, EndianPackable};
use crate::error::{Error, Result, StreamOp};

use super::breakpoints::BreakpointSet;

/// A contiguous byte buffer with a position cursor and an endian.
///
/// Invariant: `0 <= position <= length`. Reads past `length` fail; the
/// reader never grows its buffer.
pub struct Reader<D: Diagnostics = StderrDiagnostics> {
    buf: Vec<u8>,
    pos: u32,
    big_endian: bool,
    breakpoints: BreakpointSet,
    region_stack: Vec<String>,
    diagnostics: D,
}

impl Reader<StderrDiagnostics> {
    /// Build a reader over `buf`, big-endian by default (the orientation
    /// every format this crate speaks uses).
    pub fn new(buf: Vec<u8>) -> Self {
        Self::with_diagnostics(buf, StderrDiagnostics)
    }
}

impl<D: Diagnostics> Reader<D> {
    pub fn with_diagnostics(buf: Vec<u8>, diagnostics: D) -> Self {
        Self {
            buf,
            pos: 0,
            big_endian: true,
            breakpoints: BreakpointSet::new(),
            region_stack: Vec::new(),
            diagnostics,
        }
    }

    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.big_endian = big_endian;
    }

    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    pub fn breakpoints_mut(&mut self) -> &mut BreakpointSet {
        &mut self.breakpoints
    }

    pub fn tell(&self) -> u32 {
        self.pos
    }

    pub fn end_pos(&self) -> u32 {
        self.buf.len() as u32
    }

    pub fn slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn seek_set(&mut self, pos: u32) {
        self.pos = pos;
    }

    pub fn skip(&mut self, delta: i32) {
        self.pos = (self.pos as i64 + delta as i64).max(0) as u32;
    }

    fn check_bounds(&self, op: StreamOp, at: u32, size: u32) -> Result<()> {
        if at.checked_add(size).is_none_or(|end| end > self.end_pos()) {
            return Err(Error::OutOfBounds {
                op,
                at,
                needed: size,
                available: self.end_pos().saturating_sub(at),
            });
        }
        Ok(())
    }

    fn check_alignment(&self, at: u32, align: u32, unaligned: bool) -> Result<()> {
        if !unaligned && align > 1 && at % align != 0 {
            return Err(Error::Misaligned { at, align });
        }
        Ok(())
    }

    fn check_breakpoints(&mut self, start: u32, end: u32) {
        if let Some(range) = self.breakpoints.hit(start, end) {
            self.diagnostics.report(Diagnostic {
                message: format!(
                    "breakpoint hit: access [0x{start:x}, 0x{end:x}) overlaps [0x{:x}, 0x{:x})",
                    range.start, range.end
                ),
                region_stack: self.region_stack.clone(),
            });
            debug_assert!(false, "breakpoint trapped");
        }
    }

    fn endian_for(&self, select: Endian) -> bool {
        match select {
            Endian::Current => self.big_endian,
            Endian::Big => true,
            Endian::Little => false,
        }
    }

    /// Read a value of type `T` at the current position, advancing on
    /// success only.
    pub fn read<T: EndianPackable>(&mut self, select: Endian, unaligned: bool) -> Result<T> {
        let at = self.pos;
        let size = T::SIZE as u32;
        self.check_bounds(StreamOp::Read, at, size)?;
        self.check_alignment(at, size, unaligned)?;
        self.check_breakpoints(at, at + size);
        let big_endian = self.endian_for(select);
        let val = T::unpack(&self.buf[at as usize..], big_endian);
        self.pos = at + size;
        Ok(val)
    }

    /// Read a value at `abs_pos` without advancing the cursor.
    pub fn peek_at<T: EndianPackable>(
        &mut self,
        abs_pos: u32,
        select: Endian,
        unaligned: bool,
    ) -> Result<T> {
        let size = T::SIZE as u32;
        self.check_bounds(StreamOp::Peek, abs_pos, size)?;
        self.check_alignment(abs_pos, size, unaligned)?;
        self.check_breakpoints(abs_pos, abs_pos + size);
        let big_endian = self.endian_for(select);
        Ok(T::unpack(&self.buf[abs_pos as usize..], big_endian))
    }

    /// Bulk-read `count` values of `T` starting at the current position.
    /// Bounds and alignment are checked once for the whole region.
    pub fn read_buffer<T: EndianPackable>(
        &mut self,
        count: usize,
        select: Endian,
        unaligned: bool,
    ) -> Result<Vec<T>> {
        self.read_buffer_at(count, self.pos, select, unaligned).inspect(|_| {
            self.pos += T::SIZE as u32 * count as u32;
        })
    }

    /// Bulk-read `count` values of `T` starting at `pos`, without moving
    /// the reader's own cursor.
    pub fn read_buffer_at<T: EndianPackable>(
        &mut self,
        count: usize,
        pos: u32,
        select: Endian,
        unaligned: bool,
    ) -> Result<Vec<T>> {
        let total = T::SIZE as u32 * count as u32;
        self.check_bounds(StreamOp::Read, pos, total)?;
        self.check_alignment(pos, T::SIZE as u32, unaligned)?;
        self.check_breakpoints(pos, pos + total);
        let big_endian = self.endian_for(select);
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let at = pos as usize + i * T::SIZE;
            out.push(T::unpack(&self.buf[at..], big_endian));
        }
        Ok(out)
    }

    /// Read `len` raw bytes at the current position.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let at = self.pos;
        self.check_bounds(StreamOp::Read, at, len as u32)?;
        self.check_breakpoints(at, at + len as u32);
        let out = self.buf[at as usize..at as usize + len].to_vec();
        self.pos = at + len as u32;
        Ok(out)
    }

    /// Push a debug region frame. The returned guard reports the enclosing
    /// region in any diagnostic emitted while it is alive, and pops itself
    /// on every exit path (including early returns via `?`).
    pub fn scoped_region(&mut self, name: impl Into<String>) -> ScopedRegion<'_, D> {
        self.region_stack.push(name.into());
        ScopedRegion { reader: self }
    }

    /// Emit a hex-dump diagnostic for `[begin, end)` plus the current
    /// region stack trace.
    pub fn warn_at(&mut self, msg: &str, begin: u32, end: u32) {
        let begin_u = begin as usize;
        let end_u = (end as usize).min(self.buf.len());
        let hex = self
            .buf
            .get(begin_u..end_u)
            .map(|s| s.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        self.diagnostics.report(Diagnostic {
            message: format!("{msg} at [0x{begin:x}, 0x{end:x}): {hex}"),
            region_stack: self.region_stack.clone(),
        });
    }
}

/// RAII guard returned by [`Reader::scoped_region`].
pub struct ScopedRegion<'a, D: Diagnostics> {
    reader: &'a mut Reader<D>,
}

impl<D: Diagnostics> Drop for ScopedRegion<'_, D> {
    fn drop(&mut self) {
        self.reader.region_stack.pop();
    }
}

impl<D: Diagnostics> std::ops::Deref for ScopedRegion<'_, D> {
    type Target = Reader<D>;
    fn deref(&self) -> &Reader<D> {
        self.reader
    }
}

impl<D: Diagnostics> std::ops::DerefMut for ScopedRegion<'_, D> {
    fn deref_mut(&mut self) -> &mut Reader<D> {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_u32_and_advances() {
        let mut r = Reader::new(vec![0x00, 0x00, 0x00, 0x2a]);
        let v: u32 = r.read(Endian::Current, false).unwrap();
        assert_eq!(v, 42);
        assert_eq!(r.tell(), 4);
    }

    #[test]
    fn out_of_bounds_read_errors() {
        let mut r = Reader::new(vec![0u8; 2]);
        let err = r.read::<u32>(Endian::Current, false).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
        assert_eq!(r.tell(), 0);
    }

    #[test]
    fn misaligned_access_errors_unless_unaligned() {
        let mut r = Reader::new(vec![0u8; 8]);
        r.seek_set(1);
        assert!(matches!(
            r.read::<u32>(Endian::Current, false).unwrap_err(),
            Error::Misaligned { at: 1, align: 4 }
        ));
        r.seek_set(1);
        assert!(r.read::<u32>(Endian::Current, true).is_ok());
    }

    #[test]
    fn peek_does_not_advance() {
        let mut r = Reader::new(vec![0, 0, 0, 5, 0, 0, 0, 9]);
        let v: u32 = r.peek_at(4, Endian::Current, false).unwrap();
        assert_eq!(v, 9);
        assert_eq!(r.tell(), 0);
    }

    #[test]
    fn scoped_region_pops_on_early_return() {
        fn inner(r: &mut Reader) -> Result<()> {
            let _g = r.scoped_region("Material");
            Err(Error::DecodeError("boom".into()))
        }
        let mut r = Reader::new(vec![0u8; 4]);
        let _ = inner(&mut r);
        assert!(r.region_stack.is_empty());
    }
}
