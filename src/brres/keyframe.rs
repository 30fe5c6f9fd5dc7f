//! The key table every G3D animation stream shares: a count-prefixed list
//! of `(frame, value, slope)` triples plus a `step` cache, and a per-track
//! "fixed or animated" choice so an unanimated attribute can store a
//! single `f32` instead of a one-entry curve.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::Result;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame {
    pub frame: f32,
    pub value: f32,
    pub slope: f32,
}

/// A Hermite-ish curve: non-decreasing `frame` values, `step` the average
/// inverse-density used by the original tool to seed playback caches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyFrameCollection {
    pub step: f32,
    pub keys: Vec<KeyFrame>,
}

impl KeyFrameCollection {
    pub fn single(value: f32) -> Self {
        Self {
            step: 0.0,
            keys: vec![KeyFrame { frame: 0.0, value, slope: 0.0 }],
        }
    }

    /// `true` if frame values are in non-decreasing order, per the
    /// animation-stream invariant.
    pub fn is_monotonic(&self) -> bool {
        self.keys.windows(2).all(|w| w[0].frame <= w[1].frame)
    }

    pub fn write(&self, writer: &mut Writer) {
        writer.write::<u16>(self.keys.len() as u16, Endian::Current);
        writer.write::<u16>(0, Endian::Current);
        writer.write::<f32>(self.step, Endian::Current);
        for key in &self.keys {
            writer.write::<f32>(key.frame, Endian::Current);
            writer.write::<f32>(key.value, Endian::Current);
            writer.write::<f32>(key.slope, Endian::Current);
        }
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        let count = r.u16()? as usize;
        r.u16()?;
        let step = r.f32()?;
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(KeyFrame {
                frame: r.f32()?,
                value: r.f32()?,
                slope: r.f32()?,
            });
        }
        Ok(Self { step, keys })
    }
}

/// A single attribute's data: either a constant `f32` or a full curve.
/// Mirrors the NW4R convention of a per-attribute "fixed" flag bit
/// deciding which of the two a stream carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Track {
    Fixed(f32),
    Animated(KeyFrameCollection),
}

impl Track {
    pub fn is_fixed(&self) -> bool {
        matches!(self, Track::Fixed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_key_frame_collection() {
        let coll = KeyFrameCollection {
            step: 0.5,
            keys: vec![
                KeyFrame { frame: 0.0, value: 1.0, slope: 0.0 },
                KeyFrame { frame: 10.0, value: 2.0, slope: 0.1 },
            ],
        };
        assert!(coll.is_monotonic());

        let mut writer = Writer::new();
        coll.write(&mut writer);
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = KeyFrameCollection::read(&mut safe).unwrap();
        assert_eq!(back, coll);
    }
}
