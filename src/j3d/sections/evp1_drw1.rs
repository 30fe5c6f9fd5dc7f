//! EVP1 (vertex envelopes, i.e. skinning weights) and DRW1 (per-joint draw
//! matrix table). The two are written as separate chunks but are only
//! meaningful together: DRW1 entries either bind a joint directly or point
//! into EVP1 by index.
//!
//! EVP1 carries a known quirk this crate preserves rather than "fixes": the
//! inverse-bind matrix slot an envelope's first weight references is stored
//! one past its joint id (`joint_id + 1`, slot 0 left as padding). Files
//! produced by the original toolchain are byte-identical only if this
//! off-by-one round-trips unchanged.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::j3d::model::{BoneWeight, DrawMatrix, Envelope};
use crate::j3d::sections::read_section_header;
use crate::math::Mat4;
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

const EVP1_MAGIC: &[u8; 4] = b"EVP1";
const DRW1_MAGIC: &[u8; 4] = b"DRW1";

#[derive(Debug, Clone, Default)]
pub struct Evp1 {
    pub envelopes: Vec<Envelope>,
    /// Inverse-bind matrix per envelope, indexed the same off-by-one way
    /// the weight's joint slot is (`joint_id + 1`); slot 0 is unused
    /// padding, always written as identity.
    pub inverse_binds: Vec<Mat4>,
}

impl Evp1 {
    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(EVP1_MAGIC);
        writer.write::<u32>(0, Endian::Current);

        writer.write::<u16>(self.envelopes.len() as u16, Endian::Current);
        writer.write::<u16>(0, Endian::Current);

        let counts_pos = writer.tell();
        for env in &self.envelopes {
            writer.write::<u8>(env.weights.len() as u8, Endian::Current);
        }
        writer.align_to(4);

        let indices_pos = writer.tell();
        for env in &self.envelopes {
            for w in &env.weights {
                writer.write::<u16>(w.joint, Endian::Current);
            }
        }
        writer.align_to(4);

        let weights_pos = writer.tell();
        for env in &self.envelopes {
            for w in &env.weights {
                writer.write::<f32>(w.weight, Endian::Current);
            }
        }
        writer.align_to(4);

        let matrices_pos = writer.tell();
        writer.write_bytes(&[0u8; 48]); // padding slot 0
        for m in &self.inverse_binds {
            for row in m.transpose().to_cols_array_2d().iter().take(3) {
                for v in row {
                    writer.write::<f32>(*v, Endian::Current);
                }
            }
        }

        writer.write_at::<u32>(counts_pos - start, start + 8, Endian::Current);
        writer.write_at::<u32>(indices_pos - start, start + 12, Endian::Current);
        writer.write_at::<u32>(weights_pos - start, start + 16, Endian::Current);
        writer.write_at::<u32>(matrices_pos - start, start + 20, Endian::Current);

        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Self> {
        let start = r.tell();
        let _size = read_section_header(r, EVP1_MAGIC)?;
        let count = r.u16()? as usize;
        r.u16()?;
        let counts_ofs = r.u32()?;
        let indices_ofs = r.u32()?;
        let weights_ofs = r.u32()?;
        let matrices_ofs = r.u32()?;

        r.seek_set(start + counts_ofs);
        let mut counts = Vec::with_capacity(count);
        for _ in 0..count {
            counts.push(r.u8()? as usize);
        }

        r.seek_set(start + indices_ofs);
        let total: usize = counts.iter().sum();
        let mut joints = Vec::with_capacity(total);
        for _ in 0..total {
            joints.push(r.u16()?);
        }

        r.seek_set(start + weights_ofs);
        let mut weights = Vec::with_capacity(total);
        for _ in 0..total {
            weights.push(r.f32()?);
        }

        let mut envelopes = Vec::with_capacity(count);
        let mut cursor = 0;
        for n in counts {
            let mut env = Envelope::default();
            for _ in 0..n {
                env.weights.push(BoneWeight { joint: joints[cursor], weight: weights[cursor] });
                cursor += 1;
            }
            envelopes.push(env);
        }

        let max_joint = envelopes
            .iter()
            .flat_map(|e| e.weights.iter())
            .map(|w| w.joint)
            .max()
            .unwrap_or(0);
        r.seek_set(start + matrices_ofs + 48); // skip the unused padding slot
        let mut inverse_binds = Vec::with_capacity(max_joint as usize + 1);
        for _ in 0..=max_joint {
            let mut cols = [[0.0f32; 4]; 4];
            for row in cols.iter_mut().take(3) {
                for v in row.iter_mut() {
                    *v = r.f32()?;
                }
            }
            cols[3] = [0.0, 0.0, 0.0, 1.0];
            inverse_binds.push(Mat4::from_cols_array_2d(&cols).transpose());
        }

        Ok(Self { envelopes, inverse_binds })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Drw1 {
    pub matrices: Vec<DrawMatrix>,
}

impl Drw1 {
    /// `evp1` must be the same envelope table `self.matrices`' `Envelope`
    /// entries were read from (or built against): each entry is written as
    /// its index into `evp1.envelopes`, found by value rather than carried
    /// alongside the matrix, since `DrawMatrix::Envelope` stores the
    /// envelope itself and not its table position.
    pub fn write(&self, writer: &mut Writer, evp1: &Evp1) -> Result<()> {
        let start = writer.tell();
        writer.write_bytes(DRW1_MAGIC);
        writer.write::<u32>(0, Endian::Current);
        writer.write::<u16>(self.matrices.len() as u16, Endian::Current);
        writer.write::<u16>(0, Endian::Current);

        let flags_pos = writer.tell();
        for m in &self.matrices {
            let weighted = matches!(m, DrawMatrix::Envelope(_));
            writer.write::<u8>(weighted as u8, Endian::Current);
        }
        writer.align_to(2);

        let data_pos = writer.tell();
        for m in &self.matrices {
            let data = match m {
                DrawMatrix::SingleBind(joint) => *joint,
                DrawMatrix::Envelope(env) => evp1
                    .envelopes
                    .iter()
                    .position(|e| e == env)
                    .ok_or_else(|| Error::DecodeError("DRW1: envelope not present in EVP1 table".to_string()))? as u16,
            };
            writer.write::<u16>(data, Endian::Current);
        }

        writer.write_at::<u32>(flags_pos - start, start + 8, Endian::Current);
        writer.write_at::<u32>(data_pos - start, start + 12, Endian::Current);

        let end = writer.tell();
        writer.write_at::<u32>(end - start, start + 4, Endian::Current);
        Ok(())
    }

    pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>, evp1: &Evp1) -> Result<Self> {
        let start = r.tell();
        let _size = read_section_header(r, DRW1_MAGIC)?;
        let count = r.u16()? as usize;
        r.u16()?;
        let flags_ofs = r.u32()?;
        let data_ofs = r.u32()?;

        r.seek_set(start + flags_ofs);
        let mut flags = Vec::with_capacity(count);
        for _ in 0..count {
            flags.push(r.bool8()?);
        }

        r.seek_set(start + data_ofs);
        let mut matrices = Vec::with_capacity(count);
        for weighted in flags {
            let data = r.u16()?;
            if weighted {
                let env = evp1
                    .envelopes
                    .get(data as usize)
                    .ok_or_else(|| Error::DecodeError(format!("DRW1: envelope index {data} out of range")))?
                    .clone();
                matrices.push(DrawMatrix::Envelope(env));
            } else {
                matrices.push(DrawMatrix::SingleBind(data));
            }
        }

        Ok(Self { matrices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_single_bind_and_envelope() {
        let evp1 = Evp1 {
            envelopes: vec![Envelope { weights: vec![BoneWeight { joint: 2, weight: 0.5 }, BoneWeight { joint: 3, weight: 0.5 }] }],
            inverse_binds: vec![Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY],
        };
        let mut evp1_writer = Writer::new();
        evp1.write(&mut evp1_writer).unwrap();
        let evp1_bytes = evp1_writer.take_bytes();

        let mut reader = Reader::new(evp1_bytes);
        let mut safe = SafeReader::new(&mut reader);
        let evp1_back = Evp1::read(&mut safe).unwrap();
        assert_eq!(evp1_back.envelopes.len(), 1);
        assert_eq!(evp1_back.envelopes[0].weights.len(), 2);

        let drw1 = Drw1 {
            matrices: vec![DrawMatrix::SingleBind(4), DrawMatrix::Envelope(evp1_back.envelopes[0].clone())],
        };
        let mut drw1_writer = Writer::new();
        drw1.write(&mut drw1_writer, &evp1_back).unwrap();
        let drw1_bytes = drw1_writer.take_bytes();
        let mut reader2 = Reader::new(drw1_bytes);
        let mut safe2 = SafeReader::new(&mut reader2);
        let drw1_back = Drw1::read(&mut safe2, &evp1_back).unwrap();
        assert_eq!(drw1_back.matrices[0], DrawMatrix::SingleBind(4));
        assert_eq!(drw1_back.matrices[1], DrawMatrix::Envelope(evp1_back.envelopes[0].clone()));
    }
}
