//! SHP1: the shape (batch) array. Each shape header names a VCD list
//! (vertex descriptor), a run of matrix primitives, and the draw-matrix
//! side tables those primitives reference.
//!
//! Layout (relative to the section start, after the `{magic, size, count,
//! pad}` header): a 5-slot offset sub-table (`vcd_ofs, mtxdata_ofs,
//! drwindices_ofs, packet_ofs, dl_ofs`), then fixed-size shape headers, then
//! each region in that order. A shape's header names its VCD-list offset
//! and the index of its first entry in the (globally flat) matrix-data-slot
//! and packet tables; `matrix_primitive_count` gives the run length.
//!
//! For each matrix primitive: the matrix-data slot gives `(current_matrix,
//! draw_matrix_count, draw_matrix_start)`; `draw_matrix_start` indexes the
//! flat DrwIndices array (this crate's own side table, not a reference back
//! into the model's DRW1 section — matching the original tool's SHP1,
//! which is self-contained). The packet table entry gives the primitive's
//! display-list span (`size, offset`); that span holds only draw commands
//! (no matrix-load preamble, since the side table already carries the
//! binding) and is decoded via a
//! [`MeshDisplayListDecoder`](crate::dl_codec::MeshDisplayListDecoder) —
//! [`NativeDisplayListDecoder`](crate::dl_codec::NativeDisplayListDecoder)
//! by default — driving a
//! [`MatrixPrimitiveAssembler`](crate::dl_codec::MatrixPrimitiveAssembler)
//! whose inferred `current_matrix`/`draw_matrices` are discarded in favor
//! of the table's.
//!
//! Real SHP1 additionally pools VCD/matrix-list data across shapes via a
//! compression cache (mirroring MAT3's pools) and carries a shape-id LUT
//! and string table; this codec writes one VCD list per shape unpooled and
//! has no LUT/string table, since nothing here needs shape lookup by name.

use crate::diagnostics::Diagnostics;
use crate::dl_codec::{
    encode_matrix_primitive, Attribute, MatrixPrimitive, MatrixPrimitiveAssembler, MeshDisplayListDecoder, SourceKind, VertexDescriptor,
};
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::j3d::model::{Polygon, PolygonMode};
use crate::j3d::sections::read_section_header;
use crate::math::{Aabb, Vec3};
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

const MAGIC: &[u8; 4] = b"SHP1";
const HEADER_SIZE: u32 = 40;
const VCD_TERMINATOR: u32 = 0xff;

fn mode_to_u8(mode: PolygonMode) -> u8 {
    match mode {
        PolygonMode::Normal => 0,
        PolygonMode::BillboardXY => 1,
        PolygonMode::BillboardY => 2,
        PolygonMode::Skinned => 3,
    }
}

fn mode_from_u8(v: u8) -> PolygonMode {
    match v {
        1 => PolygonMode::BillboardXY,
        2 => PolygonMode::BillboardY,
        3 => PolygonMode::Skinned,
        _ => PolygonMode::Normal,
    }
}

fn source_kind_to_u32(kind: SourceKind) -> u32 {
    match kind {
        SourceKind::None => 0,
        SourceKind::Direct => 1,
        SourceKind::ByteIndex => 2,
        SourceKind::ShortIndex => 3,
    }
}

fn source_kind_from_u32(v: u32) -> Option<SourceKind> {
    match v {
        0 => Some(SourceKind::None),
        1 => Some(SourceKind::Direct),
        2 => Some(SourceKind::ByteIndex),
        3 => Some(SourceKind::ShortIndex),
        _ => None,
    }
}

/// Write every shape's header, VCD list, matrix-data/DrwIndices/packet side
/// tables, and display list. Display lists never carry a matrix-load
/// preamble here (`encode_matrix_primitive`'s `skinned` is always `false`);
/// binding information lives entirely in the side tables instead.
pub fn write(writer: &mut Writer, shapes: &[Polygon]) -> Result<()> {
    let start = writer.tell();
    writer.write_bytes(MAGIC);
    writer.write::<u32>(0, Endian::Current); // size placeholder
    writer.write::<u16>(shapes.len() as u16, Endian::Current);
    writer.write::<u16>(0xffff, Endian::Current);

    let sub_table_base = writer.tell();
    for _ in 0..5 {
        writer.write::<u32>(0, Endian::Current); // patched below
    }

    let header_base = writer.tell();
    for _ in shapes {
        writer.reserve_next(HEADER_SIZE);
    }

    let vcd_ofs = writer.tell();
    let mut vcd_list_ofs_per_shape = Vec::with_capacity(shapes.len());
    for shape in shapes {
        vcd_list_ofs_per_shape.push(writer.tell() - start);
        for (attr, kind) in shape.descriptor.active() {
            writer.write::<u32>(attr as u32, Endian::Current);
            writer.write::<u32>(source_kind_to_u32(kind), Endian::Current);
        }
        writer.write::<u32>(VCD_TERMINATOR, Endian::Current);
        writer.write::<u32>(0, Endian::Current);
    }

    // Pre-encode every primitive's draw-only display list so the packet
    // table (which needs each span's size) can be written before the DL
    // region itself.
    let mut dl_blobs: Vec<Vec<u8>> = Vec::new();
    let mut first_mtx_index = Vec::with_capacity(shapes.len());
    let mut mtx_counter: u16 = 0;
    for shape in shapes {
        first_mtx_index.push(mtx_counter);
        for mp in &shape.matrix_primitives {
            let mut scratch = Writer::new();
            encode_matrix_primitive(&mut scratch, mp, &shape.descriptor, false)?;
            dl_blobs.push(scratch.take_bytes());
            mtx_counter += 1;
        }
    }

    let drwindices_ofs = writer.tell();
    let mut mtx_slots = Vec::with_capacity(mtx_counter as usize);
    for shape in shapes {
        for mp in &shape.matrix_primitives {
            let list_start = (writer.tell() - drwindices_ofs) / 2;
            for &dm in &mp.draw_matrices {
                writer.write::<i16>(dm, Endian::Current);
            }
            mtx_slots.push((mp.current_matrix, mp.draw_matrices.len() as u16, list_start));
        }
    }

    let mtxdata_ofs = writer.tell();
    for &(current_matrix, list_size, list_start) in &mtx_slots {
        writer.write::<i16>(current_matrix, Endian::Current);
        writer.write::<u16>(list_size, Endian::Current);
        writer.write::<u32>(list_start, Endian::Current);
    }

    let packet_ofs = writer.tell();
    let mut running = 0u32;
    for blob in &dl_blobs {
        writer.write::<u32>(blob.len() as u32, Endian::Current);
        writer.write::<u32>(running, Endian::Current);
        running += blob.len() as u32;
    }

    let dl_ofs = writer.tell();
    for blob in &dl_blobs {
        writer.write_bytes(blob);
    }

    for (i, shape) in shapes.iter().enumerate() {
        let pos = header_base + i as u32 * HEADER_SIZE;
        writer.write_at::<u8>(mode_to_u8(shape.mode), pos, Endian::Current);
        writer.write_at::<u8>(0, pos + 1, Endian::Current);
        writer.write_at::<u16>(shape.matrix_primitives.len() as u16, pos + 2, Endian::Current);
        writer.write_at::<u32>(vcd_list_ofs_per_shape[i], pos + 4, Endian::Current);
        writer.write_at::<u16>(first_mtx_index[i], pos + 8, Endian::Current);
        writer.write_at::<u16>(first_mtx_index[i], pos + 10, Endian::Current); // packet index mirrors the matrix-list index, 1:1
        writer.write_at::<f32>(shape.bounding_sphere_radius, pos + 12, Endian::Current);
        writer.write_at::<f32>(shape.aabb.min.x, pos + 16, Endian::Current);
        writer.write_at::<f32>(shape.aabb.min.y, pos + 20, Endian::Current);
        writer.write_at::<f32>(shape.aabb.min.z, pos + 24, Endian::Current);
        writer.write_at::<f32>(shape.aabb.max.x, pos + 28, Endian::Current);
        writer.write_at::<f32>(shape.aabb.max.y, pos + 32, Endian::Current);
        writer.write_at::<f32>(shape.aabb.max.z, pos + 36, Endian::Current);
    }

    writer.write_at::<u32>(vcd_ofs - start, sub_table_base, Endian::Current);
    writer.write_at::<u32>(mtxdata_ofs - start, sub_table_base + 4, Endian::Current);
    writer.write_at::<u32>(drwindices_ofs - start, sub_table_base + 8, Endian::Current);
    writer.write_at::<u32>(packet_ofs - start, sub_table_base + 12, Endian::Current);
    writer.write_at::<u32>(dl_ofs - start, sub_table_base + 16, Endian::Current);

    let end = writer.tell();
    writer.write_at::<u32>(end - start, start + 4, Endian::Current);
    Ok(())
}

struct Header {
    mode: PolygonMode,
    matrix_primitive_count: u16,
    vcd_list_ofs: u32,
    first_mtx_index: u16,
    first_packet_index: u16,
    radius: f32,
    aabb: Aabb,
}

fn read_vcd_list<D: Diagnostics>(r: &mut SafeReader<'_, D>, at: u32) -> Result<VertexDescriptor> {
    r.seek_set(at);
    let mut descriptor = VertexDescriptor::new();
    loop {
        let attr = r.u32()?;
        let kind = r.u32()?;
        if attr == VCD_TERMINATOR {
            break;
        }
        let attribute = Attribute::from_u32(attr).ok_or_else(|| Error::DecodeError(format!("SHP1 VCD list: unknown attribute {attr}")))?;
        let kind = source_kind_from_u32(kind).ok_or_else(|| Error::DecodeError(format!("SHP1 VCD list: unknown source kind {kind}")))?;
        descriptor.set(attribute, kind);
    }
    Ok(descriptor)
}

/// Parse SHP1, decoding every shape's matrix primitives via `decoder`.
/// Pass [`crate::dl_codec::NativeDisplayListDecoder`] unless the caller has
/// its own GPU command interpreter to wire in instead.
pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>, decoder: &impl MeshDisplayListDecoder<D>) -> Result<Vec<Polygon>> {
    let start = r.tell();
    let _size = read_section_header(r, MAGIC)?;
    let count = r.u16()? as usize;
    r.u16()?;

    let mut sub_table = [0u32; 5];
    for slot in sub_table.iter_mut() {
        *slot = r.u32()?;
    }
    let [vcd_ofs, mtxdata_ofs, drwindices_ofs, packet_ofs, dl_ofs] = sub_table;

    let header_base = r.tell();
    let mut headers = Vec::with_capacity(count);
    for i in 0..count {
        r.seek_set(header_base + i as u32 * HEADER_SIZE);
        let mode = mode_from_u8(r.u8()?);
        r.u8()?;
        let matrix_primitive_count = r.u16()?;
        let vcd_list_ofs = r.u32()?;
        let first_mtx_index = r.u16()?;
        let first_packet_index = r.u16()?;
        let radius = r.f32()?;
        let min = Vec3::new(r.f32()?, r.f32()?, r.f32()?);
        let max = Vec3::new(r.f32()?, r.f32()?, r.f32()?);
        headers.push(Header {
            mode,
            matrix_primitive_count,
            vcd_list_ofs,
            first_mtx_index,
            first_packet_index,
            radius,
            aabb: Aabb { min, max },
        });
    }
    let _ = vcd_ofs;

    let mut polygons = Vec::with_capacity(count);
    for (i, h) in headers.into_iter().enumerate() {
        let descriptor = read_vcd_list(r, start + h.vcd_list_ofs)?;

        let mut polygon = Polygon::new(i as u16);
        polygon.bounding_sphere_radius = h.radius;
        polygon.aabb = h.aabb;
        polygon.mode = h.mode;
        polygon.descriptor = descriptor.clone();

        let mut matrix_primitives = Vec::with_capacity(h.matrix_primitive_count as usize);
        for local in 0..h.matrix_primitive_count {
            let slot_index = (h.first_mtx_index + local) as u32;
            r.seek_set(start + mtxdata_ofs + slot_index * 8);
            let current_matrix = r.i16()?;
            let list_size = r.u16()?;
            let list_start = r.u32()?;

            r.seek_set(start + drwindices_ofs + list_start * 2);
            let mut draw_matrices = Vec::with_capacity(list_size as usize);
            for _ in 0..list_size {
                draw_matrices.push(r.i16()?);
            }

            let packet_index = (h.first_packet_index + local) as u32;
            r.seek_set(start + packet_ofs + packet_index * 8);
            let dl_size = r.u32()?;
            let dl_local_ofs = r.u32()?;
            let dl_abs = start + dl_ofs + dl_local_ofs;

            let mut assembler = MatrixPrimitiveAssembler::new();
            decoder.decode(r, dl_abs, dl_size, &mut assembler, &descriptor)?;
            assembler.finish();
            let primitives = assembler.result.into_iter().next().map(|mp| mp.primitives).unwrap_or_default();

            matrix_primitives.push(MatrixPrimitive {
                current_matrix,
                draw_matrices,
                primitives,
            });
        }
        polygon.matrix_primitives = matrix_primitives;
        polygons.push(polygon);
    }

    Ok(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dl_codec::{IndexedPrimitive, NativeDisplayListDecoder, PrimitiveTopology};
    use crate::stream::Reader;

    #[test]
    fn round_trips_single_shape_header() {
        let mut descriptor = VertexDescriptor::new();
        descriptor.set(Attribute::Position, SourceKind::ShortIndex);

        let mut polygon = Polygon::new(0);
        polygon.descriptor = descriptor;
        polygon.bounding_sphere_radius = 3.5;
        polygon.matrix_primitives = vec![MatrixPrimitive {
            current_matrix: -1,
            draw_matrices: vec![],
            primitives: vec![IndexedPrimitive { topology: PrimitiveTopology::Triangles, vertices: vec![vec![0], vec![1], vec![2]] }],
        }];

        let mut writer = Writer::new();
        write(&mut writer, std::slice::from_ref(&polygon)).unwrap();
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let shapes = read(&mut safe, &NativeDisplayListDecoder).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].bounding_sphere_radius, 3.5);
        assert_eq!(shapes[0].descriptor.get(Attribute::Position), SourceKind::ShortIndex);
    }

    #[test]
    fn round_trips_matrix_primitives_with_real_geometry() {
        let mut descriptor = VertexDescriptor::new();
        descriptor.set(Attribute::Position, SourceKind::ShortIndex);
        descriptor.set(Attribute::Color0, SourceKind::ByteIndex);

        let mut skinned_shape = Polygon::new(0);
        skinned_shape.mode = PolygonMode::Skinned;
        skinned_shape.descriptor = descriptor.clone();
        skinned_shape.bounding_sphere_radius = 12.0;
        skinned_shape.aabb = Aabb { min: Vec3::new(-1.0, -2.0, -3.0), max: Vec3::new(1.0, 2.0, 3.0) };
        skinned_shape.matrix_primitives = vec![
            MatrixPrimitive {
                current_matrix: -1,
                draw_matrices: vec![5, 7],
                primitives: vec![IndexedPrimitive {
                    topology: PrimitiveTopology::TriangleStrip,
                    vertices: vec![vec![1, 10], vec![2, 20], vec![3, 30], vec![4, 40]],
                }],
            },
            MatrixPrimitive {
                current_matrix: -1,
                draw_matrices: vec![9],
                primitives: vec![IndexedPrimitive {
                    topology: PrimitiveTopology::Triangles,
                    vertices: vec![vec![5, 50], vec![6, 60], vec![7, 70]],
                }],
            },
        ];

        let mut single_bind_shape = Polygon::new(1);
        single_bind_shape.descriptor = descriptor;
        single_bind_shape.matrix_primitives = vec![MatrixPrimitive {
            current_matrix: 2,
            draw_matrices: vec![],
            primitives: vec![IndexedPrimitive {
                topology: PrimitiveTopology::Quads,
                vertices: vec![vec![0, 1], vec![1, 2], vec![2, 3], vec![3, 4]],
            }],
        }];

        let shapes = vec![skinned_shape.clone(), single_bind_shape.clone()];

        let mut writer = Writer::new();
        write(&mut writer, &shapes).unwrap();
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = read(&mut safe, &NativeDisplayListDecoder).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back[0].mode, PolygonMode::Skinned);
        assert_eq!(back[0].bounding_sphere_radius, 12.0);
        assert_eq!(back[0].aabb, skinned_shape.aabb);
        assert_eq!(back[0].matrix_primitives, skinned_shape.matrix_primitives);
        assert_eq!(back[1].matrix_primitives, single_bind_shape.matrix_primitives);
    }
}
