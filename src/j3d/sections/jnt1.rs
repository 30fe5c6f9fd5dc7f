//! JNT1: the joint array. Hierarchy (parent/children) and display-list
//! bindings are *not* stored here — INF1's scene-graph bytecode assigns
//! those once every section has been read.

use crate::diagnostics::Diagnostics;
use crate::endian::Endian;
use crate::error::Result;
use crate::j3d::model::{BillboardKind, Joint};
use crate::j3d::name_table;
use crate::j3d::sections::read_section_header;
use crate::math::{Aabb, Srt, Vec3};
use crate::safe_reader::SafeReader;
use crate::stream::Writer;

const MAGIC: &[u8; 4] = b"JNT1";

pub fn write(writer: &mut Writer, joints: &[Joint]) -> Result<()> {
    let start = writer.tell();
    writer.write_bytes(MAGIC);
    writer.write::<u32>(0, Endian::Current);
    writer.write::<u16>(joints.len() as u16, Endian::Current);
    writer.write::<u16>(0xffff, Endian::Current);

    let data_pos = writer.tell();
    writer.write::<u32>(0, Endian::Current); // data offset placeholder
    let dict_pos_field = writer.tell();
    writer.write::<u32>(0, Endian::Current); // name table offset placeholder

    let data_ofs = writer.tell();
    for joint in joints {
        writer.write::<u16>(joint.billboard.as_u16() | if joint.ssc { 0x8000 } else { 0 }, Endian::Current);
        writer.write::<u8>(0, Endian::Current);
        writer.write::<u8>(0, Endian::Current);
        writer.write::<f32>(joint.srt.scale.x, Endian::Current);
        writer.write::<f32>(joint.srt.scale.y, Endian::Current);
        writer.write::<f32>(joint.srt.scale.z, Endian::Current);
        writer.write::<f32>(joint.srt.rotation.x, Endian::Current);
        writer.write::<f32>(joint.srt.rotation.y, Endian::Current);
        writer.write::<f32>(joint.srt.rotation.z, Endian::Current);
        writer.write::<u16>(0, Endian::Current);
        writer.write::<f32>(joint.srt.translation.x, Endian::Current);
        writer.write::<f32>(joint.srt.translation.y, Endian::Current);
        writer.write::<f32>(joint.srt.translation.z, Endian::Current);
        writer.write::<f32>(joint.bounding_sphere_radius, Endian::Current);
        writer.write::<f32>(joint.aabb.min.x, Endian::Current);
        writer.write::<f32>(joint.aabb.min.y, Endian::Current);
        writer.write::<f32>(joint.aabb.min.z, Endian::Current);
        writer.write::<f32>(joint.aabb.max.x, Endian::Current);
        writer.write::<f32>(joint.aabb.max.y, Endian::Current);
        writer.write::<f32>(joint.aabb.max.z, Endian::Current);
    }

    let name_table_ofs = writer.tell();
    let names: Vec<String> = joints.iter().map(|j| j.name.clone()).collect();
    name_table::write(writer, &names)?;

    writer.write_at::<u32>(data_ofs - start, data_pos, Endian::Current);
    writer.write_at::<u32>(name_table_ofs - start, dict_pos_field, Endian::Current);

    let end = writer.tell();
    writer.write_at::<u32>(end - start, start + 4, Endian::Current);
    Ok(())
}

pub fn read<D: Diagnostics>(r: &mut SafeReader<'_, D>) -> Result<Vec<Joint>> {
    let start = r.tell();
    let _size = read_section_header(r, MAGIC)?;
    let count = r.u16()? as usize;
    r.u16()?;
    let data_ofs = r.u32()?;
    let name_table_ofs = r.u32()?;

    r.seek_set(start + data_ofs);
    let mut joints = Vec::with_capacity(count);
    for _ in 0..count {
        let flags = r.u16()?;
        r.u8()?;
        r.u8()?;
        let scale = Vec3::new(r.f32()?, r.f32()?, r.f32()?);
        let rotation = Vec3::new(r.f32()?, r.f32()?, r.f32()?);
        r.u16()?;
        let translation = Vec3::new(r.f32()?, r.f32()?, r.f32()?);
        let bounding_sphere_radius = r.f32()?;
        let min = Vec3::new(r.f32()?, r.f32()?, r.f32()?);
        let max = Vec3::new(r.f32()?, r.f32()?, r.f32()?);

        let mut joint = Joint::new("");
        joint.srt = Srt { scale, rotation, translation };
        joint.bounding_sphere_radius = bounding_sphere_radius;
        joint.aabb = Aabb { min, max };
        joint.billboard = BillboardKind::from_u16(flags & 0x7fff);
        joint.ssc = flags & 0x8000 != 0;
        joints.push(joint);
    }

    r.seek_set(start + name_table_ofs);
    let names = name_table::read(r)?;
    for (joint, name) in joints.iter_mut().zip(names) {
        joint.name = name;
    }

    Ok(joints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Reader;

    #[test]
    fn round_trips_srt_and_bounds() {
        let mut joint = Joint::new("pelvis");
        joint.srt.translation = Vec3::new(1.0, 2.0, 3.0);
        joint.bounding_sphere_radius = 5.0;
        joint.billboard = BillboardKind::BillboardY;

        let mut writer = Writer::new();
        write(&mut writer, std::slice::from_ref(&joint)).unwrap();
        let bytes = writer.take_bytes();

        let mut reader = Reader::new(bytes);
        let mut safe = SafeReader::new(&mut reader);
        let back = read(&mut safe).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].srt.translation, joint.srt.translation);
        assert_eq!(back[0].bounding_sphere_radius, 5.0);
        assert_eq!(back[0].billboard, BillboardKind::BillboardY);
        assert_eq!(back[0].name, "pelvis");
    }
}
