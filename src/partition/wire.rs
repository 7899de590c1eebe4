// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Binary encoding of the partition node wire shape from spec.md §6,
//! grounded on the teacher's `segment::meta::Metadata` encode/decode.

use super::PartitionNode;
use crate::bloom::MembershipFilter;
use crate::coding::{Decode, DecodeError, Encode, EncodeError, MAGIC_BYTES};
use crate::family::{FamilyName, Families};
use crate::key::Key;
use crate::record::FieldName;
use crate::store::Link;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::sync::Arc;

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<(), EncodeError> {
    let bytes = s.as_bytes();
    writer.write_u32::<BigEndian>(bytes.len() as u32)?;
    writer.write_all(bytes)?;
    Ok(())
}

fn read_str<R: Read>(reader: &mut R) -> Result<String, DecodeError> {
    let len = reader.read_u32::<BigEndian>()? as usize;
    let mut buf = vec![0; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| DecodeError::InvalidHeader("utf8"))
}

fn write_key<W: Write>(writer: &mut W, key: &Key) -> Result<(), EncodeError> {
    let bytes = key.as_bytes();
    writer.write_u32::<BigEndian>(bytes.len() as u32)?;
    writer.write_all(bytes)?;
    Ok(())
}

fn read_key<R: Read>(reader: &mut R) -> Result<Key, DecodeError> {
    let len = reader.read_u32::<BigEndian>()? as usize;
    let mut buf = vec![0; len];
    reader.read_exact(&mut buf)?;
    Ok(Key::from(buf))
}

impl Encode for Link {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u64::<BigEndian>(self.as_u64())?;
        Ok(())
    }
}

impl Decode for Link {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(Link::from_u64(reader.read_u64::<BigEndian>()?))
    }
}

impl Encode for Families {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        let entries: Vec<_> = self.iter().collect();
        writer.write_u32::<BigEndian>(entries.len() as u32)?;
        for (family, fields) in entries {
            write_str(writer, family)?;
            writer.write_u32::<BigEndian>(fields.len() as u32)?;
            for field in fields {
                write_str(writer, field)?;
            }
        }
        Ok(())
    }
}

impl Decode for Families {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let family_count = reader.read_u32::<BigEndian>()?;
        let mut map = BTreeMap::new();

        for _ in 0..family_count {
            let family: FamilyName = Arc::from(read_str(reader)?.as_str());
            let field_count = reader.read_u32::<BigEndian>()?;
            let mut fields: BTreeSet<FieldName> = BTreeSet::new();
            for _ in 0..field_count {
                fields.insert(Arc::from(read_str(reader)?.as_str()));
            }
            map.insert(family, fields);
        }

        Families::new(map).map_err(|_| DecodeError::InvalidHeader("Families"))
    }
}

impl Encode for PartitionNode {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_all(&MAGIC_BYTES)?;
        writer.write_u64::<BigEndian>(self.limit as u64)?;

        writer.write_u32::<BigEndian>(self.tablets.len() as u32)?;
        for (family, link) in &self.tablets {
            write_str(writer, family)?;
            link.encode_into(writer)?;
        }

        self.membership.encode_into(writer)?;

        writer.write_u64::<BigEndian>(self.count as u64)?;
        self.families.encode_into(writer)?;

        write_key(writer, &self.first_key)?;
        write_key(writer, &self.last_key)?;

        Ok(())
    }
}

impl Decode for PartitionNode {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let mut magic = [0u8; MAGIC_BYTES.len()];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC_BYTES {
            return Err(DecodeError::InvalidHeader("PartitionNode"));
        }

        let limit = reader.read_u64::<BigEndian>()? as usize;

        let tablet_count = reader.read_u32::<BigEndian>()?;
        let mut tablets = BTreeMap::new();
        for _ in 0..tablet_count {
            let family: FamilyName = Arc::from(read_str(reader)?.as_str());
            let link = Link::decode_from(reader)?;
            tablets.insert(family, link);
        }

        let membership = MembershipFilter::decode_from(reader)?;
        let count = reader.read_u64::<BigEndian>()? as usize;
        let families = Families::decode_from(reader)?;
        let first_key = read_key(reader)?;
        let last_key = read_key(reader)?;

        Ok(PartitionNode {
            limit,
            tablets,
            membership,
            count,
            families,
            first_key,
            last_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Params;
    use crate::store::MemoryStore;

    #[test]
    fn partition_node_round_trips() {
        let store = MemoryStore::new();
        let params = Params::new(10).with_families(
            Families::new([(
                FamilyName::from("ab"),
                [Arc::from("a"), Arc::from("b")].into_iter().collect(),
            )])
            .unwrap(),
        );

        let records = vec![(
            Key::from("k1"),
            crate::patch::PatchValue::Put(crate::record::record([("a", "1")])),
        )];
        let handle = crate::partition::from_records(&store, &params, records)
            .unwrap()
            .unwrap();

        let bytes = handle.node.encode_into_vec();
        let decoded = PartitionNode::decode_from(&mut bytes.as_slice()).unwrap();

        assert_eq!(decoded.limit, handle.node.limit);
        assert_eq!(decoded.count, handle.node.count);
        assert_eq!(decoded.first_key, handle.node.first_key);
        assert_eq!(decoded.last_key, handle.node.last_key);
        assert_eq!(decoded.tablets, handle.node.tablets);
        assert_eq!(decoded.families, handle.node.families);
    }
}
