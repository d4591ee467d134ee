use crate::deserialization::decode_document;
use crate::error::CodecError;
use crate::serialization::encode_document;
use crate::types::{Document, Schema};

// ─── Type Tags ──────────────────────────────────────────────────────────────
pub const TAG_NULL: u8 = 0;
pub const TAG_BOOL: u8 = 1;
pub const TAG_I64: u8 = 2;
pub const TAG_F64: u8 = 3;
pub const TAG_STR: u8 = 4;
pub const TAG_NESTED_CBOR: u8 = 5; // Array or struct object
pub const TAG_U64: u8 = 6;

// ─── Binary Layout ──────────────────────────────────────────────────────────
//
//  ┌──────────────────────────────────────────────┐
//  │ Header (20 bytes)                            │
//  │   field_count: u32 (LE)                      │
//  │   _reserved: [u8; 16]                        │
//  ├──────────────────────────────────────────────┤
//  │ Index (20 bytes × field_count)               │
//  │   name_hash:   u64 (LE)    ← SORTED by hash  │
//  │   data_offset: u32 (LE)                      │
//  │   data_length: u32 (LE)                      │
//  │   type_tag:    u8                            │
//  │   _padding:    [u8; 3]                       │
//  ├──────────────────────────────────────────────┤
//  │ Data (variable)                              │
//  │   field values packed sequentially           │
//  └──────────────────────────────────────────────┘
//
// Only names present in the schema are written. Type and array metadata are
// never stored; they come from the schema used to decode.

pub const HEADER_SIZE: usize = 20; // 4 + 16
pub const INDEX_ENTRY_SIZE: usize = 20; // 8 + 4 + 4 + 1 + 3

/// A parsed index entry from the binary header.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    pub name_hash: u64,
    pub data_offset: usize,
    pub data_len: usize,
    pub type_tag: u8,
}

/// A raw, zero-copy reference to a field's bytes.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    pub name_hash: u64,
    pub type_tag: u8,
    pub data: &'a [u8],
}

/// Converts between a raw save buffer and a [`Document`] under a given schema.
///
/// Implementations must round-trip: `decode(encode(d, s), s) == d` for every
/// document `d` valid under `s`.
pub trait PdataCodec: Send + Sync {
    fn decode(&self, buffer: &[u8], schema: &Schema) -> Result<Document, CodecError>;
    fn encode(&self, document: &Document, schema: &Schema) -> Result<Vec<u8>, CodecError>;
}

/// The hybrid record layout above. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct HybridCodec;

impl PdataCodec for HybridCodec {
    fn decode(&self, buffer: &[u8], schema: &Schema) -> Result<Document, CodecError> {
        decode_document(buffer, schema)
    }

    fn encode(&self, document: &Document, schema: &Schema) -> Result<Vec<u8>, CodecError> {
        encode_document(document, schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdata_value::PdataValue;
    use crate::types::{Field, Member, MemberList};
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        let mut schema = Schema {
            members: MemberList::try_from_members(vec![
                Member::scalar("xp", "int"),
                Member::scalar("ratio", "float"),
                Member::scalar("name", "string"),
                Member::scalar("ranked", "bool"),
                Member::scalar("activeSlot", "Slot"),
                Member::fixed_array("kills", "int", 4),
                Member::enum_array("unlocked", "bool", "Slot"),
            ])
            .unwrap(),
            ..Schema::default()
        };
        schema.enums.insert(
            "Slot".into(),
            vec!["head".into(), "chest".into(), "legs".into()],
        );
        schema
    }

    fn field(schema: &Schema, name: &str, value: PdataValue) -> Field {
        let mut f = schema.zero_field(schema.member(name).unwrap()).unwrap();
        f.value = value;
        f
    }

    #[test]
    fn test_roundtrip_all_member_kinds() {
        let schema = schema();
        let mut doc = Document::new();
        doc.insert("xp", field(&schema, "xp", PdataValue::from(1200i64)));
        doc.insert("ratio", field(&schema, "ratio", PdataValue::from(1.5f64)));
        doc.insert("name", field(&schema, "name", PdataValue::from("pilot")));
        doc.insert("ranked", field(&schema, "ranked", PdataValue::from(true)));
        doc.insert("activeSlot", field(&schema, "activeSlot", PdataValue::from("legs")));
        doc.insert("kills", field(&schema, "kills", PdataValue::from(vec![1i64, 2, 3, 4])));
        doc.insert(
            "unlocked",
            field(&schema, "unlocked", PdataValue::from(vec![true, false, true])),
        );

        let codec = HybridCodec;
        let buf = codec.encode(&doc, &schema).unwrap();
        let back = codec.decode(&buf, &schema).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_absent_members_decode_as_zero() {
        let schema = schema();
        let buf = HybridCodec.encode(&Document::new(), &schema).unwrap();
        let doc = HybridCodec.decode(&buf, &schema).unwrap();

        assert_eq!(doc.len(), schema.members.len());
        assert_eq!(doc.value("xp"), Some(&PdataValue::from(0i64)));
        assert_eq!(doc.value("activeSlot"), Some(&PdataValue::from("head")));
        assert_eq!(
            doc.value("unlocked"),
            Some(&PdataValue::from(vec![false, false, false]))
        );
    }

    #[test]
    fn test_dynamic_array_follows_enum_growth() {
        let schema = schema();
        let mut doc = Document::new();
        doc.insert(
            "unlocked",
            field(&schema, "unlocked", PdataValue::from(vec![true, true, true])),
        );
        let buf = HybridCodec.encode(&doc, &schema).unwrap();

        let mut grown = schema.clone();
        grown.enums.get_mut("Slot").unwrap().push("arms".into());
        let back = HybridCodec.decode(&buf, &grown).unwrap();

        let unlocked = back.get("unlocked").unwrap();
        assert_eq!(unlocked.array_size, Some(4));
        assert_eq!(unlocked.value, PdataValue::from(vec![true, true, true, false]));
    }

    #[test]
    fn test_members_outside_schema_are_dropped() {
        let schema = schema();
        let mut doc = Document::new();
        doc.insert("xp", field(&schema, "xp", PdataValue::from(5i64)));
        doc.insert(
            "moddedOnly",
            Field {
                ty: "int".into(),
                array_size: None,
                native_array_size: None,
                value: PdataValue::from(9i64),
            },
        );
        let buf = HybridCodec.encode(&doc, &schema).unwrap();
        let back = HybridCodec.decode(&buf, &schema).unwrap();
        assert!(!back.contains("moddedOnly"));
        assert_eq!(back.value("xp"), Some(&PdataValue::from(5i64)));
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        let schema = schema();
        assert!(matches!(
            HybridCodec.decode(&[0u8; 4], &schema),
            Err(CodecError::InvalidBuffer)
        ));
    }

    #[test]
    fn test_decode_rejects_header_claiming_too_many_fields() {
        let schema = schema();
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&3u32.to_le_bytes());
        assert!(matches!(
            HybridCodec.decode(&buf, &schema),
            Err(CodecError::InvalidBuffer)
        ));
    }
}
