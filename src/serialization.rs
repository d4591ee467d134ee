use crate::codec::*;
use crate::error::CodecError;
use crate::pdata_value::{PdataNumber, PdataValue};
use crate::types::{Document, Schema};
use std::borrow::Cow;
use xxhash_rust::const_xxh64::xxh64;

// ─── Writer ─────────────────────────────────────────────────────────────────

/// Name hash used in the index. Readers must use the same function.
#[inline]
pub fn name_hash(name: &str) -> u64 {
    xxh64(name.as_bytes(), 0)
}

/// Serialize a single field value into `buf`, returning its type tag.
/// Scalars are written as native little-endian bytes, arrays and struct
/// objects as CBOR.
#[inline]
pub fn write_field_into(buf: &mut Vec<u8>, value: &PdataValue) -> Result<u8, CodecError> {
    Ok(match value {
        PdataValue::Null => TAG_NULL,
        PdataValue::Bool(b) => {
            buf.push(*b as u8);
            TAG_BOOL
        }
        PdataValue::Number(PdataNumber::I64(i)) => {
            buf.extend_from_slice(&i.to_le_bytes());
            TAG_I64
        }
        PdataValue::Number(PdataNumber::U64(u)) => {
            buf.extend_from_slice(&u.to_le_bytes());
            TAG_U64
        }
        PdataValue::Number(PdataNumber::F64(f)) => {
            buf.extend_from_slice(&f.to_le_bytes());
            TAG_F64
        }
        PdataValue::Str(s) => {
            buf.extend_from_slice(s.as_bytes());
            TAG_STR
        }
        PdataValue::Array(_) | PdataValue::Object(_) => {
            cbor4ii::serde::to_writer(&mut *buf, value)
                .map_err(|e| CodecError::Cbor(e.to_string()))?;
            TAG_NESTED_CBOR
        }
    })
}

/// Encode every member of `schema`, taking values from `document`.
///
/// Members the document lacks are written as their zero value; document
/// fields the schema does not declare are not written.
///
/// **IMPORTANT**: The index is sorted by name_hash. The reader relies on it
/// for binary search.
pub fn encode_document(document: &Document, schema: &Schema) -> Result<Vec<u8>, CodecError> {
    let mut entries: Vec<(u64, Cow<'_, PdataValue>)> = Vec::with_capacity(schema.members.len());
    for member in schema.members.iter() {
        let value = match document.value(&member.name) {
            Some(v) => Cow::Borrowed(v),
            None => {
                let zero = schema
                    .zero_field(member)
                    .map_err(|_| CodecError::UnresolvedArraySize(member.name.clone()))?;
                Cow::Owned(zero.value)
            }
        };
        entries.push((name_hash(&member.name), value));
    }

    entries.sort_unstable_by_key(|(hash, _)| *hash);
    if let Some(pair) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(CodecError::HashCollision(pair[0].0));
    }

    let field_count = entries.len();
    let data_start = HEADER_SIZE + field_count * INDEX_ENTRY_SIZE;
    let mut buf: Vec<u8> = Vec::with_capacity(data_start + field_count * 16);
    // resize zero-fills the header/index area so entries can be written by index.
    buf.resize(data_start, 0);
    buf[0..4].copy_from_slice(&(field_count as u32).to_le_bytes());

    for (i, (hash, value)) in entries.iter().enumerate() {
        let data_offset = buf.len();
        let tag = write_field_into(&mut buf, value)?;
        let data_length = buf.len() - data_offset;

        let idx = HEADER_SIZE + i * INDEX_ENTRY_SIZE;
        let entry = &mut buf[idx..idx + INDEX_ENTRY_SIZE];
        entry[0..8].copy_from_slice(&hash.to_le_bytes());
        entry[8..12].copy_from_slice(&(data_offset as u32).to_le_bytes());
        entry[12..16].copy_from_slice(&(data_length as u32).to_le_bytes());
        entry[16] = tag;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Member, MemberList};

    #[test]
    fn test_index_sorted_by_hash() {
        let schema = Schema {
            members: MemberList::try_from_members(
                ["a", "b", "c", "d", "e", "f"]
                    .iter()
                    .map(|n| Member::scalar(n, "int"))
                    .collect(),
            )
            .unwrap(),
            ..Schema::default()
        };
        let buf = encode_document(&Document::new(), &schema).unwrap();

        let hashes: Vec<u64> = (0..6)
            .map(|i| {
                let idx = HEADER_SIZE + i * INDEX_ENTRY_SIZE;
                u64::from_le_bytes(buf[idx..idx + 8].try_into().unwrap())
            })
            .collect();
        let mut sorted = hashes.clone();
        sorted.sort_unstable();
        assert_eq!(hashes, sorted);
    }

    #[test]
    fn test_write_field_tags() {
        let mut buf = Vec::new();
        assert_eq!(write_field_into(&mut buf, &PdataValue::Null).unwrap(), TAG_NULL);
        assert_eq!(write_field_into(&mut buf, &PdataValue::from(1i64)).unwrap(), TAG_I64);
        assert_eq!(write_field_into(&mut buf, &PdataValue::from(1u64)).unwrap(), TAG_U64);
        assert_eq!(write_field_into(&mut buf, &PdataValue::from(1.0)).unwrap(), TAG_F64);
        assert_eq!(write_field_into(&mut buf, &PdataValue::from("x")).unwrap(), TAG_STR);
        assert_eq!(
            write_field_into(&mut buf, &PdataValue::from(vec![1i64])).unwrap(),
            TAG_NESTED_CBOR
        );
    }
}
