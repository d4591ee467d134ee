use crate::codec::*;
use crate::error::CodecError;
use crate::pdata_value::{PdataNumber, PdataValue};
use crate::serialization::name_hash;
use crate::types::{Document, Field, Member, Schema};
use smol_str::SmolStr;

// ─── Reader ─────────────────────────────────────────────────────────────────

/// Borrowed view over an encoded buffer. Validated once at construction.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    pub data_buf: &'a [u8],
    pub field_count: usize,
}

impl<'a> RecordView<'a> {
    /// Validate the header and index bounds.
    pub fn new(buf: &'a [u8]) -> Result<Self, CodecError> {
        if buf.len() < HEADER_SIZE {
            return Err(CodecError::InvalidBuffer);
        }
        let field_count = u32::from_le_bytes(
            buf[0..4]
                .try_into()
                .map_err(|_| CodecError::InvalidBuffer)?,
        ) as usize;
        let min_size = HEADER_SIZE + field_count * INDEX_ENTRY_SIZE;
        if buf.len() < min_size {
            return Err(CodecError::InvalidBuffer);
        }
        Ok(Self {
            data_buf: buf,
            field_count,
        })
    }

    #[inline]
    fn read_u32(&self, at: usize) -> usize {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data_buf[at..at + 4]);
        u32::from_le_bytes(bytes) as usize
    }

    #[inline]
    fn read_hash(&self, i: usize) -> u64 {
        let idx = HEADER_SIZE + i * INDEX_ENTRY_SIZE;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data_buf[idx..idx + 8]);
        u64::from_le_bytes(bytes)
    }

    pub fn read_index(&self, i: usize) -> Option<IndexEntry> {
        if i >= self.field_count {
            return None;
        }
        let idx = HEADER_SIZE + i * INDEX_ENTRY_SIZE;
        Some(IndexEntry {
            name_hash: self.read_hash(i),
            data_offset: self.read_u32(idx + 8),
            data_len: self.read_u32(idx + 12),
            type_tag: self.data_buf[idx + 16],
        })
    }

    /// Binary search on the sorted hash index.
    pub fn find(&self, hash: u64) -> Option<IndexEntry> {
        let mut lo = 0usize;
        let mut hi = self.field_count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.read_hash(mid).cmp(&hash) {
                std::cmp::Ordering::Equal => return self.read_index(mid),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    /// Raw bytes of a field, bounds-checked against the buffer.
    pub fn field_ref(&self, entry: IndexEntry) -> Result<FieldRef<'a>, CodecError> {
        let end = entry
            .data_offset
            .checked_add(entry.data_len)
            .ok_or(CodecError::InvalidBuffer)?;
        let data = self
            .data_buf
            .get(entry.data_offset..end)
            .ok_or(CodecError::InvalidBuffer)?;
        Ok(FieldRef {
            name_hash: entry.name_hash,
            type_tag: entry.type_tag,
            data,
        })
    }
}

// ─── Decode Field ───────────────────────────────────────────────────────────

fn fixed8(data: &[u8]) -> Result<[u8; 8], CodecError> {
    data.try_into().map_err(|_| CodecError::InvalidBuffer)
}

/// Decode a raw field reference into a value.
pub fn decode_field(field: FieldRef<'_>) -> Result<PdataValue, CodecError> {
    Ok(match field.type_tag {
        TAG_NULL => PdataValue::Null,
        TAG_BOOL => PdataValue::Bool(*field.data.first().ok_or(CodecError::InvalidBuffer)? != 0),
        TAG_I64 => PdataValue::Number(PdataNumber::I64(i64::from_le_bytes(fixed8(field.data)?))),
        TAG_U64 => PdataValue::Number(PdataNumber::U64(u64::from_le_bytes(fixed8(field.data)?))),
        TAG_F64 => PdataValue::Number(PdataNumber::F64(f64::from_le_bytes(fixed8(field.data)?))),
        TAG_STR => PdataValue::Str(SmolStr::from(
            std::str::from_utf8(field.data).map_err(|_| CodecError::InvalidBuffer)?,
        )),
        TAG_NESTED_CBOR => {
            let cbor_val: cbor4ii::core::Value = cbor4ii::serde::from_slice(field.data)
                .map_err(|e| CodecError::Cbor(format!("{e:?}")))?;
            PdataValue::from(cbor_val)
        }
        other => return Err(CodecError::UnknownTypeTag(other)),
    })
}

// ─── Decode Document ────────────────────────────────────────────────────────

/// Fit a stored array to the length the schema resolves to now.
fn fit_array(schema: &Schema, member: &Member, value: PdataValue, len: usize) -> PdataValue {
    let mut items = match value {
        PdataValue::Array(items) => items,
        // A scalar stored under an array member: start from zeros.
        _ => Vec::new(),
    };
    items.resize(len, schema.zero_value(&member.ty));
    PdataValue::Array(items)
}

/// Decode `buf` under `schema`. Every schema member is present in the result,
/// in schema order; members missing from the buffer take their zero value.
pub fn decode_document(buf: &[u8], schema: &Schema) -> Result<Document, CodecError> {
    let view = RecordView::new(buf)?;
    let mut document = Document::new();

    for member in schema.members.iter() {
        let array_size = match member.array_size {
            Some(_) => Some(
                schema
                    .resolve_len(member)
                    .ok_or_else(|| CodecError::UnresolvedArraySize(member.name.clone()))?,
            ),
            None => None,
        };

        let stored = match view.find(name_hash(&member.name)) {
            Some(entry) => Some(decode_field(view.field_ref(entry)?)?),
            None => None,
        };
        let value = match (stored, array_size) {
            (Some(v), Some(len)) => fit_array(schema, member, v, len),
            (Some(v), None) => v,
            (None, Some(len)) => PdataValue::Array(vec![schema.zero_value(&member.ty); len]),
            (None, None) => schema.zero_value(&member.ty),
        };

        document.insert(
            member.name.clone(),
            Field {
                ty: member.ty.clone(),
                array_size,
                native_array_size: member.native_array_size.clone(),
                value,
            },
        );
    }
    Ok(document)
}
