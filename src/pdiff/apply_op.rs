use crate::error::ConsistencyError;
use crate::pdata_value::PdataValue;
use crate::types::{DeltaRecord, Document, Field, Member, Schema, SchemaDiff};
use smol_str::SmolStr;
use tracing::debug;

// ─── IndexKey ───────────────────────────────────────────────────────────────

/// How a delta addresses one array slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexKey {
    Position(usize),
    /// Resolved by the symbol's order in the array's sizing enum.
    Symbol(SmolStr),
}

impl IndexKey {
    /// Decimal keys are positions, anything else is an enum symbol.
    /// Surrounding whitespace and a leading '+' are accepted on positions.
    pub fn parse(key: &str) -> Self {
        match key.trim().parse::<usize>() {
            Ok(n) => IndexKey::Position(n),
            Err(_) => IndexKey::Symbol(SmolStr::from(key)),
        }
    }
}

/// Resolve `key` to a position within `member`'s array (no range check).
pub fn resolve_index(schema: &Schema, member: &Member, key: &IndexKey) -> Result<usize, ConsistencyError> {
    let symbol = match key {
        IndexKey::Position(n) => return Ok(*n),
        IndexKey::Symbol(s) => s,
    };
    let enum_name = member
        .size_enum()
        .ok_or_else(|| ConsistencyError::SymbolicIndexOnFixedArray {
            member: member.name.clone(),
            key: symbol.clone(),
        })?;
    let symbols = schema
        .enum_symbols(enum_name)
        .ok_or_else(|| ConsistencyError::UnresolvedArraySize {
            member: member.name.clone(),
            enum_name: enum_name.clone(),
        })?;
    symbols
        .iter()
        .position(|s| s == symbol)
        .ok_or_else(|| ConsistencyError::UnknownEnumSymbol {
            enum_name: enum_name.clone(),
            symbol: symbol.clone(),
        })
}

// ════════════════════════════════════════════════════════════════════════
// Single-slot splice
// ════════════════════════════════════════════════════════════════════════

/// Make sure `member` has an array entry of at least its resolved length.
///
/// Absent entries are synthesized zero-filled. A stored array shorter than the
/// current length (its enum has grown since it was saved) is padded.
fn ensure_array(document: &mut Document, schema: &Schema, member: &Member) -> Result<usize, ConsistencyError> {
    let len = schema.require_len(member)?;
    match document.get_mut(&member.name) {
        None => {
            document.insert(member.name.clone(), schema.zero_field(member)?);
        }
        Some(field) => {
            if !matches!(field.value, PdataValue::Array(_)) {
                field.value = PdataValue::Array(Vec::new());
            }
            if let PdataValue::Array(items) = &mut field.value {
                if items.len() < len {
                    items.resize(len, schema.zero_value(&member.ty));
                    field.array_size = Some(len);
                }
            }
        }
    }
    Ok(len)
}

/// Write one array slot of `member` and return the updated document.
///
/// Only the addressed slot changes; every other slot keeps its prior value.
pub fn splice_one(
    mut document: Document,
    schema: &Schema,
    member: &Member,
    key: &IndexKey,
    value: PdataValue,
) -> Result<Document, ConsistencyError> {
    let len = ensure_array(&mut document, schema, member)?;
    let index = resolve_index(schema, member, key)?;
    if index >= len {
        return Err(ConsistencyError::IndexOutOfRange {
            member: member.name.clone(),
            index,
            len,
        });
    }
    let field = document
        .get_mut(&member.name)
        .ok_or_else(|| ConsistencyError::MissingMember(member.name.clone()))?;
    if let PdataValue::Array(items) = &mut field.value {
        items[index] = value;
    }
    Ok(document)
}

/// Overwrite a scalar member wholesale. No check against the prior value.
pub fn overwrite_scalar(mut document: Document, member: &Member, value: PdataValue) -> Document {
    document.insert(
        member.name.clone(),
        Field {
            ty: member.ty.clone(),
            array_size: None,
            native_array_size: member.native_array_size.clone(),
            value,
        },
    );
    document
}

// ════════════════════════════════════════════════════════════════════════
// Per-diff fold
// ════════════════════════════════════════════════════════════════════════

fn apply_member(
    mut document: Document,
    schema: &Schema,
    diff: &SchemaDiff,
    name: &SmolStr,
    payload: &PdataValue,
) -> Result<Document, ConsistencyError> {
    if !diff.declares(name) {
        return Err(ConsistencyError::UndeclaredDeltaMember {
            fingerprint: diff.fingerprint.clone(),
            member: name.clone(),
        });
    }
    let member = schema
        .member(name)
        .ok_or_else(|| ConsistencyError::UnknownMember(name.clone()))?;

    if !member.is_array() {
        return Ok(overwrite_scalar(document, member, payload.clone()));
    }

    let len = ensure_array(&mut document, schema, member)?;
    match payload {
        PdataValue::Array(items) => {
            if items.len() > len {
                // Trailing slots belong to enum symbols no active pdiff declares now.
                debug!(
                    member = %name,
                    stored = items.len(),
                    len,
                    "dropping array slots beyond the current length"
                );
            }
            for (i, item) in items.iter().take(len).enumerate() {
                document = splice_one(document, schema, member, &IndexKey::Position(i), item.clone())?;
            }
        }
        PdataValue::Object(slots) => {
            for (key, item) in slots {
                document = splice_one(document, schema, member, &IndexKey::parse(key), item.clone())?;
            }
        }
        _ => return Err(ConsistencyError::InvalidArrayPayload(name.clone())),
    }
    Ok(document)
}

/// Reconstruct a full document from `baseline` and each diff's stored delta.
///
/// Works on a private copy of the baseline. Diffs are folded in order and see
/// each other's writes, so the order must match the one used at extraction.
/// Any error discards the copy; `baseline` is never touched.
pub fn apply(
    baseline: &Document,
    effective: &Schema,
    diffs: &[(SchemaDiff, DeltaRecord)],
) -> Result<Document, ConsistencyError> {
    let mut working = baseline.clone();
    for (diff, record) in diffs {
        debug!(
            fingerprint = %diff.fingerprint,
            members = record.len(),
            "splicing pdiff delta"
        );
        for (name, payload) in record.iter() {
            working = apply_member(working, effective, diff, name, payload)?;
        }
    }
    Ok(working)
}
