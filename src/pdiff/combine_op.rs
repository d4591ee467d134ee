use crate::error::SchemaError;
use crate::types::{EnumTable, Member, Schema, SchemaDiff};
use tracing::debug;

// ════════════════════════════════════════════════════════════════════════
// Enum additions
// ════════════════════════════════════════════════════════════════════════

/// Append each diff-declared symbol to its enum. Existing symbols keep their
/// positions; an addition may only target an enum that already exists and may
/// not repeat a symbol.
pub fn apply_enum_additions(schema: &mut Schema, additions: &EnumTable) -> Result<(), SchemaError> {
    for (enum_name, symbols) in additions {
        let existing = schema
            .enums
            .get_mut(enum_name)
            .ok_or_else(|| SchemaError::UnknownEnumAddition(enum_name.clone()))?;
        for symbol in symbols {
            if existing.contains(symbol) {
                return Err(SchemaError::DuplicateEnumSymbol {
                    enum_name: enum_name.clone(),
                    symbol: symbol.clone(),
                });
            }
            existing.push(symbol.clone());
        }
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════
// Fragment merge
// ════════════════════════════════════════════════════════════════════════

/// Every array member sized by an enum must name one this schema declares.
fn check_enum_refs<'a>(
    schema: &Schema,
    members: impl Iterator<Item = &'a Member>,
) -> Result<(), SchemaError> {
    for member in members {
        if let Some(enum_name) = member.size_enum() {
            if !schema.enums.contains_key(enum_name) {
                return Err(SchemaError::UnknownEnum {
                    member: member.name.clone(),
                    enum_name: enum_name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Check a standalone schema (the base definition) for dangling enum references.
pub fn validate_schema(schema: &Schema) -> Result<(), SchemaError> {
    check_enum_refs(schema, schema.members.iter())?;
    for members in schema.structs.values() {
        check_enum_refs(schema, members.iter())?;
    }
    Ok(())
}

/// Fold `fragment` into `target` in place.
///
/// Members: same name is replaced at its existing position, new names are
/// appended in fragment order. Enums and structs: merged by key. A fragment
/// may re-declare an enum only by extending it.
pub fn merge_into(target: &mut Schema, fragment: &Schema) -> Result<(), SchemaError> {
    for (name, symbols) in &fragment.enums {
        match target.enums.get_mut(name) {
            Some(existing) => {
                if !symbols.starts_with(existing) {
                    return Err(SchemaError::EnumRedefined(name.clone()));
                }
                *existing = symbols.clone();
            }
            None => {
                target.enums.insert(name.clone(), symbols.clone());
            }
        }
    }
    for (name, members) in &fragment.structs {
        target.structs.insert(name.clone(), members.clone());
    }
    for member in fragment.members.iter() {
        target.members.upsert(member.clone());
    }

    check_enum_refs(target, fragment.members.iter())?;
    for members in fragment.structs.values() {
        check_enum_refs(target, members.iter())?;
    }
    Ok(())
}

/// `combine(base, fragment)`: a new schema with `fragment` folded onto `base`.
pub fn combine(base: &Schema, fragment: &Schema) -> Result<Schema, SchemaError> {
    let mut combined = base.clone();
    merge_into(&mut combined, fragment)?;
    Ok(combined)
}

/// Build the effective schema for a set of active diffs.
///
/// Diffs are applied in the order given (the player's declared mod order):
/// each diff's enum additions first, then its fragment. Member overrides are
/// order-dependent, so callers must pass the same order every time.
pub fn build_effective_schema(base: &Schema, diffs: &[SchemaDiff]) -> Result<Schema, SchemaError> {
    let mut effective = base.clone();
    for diff in diffs {
        debug!(
            fingerprint = %diff.fingerprint,
            members = diff.fragment.members.len(),
            enum_additions = diff.enum_additions.len(),
            "merging pdiff"
        );
        apply_enum_additions(&mut effective, &diff.enum_additions)?;
        merge_into(&mut effective, &diff.fragment)?;
    }
    Ok(effective)
}
