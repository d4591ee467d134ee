use crate::error::{ConsistencyError, SchemaError};
use crate::ordered_map::OrderedMap;
use crate::pdata_value::{PdataNumber, PdataValue};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// Enum name → ordered symbols. A symbol's position is its integer index.
pub type EnumTable = BTreeMap<SmolStr, Vec<SmolStr>>;

// ─── ArraySize ──────────────────────────────────────────────────────────────

/// Length of an array member: a literal, or the cardinality of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawArraySize", into = "RawArraySize")]
pub enum ArraySize {
    Fixed(usize),
    Enum(SmolStr),
}

/// Definitions write sizes either as numbers or as text; `"10"` is a literal.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawArraySize {
    Number(usize),
    Text(SmolStr),
}

impl From<RawArraySize> for ArraySize {
    fn from(raw: RawArraySize) -> Self {
        match raw {
            RawArraySize::Number(n) => ArraySize::Fixed(n),
            RawArraySize::Text(s) => match s.trim().parse::<usize>() {
                Ok(n) => ArraySize::Fixed(n),
                Err(_) => ArraySize::Enum(s),
            },
        }
    }
}

impl From<ArraySize> for RawArraySize {
    fn from(size: ArraySize) -> Self {
        match size {
            ArraySize::Fixed(n) => RawArraySize::Number(n),
            ArraySize::Enum(s) => RawArraySize::Text(s),
        }
    }
}

// ─── Member ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: SmolStr,
    #[serde(rename = "type")]
    pub ty: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_size: Option<ArraySize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_array_size: Option<ArraySize>,
}

impl Member {
    pub fn scalar(name: &str, ty: &str) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            array_size: None,
            native_array_size: None,
        }
    }

    pub fn fixed_array(name: &str, ty: &str, len: usize) -> Self {
        Self {
            array_size: Some(ArraySize::Fixed(len)),
            ..Self::scalar(name, ty)
        }
    }

    pub fn enum_array(name: &str, ty: &str, enum_name: &str) -> Self {
        Self {
            array_size: Some(ArraySize::Enum(enum_name.into())),
            ..Self::scalar(name, ty)
        }
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.array_size.is_some()
    }

    /// Name of the enum this member's length depends on, if any.
    pub fn size_enum(&self) -> Option<&SmolStr> {
        match &self.array_size {
            Some(ArraySize::Enum(e)) => Some(e),
            _ => None,
        }
    }
}

// ─── MemberList ─────────────────────────────────────────────────────────────

/// Ordered members of one schema or struct. Names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberList(OrderedMap<Member>);

impl MemberList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list that must not repeat a name.
    pub fn try_from_members(members: Vec<Member>) -> Result<Self, SchemaError> {
        let mut list = OrderedMap::with_capacity(members.len());
        for member in members {
            if list.contains(&member.name) {
                return Err(SchemaError::DuplicateMember(member.name));
            }
            list.upsert(member.name.clone(), member);
        }
        Ok(Self(list))
    }

    /// Replace a same-named member in place, or append.
    pub fn upsert(&mut self, member: Member) {
        self.0.upsert(member.name.clone(), member);
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.0.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.0.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.0.keys()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for MemberList {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for MemberList {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let members = Vec::<Member>::deserialize(deserializer)?;
        MemberList::try_from_members(members).map_err(serde::de::Error::custom)
    }
}

// ─── Schema ─────────────────────────────────────────────────────────────────

/// A base definition, a mod's fragment, or the effective combination of both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub members: MemberList,
    #[serde(default)]
    pub enums: EnumTable,
    #[serde(default)]
    pub structs: BTreeMap<SmolStr, MemberList>,
}

impl Schema {
    #[inline]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn enum_symbols(&self, name: &str) -> Option<&[SmolStr]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    /// Resolve a member's array length against the enums as they are now.
    /// `None` for scalars and for enum references this schema cannot satisfy.
    pub fn resolve_len(&self, member: &Member) -> Option<usize> {
        match member.array_size.as_ref()? {
            ArraySize::Fixed(n) => Some(*n),
            ArraySize::Enum(e) => self.enums.get(e).map(Vec::len),
        }
    }

    /// Resolved length of an array member, or a consistency fault if its enum is gone.
    pub fn require_len(&self, member: &Member) -> Result<usize, ConsistencyError> {
        self.resolve_len(member)
            .ok_or_else(|| ConsistencyError::UnresolvedArraySize {
                member: member.name.clone(),
                enum_name: member.size_enum().cloned().unwrap_or_default(),
            })
    }

    /// Zero value for one element of type `ty`.
    pub fn zero_value(&self, ty: &str) -> PdataValue {
        match ty {
            "int" => PdataValue::Number(PdataNumber::I64(0)),
            "float" => PdataValue::Number(PdataNumber::F64(0.0)),
            "bool" => PdataValue::Bool(false),
            "string" | "asset" => PdataValue::Str(SmolStr::default()),
            other => match self.enums.get(other).and_then(|symbols| symbols.first()) {
                Some(first) => PdataValue::Str(first.clone()),
                None => PdataValue::Null,
            },
        }
    }

    /// A member's default field: its zero value, or a zero-filled array of the
    /// resolved length.
    pub fn zero_field(&self, member: &Member) -> Result<Field, ConsistencyError> {
        let (array_size, value) = if member.is_array() {
            let len = self.require_len(member)?;
            (Some(len), PdataValue::Array(vec![self.zero_value(&member.ty); len]))
        } else {
            (None, self.zero_value(&member.ty))
        };
        Ok(Field {
            ty: member.ty.clone(),
            array_size,
            native_array_size: member.native_array_size.clone(),
            value,
        })
    }
}

// ─── SchemaDiff ─────────────────────────────────────────────────────────────

/// One mod's declared extension of the base schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDiff {
    /// Derived from the diff's source text; keys the mod's stored delta.
    #[serde(default)]
    pub fingerprint: String,
    #[serde(flatten)]
    pub fragment: Schema,
    #[serde(default, rename = "enumAdds")]
    pub enum_additions: EnumTable,
}

impl SchemaDiff {
    pub fn new(fingerprint: impl Into<String>, fragment: Schema, enum_additions: EnumTable) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            fragment,
            enum_additions,
        }
    }

    #[inline]
    pub fn declares(&self, member: &str) -> bool {
        self.fragment.members.contains(member)
    }
}

// ─── Document ───────────────────────────────────────────────────────────────

/// One decoded member: its type metadata plus the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub ty: SmolStr,
    /// Resolved length for arrays, `None` for scalars.
    pub array_size: Option<usize>,
    pub native_array_size: Option<ArraySize>,
    pub value: PdataValue,
}

/// A decoded save: member name → field, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(OrderedMap<Field>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.get(name)
    }

    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.0.get_mut(name)
    }

    pub fn insert(&mut self, name: impl Into<SmolStr>, field: Field) {
        self.0.upsert(name, field);
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Field)> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value of `name`, if present.
    pub fn value(&self, name: &str) -> Option<&PdataValue> {
        self.get(name).map(|f| &f.value)
    }
}

impl FromIterator<(SmolStr, Field)> for Document {
    fn from_iter<I: IntoIterator<Item = (SmolStr, Field)>>(iter: I) -> Self {
        Document(iter.into_iter().collect())
    }
}

// ─── DeltaRecord ────────────────────────────────────────────────────────────

/// The slice of a player's data one mod owns.
///
/// Scalar members map to their value. Array members map to either a full
/// sequence or a sparse object keyed by decimal position or enum symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaRecord(OrderedMap<PdataValue>);

impl DeltaRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, member: impl Into<SmolStr>, payload: PdataValue) {
        self.0.upsert(member, payload);
    }

    #[inline]
    pub fn get(&self, member: &str) -> Option<&PdataValue> {
        self.0.get(member)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &PdataValue)> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object form used at rest.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::from(v.clone())))
                .collect(),
        )
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.to_json())
    }

    /// Parse the stored form. Anything but a JSON object is rejected.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(bytes)?;
        Ok(DeltaRecord(
            map.into_iter()
                .map(|(k, v)| (SmolStr::from(k), PdataValue::from(v)))
                .collect(),
        ))
    }
}

impl<K: Into<SmolStr>> FromIterator<(K, PdataValue)> for DeltaRecord {
    fn from_iter<I: IntoIterator<Item = (K, PdataValue)>>(iter: I) -> Self {
        DeltaRecord(iter.into_iter().collect())
    }
}
