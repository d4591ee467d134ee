// ─── Error ──────────────────────────────────────────────────────────────────
use smol_str::SmolStr;
use thiserror::Error;

/// Malformed schema or diff source text.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed definition: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Malformed(e.to_string())
    }
}

/// Fatal to a merge. Raised before any splicing happens.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("member '{member}' is sized by undeclared enum '{enum_name}'")]
    UnknownEnum { member: SmolStr, enum_name: SmolStr },
    #[error("enum addition targets undeclared enum '{0}'")]
    UnknownEnumAddition(SmolStr),
    #[error("enum '{enum_name}' already contains symbol '{symbol}'")]
    DuplicateEnumSymbol { enum_name: SmolStr, symbol: SmolStr },
    #[error("duplicate member '{0}' in schema fragment")]
    DuplicateMember(SmolStr),
    #[error("enum '{0}' is redefined with symbols that do not extend the existing ones")]
    EnumRedefined(SmolStr),
}

/// A document or delta disagrees with the schema it is paired with.
/// Fatal to the single request; only ever raised against a working copy.
#[derive(Debug, Error)]
pub enum ConsistencyError {
    #[error("document has no entry for declared member '{0}'")]
    MissingMember(SmolStr),
    #[error("member '{0}' is not defined in the effective schema")]
    UnknownMember(SmolStr),
    #[error("delta for '{fingerprint}' contains '{member}', which its diff does not declare")]
    UndeclaredDeltaMember { fingerprint: String, member: SmolStr },
    #[error("index '{symbol}' is not a symbol of enum '{enum_name}'")]
    UnknownEnumSymbol { enum_name: SmolStr, symbol: SmolStr },
    #[error("array '{member}' has a literal size; symbolic index '{key}' cannot be resolved")]
    SymbolicIndexOnFixedArray { member: SmolStr, key: SmolStr },
    #[error("index {index} is out of range for '{member}' (length {len})")]
    IndexOutOfRange { member: SmolStr, index: usize, len: usize },
    #[error("delta payload for array '{0}' must be a sequence or an index map")]
    InvalidArrayPayload(SmolStr),
    #[error("enum '{enum_name}' referenced by '{member}' is not in the effective schema")]
    UnresolvedArraySize { member: SmolStr, enum_name: SmolStr },
}

/// Binary codec failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid buffer structure")]
    InvalidBuffer,
    #[error("Unknown type tag: {0}")]
    UnknownTypeTag(u8),
    #[error("CBOR error: {0}")]
    Cbor(String),
    #[error("Field name hash collision: {0:#018x}")]
    HashCollision(u64),
    #[error("Schema member '{0}' has an unresolvable array size")]
    UnresolvedArraySize(SmolStr),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Player id contains ':' or key format is otherwise invalid.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("no baseline stored for player '{0}'")]
    MissingBaseline(String),
}

impl From<redb::DatabaseError> for StoreError {
    fn from(e: redb::DatabaseError) -> Self {
        StoreError::Redb(e.into())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        StoreError::Redb(e.into())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        StoreError::Redb(e.into())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        StoreError::Redb(e.into())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        StoreError::Redb(e.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Everything a request through [`crate::persistence::ModPersistence`] can fail with.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
