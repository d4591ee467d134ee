//! Per-mod persistence for player save data.
//!
//! A player's save is stored as a baseline (encoded under the base schema)
//! plus one delta per mod pdiff. Uploads are split into those parts, and a
//! save for any set of active mods is rebuilt by splicing the deltas back
//! onto the baseline.

pub mod codec;
pub mod db;
pub mod deserialization;
pub mod error;
pub mod fingerprint;
pub mod ordered_map;
pub mod parse;
pub mod pdata_value;
pub mod pdiff;
pub mod persistence;
pub mod serialization;
pub mod types;

pub use codec::{HybridCodec, PdataCodec};
pub use db::{BaselineStore, DeltaStore, PdataDb};
pub use error::PersistenceError;
pub use parse::{DefinitionParser, JsonDefinitionParser};
pub use persistence::{
    ModPersistence, ModSource, ParsePolicy, PdataDefinitions, PersistenceConfig, SplitUpload,
};
