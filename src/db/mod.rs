pub mod db;
pub mod types;

pub use db::PdataDb;
pub use types::{BaselineStore, DeltaStore, PlayerId};
