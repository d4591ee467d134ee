pub mod apply_op;
pub mod combine_op;
pub mod extract_op;

pub use apply_op::{IndexKey, apply, splice_one};
pub use combine_op::{build_effective_schema, combine, validate_schema};
pub use extract_op::{ExtractedDeltas, extract};
