use crate::error::ParseError;
use crate::fingerprint::fingerprint;
use crate::types::{Schema, SchemaDiff};

/// Turns definition source text into schema values.
pub trait DefinitionParser: Send + Sync {
    fn parse_schema(&self, text: &str) -> Result<Schema, ParseError>;

    /// The returned diff carries the fingerprint of `text`.
    fn parse_schema_diff(&self, text: &str) -> Result<SchemaDiff, ParseError>;
}

/// JSON definitions: `{"members": [...], "enums": {...}, "structs": {...}}`,
/// plus `"enumAdds"` for diffs.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDefinitionParser;

impl DefinitionParser for JsonDefinitionParser {
    fn parse_schema(&self, text: &str) -> Result<Schema, ParseError> {
        Ok(serde_json::from_str(text)?)
    }

    fn parse_schema_diff(&self, text: &str) -> Result<SchemaDiff, ParseError> {
        let mut diff: SchemaDiff = serde_json::from_str(text)?;
        diff.fingerprint = fingerprint(text);
        Ok(diff)
    }
}
