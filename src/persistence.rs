use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec::{HybridCodec, PdataCodec};
use crate::db::{BaselineStore, DeltaStore, PlayerId};
use crate::error::{PersistenceError, StoreError};
use crate::ordered_map::FastHashSet;
use crate::parse::{DefinitionParser, JsonDefinitionParser};
use crate::pdiff::{ExtractedDeltas, apply, build_effective_schema, extract, validate_schema};
use crate::types::{DeltaRecord, Schema, SchemaDiff};

// ─── Configuration ──────────────────────────────────────────────────────────

/// What to do with a mod whose pdiff text does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Fail the whole request.
    #[default]
    Reject,
    /// Log at `warn` and continue as if the mod had no pdiff.
    SkipMod,
}

/// Configuration for [`ModPersistence::with_parts`].
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub parse_policy: ParsePolicy,
    /// Whether `split_upload` writes the extracted deltas to the store.
    ///
    /// Default: true.
    pub persist_deltas: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            parse_policy: ParsePolicy::Reject,
            persist_deltas: true,
        }
    }
}

// ─── Definitions ────────────────────────────────────────────────────────────

/// The base schema and the buffer new players start from. Immutable once loaded.
#[derive(Debug)]
pub struct PdataDefinitions {
    base: Schema,
    default_baseline: Vec<u8>,
}

impl PdataDefinitions {
    /// Parse a JSON base schema and pair it with the default baseline buffer.
    pub fn load(schema_text: &str, default_baseline: Vec<u8>) -> Result<Self, PersistenceError> {
        let base = JsonDefinitionParser.parse_schema(schema_text)?;
        Self::from_schema(base, default_baseline)
    }

    pub fn from_schema(base: Schema, default_baseline: Vec<u8>) -> Result<Self, PersistenceError> {
        validate_schema(&base)?;
        Ok(Self {
            base,
            default_baseline,
        })
    }

    #[inline]
    pub fn base(&self) -> &Schema {
        &self.base
    }

    #[inline]
    pub fn default_baseline(&self) -> &[u8] {
        &self.default_baseline
    }
}

// ─── Requests ───────────────────────────────────────────────────────────────

/// One entry of a player's ordered mod list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModSource {
    pub name: String,
    /// Raw pdiff text. Mods without one take no part in persistence.
    pub pdiff: Option<String>,
}

impl ModSource {
    pub fn new(name: impl Into<String>, pdiff: Option<String>) -> Self {
        Self {
            name: name.into(),
            pdiff,
        }
    }
}

/// Result of splitting an uploaded save.
#[derive(Debug, Clone)]
pub struct SplitUpload {
    /// The stored baseline, re-encoded under the base schema.
    pub baseline: Vec<u8>,
    pub deltas: ExtractedDeltas,
}

// ─── ModPersistence ─────────────────────────────────────────────────────────

/// Splits uploaded saves into baseline + per-mod deltas, and rebuilds a save
/// for any set of active mods.
pub struct ModPersistence<S, C = HybridCodec, P = JsonDefinitionParser> {
    definitions: Arc<PdataDefinitions>,
    store: S,
    codec: C,
    parser: P,
    config: PersistenceConfig,
}

impl<S> ModPersistence<S>
where
    S: DeltaStore + BaselineStore,
{
    pub fn new(definitions: Arc<PdataDefinitions>, store: S) -> Self {
        Self::with_parts(
            definitions,
            store,
            HybridCodec,
            JsonDefinitionParser,
            PersistenceConfig::default(),
        )
    }
}

impl<S, C, P> ModPersistence<S, C, P>
where
    S: DeltaStore + BaselineStore,
    C: PdataCodec,
    P: DefinitionParser,
{
    pub fn with_parts(
        definitions: Arc<PdataDefinitions>,
        store: S,
        codec: C,
        parser: P,
        config: PersistenceConfig,
    ) -> Self {
        Self {
            definitions,
            store,
            codec,
            parser,
            config,
        }
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn definitions(&self) -> &PdataDefinitions {
        &self.definitions
    }

    /// Parse the pdiffs of `mods` in mod order.
    ///
    /// Mods without a pdiff are ignored. A pdiff whose text appears twice is
    /// kept once, at its first position.
    fn parse_diffs(&self, mods: &[ModSource]) -> Result<Vec<SchemaDiff>, PersistenceError> {
        let mut seen: FastHashSet<String> = FastHashSet::default();
        let mut diffs = Vec::with_capacity(mods.len());
        for source in mods {
            let Some(text) = source.pdiff.as_deref() else {
                continue;
            };
            let diff = match self.parser.parse_schema_diff(text) {
                Ok(diff) => diff,
                Err(e) if self.config.parse_policy == ParsePolicy::SkipMod => {
                    warn!(mod_name = %source.name, error = %e, "skipping mod with malformed pdiff");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if !seen.insert(diff.fingerprint.clone()) {
                debug!(mod_name = %source.name, fingerprint = %diff.fingerprint, "duplicate pdiff ignored");
                continue;
            }
            diffs.push(diff);
        }
        Ok(diffs)
    }

    /// The base schema with every active pdiff folded in, in mod order.
    pub fn effective_schema(&self, mods: &[ModSource]) -> Result<Schema, PersistenceError> {
        let diffs = self.parse_diffs(mods)?;
        Ok(build_effective_schema(self.definitions.base(), &diffs)?)
    }

    fn stored_baseline(&self, player: &PlayerId) -> Result<Vec<u8>, PersistenceError> {
        self.store
            .get_baseline(player)?
            .ok_or_else(|| StoreError::MissingBaseline(player.to_string()).into())
    }

    /// Split an uploaded save into per-mod deltas.
    ///
    /// The upload is decoded under the effective schema for `mods` and each
    /// pdiff's members are carved out. The returned baseline is the one
    /// already stored; the upload's base members are not written back.
    /// Deltas are written in one transaction, after every other step has
    /// succeeded, so a failed split leaves the store as it was.
    pub fn split_upload(
        &self,
        player: &PlayerId,
        mods: &[ModSource],
        buffer: &[u8],
    ) -> Result<SplitUpload, PersistenceError> {
        let diffs = self.parse_diffs(mods)?;
        let effective = build_effective_schema(self.definitions.base(), &diffs)?;
        let document = self.codec.decode(buffer, &effective)?;
        let deltas = extract(&document, &diffs)?;

        let stored = self.stored_baseline(player)?;
        let base = self.definitions.base();
        let baseline = self.codec.encode(&self.codec.decode(&stored, base)?, base)?;
        warn!(player, "upload base members discarded; stored baseline returned unchanged");

        // Written last, in one transaction.
        if self.config.persist_deltas {
            self.store.put_deltas(player, &deltas)?;
        }

        info!(
            player,
            mods = diffs.len(),
            members = document.len(),
            persisted = self.config.persist_deltas,
            "split upload"
        );
        Ok(SplitUpload { baseline, deltas })
    }

    /// Rebuild `player`'s save for exactly the pdiffs of `mods`.
    ///
    /// Reads the baseline, then get-or-creates each pdiff's delta in mod
    /// order, splices them onto the baseline and encodes the result under the
    /// effective schema.
    pub fn build_for_mods(&self, player: &PlayerId, mods: &[ModSource]) -> Result<Vec<u8>, PersistenceError> {
        let stored = self.stored_baseline(player)?;
        let baseline = self.codec.decode(&stored, self.definitions.base())?;

        let diffs = self.parse_diffs(mods)?;
        let effective = build_effective_schema(self.definitions.base(), &diffs)?;

        let mut paired: Vec<(SchemaDiff, DeltaRecord)> = Vec::with_capacity(diffs.len());
        for diff in diffs {
            let record = self.store.get_delta(player, &diff.fingerprint)?;
            paired.push((diff, record));
        }

        let document = apply(&baseline, &effective, &paired)?;
        let buffer = self.codec.encode(&document, &effective)?;
        info!(player, mods = paired.len(), bytes = buffer.len(), "built pdata for mods");
        Ok(buffer)
    }
}
