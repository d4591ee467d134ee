use crate::error::StoreError;
use crate::pdiff::ExtractedDeltas;
use crate::types::DeltaRecord;

/// Alias for player ids. Must not contain ':' (it separates delta key parts).
pub type PlayerId = str;

/// Per-player, per-pdiff delta records.
pub trait DeltaStore: Send + Sync {
    /// Get-or-create: a missing record is stored as empty and returned.
    fn get_delta(&self, player: &PlayerId, fingerprint: &str) -> Result<DeltaRecord, StoreError>;

    fn put_delta(
        &self,
        player: &PlayerId,
        fingerprint: &str,
        record: &DeltaRecord,
    ) -> Result<(), StoreError>;

    /// Store every record of one split. Either all are written or none are.
    fn put_deltas(&self, player: &PlayerId, deltas: &ExtractedDeltas) -> Result<(), StoreError>;
}

/// Per-player baseline buffers, encoded under the base schema.
pub trait BaselineStore: Send + Sync {
    fn get_baseline(&self, player: &PlayerId) -> Result<Option<Vec<u8>>, StoreError>;

    fn put_baseline(&self, player: &PlayerId, buffer: &[u8]) -> Result<(), StoreError>;
}

/// Build the `mod_deltas` key `player:fingerprint`.
pub fn delta_key(player: &PlayerId, fingerprint: &str) -> Result<String, StoreError> {
    check_player(player)?;
    Ok(format!("{player}:{fingerprint}"))
}

pub fn check_player(player: &PlayerId) -> Result<(), StoreError> {
    if player.is_empty() || player.contains(':') {
        return Err(StoreError::InvalidKey(player.to_string()));
    }
    Ok(())
}
