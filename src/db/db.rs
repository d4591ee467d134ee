use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::debug;

use super::types::{BaselineStore, DeltaStore, PlayerId, check_player, delta_key};
use crate::error::StoreError;
use crate::pdiff::ExtractedDeltas;
use crate::types::DeltaRecord;

// Key: player id
// Value: baseline buffer (hybrid codec, base schema)
const BASELINES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("baselines");
// Key: "player:fingerprint"
// Value: DeltaRecord as a JSON object
const DELTAS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("mod_deltas");

pub struct PdataDb {
    db: Database,
}

impl PdataDb {
    /// Open or create the database at the specified path.
    /// Also ensures that the required tables exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BASELINES_TABLE)?;
            let _ = write_txn.open_table(DELTAS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Seed `player` with `default_baseline` unless a baseline already exists.
    /// Returns true if the player was created.
    pub fn create_player(&self, player: &PlayerId, default_baseline: &[u8]) -> Result<bool, StoreError> {
        check_player(player)?;
        let write_txn = self.db.begin_write()?;
        let created = {
            let mut table = write_txn.open_table(BASELINES_TABLE)?;
            if table.get(player)?.is_some() {
                false
            } else {
                table.insert(player, default_baseline)?;
                true
            }
        };
        write_txn.commit()?;
        if created {
            debug!(player, "seeded default baseline");
        }
        Ok(created)
    }
}

impl BaselineStore for PdataDb {
    fn get_baseline(&self, player: &PlayerId) -> Result<Option<Vec<u8>>, StoreError> {
        check_player(player)?;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BASELINES_TABLE)?;
        Ok(table.get(player)?.map(|access| access.value().to_vec()))
    }

    fn put_baseline(&self, player: &PlayerId, buffer: &[u8]) -> Result<(), StoreError> {
        check_player(player)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(BASELINES_TABLE)?;
            table.insert(player, buffer)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl DeltaStore for PdataDb {
    fn get_delta(&self, player: &PlayerId, fingerprint: &str) -> Result<DeltaRecord, StoreError> {
        let key = delta_key(player, fingerprint)?;
        // Read and create in one write transaction so two callers never both
        // insert the empty default.
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(DELTAS_TABLE)?;
            let existing = table.get(key.as_str())?.map(|access| access.value().to_vec());
            match existing {
                Some(bytes) => DeltaRecord::from_json_bytes(&bytes)?,
                None => {
                    let empty = DeltaRecord::new();
                    table.insert(key.as_str(), empty.to_json_bytes()?.as_slice())?;
                    debug!(player, fingerprint, "created empty delta");
                    empty
                }
            }
        };
        write_txn.commit()?;
        Ok(record)
    }

    fn put_delta(
        &self,
        player: &PlayerId,
        fingerprint: &str,
        record: &DeltaRecord,
    ) -> Result<(), StoreError> {
        let key = delta_key(player, fingerprint)?;
        let bytes = record.to_json_bytes()?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DELTAS_TABLE)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn put_deltas(&self, player: &PlayerId, deltas: &ExtractedDeltas) -> Result<(), StoreError> {
        check_player(player)?;
        // Keys and payloads are built before the transaction opens.
        let mut rows = Vec::with_capacity(deltas.len());
        for (fingerprint, record) in deltas.iter() {
            rows.push((delta_key(player, fingerprint)?, record.to_json_bytes()?));
        }
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DELTAS_TABLE)?;
            for (key, bytes) in &rows {
                table.insert(key.as_str(), bytes.as_slice())?;
            }
        }
        write_txn.commit()?;
        debug!(player, records = rows.len(), "stored split deltas");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdata_value::PdataValue;
    use pretty_assertions::assert_eq;
    use redb::ReadableTableMetadata;
    use tempfile::NamedTempFile;

    fn open() -> Result<(NamedTempFile, PdataDb), Box<dyn std::error::Error>> {
        let tmp_file = NamedTempFile::new()?;
        let db = PdataDb::new(tmp_file.path())?;
        Ok((tmp_file, db))
    }

    #[test]
    fn test_baseline_put_get() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, db) = open()?;
        assert!(db.get_baseline("p1")?.is_none());

        db.put_baseline("p1", b"buffer")?;
        assert_eq!(db.get_baseline("p1")?, Some(b"buffer".to_vec()));
        Ok(())
    }

    #[test]
    fn test_create_player_only_once() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, db) = open()?;
        assert!(db.create_player("p1", b"default")?);
        db.put_baseline("p1", b"played")?;
        assert!(!db.create_player("p1", b"default")?);
        assert_eq!(db.get_baseline("p1")?, Some(b"played".to_vec()));
        Ok(())
    }

    #[test]
    fn test_get_delta_creates_empty() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, db) = open()?;
        let record = db.get_delta("p1", "abc")?;
        assert!(record.is_empty());

        // The empty record is now stored.
        let read_txn = db.db.begin_read()?;
        let table = read_txn.open_table(DELTAS_TABLE)?;
        assert_eq!(table.get("p1:abc")?.map(|v| v.value().to_vec()), Some(b"{}".to_vec()));
        Ok(())
    }

    #[test]
    fn test_put_then_get_delta() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, db) = open()?;
        let mut record = DeltaRecord::new();
        record.insert("isPDiffWorking", PdataValue::from(1i64));
        db.put_delta("p1", "abc", &record)?;

        assert_eq!(db.get_delta("p1", "abc")?, record);
        assert!(db.get_delta("p2", "abc")?.is_empty());
        assert!(db.get_delta("p1", "def")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_put_deltas_writes_every_record() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, db) = open()?;
        let mut first = DeltaRecord::new();
        first.insert("flagA", PdataValue::from(1i64));
        let mut second = DeltaRecord::new();
        second.insert("flagB", PdataValue::from(true));
        let deltas: ExtractedDeltas = [("fa".to_string(), first.clone()), ("fb".to_string(), second.clone())]
            .into_iter()
            .collect();

        db.put_deltas("p1", &deltas)?;
        assert_eq!(db.get_delta("p1", "fa")?, first);
        assert_eq!(db.get_delta("p1", "fb")?, second);
        Ok(())
    }

    #[test]
    fn test_put_deltas_invalid_player_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, db) = open()?;
        let deltas: ExtractedDeltas = [("fa".to_string(), DeltaRecord::new())].into_iter().collect();
        assert!(matches!(db.put_deltas("a:b", &deltas), Err(StoreError::InvalidKey(_))));

        let read_txn = db.db.begin_read()?;
        let table = read_txn.open_table(DELTAS_TABLE)?;
        assert!(table.is_empty()?);
        Ok(())
    }

    #[test]
    fn test_player_with_separator_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, db) = open()?;
        assert!(matches!(db.get_delta("a:b", "abc"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(db.put_baseline("a:b", b"x"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(db.create_player("", b"x"), Err(StoreError::InvalidKey(_))));
        Ok(())
    }
}
