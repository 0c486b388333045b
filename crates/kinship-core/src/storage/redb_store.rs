//! # redb-backed Relationship Storage
//!
//! A disk-backed relationship store using the redb embedded database.
//!
//! - Units of work are redb write transactions (single writer, so commits
//!   never conflict; a second writer waits for the first).
//! - Views are MVCC read transactions and observe one consistent snapshot.
//! - Values are `postcard`-encoded, keyed by the profile or group id.

use crate::store::{RecordReader, RelationshipStore, UnitOfWork};
use crate::{GroupId, KinshipError, LineageGroup, Profile, ProfileId, RelationshipRecord};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for profiles: ProfileId -> serialized Profile bytes
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// Table for relationship records: ProfileId -> serialized RelationshipRecord bytes
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Table for lineage groups: GroupId -> serialized LineageGroup bytes
const GROUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("groups");

fn io_err(e: impl std::fmt::Display) -> KinshipError {
    KinshipError::Storage(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, KinshipError> {
    postcard::to_allocvec(value).map_err(|e| KinshipError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, KinshipError> {
    postcard::from_bytes(bytes).map_err(|e| KinshipError::Serialization(e.to_string()))
}

fn load<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> Result<Option<T>, KinshipError> {
    match table.get(key).map_err(io_err)? {
        Some(guard) => decode(guard.value()).map(Some),
        None => Ok(None),
    }
}

fn load_all<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
) -> Result<Vec<T>, KinshipError> {
    let mut out = Vec::new();
    for entry in table.iter().map_err(io_err)? {
        let (_, value) = entry.map_err(io_err)?;
        out.push(decode(value.value())?);
    }
    Ok(out)
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreCounts {
    pub profiles: u64,
    pub records: u64,
    pub groups: u64,
}

/// A disk-backed relationship store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a relationship database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KinshipError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(PROFILES).map_err(io_err)?;
            let _ = write_txn.open_table(RECORDS).map_err(io_err)?;
            let _ = write_txn.open_table(GROUPS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Row counts for every table.
    pub fn counts(&self) -> Result<StoreCounts, KinshipError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let profiles = read_txn.open_table(PROFILES).map_err(io_err)?;
        let records = read_txn.open_table(RECORDS).map_err(io_err)?;
        let groups = read_txn.open_table(GROUPS).map_err(io_err)?;
        Ok(StoreCounts {
            profiles: profiles.len().map_err(io_err)?,
            records: records.len().map_err(io_err)?,
            groups: groups.len().map_err(io_err)?,
        })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), KinshipError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }
}

impl RelationshipStore for RedbStore {
    type Unit<'a> = RedbUnit;
    type View<'a> = RedbView;

    fn begin(&self) -> Result<RedbUnit, KinshipError> {
        let txn = self.db.begin_write().map_err(io_err)?;
        Ok(RedbUnit { txn })
    }

    fn view(&self) -> Result<RedbView, KinshipError> {
        let txn = self.db.begin_read().map_err(io_err)?;
        Ok(RedbView { txn })
    }
}

// =============================================================================
// READ VIEW
// =============================================================================

/// A consistent read snapshot of a [`RedbStore`].
pub struct RedbView {
    txn: ReadTransaction,
}

impl RecordReader for RedbView {
    fn profile(&self, id: &ProfileId) -> Result<Option<Profile>, KinshipError> {
        let table = self.txn.open_table(PROFILES).map_err(io_err)?;
        load(&table, id.as_str())
    }

    fn profiles(&self) -> Result<Vec<Profile>, KinshipError> {
        let table = self.txn.open_table(PROFILES).map_err(io_err)?;
        load_all(&table)
    }

    fn record(&self, id: &ProfileId) -> Result<Option<RelationshipRecord>, KinshipError> {
        let table = self.txn.open_table(RECORDS).map_err(io_err)?;
        load(&table, id.as_str())
    }

    fn records(&self) -> Result<Vec<RelationshipRecord>, KinshipError> {
        let table = self.txn.open_table(RECORDS).map_err(io_err)?;
        load_all(&table)
    }

    fn group(&self, id: &GroupId) -> Result<Option<LineageGroup>, KinshipError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        load(&table, id.as_str())
    }

    fn groups(&self) -> Result<Vec<LineageGroup>, KinshipError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        load_all(&table)
    }
}

// =============================================================================
// UNIT OF WORK
// =============================================================================

/// A unit of work over a [`RedbStore`]. Dropping it aborts the transaction.
pub struct RedbUnit {
    txn: WriteTransaction,
}

impl RecordReader for RedbUnit {
    fn profile(&self, id: &ProfileId) -> Result<Option<Profile>, KinshipError> {
        let table = self.txn.open_table(PROFILES).map_err(io_err)?;
        load(&table, id.as_str())
    }

    fn profiles(&self) -> Result<Vec<Profile>, KinshipError> {
        let table = self.txn.open_table(PROFILES).map_err(io_err)?;
        load_all(&table)
    }

    fn record(&self, id: &ProfileId) -> Result<Option<RelationshipRecord>, KinshipError> {
        let table = self.txn.open_table(RECORDS).map_err(io_err)?;
        load(&table, id.as_str())
    }

    fn records(&self) -> Result<Vec<RelationshipRecord>, KinshipError> {
        let table = self.txn.open_table(RECORDS).map_err(io_err)?;
        load_all(&table)
    }

    fn group(&self, id: &GroupId) -> Result<Option<LineageGroup>, KinshipError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        load(&table, id.as_str())
    }

    fn groups(&self) -> Result<Vec<LineageGroup>, KinshipError> {
        let table = self.txn.open_table(GROUPS).map_err(io_err)?;
        load_all(&table)
    }
}

impl UnitOfWork for RedbUnit {
    fn put_profile(&mut self, profile: Profile) -> Result<(), KinshipError> {
        let bytes = encode(&profile)?;
        let mut table = self.txn.open_table(PROFILES).map_err(io_err)?;
        table
            .insert(profile.id.as_str(), bytes.as_slice())
            .map_err(io_err)?;
        Ok(())
    }

    fn put_record(&mut self, record: RelationshipRecord) -> Result<(), KinshipError> {
        let bytes = encode(&record)?;
        let mut table = self.txn.open_table(RECORDS).map_err(io_err)?;
        table
            .insert(record.profile_id.as_str(), bytes.as_slice())
            .map_err(io_err)?;
        Ok(())
    }

    fn put_group(&mut self, group: LineageGroup) -> Result<(), KinshipError> {
        let bytes = encode(&group)?;
        let mut table = self.txn.open_table(GROUPS).map_err(io_err)?;
        table
            .insert(group.group_id.as_str(), bytes.as_slice())
            .map_err(io_err)?;
        Ok(())
    }

    fn commit(self) -> Result<(), KinshipError> {
        self.txn.commit().map_err(io_err)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Gender, RelationshipType};
    use chrono::{DateTime, Utc};
    use tempfile::tempdir;

    fn at() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("timestamp")
    }

    #[test]
    fn records_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("kin.redb");

        {
            let store = RedbStore::open(&db_path).expect("open db");
            let mut unit = store.begin().expect("begin");
            unit.put_profile(Profile::new("dad", Gender::Male))
                .expect("put");
            let mut record = RelationshipRecord::new(ProfileId::from("kid"));
            record.push(ProfileId::from("dad"), RelationshipType::Father, true, at());
            unit.put_record(record).expect("put");
            unit.commit().expect("commit");
        }

        let store = RedbStore::open(&db_path).expect("reopen db");
        let view = store.view().expect("view");
        let record = view
            .record(&ProfileId::from("kid"))
            .expect("read")
            .expect("record present");
        assert_eq!(record.parents.len(), 1);
        assert_eq!(record.parents[0].added_at, at());
        assert_eq!(
            store.counts().expect("counts"),
            StoreCounts {
                profiles: 1,
                records: 1,
                groups: 0
            }
        );
    }

    #[test]
    fn uncommitted_unit_is_discarded() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("kin.redb")).expect("open db");

        {
            let mut unit = store.begin().expect("begin");
            unit.put_group(LineageGroup::new(GroupId::from("g")))
                .expect("put");
            assert!(unit.group(&GroupId::from("g")).expect("read").is_some());
        }

        let view = store.view().expect("view");
        assert!(view.groups().expect("scan").is_empty());
    }
}
