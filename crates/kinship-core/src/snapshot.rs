//! # Snapshot Format
//!
//! Whole-store export and import.
//!
//! A [`Snapshot`] is captured from any reader and restored through any unit of
//! work, so it also moves data between the memory and redb backends.
//!
//! Binary form: Header (5 bytes) + postcard payload.
//! - 4 bytes: Magic ("KINS")
//! - 1 byte: Version
//!
//! File I/O and the JSON form live in the app layer.

use crate::primitives::{MAGIC_BYTES, MAX_SNAPSHOT_PAYLOAD_SIZE, SNAPSHOT_VERSION};
use crate::store::{RecordReader, StoreContents, UnitOfWork};
use crate::{KinshipError, LineageGroup, Profile, RelationshipRecord};
use serde::{Deserialize, Serialize};

const HEADER_LEN: usize = 5;

/// Every profile, record and group of a store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u8,
    pub profiles: Vec<Profile>,
    pub records: Vec<RelationshipRecord>,
    pub groups: Vec<LineageGroup>,
}

impl Snapshot {
    /// Read everything visible to `reader` from one consistent state.
    pub fn capture<R: RecordReader + ?Sized>(reader: &R) -> Result<Self, KinshipError> {
        let StoreContents {
            profiles,
            records,
            groups,
        } = reader.contents()?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            profiles,
            records,
            groups,
        })
    }

    /// Stage every item into `unit`. Existing keys are overwritten.
    pub fn restore<U: UnitOfWork + ?Sized>(&self, unit: &mut U) -> Result<(), KinshipError> {
        self.check_version()?;
        for profile in &self.profiles {
            unit.put_profile(profile.clone())?;
        }
        for record in &self.records {
            unit.put_record(record.clone())?;
        }
        for group in &self.groups {
            unit.put_group(group.clone())?;
        }
        Ok(())
    }

    fn check_version(&self) -> Result<(), KinshipError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(KinshipError::Serialization(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        Ok(())
    }

    /// Serialize to header + payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KinshipError> {
        let payload =
            postcard::to_stdvec(self).map_err(|e| KinshipError::Serialization(e.to_string()))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC_BYTES);
        bytes.push(SNAPSHOT_VERSION);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Deserialize from header + payload. The header is validated first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KinshipError> {
        if bytes.len() < HEADER_LEN {
            return Err(KinshipError::Serialization("Header too short".to_string()));
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        if &header[0..4] != MAGIC_BYTES {
            return Err(KinshipError::Serialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if header[4] != SNAPSHOT_VERSION {
            return Err(KinshipError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                header[4], SNAPSHOT_VERSION
            )));
        }
        if payload.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
            return Err(KinshipError::Serialization(format!(
                "Payload too large: {} bytes (max {})",
                payload.len(),
                MAX_SNAPSHOT_PAYLOAD_SIZE
            )));
        }
        let snapshot: Self =
            postcard::from_bytes(payload).map_err(|e| KinshipError::Serialization(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }
}
