//! # Relationship Store
//!
//! The repository interface the engine mutates through, plus the in-memory
//! backend.
//!
//! All mutation happens inside an explicit unit of work obtained from
//! [`RelationshipStore::begin`]. A unit sees its own staged writes, publishes
//! them together on [`UnitOfWork::commit`], and discards them when dropped
//! uncommitted.
//!
//! ## MemoryStore
//!
//! Optimistic concurrency: every record, group and profile carries a version.
//! A unit remembers the version of everything it read or wrote, and commit
//! fails with [`KinshipError::Conflict`] if any of them moved. A full scan pins
//! the key-set generation of its own table only, so keys created concurrently
//! in that table are detected without tying the unit to unrelated tables.
//! Membership lookups pin a per-profile membership version instead of the
//! whole group table.

use crate::{GroupId, KinshipError, LineageGroup, Profile, ProfileId, RelationshipRecord};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

// =============================================================================
// TRAITS
// =============================================================================

/// Read access to profiles, relationship records and lineage groups.
pub trait RecordReader {
    /// Lookup a profile.
    fn profile(&self, id: &ProfileId) -> Result<Option<Profile>, KinshipError>;

    /// All profiles, ordered by id.
    fn profiles(&self) -> Result<Vec<Profile>, KinshipError>;

    /// Lookup a relationship record.
    fn record(&self, id: &ProfileId) -> Result<Option<RelationshipRecord>, KinshipError>;

    /// All relationship records, ordered by profile id.
    fn records(&self) -> Result<Vec<RelationshipRecord>, KinshipError>;

    /// Lookup a lineage group.
    fn group(&self, id: &GroupId) -> Result<Option<LineageGroup>, KinshipError>;

    /// All lineage groups, ordered by id.
    fn groups(&self) -> Result<Vec<LineageGroup>, KinshipError>;

    /// Every profile, record and group, read from one consistent state.
    fn contents(&self) -> Result<StoreContents, KinshipError> {
        Ok(StoreContents {
            profiles: self.profiles()?,
            records: self.records()?,
            groups: self.groups()?,
        })
    }

    /// Groups listing `profile` as a member.
    fn groups_with_member(&self, profile: &ProfileId) -> Result<Vec<LineageGroup>, KinshipError> {
        Ok(self
            .groups()?
            .into_iter()
            .filter(|g| g.is_member(profile))
            .collect())
    }

    /// Lookup a profile, failing with `ProfileNotFound` when absent.
    fn require_profile(&self, id: &ProfileId) -> Result<Profile, KinshipError> {
        self.profile(id)?
            .ok_or_else(|| KinshipError::ProfileNotFound(id.clone()))
    }

    /// Lookup a group, failing with `GroupNotFound` when absent.
    fn require_group(&self, id: &GroupId) -> Result<LineageGroup, KinshipError> {
        self.group(id)?
            .ok_or_else(|| KinshipError::GroupNotFound(id.clone()))
    }

    /// The record for `id`, or a fresh empty one when none exists yet.
    fn record_or_new(&self, id: &ProfileId) -> Result<RelationshipRecord, KinshipError> {
        Ok(self
            .record(id)?
            .unwrap_or_else(|| RelationshipRecord::new(id.clone())))
    }
}

/// Full contents of a store, each table ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreContents {
    pub profiles: Vec<Profile>,
    pub records: Vec<RelationshipRecord>,
    pub groups: Vec<LineageGroup>,
}

/// An atomic multi-record write scope.
pub trait UnitOfWork: RecordReader {
    /// Stage a profile write.
    fn put_profile(&mut self, profile: Profile) -> Result<(), KinshipError>;

    /// Stage a record write.
    fn put_record(&mut self, record: RelationshipRecord) -> Result<(), KinshipError>;

    /// Stage a group write.
    fn put_group(&mut self, group: LineageGroup) -> Result<(), KinshipError>;

    /// Publish every staged write together.
    fn commit(self) -> Result<(), KinshipError>
    where
        Self: Sized;
}

/// A backend able to open units of work and read views.
pub trait RelationshipStore {
    type Unit<'a>: UnitOfWork
    where
        Self: 'a;

    type View<'a>: RecordReader
    where
        Self: 'a;

    /// Open a unit of work.
    fn begin(&self) -> Result<Self::Unit<'_>, KinshipError>;

    /// Open a read-only view.
    fn view(&self) -> Result<Self::View<'_>, KinshipError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Table {
    Profiles,
    Records,
    Groups,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Key {
    Profile(ProfileId),
    Record(ProfileId),
    Group(GroupId),
    /// The set of groups a profile belongs to.
    Membership(ProfileId),
}

#[derive(Debug, Clone)]
struct Versioned<T> {
    value: T,
    version: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    profiles: BTreeMap<ProfileId, Versioned<Profile>>,
    records: BTreeMap<ProfileId, Versioned<RelationshipRecord>>,
    groups: BTreeMap<GroupId, Versioned<LineageGroup>>,
    /// Moves whenever a commit adds the profile to, or drops it from, a group.
    memberships: BTreeMap<ProfileId, u64>,
    /// Last version handed out.
    clock: u64,
    /// Per table, bumped whenever a commit creates a key in it.
    generations: BTreeMap<Table, u64>,
}

impl MemoryState {
    /// Current version of `key`; 0 when absent.
    fn version(&self, key: &Key) -> u64 {
        match key {
            Key::Profile(id) => self.profiles.get(id).map(|v| v.version),
            Key::Record(id) => self.records.get(id).map(|v| v.version),
            Key::Group(id) => self.groups.get(id).map(|v| v.version),
            Key::Membership(id) => self.memberships.get(id).copied(),
        }
        .unwrap_or(0)
    }

    fn generation(&self, table: Table) -> u64 {
        self.generations.get(&table).copied().unwrap_or(0)
    }

    fn bump(&mut self, table: Table) {
        let generation = self.generations.entry(table).or_insert(0);
        *generation = generation.saturating_add(1);
    }

    /// Install `group`, moving the membership version of every profile whose
    /// membership it changes. Returns true when the key is new.
    fn install_group(&mut self, id: GroupId, value: LineageGroup) -> bool {
        let changed: BTreeSet<ProfileId> = match self.groups.get(&id) {
            Some(old) => old
                .value
                .members
                .symmetric_difference(&value.members)
                .cloned()
                .collect(),
            None => value.members.clone(),
        };
        for profile in changed {
            let version = self.tick();
            self.memberships.insert(profile, version);
        }
        let version = self.tick();
        self.groups.insert(id, Versioned { value, version }).is_none()
    }

    fn tick(&mut self) -> u64 {
        self.clock = self.clock.saturating_add(1);
        self.clock
    }
}

/// In-memory backend with optimistic versioned concurrency.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, KinshipError> {
        self.state
            .read()
            .map_err(|_| KinshipError::Storage("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, KinshipError> {
        self.state
            .write()
            .map_err(|_| KinshipError::Storage("memory store lock poisoned".to_string()))
    }
}

impl RelationshipStore for MemoryStore {
    type Unit<'a> = MemoryUnit<'a>;
    type View<'a> = MemoryView<'a>;

    fn begin(&self) -> Result<MemoryUnit<'_>, KinshipError> {
        Ok(MemoryUnit {
            store: self,
            observed: RefCell::new(BTreeMap::new()),
            scanned: RefCell::new(BTreeMap::new()),
            profiles: BTreeMap::new(),
            records: BTreeMap::new(),
            groups: BTreeMap::new(),
        })
    }

    fn view(&self) -> Result<MemoryView<'_>, KinshipError> {
        Ok(MemoryView { store: self })
    }
}

/// Read-only view over a [`MemoryStore`]. Each read takes the lock briefly;
/// [`RecordReader::contents`] holds it across all three tables.
#[derive(Debug)]
pub struct MemoryView<'a> {
    store: &'a MemoryStore,
}

impl RecordReader for MemoryView<'_> {
    fn profile(&self, id: &ProfileId) -> Result<Option<Profile>, KinshipError> {
        Ok(self.store.read()?.profiles.get(id).map(|v| v.value.clone()))
    }

    fn profiles(&self) -> Result<Vec<Profile>, KinshipError> {
        Ok(self
            .store
            .read()?
            .profiles
            .values()
            .map(|v| v.value.clone())
            .collect())
    }

    fn record(&self, id: &ProfileId) -> Result<Option<RelationshipRecord>, KinshipError> {
        Ok(self.store.read()?.records.get(id).map(|v| v.value.clone()))
    }

    fn records(&self) -> Result<Vec<RelationshipRecord>, KinshipError> {
        Ok(self
            .store
            .read()?
            .records
            .values()
            .map(|v| v.value.clone())
            .collect())
    }

    fn group(&self, id: &GroupId) -> Result<Option<LineageGroup>, KinshipError> {
        Ok(self.store.read()?.groups.get(id).map(|v| v.value.clone()))
    }

    fn groups(&self) -> Result<Vec<LineageGroup>, KinshipError> {
        Ok(self
            .store
            .read()?
            .groups
            .values()
            .map(|v| v.value.clone())
            .collect())
    }

    fn contents(&self) -> Result<StoreContents, KinshipError> {
        let state = self.store.read()?;
        Ok(StoreContents {
            profiles: state.profiles.values().map(|v| v.value.clone()).collect(),
            records: state.records.values().map(|v| v.value.clone()).collect(),
            groups: state.groups.values().map(|v| v.value.clone()).collect(),
        })
    }
}

/// A unit of work over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryUnit<'a> {
    store: &'a MemoryStore,
    /// First version seen for every key read or written.
    observed: RefCell<BTreeMap<Key, u64>>,
    /// Key-set generation of each table at its first full scan.
    scanned: RefCell<BTreeMap<Table, u64>>,
    profiles: BTreeMap<ProfileId, Profile>,
    records: BTreeMap<ProfileId, RelationshipRecord>,
    groups: BTreeMap<GroupId, LineageGroup>,
}

impl MemoryUnit<'_> {
    fn observe(&self, key: Key, version: u64) {
        self.observed.borrow_mut().entry(key).or_insert(version);
    }

    fn mark_scan(&self, table: Table, generation: u64) {
        self.scanned.borrow_mut().entry(table).or_insert(generation);
    }

    fn observe_current(&self, key: Key) -> Result<(), KinshipError> {
        let version = self.store.read()?.version(&key);
        self.observe(key, version);
        Ok(())
    }

    /// Number of staged writes.
    #[must_use]
    pub fn staged(&self) -> usize {
        self.profiles.len() + self.records.len() + self.groups.len()
    }
}

impl RecordReader for MemoryUnit<'_> {
    fn profile(&self, id: &ProfileId) -> Result<Option<Profile>, KinshipError> {
        if let Some(staged) = self.profiles.get(id) {
            return Ok(Some(staged.clone()));
        }
        let state = self.store.read()?;
        let found = state.profiles.get(id);
        self.observe(Key::Profile(id.clone()), found.map(|v| v.version).unwrap_or(0));
        Ok(found.map(|v| v.value.clone()))
    }

    fn profiles(&self) -> Result<Vec<Profile>, KinshipError> {
        let mut all = BTreeMap::new();
        {
            let state = self.store.read()?;
            self.mark_scan(Table::Profiles, state.generation(Table::Profiles));
            for (id, v) in &state.profiles {
                self.observe(Key::Profile(id.clone()), v.version);
                all.insert(id.clone(), v.value.clone());
            }
        }
        for (id, p) in &self.profiles {
            all.insert(id.clone(), p.clone());
        }
        Ok(all.into_values().collect())
    }

    fn record(&self, id: &ProfileId) -> Result<Option<RelationshipRecord>, KinshipError> {
        if let Some(staged) = self.records.get(id) {
            return Ok(Some(staged.clone()));
        }
        let state = self.store.read()?;
        let found = state.records.get(id);
        self.observe(Key::Record(id.clone()), found.map(|v| v.version).unwrap_or(0));
        Ok(found.map(|v| v.value.clone()))
    }

    fn records(&self) -> Result<Vec<RelationshipRecord>, KinshipError> {
        let mut all = BTreeMap::new();
        {
            let state = self.store.read()?;
            self.mark_scan(Table::Records, state.generation(Table::Records));
            for (id, v) in &state.records {
                self.observe(Key::Record(id.clone()), v.version);
                all.insert(id.clone(), v.value.clone());
            }
        }
        for (id, r) in &self.records {
            all.insert(id.clone(), r.clone());
        }
        Ok(all.into_values().collect())
    }

    fn group(&self, id: &GroupId) -> Result<Option<LineageGroup>, KinshipError> {
        if let Some(staged) = self.groups.get(id) {
            return Ok(Some(staged.clone()));
        }
        let state = self.store.read()?;
        let found = state.groups.get(id);
        self.observe(Key::Group(id.clone()), found.map(|v| v.version).unwrap_or(0));
        Ok(found.map(|v| v.value.clone()))
    }

    fn groups(&self) -> Result<Vec<LineageGroup>, KinshipError> {
        let mut all = BTreeMap::new();
        {
            let state = self.store.read()?;
            self.mark_scan(Table::Groups, state.generation(Table::Groups));
            for (id, v) in &state.groups {
                self.observe(Key::Group(id.clone()), v.version);
                all.insert(id.clone(), v.value.clone());
            }
        }
        for (id, g) in &self.groups {
            all.insert(id.clone(), g.clone());
        }
        Ok(all.into_values().collect())
    }

    fn groups_with_member(&self, profile: &ProfileId) -> Result<Vec<LineageGroup>, KinshipError> {
        let mut found = BTreeMap::new();
        {
            let state = self.store.read()?;
            let membership = Key::Membership(profile.clone());
            self.observe(membership.clone(), state.version(&membership));
            for (id, v) in &state.groups {
                if v.value.is_member(profile) && !self.groups.contains_key(id) {
                    self.observe(Key::Group(id.clone()), v.version);
                    found.insert(id.clone(), v.value.clone());
                }
            }
        }
        for (id, g) in self.groups.iter().filter(|(_, g)| g.is_member(profile)) {
            found.insert(id.clone(), g.clone());
        }
        Ok(found.into_values().collect())
    }
}

impl UnitOfWork for MemoryUnit<'_> {
    fn put_profile(&mut self, profile: Profile) -> Result<(), KinshipError> {
        self.observe_current(Key::Profile(profile.id.clone()))?;
        self.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    fn put_record(&mut self, record: RelationshipRecord) -> Result<(), KinshipError> {
        self.observe_current(Key::Record(record.profile_id.clone()))?;
        self.records.insert(record.profile_id.clone(), record);
        Ok(())
    }

    fn put_group(&mut self, group: LineageGroup) -> Result<(), KinshipError> {
        self.observe_current(Key::Group(group.group_id.clone()))?;
        self.groups.insert(group.group_id.clone(), group);
        Ok(())
    }

    fn commit(self) -> Result<(), KinshipError> {
        let MemoryUnit {
            store,
            observed,
            scanned,
            profiles,
            records,
            groups,
        } = self;
        let observed = observed.into_inner();
        let scanned = scanned.into_inner();
        let mut state = store.write()?;

        if let Some((table, seen)) = scanned
            .iter()
            .find(|(table, seen)| state.generation(**table) != **seen)
        {
            warn!(
                ?table,
                seen,
                current = state.generation(*table),
                "key set changed since scan"
            );
            return Err(KinshipError::Conflict);
        }
        if let Some((key, seen)) = observed
            .iter()
            .find(|(key, seen)| state.version(key) != **seen)
        {
            warn!(?key, seen, current = state.version(key), "version moved");
            return Err(KinshipError::Conflict);
        }

        let mut created = BTreeSet::new();
        for (id, value) in profiles {
            let version = state.tick();
            if state
                .profiles
                .insert(id, Versioned { value, version })
                .is_none()
            {
                created.insert(Table::Profiles);
            }
        }
        for (id, value) in records {
            let version = state.tick();
            if state
                .records
                .insert(id, Versioned { value, version })
                .is_none()
            {
                created.insert(Table::Records);
            }
        }
        for (id, value) in groups {
            if state.install_group(id, value) {
                created.insert(Table::Groups);
            }
        }
        for table in created {
            state.bump(table);
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
