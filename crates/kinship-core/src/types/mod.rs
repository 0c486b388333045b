//! # Core Type Definitions
//!
//! This module contains all core types for the Kinship relationship graph:
//! - Identifiers (`ProfileId`, `GroupId`)
//! - Profile data owned outside the engine (`Profile`, `Gender`)
//! - Relationship vocabulary (`RelationshipType`, `EdgeList`, `Scenario`)
//! - Per-profile edge storage (`RelationshipRecord`, `KinEntry`, `SpouseEntry`)
//! - Lineage groupings (`LineageGroup`)
//! - Transplant modes (`TransplantMode`)
//! - Error types (`KinshipError`)
//!
//! ## Reading an edge
//!
//! An entry `{profile: Q, relationship: T}` in one of P's lists reads
//! "Q is P's T". `P.parents` holding `{Q, Father}` means Q is P's father.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a profile (an individual person).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

impl ProfileId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a lineage grouping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// Gender of a profile. Drives gendered relationship names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => f.write_str("Male"),
            Self::Female => f.write_str("Female"),
        }
    }
}

impl FromStr for Gender {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            _ => Err(KinshipError::InvalidGender(s.to_string())),
        }
    }
}

/// A person as seen by the engine.
///
/// Profiles are owned by an external store; the engine never edits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

impl Profile {
    #[must_use]
    pub fn new(id: impl Into<ProfileId>, gender: Gender) -> Self {
        Self {
            id: id.into(),
            first_name: String::new(),
            last_name: String::new(),
            gender,
            date_of_birth: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    #[must_use]
    pub fn born(mut self, date: NaiveDate) -> Self {
        self.date_of_birth = Some(date);
        self
    }

    /// "First Last", or the id when no name is set.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.id.to_string()
        } else {
            full.to_string()
        }
    }
}

impl From<String> for ProfileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// RELATIONSHIP VOCABULARY
// =============================================================================

/// The four edge lists held on every relationship record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeList {
    Parents,
    Siblings,
    Spouses,
    Children,
}

impl EdgeList {
    /// All lists in storage order.
    pub const ALL: [Self; 4] = [Self::Parents, Self::Siblings, Self::Spouses, Self::Children];

    /// The list the reciprocal entry lands in.
    #[must_use]
    pub const fn reciprocal(self) -> Self {
        match self {
            Self::Parents => Self::Children,
            Self::Children => Self::Parents,
            Self::Siblings => Self::Siblings,
            Self::Spouses => Self::Spouses,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Parents => "parents",
            Self::Siblings => "siblings",
            Self::Spouses => "spouses",
            Self::Children => "children",
        }
    }
}

impl fmt::Display for EdgeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// The eight recognized relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    Father,
    Mother,
    Son,
    Daughter,
    Brother,
    Sister,
    Husband,
    Wife,
}

impl RelationshipType {
    pub const ALL: [Self; 8] = [
        Self::Father,
        Self::Mother,
        Self::Son,
        Self::Daughter,
        Self::Brother,
        Self::Sister,
        Self::Husband,
        Self::Wife,
    ];

    /// The record list an entry of this type is stored in.
    #[must_use]
    pub const fn list(self) -> EdgeList {
        match self {
            Self::Father | Self::Mother => EdgeList::Parents,
            Self::Son | Self::Daughter => EdgeList::Children,
            Self::Brother | Self::Sister => EdgeList::Siblings,
            Self::Husband | Self::Wife => EdgeList::Spouses,
        }
    }

    /// Gender a profile must have to hold this role.
    #[must_use]
    pub const fn required_gender(self) -> Gender {
        match self {
            Self::Father | Self::Son | Self::Brother | Self::Husband => Gender::Male,
            Self::Mother | Self::Daughter | Self::Sister | Self::Wife => Gender::Female,
        }
    }

    /// The gendered type of `list` for a profile of `gender`.
    #[must_use]
    pub const fn for_list(list: EdgeList, gender: Gender) -> Self {
        match (list, gender) {
            (EdgeList::Parents, Gender::Male) => Self::Father,
            (EdgeList::Parents, Gender::Female) => Self::Mother,
            (EdgeList::Children, Gender::Male) => Self::Son,
            (EdgeList::Children, Gender::Female) => Self::Daughter,
            (EdgeList::Siblings, Gender::Male) => Self::Brother,
            (EdgeList::Siblings, Gender::Female) => Self::Sister,
            (EdgeList::Spouses, Gender::Male) => Self::Husband,
            (EdgeList::Spouses, Gender::Female) => Self::Wife,
        }
    }

    /// Reverse type, gendered for the profile the reciprocal entry describes.
    ///
    /// father/mother -> son/daughter, son/daughter -> father/mother,
    /// brother/sister -> brother/sister, husband/wife -> husband/wife.
    #[must_use]
    pub const fn reverse(self, gender: Gender) -> Self {
        Self::for_list(self.list().reciprocal(), gender)
    }

    /// Same family, re-gendered.
    #[must_use]
    pub const fn with_gender(self, gender: Gender) -> Self {
        Self::for_list(self.list(), gender)
    }

    /// Whether this type asserts a parent/child edge.
    #[must_use]
    pub const fn is_lineal(self) -> bool {
        matches!(self.list(), EdgeList::Parents | EdgeList::Children)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Father => "father",
            Self::Mother => "mother",
            Self::Son => "son",
            Self::Daughter => "daughter",
            Self::Brother => "brother",
            Self::Sister => "sister",
            Self::Husband => "husband",
            Self::Wife => "wife",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for RelationshipType {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == lowered)
            .ok_or_else(|| KinshipError::InvalidType(s.to_string()))
    }
}

/// Opt-in cascade rules bundled with a primary edge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scenario {
    Siblings,
    Mother,
    Father,
    Parents,
    Children,
}

impl Scenario {
    pub const ALL: [Self; 5] = [
        Self::Siblings,
        Self::Mother,
        Self::Father,
        Self::Parents,
        Self::Children,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Siblings => "siblings",
            Self::Mother => "mother",
            Self::Father => "father",
            Self::Parents => "parents",
            Self::Children => "children",
        }
    }

    /// Parse a scenario name. Returns `None` for unknown names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.name() == lowered)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// =============================================================================
// RELATIONSHIP RECORD
// =============================================================================

/// A parent, sibling or child entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinEntry {
    pub profile: ProfileId,
    pub relationship: RelationshipType,
    pub is_biological: bool,
    pub added_at: DateTime<Utc>,
}

/// A spouse entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpouseEntry {
    pub profile: ProfileId,
    pub relationship: RelationshipType,
    pub is_current: bool,
    pub marriage_date: Option<NaiveDate>,
    pub divorce_date: Option<NaiveDate>,
    pub added_at: DateTime<Utc>,
}

/// Lifecycle state of a record. Transplant `replace` archives the focus node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    Active,
    Archived,
}

/// Fields common to every entry regardless of list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef<'a> {
    pub list: EdgeList,
    pub profile: &'a ProfileId,
    pub relationship: RelationshipType,
    pub is_biological: bool,
}

/// Edge storage for one profile. Created lazily on the first edge and never
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub profile_id: ProfileId,
    #[serde(default)]
    pub parents: Vec<KinEntry>,
    #[serde(default)]
    pub siblings: Vec<KinEntry>,
    #[serde(default)]
    pub spouses: Vec<SpouseEntry>,
    #[serde(default)]
    pub children: Vec<KinEntry>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl RelationshipRecord {
    /// Empty record for `profile_id`.
    #[must_use]
    pub fn new(profile_id: ProfileId) -> Self {
        Self {
            profile_id,
            parents: Vec::new(),
            siblings: Vec::new(),
            spouses: Vec::new(),
            children: Vec::new(),
            status: RecordStatus::Active,
        }
    }

    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.status == RecordStatus::Archived
    }

    /// True when every list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
            && self.siblings.is_empty()
            && self.spouses.is_empty()
            && self.children.is_empty()
    }

    fn kin_list(&self, list: EdgeList) -> Option<&Vec<KinEntry>> {
        match list {
            EdgeList::Parents => Some(&self.parents),
            EdgeList::Siblings => Some(&self.siblings),
            EdgeList::Children => Some(&self.children),
            EdgeList::Spouses => None,
        }
    }

    fn kin_list_mut(&mut self, list: EdgeList) -> Option<&mut Vec<KinEntry>> {
        match list {
            EdgeList::Parents => Some(&mut self.parents),
            EdgeList::Siblings => Some(&mut self.siblings),
            EdgeList::Children => Some(&mut self.children),
            EdgeList::Spouses => None,
        }
    }

    /// Entries of one list, in insertion order.
    pub fn entries(&self, list: EdgeList) -> Vec<EntryRef<'_>> {
        match self.kin_list(list) {
            Some(kin) => kin
                .iter()
                .map(|e| EntryRef {
                    list,
                    profile: &e.profile,
                    relationship: e.relationship,
                    is_biological: e.is_biological,
                })
                .collect(),
            None => self
                .spouses
                .iter()
                .map(|e| EntryRef {
                    list,
                    profile: &e.profile,
                    relationship: e.relationship,
                    is_biological: true,
                })
                .collect(),
        }
    }

    /// Every entry across all four lists.
    pub fn all_entries(&self) -> Vec<EntryRef<'_>> {
        EdgeList::ALL
            .into_iter()
            .flat_map(|list| self.entries(list))
            .collect()
    }

    /// Profile ids held in `list`.
    pub fn targets(&self, list: EdgeList) -> Vec<&ProfileId> {
        self.entries(list).into_iter().map(|e| e.profile).collect()
    }

    /// Every related profile (parents, siblings, spouses, children).
    pub fn relatives(&self) -> Vec<&ProfileId> {
        self.all_entries().into_iter().map(|e| e.profile).collect()
    }

    /// Whether `list` holds an entry for `target`.
    #[must_use]
    pub fn contains(&self, list: EdgeList, target: &ProfileId) -> bool {
        self.entries(list).iter().any(|e| e.profile == target)
    }

    /// Find a kin entry (parents, siblings, children) for `target`.
    #[must_use]
    pub fn kin_entry(&self, list: EdgeList, target: &ProfileId) -> Option<&KinEntry> {
        self.kin_list(list)?.iter().find(|e| &e.profile == target)
    }

    /// First spouse entry marked current with the given type.
    #[must_use]
    pub fn current_spouse(&self, relationship: RelationshipType) -> Option<&SpouseEntry> {
        self.spouses
            .iter()
            .find(|s| s.is_current && s.relationship == relationship)
    }

    /// Append an entry to the list matching `relationship`.
    ///
    /// Spouse entries are always asserted as current.
    pub fn push(
        &mut self,
        target: ProfileId,
        relationship: RelationshipType,
        is_biological: bool,
        added_at: DateTime<Utc>,
    ) {
        match self.kin_list_mut(relationship.list()) {
            Some(kin) => kin.push(KinEntry {
                profile: target,
                relationship,
                is_biological,
                added_at,
            }),
            None => self.spouses.push(SpouseEntry {
                profile: target,
                relationship,
                is_current: true,
                marriage_date: None,
                divorce_date: None,
                added_at,
            }),
        }
    }

    /// Remove every `{target, relationship}` entry. Returns the number removed.
    pub fn remove(&mut self, target: &ProfileId, relationship: RelationshipType) -> usize {
        self.retain_in(relationship.list(), |profile, stored| {
            profile != target || stored != relationship
        })
    }

    /// Remove `target` from every list. Returns the number of entries removed.
    pub fn remove_references(&mut self, target: &ProfileId) -> usize {
        EdgeList::ALL
            .into_iter()
            .map(|list| self.retain_in(list, |profile, _| profile != target))
            .sum()
    }

    fn retain_in<F>(&mut self, list: EdgeList, keep: F) -> usize
    where
        F: Fn(&ProfileId, RelationshipType) -> bool,
    {
        match self.kin_list_mut(list) {
            Some(kin) => {
                let before = kin.len();
                kin.retain(|e| keep(&e.profile, e.relationship));
                before - kin.len()
            }
            None => {
                let before = self.spouses.len();
                self.spouses.retain(|e| keep(&e.profile, e.relationship));
                before - self.spouses.len()
            }
        }
    }

    /// Re-point every entry for `from` onto `to`, re-gendering the stored type
    /// for `to_gender`. Returns the number of entries rewritten.
    pub fn rewrite_references(
        &mut self,
        from: &ProfileId,
        to: &ProfileId,
        to_gender: Gender,
    ) -> usize {
        let mut rewritten = 0;
        for kin in [&mut self.parents, &mut self.siblings, &mut self.children] {
            for entry in kin.iter_mut().filter(|e| &e.profile == from) {
                entry.profile = to.clone();
                entry.relationship = entry.relationship.with_gender(to_gender);
                rewritten += 1;
            }
        }
        for entry in self.spouses.iter_mut().filter(|e| &e.profile == from) {
            entry.profile = to.clone();
            entry.relationship = entry.relationship.with_gender(to_gender);
            rewritten += 1;
        }
        rewritten
    }

    /// Drop every edge, keeping identity and status.
    pub fn clear_edges(&mut self) {
        self.parents.clear();
        self.siblings.clear();
        self.spouses.clear();
        self.children.clear();
    }

    /// Copy of the four edge lists.
    #[must_use]
    pub fn edges(&self) -> EdgeSet {
        EdgeSet {
            parents: self.parents.clone(),
            siblings: self.siblings.clone(),
            spouses: self.spouses.clone(),
            children: self.children.clone(),
        }
    }

    /// Replace the four edge lists.
    pub fn assign_edges(&mut self, edges: EdgeSet) {
        self.parents = edges.parents;
        self.siblings = edges.siblings;
        self.spouses = edges.spouses;
        self.children = edges.children;
    }
}

/// The four edge lists detached from their record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeSet {
    pub parents: Vec<KinEntry>,
    pub siblings: Vec<KinEntry>,
    pub spouses: Vec<SpouseEntry>,
    pub children: Vec<KinEntry>,
}

/// Both sides of a primary relationship after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipPair {
    pub a: RelationshipRecord,
    pub b: RelationshipRecord,
}

// =============================================================================
// LINEAGE GROUPING
// =============================================================================

/// A named collection of profiles plus derived suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageGroup {
    pub group_id: GroupId,
    #[serde(default)]
    pub members: BTreeSet<ProfileId>,
    #[serde(default)]
    pub suggestions: BTreeSet<ProfileId>,
}

impl LineageGroup {
    #[must_use]
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            members: BTreeSet::new(),
            suggestions: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn is_member(&self, profile: &ProfileId) -> bool {
        self.members.contains(profile)
    }

    /// Union `candidates` into suggestions, skipping members.
    /// Returns how many new suggestions were added.
    pub fn suggest<'a>(&mut self, candidates: impl IntoIterator<Item = &'a ProfileId>) -> usize {
        let mut added = 0;
        for candidate in candidates {
            if !self.members.contains(candidate) && self.suggestions.insert(candidate.clone()) {
                added += 1;
            }
        }
        added
    }
}

// =============================================================================
// TRANSPLANT MODE
// =============================================================================

/// How an incoming node is joined onto a focus node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransplantMode {
    /// Incoming becomes the given relation of the focus node.
    AppendAs(RelationshipType),
    /// Incoming takes over every edge of the focus node, which is archived.
    Replace,
}

impl fmt::Display for TransplantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppendAs(t) => write!(f, "append-as-{}", t),
            Self::Replace => f.write_str("replace"),
        }
    }
}

impl FromStr for TransplantMode {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered == "replace" {
            return Ok(Self::Replace);
        }
        lowered
            .strip_prefix("append-as-")
            .and_then(|rest| rest.parse::<RelationshipType>().ok())
            .map(Self::AppendAs)
            .ok_or_else(|| KinshipError::InvalidMode(s.to_string()))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Kinship engine.
///
/// Validation errors are user-facing and returned unmodified.
/// `UnhandledScenario` is an internal contract break.
#[derive(Debug, Error)]
pub enum KinshipError {
    /// The requested profile does not exist.
    #[error("Profile not found: {0}")]
    ProfileNotFound(ProfileId),

    /// The requested lineage group does not exist.
    #[error("Lineage group not found: {0}")]
    GroupNotFound(GroupId),

    /// The relationship type is not one of the eight recognized values.
    #[error("Invalid relationship type: {0}")]
    InvalidType(String),

    /// The gender string is not recognized.
    #[error("Invalid gender: {0}")]
    InvalidGender(String),

    /// The transplant mode string is not recognized.
    #[error("Invalid transplant mode: {0} (expected 'replace' or 'append-as-<type>')")]
    InvalidMode(String),

    /// A profile cannot be related to itself.
    #[error("Profile {0} cannot be related to itself")]
    SelfRelationship(ProfileId),

    /// The profile's gender does not fit the requested role.
    #[error("{profile} must be {expected} to be a {relationship}")]
    GenderMismatch {
        profile: ProfileId,
        expected: Gender,
        relationship: RelationshipType,
    },

    /// A parent must be born before the child.
    #[error("{parent} cannot be a parent of {child}: parent is not older")]
    ChronologyViolation { parent: ProfileId, child: ProfileId },

    /// The exact edge already exists.
    #[error("{subject} is already linked to {object} as {relationship}")]
    DuplicateRelationship {
        subject: ProfileId,
        object: ProfileId,
        relationship: RelationshipType,
    },

    /// The edge would make a profile its own ancestor.
    #[error("{parent} is a descendant of {child}; linking would create a cycle")]
    CircularRelationship { parent: ProfileId, child: ProfileId },

    /// One or more scenario names are not allowed for the relationship type.
    #[error(
        "Invalid scenarios for {relationship}: {}. Valid scenarios are: {}",
        invalid.join(", "),
        valid.join(", ")
    )]
    InvalidScenario {
        relationship: RelationshipType,
        invalid: Vec<String>,
        valid: Vec<String>,
    },

    /// The requested traversal depth is above the supported maximum.
    #[error("Traversal depth {requested} exceeds the maximum of {max}")]
    DepthOutOfRange { requested: usize, max: usize },

    /// A cascade reached a relationship type it has no rule for.
    #[error("Unhandled scenario cascade for relationship type: {0}")]
    UnhandledScenario(RelationshipType),

    /// The transplant could not complete; nothing was applied.
    #[error("Transplant aborted after {attempts} attempt(s): {reason}")]
    TransplantAborted { attempts: u32, reason: String },

    /// The node is archived and cannot take part in the operation.
    #[error("Profile {0} is archived")]
    ArchivedNode(ProfileId),

    /// A lineage group with this id already exists.
    #[error("Lineage group already exists: {0}")]
    GroupExists(GroupId),

    /// The profile is already a member of the group.
    #[error("Profile {profile} is already a member of {group}")]
    AlreadyMember { group: GroupId, profile: ProfileId },

    /// The audit found broken invariants in the stored graph.
    #[error("Integrity audit found {0} violation(s)")]
    IntegrityViolations(usize),

    /// A concurrent unit of work changed data this unit depends on.
    #[error("Concurrent modification detected; unit of work rolled back")]
    Conflict,

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl KinshipError {
    /// Errors produced by the validation guard.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ProfileNotFound(_)
                | Self::InvalidType(_)
                | Self::SelfRelationship(_)
                | Self::GenderMismatch { .. }
                | Self::ChronologyViolation { .. }
                | Self::DuplicateRelationship { .. }
                | Self::CircularRelationship { .. }
                | Self::InvalidScenario { .. }
                | Self::DepthOutOfRange { .. }
                | Self::ArchivedNode(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("timestamp")
    }

    #[test]
    fn reverse_table_is_gender_correct() {
        use RelationshipType::*;
        assert_eq!(Father.reverse(Gender::Male), Son);
        assert_eq!(Father.reverse(Gender::Female), Daughter);
        assert_eq!(Mother.reverse(Gender::Male), Son);
        assert_eq!(Son.reverse(Gender::Female), Mother);
        assert_eq!(Daughter.reverse(Gender::Male), Father);
        assert_eq!(Brother.reverse(Gender::Female), Sister);
        assert_eq!(Sister.reverse(Gender::Male), Brother);
        assert_eq!(Husband.reverse(Gender::Female), Wife);
        assert_eq!(Wife.reverse(Gender::Male), Husband);
    }

    #[test]
    fn relationship_type_parses_all_names() {
        for t in RelationshipType::ALL {
            assert_eq!(t.name().parse::<RelationshipType>().expect("parse"), t);
        }
        assert!(matches!(
            "cousin".parse::<RelationshipType>(),
            Err(KinshipError::InvalidType(s)) if s == "cousin"
        ));
    }

    #[test]
    fn transplant_mode_parses() {
        assert_eq!(
            "replace".parse::<TransplantMode>().expect("parse"),
            TransplantMode::Replace
        );
        assert_eq!(
            "append-as-father".parse::<TransplantMode>().expect("parse"),
            TransplantMode::AppendAs(RelationshipType::Father)
        );
        assert!("append-as-uncle".parse::<TransplantMode>().is_err());
        assert!("merge".parse::<TransplantMode>().is_err());
    }

    #[test]
    fn record_push_routes_by_type() {
        let mut record = RelationshipRecord::new(ProfileId::from("p"));
        record.push(ProfileId::from("f"), RelationshipType::Father, true, at());
        record.push(ProfileId::from("w"), RelationshipType::Wife, true, at());
        record.push(ProfileId::from("s"), RelationshipType::Sister, true, at());
        record.push(ProfileId::from("c"), RelationshipType::Son, true, at());

        assert!(record.contains(EdgeList::Parents, &ProfileId::from("f")));
        assert!(record.contains(EdgeList::Spouses, &ProfileId::from("w")));
        assert!(record.contains(EdgeList::Siblings, &ProfileId::from("s")));
        assert!(record.contains(EdgeList::Children, &ProfileId::from("c")));
        assert!(record.spouses[0].is_current);
        assert_eq!(record.relatives().len(), 4);
    }

    #[test]
    fn rewrite_references_regenders() {
        let mut record = RelationshipRecord::new(ProfileId::from("p"));
        record.push(ProfileId::from("old"), RelationshipType::Son, true, at());
        let n = record.rewrite_references(
            &ProfileId::from("old"),
            &ProfileId::from("new"),
            Gender::Female,
        );
        assert_eq!(n, 1);
        assert_eq!(record.children[0].profile, ProfileId::from("new"));
        assert_eq!(record.children[0].relationship, RelationshipType::Daughter);
    }

    #[test]
    fn remove_references_clears_every_list() {
        let mut record = RelationshipRecord::new(ProfileId::from("p"));
        let x = ProfileId::from("x");
        record.push(x.clone(), RelationshipType::Brother, true, at());
        record.push(x.clone(), RelationshipType::Husband, true, at());
        assert_eq!(record.remove_references(&x), 2);
        assert!(record.is_empty());
    }

    #[test]
    fn remove_matches_profile_and_type() {
        let mut record = RelationshipRecord::new(ProfileId::from("p"));
        let x = ProfileId::from("x");
        record.push(x.clone(), RelationshipType::Son, true, at());
        assert_eq!(record.remove(&x, RelationshipType::Daughter), 0);
        assert!(record.contains(EdgeList::Children, &x));
        assert_eq!(record.remove(&x, RelationshipType::Son), 1);
        assert!(record.is_empty());
    }

    #[test]
    fn group_suggest_skips_members_and_duplicates() {
        let mut group = LineageGroup::new(GroupId::from("g"));
        group.members.insert(ProfileId::from("m"));
        let candidates = [ProfileId::from("m"), ProfileId::from("x")];
        assert_eq!(group.suggest(candidates.iter()), 1);
        assert_eq!(group.suggest(candidates.iter()), 0);
        assert_eq!(group.suggestions.len(), 1);
    }
}
