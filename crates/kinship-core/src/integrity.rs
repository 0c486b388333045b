//! # Integrity Audit
//!
//! Whole-store check of the relationship invariants:
//! reciprocity, gender-correct types, no duplicates, no self-loops,
//! acyclic parent/child edges and no edges into archived records.

use crate::store::RecordReader;
use crate::{
    EdgeList, Gender, KinshipError, ProfileId, RelationshipRecord, RelationshipType,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// A single broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Violation {
    /// A record holds an entry pointing at itself.
    SelfLoop { profile: ProfileId },
    /// The same target appears more than once in one list.
    Duplicate {
        owner: ProfileId,
        target: ProfileId,
        list: EdgeList,
    },
    /// The entry targets a profile that does not exist.
    UnknownProfile { owner: ProfileId, target: ProfileId },
    /// The target holds no mirror entry for the owner.
    MissingReciprocal {
        owner: ProfileId,
        target: ProfileId,
        list: EdgeList,
    },
    /// The stored type does not match the target's gender.
    WrongType {
        owner: ProfileId,
        target: ProfileId,
        found: RelationshipType,
        expected: RelationshipType,
    },
    /// An active record points at an archived one.
    ArchivedReference { owner: ProfileId, target: ProfileId },
    /// The profile is its own ancestor.
    Cycle { profile: ProfileId },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfLoop { profile } => write!(f, "{profile} is related to itself"),
            Self::Duplicate {
                owner,
                target,
                list,
            } => write!(f, "{owner} lists {target} more than once in {list}"),
            Self::UnknownProfile { owner, target } => {
                write!(f, "{owner} references unknown profile {target}")
            }
            Self::MissingReciprocal {
                owner,
                target,
                list,
            } => write!(
                f,
                "{owner} lists {target} in {list} but {target} does not list {owner} back"
            ),
            Self::WrongType {
                owner,
                target,
                found,
                expected,
            } => write!(f, "{owner} stores {target} as {found}, expected {expected}"),
            Self::ArchivedReference { owner, target } => {
                write!(f, "{owner} references archived profile {target}")
            }
            Self::Cycle { profile } => write!(f, "{profile} is its own ancestor"),
        }
    }
}

fn reaches_itself(records: &BTreeMap<ProfileId, RelationshipRecord>, start: &ProfileId) -> bool {
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        let Some(record) = records.get(current) else {
            continue;
        };
        for child in &record.children {
            if &child.profile == start {
                return true;
            }
            if visited.insert(&child.profile) {
                queue.push_back(&child.profile);
            }
        }
    }
    false
}

/// Check every record in the store. An empty result means the graph is sound.
pub fn audit<R: RecordReader + ?Sized>(reader: &R) -> Result<Vec<Violation>, KinshipError> {
    let genders: BTreeMap<ProfileId, Gender> = reader
        .profiles()?
        .into_iter()
        .map(|p| (p.id, p.gender))
        .collect();
    let records: BTreeMap<ProfileId, RelationshipRecord> = reader
        .records()?
        .into_iter()
        .map(|r| (r.profile_id.clone(), r))
        .collect();

    let mut violations = BTreeSet::new();
    for (owner, record) in &records {
        for list in EdgeList::ALL {
            let mut seen = BTreeSet::new();
            for entry in record.entries(list) {
                let target = entry.profile;
                if target == owner {
                    violations.insert(Violation::SelfLoop {
                        profile: owner.clone(),
                    });
                    continue;
                }
                if !seen.insert(target) {
                    violations.insert(Violation::Duplicate {
                        owner: owner.clone(),
                        target: target.clone(),
                        list,
                    });
                }
                let Some(gender) = genders.get(target) else {
                    violations.insert(Violation::UnknownProfile {
                        owner: owner.clone(),
                        target: target.clone(),
                    });
                    continue;
                };
                let expected = RelationshipType::for_list(list, *gender);
                if entry.relationship != expected {
                    violations.insert(Violation::WrongType {
                        owner: owner.clone(),
                        target: target.clone(),
                        found: entry.relationship,
                        expected,
                    });
                }
                match records.get(target) {
                    Some(other) if other.is_archived() && !record.is_archived() => {
                        violations.insert(Violation::ArchivedReference {
                            owner: owner.clone(),
                            target: target.clone(),
                        });
                    }
                    Some(other) if other.contains(list.reciprocal(), owner) => {}
                    _ => {
                        violations.insert(Violation::MissingReciprocal {
                            owner: owner.clone(),
                            target: target.clone(),
                            list,
                        });
                    }
                }
            }
        }
        if reaches_itself(&records, owner) {
            violations.insert(Violation::Cycle {
                profile: owner.clone(),
            });
        }
    }

    Ok(violations.into_iter().collect())
}
