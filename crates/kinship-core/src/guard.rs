//! # Validation Guard
//!
//! Pre-mutation checks for a request "A is the T of B".
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. self-relationship
//! 2. both profiles exist and neither record is archived
//! 3. gender of A fits T
//! 4. chronology (parent born strictly before child, when both dates known)
//! 5. duplicate edge
//! 6. parent/child cycle
//! 7. scenario allow-list

use crate::store::RecordReader;
use crate::{KinshipError, Profile, ProfileId, RelationshipType, Scenario};
use std::collections::{BTreeSet, VecDeque};

/// Scenarios a relationship type may carry.
#[must_use]
pub const fn allowed_scenarios(relationship: RelationshipType) -> &'static [Scenario] {
    match relationship {
        RelationshipType::Father => &[Scenario::Siblings, Scenario::Mother],
        RelationshipType::Mother => &[Scenario::Siblings, Scenario::Father],
        RelationshipType::Brother | RelationshipType::Sister => {
            &[Scenario::Siblings, Scenario::Parents]
        }
        RelationshipType::Husband | RelationshipType::Wife => &[Scenario::Children],
        RelationshipType::Son | RelationshipType::Daughter => &[],
    }
}

/// Resolve scenario names against the allow-list for `relationship`.
///
/// Duplicates collapse. Unknown or disallowed names are reported together.
pub fn parse_scenarios(
    relationship: RelationshipType,
    names: &[&str],
) -> Result<Vec<Scenario>, KinshipError> {
    let allowed = allowed_scenarios(relationship);
    let mut accepted = BTreeSet::new();
    let mut invalid = Vec::new();

    for name in names {
        match Scenario::parse(name).filter(|s| allowed.contains(s)) {
            Some(scenario) => {
                accepted.insert(scenario);
            }
            None => invalid.push((*name).to_string()),
        }
    }

    if !invalid.is_empty() {
        return Err(KinshipError::InvalidScenario {
            relationship,
            invalid,
            valid: allowed.iter().map(|s| s.name().to_string()).collect(),
        });
    }
    Ok(accepted.into_iter().collect())
}

/// Parent and child of a lineal request "A is the T of B".
fn lineal_roles<'p>(
    a: &'p Profile,
    b: &'p Profile,
    relationship: RelationshipType,
) -> Option<(&'p Profile, &'p Profile)> {
    match relationship {
        RelationshipType::Father | RelationshipType::Mother => Some((a, b)),
        RelationshipType::Son | RelationshipType::Daughter => Some((b, a)),
        _ => None,
    }
}

fn check_gender(profile: &Profile, relationship: RelationshipType) -> Result<(), KinshipError> {
    let expected = relationship.required_gender();
    if profile.gender != expected {
        return Err(KinshipError::GenderMismatch {
            profile: profile.id.clone(),
            expected,
            relationship,
        });
    }
    Ok(())
}

fn check_not_archived<R: RecordReader + ?Sized>(
    reader: &R,
    id: &ProfileId,
) -> Result<(), KinshipError> {
    if reader.record(id)?.is_some_and(|r| r.is_archived()) {
        return Err(KinshipError::ArchivedNode(id.clone()));
    }
    Ok(())
}

/// Whether `target` is reachable from `start` by walking `children` lists.
///
/// Each profile is visited at most once.
pub fn is_descendant<R: RecordReader + ?Sized>(
    reader: &R,
    start: &ProfileId,
    target: &ProfileId,
) -> Result<bool, KinshipError> {
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start.clone());
    queue.push_back(start.clone());

    while let Some(current) = queue.pop_front() {
        let Some(record) = reader.record(&current)? else {
            continue;
        };
        for child in record.children {
            if &child.profile == target {
                return Ok(true);
            }
            if visited.insert(child.profile.clone()) {
                queue.push_back(child.profile);
            }
        }
    }
    Ok(false)
}

/// Validate "A is the T of B" before creation. Returns the accepted scenarios.
pub fn validate_link<R: RecordReader + ?Sized>(
    reader: &R,
    a: &ProfileId,
    b: &ProfileId,
    relationship: RelationshipType,
    scenarios: &[&str],
) -> Result<Vec<Scenario>, KinshipError> {
    if a == b {
        return Err(KinshipError::SelfRelationship(a.clone()));
    }
    let profile_a = reader.require_profile(a)?;
    let profile_b = reader.require_profile(b)?;
    check_not_archived(reader, a)?;
    check_not_archived(reader, b)?;

    check_gender(&profile_a, relationship)?;

    let lineal = lineal_roles(&profile_a, &profile_b, relationship);
    if let Some((parent, child)) = lineal {
        if let (Some(parent_dob), Some(child_dob)) = (parent.date_of_birth, child.date_of_birth) {
            if parent_dob >= child_dob {
                return Err(KinshipError::ChronologyViolation {
                    parent: parent.id.clone(),
                    child: child.id.clone(),
                });
            }
        }
    }

    let record_b = reader.record(b)?;
    if record_b.is_some_and(|r| r.contains(relationship.list(), a)) {
        return Err(KinshipError::DuplicateRelationship {
            subject: a.clone(),
            object: b.clone(),
            relationship,
        });
    }

    if let Some((parent, child)) = lineal {
        if is_descendant(reader, &child.id, &parent.id)? {
            return Err(KinshipError::CircularRelationship {
                parent: parent.id.clone(),
                child: child.id.clone(),
            });
        }
    }

    parse_scenarios(relationship, scenarios)
}

/// Validate "A is no longer the T of B" before removal. Returns the accepted
/// scenarios. A missing edge is not an error.
pub fn validate_unlink<R: RecordReader + ?Sized>(
    reader: &R,
    a: &ProfileId,
    b: &ProfileId,
    relationship: RelationshipType,
    scenarios: &[&str],
) -> Result<Vec<Scenario>, KinshipError> {
    if a == b {
        return Err(KinshipError::SelfRelationship(a.clone()));
    }
    let profile_a = reader.require_profile(a)?;
    reader.require_profile(b)?;
    check_gender(&profile_a, relationship)?;
    parse_scenarios(relationship, scenarios)
}

// =============================================================================
// TESTS
// =============================================================================
