//! # Lineage Groups
//!
//! Named collections of profiles with a derived suggestion set.
//! Suggestions are only edited here by explicit removal; everything else
//! flows through the suggestion propagator.

use crate::store::{RecordReader, UnitOfWork};
use crate::{GroupId, KinshipError, LineageGroup, ProfileId};
use tracing::debug;

/// Create an empty group. Fails with `GroupExists` if the id is taken.
pub fn create_group<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    group_id: &GroupId,
) -> Result<LineageGroup, KinshipError> {
    if unit.group(group_id)?.is_some() {
        return Err(KinshipError::GroupExists(group_id.clone()));
    }
    let group = LineageGroup::new(group_id.clone());
    unit.put_group(group.clone())?;
    debug!(group = %group_id, "lineage group created");
    Ok(group)
}

/// Add `profile` as a member. The profile leaves the suggestion set.
pub fn add_member<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    group_id: &GroupId,
    profile: &ProfileId,
) -> Result<LineageGroup, KinshipError> {
    unit.require_profile(profile)?;
    let mut group = unit.require_group(group_id)?;
    if !group.members.insert(profile.clone()) {
        return Err(KinshipError::AlreadyMember {
            group: group_id.clone(),
            profile: profile.clone(),
        });
    }
    group.suggestions.remove(profile);
    unit.put_group(group.clone())?;
    debug!(group = %group_id, %profile, "member added");
    Ok(group)
}

/// Remove `profile` from the members. Removing a non-member is a no-op.
pub fn remove_member<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    group_id: &GroupId,
    profile: &ProfileId,
) -> Result<LineageGroup, KinshipError> {
    let mut group = unit.require_group(group_id)?;
    if group.members.remove(profile) {
        unit.put_group(group.clone())?;
        debug!(group = %group_id, %profile, "member removed");
    }
    Ok(group)
}

/// Drop `profile` from the suggestion set. Idempotent.
pub fn remove_suggestion<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    group_id: &GroupId,
    profile: &ProfileId,
) -> Result<LineageGroup, KinshipError> {
    let mut group = unit.require_group(group_id)?;
    if group.suggestions.remove(profile) {
        unit.put_group(group.clone())?;
    }
    Ok(group)
}

/// Add `profile` to every group `source` is a member of, skipping groups it
/// already belongs to. Returns the ids of the groups joined.
pub fn union_memberships<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    source: &ProfileId,
    profile: &ProfileId,
) -> Result<Vec<GroupId>, KinshipError> {
    let mut joined = Vec::new();
    for mut group in unit.groups_with_member(source)? {
        group.suggestions.remove(profile);
        if group.members.insert(profile.clone()) {
            joined.push(group.group_id.clone());
        }
        unit.put_group(group)?;
    }
    Ok(joined)
}

/// Group ids listing `profile` as a member.
pub fn groups_of<R: RecordReader + ?Sized>(
    reader: &R,
    profile: &ProfileId,
) -> Result<Vec<GroupId>, KinshipError> {
    Ok(reader
        .groups_with_member(profile)?
        .into_iter()
        .map(|g| g.group_id)
        .collect())
}

// =============================================================================
// TESTS
// =============================================================================
