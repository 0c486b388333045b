//! # Suggestion Propagator
//!
//! Breadth-first discovery of nearby relatives, used to fill the suggestion
//! sets of lineage groups.
//!
//! The traversal is bounded by depth, not a closure: two profiles further
//! apart than the depth are never suggested to each other.

use crate::primitives::MAX_SUGGESTION_DEPTH;
use crate::store::{RecordReader, UnitOfWork};
use crate::{GroupId, KinshipError, LineageGroup, ProfileId};
use std::collections::BTreeSet;
use tracing::debug;

/// Every profile within `depth` edges of `start`, including `start` itself.
///
/// Depth is clamped to `MAX_SUGGESTION_DEPTH`. Each record is read once.
pub fn related_profiles<R: RecordReader + ?Sized>(
    reader: &R,
    start: &ProfileId,
    depth: usize,
) -> Result<BTreeSet<ProfileId>, KinshipError> {
    let depth = depth.min(MAX_SUGGESTION_DEPTH);
    let mut visited = BTreeSet::new();
    visited.insert(start.clone());
    let mut frontier = vec![start.clone()];

    for _ in 0..depth {
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for current in &frontier {
            let Some(record) = reader.record(current)? else {
                continue;
            };
            for relative in record.relatives() {
                if visited.insert(relative.clone()) {
                    next.push(relative.clone());
                }
            }
        }
        frontier = next;
    }

    Ok(visited)
}

/// Union the relatives of `profile` into the suggestions of every group that
/// lists it as a member. Returns the number of new suggestions.
pub fn add_to_suggestions<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    profile: &ProfileId,
    depth: usize,
) -> Result<usize, KinshipError> {
    let groups = unit.groups_with_member(profile)?;
    if groups.is_empty() {
        return Ok(0);
    }

    let related = related_profiles(&*unit, profile, depth)?;
    let mut added = 0;
    for mut group in groups {
        let n = group.suggest(related.iter());
        if n > 0 {
            debug!(group = %group.group_id, %profile, added = n, "suggestions extended");
            added += n;
            unit.put_group(group)?;
        }
    }
    Ok(added)
}

/// Recompute a group's suggestions from scratch over its current members.
pub fn refresh_suggestions<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    group_id: &GroupId,
    depth: usize,
) -> Result<LineageGroup, KinshipError> {
    let mut group = unit.require_group(group_id)?;
    group.suggestions.clear();

    let members: Vec<ProfileId> = group.members.iter().cloned().collect();
    for member in &members {
        let related = related_profiles(&*unit, member, depth)?;
        group.suggest(related.iter());
    }

    debug!(group = %group_id, suggestions = group.suggestions.len(), "suggestions refreshed");
    unit.put_group(group.clone())?;
    Ok(group)
}

// =============================================================================
// TESTS
// =============================================================================
