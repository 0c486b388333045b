//! # Node Transplant
//!
//! Joins an incoming profile node onto a focus node inside one unit of work.
//!
//! ## Steps
//!
//! 1. Strip every edge from the incoming record.
//! 2. Pull every reference to the incoming node out of all other records.
//! 3. Wire by mode:
//!    - `append-as-X`: incoming becomes the X of focus (guarded like any
//!      new edge), then inherits the focus node's lineage memberships.
//!    - `replace`: the focus edge set moves onto the incoming node, every
//!      reference to focus is re-pointed (re-gendered for the incoming
//!      profile), and focus is archived with no edges.
//!
//! Nothing is visible until the caller commits the unit. Dropping the unit
//! after any error leaves every record as it was.

use crate::guard::validate_link;
use crate::lineage::union_memberships;
use crate::reciprocity::create_edge;
use crate::store::{RecordReader, UnitOfWork};
use crate::{GroupId, KinshipError, ProfileId, RecordStatus, RelationshipRecord, TransplantMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Result of a transplant, before commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransplantOutcome {
    /// The incoming record as written.
    pub incoming: RelationshipRecord,
    /// The focus id when it was archived by `replace`.
    pub archived: Option<ProfileId>,
    /// Entries dropped from the incoming record and its relatives.
    pub stripped: usize,
    /// References to the focus node re-pointed onto the incoming node.
    pub rewritten: usize,
    /// Groups the incoming node joined.
    pub joined_groups: Vec<GroupId>,
}

/// Clear the incoming record and pull its id out of every other record.
fn detach<U: UnitOfWork + ?Sized>(unit: &mut U, incoming: &ProfileId) -> Result<usize, KinshipError> {
    let mut stripped = 0;

    let mut own = unit.record_or_new(incoming)?;
    stripped += own.all_entries().len();
    own.clear_edges();
    unit.put_record(own)?;

    for mut record in unit.records()? {
        if &record.profile_id == incoming {
            continue;
        }
        let removed = record.remove_references(incoming);
        if removed > 0 {
            stripped += removed;
            unit.put_record(record)?;
        }
    }
    Ok(stripped)
}

/// Rewrite a focus node onto `incoming` within `unit`.
///
/// The unit is the caller's transactional scope; nothing is committed here.
pub fn transplant_node<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    focus: &ProfileId,
    incoming: &ProfileId,
    mode: TransplantMode,
    now: DateTime<Utc>,
) -> Result<TransplantOutcome, KinshipError> {
    if focus == incoming {
        return Err(KinshipError::SelfRelationship(focus.clone()));
    }
    let focus_profile = unit.require_profile(focus)?;
    let incoming_profile = unit.require_profile(incoming)?;
    for id in [focus, incoming] {
        if unit.record(id)?.is_some_and(|r| r.is_archived()) {
            return Err(KinshipError::ArchivedNode(id.clone()));
        }
    }

    let stripped = detach(unit, incoming)?;
    debug!(%incoming, stripped, "incoming node detached");

    let mut rewritten = 0;
    let mut archived = None;
    match mode {
        TransplantMode::AppendAs(relationship) => {
            validate_link(&*unit, incoming, focus, relationship, &[])?;
            create_edge(
                unit,
                focus,
                incoming,
                relationship,
                focus_profile.gender,
                true,
                now,
            )?;
        }
        TransplantMode::Replace => {
            let mut focus_record = unit.record_or_new(focus)?;
            let edges = focus_record.edges();
            focus_record.clear_edges();
            focus_record.status = RecordStatus::Archived;
            unit.put_record(focus_record)?;

            for mut record in unit.records()? {
                if &record.profile_id == focus || &record.profile_id == incoming {
                    continue;
                }
                let n = record.rewrite_references(focus, incoming, incoming_profile.gender);
                if n > 0 {
                    rewritten += n;
                    unit.put_record(record)?;
                }
            }

            let mut incoming_record = unit.record_or_new(incoming)?;
            incoming_record.assign_edges(edges);
            unit.put_record(incoming_record)?;
            archived = Some(focus.clone());
        }
    }

    let joined_groups = union_memberships(unit, focus, incoming)?;
    let incoming_record = unit.record_or_new(incoming)?;
    debug!(%focus, %incoming, %mode, rewritten, "transplant staged");

    Ok(TransplantOutcome {
        incoming: incoming_record,
        archived,
        stripped,
        rewritten,
        joined_groups,
    })
}

// =============================================================================
// TESTS
// =============================================================================
