//! # Edge Reciprocity
//!
//! Creates and removes a relationship together with its mandatory mirror entry
//! on the other profile's record. Every edge write in the engine goes through
//! here.

use crate::store::UnitOfWork;
use crate::{
    Gender, KinshipError, ProfileId, RelationshipPair, RelationshipRecord, RelationshipType,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Append `{target, relationship}` to `source`'s record and the reciprocal
/// entry to `target`'s record, both stamped with `added_at`.
///
/// `source_gender` picks the gendered reverse type stored on `target`.
/// Records are created when absent. Returns `(source, target)` records as
/// written.
pub fn create_edge<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    source: &ProfileId,
    target: &ProfileId,
    relationship: RelationshipType,
    source_gender: Gender,
    is_biological: bool,
    added_at: DateTime<Utc>,
) -> Result<RelationshipPair, KinshipError> {
    unit.require_profile(source)?;
    unit.require_profile(target)?;

    let reverse = relationship.reverse(source_gender);

    let mut source_record = unit.record_or_new(source)?;
    source_record.push(target.clone(), relationship, is_biological, added_at);
    unit.put_record(source_record.clone())?;

    let mut target_record = unit.record_or_new(target)?;
    target_record.push(source.clone(), reverse, is_biological, added_at);
    unit.put_record(target_record.clone())?;

    debug!(%source, %target, %relationship, %reverse, "edge created");
    Ok(RelationshipPair {
        a: source_record,
        b: target_record,
    })
}

/// Remove the `{target, relationship}` entry from `source` and the reciprocal
/// `{source, reverse}` entry from `target`, where `reverse` is gendered from
/// `source`. Missing records or entries are not an error.
///
/// Returns the number of entries removed across both records.
pub fn remove_edge<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    source: &ProfileId,
    target: &ProfileId,
    relationship: RelationshipType,
) -> Result<usize, KinshipError> {
    let reverse = relationship.reverse(unit.require_profile(source)?.gender);
    let removed = remove_from(unit, source, target, relationship)?
        + remove_from(unit, target, source, reverse)?;
    if removed > 0 {
        debug!(%source, %target, %relationship, %reverse, removed, "edge removed");
    }
    Ok(removed)
}

fn remove_from<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    owner: &ProfileId,
    target: &ProfileId,
    relationship: RelationshipType,
) -> Result<usize, KinshipError> {
    let Some(mut record) = unit.record(owner)? else {
        return Ok(0);
    };
    let removed = record.remove(target, relationship);
    if removed > 0 {
        unit.put_record(record)?;
    }
    Ok(removed)
}

/// Whether `owner`'s record holds `target` in the list for `relationship`.
pub fn edge_exists(
    record: Option<&RelationshipRecord>,
    target: &ProfileId,
    relationship: RelationshipType,
) -> bool {
    record.is_some_and(|r| r.contains(relationship.list(), target))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RecordReader, RelationshipStore};
    use crate::{EdgeList, Profile};

    fn at() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("timestamp")
    }

    fn store_with(profiles: &[(&str, Gender)]) -> MemoryStore {
        let store = MemoryStore::new();
        let mut unit = store.begin().expect("begin");
        for (id, gender) in profiles {
            unit.put_profile(Profile::new(*id, *gender)).expect("put");
        }
        unit.commit().expect("commit");
        store
    }

    #[test]
    fn create_writes_both_sides() {
        let store = store_with(&[("kid", Gender::Female), ("dad", Gender::Male)]);
        let mut unit = store.begin().expect("begin");
        let kid = ProfileId::from("kid");
        let dad = ProfileId::from("dad");

        let pair = create_edge(
            &mut unit,
            &kid,
            &dad,
            RelationshipType::Father,
            Gender::Female,
            true,
            at(),
        )
        .expect("create");

        assert!(pair.a.contains(EdgeList::Parents, &dad));
        let back = pair.b.kin_entry(EdgeList::Children, &kid).expect("reciprocal");
        assert_eq!(back.relationship, RelationshipType::Daughter);
        assert_eq!(back.added_at, pair.a.parents[0].added_at);
    }

    #[test]
    fn create_requires_both_profiles() {
        let store = store_with(&[("a", Gender::Male)]);
        let mut unit = store.begin().expect("begin");
        let err = create_edge(
            &mut unit,
            &ProfileId::from("a"),
            &ProfileId::from("ghost"),
            RelationshipType::Brother,
            Gender::Male,
            true,
            at(),
        )
        .expect_err("missing target");
        assert!(matches!(err, KinshipError::ProfileNotFound(id) if id.as_str() == "ghost"));
        assert!(unit.records().expect("scan").is_empty());
    }

    #[test]
    fn spouse_edges_are_current_on_both_sides() {
        let store = store_with(&[("h", Gender::Male), ("w", Gender::Female)]);
        let mut unit = store.begin().expect("begin");
        let pair = create_edge(
            &mut unit,
            &ProfileId::from("w"),
            &ProfileId::from("h"),
            RelationshipType::Husband,
            Gender::Female,
            true,
            at(),
        )
        .expect("create");
        assert!(pair.a.spouses[0].is_current);
        assert!(pair.b.spouses[0].is_current);
        assert_eq!(pair.b.spouses[0].relationship, RelationshipType::Wife);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = store_with(&[("a", Gender::Male), ("b", Gender::Female)]);
        let mut unit = store.begin().expect("begin");
        let a = ProfileId::from("a");
        let b = ProfileId::from("b");
        create_edge(&mut unit, &a, &b, RelationshipType::Sister, Gender::Male, true, at())
            .expect("create");

        assert_eq!(
            remove_edge(&mut unit, &a, &b, RelationshipType::Sister).expect("remove"),
            2
        );
        assert_eq!(
            remove_edge(&mut unit, &a, &b, RelationshipType::Sister).expect("remove again"),
            0
        );
        assert!(unit.record(&a).expect("read").expect("record").is_empty());
        assert!(unit.record(&b).expect("read").expect("record").is_empty());
    }
}
