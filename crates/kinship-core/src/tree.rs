//! # Family Tree Projection
//!
//! Read-only join of a relationship record with profile fields for display.

use crate::store::RecordReader;
use crate::{
    EdgeList, Gender, KinshipError, Profile, ProfileId, RecordStatus, RelationshipType,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;

/// A related profile as shown in a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeMember {
    pub id: ProfileId,
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub relationship: RelationshipType,
    pub is_biological: bool,
    pub added_at: DateTime<Utc>,
}

/// A spouse as shown in a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeSpouse {
    pub id: ProfileId,
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub relationship: RelationshipType,
    pub is_current: bool,
    pub marriage_date: Option<NaiveDate>,
    pub divorce_date: Option<NaiveDate>,
    pub added_at: DateTime<Utc>,
}

/// A profile with its four immediate relation lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyTree {
    pub profile: Profile,
    pub status: RecordStatus,
    pub parents: Vec<TreeMember>,
    pub siblings: Vec<TreeMember>,
    pub spouses: Vec<TreeSpouse>,
    pub children: Vec<TreeMember>,
}

impl FamilyTree {
    /// Total number of members across the four lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len() + self.siblings.len() + self.spouses.len() + self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lookup<R: RecordReader + ?Sized>(
    reader: &R,
    owner: &ProfileId,
    list: EdgeList,
    target: &ProfileId,
) -> Result<Option<Profile>, KinshipError> {
    let found = reader.profile(target)?;
    if found.is_none() {
        warn!(%owner, %target, %list, "skipping tree entry with no profile");
    }
    Ok(found)
}

/// Project the immediate family of `profile_id`.
///
/// A profile without a record yields empty lists. Entries whose profile is
/// missing are skipped.
pub fn family_tree<R: RecordReader + ?Sized>(
    reader: &R,
    profile_id: &ProfileId,
) -> Result<FamilyTree, KinshipError> {
    let profile = reader.require_profile(profile_id)?;
    let record = reader.record_or_new(profile_id)?;

    let mut lists: [Vec<TreeMember>; 3] = Default::default();
    for (slot, (list, entries)) in lists.iter_mut().zip([
        (EdgeList::Parents, &record.parents),
        (EdgeList::Siblings, &record.siblings),
        (EdgeList::Children, &record.children),
    ]) {
        for entry in entries {
            let Some(member) = lookup(reader, profile_id, list, &entry.profile)? else {
                continue;
            };
            slot.push(TreeMember {
                name: member.display_name(),
                id: member.id,
                gender: member.gender,
                date_of_birth: member.date_of_birth,
                relationship: entry.relationship,
                is_biological: entry.is_biological,
                added_at: entry.added_at,
            });
        }
    }

    let mut spouses = Vec::new();
    for entry in &record.spouses {
        let Some(member) = lookup(reader, profile_id, EdgeList::Spouses, &entry.profile)? else {
            continue;
        };
        spouses.push(TreeSpouse {
            name: member.display_name(),
            id: member.id,
            gender: member.gender,
            date_of_birth: member.date_of_birth,
            relationship: entry.relationship,
            is_current: entry.is_current,
            marriage_date: entry.marriage_date,
            divorce_date: entry.divorce_date,
            added_at: entry.added_at,
        });
    }

    let [parents, siblings, children] = lists;
    Ok(FamilyTree {
        profile,
        status: record.status,
        parents,
        siblings,
        spouses,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RelationshipStore, UnitOfWork};
    use crate::RelationshipRecord;

    #[test]
    fn no_record_means_empty_tree() {
        let store = MemoryStore::new();
        let mut unit = store.begin().expect("begin");
        unit.put_profile(Profile::new("solo", Gender::Female))
            .expect("put");
        unit.commit().expect("commit");

        let tree = family_tree(&store.view().expect("view"), &ProfileId::from("solo"))
            .expect("tree");
        assert!(tree.is_empty());
        assert_eq!(tree.status, RecordStatus::Active);
    }

    #[test]
    fn missing_profiles_are_skipped() {
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("timestamp");
        let store = MemoryStore::new();
        let mut unit = store.begin().expect("begin");
        unit.put_profile(Profile::new("kid", Gender::Male).with_name("Tom", "Lee"))
            .expect("put");
        unit.put_profile(Profile::new("mom", Gender::Female).with_name("Ada", "Lee"))
            .expect("put");
        let mut record = RelationshipRecord::new(ProfileId::from("kid"));
        record.push(ProfileId::from("mom"), RelationshipType::Mother, true, at);
        record.push(ProfileId::from("gone"), RelationshipType::Father, true, at);
        unit.put_record(record).expect("put");
        unit.commit().expect("commit");

        let tree = family_tree(&store.view().expect("view"), &ProfileId::from("kid"))
            .expect("tree");
        assert_eq!(tree.parents.len(), 1);
        assert_eq!(tree.parents[0].name, "Ada Lee");
        assert_eq!(tree.parents[0].relationship, RelationshipType::Mother);
    }
}
