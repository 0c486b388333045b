//! # Scenario Cascade
//!
//! Derives the extra edges implied by a primary edge plus its scenarios.
//!
//! Planning reads the graph once the primary edge exists (or, for unlink,
//! before it is removed) and fills a [`Worklist`] of [`EdgeOp`]s. Draining
//! the worklist applies each op through the reciprocity module. Derived edges
//! are trusted and do not re-run the validation guard; an op whose edge
//! already exists, or whose two ends coincide, is skipped.
//!
//! Every op reads "subject is the T of object", the same way a primary
//! request does.

use crate::reciprocity::{create_edge, edge_exists, remove_edge};
use crate::store::{RecordReader, UnitOfWork};
use crate::{
    EdgeList, KinshipError, ProfileId, RelationshipRecord, RelationshipType, Scenario,
};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::{debug, error};

/// One derived edge operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeOp {
    /// Create "subject is the T of object".
    Link {
        subject: ProfileId,
        object: ProfileId,
        relationship: RelationshipType,
        is_biological: bool,
    },
    /// Remove "subject is the T of object".
    ///
    /// With `step_only` set, a biological edge is left in place.
    Unlink {
        subject: ProfileId,
        object: ProfileId,
        relationship: RelationshipType,
        step_only: bool,
    },
}

impl EdgeOp {
    fn into_unlink(self) -> Self {
        match self {
            Self::Link {
                subject,
                object,
                relationship,
                is_biological,
            } => Self::Unlink {
                subject,
                object,
                relationship,
                step_only: !is_biological,
            },
            unlink @ Self::Unlink { .. } => unlink,
        }
    }
}

/// FIFO queue of pending edge operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worklist {
    ops: VecDeque<EdgeOp>,
}

impl Worklist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: EdgeOp) {
        self.ops.push_back(op);
    }

    pub fn pop(&mut self) -> Option<EdgeOp> {
        self.ops.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EdgeOp> {
        self.ops.iter()
    }
}

/// Outcome counters of a drained worklist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CascadeReport {
    pub linked: usize,
    pub unlinked: usize,
    pub skipped: usize,
}

// =============================================================================
// PLANNING
// =============================================================================

fn unhandled(relationship: RelationshipType, scenario: Scenario) -> KinshipError {
    error!(%relationship, %scenario, "cascade reached a scenario with no rule");
    KinshipError::UnhandledScenario(relationship)
}

/// "subject is object's brother/sister", gendered from the subject.
fn sibling_op<R: RecordReader + ?Sized>(
    reader: &R,
    subject: &ProfileId,
    object: &ProfileId,
) -> Result<EdgeOp, KinshipError> {
    let gender = reader.require_profile(subject)?.gender;
    Ok(EdgeOp::Link {
        subject: subject.clone(),
        object: object.clone(),
        relationship: RelationshipType::for_list(EdgeList::Siblings, gender),
        is_biological: true,
    })
}

fn others<'r>(
    record: &'r RelationshipRecord,
    list: EdgeList,
    exclude: &'r ProfileId,
) -> impl Iterator<Item = &'r ProfileId> {
    record
        .targets(list)
        .into_iter()
        .filter(move |id| *id != exclude)
}

fn plan_scenario<R: RecordReader + ?Sized>(
    reader: &R,
    a: &ProfileId,
    b: &ProfileId,
    relationship: RelationshipType,
    scenario: Scenario,
    work: &mut Worklist,
) -> Result<(), KinshipError> {
    use RelationshipType::{Brother, Father, Husband, Mother, Sister, Wife};

    let record_a = reader.record_or_new(a)?;
    match (relationship, scenario) {
        (Father | Mother, Scenario::Siblings) | (Brother | Sister, Scenario::Siblings) => {
            let list = if relationship.is_lineal() {
                EdgeList::Children
            } else {
                EdgeList::Siblings
            };
            for other in others(&record_a, list, b) {
                work.push(sibling_op(reader, other, b)?);
            }
        }
        (Father, Scenario::Mother) | (Mother, Scenario::Father) => {
            let (spouse_type, parent_type) = if relationship == Father {
                (Wife, Mother)
            } else {
                (Husband, Father)
            };
            if let Some(spouse) = record_a.current_spouse(spouse_type) {
                work.push(EdgeOp::Link {
                    subject: spouse.profile.clone(),
                    object: b.clone(),
                    relationship: parent_type,
                    is_biological: true,
                });
            }
        }
        (Brother | Sister, Scenario::Parents) => {
            for parent in &record_a.parents {
                work.push(EdgeOp::Link {
                    subject: parent.profile.clone(),
                    object: b.clone(),
                    relationship: parent.relationship,
                    is_biological: parent.is_biological,
                });
            }
        }
        (Husband | Wife, Scenario::Children) => {
            let gender_a = relationship.required_gender();
            let gender_b = reader.require_profile(b)?.gender;
            let record_b = reader.record_or_new(b)?;
            for child in &record_a.children {
                work.push(EdgeOp::Link {
                    subject: b.clone(),
                    object: child.profile.clone(),
                    relationship: RelationshipType::for_list(EdgeList::Parents, gender_b),
                    is_biological: false,
                });
            }
            for child in &record_b.children {
                work.push(EdgeOp::Link {
                    subject: a.clone(),
                    object: child.profile.clone(),
                    relationship: RelationshipType::for_list(EdgeList::Parents, gender_a),
                    is_biological: false,
                });
            }
        }
        _ => return Err(unhandled(relationship, scenario)),
    }
    Ok(())
}

/// Plan the derived edges for "A is the T of B" after the primary edge exists.
pub fn plan_link<R: RecordReader + ?Sized>(
    reader: &R,
    a: &ProfileId,
    b: &ProfileId,
    relationship: RelationshipType,
    scenarios: &[Scenario],
) -> Result<Worklist, KinshipError> {
    let mut work = Worklist::new();
    for scenario in scenarios {
        plan_scenario(reader, a, b, relationship, *scenario, &mut work)?;
    }
    debug!(%a, %b, %relationship, planned = work.len(), "cascade planned");
    Ok(work)
}

/// Plan the derived edges to remove before "A is the T of B" is removed.
///
/// The plan mirrors [`plan_link`]. Step-parent edges from the `children`
/// scenario are removed only when they are non-biological.
pub fn plan_unlink<R: RecordReader + ?Sized>(
    reader: &R,
    a: &ProfileId,
    b: &ProfileId,
    relationship: RelationshipType,
    scenarios: &[Scenario],
) -> Result<Worklist, KinshipError> {
    let links = plan_link(reader, a, b, relationship, scenarios)?;
    let mut work = Worklist::new();
    for op in links.ops {
        work.push(op.into_unlink());
    }
    Ok(work)
}

// =============================================================================
// DRAINING
// =============================================================================

/// Apply every queued op until the worklist is empty.
pub fn drain<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    work: &mut Worklist,
    now: DateTime<Utc>,
) -> Result<CascadeReport, KinshipError> {
    let mut report = CascadeReport::default();

    while let Some(op) = work.pop() {
        match op {
            EdgeOp::Link {
                subject,
                object,
                relationship,
                is_biological,
            } => {
                let object_record = unit.record(&object)?;
                if subject == object || edge_exists(object_record.as_ref(), &subject, relationship)
                {
                    report.skipped += 1;
                    continue;
                }
                let gender = unit.require_profile(&object)?.gender;
                create_edge(
                    unit,
                    &object,
                    &subject,
                    relationship,
                    gender,
                    is_biological,
                    now,
                )?;
                report.linked += 1;
            }
            EdgeOp::Unlink {
                subject,
                object,
                relationship,
                step_only,
            } => {
                let biological = unit.record(&object)?.is_some_and(|r| {
                    r.kin_entry(relationship.list(), &subject)
                        .is_some_and(|e| e.is_biological)
                });
                if step_only && biological {
                    report.skipped += 1;
                    continue;
                }
                if remove_edge(unit, &object, &subject, relationship)? > 0 {
                    report.unlinked += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }
    }
    Ok(report)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RelationshipStore};
    use crate::{Gender, Profile};

    fn at() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("timestamp")
    }

    fn id(s: &str) -> ProfileId {
        ProfileId::from(s)
    }

    /// "subject is the T of object", written directly.
    fn relate<U: UnitOfWork + ?Sized>(unit: &mut U, subject: &str, object: &str, t: RelationshipType) {
        let gender = unit.require_profile(&id(object)).expect("profile").gender;
        create_edge(unit, &id(object), &id(subject), t, gender, true, at()).expect("create");
    }

    fn seeded(profiles: &[(&str, Gender)]) -> MemoryStore {
        let store = MemoryStore::new();
        let mut unit = store.begin().expect("begin");
        for (p, g) in profiles {
            unit.put_profile(Profile::new(*p, *g)).expect("put");
        }
        unit.commit().expect("commit");
        store
    }

    #[test]
    fn father_siblings_plans_one_op_per_other_child() {
        let store = seeded(&[
            ("dad", Gender::Male),
            ("c1", Gender::Male),
            ("c2", Gender::Female),
            ("c3", Gender::Female),
        ]);
        let mut unit = store.begin().expect("begin");
        relate(&mut unit, "dad", "c1", RelationshipType::Father);
        relate(&mut unit, "dad", "c2", RelationshipType::Father);
        relate(&mut unit, "dad", "c3", RelationshipType::Father);

        let work = plan_link(
            &unit,
            &id("dad"),
            &id("c3"),
            RelationshipType::Father,
            &[Scenario::Siblings],
        )
        .expect("plan");
        assert_eq!(work.len(), 2);
        assert!(work.iter().any(|op| matches!(
            op,
            EdgeOp::Link { subject, relationship: RelationshipType::Brother, .. } if subject.as_str() == "c1"
        )));
    }

    #[test]
    fn drain_skips_existing_edges() {
        let store = seeded(&[("a", Gender::Male), ("b", Gender::Female)]);
        let mut unit = store.begin().expect("begin");
        relate(&mut unit, "a", "b", RelationshipType::Brother);

        let mut work = Worklist::new();
        work.push(EdgeOp::Link {
            subject: id("a"),
            object: id("b"),
            relationship: RelationshipType::Brother,
            is_biological: true,
        });
        work.push(EdgeOp::Link {
            subject: id("a"),
            object: id("a"),
            relationship: RelationshipType::Brother,
            is_biological: true,
        });
        let report = drain(&mut unit, &mut work, at()).expect("drain");
        assert_eq!(report.skipped, 2);
        assert_eq!(report.linked, 0);
        assert!(work.is_empty());
    }

    #[test]
    fn step_only_unlink_keeps_biological_edge() {
        let store = seeded(&[("mom", Gender::Female), ("kid", Gender::Male)]);
        let mut unit = store.begin().expect("begin");
        relate(&mut unit, "mom", "kid", RelationshipType::Mother);

        let mut work = Worklist::new();
        work.push(EdgeOp::Unlink {
            subject: id("mom"),
            object: id("kid"),
            relationship: RelationshipType::Mother,
            step_only: true,
        });
        let report = drain(&mut unit, &mut work, at()).expect("drain");
        assert_eq!(report.skipped, 1);
        let kid = unit.record(&id("kid")).expect("read").expect("record");
        assert!(kid.contains(EdgeList::Parents, &id("mom")));
    }

    #[test]
    fn child_types_have_no_cascade_rule() {
        let store = seeded(&[("a", Gender::Male), ("b", Gender::Male)]);
        let view = store.view().expect("view");
        let err = plan_link(
            &view,
            &id("a"),
            &id("b"),
            RelationshipType::Son,
            &[Scenario::Siblings],
        )
        .expect_err("no rule");
        assert!(matches!(
            err,
            KinshipError::UnhandledScenario(RelationshipType::Son)
        ));
    }
}
