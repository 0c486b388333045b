//! # Kinship Engine
//!
//! The facade request handlers call into. It owns a [`RelationshipStore`] and
//! wraps every operation in its own unit of work.
//!
//! ## Storage Backends
//!
//! The engine is generic over the backend:
//! - [`MemoryStore`]: in-memory, optimistic concurrency (fast, volatile)
//! - [`RedbStore`]: disk-backed redb database (ACID, persistent)
//!
//! Mutations retry on [`KinshipError::Conflict`]. Transplants use the
//! configured attempt bound and surface exhaustion as `TransplantAborted`.

use crate::cascade::{CascadeReport, drain, plan_link, plan_unlink};
use crate::config::EngineConfig;
use crate::guard::{validate_link, validate_unlink};
use crate::integrity::{Violation, audit};
use crate::primitives::{MAX_SUGGESTION_DEPTH, MUTATION_ATTEMPTS};
use crate::reciprocity::{create_edge, remove_edge};
use crate::snapshot::Snapshot;
use crate::store::{MemoryStore, RecordReader, RelationshipStore, UnitOfWork};
use crate::storage::RedbStore;
use crate::transplant::TransplantOutcome;
use crate::tree::{FamilyTree, family_tree};
use crate::{
    GroupId, KinshipError, LineageGroup, Profile, ProfileId, RelationshipPair, RelationshipType,
    Scenario, TransplantMode, lineage, suggestions, transplant,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{error, info, warn};

/// Result of a committed `create_relationship`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOutcome {
    /// `a` is A's record, `b` is B's record, after the cascade.
    pub pair: RelationshipPair,
    pub scenarios: Vec<Scenario>,
    pub cascade: CascadeReport,
    /// New lineage suggestions produced by the mutation.
    pub suggestions: usize,
}

/// High-level entry point over a relationship store.
#[derive(Debug)]
pub struct KinshipEngine<S: RelationshipStore> {
    store: S,
    config: EngineConfig,
}

impl KinshipEngine<MemoryStore> {
    /// Engine over a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl KinshipEngine<RedbStore> {
    /// Engine over a redb database at `path`, created if missing.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, KinshipError> {
        Ok(Self::new(RedbStore::open(path)?))
    }
}

impl<S: RelationshipStore> KinshipEngine<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config: config.clamped(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `work` in a fresh unit and commit, retrying on conflict.
    fn run<T>(
        &self,
        op: &'static str,
        mut work: impl FnMut(&mut dyn UnitOfWork, DateTime<Utc>) -> Result<T, KinshipError>,
    ) -> Result<T, KinshipError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut unit = self.store.begin()?;
            let value = work(&mut unit, Utc::now())?;
            match unit.commit() {
                Ok(()) => return Ok(value),
                Err(KinshipError::Conflict) if attempt < MUTATION_ATTEMPTS => {
                    warn!(op, attempt, "unit of work conflicted, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    // =========================================================================
    // PROFILES
    // =========================================================================

    /// Insert or replace a profile.
    pub fn register_profile(&self, profile: Profile) -> Result<(), KinshipError> {
        self.run("register_profile", |unit, _| unit.put_profile(profile.clone()))
    }

    /// Lookup a profile.
    pub fn profile(&self, id: &ProfileId) -> Result<Profile, KinshipError> {
        self.store.view()?.require_profile(id)
    }

    // =========================================================================
    // RELATIONSHIPS
    // =========================================================================

    /// Assert "A is the T of B", apply the requested scenario cascade and
    /// extend lineage suggestions for both profiles, all in one unit.
    pub fn create_relationship(
        &self,
        a: &ProfileId,
        b: &ProfileId,
        relationship: RelationshipType,
        scenarios: &[&str],
    ) -> Result<LinkOutcome, KinshipError> {
        let depth = self.config.suggestion_depth;
        let outcome = self.run("create_relationship", |unit, now| {
            let accepted = validate_link(&*unit, a, b, relationship, scenarios)?;
            let gender_b = unit.require_profile(b)?.gender;
            create_edge(unit, b, a, relationship, gender_b, true, now)?;

            let mut work = plan_link(&*unit, a, b, relationship, &accepted)?;
            let cascade = drain(unit, &mut work, now)?;

            let suggested = suggestions::add_to_suggestions(unit, a, depth)?
                + suggestions::add_to_suggestions(unit, b, depth)?;

            Ok(LinkOutcome {
                pair: RelationshipPair {
                    a: unit.record_or_new(a)?,
                    b: unit.record_or_new(b)?,
                },
                scenarios: accepted,
                cascade,
                suggestions: suggested,
            })
        })?;
        info!(
            %a, %b, %relationship,
            linked = outcome.cascade.linked,
            skipped = outcome.cascade.skipped,
            "relationship created"
        );
        Ok(outcome)
    }

    /// Remove "A is the T of B" after removing the scenario-derived edges.
    /// Missing edges are not an error.
    pub fn unlink_relationship(
        &self,
        a: &ProfileId,
        b: &ProfileId,
        relationship: RelationshipType,
        scenarios: &[&str],
    ) -> Result<CascadeReport, KinshipError> {
        let report = self.run("unlink_relationship", |unit, now| {
            let accepted = validate_unlink(&*unit, a, b, relationship, scenarios)?;
            let mut work = plan_unlink(&*unit, a, b, relationship, &accepted)?;
            let mut report = drain(unit, &mut work, now)?;
            if remove_edge(unit, b, a, relationship)? > 0 {
                report.unlinked += 1;
            }
            Ok(report)
        })?;
        info!(%a, %b, %relationship, unlinked = report.unlinked, "relationship unlinked");
        Ok(report)
    }

    // =========================================================================
    // SUGGESTIONS
    // =========================================================================

    /// Profiles within `depth` edges of `id` (configured depth when `None`).
    ///
    /// A depth above `MAX_SUGGESTION_DEPTH` is rejected with `DepthOutOfRange`.
    pub fn related_profiles(
        &self,
        id: &ProfileId,
        depth: Option<usize>,
    ) -> Result<BTreeSet<ProfileId>, KinshipError> {
        let depth = depth.unwrap_or(self.config.suggestion_depth);
        if depth > MAX_SUGGESTION_DEPTH {
            return Err(KinshipError::DepthOutOfRange {
                requested: depth,
                max: MAX_SUGGESTION_DEPTH,
            });
        }
        let view = self.store.view()?;
        view.require_profile(id)?;
        suggestions::related_profiles(&view, id, depth)
    }

    /// Union the relatives of `id` into the suggestions of its groups.
    pub fn add_to_suggestions(&self, id: &ProfileId) -> Result<usize, KinshipError> {
        let depth = self.config.suggestion_depth;
        self.run("add_to_suggestions", |unit, _| {
            unit.require_profile(id)?;
            suggestions::add_to_suggestions(unit, id, depth)
        })
    }

    /// Recompute the suggestions of one group.
    pub fn refresh_suggestions(&self, group: &GroupId) -> Result<LineageGroup, KinshipError> {
        let depth = self.config.suggestion_depth;
        self.run("refresh_suggestions", |unit, _| {
            suggestions::refresh_suggestions(unit, group, depth)
        })
    }

    // =========================================================================
    // LINEAGE GROUPS
    // =========================================================================

    pub fn create_group(&self, group: &GroupId) -> Result<LineageGroup, KinshipError> {
        self.run("create_group", |unit, _| lineage::create_group(unit, group))
    }

    pub fn add_member(
        &self,
        group: &GroupId,
        profile: &ProfileId,
    ) -> Result<LineageGroup, KinshipError> {
        self.run("add_member", |unit, _| lineage::add_member(unit, group, profile))
    }

    pub fn remove_member(
        &self,
        group: &GroupId,
        profile: &ProfileId,
    ) -> Result<LineageGroup, KinshipError> {
        self.run("remove_member", |unit, _| {
            lineage::remove_member(unit, group, profile)
        })
    }

    pub fn remove_suggestion(
        &self,
        group: &GroupId,
        profile: &ProfileId,
    ) -> Result<LineageGroup, KinshipError> {
        self.run("remove_suggestion", |unit, _| {
            lineage::remove_suggestion(unit, group, profile)
        })
    }

    pub fn group(&self, group: &GroupId) -> Result<LineageGroup, KinshipError> {
        self.store.view()?.require_group(group)
    }

    pub fn groups_of(&self, profile: &ProfileId) -> Result<Vec<GroupId>, KinshipError> {
        lineage::groups_of(&self.store.view()?, profile)
    }

    // =========================================================================
    // TRANSPLANT
    // =========================================================================

    fn transplant_once(
        &self,
        focus: &ProfileId,
        incoming: &ProfileId,
        mode: TransplantMode,
    ) -> Result<TransplantOutcome, KinshipError> {
        let mut unit = self.store.begin()?;
        let outcome = transplant::transplant_node(&mut unit, focus, incoming, mode, Utc::now())?;
        unit.commit()?;
        Ok(outcome)
    }

    /// Join `incoming` onto `focus` atomically.
    ///
    /// Conflicts are retried up to the configured bound. Validation errors
    /// come back unchanged; any other failure aborts with nothing applied.
    pub fn transplant_node(
        &self,
        focus: &ProfileId,
        incoming: &ProfileId,
        mode: TransplantMode,
    ) -> Result<TransplantOutcome, KinshipError> {
        let attempts = self.config.transplant_attempts;
        for attempt in 1..=attempts {
            match self.transplant_once(focus, incoming, mode) {
                Ok(outcome) => {
                    info!(
                        %focus, %incoming, %mode,
                        rewritten = outcome.rewritten,
                        stripped = outcome.stripped,
                        "transplant committed"
                    );
                    return Ok(outcome);
                }
                Err(KinshipError::Conflict) => {
                    warn!(%focus, %incoming, attempt, "transplant conflicted, retrying");
                }
                Err(e) if e.is_validation() => return Err(e),
                Err(e) => {
                    error!(%focus, %incoming, error = %e, "transplant failed");
                    return Err(KinshipError::TransplantAborted {
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Err(KinshipError::TransplantAborted {
            attempts,
            reason: KinshipError::Conflict.to_string(),
        })
    }

    // =========================================================================
    // READ PROJECTIONS
    // =========================================================================

    pub fn family_tree(&self, id: &ProfileId) -> Result<FamilyTree, KinshipError> {
        family_tree(&self.store.view()?, id)
    }

    pub fn audit(&self) -> Result<Vec<Violation>, KinshipError> {
        audit(&self.store.view()?)
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    pub fn snapshot(&self) -> Result<Snapshot, KinshipError> {
        Snapshot::capture(&self.store.view()?)
    }

    /// Load every item of `snapshot` in one unit.
    pub fn restore(&self, snapshot: &Snapshot) -> Result<(), KinshipError> {
        self.run("restore", |unit, _| snapshot.restore(unit))?;
        info!(
            profiles = snapshot.profiles.len(),
            records = snapshot.records.len(),
            groups = snapshot.groups.len(),
            "snapshot restored"
        );
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EdgeList, Gender};

    fn id(s: &str) -> ProfileId {
        ProfileId::from(s)
    }

    fn engine() -> KinshipEngine<MemoryStore> {
        let engine = KinshipEngine::in_memory();
        for (p, g) in [
            ("dad", Gender::Male),
            ("mom", Gender::Female),
            ("kid", Gender::Female),
        ] {
            engine
                .register_profile(Profile::new(p, g))
                .expect("register");
        }
        engine
    }

    #[test]
    fn create_returns_both_records() {
        let engine = engine();
        let outcome = engine
            .create_relationship(&id("dad"), &id("kid"), RelationshipType::Father, &[])
            .expect("create");
        assert!(outcome.pair.b.contains(EdgeList::Parents, &id("dad")));
        let back = outcome
            .pair
            .a
            .kin_entry(EdgeList::Children, &id("kid"))
            .expect("reciprocal");
        assert_eq!(back.relationship, RelationshipType::Daughter);
    }

    #[test]
    fn father_mother_scenario_links_current_wife() {
        let engine = engine();
        engine
            .create_relationship(&id("mom"), &id("dad"), RelationshipType::Wife, &[])
            .expect("marry");
        let outcome = engine
            .create_relationship(&id("dad"), &id("kid"), RelationshipType::Father, &["mother"])
            .expect("create");
        assert_eq!(outcome.cascade.linked, 1);
        let kid = engine.family_tree(&id("kid")).expect("tree");
        assert_eq!(kid.parents.len(), 2);
    }

    #[test]
    fn validation_errors_leave_store_untouched() {
        let engine = engine();
        let err = engine
            .create_relationship(&id("kid"), &id("dad"), RelationshipType::Father, &[])
            .expect_err("kid is female");
        assert!(matches!(err, KinshipError::GenderMismatch { .. }));
        assert!(engine.store().view().expect("view").records().expect("scan").is_empty());
    }

    #[test]
    fn unlink_twice_is_quiet() {
        let engine = engine();
        engine
            .create_relationship(&id("mom"), &id("kid"), RelationshipType::Mother, &[])
            .expect("create");
        let first = engine
            .unlink_relationship(&id("mom"), &id("kid"), RelationshipType::Mother, &[])
            .expect("unlink");
        assert_eq!(first.unlinked, 1);
        let second = engine
            .unlink_relationship(&id("mom"), &id("kid"), RelationshipType::Mother, &[])
            .expect("unlink again");
        assert_eq!(second.unlinked, 0);
        assert!(engine.audit().expect("audit").is_empty());
    }

    #[test]
    fn transplant_validation_error_passes_through() {
        let engine = engine();
        assert!(matches!(
            engine.transplant_node(&id("dad"), &id("ghost"), TransplantMode::Replace),
            Err(KinshipError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn relationship_feeds_group_suggestions() {
        let engine = engine();
        let g = GroupId::from("family");
        engine.create_group(&g).expect("group");
        engine.add_member(&g, &id("dad")).expect("member");
        let outcome = engine
            .create_relationship(&id("dad"), &id("kid"), RelationshipType::Father, &[])
            .expect("create");
        assert_eq!(outcome.suggestions, 1);
        let group = engine.group(&g).expect("group");
        assert!(group.suggestions.contains(&id("kid")));
    }

    #[test]
    fn related_rejects_depth_above_maximum() {
        let engine = engine();
        let err = engine
            .related_profiles(&id("dad"), Some(MAX_SUGGESTION_DEPTH + 1))
            .expect_err("too deep");
        assert!(matches!(
            err,
            KinshipError::DepthOutOfRange { requested, max }
                if requested == MAX_SUGGESTION_DEPTH + 1 && max == MAX_SUGGESTION_DEPTH
        ));
        assert!(err.is_validation());
        let at_max = engine
            .related_profiles(&id("dad"), Some(MAX_SUGGESTION_DEPTH))
            .expect("at maximum");
        assert_eq!(at_max.len(), 1);
    }
}
