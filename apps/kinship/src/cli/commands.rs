//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command opens the redb database, runs one engine operation and
//! prints either a short text summary or the operation's result as JSON.

use super::GroupCommand;
use chrono::NaiveDate;
use kinship_core::{
    EngineConfig, FamilyTree, Gender, GroupId, KinshipEngine, KinshipError, Profile, ProfileId,
    RecordReader, RedbStore, RelationshipStore, RelationshipType, Snapshot, TransplantMode,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// CONTEXT
// =============================================================================

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub database: PathBuf,
    pub engine: EngineConfig,
    pub json: bool,
}

impl Context {
    /// Open the engine over the configured database.
    pub fn open(&self) -> Result<KinshipEngine<RedbStore>, KinshipError> {
        let store = RedbStore::open(&self.database)?;
        Ok(KinshipEngine::with_config(store, self.engine))
    }

    /// Print `value` as pretty JSON in JSON mode, otherwise run `text`.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> Result<(), KinshipError> {
        if self.json {
            let out = serde_json::to_string_pretty(value)
                .map_err(|e| KinshipError::Serialization(e.to_string()))?;
            println!("{}", out);
        } else {
            text(value);
        }
        Ok(())
    }
}

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for snapshot import (256 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), KinshipError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| KinshipError::Storage(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(KinshipError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, KinshipError> {
    let canonical = path.canonicalize().map_err(|e| {
        KinshipError::Storage(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(KinshipError::Storage(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent of an output path and require a directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, KinshipError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        KinshipError::Storage(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(KinshipError::Storage(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| KinshipError::Storage("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Snapshot encoding chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Binary,
}

impl SnapshotFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Binary,
        }
    }

    pub fn encode(self, snapshot: &Snapshot) -> Result<Vec<u8>, KinshipError> {
        match self {
            Self::Json => serde_json::to_vec_pretty(snapshot)
                .map_err(|e| KinshipError::Serialization(e.to_string())),
            Self::Binary => snapshot.to_bytes(),
        }
    }

    pub fn decode(self, data: &[u8]) -> Result<Snapshot, KinshipError> {
        match self {
            Self::Json => {
                serde_json::from_slice(data).map_err(|e| KinshipError::Serialization(e.to_string()))
            }
            Self::Binary => Snapshot::from_bytes(data),
        }
    }
}

// =============================================================================
// INIT / STATUS / COMPACT
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), KinshipError> {
    if ctx.database.exists() {
        if !force {
            return Err(KinshipError::Storage(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&ctx.database)
            .map_err(|e| KinshipError::Storage(format!("Remove db: {}", e)))?;
    }
    let _store = RedbStore::open(&ctx.database)?;
    tracing::info!(database = %ctx.database.display(), "database initialized");
    println!("Initialized new database at {:?}", ctx.database);
    Ok(())
}

#[derive(Debug, Serialize)]
struct Status<'a> {
    database: &'a Path,
    profiles: u64,
    records: u64,
    groups: u64,
    suggestion_depth: usize,
    transplant_attempts: u32,
}

/// Show record counts.
pub fn cmd_status(ctx: &Context) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let counts = engine.store().counts()?;
    let status = Status {
        database: &ctx.database,
        profiles: counts.profiles,
        records: counts.records,
        groups: counts.groups,
        suggestion_depth: engine.config().suggestion_depth,
        transplant_attempts: engine.config().transplant_attempts,
    };

    ctx.emit(&status, |s| {
        println!("Kinship Graph Status");
        println!("====================");
        println!("Database: {:?}", s.database);
        println!();
        println!("Profiles: {}", s.profiles);
        println!("Records:  {}", s.records);
        println!("Groups:   {}", s.groups);
        println!();
        println!("Suggestion depth:    {}", s.suggestion_depth);
        println!("Transplant attempts: {}", s.transplant_attempts);
    })
}

/// Compact the database file.
pub fn cmd_compact(ctx: &Context) -> Result<(), KinshipError> {
    let mut store = RedbStore::open(&ctx.database)?;
    store.compact()?;
    println!("Compacted {:?}", ctx.database);
    Ok(())
}

// =============================================================================
// PROFILE COMMANDS
// =============================================================================

/// Register or replace a profile.
pub fn cmd_profile_add(
    ctx: &Context,
    id: &str,
    gender: Gender,
    first: &str,
    last: &str,
    born: Option<NaiveDate>,
) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let mut profile = Profile::new(id, gender).with_name(first, last);
    if let Some(date) = born {
        profile = profile.born(date);
    }
    engine.register_profile(profile.clone())?;
    ctx.emit(&profile, |p| {
        println!("Registered {} ({}, {})", p.id, p.display_name(), p.gender);
    })
}

#[derive(Debug, Serialize)]
struct ProfileView {
    profile: Profile,
    groups: Vec<GroupId>,
}

/// Show one profile and the groups it belongs to.
pub fn cmd_profile_show(ctx: &Context, id: &str) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let id = ProfileId::from(id);
    let view = ProfileView {
        profile: engine.profile(&id)?,
        groups: engine.groups_of(&id)?,
    };
    ctx.emit(&view, |v| {
        println!("Profile {}", v.profile.id);
        println!("  Name:   {}", v.profile.display_name());
        println!("  Gender: {}", v.profile.gender);
        if let Some(date) = v.profile.date_of_birth {
            println!("  Born:   {}", date);
        }
        if !v.groups.is_empty() {
            let names: Vec<String> = v.groups.iter().map(ToString::to_string).collect();
            println!("  Groups: {}", names.join(", "));
        }
    })
}

/// List every profile.
pub fn cmd_profile_list(ctx: &Context) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let profiles = engine.store().view()?.profiles()?;
    ctx.emit(&profiles, |all| {
        for p in all {
            println!("{:<20} {:<7} {}", p.id, p.gender, p.display_name());
        }
        println!("{} profiles", all.len());
    })
}

// =============================================================================
// RELATIONSHIP COMMANDS
// =============================================================================

fn scenario_refs(scenarios: &[String]) -> Vec<&str> {
    scenarios
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Create "A is the T of B" with the requested scenarios.
pub fn cmd_link(
    ctx: &Context,
    a: &str,
    relationship: RelationshipType,
    b: &str,
    scenarios: &[String],
) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let outcome = engine.create_relationship(
        &ProfileId::from(a),
        &ProfileId::from(b),
        relationship,
        &scenario_refs(scenarios),
    )?;
    ctx.emit(&outcome, |o| {
        println!("{} is now the {} of {}", a, relationship, b);
        println!(
            "  Cascade: {} linked, {} skipped",
            o.cascade.linked, o.cascade.skipped
        );
        println!("  New suggestions: {}", o.suggestions);
    })
}

/// Remove "A is the T of B" with the requested scenarios.
pub fn cmd_unlink(
    ctx: &Context,
    a: &str,
    relationship: RelationshipType,
    b: &str,
    scenarios: &[String],
) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let report = engine.unlink_relationship(
        &ProfileId::from(a),
        &ProfileId::from(b),
        relationship,
        &scenario_refs(scenarios),
    )?;
    ctx.emit(&report, |r| {
        println!("Unlinked {} edges ({} skipped)", r.unlinked, r.skipped);
    })
}

// =============================================================================
// SUGGESTION COMMANDS
// =============================================================================

/// Profiles within `depth` of `id`.
pub fn cmd_related(ctx: &Context, id: &str, depth: Option<usize>) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let related = engine.related_profiles(&ProfileId::from(id), depth)?;
    ctx.emit(&related, |all| {
        println!(
            "Related to {} (depth {}):",
            id,
            depth.unwrap_or(ctx.engine.suggestion_depth)
        );
        for p in all {
            println!("  {}", p);
        }
    })
}

/// Push the relatives of `id` into its groups' suggestions.
pub fn cmd_suggest(ctx: &Context, id: &str) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let added = engine.add_to_suggestions(&ProfileId::from(id))?;
    ctx.emit(&added, |n| println!("Added {} suggestions", n))
}

// =============================================================================
// GROUP COMMANDS
// =============================================================================

fn print_group(group: &kinship_core::LineageGroup) {
    println!("Group {}", group.group_id);
    println!("  Members ({}):", group.members.len());
    for m in &group.members {
        println!("    {}", m);
    }
    println!("  Suggestions ({}):", group.suggestions.len());
    for s in &group.suggestions {
        println!("    {}", s);
    }
}

/// Run a lineage group subcommand.
pub fn cmd_group(ctx: &Context, cmd: GroupCommand) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let group = match cmd {
        GroupCommand::Create { group } => engine.create_group(&GroupId::new(group))?,
        GroupCommand::Add { group, profile } => {
            engine.add_member(&GroupId::new(group), &ProfileId::from(profile))?
        }
        GroupCommand::Remove { group, profile } => {
            engine.remove_member(&GroupId::new(group), &ProfileId::from(profile))?
        }
        GroupCommand::RemoveSuggestion { group, profile } => {
            engine.remove_suggestion(&GroupId::new(group), &ProfileId::from(profile))?
        }
        GroupCommand::Refresh { group } => engine.refresh_suggestions(&GroupId::new(group))?,
        GroupCommand::Show { group } => engine.group(&GroupId::new(group))?,
    };
    ctx.emit(&group, print_group)
}

// =============================================================================
// TREE / TRANSPLANT / AUDIT
// =============================================================================

fn print_tree(tree: &FamilyTree) {
    println!("{} ({})", tree.profile.display_name(), tree.profile.id);
    for (label, members) in [
        ("Parents", &tree.parents),
        ("Siblings", &tree.siblings),
        ("Children", &tree.children),
    ] {
        if members.is_empty() {
            continue;
        }
        println!("  {}:", label);
        for m in members {
            let step = if m.is_biological { "" } else { " (step)" };
            println!("    {:<8} {} [{}]{}", m.relationship, m.name, m.id, step);
        }
    }
    if !tree.spouses.is_empty() {
        println!("  Spouses:");
        for s in &tree.spouses {
            let state = if s.is_current { "current" } else { "former" };
            println!("    {:<8} {} [{}] {}", s.relationship, s.name, s.id, state);
        }
    }
}

/// Show the immediate family of `id`.
pub fn cmd_tree(ctx: &Context, id: &str) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let tree = engine.family_tree(&ProfileId::from(id))?;
    ctx.emit(&tree, print_tree)
}

/// Join `incoming` onto `focus`.
pub fn cmd_transplant(
    ctx: &Context,
    focus: &str,
    incoming: &str,
    mode: TransplantMode,
) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let outcome =
        engine.transplant_node(&ProfileId::from(focus), &ProfileId::from(incoming), mode)?;
    ctx.emit(&outcome, |o| {
        println!("Transplanted {} onto {} ({})", incoming, focus, mode);
        println!("  Stripped:  {}", o.stripped);
        println!("  Rewritten: {}", o.rewritten);
        if let Some(archived) = &o.archived {
            println!("  Archived:  {}", archived);
        }
        if !o.joined_groups.is_empty() {
            let names: Vec<String> = o.joined_groups.iter().map(ToString::to_string).collect();
            println!("  Joined:    {}", names.join(", "));
        }
    })
}

/// Check every invariant. Violations are an error.
pub fn cmd_audit(ctx: &Context) -> Result<(), KinshipError> {
    let engine = ctx.open()?;
    let violations = engine.audit()?;
    ctx.emit(&violations, |all| {
        if all.is_empty() {
            println!("Graph is consistent");
        }
        for v in all {
            println!("  {}", v);
        }
    })?;
    if !violations.is_empty() {
        return Err(KinshipError::IntegrityViolations(violations.len()));
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export a snapshot of the whole store.
pub fn cmd_export(ctx: &Context, output: &Path) -> Result<(), KinshipError> {
    let validated_output = validate_output_path(output)?;
    let engine = ctx.open()?;
    let snapshot = engine.snapshot()?;
    let data = SnapshotFormat::for_path(output).encode(&snapshot)?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| KinshipError::Storage(format!("Write file: {}", e)))?;

    println!(
        "Exported {} profiles, {} records, {} groups ({} bytes) to {:?}",
        snapshot.profiles.len(),
        snapshot.records.len(),
        snapshot.groups.len(),
        data.len(),
        validated_output
    );
    Ok(())
}

/// Import a snapshot; existing keys are overwritten.
pub fn cmd_import(ctx: &Context, input: &Path) -> Result<(), KinshipError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| KinshipError::Storage(format!("Read file: {}", e)))?;
    let snapshot = SnapshotFormat::for_path(input).decode(&data)?;

    let engine = ctx.open()?;
    engine.restore(&snapshot)?;

    println!(
        "Imported {} profiles, {} records, {} groups",
        snapshot.profiles.len(),
        snapshot.records.len(),
        snapshot.groups.len()
    );
    Ok(())
}
