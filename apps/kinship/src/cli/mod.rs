//! # Kinship CLI Module
//!
//! This module implements the CLI interface for Kinship.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new database
//! - `status` - Show record counts
//! - `profile` - Register, show and list profiles
//! - `link` / `unlink` - Create or remove a relationship with scenarios
//! - `related` - Profiles within a traversal depth
//! - `suggest` - Push a profile's relatives into its groups' suggestions
//! - `group` - Lineage group management
//! - `tree` - Immediate family of a profile
//! - `transplant` - Join a duplicate node onto a focus node
//! - `audit` - Check every graph invariant
//! - `compact` - Compact the database file
//! - `export` / `import` - Snapshot files (JSON or binary)

mod commands;

use crate::config::AppConfig;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kinship_core::{Gender, KinshipError, RelationshipType, TransplantMode};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Kinship - family relationship graph
///
/// Keeps every relationship mirrored, validated and cascaded across the
/// family graph.
#[derive(Parser, Debug)]
#[command(name = "kinship")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the redb database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to a TOML config file (default: ./kinship.toml if present)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Suggestion traversal depth (overrides the config file)
    #[arg(long, global = true)]
    pub suggestion_depth: Option<usize>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show record counts
    Status,

    /// Profile management
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Assert "A is the RELATIONSHIP of B"
    Link {
        /// Subject profile (A)
        a: String,

        /// father, mother, son, daughter, brother, sister, husband, wife
        relationship: RelationshipType,

        /// Object profile (B)
        b: String,

        /// Scenarios to cascade (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        scenario: Vec<String>,
    },

    /// Remove "A is the RELATIONSHIP of B"
    Unlink {
        /// Subject profile (A)
        a: String,

        /// Relationship type
        relationship: RelationshipType,

        /// Object profile (B)
        b: String,

        /// Scenarios to cascade (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        scenario: Vec<String>,
    },

    /// List profiles within a traversal depth
    Related {
        /// Start profile
        id: String,

        /// Traversal depth (default from config)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Add a profile's relatives to the suggestions of its groups
    Suggest {
        /// Profile ID
        id: String,
    },

    /// Lineage group management
    #[command(subcommand)]
    Group(GroupCommand),

    /// Show the immediate family of a profile
    Tree {
        /// Profile ID
        id: String,
    },

    /// Join an incoming node onto a focus node
    Transplant {
        /// Focus profile
        focus: String,

        /// Incoming profile
        incoming: String,

        /// `replace` or `append-as-<relationship>`
        #[arg(short, long, default_value = "replace")]
        mode: TransplantMode,
    },

    /// Check every graph invariant
    Audit,

    /// Compact the database file
    Compact,

    /// Export a snapshot (JSON when the file ends in .json, binary otherwise)
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a snapshot (JSON when the file ends in .json, binary otherwise)
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// Profile subcommands.
#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Register or replace a profile
    Add {
        /// Profile ID
        id: String,

        /// male or female
        #[arg(short, long)]
        gender: Gender,

        /// First name
        #[arg(long, default_value = "")]
        first: String,

        /// Last name
        #[arg(long, default_value = "")]
        last: String,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        born: Option<NaiveDate>,
    },

    /// Show one profile and its groups
    Show {
        /// Profile ID
        id: String,
    },

    /// List every profile
    List,
}

/// Lineage group subcommands.
#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Create an empty group
    Create {
        /// Group ID
        group: String,
    },

    /// Add a member
    Add {
        /// Group ID
        group: String,

        /// Profile ID
        profile: String,
    },

    /// Remove a member
    Remove {
        /// Group ID
        group: String,

        /// Profile ID
        profile: String,
    },

    /// Drop a profile from the suggestions
    RemoveSuggestion {
        /// Group ID
        group: String,

        /// Profile ID
        profile: String,
    },

    /// Recompute the suggestions from the members
    Refresh {
        /// Group ID
        group: String,
    },

    /// Show members and suggestions
    Show {
        /// Group ID
        group: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), KinshipError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let ctx = Context {
        database: config.database(cli.database.as_deref()),
        engine: config.engine(cli.suggestion_depth),
        json: cli.json,
    };

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Status) | None => cmd_status(&ctx),
        Some(Commands::Profile(cmd)) => match cmd {
            ProfileCommand::Add {
                id,
                gender,
                first,
                last,
                born,
            } => cmd_profile_add(&ctx, &id, gender, &first, &last, born),
            ProfileCommand::Show { id } => cmd_profile_show(&ctx, &id),
            ProfileCommand::List => cmd_profile_list(&ctx),
        },
        Some(Commands::Link {
            a,
            relationship,
            b,
            scenario,
        }) => cmd_link(&ctx, &a, relationship, &b, &scenario),
        Some(Commands::Unlink {
            a,
            relationship,
            b,
            scenario,
        }) => cmd_unlink(&ctx, &a, relationship, &b, &scenario),
        Some(Commands::Related { id, depth }) => cmd_related(&ctx, &id, depth),
        Some(Commands::Suggest { id }) => cmd_suggest(&ctx, &id),
        Some(Commands::Group(cmd)) => cmd_group(&ctx, cmd),
        Some(Commands::Tree { id }) => cmd_tree(&ctx, &id),
        Some(Commands::Transplant {
            focus,
            incoming,
            mode,
        }) => cmd_transplant(&ctx, &focus, &incoming, mode),
        Some(Commands::Audit) => cmd_audit(&ctx),
        Some(Commands::Compact) => cmd_compact(&ctx),
        Some(Commands::Export { output }) => cmd_export(&ctx, &output),
        Some(Commands::Import { input }) => cmd_import(&ctx, &input),
    }
}
