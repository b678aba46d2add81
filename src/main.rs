//! Quorum CLI Application
//!
//! A command-line client for m-of-n authorization groups kept on a local
//! ledger snapshot.

use clap::{Parser, Subcommand};
use quorum_auth::cli::{self, AppState};
use quorum_auth::core::Address;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quorum")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "M-of-N authorization groups for ledger actions", long_about = None)]
struct Cli {
    /// Data directory for the ledger snapshot, keys and configuration
    #[arg(short, long, default_value = ".quorum")]
    data_dir: PathBuf,

    /// Override the configured authorization program id
    #[arg(short, long)]
    program_id: Option<Address>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Owner key management
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Compute derived addresses without touching the ledger
    Derive {
        #[command(subcommand)]
        action: DeriveCommands,
    },

    /// Authorization group operations
    Group {
        #[command(subcommand)]
        action: GroupCommands,
    },

    /// Proposed action operations
    Action {
        #[command(subcommand)]
        action: ActionCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Create a new key
    New {
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum DeriveCommands {
    /// Group address for a creator and nonce
    Group {
        /// Creator address or key name
        #[arg(short, long)]
        creator: String,
        #[arg(short, long, default_value = "0")]
        nonce: u64,
    },
    /// Action record address for a group and index
    Action {
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        index: u64,
    },
}

#[derive(Subcommand)]
enum GroupCommands {
    /// Create a group; the signing key becomes its creator
    Create {
        /// Signing key name
        #[arg(short, long)]
        key: String,
        #[arg(short, long, default_value = "0")]
        nonce: u64,
        /// Owner addresses or key names
        #[arg(short, long, num_args = 1.., required = true)]
        owners: Vec<String>,
        #[arg(short, long)]
        threshold: u8,
    },
    /// Show a group
    Show {
        #[arg(short, long)]
        group: Address,
    },
    /// Add an owner
    AddOwner {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        owner: String,
    },
    /// Remove an owner
    RemoveOwner {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        owner: String,
    },
    /// Change the approval threshold
    Threshold {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        threshold: u8,
    },
    /// Close a group with no open actions
    Close {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        group: Address,
    },
}

#[derive(Subcommand)]
enum ActionCommands {
    /// Propose an action
    Propose {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        group: Address,
        /// Hex-encoded payload
        #[arg(short, long)]
        payload: String,
        /// Seconds until the proposal expires
        #[arg(short, long)]
        expires_in: Option<i64>,
    },
    /// Approve an action
    Approve {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        index: u64,
    },
    /// Reject an action
    Reject {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        index: u64,
    },
    /// Execute an approved action
    Execute {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        index: u64,
    },
    /// Cancel an action you proposed
    Cancel {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        index: u64,
    },
    /// Show one action
    Show {
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        index: u64,
    },
    /// List open actions, or every record with --all
    List {
        #[arg(short, long)]
        group: Address,
        #[arg(short, long)]
        all: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let state = AppState::new(cli.data_dir.clone(), cli.program_id)?;

    match cli.command {
        Commands::Key { action } => match action {
            KeyCommands::New { name } => cli::cmd_key_new(&state, &name)?,
        },

        Commands::Derive { action } => match action {
            DeriveCommands::Group { creator, nonce } => {
                cli::cmd_derive_group(&state, &creator, nonce)?
            }
            DeriveCommands::Action { group, index } => {
                cli::cmd_derive_action(&state, &group, index)?
            }
        },

        Commands::Group { action } => match action {
            GroupCommands::Create {
                key,
                nonce,
                owners,
                threshold,
            } => cli::cmd_group_create(&state, &key, nonce, &owners, threshold)?,
            GroupCommands::Show { group } => cli::cmd_group_show(&state, &group)?,
            GroupCommands::AddOwner { key, group, owner } => {
                cli::cmd_group_add_owner(&state, &key, &group, &owner)?
            }
            GroupCommands::RemoveOwner { key, group, owner } => {
                cli::cmd_group_remove_owner(&state, &key, &group, &owner)?
            }
            GroupCommands::Threshold {
                key,
                group,
                threshold,
            } => cli::cmd_group_threshold(&state, &key, &group, threshold)?,
            GroupCommands::Close { key, group } => cli::cmd_group_close(&state, &key, &group)?,
        },

        Commands::Action { action } => match action {
            ActionCommands::Propose {
                key,
                group,
                payload,
                expires_in,
            } => cli::cmd_action_propose(&state, &key, &group, &payload, expires_in)?,
            ActionCommands::Approve { key, group, index } => {
                cli::cmd_action_approve(&state, &key, &group, index)?
            }
            ActionCommands::Reject { key, group, index } => {
                cli::cmd_action_reject(&state, &key, &group, index)?
            }
            ActionCommands::Execute { key, group, index } => {
                cli::cmd_action_execute(&state, &key, &group, index)?
            }
            ActionCommands::Cancel { key, group, index } => {
                cli::cmd_action_cancel(&state, &key, &group, index)?
            }
            ActionCommands::Show { group, index } => cli::cmd_action_show(&state, &group, index)?,
            ActionCommands::List { group, all } => cli::cmd_action_list(&state, &group, all)?,
        },
    }

    Ok(())
}
