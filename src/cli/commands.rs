//! CLI commands for the authorization client
//!
//! Every command runs the [`Authority`] over a [`LedgerBackedStore`] bound to
//! the persisted [`LocalLedger`]; the ledger snapshot is saved after each
//! successful write.

use crate::config::ClientConfig;
use crate::core::{derive_action_address, derive_group_address, format_timestamp, Address, SystemClock};
use crate::crypto::KeyPair;
use crate::ledger::LocalLedger;
use crate::multisig::{ActionRecord, Authority, AuthorizationStore, Group, LedgerBackedStore};
use crate::storage::{Keystore, LedgerStorage};
use std::path::PathBuf;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Authority used by the CLI
pub type CliAuthority<'a> = Authority<LedgerBackedStore<&'a LocalLedger>, SystemClock>;

/// Application state
pub struct AppState {
    pub config: ClientConfig,
    pub storage: LedgerStorage,
    pub keystore: Keystore,
    pub ledger: LocalLedger,
}

impl AppState {
    /// Load configuration, keys and the ledger snapshot from `data_dir`
    pub fn new(data_dir: PathBuf, program_id: Option<Address>) -> CliResult<Self> {
        let mut config = ClientConfig::load(&data_dir)?;
        if let Some(program_id) = program_id {
            config.program_id = program_id;
        }

        let storage = LedgerStorage::new(config.storage_config())?;
        let keystore = Keystore::new(&config.key_path())?;
        let state = storage.load_or_default(&config.program_id)?;
        let ledger = LocalLedger::with_state(config.program_id, SystemClock, state);

        Ok(Self {
            config,
            storage,
            keystore,
            ledger,
        })
    }

    pub fn authority(&self) -> CliAuthority<'_> {
        let store = LedgerBackedStore::new(self.config.program_id, &self.ledger);
        let authority = Authority::new(store, SystemClock);
        match self.config.default_ttl_secs {
            Some(ttl) => authority.with_default_ttl(ttl),
            None => authority,
        }
    }

    /// Save the current ledger state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.config.program_id, &self.ledger.state())?;
        Ok(())
    }

    fn key(&self, name: &str) -> CliResult<KeyPair> {
        Ok(self.keystore.load(name)?)
    }

    /// Accept either a base58 address or the name of a stored key
    pub fn resolve_address(&self, value: &str) -> CliResult<Address> {
        match value.parse::<Address>() {
            Ok(address) => Ok(address),
            Err(_) => Ok(self.keystore.load(value)?.address()),
        }
    }
}

fn print_group(address: &Address, group: &Group) {
    println!("🛡️  Group {}", address);
    println!("   ├─ Policy: {}", group.description());
    println!("   ├─ Creator: {}", group.creator);
    println!("   ├─ Nonce: {}", group.nonce);
    println!("   ├─ Actions proposed: {}", group.action_count);
    println!("   ├─ Created: {}", format_timestamp(group.created_at));
    println!("   └─ Owners:");
    for owner in &group.owners {
        println!("      • {}", owner);
    }
}

fn print_action(index: u64, record: &ActionRecord, status: &str) {
    println!("📝 Action #{} [{}]", index, status);
    println!("   ├─ Proposer: {}", record.proposer);
    println!("   ├─ Payload: {}", hex::encode(&record.payload));
    println!("   ├─ Created: {}", format_timestamp(record.created_at));
    match record.expires_at {
        Some(expires_at) => println!("   ├─ Expires: {}", format_timestamp(expires_at)),
        None => println!("   ├─ Expires: never"),
    }
    println!("   ├─ Approvals: {}", record.approvals.len());
    println!("   └─ Rejections: {}", record.rejections.len());
}

// =============================================================================
// Keys
// =============================================================================

/// Create a new owner key
pub fn cmd_key_new(state: &AppState, name: &str) -> CliResult<()> {
    let key = state.keystore.create(name)?;

    println!("🔐 New key created!");
    println!("   🏷️  Name: {}", name);
    println!("   📍 Address: {}", key.address());
    println!("\n   ⚠️  The private key is stored unencrypted in {:?}", state.config.key_path());

    Ok(())
}

// =============================================================================
// Derivation
// =============================================================================

pub fn cmd_derive_group(state: &AppState, creator: &str, nonce: u64) -> CliResult<()> {
    let creator = state.resolve_address(creator)?;
    let address = derive_group_address(&creator, nonce, &state.config.program_id);
    println!("{}", address);
    Ok(())
}

pub fn cmd_derive_action(state: &AppState, group: &Address, index: u64) -> CliResult<()> {
    let address = derive_action_address(group, index, &state.config.program_id);
    println!("{}", address);
    Ok(())
}

// =============================================================================
// Groups
// =============================================================================

/// Create a group
pub fn cmd_group_create(
    state: &AppState,
    key: &str,
    nonce: u64,
    owners: &[String],
    threshold: u8,
) -> CliResult<()> {
    let signer = state.key(key)?;
    let owners = owners
        .iter()
        .map(|owner| state.resolve_address(owner))
        .collect::<CliResult<Vec<_>>>()?;

    let authority = state.authority();
    let address = authority.create_group(&signer, nonce, owners, threshold)?;
    state.save()?;

    println!("✅ Group created!");
    print_group(&address, &authority.group(&address)?);
    Ok(())
}

pub fn cmd_group_show(state: &AppState, group: &Address) -> CliResult<()> {
    let group_state = state.authority().group(group)?;
    print_group(group, &group_state);
    Ok(())
}

pub fn cmd_group_add_owner(state: &AppState, key: &str, group: &Address, owner: &str) -> CliResult<()> {
    let signer = state.key(key)?;
    let owner = state.resolve_address(owner)?;
    let updated = state.authority().add_owner(&signer, group, owner)?;
    state.save()?;

    println!("✅ Added owner {} ({} now)", owner, updated.description());
    Ok(())
}

pub fn cmd_group_remove_owner(
    state: &AppState,
    key: &str,
    group: &Address,
    owner: &str,
) -> CliResult<()> {
    let signer = state.key(key)?;
    let owner = state.resolve_address(owner)?;
    let updated = state.authority().remove_owner(&signer, group, owner)?;
    state.save()?;

    println!("✅ Removed owner {} ({} now)", owner, updated.description());
    Ok(())
}

pub fn cmd_group_threshold(state: &AppState, key: &str, group: &Address, threshold: u8) -> CliResult<()> {
    let signer = state.key(key)?;
    let updated = state.authority().change_threshold(&signer, group, threshold)?;
    state.save()?;

    println!("✅ Threshold changed ({} now)", updated.description());
    Ok(())
}

pub fn cmd_group_close(state: &AppState, key: &str, group: &Address) -> CliResult<()> {
    let signer = state.key(key)?;
    state.authority().close_group(&signer, group)?;
    state.save()?;

    println!("🗑️  Group {} closed", group);
    Ok(())
}

// =============================================================================
// Actions
// =============================================================================

/// Propose an action; `payload` is hex
pub fn cmd_action_propose(
    state: &AppState,
    key: &str,
    group: &Address,
    payload: &str,
    expires_in: Option<i64>,
) -> CliResult<()> {
    let signer = state.key(key)?;
    let payload = hex::decode(payload.trim_start_matches("0x"))?;
    let authority = state.authority();
    let expires_at = expires_in.map(|secs| authority.now() + secs);

    let action = authority.propose(&signer, group, payload, expires_at)?;
    state.save()?;

    println!("📤 Action proposed!");
    println!("   ├─ Index: {}", action.index);
    println!("   └─ Record: {}", action.address);
    Ok(())
}

pub fn cmd_action_approve(state: &AppState, key: &str, group: &Address, index: u64) -> CliResult<()> {
    let signer = state.key(key)?;
    let status = state.authority().approve(&signer, group, index)?;
    state.save()?;

    println!("👍 Approved action #{} (now {:?})", index, status);
    Ok(())
}

pub fn cmd_action_reject(state: &AppState, key: &str, group: &Address, index: u64) -> CliResult<()> {
    let signer = state.key(key)?;
    let status = state.authority().reject(&signer, group, index)?;
    state.save()?;

    println!("👎 Rejected action #{} (now {:?})", index, status);
    Ok(())
}

pub fn cmd_action_execute(state: &AppState, key: &str, group: &Address, index: u64) -> CliResult<()> {
    let signer = state.key(key)?;
    let payload = state.authority().execute(&signer, group, index)?;
    state.save()?;

    println!("🚀 Executed action #{}", index);
    println!("   └─ Dispatched payload: {}", hex::encode(payload));
    Ok(())
}

pub fn cmd_action_cancel(state: &AppState, key: &str, group: &Address, index: u64) -> CliResult<()> {
    let signer = state.key(key)?;
    state.authority().cancel(&signer, group, index)?;
    state.save()?;

    println!("🚫 Cancelled action #{}", index);
    Ok(())
}

pub fn cmd_action_show(state: &AppState, group: &Address, index: u64) -> CliResult<()> {
    let authority = state.authority();
    let status = authority.status(group, index)?;
    match authority.store().action(group, index)? {
        Some(record) => print_action(index, &record, &format!("{:?}", status)),
        None => println!("📝 Action #{} [{:?}]", index, status),
    }
    Ok(())
}

/// List actions; only open ones unless `all`
pub fn cmd_action_list(state: &AppState, group: &Address, all: bool) -> CliResult<()> {
    let authority = state.authority();
    let current = authority.group(group)?;
    let records = if all {
        authority.actions(group)?
    } else {
        authority.pending(group)?
    };

    if records.is_empty() {
        println!("📭 No actions to show for {}", group);
        return Ok(());
    }

    for (index, record) in records {
        let status = record.status(&current, authority.now());
        print_action(index, &record, &format!("{:?}", status));
    }
    Ok(())
}
