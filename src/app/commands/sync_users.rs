//! `sync-users` — Stage B: reconcile the target account against the
//! Target Document.

use tracing::{debug, info};

use crate::adapters::TimeCampApi;
use crate::domain::{SyncConfig, SyncError, TargetUser};
use crate::ports::BlobStore;
use crate::reconciler;

pub fn run(store: &dyn BlobStore, input: &str, dry_run: bool) -> Result<(), SyncError> {
    let config = SyncConfig::from_env()?;
    info!("Loaded configuration");
    debug!("Root group ID: {}", config.root_group_id);
    debug!("Ignored user IDs: {:?}", config.ignored_user_ids);

    if !store.exists(input)? {
        return Err(SyncError::config(format!(
            "Input file not found: {input}. Run the prepare command first."
        )));
    }

    let document = store.load_json(input)?;
    let target_users: Vec<TargetUser> = serde_json::from_value(document)?;
    info!("Loaded {} users from {input}", target_users.len());

    let api = TimeCampApi::new(&config)?;
    reconciler::sync(&api, &config, &target_users, dry_run)
}
