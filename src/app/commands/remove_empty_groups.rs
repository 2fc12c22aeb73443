//! `remove-empty-groups` — delete leaf groups without active users.

use tracing::info;

use crate::adapters::TimeCampApi;
use crate::domain::{SyncConfig, SyncError};
use crate::reconciler::sweeper;

pub fn run(dry_run: bool) -> Result<(), SyncError> {
    let config = SyncConfig::from_env()?;
    info!("Loaded configuration");

    let api = TimeCampApi::new(&config)?;
    sweeper::remove_empty_groups(&api, &config, dry_run)
}
