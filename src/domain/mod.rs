//! Pure domain types and logic: no network, no filesystem side effects
//! beyond reading a transform document.

pub mod config;
pub mod error;
pub mod paths;
pub mod roster;
pub mod target;
pub mod transform;
pub mod tree;

pub use config::SyncConfig;
pub use error::SyncError;
pub use roster::{Roster, RosterUser, TriFlag};
pub use target::{Role, TargetUser, UserStatus};
