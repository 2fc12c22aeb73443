//! Identity-synchronization pipeline for TimeCamp.
//!
//! Stage A (`modeller`) turns a raw directory roster into a canonical
//! Target Document; Stage B (`reconciler`) drives the TimeCamp API until
//! the account matches it. The two stages couple only through the blob
//! store.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod modeller;
pub mod ports;
pub mod reconciler;

pub use domain::{Role, Roster, RosterUser, SyncConfig, SyncError, TargetUser, UserStatus};
