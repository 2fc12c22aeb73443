//! User reconciliation: match, diff, mutate, and finalise.

use std::collections::{HashMap, HashSet};

use tracing::{debug, error, info, warn};

use crate::domain::{Role, SyncConfig, SyncError, TargetUser};
use crate::ports::{ApiUser, RoleAssignment, TargetApi, UserUpdate};
use crate::reconciler::groups::GroupStructure;

/// Bulk-fetched view of the target account, read once before any mutation.
/// Later mutations do not invalidate it; the diffs are idempotent, so
/// transiently stale reads are tolerated.
pub struct TargetState {
    pub users_by_email: HashMap<String, ApiUser>,
    pub additional_emails: HashMap<i64, Option<String>>,
    pub external_ids: HashMap<i64, Option<String>>,
    pub manually_added: HashMap<i64, bool>,
    pub roles: HashMap<String, Vec<RoleAssignment>>,
}

impl TargetState {
    pub fn fetch(api: &dyn TargetApi) -> Result<Self, SyncError> {
        let users = api.users()?;
        let user_ids: Vec<i64> = users.iter().map(|user| user.user_id).collect();

        let (additional_emails, external_ids, manually_added, roles) = if user_ids.is_empty() {
            (HashMap::new(), HashMap::new(), HashMap::new(), HashMap::new())
        } else {
            (
                api.additional_emails(&user_ids)?,
                api.external_ids(&user_ids)?,
                api.manually_added(&user_ids)?,
                api.user_roles()?,
            )
        };

        let users_by_email =
            users.into_iter().map(|user| (user.email.to_lowercase(), user)).collect();

        Ok(Self { users_by_email, additional_emails, external_ids, manually_added, roles })
    }

    fn user_by_id(&self, user_id: i64) -> Option<&ApiUser> {
        self.users_by_email.values().find(|user| user.user_id == user_id)
    }

    pub fn is_manually_added(&self, user_id: i64) -> bool {
        self.manually_added.get(&user_id).copied().unwrap_or(false)
    }
}

/// A user created this run, buffered for the finalisation pass.
#[derive(Debug, Clone)]
struct NewUser {
    email: String,
    group_id: i64,
    real_email: Option<String>,
    external_id: String,
    role: Role,
}

pub struct UserReconciler<'a> {
    api: &'a dyn TargetApi,
    config: &'a SyncConfig,
    dry_run: bool,
    newly_created: Vec<NewUser>,
}

impl<'a> UserReconciler<'a> {
    pub fn new(api: &'a dyn TargetApi, config: &'a SyncConfig, dry_run: bool) -> Self {
        Self { api, config, dry_run, newly_created: Vec::new() }
    }

    /// Reconcile every active user from the Target Document. Returns the
    /// target-side ids that were matched, so the deactivation pass leaves
    /// them alone.
    pub fn reconcile(
        &mut self,
        target_users: &[TargetUser],
        groups: &GroupStructure,
        state: &TargetState,
    ) -> Result<HashSet<i64>, SyncError> {
        let additional_email_to_user: HashMap<String, i64> = state
            .additional_emails
            .iter()
            .filter_map(|(user_id, email)| {
                email.as_ref().map(|email| (email.to_lowercase(), *user_id))
            })
            .collect();

        let mut processed_user_ids = HashSet::new();

        for desired in target_users {
            let email = desired.email.to_lowercase();

            if !desired.is_active() {
                debug!("Skipping inactive user: {email}");
                continue;
            }

            let existing = state.users_by_email.get(&email).or_else(|| {
                additional_email_to_user.get(&email).and_then(|user_id| state.user_by_id(*user_id))
            });

            if let Some(existing) = existing {
                if !processed_user_ids.insert(existing.user_id) {
                    continue;
                }
                if let Err(err) = self.update_existing(existing, desired, groups, state) {
                    error!("Failed to update user {email}: {err}");
                }
            } else {
                self.create_new(desired, groups);
            }
        }

        Ok(processed_user_ids)
    }

    fn update_existing(
        &self,
        existing: &ApiUser,
        desired: &TargetUser,
        groups: &GroupStructure,
        state: &TargetState,
    ) -> Result<(), SyncError> {
        let user_id = existing.user_id;
        let email = &existing.email;

        if self.config.ignored_user_ids.contains(&user_id) {
            debug!("Skipping ignored user: {email} (ID: {user_id})");
            return Ok(());
        }
        if self.config.disable_manual_user_updates && state.is_manually_added(user_id) {
            info!("Skipping updates for manually added user: {email} (ID: {user_id})");
            return Ok(());
        }

        let breadcrumb = &desired.groups_breadcrumb;
        let target_group_id = if breadcrumb.is_empty() {
            Some(self.config.root_group_id)
        } else {
            groups.resolve(breadcrumb)
        };
        let target_group_name = if breadcrumb.is_empty() { "root" } else { breadcrumb.as_str() };

        let mut update = UserUpdate::default();
        let mut changes = Vec::new();

        if existing.display_name != desired.user_name {
            update.full_name = Some(desired.user_name.clone());
            changes.push(format!(
                "name from '{}' to '{}'",
                existing.display_name, desired.user_name
            ));
        }

        match target_group_id {
            Some(group_id) if existing.group_id != Some(group_id) => {
                if self.config.disable_group_updates {
                    debug!("Skipping group update for user {email}: group updates are disabled");
                } else {
                    update.group_id = Some(group_id);
                    changes.push(format!("group to '{target_group_name}' (ID: {group_id})"));
                }
            }
            None => {
                if self.dry_run && !self.config.disable_group_updates {
                    changes.push(format!("group to '{target_group_name}'"));
                } else {
                    debug!(
                        "Group '{target_group_name}' does not exist on the target; skipping membership update for {email}"
                    );
                }
            }
            _ => {}
        }

        if self.config.disable_role_updates {
            debug!("Skipping role update for user {email}: role updates are disabled");
        } else {
            let desired_role_id = desired.role.role_id();
            let current_group = existing.group_id.map(|id| id.to_string());
            let current_role_id = state
                .roles
                .get(&user_id.to_string())
                .and_then(|assignments| {
                    assignments
                        .iter()
                        .find(|assignment| Some(&assignment.group_id) == current_group.as_ref())
                })
                .map(|assignment| assignment.role_id.as_str());

            if current_role_id != Some(desired_role_id) {
                update.role_id = Some(desired_role_id.to_string());
                changes.push(format!("role to '{desired_role_id}'"));
            }
        }

        if update != UserUpdate::default() || (self.dry_run && !changes.is_empty()) {
            if self.dry_run {
                info!("[DRY RUN] Would update user {email}: {}", changes.join(", "));
                info!("[DRY RUN] Would set added_manually=0 for user {email}");
            } else {
                info!("Updating user {email}: {}", changes.join(", "));
                let current_group_id = existing.group_id.unwrap_or(self.config.root_group_id);
                self.api.update_user(user_id, &update, current_group_id)?;
                self.api.update_user_setting(user_id, "added_manually", "0")?;
            }
        }

        if !existing.is_enabled {
            if self.dry_run {
                info!("[DRY RUN] Would re-enable user {email}");
            } else {
                info!("Re-enabling user {email}");
                self.api.update_user_setting(user_id, "disabled_user", "0")?;
                self.api.update_user_setting(user_id, "added_manually", "0")?;
            }
        }

        if let Some(real_email) = &desired.real_email {
            if self.config.disable_additional_email_sync {
                debug!("Skipping additional email update for user {email}: sync is disabled");
            } else {
                let current = state.additional_emails.get(&user_id).cloned().flatten();
                if current.as_deref() != Some(real_email.as_str()) {
                    if self.dry_run {
                        info!("[DRY RUN] Would update additional email for user {email}");
                    } else {
                        info!("Updating additional email for user {email}");
                        self.api.set_additional_email(user_id, real_email)?;
                        self.api.update_user_setting(user_id, "added_manually", "0")?;
                    }
                }
            }
        }

        if !desired.external_id.is_empty() && !self.config.disable_external_id_sync {
            let current = state.external_ids.get(&user_id).cloned().flatten();
            if current.as_deref() != Some(desired.external_id.as_str()) {
                if self.dry_run {
                    info!("[DRY RUN] Would update external ID for user {email}");
                } else {
                    info!("Updating external ID for user {email}");
                    self.api.update_user_setting(user_id, "external_id", &desired.external_id)?;
                    self.api.update_user_setting(user_id, "added_manually", "0")?;
                }
            }
        }

        Ok(())
    }

    fn create_new(&mut self, desired: &TargetUser, groups: &GroupStructure) {
        let email = &desired.email;

        if self.config.disable_new_users {
            info!("Skipping creation of new user {email} (new user creation is disabled)");
            return;
        }

        let breadcrumb = &desired.groups_breadcrumb;
        let (group_id, group_name) = if breadcrumb.is_empty() {
            (self.config.root_group_id, "root")
        } else {
            match groups.resolve(breadcrumb) {
                Some(group_id) => (group_id, breadcrumb.as_str()),
                None => (self.config.root_group_id, breadcrumb.as_str()),
            }
        };

        if self.dry_run {
            info!("[DRY RUN] Would create user: {email} in group '{group_name}'");
            return;
        }

        info!("Creating new user: {email} ({}) in group '{group_name}'", desired.user_name);
        match self.api.add_user(email, &desired.user_name, group_id) {
            Ok(response) => {
                debug!("User creation response: {response}");
                self.newly_created.push(NewUser {
                    email: email.clone(),
                    group_id,
                    real_email: desired.real_email.clone(),
                    external_id: desired.external_id.clone(),
                    role: desired.role,
                });
            }
            Err(err) => error!("Failed to create user {email}: {err}"),
        }
    }

    /// Second pass for users created this run: refetch the user list and
    /// apply the settings that creation cannot carry.
    pub fn finalize_new_users(&mut self) -> Result<(), SyncError> {
        if self.dry_run || self.newly_created.is_empty() {
            return Ok(());
        }
        info!("Finalizing {} newly created users...", self.newly_created.len());

        let current_users = self.api.users()?;
        let by_email: HashMap<String, ApiUser> = current_users
            .into_iter()
            .map(|user| (user.email.to_lowercase(), user))
            .collect();

        for new_user in std::mem::take(&mut self.newly_created) {
            let Some(created) = by_email.get(&new_user.email.to_lowercase()) else {
                warn!("Could not find newly created user {} during finalisation", new_user.email);
                continue;
            };
            if let Err(err) = self.finalize_one(&new_user, created.user_id) {
                error!("Failed to finalise new user {}: {err}", new_user.email);
            }
        }
        Ok(())
    }

    fn finalize_one(&self, new_user: &NewUser, user_id: i64) -> Result<(), SyncError> {
        info!("Applying final settings to new user {} (ID: {user_id})", new_user.email);
        self.api.update_user_setting(user_id, "added_manually", "0")?;

        if new_user.role != Role::User {
            info!("Setting role {:?} for new user {}", new_user.role, new_user.email);
            let update =
                UserUpdate { role_id: Some(new_user.role.role_id().to_string()), ..Default::default() };
            self.api.update_user(user_id, &update, new_user.group_id)?;
        }

        if let Some(real_email) = &new_user.real_email
            && !self.config.disable_additional_email_sync
        {
            info!("Setting additional email for new user {}", new_user.email);
            self.api.set_additional_email(user_id, real_email)?;
        }

        if !new_user.external_id.is_empty() && !self.config.disable_external_id_sync {
            info!("Setting external ID for new user {}", new_user.email);
            self.api.update_user_setting(user_id, "external_id", &new_user.external_id)?;
        }
        Ok(())
    }
}
