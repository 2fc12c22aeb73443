//! End-to-end reconcile scenarios against the recording fake.

mod common;

use common::{FakeApi, ROOT_GROUP_ID, document_user, test_config};
use timecamp_sync::domain::Role;
use timecamp_sync::reconciler;

#[test]
fn first_sync_in_department_mode_builds_tree_then_users() {
    let api = FakeApi::new();
    let config = test_config();
    let users = vec![
        document_user("a@x.com", "Eng/Team", "active"),
        document_user("b@x.com", "Eng/Team", "active"),
    ];

    reconciler::sync(&api, &config, &users, false).unwrap();

    let eng_id = api.group_named("Eng").unwrap();
    let team_id = api.group_named("Team").unwrap();
    let a_id = api.user_id_for("a@x.com").unwrap();
    let b_id = api.user_id_for("b@x.com").unwrap();

    assert_eq!(
        api.calls(),
        vec![
            format!("add_group:Eng:{ROOT_GROUP_ID}"),
            format!("add_group:Team:{eng_id}"),
            format!("add_user:a@x.com:{team_id}"),
            format!("add_user:b@x.com:{team_id}"),
            format!("set_setting:{a_id}:added_manually=0"),
            format!("set_setting:{b_id}:added_manually=0"),
        ]
    );
}

#[test]
fn replaying_an_unchanged_sync_issues_zero_mutating_calls() {
    let api = FakeApi::new();
    let config = test_config();
    let mut users = vec![
        document_user("a@x.com", "Eng/Team", "active"),
        document_user("b@x.com", "", "active"),
    ];
    users[0].external_id = "E-1".into();

    reconciler::sync(&api, &config, &users, false).unwrap();
    assert!(!api.calls().is_empty());

    api.clear_calls();
    reconciler::sync(&api, &config, &users, false).unwrap();
    assert_eq!(api.calls(), Vec::<String>::new());
}

#[test]
fn dry_run_issues_zero_mutating_calls() {
    let api = FakeApi::new();
    api.add_existing_user(7, "gone@x.com", "Gone", ROOT_GROUP_ID);
    let config = test_config();
    let users = vec![document_user("new@x.com", "Eng", "active")];

    reconciler::sync(&api, &config, &users, true).unwrap();
    assert_eq!(api.calls(), Vec::<String>::new());
}

#[test]
fn status_change_to_inactive_issues_exactly_one_call() {
    let api = FakeApi::new();
    api.add_existing_user(7, "ann@x.com", "ann@x.com", ROOT_GROUP_ID);
    let config = test_config();
    let users = vec![document_user("ann@x.com", "", "inactive")];

    reconciler::sync(&api, &config, &users, false).unwrap();
    assert_eq!(api.calls(), vec!["set_setting:7:disabled_user=1".to_string()]);
}

#[test]
fn deactivated_user_is_also_moved_when_disabled_group_is_configured() {
    let api = FakeApi::new();
    api.add_existing_group(999, "Disabled", ROOT_GROUP_ID);
    api.add_existing_user(7, "ann@x.com", "ann@x.com", ROOT_GROUP_ID);
    let mut config = test_config();
    config.disabled_users_group_id = 999;

    reconciler::sync(&api, &config, &[], false).unwrap();
    assert_eq!(
        api.calls(),
        vec!["set_setting:7:disabled_user=1".to_string(), "move_user:7:999".to_string()]
    );
    assert_eq!(api.group_of(7), Some(999));
}

#[test]
fn secondary_email_match_updates_instead_of_creating() {
    let api = FakeApi::new();
    api.add_existing_user(7, "u@old.com", "Old Name", ROOT_GROUP_ID);
    api.set_setting(7, "additional_email", "u@new.com");
    let config = test_config();

    let mut user = document_user("u@new.com", "", "active");
    user.user_name = "New Name".into();

    reconciler::sync(&api, &config, &[user], false).unwrap();

    // No creation, no deactivation of the old record; the name diff lands
    // on the matched user.
    assert_eq!(
        api.calls(),
        vec!["set_name:7:New Name".to_string(), "set_setting:7:added_manually=0".to_string()]
    );
}

#[test]
fn deactivation_respects_the_ignore_list() {
    let api = FakeApi::new();
    api.add_existing_user(1, "x@t.com", "x@t.com", ROOT_GROUP_ID);
    api.add_existing_user(2, "y@t.com", "Y Old", ROOT_GROUP_ID);
    api.add_existing_user(3, "z@t.com", "z@t.com", ROOT_GROUP_ID);

    let mut config = test_config();
    config.ignored_user_ids.insert(1);

    let mut y = document_user("y@t.com", "", "active");
    y.user_name = "Y New".into();

    reconciler::sync(&api, &config, &[y], false).unwrap();

    let calls = api.calls();
    assert!(calls.contains(&"set_setting:3:disabled_user=1".to_string()));
    assert!(calls.contains(&"set_name:2:Y New".to_string()));
    assert!(!calls.iter().any(|call| call.contains(":1:")));
}

#[test]
fn user_matched_by_secondary_email_is_never_deactivated() {
    let api = FakeApi::new();
    api.add_existing_user(7, "u@old.com", "u@old.com", ROOT_GROUP_ID);
    api.set_setting(7, "additional_email", "u@new.com");
    let config = test_config();

    reconciler::sync(&api, &config, &[document_user("u@new.com", "", "active")], false).unwrap();
    assert!(!api.calls().iter().any(|call| call.contains("disabled_user=1")));
}

#[test]
fn re_enables_a_disabled_user_that_is_active_in_source() {
    let api = FakeApi::new();
    api.add_existing_user(7, "ann@x.com", "ann@x.com", ROOT_GROUP_ID);
    api.set_setting(7, "disabled_user", "1");
    let config = test_config();

    reconciler::sync(&api, &config, &[document_user("ann@x.com", "", "active")], false).unwrap();
    assert_eq!(
        api.calls(),
        vec![
            "set_setting:7:disabled_user=0".to_string(),
            "set_setting:7:added_manually=0".to_string(),
        ]
    );
}

#[test]
fn existing_sibling_groups_are_reused_case_sensitively() {
    let api = FakeApi::new();
    api.add_existing_group(200, "Eng", ROOT_GROUP_ID);
    let config = test_config();
    let users = vec![document_user("a@x.com", "Eng/Team", "active")];

    reconciler::sync(&api, &config, &users, false).unwrap();

    let calls = api.calls();
    assert!(!calls.contains(&format!("add_group:Eng:{ROOT_GROUP_ID}")));
    assert!(calls.contains(&"add_group:Team:200".to_string()));
}

#[test]
fn disable_flags_strictly_dominate() {
    let api = FakeApi::new();
    api.add_existing_group(200, "Ops", ROOT_GROUP_ID);
    api.add_existing_user(7, "move@x.com", "move@x.com", ROOT_GROUP_ID);
    api.set_role(7, ROOT_GROUP_ID, "3");
    api.add_existing_user(8, "gone@x.com", "gone@x.com", ROOT_GROUP_ID);

    let mut config = test_config();
    config.disable_new_users = true;
    config.disable_group_updates = true;
    config.disable_role_updates = true;
    config.disable_user_deactivation = true;
    config.disable_external_id_sync = true;
    config.disable_additional_email_sync = true;

    let mut mover = document_user("move@x.com", "Ops", "active");
    mover.role = Role::Supervisor;
    mover.external_id = "E-7".into();
    mover.real_email = Some("move@real.com".into());
    let fresh = document_user("fresh@x.com", "", "active");

    reconciler::sync(&api, &config, &[mover, fresh], false).unwrap();
    assert_eq!(api.calls(), Vec::<String>::new());
}

#[test]
fn manual_users_are_skipped_entirely_when_gated() {
    let api = FakeApi::new();
    api.add_existing_user(7, "manual@x.com", "Old", ROOT_GROUP_ID);
    api.set_setting(7, "added_manually", "1");
    api.add_existing_user(8, "stray@x.com", "stray@x.com", ROOT_GROUP_ID);
    api.set_setting(8, "added_manually", "1");

    let mut config = test_config();
    config.disable_manual_user_updates = true;

    let mut renamed = document_user("manual@x.com", "", "active");
    renamed.user_name = "New".into();

    reconciler::sync(&api, &config, &[renamed], false).unwrap();
    // Neither the rename nor the deactivation of the stray user happens.
    assert_eq!(api.calls(), Vec::<String>::new());
}

#[test]
fn new_supervisor_gets_role_and_settings_in_finalisation() {
    let api = FakeApi::new();
    let config = test_config();

    let mut user = document_user("mgr@x.com", "Sales", "active");
    user.role = Role::Supervisor;
    user.external_id = "E-9".into();
    user.real_email = Some("mgr@real.com".into());

    reconciler::sync(&api, &config, &[user], false).unwrap();

    let sales_id = api.group_named("Sales").unwrap();
    let mgr_id = api.user_id_for("mgr@x.com").unwrap();
    assert_eq!(
        api.calls(),
        vec![
            format!("add_group:Sales:{ROOT_GROUP_ID}"),
            format!("add_user:mgr@x.com:{sales_id}"),
            format!("set_setting:{mgr_id}:added_manually=0"),
            format!("set_role:{mgr_id}:2"),
            format!("set_setting:{mgr_id}:additional_email=mgr@real.com"),
            format!("set_setting:{mgr_id}:external_id=E-9"),
        ]
    );
}

#[test]
fn groups_creation_disabled_leaves_users_in_place() {
    let api = FakeApi::new();
    api.add_existing_user(7, "ann@x.com", "ann@x.com", ROOT_GROUP_ID);
    let mut config = test_config();
    config.disable_groups_creation = true;

    let users = vec![document_user("ann@x.com", "Eng/Team", "active")];
    reconciler::sync(&api, &config, &users, false).unwrap();

    // No group creation and no membership update against the missing group.
    assert_eq!(api.calls(), Vec::<String>::new());
    assert_eq!(api.group_of(7), Some(ROOT_GROUP_ID));
}
