//! Stage A end-to-end: roster blob in, Target Document blob out.

use std::env;

use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;
use timecamp_sync::adapters::LocalBlobStore;
use timecamp_sync::app::commands::prepare;
use timecamp_sync::ports::BlobStore;

fn clear_timecamp_env() {
    let keys: Vec<String> =
        env::vars().map(|(key, _)| key).filter(|key| key.starts_with("TIMECAMP_")).collect();
    for key in keys {
        unsafe { env::remove_var(&key) };
    }
}

fn store_with_roster(users: serde_json::Value) -> (TempDir, LocalBlobStore) {
    let dir = TempDir::new().unwrap();
    let store = LocalBlobStore::new(dir.path().to_path_buf());
    store.save_json("var/users.json", &json!({ "users": users })).unwrap();
    (dir, store)
}

#[test]
#[serial]
fn prepare_writes_a_sorted_document_with_wire_field_names() {
    clear_timecamp_env();
    unsafe { env::set_var("TIMECAMP_SHOW_EXTERNAL_ID", "false") };

    let (_dir, store) = store_with_roster(json!([
        {"external_id": "2", "name": "Zed", "email": "Z@x.com", "department": "Eng/Team"},
        {"external_id": "1", "name": "Ann", "email": "a@x.com", "department": "Eng"}
    ]));

    prepare::run(&store, "var/timecamp_users.json", false).unwrap();

    let document = store.load_json("var/timecamp_users.json").unwrap();
    let users = document.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["timecamp_email"], json!("a@x.com"));
    assert_eq!(users[1]["timecamp_email"], json!("z@x.com"));
    assert_eq!(users[1]["timecamp_groups_breadcrumb"], json!("Eng/Team"));
    assert_eq!(users[0]["timecamp_status"], json!("active"));
    assert_eq!(users[0]["timecamp_role"], json!("user"));
    assert!(users[0].get("timecamp_real_email").is_none());
    assert_eq!(users[0]["raw_data"]["external_id"], json!("1"));

    clear_timecamp_env();
}

#[test]
#[serial]
fn prepare_dry_run_writes_nothing() {
    clear_timecamp_env();

    let (_dir, store) = store_with_roster(json!([
        {"external_id": "1", "name": "Ann", "email": "a@x.com"}
    ]));

    prepare::run(&store, "var/timecamp_users.json", true).unwrap();
    assert!(!store.exists("var/timecamp_users.json").unwrap());

    clear_timecamp_env();
}

#[test]
#[serial]
fn prepare_fails_without_a_roster() {
    clear_timecamp_env();
    let dir = TempDir::new().unwrap();
    let store = LocalBlobStore::new(dir.path().to_path_buf());

    let err = prepare::run(&store, "var/timecamp_users.json", false).unwrap_err();
    assert!(err.to_string().contains("var/users.json"));

    clear_timecamp_env();
}

#[test]
#[serial]
fn prepare_applies_an_inline_transform_before_modelling() {
    clear_timecamp_env();
    let transform = json!({
        "filter": {"property": "department", "string": {"equals": "Temp"}},
        "transform": [{"property": "department", "action": "replace_all", "value": "Contractors"}]
    });
    unsafe { env::set_var("TIMECAMP_PREPARE_TRANSFORM_CONFIG", transform.to_string()) };

    let (_dir, store) = store_with_roster(json!([
        {"external_id": "1", "name": "Ann", "email": "a@x.com", "department": "Temp"}
    ]));

    prepare::run(&store, "var/timecamp_users.json", false).unwrap();

    let document = store.load_json("var/timecamp_users.json").unwrap();
    assert_eq!(document[0]["timecamp_groups_breadcrumb"], json!("Contractors"));

    clear_timecamp_env();
}

#[test]
#[serial]
fn prepare_output_is_byte_identical_across_runs() {
    clear_timecamp_env();

    let roster = json!([
        {"external_id": "1", "name": "Ann", "email": "a@x.com", "department": "Eng",
         "supervisor_id": "", "job_title": "Lead"},
        {"external_id": "2", "name": "Bob", "email": "b@x.com", "department": "Eng",
         "supervisor_id": "1"}
    ]);

    let (_dir, store) = store_with_roster(roster.clone());
    prepare::run(&store, "var/first.json", false).unwrap();
    prepare::run(&store, "var/second.json", false).unwrap();

    assert_eq!(
        store.load_json("var/first.json").unwrap(),
        store.load_json("var/second.json").unwrap()
    );

    clear_timecamp_env();
}
