//! Integration tests for parsing Crowd response documents.
//!
//! These tests validate that the models deserialize realistic server responses,
//! including fields the client does not model.

use crowd_usermgmt::{MembershipDump, Session, User};
use std::fs;
use std::path::PathBuf;

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_fixture(name: &str) -> String {
    let fixture_path = fixtures_dir().join(name);
    fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    })
}

#[test]
fn test_deserialize_user_with_attributes() {
    let json_data = load_fixture("user.json");
    let user: User = serde_json::from_str(&json_data)
        .unwrap_or_else(|e| panic!("Failed to deserialize user: {}\nJSON: {}", e, json_data));

    assert_eq!(user.name, "jdoe");
    assert_eq!(user.first_name.as_deref(), Some("Jane"));
    assert_eq!(user.display_name.as_deref(), Some("Jane Doe"));
    assert!(user.active);
    assert!(user.key.as_deref().unwrap().starts_with("32769:"));

    assert_eq!(user.attributes.attributes.len(), 2);
    assert_eq!(
        user.attribute("department").unwrap(),
        ["R&D".to_string(), "Platform".to_string()]
    );
    assert!(user.attribute("missing").is_none());
}

#[test]
fn test_deserialize_session() {
    let json_data = load_fixture("session.json");
    let session: Session = serde_json::from_str(&json_data).unwrap();

    assert_eq!(session.token, "lzCt0tQ1bJ2Tx6FYdqjL5w00");
    let user = session.user.as_ref().expect("session should expand the user");
    assert_eq!(user.email.as_deref(), Some("jdoe@example.com"));

    let created = session.created_at().unwrap();
    let expires = session.expires_at().unwrap();
    assert_eq!((expires - created).num_minutes(), 60);
}

#[test]
fn test_minimal_user_defaults() {
    let user: User = serde_json::from_str(r#"{"name":"svc-account"}"#).unwrap();
    assert_eq!(user.name, "svc-account");
    assert!(!user.active);
    assert!(user.email.is_none());
    assert!(user.attributes.attributes.is_empty());
}

#[test]
fn test_parse_membership_dump() {
    let document = load_fixture("membership.xml");
    let dump = MembershipDump::parse(document.as_bytes()).unwrap();

    assert_eq!(dump.root().name, "memberships");
    let memberships = dump.memberships();
    assert_eq!(memberships.len(), 3);

    let staff = dump.group("staff").unwrap();
    assert!(staff.users.is_empty());
    assert_eq!(staff.child_groups, vec!["developers", "contractors"]);

    let contractors = dump.group("contractors").unwrap();
    assert_eq!(contractors.users, vec!["bwayne"]);
}
