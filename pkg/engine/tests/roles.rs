//! Role configuration store behavior.

mod common;

use common::test_backend;
use pkg_engine::{EngineError, RoleParams};
use pkg_types::role::RoleType;

fn sa_params() -> RoleParams {
    RoleParams {
        allowed_kubernetes_namespaces: Some(vec!["app".to_string()]),
        service_account_name: Some("sample-app".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn write_read_list_delete() {
    let (_kube, _storage, backend) = test_backend();

    backend.write_role("first", sa_params()).await.unwrap();
    backend.write_role("second", sa_params()).await.unwrap();

    let role = backend.read_role("first").await.unwrap().unwrap();
    assert_eq!(role.name, "first");
    assert_eq!(role.service_account_name, "sample-app");
    assert_eq!(role.kubernetes_role_type, RoleType::Role);

    let mut names = backend.list_roles().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["first".to_string(), "second".to_string()]);

    backend.delete_role("first").await.unwrap();
    assert!(backend.read_role("first").await.unwrap().is_none());
    // deleting again is fine
    backend.delete_role("first").await.unwrap();
}

#[tokio::test]
async fn partial_update_merges_onto_existing() {
    let (_kube, _storage, backend) = test_backend();
    backend.write_role("role1", sa_params()).await.unwrap();

    backend
        .write_role(
            "role1",
            RoleParams {
                token_ttl: Some(300),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let role = backend.read_role("role1").await.unwrap().unwrap();
    assert_eq!(role.token_ttl, 300);
    // untouched fields survive the merge
    assert_eq!(role.service_account_name, "sample-app");
    assert_eq!(role.allowed_kubernetes_namespaces, vec!["app".to_string()]);
}

#[tokio::test]
async fn rejects_multiple_target_modes() {
    let (_kube, _storage, backend) = test_backend();
    backend.write_role("role1", sa_params()).await.unwrap();

    // adding a second target mode to an existing role must fail
    let err = backend
        .write_role(
            "role1",
            RoleParams {
                kubernetes_role_name: Some("existing".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Validation(_))
    ));

    // and a role with no target mode at all is also rejected
    let err = backend
        .write_role(
            "role2",
            RoleParams {
                allowed_kubernetes_namespaces: Some(vec!["*".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn rejects_ttl_above_max() {
    let (_kube, _storage, backend) = test_backend();

    let mut params = sa_params();
    params.token_ttl = Some(600);
    params.token_max_ttl = Some(300);
    let err = backend.write_role("role1", params).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Validation(_))
    ));
    assert!(backend.read_role("role1").await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_rules_leave_previous_value_unchanged() {
    let (_kube, _storage, backend) = test_backend();
    backend.write_role("role1", sa_params()).await.unwrap();
    let before = backend.read_role("role1").await.unwrap().unwrap();

    let err = backend
        .write_role(
            "role1",
            RoleParams {
                service_account_name: Some(String::new()),
                generated_role_rules: Some("{{{ not rules".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Validation(_))
    ));

    let after = backend.read_role("role1").await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn role_type_is_canonicalized() {
    let (_kube, _storage, backend) = test_backend();

    let mut params = sa_params();
    params.kubernetes_role_type = Some("clusterrole".to_string());
    backend.write_role("role1", params).await.unwrap();

    let role = backend.read_role("role1").await.unwrap().unwrap();
    assert_eq!(role.kubernetes_role_type, RoleType::ClusterRole);

    let mut params = sa_params();
    params.kubernetes_role_type = Some("invalid".to_string());
    let err = backend.write_role("role2", params).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn deleting_a_role_does_not_block_revocation() {
    let (kube, _storage, backend) = test_backend();
    backend
        .write_role(
            "rules-role",
            RoleParams {
                allowed_kubernetes_namespaces: Some(vec!["test".to_string()]),
                generated_role_rules: Some(
                    r#"{"rules":[{"apiGroups":[""],"resources":["pods"],"verbs":["get"]}]}"#
                        .to_string(),
                ),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let creds = backend
        .issue(&pkg_types::request::CredsRequest::new("rules-role", "test"))
        .await
        .unwrap();

    backend.delete_role("rules-role").await.unwrap();
    backend.revoke(&creds.revocation).await.unwrap();
    assert_eq!(kube.live_objects(), 0);
}
