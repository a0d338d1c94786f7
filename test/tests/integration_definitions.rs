/// Tests for definition resolution through a live session
///
/// These tests verify that:
/// - Concurrent misses on one id cost a single server fetch
/// - Ids the server does not know resolve to NotFound
/// - A definition bundle on disk is consulted before the server
use std::sync::Arc;

use mirror_client::{open_session, BundleSource, Definition, DefinitionError, SessionError, Value};
use mirror_test::{init_logger, object, ServerScript, TestServer};

fn sword() -> Definition {
    Definition::new("sword", "weapon").with_property("damage", 12i64)
}

#[tokio::test]
async fn concurrent_misses_share_one_fetch() {
    init_logger();
    let server = TestServer::start(ServerScript::new().with_definition(sword())).await;
    let session = open_session(server.client_config()).await.unwrap();

    let (first, second) = tokio::join!(
        session.resolve_definition("sword"),
        session.resolve_definition("sword"),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.property("damage"), Some(&Value::Int(12)));
    assert_eq!(server.definition_requests(), 1);

    session.resolve_definition("sword").await.unwrap();
    assert_eq!(server.definition_requests(), 1);
    assert_eq!(session.definitions().stats().hits, 1);
}

#[tokio::test]
async fn unknown_definition_is_not_found() {
    init_logger();
    let server = TestServer::start(ServerScript::new()).await;
    let session = open_session(server.client_config()).await.unwrap();

    let result = session.resolve_definition("ghost").await;

    assert_eq!(
        result.err(),
        Some(SessionError::Definition(DefinitionError::NotFound {
            resource_id: "ghost".to_string()
        }))
    );
    assert!(!session.definitions().contains("ghost"));
}

#[tokio::test]
async fn bundle_is_consulted_before_the_server() {
    init_logger();
    let path = std::env::temp_dir().join(format!("mirror-bundle-{}.bin", std::process::id()));
    let shield = Definition::new("shield", "armor").with_property("block", 4i64);
    std::fs::write(&path, BundleSource::encode([&shield])).unwrap();

    let server = TestServer::start(ServerScript::new().with_definition(sword())).await;
    let config = server.client_config().with_definition_bundle(&path);
    let session = open_session(config).await.unwrap();

    let resolved = session.resolve_definition("shield").await.unwrap();
    assert_eq!(*resolved, shield);
    assert_eq!(server.definition_requests(), 0);

    session.resolve_definition("sword").await.unwrap();
    assert_eq!(server.definition_requests(), 1);

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn referenced_definitions_are_prefetched_and_pinned() {
    init_logger();
    let server = TestServer::start(
        ServerScript::new()
            .with_definition(sword())
            .with_bootstrap_object(object(
                2,
                1,
                "Hero",
                &[("weapon", Value::Ref("sword".to_string()))],
            )),
    )
    .await;
    let session = open_session(server.client_config()).await.unwrap();

    let sword = session.resolve_definition("sword").await.unwrap();

    assert_eq!(sword.kind, "weapon");
    assert_eq!(server.definition_requests(), 1);
    assert_eq!(session.definitions().pin_count("sword"), 1);
}
