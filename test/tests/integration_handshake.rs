/// Tests for session establishment
///
/// These tests verify that:
/// - A successful handshake installs bootstrap objects and reaches Ready
/// - Sequenced events advance state and stale ones are discarded
/// - Rejected credentials, silent servers and refused connections fail cleanly
use std::time::Duration;

use mirror_client::{
    open_session, AuthCode, ClientConfig, SessionError, SessionEvent, SessionState, Value,
};
use mirror_shared::{Message, ObjectEvent};
use mirror_test::{init_logger, object, recorder, ServerScript, TestServer};

#[tokio::test]
async fn handshake_installs_bootstrap_and_applies_next_version() {
    init_logger();
    let server = TestServer::start(
        ServerScript::new()
            .with_bootstrap_object(object(7, 1, "Player", &[("hp", Value::Int(100))]))
            .with_service("echo", |args| Some(Ok(Value::List(args.to_vec())))),
    )
    .await;

    let session = open_session(server.client_config()).await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.bootstrap().connection_id, 1);

    let player = session.get(7).unwrap().expect("bootstrap object is resident");
    assert_eq!(player.version(), 1);
    assert_eq!(player.field("hp"), Some(&Value::Int(100)));

    let (listener, mut events) = recorder();
    session.subscribe(7, listener).await.unwrap();
    assert!(matches!(events.next().await, SessionEvent::ObjectAvailable { .. }));

    server.push_event(ObjectEvent::field_changed(7, 2, "hp", 90i64));
    match events.next().await {
        SessionEvent::FieldsChanged { snapshot, changes } => {
            assert_eq!(snapshot.version(), 2);
            assert_eq!(changes[0].old, Some(Value::Int(100)));
            assert_eq!(changes[0].new, Value::Int(90));
        }
        other => panic!("unexpected event {:?}", other),
    }

    // a second version 2 is stale and must not land
    server.push_event(ObjectEvent::field_changed(7, 2, "hp", 50i64));
    session.invoke("echo", Vec::new()).await.unwrap();

    let player = session.get(7).unwrap().unwrap();
    assert_eq!(player.version(), 2);
    assert_eq!(player.field("hp"), Some(&Value::Int(90)));
    assert!(events.try_next().is_none());
}

#[tokio::test]
async fn wrong_password_is_an_authentication_error() {
    init_logger();
    let server = TestServer::start(ServerScript::new()).await;
    let config = server
        .client_config()
        .with_credentials(mirror_client::Credentials::new("tester", "guess"));

    let result = open_session(config).await;

    assert_eq!(
        result.err(),
        Some(SessionError::Authentication {
            code: AuthCode::InvalidPassword
        })
    );
}

#[tokio::test]
async fn unknown_user_is_an_authentication_error() {
    init_logger();
    let server = TestServer::start(ServerScript::new()).await;
    let config = server
        .client_config()
        .with_credentials(mirror_client::Credentials::new("nobody", "secret"));

    let error = open_session(config).await.err().unwrap();

    assert_eq!(error.to_string(), "Authentication rejected: Invalid username");
}

#[tokio::test]
async fn silent_server_times_out_the_handshake() {
    init_logger();
    let server = TestServer::start(ServerScript::new().silent_handshake()).await;
    let config = server
        .client_config()
        .with_auth_timeout(Duration::from_millis(100));

    let result = open_session(config).await;

    assert!(matches!(result, Err(SessionError::Timeout { .. })));
}

#[tokio::test]
async fn refused_connection_is_a_connection_error() {
    init_logger();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = open_session(ClientConfig::new("127.0.0.1", port)).await;

    assert!(matches!(result, Err(SessionError::Connection { .. })));
}

#[tokio::test]
async fn missing_bundle_fails_before_connecting() {
    init_logger();
    let config = ClientConfig::new("127.0.0.1", 1)
        .with_definition_bundle("/nonexistent/mirror/definitions.bundle");

    let result = open_session(config).await;

    assert!(matches!(result, Err(SessionError::Definition(_))));
}

#[tokio::test]
async fn bootstrap_subscriptions_are_requested_after_authentication() {
    init_logger();
    let mut server = TestServer::start(
        ServerScript::new()
            .with_service_object("inventory", 40)
            .with_object(object(40, 3, "Inventory", &[("slots", Value::List(Vec::new()))]))
            .with_object(object(41, 1, "Quests", &[])),
    )
    .await;
    let config = server
        .client_config()
        .with_bootstrap_service("inventory")
        .with_bootstrap_subscription(41);

    let session = open_session(config).await.unwrap();

    server
        .expect(|message| matches!(message, Message::Subscribe { object_id: 41 }))
        .await;
    server
        .expect(|message| matches!(message, Message::Subscribe { object_id: 40 }))
        .await;
    session.invoke("missing", Vec::new()).await.err().unwrap();
    assert_eq!(session.get(40).unwrap().unwrap().version(), 3);
    assert!(session.get(41).unwrap().is_some());
}
