/// Tests for subscriptions and their lifecycle
///
/// These tests verify that:
/// - Subscribers see ObjectAvailable first, then every change in order
/// - The last unsubscribe releases the object and tells the server
/// - A version gap triggers a resynchronization from a fresh snapshot
/// - Revocations reach every subscriber
use mirror_client::{open_session, SessionError, SessionEvent, Value};
use mirror_shared::{Message, ObjectEvent, ObjectEventKind};
use mirror_test::{init_logger, object, recorder, ServerScript, TestServer};

fn script() -> ServerScript {
    ServerScript::new()
        .with_object(object(9, 1, "Chest", &[("gold", Value::Int(10))]))
        .with_service("echo", |args| Some(Ok(Value::List(args.to_vec()))))
}

#[tokio::test]
async fn subscriber_sees_snapshot_then_changes_in_order() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();

    let (listener, mut events) = recorder();
    let handle = session.subscribe(9, listener).await.unwrap();
    assert_eq!(handle.object_id(), 9);

    match events.next().await {
        SessionEvent::ObjectAvailable { snapshot } => {
            assert_eq!(snapshot.class(), "Chest");
            assert_eq!(snapshot.field("gold"), Some(&Value::Int(10)));
        }
        other => panic!("unexpected event {:?}", other),
    }

    for (version, gold) in (2u32..=6).zip(11i64..) {
        server.push_event(ObjectEvent::field_changed(9, version, "gold", gold));
    }
    for gold in 11i64..=15 {
        match events.next().await {
            SessionEvent::FieldsChanged { changes, .. } => {
                assert_eq!(changes[0].new, Value::Int(gold));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}

#[tokio::test]
async fn collection_events_carry_index_and_value() {
    init_logger();
    let server = TestServer::start(
        ServerScript::new().with_object(object(3, 1, "Bag", &[("items", Value::List(Vec::new()))])),
    )
    .await;
    let session = open_session(server.client_config()).await.unwrap();
    let (listener, mut events) = recorder();
    session.subscribe(3, listener).await.unwrap();
    events.next().await;

    server.push_event(ObjectEvent {
        object_id: 3,
        version: 2,
        kind: ObjectEventKind::ElementAdded {
            field: "items".to_string(),
            value: Value::Ref("sword".to_string()),
        },
    });
    server.push_event(ObjectEvent {
        object_id: 3,
        version: 3,
        kind: ObjectEventKind::ElementRemoved {
            field: "items".to_string(),
            index: 0,
        },
    });

    match events.next().await {
        SessionEvent::ElementAdded { index, value, .. } => {
            assert_eq!(index, 0);
            assert_eq!(value, Value::Ref("sword".to_string()));
        }
        other => panic!("unexpected event {:?}", other),
    }
    match events.next().await {
        SessionEvent::ElementRemoved {
            snapshot, value, ..
        } => {
            assert_eq!(value, Value::Ref("sword".to_string()));
            assert_eq!(snapshot.field("items"), Some(&Value::List(Vec::new())));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn subscribing_to_a_missing_object_fails() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();

    let (listener, _events) = recorder();
    let result = session.subscribe(404, listener).await;

    assert_eq!(
        result.err(),
        Some(SessionError::SubscriptionFailed {
            object_id: 404,
            message: "no such object".to_string()
        })
    );
    assert_eq!(session.get(404), Ok(None));
}

#[tokio::test]
async fn last_unsubscribe_releases_the_object() {
    init_logger();
    let mut server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();

    let (first_listener, _first_events) = recorder();
    let (second_listener, _second_events) = recorder();
    let first = session.subscribe(9, first_listener).await.unwrap();
    let second = session.subscribe(9, second_listener).await.unwrap();
    session.invoke("echo", Vec::new()).await.unwrap();
    let subscribes = server
        .drain_received()
        .into_iter()
        .filter(|message| matches!(message, Message::Subscribe { object_id: 9 }))
        .count();
    assert_eq!(subscribes, 1);

    session.unsubscribe(first).await.unwrap();
    session.invoke("echo", Vec::new()).await.unwrap();
    assert!(session.get(9).unwrap().is_some());
    assert!(!server
        .drain_received()
        .iter()
        .any(|message| matches!(message, Message::Unsubscribe { .. })));

    session.unsubscribe(second).await.unwrap();
    assert!(session.get(9).unwrap().is_none());
    server
        .expect(|message| matches!(message, Message::Unsubscribe { object_id: 9 }))
        .await;
}

#[tokio::test]
async fn version_gap_resynchronizes_the_object() {
    init_logger();
    let mut server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();
    let (listener, mut events) = recorder();
    session.subscribe(9, listener).await.unwrap();
    events.next().await;
    server
        .expect(|message| matches!(message, Message::Subscribe { object_id: 9 }))
        .await;

    // the server moved on to version 5 while versions 2-4 were lost
    server.set_object(object(9, 5, "Chest", &[("gold", Value::Int(99))]));
    server.push_event(ObjectEvent::field_changed(9, 5, "gold", 99i64));

    server
        .expect(|message| matches!(message, Message::Subscribe { object_id: 9 }))
        .await;
    match events.next().await {
        SessionEvent::ObjectResynchronized { snapshot } => {
            assert_eq!(snapshot.version(), 5);
            assert_eq!(snapshot.field("gold"), Some(&Value::Int(99)));
        }
        other => panic!("unexpected event {:?}", other),
    }

    server.push_event(ObjectEvent::field_changed(9, 6, "gold", 100i64));
    assert!(matches!(
        events.next().await,
        SessionEvent::FieldsChanged { .. }
    ));
}

#[tokio::test]
async fn server_revocation_reaches_subscribers() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();
    let (listener, mut events) = recorder();
    session.subscribe(9, listener).await.unwrap();
    events.next().await;

    server.push_event(ObjectEvent::removed(9, 2));

    match events.next().await {
        SessionEvent::ObjectRevoked { snapshot } => {
            assert_eq!(snapshot.object_id(), 9);
            assert_eq!(snapshot.field("gold"), Some(&Value::Int(10)));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(session.get(9), Ok(None));
}

#[tokio::test]
async fn close_revokes_every_subscribed_object() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();
    let (listener, mut events) = recorder();
    session.subscribe(9, listener).await.unwrap();
    events.next().await;

    session.close().await;

    assert!(matches!(
        events.next().await,
        SessionEvent::ObjectRevoked { .. }
    ));
    let (listener, _events) = recorder();
    assert_eq!(
        session.subscribe(9, listener).await.err(),
        Some(SessionError::SessionClosed)
    );
}

#[tokio::test]
async fn unsolicited_events_are_ignored() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();

    server.push_event(object(50, 1, "Stranger", &[]).to_event());
    server.push_event(ObjectEvent::field_changed(51, 2, "hp", 1i64));
    session.invoke("echo", Vec::new()).await.unwrap();

    assert_eq!(session.get(50), Ok(None));
    assert_eq!(session.get(51), Ok(None));
}
