/// Tests for request/response correlation
///
/// These tests verify that:
/// - Responses reach the caller that issued the request
/// - A request that times out does not hold up the others
/// - A caller that gives up leaves no pending entry and sends nothing
/// - Closing the session fails every pending request
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use mirror_client::{open_session, ListenerError, SessionError, SessionState, Value};
use mirror_shared::Message;
use mirror_test::{init_logger, wait_for_state, ServerScript, TestServer};

fn script() -> ServerScript {
    ServerScript::new()
        .with_service("echo", |args| Some(Ok(Value::List(args.to_vec()))))
        .with_service("slow", |_| None)
        .with_service("broken", |_| Some(Err("inventory is locked".to_string())))
}

#[tokio::test]
async fn response_reaches_its_caller() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();

    let (first, second) = tokio::join!(
        session.invoke("echo", vec![Value::from("first")]),
        session.invoke("echo", vec![Value::from("second")]),
    );

    assert_eq!(first.unwrap(), Value::List(vec![Value::from("first")]));
    assert_eq!(second.unwrap(), Value::List(vec![Value::from("second")]));
}

#[tokio::test]
async fn remote_error_is_reported_to_the_caller() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();

    let result = session.invoke("broken", Vec::new()).await;

    assert_eq!(
        result,
        Err(SessionError::Remote {
            message: "inventory is locked".to_string()
        })
    );
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn timed_out_request_does_not_block_others() {
    init_logger();
    let server = TestServer::start(script()).await;
    let config = server
        .client_config()
        .with_request_timeout(Duration::from_millis(300));
    let session = open_session(config).await.unwrap();

    let (slow, fast) = tokio::join!(
        session.invoke("slow", Vec::new()),
        session.invoke("echo", vec![Value::Int(1)]),
    );

    assert!(matches!(slow, Err(SessionError::Timeout { .. })));
    assert_eq!(fast.unwrap(), Value::List(vec![Value::Int(1)]));
    assert_eq!(session.state(), SessionState::Ready);

    let again = session.invoke("echo", Vec::new()).await;
    assert_eq!(again.unwrap(), Value::List(Vec::new()));
}

#[tokio::test]
async fn cancelled_request_is_forgotten_locally() {
    init_logger();
    let mut server = TestServer::start(script()).await;
    let config = server
        .client_config()
        .with_request_timeout(Duration::from_secs(10));
    let session = open_session(config).await.unwrap();

    let cancelled =
        tokio::time::timeout(Duration::from_millis(100), session.invoke("slow", Vec::new())).await;
    assert!(cancelled.is_err());

    let request_id = match server
        .expect(|message| matches!(message, Message::Invoke { service, .. } if service == "slow"))
        .await
    {
        Message::Invoke { request_id, .. } => request_id,
        other => panic!("unexpected message {:?}", other),
    };

    // the answer arrives after the caller gave up
    server.push(Message::Response {
        request_id,
        result: Ok(Value::from("late")),
    });
    let echoed = session.invoke("echo", vec![Value::Int(2)]).await;

    assert_eq!(echoed.unwrap(), Value::List(vec![Value::Int(2)]));
    assert_eq!(session.state(), SessionState::Ready);
    let sent_since = server.drain_received();
    assert_eq!(sent_since.len(), 1);
    assert!(matches!(
        &sent_since[0],
        Message::Invoke { service, .. } if service == "echo"
    ));
}

#[tokio::test]
async fn close_fails_pending_requests_and_sends_logoff() {
    init_logger();
    let mut server = TestServer::start(script()).await;
    let config = server
        .client_config()
        .with_request_timeout(Duration::from_secs(10));
    let session = open_session(config).await.unwrap();

    let (pending, ()) = tokio::join!(session.invoke("slow", Vec::new()), async {
        tokio::task::yield_now().await;
        session.close().await;
    });

    assert_eq!(pending, Err(SessionError::SessionClosed));
    assert_eq!(session.state(), SessionState::Disconnected);
    server
        .expect(|message| matches!(message, Message::Logoff))
        .await;

    assert_eq!(
        session.invoke("echo", Vec::new()).await,
        Err(SessionError::SessionClosed)
    );
    assert_eq!(session.get(1), Err(SessionError::SessionClosed));

    // closing twice is harmless
    session.close().await;
}

#[tokio::test]
async fn server_error_frame_ends_the_session() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();

    server.push(Message::Error {
        message: "server shutting down".to_string(),
    });
    wait_for_state(&session, SessionState::Disconnected).await;

    assert_eq!(
        session.invoke("echo", Vec::new()).await,
        Err(SessionError::SessionClosed)
    );
}

#[tokio::test]
async fn dropped_connection_ends_the_session() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();

    server.disconnect();

    wait_for_state(&session, SessionState::Disconnected).await;
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    init_logger();
    let mut server = TestServer::start(script()).await;
    let _session = open_session(server.client_config()).await.unwrap();

    server.push(Message::Ping { nonce: 77 });

    let pong = server
        .expect(|message| matches!(message, Message::Pong { .. }))
        .await;
    assert_eq!(pong, Message::Pong { nonce: 77 });
}

#[tokio::test]
async fn notifications_reach_listeners() {
    init_logger();
    let server = TestServer::start(script()).await;
    let session = open_session(server.client_config()).await.unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session
        .on_notification(move |name: &str, payload: &Value| -> Result<(), ListenerError> {
            sink.lock().unwrap().push((name.to_string(), payload.clone()));
            Ok(())
        })
        .unwrap();

    server.push(Message::Notification {
        name: "motd".to_string(),
        payload: Value::from("double xp weekend"),
    });
    session.invoke("echo", Vec::new()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("motd".to_string(), Value::from("double xp weekend"))]
    );
}
