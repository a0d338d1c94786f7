use std::{collections::BTreeMap, time::Duration};

use mirror_client::{BootstrapObject, ObjectId, Session, SessionState, Value};

/// Routes `log` output through the test harness; safe to call from every test
pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

/// Builds an object snapshot from `(field, value)` pairs
pub fn object(
    object_id: ObjectId,
    version: u32,
    class: &str,
    fields: &[(&str, Value)],
) -> BootstrapObject {
    BootstrapObject {
        object_id,
        version,
        class: class.to_string(),
        fields: fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Waits until the session reports `expected`, panicking after two seconds
pub async fn wait_for_state(session: &Session, expected: SessionState) {
    let mut changes = session.state_changes();
    tokio::time::timeout(
        Duration::from_secs(2),
        changes.wait_for(|state| *state == expected),
    )
    .await
    .unwrap_or_else(|_| panic!("session never reached {:?}", expected))
    .expect("session state channel closed");
}
