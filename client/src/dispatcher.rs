use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use log::{trace, warn};
use tokio::{sync::mpsc, task::JoinHandle};

use mirror_shared::{ObjectId, Value};

use crate::{NotificationListener, ObjectListener, SessionEvent};

enum Job {
    Object {
        listeners: Vec<Arc<dyn ObjectListener>>,
        event: Arc<SessionEvent>,
    },
    Notification {
        listeners: Vec<Arc<dyn NotificationListener>>,
        name: Arc<str>,
        payload: Arc<Value>,
    },
}

/// Fans events out to listeners off the socket task.
///
/// Each lane is a queue drained by its own task. All events for one object
/// travel the same lane, so they arrive in the order they were produced;
/// different objects may be delivered concurrently.
pub(crate) struct Dispatcher {
    lanes: Vec<mpsc::UnboundedSender<Job>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    pub(crate) fn new(lane_count: usize) -> Self {
        let lane_count = lane_count.max(1);
        let mut lanes = Vec::with_capacity(lane_count);
        let mut tasks = Vec::with_capacity(lane_count);
        for lane in 0..lane_count {
            let (sender, receiver) = mpsc::unbounded_channel();
            lanes.push(sender);
            tasks.push(tokio::spawn(run_lane(lane, receiver)));
        }
        Self { lanes, tasks }
    }

    pub(crate) fn dispatch(
        &self,
        object_id: ObjectId,
        listeners: Vec<Arc<dyn ObjectListener>>,
        event: SessionEvent,
    ) {
        if listeners.is_empty() {
            return;
        }
        let lane = object_id as usize % self.lanes.len();
        self.send(
            lane,
            Job::Object {
                listeners,
                event: Arc::new(event),
            },
        );
    }

    /// Notifications with the same name share a lane and stay in order
    pub(crate) fn notify(
        &self,
        listeners: Vec<Arc<dyn NotificationListener>>,
        name: String,
        payload: Value,
    ) {
        if listeners.is_empty() {
            return;
        }
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        let lane = (hasher.finish() % self.lanes.len() as u64) as usize;
        self.send(
            lane,
            Job::Notification {
                listeners,
                name: Arc::from(name),
                payload: Arc::new(payload),
            },
        );
    }

    /// Stops accepting work and waits until every queued job has been delivered.
    ///
    /// Lanes still busy after `deadline` are aborted and their queued events
    /// dropped. Returns whether every lane drained in time.
    pub(crate) async fn shutdown(self, deadline: Duration) -> bool {
        let Self { lanes, mut tasks } = self;
        drop(lanes);
        let drained = tokio::time::timeout(deadline, async {
            for task in tasks.iter_mut() {
                if let Err(error) = task.await {
                    warn!("dispatcher lane ended abnormally: {}", error);
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                "dispatcher lanes did not drain within {:?}, dropping queued events",
                deadline
            );
            for task in &tasks {
                task.abort();
            }
            return false;
        }
        true
    }

    fn send(&self, lane: usize, job: Job) {
        if self.lanes[lane].send(job).is_err() {
            warn!("dispatcher lane {} is closed, dropping event", lane);
        }
    }
}

async fn run_lane(lane: usize, mut receiver: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = receiver.recv().await {
        match job {
            Job::Object { listeners, event } => {
                trace!("lane {} delivering event for object {}", lane, event.object_id());
                for listener in listeners {
                    let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_event(&event)));
                    report(lane, outcome);
                }
            }
            Job::Notification {
                listeners,
                name,
                payload,
            } => {
                trace!("lane {} delivering notification '{}'", lane, name);
                for listener in listeners {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        listener.on_notification(&name, &payload)
                    }));
                    report(lane, outcome);
                }
            }
        }
    }
}

fn report(lane: usize, outcome: std::thread::Result<Result<(), crate::ListenerError>>) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(error)) => warn!("listener on lane {} returned an error: {}", lane, error),
        Err(_) => warn!("listener on lane {} panicked, skipping it", lane),
    }
}
