use std::sync::Arc;

use tokio::sync::oneshot;

use mirror_shared::{CodecError, ObjectId, RequestId, ServiceId, Value};

use crate::{NotificationListener, ObjectListener, SessionError, SubscriptionHandle};

/// Requests from session handles (and the writer task) to the owner task
pub(crate) enum Command {
    Invoke {
        request_id: RequestId,
        service: ServiceId,
        args: Vec<Value>,
        responder: oneshot::Sender<Result<Value, SessionError>>,
    },
    /// The caller stopped waiting for this request
    Forget { request_id: RequestId },
    Subscribe {
        object_id: ObjectId,
        listener: Arc<dyn ObjectListener>,
        responder: oneshot::Sender<Result<SubscriptionHandle, SessionError>>,
    },
    /// Some caller stopped waiting for a subscription to this object
    AbandonSubscribe { object_id: ObjectId },
    Unsubscribe {
        handle: SubscriptionHandle,
        responder: oneshot::Sender<()>,
    },
    AddNotificationListener {
        listener: Arc<dyn NotificationListener>,
    },
    /// The writer could not encode a message; the stream is still usable
    Rejected {
        request_id: Option<RequestId>,
        error: CodecError,
    },
    /// The writer lost the transport
    TransportFailed { error: SessionError },
    Close,
}
