use mirror_shared::{ObjectId, SubscriberHandle};

/// Returned by `Session::subscribe`; pass it back to `Session::unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    object_id: ObjectId,
    subscriber: SubscriberHandle,
}

impl SubscriptionHandle {
    pub(crate) fn new(object_id: ObjectId, subscriber: SubscriberHandle) -> Self {
        Self {
            object_id,
            subscriber,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub(crate) fn subscriber(&self) -> SubscriberHandle {
        self.subscriber
    }
}
