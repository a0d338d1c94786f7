/// Identifies a distributed object within one session
pub type ObjectId = u32;
/// Per-object ordering token; each mutation advances it by exactly one
pub type Version = u32;
/// Correlates a client request with the server's response
pub type RequestId = u32;
/// Names a server-side service targeted by an invocation
pub type ServiceId = String;
/// Stable identifier of an immutable definition resource
pub type ResourceId = String;
