/// Closed enumeration of the frame types on the wire.
///
/// New kinds are added by extending this enum; every dispatch over it is an
/// exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    AuthRequest,
    AuthResponse,
    Invoke,
    Response,
    Subscribe,
    Unsubscribe,
    ObjectEvent,
    Notification,
    SubscribeFailed,
    Error,
    Logoff,
    Ping,
    Pong,
}

impl MessageKind {
    pub fn to_tag(self) -> u8 {
        match self {
            MessageKind::AuthRequest => 0x01,
            MessageKind::AuthResponse => 0x02,
            MessageKind::Invoke => 0x03,
            MessageKind::Response => 0x04,
            MessageKind::Subscribe => 0x05,
            MessageKind::Unsubscribe => 0x06,
            MessageKind::ObjectEvent => 0x07,
            MessageKind::Notification => 0x08,
            MessageKind::SubscribeFailed => 0x09,
            MessageKind::Error => 0x0A,
            MessageKind::Logoff => 0x0B,
            MessageKind::Ping => 0x0C,
            MessageKind::Pong => 0x0D,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        let kind = match tag {
            0x01 => MessageKind::AuthRequest,
            0x02 => MessageKind::AuthResponse,
            0x03 => MessageKind::Invoke,
            0x04 => MessageKind::Response,
            0x05 => MessageKind::Subscribe,
            0x06 => MessageKind::Unsubscribe,
            0x07 => MessageKind::ObjectEvent,
            0x08 => MessageKind::Notification,
            0x09 => MessageKind::SubscribeFailed,
            0x0A => MessageKind::Error,
            0x0B => MessageKind::Logoff,
            0x0C => MessageKind::Ping,
            0x0D => MessageKind::Pong,
            _ => return None,
        };
        Some(kind)
    }
}
