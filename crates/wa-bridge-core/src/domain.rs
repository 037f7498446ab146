use std::fmt;

/// WhatsApp sender address (e.g. `5511999999999@c.us`).
///
/// Opaque routing string; authorization compares it byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SenderId(pub String);

impl SenderId {
    /// The part before `@`, which for direct chats is the phone number.
    pub fn user_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat address a reply is routed to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChatRef(pub String);

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-assigned message id (serialized WhatsApp message key).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

/// A stable reference to a received message, used for quoted replies.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat: ChatRef,
    pub message_id: MessageId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatKind {
    Direct,
    Group,
}
