use chrono::{DateTime, Utc};

use crate::domain::{ChatKind, ChatRef, MessageId, MessageRef, SenderId};

/// A chat message as delivered by the messaging client.
///
/// Created once per event and never mutated; dropped after handling.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub chat: ChatRef,
    pub sender: SenderId,
    pub body: String,
    pub chat_kind: ChatKind,
    /// Sent by the account the bridge runs as.
    pub from_me: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

impl IncomingMessage {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat: self.chat.clone(),
            message_id: self.id.clone(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.chat_kind == ChatKind::Group
    }
}

/// Event kinds the messaging client can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Qr,
    Ready,
    Authenticated,
    AuthFailure,
    Disconnected,
    LoadingScreen,
    StateChanged,
    Message,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Qr,
        EventKind::Ready,
        EventKind::Authenticated,
        EventKind::AuthFailure,
        EventKind::Disconnected,
        EventKind::LoadingScreen,
        EventKind::StateChanged,
        EventKind::Message,
    ];
}

/// Typed event stream item.
///
/// Only `Message` drives business logic; the rest are session lifecycle
/// diagnostics owned by the client's own state machine.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    Qr { code: String },
    Ready,
    Authenticated,
    AuthFailure { message: String },
    Disconnected { reason: String },
    LoadingScreen { percent: u8, message: String },
    StateChanged { state: String },
    Message(IncomingMessage),
}

impl ClientEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::Qr { .. } => EventKind::Qr,
            ClientEvent::Ready => EventKind::Ready,
            ClientEvent::Authenticated => EventKind::Authenticated,
            ClientEvent::AuthFailure { .. } => EventKind::AuthFailure,
            ClientEvent::Disconnected { .. } => EventKind::Disconnected,
            ClientEvent::LoadingScreen { .. } => EventKind::LoadingScreen,
            ClientEvent::StateChanged { .. } => EventKind::StateChanged,
            ClientEvent::Message(_) => EventKind::Message,
        }
    }
}
