use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    domain::{ChatRef, MessageRef},
    messaging::types::{ClientEvent, EventKind},
    Result,
};

/// Receiving half of a client subscription.
pub type EventStream = mpsc::UnboundedReceiver<ClientEvent>;

/// Messaging-client port.
///
/// The client itself (pairing, session persistence, chat resolution) stays a
/// black box; the bridge only subscribes to events and sends text.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Register interest in `kinds`; events arrive on the returned stream
    /// until the client disconnects.
    async fn subscribe(&self, kinds: &[EventKind]) -> Result<EventStream>;

    /// Reply to `msg`, quoting it in the same chat.
    async fn send_reply(&self, msg: &MessageRef, text: &str) -> Result<()>;

    async fn send_message(&self, chat: &ChatRef, text: &str) -> Result<()>;
}
