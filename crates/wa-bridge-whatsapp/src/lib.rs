//! WhatsApp adapter (WhatsApp Web sidecar over WebSocket).
//!
//! The sidecar owns the WhatsApp Web session (QR pairing, session persistence,
//! chat resolution). This crate implements the `wa-bridge-core` MessagingPort
//! on top of its JSON frame protocol.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;
use url::Url;
use uuid::Uuid;

pub mod protocol;
pub mod qr;
pub mod router;
mod sidecar;

use wa_bridge_core::{
    domain::{ChatRef, MessageRef},
    messaging::{
        port::{EventStream, MessagingPort},
        types::EventKind,
    },
    Result,
};

use crate::{
    protocol::{event_name, GatewayCommand},
    sidecar::Shared,
};

#[derive(Clone)]
pub struct WhatsAppMessenger {
    shared: Arc<Shared>,
}

impl WhatsAppMessenger {
    /// Connect to the sidecar at `url` (`ws://`). Sends fail if the sidecar
    /// does not confirm them within `send_timeout`.
    pub async fn connect(url: &Url, print_qr: bool, send_timeout: Duration) -> Result<Self> {
        let shared = sidecar::connect(url.as_str(), print_qr, send_timeout).await?;
        Ok(Self { shared })
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    fn request_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[async_trait]
impl MessagingPort for WhatsAppMessenger {
    async fn subscribe(&self, kinds: &[EventKind]) -> Result<EventStream> {
        let stream = self.shared.subscribe(kinds)?;
        self.shared.send_command(GatewayCommand::Subscribe {
            events: kinds.iter().copied().map(event_name).collect(),
        })?;
        debug!(?kinds, "subscribed to sidecar events");
        Ok(stream)
    }

    async fn send_reply(&self, msg: &MessageRef, text: &str) -> Result<()> {
        let request_id = Self::request_id();
        let cmd = GatewayCommand::Reply {
            request_id: request_id.clone(),
            chat_id: msg.chat.0.clone(),
            message_id: msg.message_id.0.clone(),
            text: text.to_string(),
        };
        self.shared.request(request_id, cmd).await
    }

    async fn send_message(&self, chat: &ChatRef, text: &str) -> Result<()> {
        let request_id = Self::request_id();
        let cmd = GatewayCommand::SendMessage {
            request_id: request_id.clone(),
            chat_id: chat.0.clone(),
            text: text.to_string(),
        };
        self.shared.request(request_id, cmd).await
    }
}
