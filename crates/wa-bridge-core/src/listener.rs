//! Inbound listener: filters message events and drives the relay round-trip.
//!
//! Every message event runs as its own task with its own error boundary, so a
//! failing relay call or send never affects other events or the listener.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::{
    messaging::{
        port::{EventStream, MessagingPort},
        types::{ClientEvent, IncomingMessage},
    },
    ports::{RelayClient, RelayRequest},
    security::AllowList,
    Result,
};

/// What the listener decided to do with a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Sent by the bridge's own account.
    FromSelf,
    Group,
    /// Direct message from a sender not on the allow-list; logged only.
    Unauthorized,
    Relay,
}

pub struct Listener {
    allow: AllowList,
    ack_message: String,
    messenger: Arc<dyn MessagingPort>,
    relay: Arc<dyn RelayClient>,
}

impl Listener {
    pub fn new(
        allow: AllowList,
        ack_message: impl Into<String>,
        messenger: Arc<dyn MessagingPort>,
        relay: Arc<dyn RelayClient>,
    ) -> Self {
        Self {
            allow,
            ack_message: ack_message.into(),
            messenger,
            relay,
        }
    }

    pub fn classify(&self, msg: &IncomingMessage) -> Disposition {
        if msg.from_me {
            return Disposition::FromSelf;
        }
        if msg.is_group() {
            return Disposition::Group;
        }
        if self.allow.is_authorized(&msg.sender) {
            Disposition::Relay
        } else {
            Disposition::Unauthorized
        }
    }

    /// Handle one message event.
    ///
    /// For an authorized direct message: quoted ack, relay call, result sent to
    /// the chat, strictly in that order. A failed ack is logged and skipped; a
    /// failed relay call or result send is returned to the caller.
    pub async fn handle_message(&self, msg: IncomingMessage) -> Result<Disposition> {
        let disposition = self.classify(&msg);
        match disposition {
            Disposition::FromSelf | Disposition::Group => {
                debug!(chat = %msg.chat, ?disposition, "ignoring message");
                return Ok(disposition);
            }
            Disposition::Unauthorized | Disposition::Relay => {}
        }

        info!("{}:{}", msg.sender.user_part(), msg.body);

        if disposition == Disposition::Unauthorized {
            debug!(sender = %msg.sender, "sender not on allow-list; not relaying");
            return Ok(disposition);
        }

        if let Err(e) = self
            .messenger
            .send_reply(&msg.message_ref(), &self.ack_message)
            .await
        {
            error!(chat = %msg.chat, error = %e, "failed to send acknowledgment");
        }

        let resp = self.relay.relay(RelayRequest::new(msg.body.clone())).await?;

        self.messenger.send_message(&msg.chat, resp.text()).await?;
        info!(chat = %msg.chat, "relay result delivered");

        Ok(disposition)
    }

    /// Consume the event stream until the client disconnects.
    ///
    /// Returns once the stream has ended and every in-flight handler has
    /// finished.
    pub async fn run(self: Arc<Self>, mut events: EventStream) {
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(ClientEvent::Message(msg)) => {
                        let this = Arc::clone(&self);
                        tasks.spawn(async move { this.on_message(msg).await });
                    }
                    Some(other) => log_lifecycle(&other),
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => log_join(joined),
            }
        }

        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "event stream closed; waiting for handlers");
        }
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }
        info!("listener stopped");
    }

    async fn on_message(&self, msg: IncomingMessage) {
        let id = msg.id.0.clone();
        let sender = msg.sender.clone();
        if let Err(e) = self.handle_message(msg).await {
            error!(message_id = %id, sender = %sender, error = %e, "error processing message");
        }
    }
}

fn log_lifecycle(event: &ClientEvent) {
    match event {
        ClientEvent::Qr { .. } => info!("QR code received; scan it with WhatsApp to pair"),
        ClientEvent::Ready => info!("client is ready"),
        ClientEvent::Authenticated => info!("client is authenticated"),
        ClientEvent::AuthFailure { message } => warn!(reason = %message, "authentication failed"),
        ClientEvent::Disconnected { reason } => warn!(reason = %reason, "client was logged out"),
        ClientEvent::LoadingScreen { percent, message } => {
            info!("loading screen {percent}% {message}")
        }
        ClientEvent::StateChanged { state } => info!(state = %state, "client state changed"),
        ClientEvent::Message(_) => {}
    }
}

fn log_join(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "message handler aborted");
    }
}
