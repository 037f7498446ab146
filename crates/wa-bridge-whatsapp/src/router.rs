use std::sync::Arc;

use tracing::{info, warn};

use wa_bridge_core::{
    config::Config,
    listener::Listener,
    messaging::{port::MessagingPort, types::EventKind},
};
use wa_bridge_relay::HttpRelayClient;

use crate::WhatsAppMessenger;

/// Connect to the sidecar and relay messages until the client disconnects.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    info!("Starting bridge...");
    info!(relay = %cfg.relay_base_url, timeout_ms = cfg.relay_timeout.as_millis() as u64, "relay configured");
    info!(allowed_senders = cfg.allowed_senders.len(), "authorization configured");
    if cfg.allowed_senders.is_empty() {
        warn!("ALLOWED_SENDERS is empty; messages will be logged but never relayed");
    }

    let relay = Arc::new(HttpRelayClient::new(&cfg.relay_base_url, cfg.relay_timeout)?);
    let messenger =
        WhatsAppMessenger::connect(&cfg.sidecar_url, cfg.print_qr, cfg.send_timeout).await?;
    let events = messenger.subscribe(&EventKind::ALL).await?;

    let listener = Arc::new(Listener::new(
        cfg.allowed_senders.clone(),
        cfg.ack_message.clone(),
        Arc::new(messenger),
        relay,
    ));
    listener.run(events).await;

    Ok(())
}
