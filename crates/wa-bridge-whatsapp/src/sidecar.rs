//! WebSocket connection to the WhatsApp Web sidecar.
//!
//! A writer task drains queued commands onto the socket; a reader task parses
//! frames, settles pending sends and fans client events out to subscribers.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use wa_bridge_core::{
    errors::Error,
    messaging::{
        port::EventStream,
        types::{ClientEvent, EventKind},
    },
    Result,
};

use crate::{
    protocol::{GatewayCommand, SidecarEvent},
    qr,
};

type Waiter = oneshot::Sender<Result<()>>;

struct Subscriber {
    kinds: HashSet<EventKind>,
    tx: mpsc::UnboundedSender<ClientEvent>,
}

#[derive(Default)]
struct Pending {
    closed: bool,
    waiters: HashMap<String, Waiter>,
}

/// State shared by the messenger handle and the I/O tasks.
pub(crate) struct Shared {
    commands: mpsc::UnboundedSender<GatewayCommand>,
    pending: Mutex<Pending>,
    subscribers: Mutex<Vec<Subscriber>>,
    print_qr: bool,
    send_timeout: Duration,
}

impl Shared {
    pub(crate) fn is_closed(&self) -> bool {
        lock(&self.pending).closed
    }

    fn new(
        commands: mpsc::UnboundedSender<GatewayCommand>,
        print_qr: bool,
        send_timeout: Duration,
    ) -> Self {
        Self {
            commands,
            pending: Mutex::new(Pending::default()),
            subscribers: Mutex::new(Vec::new()),
            print_qr,
            send_timeout,
        }
    }

    /// Queue `cmd` and wait up to `send_timeout` for the sidecar's
    /// `send_result` for `request_id`.
    pub(crate) async fn request(&self, request_id: String, cmd: GatewayCommand) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock(&self.pending);
            if pending.closed {
                return Err(Error::Messaging("sidecar connection closed".to_string()));
            }
            pending.waiters.insert(request_id.clone(), tx);
        }

        if self.commands.send(cmd).is_err() {
            lock(&self.pending).waiters.remove(&request_id);
            return Err(Error::Messaging("sidecar connection closed".to_string()));
        }

        match tokio::time::timeout(self.send_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::Messaging(
                "sidecar connection closed before send completed".to_string(),
            )),
            Err(_) => {
                lock(&self.pending).waiters.remove(&request_id);
                Err(Error::Messaging(format!(
                    "no send result from sidecar within {}ms",
                    self.send_timeout.as_millis()
                )))
            }
        }
    }

    pub(crate) fn subscribe(&self, kinds: &[EventKind]) -> Result<EventStream> {
        if self.is_closed() {
            return Err(Error::Messaging("sidecar connection closed".to_string()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(Subscriber {
            kinds: kinds.iter().copied().collect(),
            tx,
        });
        Ok(rx)
    }

    pub(crate) fn send_command(&self, cmd: GatewayCommand) -> Result<()> {
        self.commands
            .send(cmd)
            .map_err(|_| Error::Messaging("sidecar connection closed".to_string()))
    }

    fn publish(&self, event: ClientEvent) {
        let kind = event.kind();
        let mut subs = lock(&self.subscribers);
        subs.retain(|s| {
            if !s.kinds.contains(&kind) {
                return true;
            }
            s.tx.send(event.clone()).is_ok()
        });
    }

    fn settle(&self, request_id: &str, outcome: Result<()>) {
        let waiter = lock(&self.pending).waiters.remove(request_id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => debug!(request_id, "send result for unknown request"),
        }
    }

    /// Process one text frame; returns the kind of client event published.
    fn handle_frame(&self, text: &str) -> Option<EventKind> {
        let event = match serde_json::from_str::<SidecarEvent>(text) {
            Ok(ev) => ev,
            Err(e) => {
                warn!(error = %e, "ignoring malformed sidecar frame");
                return None;
            }
        };

        match event {
            SidecarEvent::SendResult {
                request_id,
                success,
                error,
            } => {
                let outcome = if success {
                    Ok(())
                } else {
                    Err(Error::Messaging(
                        error.unwrap_or_else(|| "send failed".to_string()),
                    ))
                };
                self.settle(&request_id, outcome);
                None
            }
            SidecarEvent::Unknown => {
                debug!("ignoring unknown sidecar frame");
                None
            }
            other => {
                if let SidecarEvent::Qr { qr: code } = &other {
                    if self.print_qr {
                        print_qr(code);
                    }
                }
                let ev = other.into_client_event()?;
                let kind = ev.kind();
                self.publish(ev);
                Some(kind)
            }
        }
    }

    /// Fail pending sends, tell subscribers the client is gone and end their
    /// streams.
    fn shutdown(&self, reason: &str, saw_disconnect: bool) {
        let waiters = {
            let mut pending = lock(&self.pending);
            pending.closed = true;
            std::mem::take(&mut pending.waiters)
        };
        for (_, tx) in waiters {
            let _ = tx.send(Err(Error::Messaging(format!(
                "sidecar connection closed: {reason}"
            ))));
        }

        if !saw_disconnect {
            self.publish(ClientEvent::Disconnected {
                reason: reason.to_string(),
            });
        }
        lock(&self.subscribers).clear();
    }
}

/// Connect to the sidecar and start the I/O tasks.
pub(crate) async fn connect(
    url: &str,
    print_qr: bool,
    send_timeout: Duration,
) -> Result<Arc<Shared>> {
    let (ws, _resp) = connect_async(url)
        .await
        .map_err(|e| Error::Messaging(format!("failed to connect to sidecar at {url}: {e}")))?;
    info!(url, "connected to WhatsApp sidecar");

    let (mut sink, mut stream) = ws.split();
    let (commands, mut command_rx) = mpsc::unbounded_channel::<GatewayCommand>();

    let shared = Arc::new(Shared::new(commands, print_qr, send_timeout));

    tokio::spawn(async move {
        while let Some(cmd) = command_rx.recv().await {
            let json = match serde_json::to_string(&cmd) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "failed to encode sidecar command");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(json.into())).await {
                warn!(error = %e, "sidecar write failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let reader = Arc::clone(&shared);
    tokio::spawn(async move {
        let mut saw_disconnect = false;
        let reason = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if reader.handle_frame(text.as_str()) == Some(EventKind::Disconnected) {
                        saw_disconnect = true;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| f.reason.as_str().to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "sidecar closed the connection".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("sidecar read failed: {e}"),
                None => break "sidecar connection ended".to_string(),
            }
        };
        warn!(reason = %reason, "WhatsApp sidecar connection closed");
        reader.shutdown(&reason, saw_disconnect);
    });

    Ok(shared)
}

fn print_qr(code: &str) {
    match qr::render(code) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => warn!(error = %e, "could not render QR code"),
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
