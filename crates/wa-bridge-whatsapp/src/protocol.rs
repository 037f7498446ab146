//! JSON frames exchanged with the WhatsApp Web sidecar.
//!
//! Every frame is a JSON object discriminated by `"type"`.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use wa_bridge_core::{
    domain::{ChatKind, ChatRef, MessageId, SenderId},
    messaging::types::{ClientEvent, EventKind, IncomingMessage},
};

/// Frames sent by the sidecar.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarEvent {
    Qr {
        qr: String,
    },
    Ready,
    Authenticated,
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    LoadingScreen {
        #[serde(default)]
        percent: f64,
        #[serde(default)]
        message: String,
    },
    ChangeState {
        state: String,
    },
    Message(InboundMessage),
    SendResult {
        request_id: String,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    /// Defaults to `from` (direct chats).
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub is_group: bool,
    /// Unix seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl From<InboundMessage> for IncomingMessage {
    fn from(m: InboundMessage) -> Self {
        let chat = m.chat_id.unwrap_or_else(|| m.from.clone());
        IncomingMessage {
            id: MessageId(m.id),
            chat: ChatRef(chat),
            sender: SenderId(m.from),
            body: m.body,
            chat_kind: if m.is_group {
                ChatKind::Group
            } else {
                ChatKind::Direct
            },
            from_me: m.from_me,
            timestamp: m.timestamp.and_then(|s| DateTime::from_timestamp(s, 0)),
        }
    }
}

impl SidecarEvent {
    /// Map to the client event model. Send acks and unknown frames have no
    /// counterpart.
    pub fn into_client_event(self) -> Option<ClientEvent> {
        let ev = match self {
            SidecarEvent::Qr { qr } => ClientEvent::Qr { code: qr },
            SidecarEvent::Ready => ClientEvent::Ready,
            SidecarEvent::Authenticated => ClientEvent::Authenticated,
            SidecarEvent::AuthFailure { message } => ClientEvent::AuthFailure { message },
            SidecarEvent::Disconnected { reason } => ClientEvent::Disconnected { reason },
            SidecarEvent::LoadingScreen { percent, message } => ClientEvent::LoadingScreen {
                percent: percent.clamp(0.0, 100.0) as u8,
                message,
            },
            SidecarEvent::ChangeState { state } => ClientEvent::StateChanged { state },
            SidecarEvent::Message(m) => ClientEvent::Message(m.into()),
            SidecarEvent::SendResult { .. } | SidecarEvent::Unknown => return None,
        };
        Some(ev)
    }
}

/// Frames sent to the sidecar.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayCommand {
    Subscribe {
        events: Vec<&'static str>,
    },
    Reply {
        request_id: String,
        chat_id: String,
        message_id: String,
        text: String,
    },
    SendMessage {
        request_id: String,
        chat_id: String,
        text: String,
    },
}

/// Wire name of an event kind.
pub fn event_name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Qr => "qr",
        EventKind::Ready => "ready",
        EventKind::Authenticated => "authenticated",
        EventKind::AuthFailure => "auth_failure",
        EventKind::Disconnected => "disconnected",
        EventKind::LoadingScreen => "loading_screen",
        EventKind::StateChanged => "change_state",
        EventKind::Message => "message",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> SidecarEvent {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn parses_direct_message() {
        let ev = parse(json!({
            "type": "message",
            "id": "false_5511999999999@c.us_ABC",
            "from": "5511999999999@c.us",
            "body": "Hello",
            "from_me": false,
            "is_group": false,
            "timestamp": 1_700_000_000
        }));

        let Some(ClientEvent::Message(msg)) = ev.into_client_event() else {
            panic!("expected message event");
        };
        assert_eq!(msg.sender.0, "5511999999999@c.us");
        assert_eq!(msg.chat.0, "5511999999999@c.us");
        assert_eq!(msg.body, "Hello");
        assert_eq!(msg.chat_kind, ChatKind::Direct);
        assert!(!msg.from_me);
        assert_eq!(msg.timestamp.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn parses_group_message_with_explicit_chat() {
        let ev = parse(json!({
            "type": "message",
            "id": "m2",
            "from": "5511999999999@c.us",
            "chat_id": "120363000000000000@g.us",
            "is_group": true
        }));

        let Some(ClientEvent::Message(msg)) = ev.into_client_event() else {
            panic!("expected message event");
        };
        assert_eq!(msg.chat.0, "120363000000000000@g.us");
        assert!(msg.is_group());
        assert_eq!(msg.body, "");
        assert_eq!(msg.timestamp, None);
    }

    #[test]
    fn parses_lifecycle_frames() {
        assert_eq!(
            parse(json!({"type": "qr", "qr": "2@abc"})),
            SidecarEvent::Qr {
                qr: "2@abc".to_string()
            }
        );
        assert_eq!(parse(json!({"type": "ready"})), SidecarEvent::Ready);
        assert_eq!(
            parse(json!({"type": "auth_failure"})),
            SidecarEvent::AuthFailure {
                message: String::new()
            }
        );

        let ev = parse(json!({"type": "loading_screen", "percent": 142.0, "message": "WhatsApp"}))
            .into_client_event();
        assert!(matches!(
            ev,
            Some(ClientEvent::LoadingScreen { percent: 100, .. })
        ));

        let ev = parse(json!({"type": "change_state", "state": "CONNECTED"})).into_client_event();
        assert!(matches!(ev, Some(ClientEvent::StateChanged { state }) if state == "CONNECTED"));
    }

    #[test]
    fn send_results_and_unknown_frames_are_not_client_events() {
        let ack = parse(json!({"type": "send_result", "request_id": "r1", "success": true}));
        assert_eq!(
            ack,
            SidecarEvent::SendResult {
                request_id: "r1".to_string(),
                success: true,
                error: None,
            }
        );
        assert!(ack.into_client_event().is_none());

        let unknown = parse(json!({"type": "call", "from": "x"}));
        assert_eq!(unknown, SidecarEvent::Unknown);
        assert!(unknown.into_client_event().is_none());
    }

    #[test]
    fn malformed_message_frame_is_rejected() {
        let res = serde_json::from_value::<SidecarEvent>(json!({"type": "message", "body": "x"}));
        assert!(res.is_err());
    }

    #[test]
    fn commands_serialize_with_type_tag() {
        let v = serde_json::to_value(GatewayCommand::Reply {
            request_id: "r1".to_string(),
            chat_id: "c".to_string(),
            message_id: "m".to_string(),
            text: "processing".to_string(),
        })
        .unwrap();
        assert_eq!(
            v,
            json!({"type": "reply", "request_id": "r1", "chat_id": "c", "message_id": "m", "text": "processing"})
        );

        let v = serde_json::to_value(GatewayCommand::Subscribe {
            events: EventKind::ALL.iter().copied().map(event_name).collect(),
        })
        .unwrap();
        assert_eq!(v["type"], "subscribe");
        assert_eq!(v["events"].as_array().map(|a| a.len()), Some(8));
        assert_eq!(v["events"][7], "message");
    }
}
