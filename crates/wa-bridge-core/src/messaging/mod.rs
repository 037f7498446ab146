//! Messaging-client abstractions (WhatsApp Web today).

pub mod port;
pub mod types;
