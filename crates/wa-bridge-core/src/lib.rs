//! Core domain + application logic for the WhatsApp relay bridge.
//!
//! This crate is intentionally framework-agnostic. The WhatsApp client and the
//! remote relay API live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod listener;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod security;

pub use errors::{Error, Result};
