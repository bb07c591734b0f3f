//! HTTP surface: health probes and the Telegram webhook

pub mod health;
pub mod webhook;
