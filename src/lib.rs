//! CabalBot - an IRC command bot.
//!
//! A [`session::Session`] owns one IRC connection. Inbound messages are
//! classified ([`classify`]), parsed and dispatched ([`dispatch`]) under the
//! [`permission`] checks, and answered through the [`responder`]. The
//! [`app`] module wires the command bot and the optional passive
//! [`watcher`] together.

pub mod app;
pub mod bot;
pub mod centralauth;
pub mod channels;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod journal;
pub mod permission;
pub mod responder;
pub mod session;
pub mod settings;
pub mod watcher;
