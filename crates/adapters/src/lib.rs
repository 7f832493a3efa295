//! HTTP adapter for the edit server
//!
//! This crate exposes the edit pipeline over HTTP: every POST body is handed
//! to the configured editor and the edited content comes back as the
//! response. Other methods answer with a short status message.

pub mod edit_handler;
pub mod http_server;

pub use edit_handler::{handle_edit, EditState};
pub use http_server::{HttpServer, ServerConfig};
