//! Session layer for the VTube Studio public API.
//!
//! [`connect`] opens the socket and runs the two-step handshake (token
//! acquisition, then authentication); the returned [`Session`] exposes the
//! model and hotkey operations. Exchanges are strictly one request then one
//! reply, so a session must be driven by one caller at a time.

pub mod address;
pub mod config;
pub mod credential;
pub mod error;
pub mod handshake;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, PluginIdentity};
pub use credential::{Credential, CredentialStore};
pub use error::{ErrorKind, Result, VtsError};
pub use handshake::{connect, SessionState};
pub use session::Session;
pub use transport::{Transport, TransportError, WebSocketTransport};

pub use vts_wire::{Hotkey, HotkeyKind, Model, ModelCatalog, Triggers};
