//! ServiceHub wire protocol and server.
//!
//! One long-lived TCP connection per client session. The whole protocol
//! uses a single length-prefixed binary framing (see [`wire`]); each
//! command's request/response exchange completes fully, including any
//! embedded file transfer, before the next command token is read.
//!
//! The server side lives in [`server`] (listener) and [`protocol`]
//! (per-connection engine); [`client`] provides a programmatic client for
//! the same protocol.

pub mod client;
pub mod protocol;
pub mod server;
pub mod wire;

pub use client::HubClient;
pub use protocol::Connection;
pub use server::HubServer;
pub use wire::ProtocolError;
