//! # threadline-pop3
//!
//! An async POP3 client implementing RFC 1939, with the CAPA and STLS
//! extensions from RFC 2449 and RFC 2595.
//!
//! ## Features
//!
//! - **Type-state sessions**: commands that need an authenticated mailbox
//!   only exist on `Client<Transaction>`
//! - **TLS support**: implicit TLS (port 995) and STLS upgrade
//! - **Binary-safe retrieval**: RETR returns raw bytes with dot-stuffing removed
//! - **UIDL**: stable per-message identifiers when the server offers them
//!
//! ## Quick Start
//!
//! ```ignore
//! use threadline_pop3::{Client, Security, connection::open};
//!
//! #[tokio::main]
//! async fn main() -> threadline_pop3::Result<()> {
//!     let client = open("pop.example.com", 995, Security::Tls).await?;
//!     let mut client = client.login("support@example.com", "secret").await?;
//!
//!     for listing in client.list().await? {
//!         let raw = client.retr(listing.id).await?;
//!         println!("message {} has {} bytes", listing.id, raw.len());
//!         client.dele(listing.id).await?;
//!     }
//!
//!     // Deletions take effect when the session enters the UPDATE state.
//!     client.quit().await
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! ┌───────────────┐
//! │ Authorization │ ─── login() ───→ Transaction ─── quit() ───→ (UPDATE, closed)
//! └───────────────┘
//!        │
//!        └─── capa() / stls() stay in Authorization
//! ```
//!
//! ## Modules
//!
//! - [`command`]: POP3 command serialization
//! - [`connection`]: Streams and the type-state client
//! - [`parser`]: Status line and listing parsers
//! - [`types`]: Replies, capabilities and mailbox listings

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{Authorization, Client, Pop3Connection, Security, ServerInfo, Transaction};
pub use error::{Error, Result};
pub use types::{Capability, Listing, Reply, Stat, Status, UniqueId};

/// Default port for plain and STLS connections.
pub const DEFAULT_PORT: u16 = 110;

/// Default port for implicit TLS connections.
pub const DEFAULT_TLS_PORT: u16 = 995;
