//! # threadline-mime
//!
//! Lenient MIME parsing for inbound mail.
//!
//! ## Features
//!
//! - **Message parsing**: header block, folded headers, nested multipart trees
//! - **Decoding**: Base64, Quoted-Printable, RFC 2047 encoded words, common charsets
//! - **Addresses**: `From`/`To`/`Cc` address lists with display names
//! - **Attachments**: filename, content type and decoded bytes for every attachment leaf
//!
//! Parsing is forgiving: a part with a broken transfer encoding keeps its raw
//! bytes instead of failing the whole message. Only structurally unusable
//! input (no header block, multipart without a boundary) is rejected.
//!
//! ## Quick Start
//!
//! ```ignore
//! use threadline_mime::Message;
//!
//! let raw = b"From: Alice <alice@example.com>\r\n\
//!             To: support@example.com\r\n\
//!             Subject: =?utf-8?B?SMOpbGxv?=\r\n\
//!             \r\n\
//!             Hello, World!";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.subject().as_deref(), Some("Héllo"));
//! assert_eq!(message.from()[0].email, "alice@example.com");
//! assert_eq!(message.text_body()?.as_deref(), Some("Hello, World!"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use address::{Address, parse_address_list};
pub use content_type::{ContentDisposition, ContentType, DispositionKind};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Attachment, Message, Part, TransferEncoding};
