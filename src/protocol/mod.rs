//! Client-server session protocol.
//!
//! This module defines the wire-level contract between a Floe client and the
//! remote database: the typed request and response records exchanged over a
//! negotiated session, the transport abstraction that frames them, and the
//! service boundary the session layer dispatches against.
//!
//! # Overview
//!
//! Every remote operation is a synchronous request/response pair. The client
//! opens a session, receives server-issued session and statement
//! identifiers, and tags every subsequent request with them. Bulk row data
//! rides inside requests as pre-encoded byte payloads produced by the
//! [`buffer`](crate::buffer) codec.
//!
//! # Key Components
//!
//! - [`Request`] / [`Response`]: typed records for each remote operation.
//! - [`Status`]: (code, message) outcome attached to every reply.
//! - [`ProtocolTransport`]: framing over a bidirectional byte stream.
//! - [`RemoteService`]: the dispatch boundary the session layer calls.
//!
//! # Binary Format
//!
//! Messages are encoded with a compact framing format:
//!
//! - Records are serialized big-endian; enums carry stable discriminants.
//! - Integer width on the wire follows the negotiated [`WireEncoding`]:
//!   compact (variable-width) or verbose (fixed-width).
//! - Row payloads inside insert requests use the fixed-width layouts of the
//!   buffer codec, independent of the frame encoding.
mod request;
mod response;
mod service;
mod transport;

pub use request::{RecordPayload, Request, TabletPayload};
pub use response::{Response, SUCCESS_CODE, Status};
pub use service::RemoteService;
pub use transport::{ProtocolTransport, TransportError, WireEncoding};

/// Protocol revision spoken by this client.
///
/// The server reports its own revision at handshake; zero means the server
/// cannot speak to this client at all.
pub const PROTOCOL_VERSION: i32 = 3;
