//! Wire types shared between the poll server and its clients.
//!
//! Field names follow the JSON the frontend already speaks, so several of them
//! are not snake_case on the wire.

pub mod message;

pub use message::{
    Credentials, HasVotedResponse, LoginResponse, MessageResponse, Poll, PollDetailsResponse,
    Vote,
};

/// Cookie holding the signed session token.
pub const SESSION_COOKIE: &str = "jwt_token";

/// Cookie holding the double-submit CSRF token. Readable by client script.
pub const CSRF_COOKIE: &str = "csrf_token";

/// Header through which client script echoes the CSRF cookie back.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Returns the protocol crate version string.
pub fn protocol_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
