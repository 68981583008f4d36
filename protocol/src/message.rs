//! Request and response bodies exchanged with the poll server.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Username/password pair used by `/signup` and `/login`.
///
/// Also the row shape of the `usercreds` table, where `password` holds the
/// bcrypt hash instead of the plain text.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// A poll as stored in the `polls` table.
///
/// `created_by` is always filled in by the server from the caller's session;
/// whatever a client sends for it is overwritten.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Poll {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created_by: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Nullable text columns come back as `null`; treat that like a missing field.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single ballot as stored in the `votes` table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vote {
    pub pollid: i64,
    pub optionid: i64,
    #[serde(default)]
    pub votername: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Generic `{"message": ...}` body used for acknowledgements and errors.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body returned by a successful `/login`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub message: String,
    pub username: String,
    /// Only present when the server expects the session token in an
    /// `Authorization` header rather than a cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Body returned by `/poll-details`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PollDetailsResponse {
    pub poll: Poll,
    pub option_votes: Vec<Value>,
}

/// Body returned by `/has-voted`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HasVotedResponse {
    #[serde(rename = "hasVoted")]
    pub has_voted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosenoption: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl HasVotedResponse {
    #[must_use]
    pub fn not_voted() -> Self {
        Self {
            has_voted: false,
            chosenoption: None,
            description: None,
        }
    }

    #[must_use]
    pub fn from_vote(vote: &Vote) -> Self {
        Self {
            has_voted: true,
            chosenoption: Some(vote.optionid),
            description: vote.description.clone(),
        }
    }
}
