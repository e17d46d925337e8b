//! Transport and remote-failure taxonomy.

use reqwest::StatusCode;

/// Failures from the HTTP layer. Remote messages are carried through
/// verbatim; nothing here reinterprets what the platform said.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Config(String),

    #[error("authentication required for {username}@{hostname}: no password supplied and no persisted session")]
    AuthRequired { username: String, hostname: String },

    #[error("invalid username or password for {username}@{hostname}")]
    InvalidCredentials { username: String, hostname: String },

    #[error("unable to connect\n  {method} {url}")]
    Connect { method: String, url: String },

    #[error("connection timeout\n  {method} {url}")]
    Timeout { method: String, url: String },

    #[error("unexpected response: {status} {reason}\n  {method} {url}{body}")]
    Unexpected {
        status: u16,
        reason: String,
        method: String,
        url: String,
        /// Remote body, pre-formatted as a trailing `\n  text: ...` block.
        body: String,
    },

    #[error("unexpected payload: {0}")]
    Payload(String),
}

impl ClientError {
    pub(crate) fn unexpected(method: &str, url: &str, status: StatusCode, body: &str) -> Self {
        let body = if body.is_empty() {
            String::new()
        } else {
            format!("\n  text: {}", body.trim_end())
        };
        ClientError::Unexpected {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            method: method.to_string(),
            url: url.to_string(),
            body,
        }
    }

    pub(crate) fn from_transport(method: &str, url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout { method: method.to_string(), url: url.to_string() }
        } else if err.is_connect() {
            ClientError::Connect { method: method.to_string(), url: url.to_string() }
        } else {
            ClientError::Payload(err.to_string())
        }
    }

    /// HTTP status carried by this error, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unexpected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_keeps_the_remote_message() {
        let err = ClientError::unexpected(
            "POST",
            "https://h/api/v2/projects",
            StatusCode::UNPROCESSABLE_ENTITY,
            "name already in use",
        );
        let msg = err.to_string();
        assert!(msg.contains("422"));
        assert!(msg.contains("POST https://h/api/v2/projects"));
        assert!(msg.contains("name already in use"));
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn empty_bodies_add_no_text_block() {
        let err = ClientError::unexpected("GET", "https://h/x", StatusCode::NOT_FOUND, "");
        assert!(!err.to_string().contains("text:"));
    }
}
