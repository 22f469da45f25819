use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Comment not found {0}")]
    CommentNotFound(Uuid),

    #[error("Course or module not found {0}")]
    ScopeNotFound(Uuid),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::CommentNotFound(_) => StatusCode::NOT_FOUND,
            Error::ScopeNotFound(_) => StatusCode::NOT_FOUND,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::CommentNotFound(c) => json!({
                "message": "comment not found",
                "type": "comment-not-found",
                "comment": c,
            }),
            Error::ScopeNotFound(s) => json!({
                "message": "course or module not found",
                "type": "scope-not-found",
                "scope": s,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let get_uuid = |field: &str| {
            data.get(field)
                .and_then(|u| u.as_str())
                .and_then(|u| Uuid::from_str(u).ok())
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "permission-denied" => Error::PermissionDenied,
                "comment-not-found" => Error::CommentNotFound(get_uuid("comment").ok_or_else(
                    || anyhow!("error is a missing-comment error without a proper comment id"),
                )?),
                "scope-not-found" => Error::ScopeNotFound(get_uuid("scope").ok_or_else(|| {
                    anyhow!("error is a missing-scope error without a proper scope id")
                })?),
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_round_trip_through_json() {
        let examples = vec![
            Error::Unknown("boom".to_string()),
            Error::PermissionDenied,
            Error::CommentNotFound(Uuid::new_v4()),
            Error::ScopeNotFound(Uuid::new_v4()),
            Error::NullByteInString("a\0b".to_string()),
        ];
        for e in examples {
            assert_eq!(
                Error::parse(&e.contents()).expect("parsing error contents"),
                e
            );
        }
    }
}
