//! Classification of a single service response.
//!
//! | status              | body parses | outcome           | message              |
//! |---------------------|-------------|-------------------|----------------------|
//! | 2xx                 | yes         | `Success`         | none                 |
//! | 300-599             | yes         | `ServiceReported` | none                 |
//! | 300-599             | no          | `Malformed`       | extracted or generic |
//! | transport failure   | -           | `Transport`       | fixed                |
//! | internal failure    | -           | `Internal`        | fixed                |
//! | anything else       | -           | `Malformed`       | generic              |
//!
//! A message is present exactly when the orchestrator has to write the error
//! view itself.
use crate::client::StatusPrimitive;
use regex::Regex;
use serde::Serialize;

pub const TRANSPORT_MESSAGE: &str = "transport error: service could not be reached";
pub const INTERNAL_MESSAGE: &str = "unspecified pipeline error";
pub const GENERIC_MESSAGE: &str = "service returned an invalid response";

/// How much of a fault page is scanned for an error message.
const FAULT_SCAN_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    ServiceReported,
    Transport,
    Malformed,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    pub message: Option<String>,
}

impl Classification {
    fn new(outcome: Outcome, message: Option<String>) -> Self {
        Self { outcome, message }
    }

    pub fn is_error(&self) -> bool {
        self.outcome != Outcome::Success
    }
}

pub fn classify(status: StatusPrimitive, parses: bool, body: &str) -> Classification {
    match status {
        StatusPrimitive::Http(code) if (200..300).contains(&code) && parses => {
            Classification::new(Outcome::Success, None)
        }
        StatusPrimitive::Http(code) if (300..600).contains(&code) && parses => {
            Classification::new(Outcome::ServiceReported, None)
        }
        StatusPrimitive::Http(code) if (300..600).contains(&code) => {
            let message =
                extract_error_message(body).unwrap_or_else(|| GENERIC_MESSAGE.to_string());
            Classification::new(Outcome::Malformed, Some(message))
        }
        StatusPrimitive::Http(_) => {
            Classification::new(Outcome::Malformed, Some(GENERIC_MESSAGE.to_string()))
        }
        StatusPrimitive::TransportFailure => {
            Classification::new(Outcome::Transport, Some(TRANSPORT_MESSAGE.to_string()))
        }
        StatusPrimitive::InternalFailure => {
            Classification::new(Outcome::Internal, Some(INTERNAL_MESSAGE.to_string()))
        }
    }
}

/// Best-effort message from a markup fault page such as a framework's debug
/// traceback: the first `...Error` word in the head of the page followed by a
/// quoted token on the same line, e.g. `KeyError: 'text'`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let body = body.trim_start();
    if !body.starts_with('<') {
        return None;
    }
    let head: String = body.chars().take(FAULT_SCAN_CHARS).collect();
    let pattern = Regex::new(r#"(\w*Error)\b[^'"\n]*['"]([^'"\n]+)['"]"#).ok()?;
    let captures = pattern.captures(&head)?;
    Some(format!("{}: {}", &captures[1], &captures[2]))
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
