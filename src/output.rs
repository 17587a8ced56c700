use crate::model::{RawResponse, Target};
use crate::util::truncate_chars;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const USAGE: &str = "Usage: /<IP>:<PORT>  e.g. /149.129.250.8:443\n";

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, Serialize)]
pub struct Success {
    pub ok: bool,
    pub target: String,
    pub result: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub ok: bool,
    pub target: String,
    pub status_line: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub ok: bool,
    pub error: String,
}

/// Exactly one of these is produced per request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success(Success),
    Diagnostic(Diagnostic),
    Failure(Failure),
}

impl Envelope {
    /// JSON bodies become [`Envelope::Success`]; anything else is dumped as a
    /// [`Envelope::Diagnostic`] with the body cut to `max_body_chars`.
    pub fn from_response(target: &Target, raw: RawResponse, max_body_chars: usize) -> Self {
        match serde_json::from_str::<Value>(&raw.body) {
            Ok(result) => Envelope::Success(Success {
                ok: true,
                target: target.to_string(),
                result,
            }),
            Err(_) => Envelope::Diagnostic(Diagnostic {
                ok: false,
                target: target.to_string(),
                body: truncate_chars(&raw.body, max_body_chars).to_string(),
                status_line: raw.status_line,
                headers: raw.headers,
            }),
        }
    }

    pub fn failure(err: impl fmt::Display) -> Self {
        Envelope::Failure(Failure {
            ok: false,
            error: err.to_string(),
        })
    }

    pub fn status(&self) -> u16 {
        match self {
            Envelope::Success(_) => 200,
            Envelope::Diagnostic(_) => 502,
            Envelope::Failure(_) => 400,
        }
    }

    /// Success is compact; the other shapes are pretty-printed for humans.
    pub fn render(&self) -> String {
        let rendered = match self {
            Envelope::Success(_) => serde_json::to_string(self),
            _ => serde_json::to_string_pretty(self),
        };
        rendered.unwrap_or_else(|err| {
            format!("{{\"ok\":false,\"error\":\"failed to encode response: {err}\"}}")
        })
    }

    pub fn into_reply(self) -> Reply {
        Reply {
            status: self.status(),
            content_type: JSON,
            body: self.render(),
        }
    }
}

/// A fully rendered HTTP answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn usage() -> Self {
        Reply {
            status: 200,
            content_type: TEXT,
            body: USAGE.to_string(),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            502 => "Bad Gateway",
            _ => "",
        }
    }
}
