//! Externally triggered runs
//!
//! A trigger request names an action and carries a run token. The token may
//! arrive as an `X-Run-Token` header, a `token` query or form parameter, or a
//! `token` field of a JSON body. Requests whose token does not match the
//! stored secret are refused before anything runs.

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::error::SyncError;

/// Header carrying the run token
pub const TOKEN_HEADER: &str = "x-run-token";

/// Operation requested by a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FullRescan,
    Backfill,
    Incremental,
    Ping,
}

impl Action {
    /// Parse an action name; a missing or empty name means a full rescan
    pub fn parse(name: Option<&str>) -> Result<Self, SyncError> {
        let name = name.map(str::trim).unwrap_or_default();
        match name.to_ascii_lowercase().as_str() {
            "" | "fullrescan" | "fullrescanall" => Ok(Action::FullRescan),
            "backfill" => Ok(Action::Backfill),
            "incremental" => Ok(Action::Incremental),
            "ping" => Ok(Action::Ping),
            _ => Err(SyncError::UnknownAction(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::FullRescan => "fullrescan",
            Action::Backfill => "backfill",
            Action::Incremental => "incremental",
            Action::Ping => "ping",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-neutral view of an inbound trigger
#[derive(Debug, Clone, Default)]
pub struct TriggerRequest {
    pub headers: Vec<(String, String)>,
    /// Decoded query-string parameters
    pub params: HashMap<String, String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl TriggerRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
            || self.body.trim_start().starts_with('{')
    }

    /// A string field of a JSON body
    fn json_field(&self, field: &str) -> Option<String> {
        if !self.is_json() {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        value.get(field)?.as_str().map(str::to_string)
    }

    /// A field of a form-encoded body
    fn form_field(&self, field: &str) -> Option<String> {
        if self.body.is_empty() || self.is_json() {
            return None;
        }
        url::form_urlencoded::parse(self.body.as_bytes())
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.into_owned())
    }

    /// The run token, from the first place it appears
    pub fn token(&self) -> Option<String> {
        self.header(TOKEN_HEADER)
            .map(str::to_string)
            .or_else(|| self.params.get("token").cloned())
            .or_else(|| self.json_field("token"))
            .or_else(|| self.form_field("token"))
            .filter(|t| !t.is_empty())
    }

    /// The requested action name, if any
    pub fn action_name(&self) -> Option<String> {
        self.params
            .get("action")
            .cloned()
            .or_else(|| self.json_field("action"))
            .or_else(|| self.form_field("action"))
    }
}

/// JSON reply to a trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResponse {
    pub fn started(action: Action) -> Self {
        Self {
            ok: true,
            started: Some(action.to_string()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            started: None,
            error: Some(error.into()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"ok":false}"#.to_string())
    }
}

/// Executes authorized actions
pub trait ActionRunner {
    fn run(&self, action: Action) -> Result<()>;
}

/// Authorize and dispatch a trigger
///
/// An empty or missing `secret` refuses every request. Failures become
/// `{ok: false, error}` with any occurrence of the secret masked.
pub fn handle(request: &TriggerRequest, secret: Option<&str>, runner: &dyn ActionRunner) -> TriggerResponse {
    let secret = secret.unwrap_or_default();
    let authorized = !secret.is_empty() && request.token().as_deref() == Some(secret);
    if !authorized {
        warn!("Refused trigger with missing or invalid token");
        return TriggerResponse::failed(SyncError::Unauthorized.to_string());
    }

    let action = match Action::parse(request.action_name().as_deref()) {
        Ok(action) => action,
        Err(e) => return TriggerResponse::failed(mask(&e.to_string(), secret)),
    };

    if action == Action::Ping {
        return TriggerResponse::started(action);
    }

    info!("Trigger accepted: {}", action);
    match runner.run(action) {
        Ok(()) => TriggerResponse::started(action),
        Err(e) => {
            warn!("Triggered {} failed: {:#}", action, e);
            TriggerResponse::failed(mask(&format!("{:#}", e), secret))
        }
    }
}

fn mask(message: &str, secret: &str) -> String {
    message.replace(secret, "***")
}
