use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Error;

/// Broad category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport failure, no response.
    Network,
    /// Non-success response from the server.
    Server,
    /// Payload rejected by the server, with field detail.
    Validation,
    /// Failure on the client side (decoding, id conflicts, configuration).
    Client,
}

/// Snapshot of a failure, as stored in [`RequestState`] and shown to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, Vec<String>>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            fields: HashMap::new(),
        }
    }
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        match err {
            Error::Network(msg) => ErrorInfo::new(ErrorKind::Network, msg.clone()),
            Error::Server { status, message } => ErrorInfo {
                status: Some(*status),
                ..ErrorInfo::new(ErrorKind::Server, message.clone())
            },
            Error::Validation { message, fields } => ErrorInfo {
                fields: fields.clone(),
                ..ErrorInfo::new(ErrorKind::Validation, message.clone())
            },
            other => ErrorInfo::new(ErrorKind::Client, other.to_string()),
        }
    }
}

impl From<Error> for ErrorInfo {
    fn from(err: Error) -> Self {
        ErrorInfo::from(&err)
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Idle,
    Loading,
    Failed,
}

/// Lifecycle of the store's current request: `Idle -> Loading -> Idle | Failed`.
///
/// Completions are not matched against the start that caused them. If a second
/// request starts while one is in flight, whichever completes first clears
/// `loading`, and the last completion decides `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestState {
    pub loading: bool,
    pub error: Option<ErrorInfo>,
}

impl RequestState {
    pub fn start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn succeed(&mut self) {
        self.loading = false;
        self.error = None;
    }

    pub fn fail(&mut self, error: ErrorInfo) {
        self.loading = false;
        self.error = Some(error);
    }

    pub fn status(&self) -> RequestStatus {
        match (self.loading, &self.error) {
            (true, _) => RequestStatus::Loading,
            (false, Some(_)) => RequestStatus::Failed,
            (false, None) => RequestStatus::Idle,
        }
    }
}
