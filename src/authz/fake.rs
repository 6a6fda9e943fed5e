//! Scripted authorization server for unit tests
//!
//! Responses are queued per request path and handed out in order. A request
//! for a path with nothing queued fails with a transport error, which also
//! serves to simulate an unreachable server.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;

use super::{AuthorizationServerClient, AuthzOperation, AuthzResponse};
use crate::error::{CredentialError, Result};

/// In-process [`AuthorizationServerClient`] answering from a script.
#[derive(Debug, Default)]
pub struct ScriptedAuthorizationServer {
    responses: Mutex<HashMap<String, VecDeque<AuthzResponse>>>,
    requests: Mutex<Vec<AuthzOperation>>,
}

impl ScriptedAuthorizationServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `path`.
    pub fn push(&self, path: &str, status: u16, body: Value) {
        self.push_with_headers(path, status, Vec::new(), body);
    }

    /// Queue a response with headers for `path`.
    pub fn push_with_headers(
        &self,
        path: &str,
        status: u16,
        headers: Vec<(&str, &str)>,
        body: Value,
    ) {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(AuthzResponse::new(status, headers, body));
    }

    /// Every operation received so far.
    pub fn requests(&self) -> Vec<AuthzOperation> {
        self.requests.lock().unwrap().clone()
    }

    /// Operations received for `path`.
    pub fn requests_to(&self, path: &str) -> Vec<AuthzOperation> {
        self.requests()
            .into_iter()
            .filter(|op| op.request.path == path)
            .collect()
    }
}

#[async_trait::async_trait]
impl AuthorizationServerClient for ScriptedAuthorizationServer {
    async fn execute(&self, op: AuthzOperation) -> Result<AuthzResponse> {
        let path = op.request.path.clone();
        self.requests.lock().unwrap().push(op);
        self.responses
            .lock()
            .unwrap()
            .get_mut(&path)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| CredentialError::Transport(format!("no scripted response for {path}")))
    }
}
