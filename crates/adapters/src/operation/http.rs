// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport to a remote worker pool

use super::{DispatchError, OperationAdapter, OperationContext};
use async_trait::async_trait;
use oe_core::OperationId;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use ureq::Agent;

/// Request deadline used until [`HttpOperationAdapter::with_timeout`] is called
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body posted for each execution request
#[derive(Debug, Serialize)]
struct ExecutionRequest<'a> {
    operation_id: &'a OperationId,
    #[serde(flatten)]
    context: &'a OperationContext,
}

/// Posts execution requests as JSON to `{endpoint}/operations/{id}/executions`.
///
/// Requests run on the blocking pool and are bounded by the agent's own
/// timeout, so a worker that never answers cannot pin a blocking thread.
/// A 2xx answer counts as accepted.
#[derive(Clone)]
pub struct HttpOperationAdapter {
    endpoint: String,
    timeout: Duration,
    agent: Agent,
}

impl HttpOperationAdapter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            agent: agent_with_timeout(DEFAULT_TIMEOUT),
        }
    }

    /// Deadline for a whole request, connect through response
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.agent = agent_with_timeout(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, operation: &OperationId) -> String {
        format!("{}/operations/{}/executions", self.endpoint, operation)
    }
}

impl fmt::Debug for HttpOperationAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpOperationAdapter")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn agent_with_timeout(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

#[async_trait]
impl OperationAdapter for HttpOperationAdapter {
    async fn execute_operation(
        &self,
        operation: &OperationId,
        context: &OperationContext,
    ) -> Result<(), DispatchError> {
        let url = self.url(operation);
        let body = serde_json::to_string(&ExecutionRequest {
            operation_id: operation,
            context,
        })
        .map_err(|e| DispatchError::Transport(format!("failed to encode request: {}", e)))?;

        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || {
            agent
                .post(&url)
                .header("content-type", "application/json")
                .send(body.as_bytes())
                .map(|_| ())
                .map_err(|e| DispatchError::Transport(format!("HTTP request failed: {}", e)))
        })
        .await
        .map_err(|e| DispatchError::Transport(format!("request task failed: {}", e)))?
    }
}
