//! A2A client for calling other agents over JSON-RPC.

use super::types::{
    AgentCard, CancelTaskParams, GetTaskParams, JsonRpcRequest, JsonRpcResponse, Message,
    SendMessageConfiguration, SendMessageParams, Task,
};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Path of the JSON-RPC endpoint on agents built from these blueprints.
pub const RPC_PATH: &str = "/a2a/v1";

#[derive(Debug, Clone)]
pub struct A2aClient {
    client: Client,
    base_url: String,
    rpc_url: String,
    token: Option<String>,
}

impl A2aClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            rpc_url: format!("{base_url}{RPC_PATH}"),
            base_url,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Per-request timeout for every call made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(self)
    }

    /// Post JSON-RPC calls somewhere other than `{base_url}/a2a/v1`, e.g. the
    /// interface URL advertised on the agent's card.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub async fn get_agent_card(&self) -> Result<AgentCard> {
        let url = format!("{}/.well-known/agent.json", self.base_url);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch agent card from {url}"))?
            .error_for_status()?;
        let card: AgentCard = res.json().await.context("Invalid agent card")?;
        Ok(card)
    }

    /// `message/send`, waiting for the task to settle.
    pub async fn send_message(&self, params: SendMessageParams) -> Result<Task> {
        self.call("message/send", &params).await
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<Task> {
        self.send_message(SendMessageParams {
            message: Message::user_text(text),
            configuration: None,
            metadata: None,
        })
        .await
    }

    /// `message/send` with `blocking: false`. The returned task is typically
    /// still `submitted`; poll it with [`A2aClient::get_task`].
    pub async fn submit_text(&self, text: impl Into<String>) -> Result<Task> {
        self.send_message(SendMessageParams {
            message: Message::user_text(text),
            configuration: Some(SendMessageConfiguration {
                blocking: Some(false),
                ..SendMessageConfiguration::default()
            }),
            metadata: None,
        })
        .await
    }

    pub async fn get_task(&self, id: &str, history_length: Option<usize>) -> Result<Task> {
        self.call(
            "tasks/get",
            &GetTaskParams {
                id: id.to_string(),
                history_length,
            },
        )
        .await
    }

    pub async fn cancel_task(&self, id: &str) -> Result<Task> {
        self.call("tasks/cancel", &CancelTaskParams { id: id.to_string() })
            .await
    }

    async fn call<P: Serialize, T: DeserializeOwned>(&self, method: &str, params: &P) -> Result<T> {
        let request = JsonRpcRequest::new(method, serde_json::to_value(params)?);
        let response = self.call_rpc(request).await?;

        if let Some(error) = response.error {
            anyhow::bail!("RPC error {}: {}", error.code, error.message);
        }

        let result = response
            .result
            .ok_or_else(|| anyhow::anyhow!("No result in {method} response"))?;
        serde_json::from_value(result).with_context(|| format!("Unexpected {method} result"))
    }

    pub async fn call_rpc(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let mut req = self.client.post(&self.rpc_url);

        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let res = req
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.rpc_url))?;

        let response: JsonRpcResponse = res.json().await.context("Invalid JSON-RPC response")?;
        Ok(response)
    }
}
