use crate::types::{
    ApiListedWallet, ApiListedWalletsRequest, ApiListedWalletsResponse, ApiPosition,
    ApiPositionsResponse, ApiTaskGroup, ApiTasksResponse, ApiTokenDocument, ApiTradeRequest,
    ApiWalletBalance, ApiWalletGroup, ApiWalletsResponse, PositionAction, PositionStatus,
};
use anyhow::{Context, Result};
use reqwest::{Method, Url};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Thin HTTP client for the remote position/wallet service.
pub struct ApiClient {
    base_url: String,
    pool_lookup_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, pool_lookup_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            pool_lookup_url: pool_lookup_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn positions_url(&self, status: PositionStatus) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/positions/", self.base_url))
            .context("api base_url must be a valid absolute URL")?;
        url.query_pairs_mut().append_pair("status", status.as_str());
        Ok(url)
    }

    pub fn wallet_balance_url(&self, wallet_id: &str, token: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/wallets/{}/balance",
            self.base_url,
            urlencoding::encode(wallet_id)
        ))
        .context("api base_url must be a valid absolute URL")?;
        if let Some(token) = token {
            url.query_pairs_mut().append_pair("token_address", token);
        }
        Ok(url)
    }

    pub fn position_action_url(&self, position_id: &str, action: PositionAction) -> String {
        format!(
            "{}/positions/{}/{}",
            self.base_url,
            urlencoding::encode(position_id),
            action.as_str()
        )
    }

    pub fn pool_url(&self, pool_address: &str) -> String {
        format!(
            "{}/{}",
            self.pool_lookup_url,
            urlencoding::encode(pool_address)
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request failed: {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API error {status}: {body}");
        }

        resp.json()
            .await
            .with_context(|| format!("failed to deserialize response from {url}"))
    }

    /// Send a mutating request and return the JSON body; plain-text replies
    /// are wrapped as `{"success": true, "message": ...}`.
    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<serde_json::Value> {
        debug!(url = %url, method = %method, "send");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("request failed: {url}"))?;

        let status = resp.status();
        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            anyhow::bail!("API error {status}: {text}");
        }

        if is_json {
            serde_json::from_str(&text).context("failed to deserialize JSON reply")
        } else {
            Ok(serde_json::json!({ "success": true, "message": text }))
        }
    }

    pub async fn fetch_positions(&self, status: PositionStatus) -> Result<Vec<ApiPosition>> {
        let url = self.positions_url(status)?;
        let resp: ApiPositionsResponse = self.get_json(url.as_str()).await?;
        let positions = resp.into_positions();
        debug!(status = %status, count = positions.len(), "fetched positions");
        Ok(positions)
    }

    pub async fn fetch_wallets(&self) -> Result<Vec<ApiWalletGroup>> {
        let url = format!("{}/wallets/", self.base_url);
        let resp: ApiWalletsResponse = self.get_json(&url).await?;
        Ok(resp.into_groups())
    }

    pub async fn fetch_wallet_balance(
        &self,
        wallet_id: &str,
        token: Option<&str>,
    ) -> Result<ApiWalletBalance> {
        let url = self.wallet_balance_url(wallet_id, token)?;
        self.get_json(url.as_str()).await
    }

    pub async fn fetch_token_document(&self, uri: &str) -> Result<ApiTokenDocument> {
        self.get_json(uri).await
    }

    pub async fn set_position_status(&self, position_id: &str, action: PositionAction) -> Result<()> {
        let url = self.position_action_url(position_id, action);
        self.send_json::<()>(Method::POST, &url, None).await?;
        Ok(())
    }

    pub async fn submit_trade(&self, request: &ApiTradeRequest) -> Result<serde_json::Value> {
        let url = format!("{}/trade/", self.base_url);
        self.send_json(Method::POST, &url, Some(request)).await
    }

    pub fn task_group_url(&self, group_id: &str) -> String {
        format!("{}/tasks/{}", self.base_url, urlencoding::encode(group_id))
    }

    pub async fn fetch_task_groups(&self) -> Result<Vec<ApiTaskGroup>> {
        let url = format!("{}/tasks/", self.base_url);
        let resp: ApiTasksResponse = self.get_json(&url).await?;
        Ok(resp.groups)
    }

    pub async fn start_task_group(&self, group_id: &str) -> Result<()> {
        self.send_json::<()>(Method::POST, &self.task_group_url(group_id), None)
            .await?;
        Ok(())
    }

    pub async fn stop_task_group(&self, group_id: &str) -> Result<()> {
        self.send_json::<()>(Method::PUT, &self.task_group_url(group_id), None)
            .await?;
        Ok(())
    }

    pub async fn delete_task_group(&self, group_id: &str) -> Result<()> {
        self.send_json::<()>(Method::DELETE, &self.task_group_url(group_id), None)
            .await?;
        Ok(())
    }

    /// Whitelisted and blacklisted wallets, optionally for one group only.
    pub async fn fetch_listed_wallets(&self, group_id: Option<&str>) -> Result<Vec<ApiListedWallet>> {
        let url = match group_id {
            Some(group) => format!("{}/wlbl/{}", self.base_url, urlencoding::encode(group)),
            None => format!("{}/wlbl", self.base_url),
        };
        let resp: ApiListedWalletsResponse = self.get_json(&url).await?;
        Ok(resp.into_wallets())
    }

    pub async fn add_listed_wallet(&self, wallet: &ApiListedWallet) -> Result<()> {
        let url = format!("{}/wlbl", self.base_url);
        let body = ApiListedWalletsRequest {
            wallets: vec![wallet.clone()],
        };
        self.send_json(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    pub fn listed_wallet_url(&self, group_id: &str, address: &str) -> String {
        format!(
            "{}/wlbl/{}/{}",
            self.base_url,
            urlencoding::encode(group_id),
            urlencoding::encode(address)
        )
    }

    pub async fn remove_listed_wallet(&self, group_id: &str, address: &str) -> Result<()> {
        let url = self.listed_wallet_url(group_id, address);
        self.send_json::<()>(Method::DELETE, &url, None).await?;
        Ok(())
    }

    /// True when `/health` answers with a success status.
    pub async fn check_health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request failed: {url}"))?;
        Ok(resp.status().is_success())
    }

    /// Look up a pool and return its base token mint, if the service knows it.
    pub async fn lookup_pool(&self, pool_address: &str) -> Result<Option<String>> {
        let body: serde_json::Value = self.get_json(&self.pool_url(pool_address)).await?;
        Ok(base_token_from_pool(&body))
    }
}

/// Extract the base token mint from a pool document (`solana_<mint>` ids).
pub fn base_token_from_pool(body: &serde_json::Value) -> Option<String> {
    let id = body
        .pointer("/data/relationships/base_token/data/id")?
        .as_str()?;
    id.strip_prefix("solana_").map(str::to_string)
}

/// True for absolute `http`/`https` URLs with a host.
pub fn is_http_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}
