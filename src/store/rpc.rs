//! RPC client for the channel bridge in front of the voice server.
//!
//! The voice server's native control RPC is reached through a small JSON
//! bridge that mirrors it one-to-one: server handles, tree and channel
//! listings, add/update/remove. No request timeout is set; a hung bridge
//! call stalls only the control request that opened it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::{
    Channel, ChannelId, ChannelStore, ChannelTreeNode, ServerHandle, StoreConnector,
};

/// JSON-bridge client for the voice server's channel RPC.
pub struct RpcChannelStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ServersResponse {
    servers: Vec<ServerHandle>,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    channels: Vec<Channel>,
}

#[derive(Debug, Serialize)]
struct AddChannelRequest<'a> {
    name: &'a str,
    parent: ChannelId,
}

#[derive(Debug, Deserialize)]
struct AddChannelResponse {
    id: ChannelId,
}

impl RpcChannelStore {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("http://{}:{}", host, port),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = req.send().await.map_err(|e| StoreError::Unavailable {
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Protocol {
                reason: format!("HTTP {status}: {body}"),
            });
        }
        Ok(response)
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, StoreError> {
        let text = response.text().await.map_err(|e| StoreError::Unavailable {
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| StoreError::Protocol {
            reason: format!("bad response body: {e}"),
        })
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, StoreError> {
        let url = self.api_url(path);
        let response = self.send(self.client.get(&url)).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl ChannelStore for RpcChannelStore {
    async fn list_booted_server_handles(&self) -> Result<Vec<ServerHandle>, StoreError> {
        let resp: ServersResponse = self.get_json("servers").await?;
        Ok(resp.servers)
    }

    async fn channel_tree(&self, server: ServerHandle) -> Result<ChannelTreeNode, StoreError> {
        self.get_json(&format!("servers/{server}/tree")).await
    }

    async fn all_channels(
        &self,
        server: ServerHandle,
    ) -> Result<HashMap<ChannelId, Channel>, StoreError> {
        let resp: ChannelsResponse = self.get_json(&format!("servers/{server}/channels")).await?;
        Ok(resp.channels.into_iter().map(|c| (c.id, c)).collect())
    }

    async fn add_channel(
        &self,
        server: ServerHandle,
        name: &str,
        parent: ChannelId,
    ) -> Result<ChannelId, StoreError> {
        let url = self.api_url(&format!("servers/{server}/channels"));
        let response = self
            .send(self.client.post(&url).json(&AddChannelRequest { name, parent }))
            .await?;
        let resp: AddChannelResponse = Self::decode(response).await?;
        Ok(resp.id)
    }

    async fn set_channel_state(
        &self,
        server: ServerHandle,
        channel: &Channel,
    ) -> Result<(), StoreError> {
        let url = self.api_url(&format!("servers/{}/channels/{}", server, channel.id));
        self.send(self.client.put(&url).json(channel)).await?;
        Ok(())
    }

    async fn remove_channel(&self, server: ServerHandle, id: ChannelId) -> Result<(), StoreError> {
        let url = self.api_url(&format!("servers/{server}/channels/{id}"));
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }
}

/// Connector building a fresh bridge client per control request.
pub struct RpcStoreConnector {
    config: StoreConfig,
}

impl RpcStoreConnector {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StoreConnector for RpcStoreConnector {
    async fn connect(&self) -> Result<Arc<dyn ChannelStore>, StoreError> {
        Ok(Arc::new(RpcChannelStore::new(
            &self.config.host,
            self.config.port,
        )))
    }
}
