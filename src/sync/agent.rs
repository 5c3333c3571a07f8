//! The polling sync agent.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::time::MissedTickBehavior;

use crate::sync::AttributeSource;

/// Lifecycle of a [`SyncAgent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    /// No channel tracked yet.
    Idle,
    /// Tracking a created channel via the URL that will remove it.
    Active { cleanup_url: String },
    /// Terminal; the agent no longer acts.
    Destroyed,
}

/// Keeps one desired channel alive on the control service.
///
/// The tracked channel is identified by its derived removal URL, so a
/// changed attribute value is detected as a changed URL. Outbound calls
/// carry the shared secret in the URL path, same as any other control
/// client.
pub struct SyncAgent {
    create_base_url: String,
    remove_base_url: String,
    interval: Duration,
    client: Client,
    source: Arc<dyn AttributeSource>,
    state: AgentState,
}

impl SyncAgent {
    pub fn new(
        create_base_url: impl Into<String>,
        remove_base_url: impl Into<String>,
        interval: Duration,
        source: Arc<dyn AttributeSource>,
    ) -> Self {
        Self {
            create_base_url: create_base_url.into(),
            remove_base_url: remove_base_url.into(),
            interval,
            client: Client::new(),
            source,
            state: AgentState::Idle,
        }
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.state, AgentState::Destroyed)
    }

    /// One reconciliation pass.
    ///
    /// Unset attribute: nothing this pass. Changed attribute: remove the
    /// previously tracked channel (if any), create the new one, update
    /// tracked state. Unreadable attribute: the host entity is gone, so
    /// destroy. A failed control call leaves the tracked state untouched;
    /// the next pass retries, and re-removing an already absent channel is
    /// a no-op on the service side.
    pub async fn tick(&mut self) {
        if self.is_destroyed() {
            return;
        }

        let desired = match self.source.desired_channel().await {
            Ok(Some(id)) => id,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Attribute host gone, destroying agent");
                self.destroy().await;
                return;
            }
        };

        let cleanup_url = format!("{}{}", self.remove_base_url, desired);
        if matches!(&self.state, AgentState::Active { cleanup_url: tracked } if *tracked == cleanup_url)
        {
            return;
        }

        if let AgentState::Active { cleanup_url: old } = &self.state {
            if !self.call(old).await {
                return;
            }
        }
        let create_url = format!("{}{}", self.create_base_url, desired);
        if !self.call(&create_url).await {
            return;
        }

        tracing::info!(channel = %desired, "Now tracking channel");
        self.state = AgentState::Active { cleanup_url };
    }

    /// Drive the agent on its poll interval until destroyed. The first pass
    /// runs immediately; ticks never overlap because each pass, control
    /// calls included, completes before the next fire is awaited.
    pub async fn run(&mut self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
            if self.is_destroyed() {
                break;
            }
        }
    }

    /// Terminal cleanup: remove the tracked channel (if any) and stop
    /// acting. Safe to call more than once.
    pub async fn destroy(&mut self) {
        if let AgentState::Active { cleanup_url } =
            std::mem::replace(&mut self.state, AgentState::Destroyed)
        {
            let _ = self.call(&cleanup_url).await;
        }
    }

    /// Issue one control call. Returns whether the service accepted it.
    async fn call(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Control call rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Control call failed");
                false
            }
        }
    }
}
