//! The shared broker handle.

use std::sync::Arc;

use hermes_ws::ConnectionId;

use crate::broadcast::{self, PublishReport};
use crate::config::BrokerConfig;
use crate::outbound::Outbound;
use crate::registry::{RegistryStats, SubscriptionRegistry};

struct BrokerInner<O> {
    registry: SubscriptionRegistry<O>,
    config: BrokerConfig,
}

/// Registry plus configuration, shared by every session.
///
/// Cloning is cheap; all clones see the same subscriptions.
pub struct Broker<O> {
    inner: Arc<BrokerInner<O>>,
}

impl<O> Clone for Broker<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: Outbound> std::fmt::Debug for Broker<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

impl<O: Outbound> Default for Broker<O> {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

impl<O: Outbound> Broker<O> {
    /// Create a broker with an empty registry.
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                registry: SubscriptionRegistry::new(),
                config,
            }),
        }
    }

    /// The subscription registry.
    pub fn registry(&self) -> &SubscriptionRegistry<O> {
        &self.inner.registry
    }

    /// The broker configuration.
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// Publish `payload` on `topic`.
    ///
    /// Pass the publishing connection as `originator` to exclude it from
    /// delivery, or `None` to reach every subscriber.
    pub async fn publish(
        &self,
        topic: &str,
        payload: &str,
        originator: Option<ConnectionId>,
    ) -> PublishReport {
        broadcast::fan_out(&self.inner.registry, &self.inner.config, topic, payload, originator)
            .await
    }

    /// Current registry statistics.
    pub fn stats(&self) -> RegistryStats {
        self.inner.registry.stats()
    }
}
