//! Fan-out of published payloads.
//!
//! A publish is encoded once, then sent concurrently to a snapshot of the
//! topic's subscribers. The originating connection is never a recipient.
//! Each send is bounded by the configured deadline and a failed or slow
//! subscriber never affects delivery to the others.

use futures_util::future::join_all;
use hermes_ws::{ConnectionId, WsError};
use tracing::{debug, warn};

use crate::codec::{self, Command};
use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::outbound::Outbound;
use crate::registry::SubscriptionRegistry;

/// Outcome of one publish, for logging and metrics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers targeted, originator excluded.
    pub recipients: usize,
    /// Sends that completed.
    pub delivered: usize,
    /// Sends that failed or missed the deadline.
    pub failed: usize,
}

/// Deliver `payload` to every subscriber of `topic` except `originator`.
///
/// `originator` is `None` for publishes made by the host process, which
/// reach every subscriber.
pub async fn fan_out<O: Outbound>(
    registry: &SubscriptionRegistry<O>,
    config: &BrokerConfig,
    topic: &str,
    payload: &str,
    originator: Option<ConnectionId>,
) -> PublishReport {
    let recipients: Vec<O> = registry
        .subscribers_of(topic)
        .into_iter()
        .filter(|subscriber| Some(subscriber.id()) != originator)
        .collect();

    if recipients.is_empty() {
        debug!(topic = %topic, "Publish has no recipients");
        let report = PublishReport::default();
        hermes_telemetry::metrics::record_publish(0, 0, 0);
        return report;
    }

    let frame = codec::encode_as(&Command::publish(topic, payload), config.outbound_format);

    let deliveries = recipients.iter().map(|subscriber| {
        let frame = frame.clone();
        async move {
            let id = subscriber.id();
            match tokio::time::timeout(config.send_timeout, subscriber.send_text(frame)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(BrokerError::delivery(id, e)),
                Err(_) => Err(BrokerError::delivery(id, WsError::SendTimeout(config.send_timeout))),
            }
        }
    });

    let mut report = PublishReport {
        recipients: recipients.len(),
        ..PublishReport::default()
    };
    for result in join_all(deliveries).await {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                warn!(topic = %topic, error = %e, "Delivery failed");
            }
        }
    }

    hermes_telemetry::metrics::record_publish(report.recipients, report.delivered, report.failed);
    report
}
