//! Publication of decoded readings
//!
//! A [`Reporter`] turns each message into [`Publication`]s: the retained
//! state document and Home Assistant discovery, plus per-feature updates and
//! the device announcement for feature-based consumers. Delivery goes through
//! the [`Publisher`] trait; [`JsonLinesPublisher`] writes one JSON object per
//! publication to any async writer.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace};

use crate::config::PublishConfig;
use crate::connection::MeterConnection;
use crate::types::{Message, MeterIdentity};
use crate::{MeterError, Result};

pub mod features;
pub mod hass;

pub use features::{DeviceInfo, feature_values, supported_features};
pub use hass::Discovery;

/// A payload bound for a topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Publication {
    pub topic: String,
    pub retain: bool,
    pub payload: Value,
}

impl Publication {
    pub fn new(topic: impl Into<String>, payload: Value, retain: bool) -> Self {
        Self { topic: topic.into(), retain, payload }
    }

    /// Serialize `payload` into a publication.
    pub fn json<T: Serialize>(topic: impl Into<String>, payload: &T, retain: bool) -> Result<Self> {
        let topic = topic.into();
        let payload = serde_json::to_value(payload)
            .map_err(|e| MeterError::publish_failed(topic.clone(), e))?;
        Ok(Self { topic, retain, payload })
    }
}

/// Destination for publications.
#[async_trait::async_trait]
pub trait Publisher: Send {
    async fn publish(&mut self, publication: &Publication) -> Result<()>;

    /// Push buffered publications out.
    async fn flush(&mut self) -> Result<()>;
}

/// Writes publications as JSON lines.
pub struct JsonLinesPublisher<W> {
    writer: W,
    written: u64,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Publications written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> Publisher for JsonLinesPublisher<W> {
    async fn publish(&mut self, publication: &Publication) -> Result<()> {
        let mut line = serde_json::to_vec(publication)
            .map_err(|e| MeterError::publish_failed(publication.topic.clone(), e))?;
        line.push(b'\n');

        self.writer
            .write_all(&line)
            .await
            .map_err(|e| MeterError::publish_failed(publication.topic.clone(), e))?;
        self.written += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Builds publications for a stream of messages.
///
/// Identity-dependent documents (discovery, device announcement) are produced
/// again whenever the identity differs from the one last announced.
pub struct Reporter {
    config: PublishConfig,
    announced: Option<Arc<MeterIdentity>>,
    discovered: bool,
}

impl Reporter {
    pub fn new(config: PublishConfig) -> Self {
        Self { config, announced: None, discovered: false }
    }

    /// Whether a discovery document has been produced.
    pub fn discovered(&self) -> bool {
        self.discovered
    }

    /// Publications for one message, given the meter identity at that time.
    pub fn publications(
        &mut self,
        message: &Message,
        identity: Option<&Arc<MeterIdentity>>,
    ) -> Result<Vec<Publication>> {
        let mut out = Vec::new();
        let hass_name = self.config.hass_name.as_str();
        let topic = self.config.topic.as_str();

        if let Some(identity) = identity.filter(|id| self.announced.as_ref() != Some(*id)) {
            let discovery = Some(hass_name)
                .filter(|name| !name.is_empty())
                .and_then(|name| Discovery::for_identity(identity, name));
            if let Some(discovery) = discovery {
                info!(components = discovery.components.len(), "Publishing discovery");
                out.push(Publication::json(hass::discovery_topic(hass_name), &discovery, true)?);
                self.discovered = true;
            }
            if !topic.is_empty() {
                let info = DeviceInfo::new(topic, &self.config.name, identity);
                debug!(features = info.feature.len(), "Announcing device");
                out.push(Publication::json(features::announce_topic(topic), &info, true)?);
            }
            self.announced = Some(Arc::clone(identity));
        }

        if !hass_name.is_empty() && self.discovered {
            out.push(Publication::json(hass::state_topic(hass_name), message, true)?);
        }

        if !topic.is_empty() {
            for (feature, value) in feature_values(message) {
                let topic = format!("{topic}/{feature}");
                out.push(Publication::new(topic, Value::String(value), false));
            }
        }

        trace!(count = out.len(), "Built publications");
        Ok(out)
    }

    /// Publish everything for one message.
    pub async fn report<P: Publisher + ?Sized>(
        &mut self,
        publisher: &mut P,
        message: &Message,
        identity: Option<&Arc<MeterIdentity>>,
    ) -> Result<usize> {
        let publications = self.publications(message, identity)?;
        for publication in &publications {
            publisher.publish(publication).await?;
        }
        publisher.flush().await?;
        Ok(publications.len())
    }

    /// Report every message from a connection until it stops.
    ///
    /// Returns the number of messages reported.
    pub async fn run<P: Publisher + ?Sized>(
        &mut self,
        connection: &MeterConnection,
        publisher: &mut P,
    ) -> Result<u64> {
        use futures::StreamExt;

        let mut messages = connection.subscribe(self.config.update_rate);
        let mut reported = 0;
        while let Some(message) = messages.next().await {
            let identity = connection.current_identity();
            self.report(publisher, &message, identity.as_ref()).await?;
            reported += 1;
        }
        info!(reported, "Message stream ended");
        Ok(reported)
    }
}
