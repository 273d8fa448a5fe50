//! # Transport Module
//!
//! Zenoh-backed implementation of the transport adapter.
//!
//! This module handles:
//! - Opening and closing the Zenoh session
//! - Publishing reading payloads to a topic
//! - Subscribing to the launch-trigger topic
//! - Serving reading queries via a queryable
//!
//! Delivery and ordering semantics belong to Zenoh; the core neither
//! retries nor reorders.

use async_trait::async_trait;
use tracing::{debug, info};
use zenoh::handlers::FifoChannelHandler;
use zenoh::pubsub::Subscriber;
use zenoh::query::{Query, Queryable};
use zenoh::sample::Sample;
use zenoh::Session;

use crate::error::{Result, SensorSimError};

pub mod adapter;

pub use adapter::{InboundQuery, QueryStream, Subscription, Transport};

/// Map a Zenoh error into the crate error type
fn transport_err(e: zenoh::Error) -> SensorSimError {
    SensorSimError::Transport(e.to_string())
}

/// Zenoh session wrapper implementing the core transport interface.
pub struct ZenohTransport {
    session: Session,
}

impl std::fmt::Debug for ZenohTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZenohTransport")
            .field("zid", &self.session.zid())
            .finish_non_exhaustive()
    }
}

impl ZenohTransport {
    /// Open a Zenoh session with the default configuration.
    ///
    /// Peer discovery, router endpoints and the rest of the session setup
    /// follow Zenoh's own configuration mechanisms; this crate does not
    /// wrap them.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be opened.
    pub async fn connect() -> Result<Self> {
        let session = zenoh::open(zenoh::Config::default())
            .await
            .map_err(transport_err)?;
        info!("Zenoh session opened, zid {}", session.zid());
        Ok(Self { session })
    }
}

#[async_trait]
impl Transport for ZenohTransport {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.session
            .put(topic, payload.to_vec())
            .await
            .map_err(transport_err)
    }

    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>> {
        let subscriber = self
            .session
            .declare_subscriber(topic)
            .await
            .map_err(transport_err)?;
        debug!("Declared subscriber on {}", topic);
        Ok(Box::new(ZenohSubscription { subscriber }))
    }

    async fn serve_queries(&self, topic: &str) -> Result<Box<dyn QueryStream>> {
        let queryable = self
            .session
            .declare_queryable(topic)
            .await
            .map_err(transport_err)?;
        debug!("Declared queryable on {}", topic);
        Ok(Box::new(ZenohQueryStream { queryable }))
    }

    async fn close(&self) -> Result<()> {
        self.session.close().await.map_err(transport_err)
    }
}

struct ZenohSubscription {
    subscriber: Subscriber<FifoChannelHandler<Sample>>,
}

#[async_trait]
impl Subscription for ZenohSubscription {
    async fn recv(&mut self) -> Option<Vec<u8>> {
        match self.subscriber.recv_async().await {
            Ok(sample) => Some(sample.payload().to_bytes().into_owned()),
            Err(_) => None,
        }
    }

    async fn unsubscribe(self: Box<Self>) -> Result<()> {
        self.subscriber.undeclare().await.map_err(transport_err)
    }
}

struct ZenohQueryStream {
    queryable: Queryable<FifoChannelHandler<Query>>,
}

#[async_trait]
impl QueryStream for ZenohQueryStream {
    async fn recv(&mut self) -> Option<Box<dyn InboundQuery>> {
        match self.queryable.recv_async().await {
            Ok(query) => Some(Box::new(ZenohQuery { query })),
            Err(_) => None,
        }
    }

    async fn stop(self: Box<Self>) -> Result<()> {
        self.queryable.undeclare().await.map_err(transport_err)
    }
}

struct ZenohQuery {
    query: Query,
}

#[async_trait]
impl InboundQuery for ZenohQuery {
    fn topic(&self) -> &str {
        self.query.key_expr().as_str()
    }

    async fn reply(self: Box<Self>, payload: &[u8]) -> Result<()> {
        let key = self.query.key_expr().clone();
        self.query
            .reply(key, payload.to_vec())
            .await
            .map_err(transport_err)
    }
}
