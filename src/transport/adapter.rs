//! Trait abstraction for the pub/sub transport to keep the core
//! transport-agnostic and enable testing

use async_trait::async_trait;

use crate::error::Result;

/// Transport primitives consumed by the request server.
///
/// One implementation wraps a live Zenoh session; tests use the in-memory
/// mock below. The core never blocks on I/O outside these calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a payload to a topic, fire-and-forget
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Register a subscriber; inbound payloads arrive through the handle
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>>;

    /// Register a query responder on a topic
    async fn serve_queries(&self, topic: &str) -> Result<Box<dyn QueryStream>>;

    /// Tear down the session, releasing every declared handle
    async fn close(&self) -> Result<()>;
}

/// Handle to one topic subscription
#[async_trait]
pub trait Subscription: Send {
    /// Next inbound payload; None once the subscription is closed
    async fn recv(&mut self) -> Option<Vec<u8>>;

    /// Deregister the subscription
    async fn unsubscribe(self: Box<Self>) -> Result<()>;
}

/// Handle to one registered query responder
#[async_trait]
pub trait QueryStream: Send {
    /// Next inbound query; None once the responder is closed
    async fn recv(&mut self) -> Option<Box<dyn InboundQuery>>;

    /// Deregister the responder
    async fn stop(self: Box<Self>) -> Result<()>;
}

/// One inbound query awaiting its reply
#[async_trait]
pub trait InboundQuery: Send {
    /// Topic the consumer queried
    fn topic(&self) -> &str;

    /// Send the reply payload; consumes the query
    async fn reply(self: Box<Self>, payload: &[u8]) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::mocks::{MockQuery, MockTransport};
    use super::*;

    #[tokio::test]
    async fn test_mock_publish_is_captured() {
        let transport = MockTransport::new();
        transport.publish("devices/t0", &[1, 2, 3]).await.unwrap();

        assert_eq!(
            transport.get_published(),
            vec![("devices/t0".to_string(), vec![1, 2, 3])]
        );
    }

    #[tokio::test]
    async fn test_mock_publish_failure_injection() {
        let transport = MockTransport::new();
        transport.set_fail_publish(true);
        assert!(transport.publish("devices/t0", &[0]).await.is_err());
        assert!(transport.get_published().is_empty());
    }

    #[tokio::test]
    async fn test_mock_subscription_delivers_messages() {
        let transport = MockTransport::new();
        let tx = transport.message_sender("events/launch");

        let mut sub = transport.subscribe("events/launch").await.unwrap();
        tx.send(b"LAUNCH".to_vec()).unwrap();

        assert_eq!(sub.recv().await, Some(b"LAUNCH".to_vec()));

        drop(tx);
        assert_eq!(sub.recv().await, None);
        sub.unsubscribe().await.unwrap();
    }

    #[tokio::test]
    async fn test_mock_query_reply_round_trip() {
        let transport = MockTransport::new();
        let tx = transport.query_sender("devices/t0");

        let mut queries = transport.serve_queries("devices/t0").await.unwrap();

        let (query, mut reply_rx) = MockQuery::new("devices/t0");
        tx.send(query).unwrap();

        let inbound = queries.recv().await.unwrap();
        assert_eq!(inbound.topic(), "devices/t0");
        inbound.reply(&[9, 8, 7]).await.unwrap();

        assert_eq!(reply_rx.recv().await, Some(vec![9, 8, 7]));
    }

    #[tokio::test]
    async fn test_mock_close_ends_streams() {
        let transport = MockTransport::new();
        let _tx = transport.message_sender("events/launch");
        let mut sub = transport.subscribe("events/launch").await.unwrap();

        transport.close().await.unwrap();
        assert_eq!(sub.recv().await, None);
        assert!(*transport.closed.lock().unwrap());
    }
}
