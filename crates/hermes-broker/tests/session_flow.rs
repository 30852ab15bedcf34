//! Session behavior over in-memory WebSocket pairs.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hermes_broker::{decode, Broker, BrokerConfig, Command, Session, TeardownReason};
use hermes_ws::{Connection, ConnectionConfig, ConnectionSender};
use tokio::io::DuplexStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tungstenite::protocol::Role;
use tungstenite::Message;

type TestBroker = Broker<ConnectionSender<DuplexStream>>;
type Client = WebSocketStream<DuplexStream>;

struct Harness {
    broker: TestBroker,
    shutdown_tx: watch::Sender<bool>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    fn with_config(config: BrokerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            broker: Broker::new(config),
            shutdown_tx,
        }
    }

    fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown_tx.subscribe();
        async move {
            let _ = rx.wait_for(|stop| *stop).await;
        }
    }

    async fn connect(&self) -> (Client, JoinHandle<TeardownReason>) {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let connection = Connection::from_raw_socket(server_io, &ConnectionConfig::default()).await;
        let session = Session::new(connection, self.broker.clone());
        let handle = tokio::spawn(session.run(self.shutdown_signal()));
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        (client, handle)
    }

    async fn wait_for_subscribers(&self, topic: &str, count: usize) {
        let registry = self.broker.registry();
        tokio::time::timeout(Duration::from_secs(2), async {
            while registry.subscriber_count(topic) != count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("topic {topic:?} never reached {count} subscribers"));
    }
}

async fn send(client: &mut Client, text: &str) {
    client.send(Message::Text(text.into())).await.unwrap();
}

async fn next_command(client: &mut Client) -> Command {
    let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("receive failed");
    decode(msg.to_text().unwrap()).unwrap()
}

async fn assert_silent(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(100), client.next()).await;
    assert!(result.is_err(), "expected no frame, got {result:?}");
}

#[tokio::test]
async fn test_news_relay_end_to_end() {
    let harness = Harness::new();
    let (mut c1, _h1) = harness.connect().await;
    let (mut c2, _h2) = harness.connect().await;
    let (mut c3, _h3) = harness.connect().await;

    send(&mut c1, "SUBSCRIBE news").await;
    send(&mut c2, "SUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 2).await;

    send(&mut c3, "news hello-world").await;

    let expected = Command::publish("news", "hello-world");
    assert_eq!(next_command(&mut c1).await, expected);
    assert_eq!(next_command(&mut c2).await, expected);
    assert_silent(&mut c3).await;
}

#[tokio::test]
async fn test_sole_subscriber_gets_no_echo() {
    let harness = Harness::new();
    let (mut a, _ha) = harness.connect().await;

    send(&mut a, "SUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 1).await;
    send(&mut a, "news anyone?").await;

    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_fan_out_to_every_subscriber() {
    let harness = Harness::new();
    let mut subscribers = Vec::new();
    for _ in 0..3 {
        let (mut client, handle) = harness.connect().await;
        send(&mut client, "SUBSCRIBE news").await;
        subscribers.push((client, handle));
    }
    harness.wait_for_subscribers("news", 3).await;

    let (mut publisher, _hp) = harness.connect().await;
    send(&mut publisher, "news breaking").await;

    for (client, _) in &mut subscribers {
        assert_eq!(next_command(client).await, Command::publish("news", "breaking"));
        assert_silent(client).await;
    }
}

#[tokio::test]
async fn test_disconnect_removes_subscriptions() {
    let harness = Harness::new();
    let (mut a, ha) = harness.connect().await;
    let (mut b, _hb) = harness.connect().await;
    let (mut c, _hc) = harness.connect().await;

    send(&mut a, "SUBSCRIBE news").await;
    send(&mut a, "SUBSCRIBE sports").await;
    send(&mut b, "SUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 2).await;
    harness.wait_for_subscribers("sports", 1).await;

    a.close(None).await.unwrap();
    let reason = ha.await.unwrap();
    assert_eq!(reason, TeardownReason::PeerClosed);

    assert_eq!(harness.broker.registry().subscriber_count("news"), 1);
    assert!(!harness.broker.registry().has_subscribers("sports"));

    send(&mut c, "news after-a-left").await;
    assert_eq!(next_command(&mut b).await, Command::publish("news", "after-a-left"));
}

#[tokio::test]
async fn test_dropped_transport_still_cleans_up() {
    let harness = Harness::new();
    let (mut a, ha) = harness.connect().await;

    send(&mut a, "SUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 1).await;

    drop(a);
    let reason = ha.await.unwrap();
    assert!(matches!(
        reason,
        TeardownReason::EndOfStream | TeardownReason::TransportError
    ));
    assert!(!harness.broker.registry().has_subscribers("news"));
}

#[tokio::test]
async fn test_publish_to_unknown_topic_is_harmless() {
    let harness = Harness::new();
    let (mut a, _ha) = harness.connect().await;

    send(&mut a, "nowhere hello").await;
    send(&mut a, "SUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 1).await;

    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    let harness = Harness::new();
    let (mut a, _ha) = harness.connect().await;
    let (mut b, _hb) = harness.connect().await;

    for frame in ["", "   ", "nospace", "{\"kind\":\"Shout\"}", "SUBSCRIBE "] {
        send(&mut a, frame).await;
    }
    send(&mut a, "SUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 1).await;

    // Nothing but "news" was ever created.
    assert_eq!(harness.broker.registry().topic_count(), 1);

    send(&mut b, "news still-alive").await;
    assert_eq!(next_command(&mut a).await, Command::publish("news", "still-alive"));
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let harness = Harness::new();
    let (mut a, _ha) = harness.connect().await;
    let (mut b, _hb) = harness.connect().await;

    send(&mut a, "SUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 1).await;
    send(&mut a, "UNSUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 0).await;

    send(&mut b, "news hello").await;
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_structured_and_legacy_clients_interoperate() {
    let harness = Harness::new();
    let (mut a, _ha) = harness.connect().await;
    let (mut b, _hb) = harness.connect().await;

    send(&mut a, r#"{"kind":"Subscribe","topic":"news"}"#).await;
    harness.wait_for_subscribers("news", 1).await;

    send(&mut b, r#"{"kind":"Publish","topic":"news","payload":"from json"}"#).await;
    assert_eq!(next_command(&mut a).await, Command::publish("news", "from json"));

    send(&mut b, "news from text").await;
    assert_eq!(next_command(&mut a).await, Command::publish("news", "from text"));
}

#[tokio::test]
async fn test_binary_frames_are_ignored() {
    let harness = Harness::new();
    let (mut a, _ha) = harness.connect().await;

    a.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
    send(&mut a, "SUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 1).await;
    assert_eq!(harness.broker.registry().topic_count(), 1);
}

#[tokio::test]
async fn test_shutdown_closes_with_going_away() {
    let harness = Harness::new();
    let (mut a, ha) = harness.connect().await;

    send(&mut a, "SUBSCRIBE news").await;
    harness.wait_for_subscribers("news", 1).await;

    harness.shutdown_tx.send_replace(true);
    assert_eq!(ha.await.unwrap(), TeardownReason::Shutdown);
    assert!(!harness.broker.registry().has_subscribers("news"));

    let msg = tokio::time::timeout(Duration::from_secs(2), a.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match msg {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1001),
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_subscribe_unsubscribe_same_connection() {
    let harness = Harness::new();
    let (mut a, _ha) = harness.connect().await;

    for _ in 0..50 {
        send(&mut a, "SUBSCRIBE news").await;
        send(&mut a, "SUBSCRIBE news").await;
        send(&mut a, "UNSUBSCRIBE news").await;
    }
    send(&mut a, "SUBSCRIBE news").await;
    send(&mut a, "SUBSCRIBE marker").await;
    harness.wait_for_subscribers("marker", 1).await;

    // Frames are applied in order, so the last command wins.
    assert_eq!(harness.broker.registry().subscriber_count("news"), 1);
    assert!(harness.broker.registry().check_invariants().is_ok());
}
