//! MQTT client tests against an in-process broker
//!
//! These run the real rumqttc event loop supervisor over loopback TCP:
//! command bursts, connection loss and reconnect, subscription rejection
//! and the shutdown sequence on the wire.

mod test_helpers;

use fake_broker::{publish_packet, ClientPacket, ClientPublish, FakeBroker};
use lamp_agent::agent::{AgentEvent, AgentLifecycle};
use lamp_agent::config::AgentConfig;
use lamp_agent::gpio::{Level, MemoryPin};
use lamp_agent::protocol::ProtocolVariant;
use lamp_agent::transport::mqtt::{MqttClient, ReconnectConfig};
use lamp_agent::AgentError;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn fast_reconnect() -> ReconnectConfig {
    ReconnectConfig {
        backoff_pattern: vec![50],
        sustained_delay: 50,
    }
}

fn config_for(broker: &FakeBroker, variant: ProtocolVariant) -> AgentConfig {
    let mut config = test_helpers::test_config(variant);
    config.mqtt.broker_url = broker.url();
    config
}

fn lifecycle_for(config: &AgentConfig, pin: &MemoryPin) -> AgentLifecycle<MemoryPin, MqttClient> {
    let transport = MqttClient::new(&config.agent.id, &config.mqtt, None)
        .unwrap()
        .with_reconnect_config(fast_reconnect());
    AgentLifecycle::new(config, pin.clone(), transport).unwrap()
}

fn publish(topic: &str, payload: &str, retain: bool) -> ClientPublish {
    ClientPublish {
        topic: topic.to_string(),
        payload: payload.as_bytes().to_vec(),
        retain,
    }
}

#[tokio::test]
async fn test_command_burst_is_processed_without_stalling() {
    const BURST: usize = 500;

    let broker = FakeBroker::bind().await;
    let config = config_for(&broker, ProtocolVariant::Boolean);

    let broker_task = tokio::spawn(async move {
        let mut session = broker.accept().await;
        let (_, packet_id, _) = session.until_subscribe().await;
        session.suback(packet_id, 0x00).await;

        let mut burst = Vec::new();
        for i in 0..BURST {
            let payload: &[u8] = if i % 2 == 0 { b"true" } else { b"false" };
            burst.extend(publish_packet("bedroom/lamp/setOn", payload, false));
        }
        session.write(&burst).await;

        session.drain().await
    });

    let pin = MemoryPin::new(24);
    let mut lifecycle = lifecycle_for(&config, &pin);
    lifecycle.start().await.unwrap();

    let watched = pin.clone();
    timeout(
        TEST_TIMEOUT,
        lifecycle.run_until(async move {
            while watched.write_count() < BURST {
                sleep(Duration::from_millis(10)).await;
            }
        }),
    )
    .await
    .expect("agent stalled while processing the burst")
    .unwrap();

    assert_eq!(pin.write_count(), BURST);
    assert_eq!(pin.level(), Level::Low);

    let packets = timeout(TEST_TIMEOUT, broker_task).await.unwrap().unwrap();
    let echoes = packets
        .iter()
        .filter(|packet| {
            matches!(packet, ClientPacket::Publish(p) if p.topic == "bedroom/lamp/on")
        })
        .count();
    assert_eq!(echoes, BURST);

    let tail = &packets[packets.len() - 2..];
    assert_eq!(
        tail,
        &[
            ClientPacket::Publish(publish("bedroom/lamp/online", "false", true)),
            ClientPacket::Disconnect,
        ]
    );
}

#[tokio::test]
async fn test_clean_shutdown_sends_offline_marker_before_disconnect() {
    let broker = FakeBroker::bind().await;
    let config = config_for(&broker, ProtocolVariant::Boolean);
    let (subscribed_tx, subscribed_rx) = oneshot::channel();

    let broker_task = tokio::spawn(async move {
        let mut session = broker.accept().await;
        let (on_connect, packet_id, topics) = session.until_subscribe().await;
        session.suback(packet_id, 0x00).await;
        let _ = subscribed_tx.send(());
        (on_connect, topics, session.drain().await)
    });

    let pin = MemoryPin::new(24);
    let mut lifecycle = lifecycle_for(&config, &pin);
    lifecycle.start().await.unwrap();

    timeout(
        TEST_TIMEOUT,
        lifecycle.run_until(async {
            let _ = subscribed_rx.await;
        }),
    )
    .await
    .unwrap()
    .unwrap();

    let (on_connect, topics, after) = timeout(TEST_TIMEOUT, broker_task).await.unwrap().unwrap();
    assert_eq!(
        on_connect,
        vec![
            publish("bedroom/lamp/online", "true", true),
            publish("bedroom/lamp/on", "false", true),
        ]
    );
    assert_eq!(topics, vec!["bedroom/lamp/setOn"]);
    assert_eq!(
        after,
        vec![
            ClientPacket::Publish(publish("bedroom/lamp/online", "false", true)),
            ClientPacket::Disconnect,
        ]
    );
}

#[tokio::test]
async fn test_dropped_connection_reconnects_and_resubscribes() {
    let broker = FakeBroker::bind().await;
    let config = config_for(&broker, ProtocolVariant::Word);
    let (resubscribed_tx, resubscribed_rx) = oneshot::channel();

    let broker_task = tokio::spawn(async move {
        let mut first = broker.accept().await;
        let (first_publishes, packet_id, first_topics) = first.until_subscribe().await;
        first.suback(packet_id, 0x00).await;
        drop(first);

        let mut second = broker.accept().await;
        let (second_publishes, packet_id, second_topics) = second.until_subscribe().await;
        second.suback(packet_id, 0x00).await;
        let _ = resubscribed_tx.send(());
        second.drain().await;

        (first_publishes, first_topics, second_publishes, second_topics)
    });

    let pin = MemoryPin::new(24);
    let mut lifecycle = lifecycle_for(&config, &pin);
    lifecycle.start().await.unwrap();

    timeout(
        TEST_TIMEOUT,
        lifecycle.run_until(async {
            let _ = resubscribed_rx.await;
        }),
    )
    .await
    .expect("agent did not resubscribe after reconnecting")
    .unwrap();

    assert_eq!(lifecycle.connect_count(), 2);

    let (first_publishes, first_topics, second_publishes, second_topics) =
        timeout(TEST_TIMEOUT, broker_task).await.unwrap().unwrap();
    assert_eq!(
        first_publishes,
        vec![publish("bedroom/lamp/state", "off", false)]
    );
    assert_eq!(second_publishes, first_publishes);
    assert_eq!(
        first_topics,
        vec!["bedroom/lamp/setState", "bedroom/lamp/getState"]
    );
    assert_eq!(second_topics, first_topics);
}

#[tokio::test]
async fn test_connection_loss_emits_one_event_per_outage() {
    let broker = FakeBroker::bind().await;
    let config = config_for(&broker, ProtocolVariant::Minimal);

    let broker_task = tokio::spawn(async move {
        let first = broker.accept().await;
        drop(first);
        let mut second = broker.accept().await;
        second.drain().await
    });

    let mut client = MqttClient::new("test-lamp", &config.mqtt, None)
        .unwrap()
        .with_reconnect_config(fast_reconnect());
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    client.connect(events_tx).await.unwrap();

    let mut events = Vec::new();
    timeout(TEST_TIMEOUT, async {
        let mut connects = 0;
        while connects < 2 {
            let event = events_rx.recv().await.expect("event stream ended early");
            if matches!(event, AgentEvent::Connected { .. }) {
                connects += 1;
            }
            events.push(event);
        }
    })
    .await
    .expect("client did not reconnect");

    assert_eq!(events.len(), 6, "Unexpected event sequence: {events:?}");
    assert_eq!(events[0], AgentEvent::ConnectionAttempt);
    assert!(matches!(events[1], AgentEvent::Connected { .. }));
    assert!(matches!(events[2], AgentEvent::ConnectionLost(_)));
    assert_eq!(events[3], AgentEvent::Reconnecting(1));
    assert_eq!(events[4], AgentEvent::ConnectionAttempt);
    assert!(matches!(events[5], AgentEvent::Connected { .. }));

    client.disconnect().await.unwrap();
    let after = timeout(TEST_TIMEOUT, broker_task).await.unwrap().unwrap();
    assert_eq!(after, vec![ClientPacket::Disconnect]);
}

#[tokio::test]
async fn test_rejected_subscription_stops_the_agent() {
    let broker = FakeBroker::bind().await;
    let config = config_for(&broker, ProtocolVariant::Boolean);

    let broker_task = tokio::spawn(async move {
        let mut session = broker.accept().await;
        let (_, packet_id, _) = session.until_subscribe().await;
        session.suback(packet_id, 0x80).await;
        session.drain().await
    });

    let pin = MemoryPin::new(24);
    let mut lifecycle = lifecycle_for(&config, &pin);
    lifecycle.start().await.unwrap();

    let result = timeout(
        TEST_TIMEOUT,
        lifecycle.run_until(std::future::pending::<()>()),
    )
    .await
    .expect("run_until should stop on a rejected subscription");

    assert!(matches!(
        result,
        Err(AgentError::SubscriptionRejected { .. })
    ));

    let after = timeout(TEST_TIMEOUT, broker_task).await.unwrap().unwrap();
    assert_eq!(after.last(), Some(&ClientPacket::Disconnect));
}
