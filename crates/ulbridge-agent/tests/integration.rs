use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use ulbridge_agent::{ChannelHandler, CommandRouter, MqttConfig, MqttTransport, Transport};
use ulbridge_core::{BridgeEvent, ConfigValue};
use uuid::Uuid;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn set_config_is_acknowledged_over_mqtt() {
    if std::env::var("ULBRIDGE_INTEGRATION").is_err() {
        eprintln!("Skipping integration test; set ULBRIDGE_INTEGRATION=1 to run");
        return;
    }

    let broker = std::env::var("ULBRIDGE_MQTT_BROKER")
        .unwrap_or_else(|_| "tcp://localhost:1883".to_string());
    let device_id = format!("it-{}", Uuid::new_v4().simple());
    let command_topic = format!("/default/{device_id}/cmd");
    let ack_topic = format!("{command_topic}exe");

    // Bridge side
    let config = MqttConfig {
        broker: broker.clone(),
        ..Default::default()
    };
    let (transport, mut eventloop) = MqttTransport::new(&config).unwrap();
    MqttTransport::connect(&mut eventloop, config.connect_timeout)
        .await
        .unwrap();
    let (mut messages, poll_task) = MqttTransport::start(eventloop);
    transport.subscribe(&command_topic).await.unwrap();

    let (handler, mut events) = ChannelHandler::new();
    let router = CommandRouter::new(transport.clone(), Arc::new(handler));
    tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            router.route(&message.topic, &message.payload).await;
        }
    });

    // Device side
    let device_config = MqttConfig {
        broker,
        client_id: format!("device-{}", Uuid::new_v4()),
        ..Default::default()
    };
    let (device, mut device_eventloop) = MqttTransport::new(&device_config).unwrap();
    MqttTransport::connect(&mut device_eventloop, device_config.connect_timeout)
        .await
        .unwrap();
    let (mut acks, _device_task) = MqttTransport::start(device_eventloop);
    device.subscribe(&ack_topic).await.unwrap();

    // Let both subscriptions settle before publishing.
    tokio::time::sleep(Duration::from_millis(500)).await;

    device
        .publish(
            &command_topic,
            format!("{device_id}@setConfig|sensor_id=3|event_flags=1|time_sec=60"),
        )
        .await
        .unwrap();

    let ack = timeout(Duration::from_secs(10), acks.recv())
        .await
        .expect("ack timed out")
        .expect("device event loop stopped");
    assert_eq!(ack.topic, ack_topic);
    assert_eq!(ack.payload, "default@setConfig|");

    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event timed out")
        .expect("handler channel closed");
    let BridgeEvent::ConfigUpdated(update) = event else {
        panic!("expected config event, got {event:?}");
    };
    assert_eq!(update.id, "default");
    assert_eq!(update.config[0]["time_sec"], ConfigValue::Integer(60));

    // The event loop must not reconnect after a requested disconnect.
    transport.disconnect().await.unwrap();
    timeout(Duration::from_secs(5), poll_task)
        .await
        .expect("event loop kept running after disconnect")
        .unwrap();
}
