// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT transport using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::time::Duration;

use hermes_lib::protocol::MqttMessenger;
use hermes_lib::{Coordinator, CoordinatorConfig, DeviceId};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::time::sleep;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(19850);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    sleep(Duration::from_millis(500)).await;
}

async fn connect(port: u16) -> MqttMessenger {
    MqttMessenger::builder()
        .host("127.0.0.1")
        .port(port)
        .build()
        .await
        .expect("failed to connect to mock broker")
}

fn device() -> DeviceId {
    "AA:BB:CC:DD:EE:FF".parse().unwrap()
}

#[tokio::test]
async fn connect_to_broker() {
    let port = get_test_port();
    start_mock_broker(port).await;

    let messenger = connect(port).await;

    assert!(messenger.is_connected());
    assert_eq!(messenger.host(), "127.0.0.1");
    assert_eq!(messenger.port(), port);
}

#[tokio::test]
async fn connect_to_missing_broker_times_out() {
    let result = MqttMessenger::builder()
        .host("127.0.0.1")
        .port(get_test_port())
        .connection_timeout(Duration::from_millis(300))
        .build()
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn attach_and_request() {
    let port = get_test_port();
    start_mock_broker(port).await;

    let dir = tempfile::tempdir().unwrap();
    let coordinator = Coordinator::new(CoordinatorConfig::default().with_models_dir(dir.path()));
    let messenger = connect(port).await;

    messenger.attach(&coordinator).await.unwrap();

    coordinator
        .request_new_model(&messenger, &device())
        .await
        .unwrap();
    coordinator
        .request_new_interval(&messenger, &device())
        .await
        .unwrap();
    assert!(coordinator.ping_server(&messenger, &device()).await);

    messenger.detach().await;
    messenger.disconnect().await.unwrap();
    coordinator.shutdown().await;
}
