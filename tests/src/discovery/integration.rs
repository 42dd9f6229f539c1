#![cfg(target_os = "linux")]
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use motorlink_common::config::{RelayConfig, ScanConfig};
use motorlink_common::device::{DiscoveredDevice, ResponseBody};
use motorlink_common::network::range::Subnet24;
use motorlink_common::network::target::Target;
use motorlink_core::discovery::DiscoverySession;
use motorlink_core::relay::{CommandRelay, MotorCommand, RelayError};

use crate::utils::{self, LOOPBACK_PREFIX, loopback};

fn scan_config(port: u16) -> ScanConfig {
    ScanConfig {
        target: Target::Subnet {
            subnet: Subnet24::new(LOOPBACK_PREFIX),
        },
        device_port: port,
        probe_timeout: Duration::from_secs(2),
        task_timeout: Duration::from_millis(500),
        ..ScanConfig::default()
    }
}

fn relay_config(port: u16) -> RelayConfig {
    RelayConfig {
        device_port: port,
        command_timeout: Duration::from_secs(2),
        status_timeout: Duration::from_secs(2),
        ..RelayConfig::default()
    }
}

fn device_ips(devices: &[DiscoveredDevice]) -> HashSet<Ipv4Addr> {
    devices.iter().map(|device| device.ip).collect()
}

/*************************************************************
                     Sweep over loopback
**************************************************************/

#[tokio::test]
async fn finds_single_controller() {
    let (listener, port) = utils::bind_any(42).await.unwrap();
    let _device = utils::spawn_device(listener, "uno-r4");

    let session = DiscoverySession::new(&scan_config(port)).unwrap();
    let snapshot = session.scan().await;

    assert_eq!(snapshot.devices().len(), 1, "devices: {:?}", snapshot.devices());
    let device = &snapshot.devices()[0];
    assert_eq!(device.ip, loopback(42));
    assert_eq!(device.endpoint, "/status");
    assert!(matches!(device.response, ResponseBody::Json(_)));
    assert_eq!(session.selected_ip().await, Some(loopback(42)));
}

#[tokio::test]
async fn empty_network_leaves_no_target() {
    // Reserve a port nobody listens on.
    let port = {
        let (_listener, port) = utils::bind_any(1).await.unwrap();
        port
    };

    let session = DiscoverySession::new(&scan_config(port)).unwrap();
    let snapshot = session.scan().await;

    assert!(snapshot.is_empty());
    assert!(snapshot.selected().is_none());
    assert_eq!(snapshot.subnet(), Some(Subnet24::new(LOOPBACK_PREFIX)));

    let relay = CommandRelay::new(&relay_config(port)).unwrap();
    let err = relay
        .send_command(&session, MotorCommand::Arm)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::NoTarget), "got {err:?}");
}

#[tokio::test]
async fn two_controllers_select_one_of_them() {
    let (first, port) = utils::bind_any(5).await.unwrap();
    let second = utils::bind(9, port).await.unwrap();
    let _a = utils::spawn_device(first, "left");
    let _b = utils::spawn_device(second, "right");

    let session = DiscoverySession::new(&scan_config(port)).unwrap();
    let snapshot = session.scan().await;

    let expected: HashSet<Ipv4Addr> = [loopback(5), loopback(9)].into();
    assert_eq!(snapshot.devices().len(), 2);
    assert_eq!(device_ips(snapshot.devices()), expected);

    let selected = snapshot.selected().map(|device| device.ip).unwrap();
    assert!(expected.contains(&selected));
    assert_eq!(snapshot.devices()[0].ip, selected);
}

#[tokio::test]
async fn repeated_scans_find_the_same_set() {
    let (first, port) = utils::bind_any(5).await.unwrap();
    let second = utils::bind(9, port).await.unwrap();
    let _a = utils::spawn_device(first, "left");
    let _b = utils::spawn_device(second, "right");

    let session = DiscoverySession::new(&scan_config(port)).unwrap();
    let once = session.scan().await;
    let twice = session.scan().await;

    assert_eq!(twice.generation(), once.generation() + 1);
    assert_eq!(device_ips(once.devices()), device_ips(twice.devices()));
}

#[tokio::test]
async fn silent_host_does_not_stall_the_sweep() {
    let (device, port) = utils::bind_any(42).await.unwrap();
    let tarpit = utils::bind(7, port).await.unwrap();
    let _device = utils::spawn_device(device, "uno-r4");
    let _tarpit = utils::spawn_tarpit(tarpit);

    let cfg = scan_config(port);
    let session = DiscoverySession::new(&cfg).unwrap();

    let start = Instant::now();
    let snapshot = session.scan().await;
    let elapsed = start.elapsed();

    assert!(
        elapsed < cfg.task_timeout * 4,
        "sweep took {elapsed:?} with a {:?} task timeout",
        cfg.task_timeout
    );
    assert_eq!(device_ips(snapshot.devices()), [loopback(42)].into());
}

#[tokio::test]
async fn progress_reports_each_hit() {
    let (first, port) = utils::bind_any(5).await.unwrap();
    let second = utils::bind(9, port).await.unwrap();
    let _a = utils::spawn_device(first, "left");
    let _b = utils::spawn_device(second, "right");

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let session = DiscoverySession::new(&scan_config(port))
        .unwrap()
        .with_progress(Arc::new(move |count: usize| sink.lock().unwrap().push(count)));

    session.scan().await;

    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

/*************************************************************
                   Relay to a discovered device
**************************************************************/

#[tokio::test]
async fn relays_command_to_detected_device() {
    let (listener, port) = utils::bind_any(42).await.unwrap();
    let _device = utils::spawn_device(listener, "uno-r4");

    let session = DiscoverySession::new(&scan_config(port)).unwrap();
    session.scan().await;

    let relay = CommandRelay::new(&relay_config(port)).unwrap();
    let receipt = relay
        .send_command(&session, MotorCommand::RunMotor2)
        .await
        .unwrap();

    assert_eq!(receipt.ip, loopback(42));
    assert_eq!(receipt.command, 3);
    match receipt.response {
        ResponseBody::Json(body) => assert_eq!(body["received"], 3),
        other => panic!("expected JSON reply, got {other:?}"),
    }

    let report = relay.test_connection(&session).await.unwrap();
    assert_eq!(report.ip, loopback(42));
}

#[tokio::test]
async fn fallback_address_is_used_without_scan() {
    let (listener, port) = utils::bind_any(42).await.unwrap();
    let _device = utils::spawn_device(listener, "uno-r4");

    let session = DiscoverySession::new(&scan_config(port)).unwrap();
    let relay = CommandRelay::new(&RelayConfig {
        fallback_ip: Some(loopback(42)),
        ..relay_config(port)
    })
    .unwrap();

    let receipt = relay.send_command(&session, MotorCommand::Off).await.unwrap();
    assert_eq!(receipt.ip, loopback(42));
    assert_eq!(receipt.command, 0);
}
