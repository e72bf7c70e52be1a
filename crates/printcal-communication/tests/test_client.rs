mod common;

use common::{wait_until, MockDevice};
use parking_lot::Mutex;
use printcal_communication::{ClientConfig, PrinterClient, TransportConfig, ZOffsetCalibration};
use printcal_core::{BedLevelEvent, Error, RoutineError, TelemetrySample, TemperatureReading};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const PORT: &str = "/dev/ttyUSB0";

fn client_with_timeout(device: &MockDevice, leveling_timeout: Duration) -> PrinterClient {
    let config = ClientConfig {
        transport: TransportConfig {
            read_timeout: Duration::from_millis(10),
            error_backoff: Duration::from_millis(10),
            read_buffer_size: 256,
        },
        leveling_timeout,
    };
    PrinterClient::with_opener(device.opener(), config)
}

fn connected_client(device: &MockDevice) -> PrinterClient {
    let client = client_with_timeout(device, Duration::from_secs(5));
    client.connect(PORT, 250000).unwrap();
    client
}

fn record_bed_events(client: &PrinterClient) -> Arc<Mutex<Vec<BedLevelEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    client.add_bed_level_listener(move |event: &BedLevelEvent| sink.lock().push(event.clone()));
    events
}

fn sent(device: &MockDevice) -> Vec<String> {
    device
        .written()
        .iter()
        .map(|line| line.trim_end().to_string())
        .collect()
}

#[test]
fn test_operation_commands() {
    let device = MockDevice::new();
    let client = connected_client(&device);

    client.move_to_z(-0.15).unwrap();
    client.apply_z_offset(-1.2).unwrap();
    client.save_settings().unwrap();
    client.preheat_hotend(210.0).unwrap();
    client.preheat_bed(60.0).unwrap();
    client.print_validation_pattern().unwrap();

    assert_eq!(
        sent(&device),
        vec![
            "G0 Z-0.150",
            "M851 Z-1.200",
            "M500",
            "M104 S210",
            "M140 S60",
            "G26 H220 P0.5 L0.15",
        ]
    );
    client.disconnect().unwrap();
}

#[test]
fn test_invalid_parameter_sends_nothing() {
    let device = MockDevice::new();
    let client = connected_client(&device);

    assert!(matches!(
        client.move_to_z(f64::NAN),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(client.preheat_bed(f64::INFINITY).is_err());
    assert!(device.written().is_empty());
    client.disconnect().unwrap();
}

#[test]
fn test_reset_sequence_stops_at_first_failure() {
    let device = MockDevice::new();
    let client = connected_client(&device);
    device.fail_writes_after(1);

    assert!(client.reset_z_offset().is_err());
    assert_eq!(sent(&device), vec!["M851 Z0"]);
    client.disconnect().unwrap();
}

#[test]
fn test_operations_require_connection() {
    let device = MockDevice::new();
    let client = client_with_timeout(&device, Duration::from_secs(5));

    let error = client.reset_z_offset().unwrap_err();
    assert!(error.is_not_connected());
    assert!(client.save_settings().is_err());
}

#[test]
fn test_raw_traffic_reaches_log_listeners() {
    let device = MockDevice::new();
    let client = connected_client(&device);
    let log = Arc::new(Mutex::new(String::new()));
    let sink = log.clone();
    client.add_log_listener(move |text: &String| sink.lock().push_str(text));

    device.push("echo:Marlin 2.1");
    device.push(".2\nok\n");

    assert!(wait_until(|| log.lock().as_str() == "echo:Marlin 2.1.2\nok\n"));
    client.disconnect().unwrap();
}

#[test]
fn test_telemetry_requires_monitoring() {
    let device = MockDevice::new();
    let client = connected_client(&device);
    let samples = Arc::new(Mutex::new(Vec::<TelemetrySample>::new()));
    let sink = samples.clone();
    client.add_telemetry_listener(move |sample: &TelemetrySample| sink.lock().push(sample.clone()));

    let log = Arc::new(Mutex::new(String::new()));
    let log_sink = log.clone();
    client.add_log_listener(move |text: &String| log_sink.lock().push_str(text));

    device.push("T:25.0 /0.0 B:24.0 /0.0\n");
    device.push("marker\n");
    assert!(wait_until(|| log.lock().contains("marker")));
    assert!(samples.lock().is_empty());

    client.start_temperature_monitoring().unwrap();
    assert!(client.is_monitoring());
    device.push("T:200.1 /210.0 ");
    device.push("B:59.8 /60.0\n");

    assert!(wait_until(|| samples.lock().len() == 1));
    let sample = samples.lock()[0].clone();
    assert_eq!(sample.hotend, Some(TemperatureReading::new("200.1", "210.0")));
    assert_eq!(sample.bed, Some(TemperatureReading::new("59.8", "60.0")));

    client.stop_temperature_monitoring().unwrap();
    assert!(!client.is_monitoring());
    assert_eq!(sent(&device), vec!["M155 S1", "M155 S0"]);
    client.disconnect().unwrap();
}

#[test]
fn test_read_errors_reach_log_listeners() {
    let device = MockDevice::new();
    let client = connected_client(&device);
    let log = Arc::new(Mutex::new(String::new()));
    let sink = log.clone();
    client.add_log_listener(move |text: &String| sink.lock().push_str(text));

    device.push_error(std::io::ErrorKind::Other);

    assert!(wait_until(|| log.lock().as_str() == "Read error: device glitch\n"));
    assert!(client.is_connected());
    client.disconnect().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bed_leveling_completes() {
    let device = MockDevice::new();
    let client = Arc::new(connected_client(&device));
    let events = record_bed_events(&client);

    let run = tokio::spawn({
        let client = client.clone();
        async move { client.run_bed_leveling().await }
    });

    assert!(wait_until(|| device.written().len() == 8));
    assert!(client.is_leveling());
    assert_eq!(
        sent(&device),
        vec!["M501", "M851", "G28", "G29 P1", "G29 P3", "G29 S0", "G29 L0", "M420 S1"]
    );

    device.push("echo:Mesh invalidated. Probing mesh.\n");
    device.push("Probing mesh point 1/100.\n");
    device.push("T:210.0 /210.0 B:60.0 /60.0\n");
    device.push("Mesh saved in slot 0.\n");
    device.push("Done.\n");

    let result = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("leveling did not finish")
        .unwrap();
    assert!(result.is_ok());
    assert!(!client.is_leveling());

    let events = events.lock().clone();
    assert_eq!(events.first(), Some(&BedLevelEvent::Started));
    assert_eq!(events.last(), Some(&BedLevelEvent::Completed));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.contains(&BedLevelEvent::Status(
        "Probing mesh point 1/100.".to_string()
    )));
    client.disconnect().unwrap();
}

#[tokio::test]
async fn test_bed_leveling_times_out() {
    let device = MockDevice::new();
    let client = client_with_timeout(&device, Duration::from_millis(100));
    client.connect(PORT, 250000).unwrap();
    let events = record_bed_events(&client);

    let error = client.run_bed_leveling().await.unwrap_err();
    assert!(error.is_timeout());
    assert!(matches!(
        error,
        Error::Routine(RoutineError::Timeout { timeout_ms: 100 })
    ));

    // output arriving after the deadline belongs to no session
    device.push("Probing mesh point 1\nMesh saved\nDone.\n");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        *events.lock(),
        vec![BedLevelEvent::Started, BedLevelEvent::TimedOut]
    );
    client.disconnect().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_mesh_saved_does_not_complete() {
    let device = MockDevice::new();
    let client = Arc::new(client_with_timeout(&device, Duration::from_millis(400)));
    client.connect(PORT, 250000).unwrap();

    let run = tokio::spawn({
        let client = client.clone();
        async move { client.run_bed_leveling().await }
    });
    assert!(wait_until(|| device.written().len() == 8));

    device.push("Mesh saved in slot 0.\n");
    device.push("Done.\n");

    let result = run.await.unwrap();
    assert!(result.unwrap_err().is_timeout());
    client.disconnect().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_leveling_run_is_rejected() {
    let device = MockDevice::new();
    let client = Arc::new(client_with_timeout(&device, Duration::from_millis(300)));
    client.connect(PORT, 250000).unwrap();

    let run = tokio::spawn({
        let client = client.clone();
        async move { client.run_bed_leveling().await }
    });
    assert!(wait_until(|| client.is_leveling()));

    let second = client.run_bed_leveling().await;
    assert!(matches!(
        second,
        Err(Error::Routine(RoutineError::AlreadyRunning))
    ));

    assert!(run.await.unwrap().is_err());
    assert!(!client.is_leveling());
    client.disconnect().unwrap();
}

#[tokio::test]
async fn test_bed_leveling_without_connection_fails() {
    let device = MockDevice::new();
    let client = client_with_timeout(&device, Duration::from_secs(5));
    let events = record_bed_events(&client);

    let error = client.run_bed_leveling().await.unwrap_err();
    match error {
        Error::Routine(RoutineError::CommandFailure { command, .. }) => {
            assert_eq!(command, "M501")
        }
        other => panic!("expected CommandFailure, got {:?}", other),
    }

    let events = events.lock().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], BedLevelEvent::Started);
    assert!(matches!(events[1], BedLevelEvent::Failed(_)));
    assert!(!client.is_leveling());
}

#[test]
fn test_z_offset_calibration_flow() {
    let device = MockDevice::new();
    let client = connected_client(&device);
    let mut calibration = ZOffsetCalibration::new(&client);

    assert!(!calibration.is_armed());
    assert!(calibration.jog(-0.1).is_err());
    assert!(calibration.apply().is_err());
    assert!(device.written().is_empty());

    calibration.reset().unwrap();
    assert!(calibration.is_armed());
    calibration.jog(-1.0).unwrap();
    calibration.jog(-0.1).unwrap();
    let z = calibration.jog(-0.05).unwrap();
    assert!((z + 1.15).abs() < 1e-9);

    let applied = calibration.apply().unwrap();
    assert!((applied + 1.15).abs() < 1e-9);
    assert!(!calibration.is_armed());

    assert_eq!(
        sent(&device),
        vec![
            "M851 Z0",
            "G28",
            "G0 Z0",
            "G0 Z-1.000",
            "G0 Z-1.100",
            "G0 Z-1.150",
            "M851 Z-1.150",
            "M500",
        ]
    );
    client.disconnect().unwrap();
}

#[test]
fn test_failed_jog_keeps_position() {
    let device = MockDevice::new();
    let client = connected_client(&device);
    let mut calibration = ZOffsetCalibration::new(&client);
    calibration.reset().unwrap();
    calibration.jog(-0.1).unwrap();

    device.fail_writes_after(0);
    assert!(calibration.jog(-0.1).is_err());
    assert!((calibration.current_z() + 0.1).abs() < 1e-9);
    client.disconnect().unwrap();
}

#[tokio::test]
async fn test_back_to_back_leveling_runs_get_full_window() {
    let device = MockDevice::new();
    let client = client_with_timeout(&device, Duration::from_millis(150));
    client.connect(PORT, 250000).unwrap();

    for _ in 0..2 {
        let start = Instant::now();
        assert!(client.run_bed_leveling().await.unwrap_err().is_timeout());
        assert!(start.elapsed() >= Duration::from_millis(140));
        assert!(!client.is_leveling());
    }
    client.disconnect().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_started_from_timeout_listener_keeps_its_session() {
    let device = MockDevice::new();
    let client = Arc::new(client_with_timeout(&device, Duration::from_millis(300)));
    client.connect(PORT, 250000).unwrap();

    let follow_up = Arc::new(Mutex::new(None));
    {
        let weak = Arc::downgrade(&client);
        let follow_up = follow_up.clone();
        let handle = tokio::runtime::Handle::current();
        let restarted = AtomicBool::new(false);
        client.add_bed_level_listener(move |event: &BedLevelEvent| {
            if *event != BedLevelEvent::TimedOut || restarted.swap(true, Ordering::SeqCst) {
                return;
            }
            let Some(client) = weak.upgrade() else {
                return;
            };
            let run = handle.spawn({
                let client = client.clone();
                async move {
                    let start = Instant::now();
                    let result = client.run_bed_leveling().await;
                    (result, start.elapsed())
                }
            });
            *follow_up.lock() = Some(run);
            assert!(wait_until(|| client.is_leveling()));
        });
    }

    assert!(client.run_bed_leveling().await.unwrap_err().is_timeout());
    assert!(client.is_leveling());

    let run = follow_up.lock().take().expect("second run was not started");
    let (result, elapsed) = run.await.unwrap();
    assert!(result.unwrap_err().is_timeout());
    assert!(elapsed >= Duration::from_millis(250));
    assert!(!client.is_leveling());
    client.disconnect().unwrap();
}
