/// Detector lifecycle and result-delivery invariants exercised through the
/// synthetic backend's instance accounting.
use pose_service::backend::synthetic::{SyntheticConfig, SyntheticPoseFactory};
use pose_service::backend::{ComputeDelegate, DetectorConfig, PoseModelFactory, RunningMode};
use pose_service::lifecycle::{DetectorManager, ManagerState};
use pose_service::PoseServiceState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn config_for(mode: RunningMode) -> DetectorConfig {
    DetectorConfig {
        running_mode: mode,
        ..DetectorConfig::default()
    }
}

fn gradient_image() -> common::frame::NormalizedImage {
    let mut image = common::frame::NormalizedImage::new(16, 16);
    for y in 0..16 {
        for x in 0..16 {
            let v = (x * 12 + y * 4) as u8;
            image.set_pixel(x, y, [v, v, v, 255]);
        }
    }
    image
}

#[tokio::test]
async fn at_most_one_detector_across_mode_switches() {
    let factory = Arc::new(SyntheticPoseFactory::default());
    let mut manager = DetectorManager::new(factory.clone());

    manager.ensure(config_for(RunningMode::Image), None).await.unwrap();
    assert_eq!(factory.open_instances(), 1);

    manager.ensure(config_for(RunningMode::Video), None).await.unwrap();
    assert_eq!(factory.open_instances(), 1);
    assert_eq!(factory.built_total(), 2);

    let (tx, _rx) = mpsc::unbounded_channel();
    manager
        .ensure(config_for(RunningMode::LiveStream), Some(tx))
        .await
        .unwrap();
    assert_eq!(factory.open_instances(), 1);
    assert_eq!(factory.built_total(), 3);

    manager.release().await.unwrap();
    assert_eq!(factory.open_instances(), 0);
}

#[tokio::test]
async fn live_stream_without_sink_is_a_configuration_error() {
    let factory = Arc::new(SyntheticPoseFactory::default());
    let mut manager = DetectorManager::new(factory.clone());

    let err = manager
        .configure(config_for(RunningMode::LiveStream), None)
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), "configuration_error");
    assert_eq!(factory.built_total(), 0);

    // Image mode without a sink is the valid combination.
    manager
        .configure(config_for(RunningMode::Image), None)
        .await
        .unwrap();
    assert_eq!(manager.state(), ManagerState::Ready);
}

#[tokio::test]
async fn failed_build_leaks_nothing_and_closes_the_manager() {
    let factory = Arc::new(SyntheticPoseFactory::default());
    let mut manager = DetectorManager::new(factory.clone());

    manager.ensure(config_for(RunningMode::Image), None).await.unwrap();
    assert_eq!(factory.open_instances(), 1);

    let gpu = DetectorConfig {
        delegate: ComputeDelegate::Gpu,
        ..DetectorConfig::default()
    };
    assert!(manager.configure(gpu, None).await.is_err());
    assert_eq!(manager.state(), ManagerState::Closed);
    assert_eq!(factory.open_instances(), 0);

    // The manager recovers on the next valid configuration.
    manager.ensure(config_for(RunningMode::Image), None).await.unwrap();
    assert_eq!(manager.state(), ManagerState::Ready);
    assert_eq!(factory.open_instances(), 1);
}

#[tokio::test]
async fn release_during_inflight_live_inference_abandons_the_result() {
    let factory = Arc::new(SyntheticPoseFactory::new(SyntheticConfig {
        simulated_delay_ms: 250,
        ..SyntheticConfig::default()
    }));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut model = factory
        .build(config_for(RunningMode::LiveStream), Some(tx))
        .await
        .unwrap();

    model.detect_async(gradient_image(), 99).await.unwrap();
    model.close().await.unwrap();
    drop(model);

    // The abandoned task drops its sender without delivering.
    assert!(rx.recv().await.is_none());
    assert_eq!(factory.open_instances(), 0);
}

#[tokio::test]
async fn service_state_keeps_single_instance_across_request_kinds() {
    let factory = Arc::new(SyntheticPoseFactory::default());
    let state = PoseServiceState::new("lifecycle-test".to_string(), factory.clone());

    let png = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    image::RgbaImage::from_fn(24, 24, |x, y| {
        let v = ((x * 8 + y * 4) % 256) as u8;
        image::Rgba([v, v, v, 255])
    })
    .save(png.path())
    .unwrap();

    let result = state
        .process_image(png.path().to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(result.landmarks.len(), 33);
    assert_eq!(factory.open_instances(), 1);

    // A live frame forces a mode switch: release first, then rebuild.
    let frame = common::frame::RawFrame {
        width: 8,
        height: 8,
        format: common::frame::FORMAT_YUV_420_888,
        planes: vec![
            common::frame::Plane::new(
                (0..64).map(|i| (i * 4) as u8).collect(),
                8,
                1,
            ),
            common::frame::Plane::new(vec![128u8; 16], 4, 1),
            common::frame::Plane::new(vec![128u8; 16], 4, 1),
        ],
        timestamp_ms: 5,
    };
    let result = state.process_camera_frame(frame, false, 0.0).await.unwrap();
    assert_eq!(result.landmarks.len(), 33);
    assert!(result.inference_time_ms < 10_000);
    assert_eq!(factory.open_instances(), 1);
    assert_eq!(factory.built_total(), 2);

    state.shutdown().await.unwrap();
    assert_eq!(factory.open_instances(), 0);
}

#[tokio::test]
async fn base_config_applies_until_reconfigured() {
    let factory = Arc::new(SyntheticPoseFactory::default());
    let strict = DetectorConfig {
        min_detection_confidence: 0.99,
        ..DetectorConfig::default()
    };
    let state =
        PoseServiceState::with_base_config("lifecycle-test".to_string(), factory, strict);

    let png = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    image::RgbaImage::from_fn(24, 24, |x, y| {
        let v = ((x * 8 + y * 4) % 256) as u8;
        image::Rgba([v, v, v, 255])
    })
    .save(png.path())
    .unwrap();
    let path = png.path().to_str().unwrap();

    // The synthetic backend never reaches a 0.99 confidence.
    let result = state.process_image(path).await.unwrap();
    assert!(result.landmarks.is_empty());

    state
        .configure_detector(DetectorConfig::default())
        .await
        .unwrap();
    let result = state.process_image(path).await.unwrap();
    assert_eq!(result.landmarks.len(), 33);
}

#[tokio::test]
async fn reconfiguration_fails_a_pending_live_request() {
    let factory = Arc::new(SyntheticPoseFactory::new(SyntheticConfig {
        simulated_delay_ms: 400,
        ..SyntheticConfig::default()
    }));
    let state = PoseServiceState::new("lifecycle-test".to_string(), factory.clone());

    let frame = common::frame::RawFrame {
        width: 8,
        height: 8,
        format: 0,
        planes: vec![common::frame::Plane::new(
            (0..64).map(|i| (i * 4) as u8).collect(),
            8,
            1,
        )],
        timestamp_ms: 1,
    };

    let live = {
        let state = state.clone();
        tokio::spawn(async move { state.process_camera_frame(frame, false, 0.0).await })
    };

    // Give the live submission time to claim its slot.
    tokio::time::sleep(Duration::from_millis(100)).await;

    state
        .configure_detector(config_for(RunningMode::Image))
        .await
        .unwrap();

    let outcome = live.await.unwrap();
    let err = outcome.err().unwrap();
    assert_eq!(err.kind(), "processing_error");
    assert_eq!(factory.open_instances(), 1);
}
