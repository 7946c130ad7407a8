use lazy_static::lazy_static;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ==== Frame Conversion Metrics ====
    pub static ref POSE_FRAMES_CONVERTED: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "pose_frames_converted_total",
                "Total number of raw frames converted to RGBA",
            ),
            &["path"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref POSE_CONVERSION_SKIPPED_PIXELS: IntCounter = {
        let metric = IntCounter::new(
            "pose_conversion_skipped_pixels_total",
            "Total pixels skipped because a stride-derived index was out of bounds",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    // ==== Request Metrics ====
    pub static ref POSE_REQUESTS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "pose_requests_total",
                "Total number of pose requests by category and outcome",
            ),
            &["category", "status"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref POSE_PENDING_REJECTIONS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "pose_pending_rejections_total",
                "Requests rejected because their category slot was occupied",
            ),
            &["category"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref POSE_INFERENCE_LATENCY: HistogramVec = {
        let metric = HistogramVec::new(
            HistogramOpts::new(
                "pose_inference_latency_seconds",
                "Wall-clock inference latency",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["mode"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref POSE_LIVE_RESULTS_DROPPED: IntCounter = {
        let metric = IntCounter::new(
            "pose_live_results_dropped_total",
            "Live results discarded because no pending handle was waiting",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    // ==== Detector Lifecycle Metrics ====
    pub static ref POSE_ACTIVE_DETECTORS: IntGauge = {
        let metric = IntGauge::new(
            "pose_active_detectors",
            "Number of live detector instances (at most one by contract)",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref POSE_DETECTOR_BUILDS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "pose_detector_builds_total",
                "Detector construction attempts by outcome",
            ),
            &["status"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref POSE_DETECTOR_RELEASES: IntCounter = {
        let metric = IntCounter::new(
            "pose_detector_releases_total",
            "Total detector release operations",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };
}

/// Helper function to encode metrics for Prometheus scraping
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_metrics_accessible() {
        POSE_FRAMES_CONVERTED
            .with_label_values(&["full_color"])
            .inc();
        assert!(
            POSE_FRAMES_CONVERTED
                .with_label_values(&["full_color"])
                .get()
                >= 1
        );

        POSE_CONVERSION_SKIPPED_PIXELS.inc_by(3);
        assert!(POSE_CONVERSION_SKIPPED_PIXELS.get() >= 3);
    }

    #[test]
    fn test_detector_metrics_accessible() {
        POSE_ACTIVE_DETECTORS.set(1);
        assert_eq!(POSE_ACTIVE_DETECTORS.get(), 1);
        POSE_ACTIVE_DETECTORS.set(0);

        POSE_DETECTOR_BUILDS.with_label_values(&["ok"]).inc();
        assert!(POSE_DETECTOR_BUILDS.with_label_values(&["ok"]).get() >= 1);
    }

    #[test]
    fn test_request_metrics_accessible() {
        POSE_REQUESTS
            .with_label_values(&["image", "ok"])
            .inc();
        assert!(POSE_REQUESTS.with_label_values(&["image", "ok"]).get() >= 1);

        POSE_INFERENCE_LATENCY
            .with_label_values(&["image"])
            .observe(0.02);
    }

    #[test]
    fn test_encode_metrics_succeeds() {
        // Just verify that encoding doesn't panic
        let _encoded = encode_metrics().expect("metrics should encode");
    }
}
