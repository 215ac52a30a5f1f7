use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Bearer validation
    pub token_validations: IntCounterVec,
    pub provider_key_fetches: IntCounterVec,

    // Session token broker
    pub directline_requests: IntCounterVec,
    pub directline_duration: HistogramVec,

    // Config/runtime
    pub config_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("directline_broker".into()), None)
            .expect("static registry prefix is valid");

        let metrics: Arc<Metrics> = Arc::new(Self {
            token_validations: IntCounterVec::new(Opts::new("token_validations_total", "Bearer token validations by outcome"), &["outcome"]).expect("metric"),
            provider_key_fetches: IntCounterVec::new(Opts::new("provider_key_fetches_total", "Identity provider metadata/JWKS fetches by outcome"), &["outcome"]).expect("metric"),

            directline_requests: IntCounterVec::new(Opts::new("directline_requests_total", "Session token requests to the gateway by outcome"), &["outcome"]).expect("metric"),
            directline_duration: HistogramVec::new(HistogramOpts::new("directline_request_duration_seconds", "Gateway round trip seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["outcome"]).expect("metric"),

            config_errors: IntCounter::new("config_validation_errors_total", "Validation issues found during startup").expect("metric"),
            up: IntGauge::new("up", "1 if service is serving").expect("metric"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.token_validations.clone()),
            Box::new(metrics.provider_key_fetches.clone()),
            Box::new(metrics.directline_requests.clone()),
            Box::new(metrics.directline_duration.clone()),
            Box::new(metrics.config_errors.clone()),
            Box::new(metrics.up.clone()),
        ];
        for collector in collectors {
            reg.register(collector).expect("metric names are unique");
        }

        metrics
    }
}
