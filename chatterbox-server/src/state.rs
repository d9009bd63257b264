use chatterbox_sqlite::Database;
use eyre::{Result, WrapErr};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

pub struct AppState {
    pub(crate) db: Database,
    pub(crate) metrics: Metrics,
}

impl AppState {
    pub fn new(db: Database) -> Result<Self> {
        let metrics = Metrics::new().wrap_err("failed to create metrics")?;

        Ok(Self { db, metrics })
    }
}

pub(crate) struct Metrics {
    pub registry: Registry,
    pub request_count: IntCounterVec,
    pub response_time: HistogramVec,
}

impl Metrics {
    fn new() -> Result<Self, prometheus::Error> {
        let request_count = IntCounterVec::new(
            Opts::new("http_requests_total", "Number of handled http requests"),
            &["method", "path", "status"],
        )?;

        let response_time = HistogramVec::new(
            HistogramOpts::new("http_response_time_seconds", "Response times in seconds"),
            &["method", "path", "status"],
        )?;

        let registry = Registry::new_custom(Some(String::from("chatterbox")), None)?;

        registry.register(Box::new(request_count.clone()))?;
        registry.register(Box::new(response_time.clone()))?;

        Ok(Self {
            registry,
            request_count,
            response_time,
        })
    }
}
