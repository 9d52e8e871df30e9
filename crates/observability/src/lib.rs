use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clonchat_core::Intent;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Counters for the chat pipeline. One slot per intent, indexed in
/// `Intent::ALL` order.
#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    intent_totals: [AtomicU64; 8],
    processing_errors_total: AtomicU64,
    total_latency_micros: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub fallback_total: u64,
    pub processing_errors_total: u64,
    pub intents: BTreeMap<&'static str, u64>,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Counts one classified message under its intent.
    pub fn record_reply(&self, intent: Intent, latency: Duration) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.intent_totals[intent_slot(intent)].fetch_add(1, Ordering::Relaxed);
        self.total_latency_micros
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn inc_processing_error(&self) {
        self.processing_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_micros.load(Ordering::Relaxed);
        let intents: BTreeMap<&'static str, u64> = Intent::ALL
            .iter()
            .map(|intent| {
                let count = self.intent_totals[intent_slot(*intent)].load(Ordering::Relaxed);
                (intent.as_str(), count)
            })
            .collect();

        MetricsSnapshot {
            requests_total: requests,
            fallback_total: intents.get(Intent::General.as_str()).copied().unwrap_or(0),
            processing_errors_total: self.processing_errors_total.load(Ordering::Relaxed),
            intents,
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64 / 1_000.0
            },
        }
    }
}

fn intent_slot(intent: Intent) -> usize {
    Intent::ALL
        .iter()
        .position(|candidate| *candidate == intent)
        .unwrap_or(Intent::ALL.len() - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" | "text" | "pretty" => Ok(Self::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl LogFormat {
    /// Reads `CHATBOT_LOG_FORMAT`; anything unset or unrecognised means JSON.
    pub fn from_env() -> Self {
        std::env::var("CHATBOT_LOG_FORMAT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(Self::Json)
    }
}

pub fn default_filter(service_name: &str) -> String {
    format!("{service_name}=info,clonchat_api=info,tower_http=info")
}

/// Installs the global subscriber once; later calls are no-ops.
/// `RUST_LOG` overrides the default directives.
pub fn init_tracing(service_name: &str) {
    init_tracing_with(service_name, LogFormat::from_env());
}

pub fn init_tracing_with(service_name: &str, format: LogFormat) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(service_name)));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);

        match format {
            LogFormat::Json => builder
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .init(),
            LogFormat::Compact => builder.compact().init(),
        }
    });
}
