//! Tracing subscriber and OpenTelemetry export for Scout processes.
//!
//! Call [`init_tracing`] once at startup, before the frame loop thread is
//! spawned.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL (e.g. `http://localhost:4318`). Enables span export over HTTP. |
//! | `RUST_LOG` | Log filter (default `"info"`). Per-frame details are logged at `debug`. |
//! | `SCOUT_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//!
//! # Spans
//!
//! Every frame of the control loop runs inside one [`FRAME_SPAN`] span
//! (see [`frame_span`]).  With an OTLP endpoint configured each frame is
//! exported as one trace, carrying:
//!
//! | Field | Recorded |
//! |---|---|
//! | `frame` | sequence number, starting at 1 |
//! | `camera` | id of the frame source |
//! | `outcome` | `processed`, `skipped` or `end_of_stream` |
//! | `confirmed` | confirmed objects after tracking |
//! | `intent` | movement decided in autonomous mode |
//!
//! # Example
//!
//! ```rust,no_run
//! let _guard = scout_runtime::telemetry::init_tracing("scout");
//! ```

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing::{Span, field};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "SCOUT_LOG_FORMAT";

/// Name of the span wrapping one frame of the control loop.
pub const FRAME_SPAN: &str = "scout.frame";

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Install the global `tracing` subscriber.
///
/// With `OTEL_EXPORTER_OTLP_ENDPOINT` set, spans are also exported to the
/// collector; without it only the console formatter is installed.
///
/// Hold the returned [`TracerProviderGuard`] until the process exits;
/// dropping it flushes pending spans.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = json_requested(std::env::var(LOG_FORMAT_ENV).ok().as_deref());

    let provider = build_provider(service_name);

    if let Some(ref p) = provider {
        let tracer = p.tracer(service_name.to_string());
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        if use_json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(otel_layer)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(otel_layer)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
    } else if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    }

    TracerProviderGuard(provider)
}

/// Open the span for frame `seq` captured from `camera`.
///
/// `outcome`, `confirmed` and `intent` start empty and are filled in by the
/// frame loop once the frame has been handled.
pub fn frame_span(seq: u64, camera: &str) -> Span {
    tracing::info_span!(
        "scout.frame",
        frame = seq,
        camera,
        outcome = field::Empty,
        confirmed = field::Empty,
        intent = field::Empty,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// RAII guard
// ─────────────────────────────────────────────────────────────────────────────

/// Shuts the OTel [`SdkTracerProvider`] down on drop.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// `true` when spans are being exported.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[scout] OpenTelemetry provider shutdown error: {e}");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

fn json_requested(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.eq_ignore_ascii_case("json"))
}

/// Build an [`SdkTracerProvider`] when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// Exporter errors are printed to stderr and yield `None`.
fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[scout] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // The frame loop is a plain thread; there is no async runtime to
            // host a batch exporter.
            .with_simple_exporter(exporter)
            .build(),
    )
}
