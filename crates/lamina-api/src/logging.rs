//! # Logging Pipeline
//!
//! Startup configuration for tracing: an env-filtered fmt layer with a
//! composable noise filter that drops access events for polling paths.
//! The filter is explicit state built here and attached to the sink, not
//! a mutated ambient singleton.

use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Filter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::state::Environment;

/// Target the access-log middleware emits under.
pub const ACCESS_TARGET: &str = "lamina_api::access";

/// Path markers whose access events are suppressed: liveness and metrics
/// polling.
pub const NOISE_MARKERS: [&str; 2] = ["/healthcheck", "/metrics"];

/// Sink-side filter dropping access events whose fields contain a marker.
///
/// Scoped to a single target: events from any other target, including the
/// error-level lines produced at the failure-normalization boundary, always
/// pass whatever their content.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    target: &'static str,
    markers: Vec<&'static str>,
}

impl NoiseFilter {
    /// Build a filter for `target` suppressing events that mention any of
    /// `markers`.
    pub fn new(target: &'static str, markers: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            target,
            markers: markers.into_iter().collect(),
        }
    }

    /// The gateway's standard configuration: suppress liveness and metrics
    /// polling noise on the access target.
    pub fn access_noise() -> Self {
        Self::new(ACCESS_TARGET, NOISE_MARKERS)
    }

    fn is_noise(&self, rendered: &str) -> bool {
        self.markers.iter().any(|marker| rendered.contains(marker))
    }
}

impl<S: Subscriber> Filter<S> for NoiseFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        if event.metadata().target() != self.target {
            return true;
        }
        let mut scan = MarkerScan {
            filter: self,
            hit: false,
        };
        event.record(&mut scan);
        !scan.hit
    }
}

/// Field visitor that checks rendered values against the marker list.
struct MarkerScan<'a> {
    filter: &'a NoiseFilter,
    hit: bool,
}

impl tracing::field::Visit for MarkerScan<'_> {
    fn record_str(&mut self, _field: &tracing::field::Field, value: &str) {
        if !self.hit {
            self.hit = self.filter.is_noise(value);
        }
    }

    fn record_debug(&mut self, _field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if !self.hit {
            self.hit = self.filter.is_noise(&format!("{value:?}"));
        }
    }
}

/// Install the process-wide logging pipeline.
///
/// In `dev`/`prod` the transport's own failure logging is silenced; failures
/// are reported exactly once, at the normalization boundary.
pub fn init(env: Environment) {
    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env.silences_transport_errors() {
        env_filter = env_filter.add_directive(
            "tower_http::trace=off"
                .parse()
                .expect("static directive parses"),
        );
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_filter(NoiseFilter::access_noise()))
        .init();
}
