//! Log output enriched with the request's diagnostic context.
//!
//! [`MdcFormat`] wraps any `tracing_subscriber` event formatter and prefixes
//! each line with the entries of the current request's
//! [`DiagnosticContext`](crate::middleware::mdc::DiagnosticContext):
//!
//! ```text
//! mdcLogging={testKey=pepe} 2026-01-01T00:00:00Z  INFO hello_world: saying hello
//! ```
//!
//! Events emitted outside a request scope, or while the context is empty,
//! are formatted exactly as the wrapped formatter would.

use std::fmt::{self, Write as _};

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{Format, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::middleware::mdc::DiagnosticContext;

/// Event formatter that prepends the diagnostic context to `F`'s output.
#[derive(Debug, Clone)]
pub struct MdcFormat<F = Format> {
    inner: F,
}

impl<F> MdcFormat<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<S, N, F> FormatEvent<S, N> for MdcFormat<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        if let Some(mdc) = DiagnosticContext::current() {
            for (key, value) in mdc.snapshot() {
                write!(writer, "{key}={value} ")?;
            }
        }
        self.inner.format_event(ctx, writer, event)
    }
}

/// Installs the global subscriber: `RUST_LOG` filtering (default `info`)
/// and human-readable lines carrying the diagnostic context.
///
/// # Panics
///
/// Panics if a global subscriber is already set.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().event_format(MdcFormat::new(tracing_subscriber::fmt::format())))
        .init();
}
