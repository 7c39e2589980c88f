//! Request-scoped diagnostic context (MDC) enrichment.
//!
//! An [`Operation`] declares a handler's parameters and marks the ones whose
//! values should appear in the logs. [`Operation::wrap`] turns it into a
//! handler that, for every request:
//!
//! 1. refuses to run outside a request scope ([`Error::Misuse`](crate::Error::Misuse)),
//! 2. extracts each marked argument, optionally through a [`JsonPath`],
//! 3. publishes the non-null ones under [`KEY_MDC_LOGGING`] as
//!    `{label=value, ...}` in declaration order,
//! 4. runs the handler,
//! 5. clears the request's [`DiagnosticContext`], however the handler ended.
//!
//! ```text
//! GET /hello?name=pepe&title=sr
//!   Operation::new("HelloController", "greet")
//!       .param(Param::query("name").mdc("testKey"))
//!       .param(Param::query("title").mdc("AnotherKey"))
//!   → mdcLogging={testKey=pepe, AnotherKey=sr} on every event the handler logs
//! ```
//!
//! [`MdcFormat`](crate::logging::MdcFormat) is the sink that renders the
//! context on log lines.

mod context;
mod interceptor;
mod operation;
mod path;

pub use context::DiagnosticContext;
pub use interceptor::{KEY_MDC_LOGGING, LabelMap, intercept, label_map};
pub use operation::{Argument, Invocation, Marker, Operation, OperationId, Param, Source};
pub use path::{JsonPath, PathError, extract};
