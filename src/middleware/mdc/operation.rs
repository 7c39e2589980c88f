//! The registration table: which handler parameters feed the context.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use super::interceptor::intercept;
use super::path::JsonPath;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::IntoResponse;

/// Identifies an operation in error messages, like a class and method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationId {
    pub target: String,
    pub method: String,
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.target, self.method)
    }
}

/// Where a declared parameter gets its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Query(String),
    Path(String),
    Header(String),
    /// The request body, parsed as JSON only if a path expression needs it.
    JsonBody,
}

/// Marks a parameter for inclusion under `label`.
#[derive(Debug, Clone)]
pub struct Marker {
    pub(crate) label: String,
    pub(crate) path: Option<JsonPath>,
}

/// One declared parameter of an operation.
#[derive(Debug, Clone)]
pub struct Param {
    pub(crate) source: Source,
    pub(crate) marker: Option<Marker>,
}

impl Param {
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(Source::Query(name.into()))
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self::new(Source::Path(name.into()))
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(Source::Header(name.into()))
    }

    pub fn json_body() -> Self {
        Self::new(Source::JsonBody)
    }

    fn new(source: Source) -> Self {
        Self { source, marker: None }
    }

    /// Publish the whole argument under `label`.
    pub fn mdc(mut self, label: impl Into<String>) -> Self {
        self.marker = Some(Marker { label: label.into(), path: None });
        self
    }

    /// Publish the node addressed by `path` under `label`. An empty `path`
    /// publishes the whole argument.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid expression. Registration happens at
    /// startup, so this surfaces before the first request.
    pub fn mdc_path(mut self, label: impl Into<String>, path: &str) -> Self {
        let path = (!path.is_empty()).then(|| {
            JsonPath::parse(path).unwrap_or_else(|e| panic!("{e}"))
        });
        self.marker = Some(Marker { label: label.into(), path });
        self
    }

    fn bind(&self, req: &Request) -> Argument {
        let text = |v: Option<&str>| v.map_or(Argument::Absent, |v| Argument::Value(Value::String(v.to_owned())));
        match &self.source {
            Source::Query(name) => text(req.query(name)),
            Source::Path(name) => text(req.param(name)),
            Source::Header(name) => text(req.header(name)),
            Source::JsonBody if req.body().is_empty() => Argument::Absent,
            Source::JsonBody => Argument::Raw(req.body_bytes()),
        }
    }
}

/// An actual argument value for one call.
#[derive(Debug, Clone)]
pub enum Argument {
    Absent,
    Value(Value),
    /// Unparsed bytes; turned into structured form only on demand.
    Raw(Bytes),
}

impl Argument {
    /// Serialises any value into an argument.
    pub fn of<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Value)
    }
}

/// An MDC-enabled operation: its identity and declared parameters, in order.
///
/// Build one per handler at startup and compose it with the handler via
/// [`wrap`](Operation::wrap):
///
/// ```rust,no_run
/// use http::Method;
/// use mdclog::{Request, Response, Router};
/// use mdclog::middleware::mdc::{Operation, Param};
///
/// async fn greet(req: Request) -> Response {
///     tracing::info!("greeting");   // carries mdcLogging={testKey=...}
///     Response::text(format!("Hello, {}!", req.query("name").unwrap_or("stranger")))
/// }
///
/// let app = Router::new().on(
///     Method::GET,
///     "/hello",
///     Operation::new("HelloController", "greet")
///         .param(Param::query("name").mdc("testKey"))
///         .param(Param::query("title"))
///         .wrap(greet),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Operation {
    pub(crate) id: OperationId,
    pub(crate) params: Vec<Param>,
}

impl Operation {
    pub fn new(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: OperationId { target: target.into(), method: method.into() },
            params: Vec::new(),
        }
    }

    /// Declares the next parameter, marked or not.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn id(&self) -> &OperationId {
        &self.id
    }

    /// Pairs this operation with per-call argument values.
    pub fn invocation(&self, args: Vec<Argument>) -> Invocation<'_> {
        Invocation { operation: self, args }
    }

    /// Binds every declared parameter from `req`.
    pub fn bind(&self, req: &Request) -> Invocation<'_> {
        self.invocation(self.params.iter().map(|p| p.bind(req)).collect())
    }

    /// Composes this operation with `handler`: each request is bound, run
    /// through the interceptor, and answered by `handler`.
    ///
    /// An interceptor failure answers `500 Internal Server Error`; failures
    /// of `handler` itself pass through untouched.
    pub fn wrap<F, Fut, R>(self, handler: F) -> impl Handler
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        let operation = Arc::new(self);
        let handler = Arc::new(handler);
        move |req: Request| {
            let operation = Arc::clone(&operation);
            let handler = Arc::clone(&handler);
            async move {
                let invocation = operation.bind(&req);
                match intercept(invocation, || (*handler)(req)).await {
                    Ok(out) => out.into_response(),
                    Err(e) => {
                        tracing::error!(operation = %operation.id, "{e}");
                        e.into_response()
                    }
                }
            }
        }
    }
}

/// One call of an operation: what was declared plus what was passed.
#[derive(Debug)]
pub struct Invocation<'a> {
    pub(crate) operation: &'a Operation,
    pub(crate) args: Vec<Argument>,
}
