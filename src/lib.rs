//! # mdclog
//!
//! A minimal HTTP framework whose handlers can publish selected request
//! arguments into a request-scoped diagnostic context, so every log line a
//! request emits carries them.
//!
//! ## The contract
//!
//! - Radix-tree routing via [`matchit`], HTTP/1.1 and HTTP/2 via hyper.
//! - Graceful shutdown on SIGTERM / Ctrl-C, draining in-flight requests.
//! - Every request runs in its own request scope with an empty
//!   [`DiagnosticContext`](middleware::mdc::DiagnosticContext).
//! - Routes opt into enrichment by wrapping their handler in an
//!   [`Operation`](middleware::mdc::Operation) that marks which parameters to
//!   publish, optionally through a JSON path. The context is cleared when the
//!   handler ends, whether it returned, failed, panicked or was cancelled.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::Method;
//! use mdclog::{Request, Response, Router, Server, logging};
//! use mdclog::middleware::mdc::{Operation, Param};
//!
//! #[tokio::main]
//! async fn main() {
//!     logging::init();
//!
//!     let app = Router::new()
//!         .on(Method::GET, "/users/{id}", Operation::new("Users", "get")
//!             .param(Param::path("id").mdc("userId"))
//!             .wrap(get_user))
//!         .on(Method::POST, "/users", Operation::new("Users", "create")
//!             .param(Param::json_body().mdc_path("email", "$.email"))
//!             .wrap(create_user));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     tracing::info!("loading user");   // mdcLogging={userId=42} ...
//!     Response::json(format!(r#"{{"id":"{}"}}"#, req.param("id").unwrap_or("")))
//! }
//!
//! async fn create_user(_req: Request) -> Response {
//!     tracing::info!("creating user");  // mdcLogging={email=...} ...
//!     Response::builder()
//!         .status(http::StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .no_body()
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod logging;
pub mod middleware;

pub use error::Error;
pub use handler::Handler;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
