//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. It is opted into per route by wrapping a handler,
//! so routes that do not need it pay nothing.
//!
//! Built-in middleware:
//! - [`mdc`]: publishes selected handler arguments into a request-scoped
//!   diagnostic context that every log line of the request carries

pub mod mdc;
