//! Shared utilities for integration tests.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use mdclog::middleware::mdc::DiagnosticContext;
use mdclog::{Router, Server};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// A server on an ephemeral port. Stops accepting when dropped.
pub struct TestServer {
    pub base: String,
    _shutdown: oneshot::Sender<()>,
}

pub async fn spawn_server(router: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown = async {
            let _ = rx.await;
        };
        Server::from_listener(listener)
            .serve_with_shutdown(router, shutdown)
            .await
            .unwrap();
    });

    TestServer { base: format!("http://{addr}"), _shutdown: tx }
}

/// One log event and the diagnostic context it was emitted under.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub message: String,
    /// `None` when emitted outside a request scope.
    pub mdc: Option<IndexMap<String, String>>,
}

/// Records every event whose target starts with `target`, like an in-memory
/// appender attached to one logger.
#[derive(Clone)]
pub struct Capture {
    target: &'static str,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl Capture {
    pub fn new(target: &'static str) -> Self {
        Self { target, events: Arc::default() }
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with(self.target) {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            message: visitor.0,
            mdc: DiagnosticContext::current().map(|c| c.snapshot()),
        });
    }
}
