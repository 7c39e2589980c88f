//! Greeting endpoints whose log lines carry selected request arguments.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example hello_world
//!
//! Try:
//!   curl 'http://localhost:3000/hello-world-noTag?name=Stranger'
//!   curl 'http://localhost:3000/hello-world-1tag?name=pepe'
//!   curl 'http://localhost:3000/hello-world-2tag?name=pepe&title=sr'
//!   curl -X POST http://localhost:3000/helloworld \
//!        -H 'content-type: application/json' \
//!        -d '{"id":1,"content":"pepe"}'
//!
//! The second request logs
//!   mdcLogging={testKey=pepe} ... INFO hello_world: testing get hello-world-1tag ...

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use http::{Method, StatusCode};
use mdclog::middleware::mdc::{Operation, Param};
use mdclog::{Request, Response, Router, Server, logging};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    id: Option<u64>,
    content: String,
}

fn greet(counter: &AtomicU64, name: Option<&str>) -> Response {
    let greeting = Greeting {
        id: Some(counter.fetch_add(1, Ordering::Relaxed) + 1),
        content: format!("Hello, {}!", name.unwrap_or("null")),
    };
    match serde_json::to_vec(&greeting) {
        Ok(body) => Response::json(body),
        Err(_) => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[tokio::main]
async fn main() {
    logging::init();

    let counter = Arc::new(AtomicU64::new(0));
    let controller = "HelloWorldController";

    let c = Arc::clone(&counter);
    let no_tag = move |req: Request| {
        let c = Arc::clone(&c);
        async move {
            info!("testing get hello-world-noTag");
            greet(&c, req.query("name"))
        }
    };

    let c = Arc::clone(&counter);
    let one_tag = move |req: Request| {
        let c = Arc::clone(&c);
        async move {
            info!(name = req.query("name"), "testing get hello-world-1tag");
            greet(&c, req.query("name"))
        }
    };

    let c = Arc::clone(&counter);
    let two_tags = move |req: Request| {
        let c = Arc::clone(&c);
        async move {
            info!(name = req.query("name"), title = req.query("title"), "testing get hello-world-2tag");
            greet(&c, req.query("name"))
        }
    };

    let c = Arc::clone(&counter);
    let post = move |req: Request| {
        let c = Arc::clone(&c);
        async move {
            let Ok(greeting) = serde_json::from_slice::<Greeting>(req.body()) else {
                return Response::status(StatusCode::BAD_REQUEST);
            };
            info!(?greeting, "testing post helloworld");
            greet(&c, Some(greeting.content.as_str()))
        }
    };

    let app = Router::new()
        .on(Method::GET, "/hello-world-noTag", Operation::new(controller, "say_hello_no_tag")
            .param(Param::query("name"))
            .param(Param::query("test1"))
            .wrap(no_tag))
        .on(Method::GET, "/hello-world-1tag", Operation::new(controller, "say_hello_one_tag")
            .param(Param::query("name").mdc("testKey"))
            .param(Param::query("test1"))
            .wrap(one_tag))
        .on(Method::GET, "/hello-world-2tag", Operation::new(controller, "say_hello_two_tags")
            .param(Param::query("name").mdc("testKey"))
            .param(Param::query("title").mdc("AnotherKey"))
            .wrap(two_tags))
        .on(Method::POST, "/helloworld", Operation::new(controller, "say_hello_post")
            .param(Param::json_body().mdc_path("testKey", "$.id"))
            .wrap(post));

    if let Err(e) = Server::bind("0.0.0.0:3000").serve(app).await {
        tracing::error!("server error: {e}");
    }
}
