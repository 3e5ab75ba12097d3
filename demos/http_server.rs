//! Serves a few regex routes through the process-wide router.
//!
//! Run with `RUST_LOG=debug cargo run --example http_server` and try
//! `curl localhost:8080/users/42`.

use serde::Serialize;

use regex_router::{Exchange, GlobalHttpServer, HttpResponse, RouteMatch, Router, ServerConfig, StatusCode};

#[derive(Serialize)]
struct User {
    id: u64,
    name: String,
}

fn register_routes(router: &Router<Exchange>) -> Result<(), regex_router::RouterError> {
    router.get("^/$", |ex: &mut Exchange, _: &RouteMatch| {
        ex.response.set_header("Content-Type", "text/html");
        ex.response.set_body("<html><body><h1>Welcome to regex-router!</h1></body></html>");
    })?;

    // Registered before /users/new, so a numeric id always wins
    router.get(r"^/users/(\d+)$", |ex: &mut Exchange, m: &RouteMatch| {
        let id: u64 = m.get(1).and_then(|id| id.parse().ok()).unwrap_or_default();
        let user = User { id, name: format!("user-{id}") };
        if let Err(e) = ex.response.set_json(&user) {
            ex.response = HttpResponse::text(StatusCode::InternalServerError, e.to_string());
        }
    })?;

    router.get("^/users/new$", |ex: &mut Exchange, _: &RouteMatch| {
        ex.response.set_body("new user form");
    })?;

    router.add(["POST", "PUT"], r"^/echo(\?.*)?$", |ex: &mut Exchange, _: &RouteMatch| {
        let body = ex.request.body.clone();
        ex.response.set_header("Content-Type", "application/octet-stream");
        ex.response.set_body(body);
    })?;

    router.head("^/health$", |ex: &mut Exchange, _: &RouteMatch| {
        ex.response.set_status(StatusCode::NoContent);
    })?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    register_routes(Router::instance())?;

    let config = ServerConfig {
        addr: "127.0.0.1:8080".parse()?,
        ..ServerConfig::default()
    };

    GlobalHttpServer::new(config).start().await?;
    Ok(())
}
