//! Private Client Token Refresh Demo
//!
//! Starts a local mock API that only accepts the token `fresh-token`, stores
//! an expired token in the cookie, and shows the private client refreshing it
//! once on 401 before the retried request succeeds.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --example private_refresh_demo
//!
//! # Load the client settings from a TOML file (base_url is ignored)
//! cargo run --example private_refresh_demo -- --config tollgate.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate_client::{ApiConfig, create_api};
use tollgate_common::{MemoryCookieStore, Token};

#[derive(Parser, Debug)]
#[command(author, version, about = "Private client token refresh demo")]
struct Args {
    /// TOML file with client settings
    #[arg(long, env = "TOLLGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Token placed in the cookie before the first request
    #[arg(long, default_value = "expired-token")]
    initial_token: String,
}

async fn mock_api() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Ada"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    server
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let server = mock_api().await;

    let config = match &args.config {
        Some(path) => ApiConfig::load(path)?,
        None => ApiConfig::default(),
    };

    println!("Private Client Refresh Demo");
    println!("===========================");
    println!("Mock API: {}", server.uri());
    println!("Cookie: {}", config.cookie.name);
    println!();

    let config = config
        .with_base_url(server.uri())
        .with_cookie_store(Arc::new(MemoryCookieStore::new()))
        .with_refresh_token(|_expired, state| async move {
            info!("Refreshing token for {} {}", state.method, state.url);
            Ok(Some(Token::new("fresh-token")))
        });

    let api = create_api(config)?;

    let status: String = api.public.get("/status", None).await?.data;
    println!("public GET /status -> {status}");

    match api.private.get::<Value>("/me", None).await {
        Err(e) => println!("private GET /me without a token -> {e}"),
        Ok(response) => println!("private GET /me without a token -> {}", response.data),
    }

    api.cookie.set(args.initial_token.as_str());
    let me = api.private.get::<Value>("/me", None).await?;
    println!("private GET /me -> {} {}", me.status, me.data);

    let refreshed = api.cookie.get();
    println!(
        "cookie now holds the refreshed token: {}",
        refreshed.as_ref().map(Token::expose_secret) == Some("fresh-token")
    );

    Ok(())
}
