//! fnserve demo server.
//!
//! Exposes a handful of sample functions, including a secured and a
//! rate-limited endpoint.

use fnserve::prelude::*;
use tracing_subscriber::EnvFilter;

/// Add two integers.
#[api_function]
fn add(a: i64, b: i64) -> i64 {
    a + b
}

/// Greet someone by name.
#[api_function]
fn greet(name: Option<String>) -> String {
    format!("Hello, {}!", name.unwrap_or_else(|| "World".to_string()))
}

/// Multiply two floats.
#[api_function]
async fn multiply(x: f64, y: f64) -> f64 {
    x * y
}

/// Divide two floats, failing on a zero divisor.
#[api_function]
fn divide(x: f64, y: f64) -> Result<f64, String> {
    if y == 0.0 {
        return Err("division by zero".to_string());
    }
    Ok(x / y)
}

/// Sum a list of numbers.
#[api_function]
fn total(values: Vec<f64>) -> f64 {
    values.iter().sum()
}

/// Reveal a secret message.
#[api_function]
fn secret(message: String) -> serde_json::Value {
    serde_json::json!({ "echo": message, "classified": true })
}

/// Liveness probe with its own rate limit.
#[api_function]
fn ping() -> &'static str {
    "pong"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting fnserve demo...");

    let mut app = App::new("Demo API", env!("CARGO_PKG_VERSION"));
    app.api(
        Endpoint::builder("/add").methods([Method::Get, Method::Post]),
        AddFunction,
    )?
    .api(Endpoint::builder("/greet"), GreetFunction)?
    .api(
        Endpoint::builder("/multiply").methods([Method::Post]),
        MultiplyFunction,
    )?
    .api(Endpoint::builder("/divide"), DivideFunction)?
    .api(
        Endpoint::builder("/total").methods([Method::Get, Method::Post]),
        TotalFunction,
    )?
    .api(
        Endpoint::builder("/secret")
            .methods([Method::Post])
            .api_key("my-secret-key")
            .rate_limit(10)
            .allowed_origins(["*"]),
        SecretFunction,
    )?
    .api(Endpoint::builder("/ping").rate_limit(5), PingFunction)?;

    let config = ServerConfig::from_env()?;

    tracing::info!("Try: curl 'http://{}/add?a=2&b=3'", config.bind_addr());
    tracing::info!(
        "Try: curl -X POST -H 'X-API-Key: my-secret-key' -d '{{\"message\":\"hi\"}}' http://{}/secret",
        config.bind_addr()
    );

    app.into_server(config).run().await
}
