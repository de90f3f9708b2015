// src/bin/convert_token.rs
//! One-shot Upstox authorization-code to access-token exchange.
//!
//! Open the authorization dialog in a browser (with your app's client id
//! and redirect uri), log in, authorize, and copy the `code` query
//! parameter from the redirect URL. Run this tool, paste the code, and
//! export the printed token as `ACCESS_TOKEN` for the bot.

use serde_json::{json, Value};
use std::env;
use std::io::{self, BufRead, Write};
use std::time::Duration;

const TOKEN_URL: &str = "https://api.upstox.com/v2/login/authorization/token";

#[tokio::main]
async fn main() {
    let client_id = env::var("UPSTOX_CLIENT_ID").unwrap_or_default();
    let client_secret = env::var("UPSTOX_CLIENT_SECRET").unwrap_or_default();
    let redirect_uri = env::var("UPSTOX_REDIRECT_URI")
        .unwrap_or_else(|_| "https://www.google.com".to_string());

    if client_id.is_empty() || client_secret.is_empty() {
        eprintln!("Set UPSTOX_CLIENT_ID and UPSTOX_CLIENT_SECRET first.");
        std::process::exit(1);
    }

    println!("Paste AUTH CODE (everything after code=):");
    print!("> ");
    io::stdout().flush().ok();

    let mut code = String::new();
    if io::stdin().lock().read_line(&mut code).is_err() {
        eprintln!("Failed to read input.");
        std::process::exit(1);
    }
    let code = code.trim();
    if code.is_empty() {
        eprintln!("No code entered.");
        std::process::exit(1);
    }

    let payload = json!({
        "code": code,
        "client_id": client_id,
        "client_secret": client_secret,
        "redirect_uri": redirect_uri,
        "grant_type": "authorization_code",
    });

    match exchange(&payload).await {
        Ok(token) => {
            println!("\nACCESS TOKEN GENERATED\n");
            println!("{}", token);
        }
        Err(e) => {
            eprintln!("Token exchange failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn exchange(payload: &Value) -> Result<String, String> {
    let response = reqwest::Client::new()
        .post(TOKEN_URL)
        .json(payload)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let body: Value = response.json().await.map_err(|e| e.to_string())?;
    match body.get("access_token").and_then(Value::as_str) {
        Some(token) => Ok(token.to_string()),
        None => Err(format!("error response: {}", body)),
    }
}
