use axum::http::Method;
use serde_json::json;
use std::io::{self, BufRead, Write};

use crate::cli::client::BffClient;
use crate::cli::config::{load_session, save_session};
use crate::cli::utils::{error_message, output_error, output_response, output_success};
use crate::cli::OutputFormat;

fn prompt_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// POST /api/auth/login and keep the session cookies it sets
pub async fn login(
    server: Option<&str>,
    email: String,
    password: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let session = load_session()?;
    let base = session.server_url(server);
    let password = match password.or_else(|| std::env::var("BFF_PASSWORD").ok()) {
        Some(password) => password,
        None => prompt_password()?,
    };

    let mut client = BffClient::new(&base, session)?;
    let response = client
        .request(Method::POST, "/api/auth/login", Some(json!({ "email": email, "password": password })))
        .await?;

    if !response.status.is_success() {
        output_error(&output_format, &error_message(&response), Some("LOGIN_FAILED"))?;
        anyhow::bail!("login rejected with {}", response.status);
    }

    save_session(client.session())?;
    output_success(
        &output_format,
        &format!("Logged in to {} as {}", base, email),
        Some(json!({ "server": base, "user": response.body.get("user") })),
    )
}

/// POST /api/auth/logout, then forget the cookies whatever the gateway said
pub async fn logout(server: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = load_session()?;
    let base = session.server_url(server);

    let mut client = BffClient::new(&base, session)?;
    let outcome = client.request(Method::POST, "/api/auth/logout", None).await;

    let mut session = client.into_session();
    session.cookies.clear();
    session.touch();
    save_session(&session)?;

    match outcome {
        Ok(response) if response.status.is_success() => output_success(&output_format, "Logged out", None),
        Ok(response) => output_success(
            &output_format,
            &format!("Local session cleared (gateway answered {})", response.status),
            None,
        ),
        Err(e) => output_success(
            &output_format,
            &format!("Local session cleared (gateway unreachable: {})", e),
            None,
        ),
    }
}

/// GET /api/auth/token-info
pub async fn whoami(server: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = load_session()?;
    if session.cookies.is_empty() {
        output_error(&output_format, "Not logged in", Some("NO_SESSION"))?;
        anyhow::bail!("no saved session, run `bffctl login` first");
    }
    let base = session.server_url(server);

    let mut client = BffClient::new(&base, session)?;
    let response = client.request(Method::GET, "/api/auth/token-info", None).await?;
    save_session(client.session())?;

    if !response.status.is_success() {
        output_error(&output_format, &error_message(&response), Some("NOT_AUTHENTICATED"))?;
        anyhow::bail!("token-info failed with {}", response.status);
    }
    output_response(&output_format, &response)
}
