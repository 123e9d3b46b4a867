use axum::http::Method;
use serde_json::{json, Value};

use crate::cli::client::BffClient;
use crate::cli::config::{load_session, save_session};
use crate::cli::utils::{error_message, output_error, output_response, output_success};
use crate::cli::OutputFormat;

/// Any gateway call with the saved session, e.g. `call GET /api/identity/me`
pub async fn call(
    server: Option<&str>,
    method: String,
    path: String,
    data: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let method: Method = method
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid HTTP method '{}'", method))?;

    let body = data
        .map(|raw| serde_json::from_str::<Value>(&raw))
        .transpose()
        .map_err(|e| anyhow::anyhow!("--data is not valid JSON: {}", e))?;

    let path = if path.starts_with('/') { path } else { format!("/{}", path) };

    let session = load_session()?;
    let base = session.server_url(server);
    let mut client = BffClient::new(&base, session)?;
    let response = client.request(method, &path, body).await?;
    save_session(client.session())?;

    output_response(&output_format, &response)?;
    if !response.status.is_success() {
        anyhow::bail!("{}", error_message(&response));
    }
    Ok(())
}

/// GET /health and GET /
pub async fn status(server: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = load_session()?;
    let base = session.server_url(server);
    let mut client = BffClient::new(&base, session)?;

    let health = match client.request(Method::GET, "/health", None).await {
        Ok(response) => response,
        Err(e) => {
            output_error(&output_format, &format!("{} is unreachable: {}", base, e), Some("UNREACHABLE"))?;
            return Err(e);
        }
    };
    let overview = client.request(Method::GET, "/", None).await?;

    if let OutputFormat::Text = output_format {
        println!("Gateway:  {} ({})", base, health.status);
        if let Some(services) = overview.body.get("services").and_then(Value::as_object) {
            for (name, info) in services {
                let configured = info.get("configured").and_then(Value::as_bool).unwrap_or(false);
                println!("  {:<10} {}", name, if configured { "configured" } else { "not configured" });
            }
        }
        if let Some(mock) = overview.body.get("mock") {
            println!("Mock mode: {}", mock.get("enabled").and_then(Value::as_bool).unwrap_or(false));
        }
        println!("Logged in: {}", !client.session().cookies.is_empty());
        return Ok(());
    }

    output_success(
        &output_format,
        &format!("{} is up", base),
        Some(json!({
            "health": health.body,
            "gateway": overview.body,
            "logged_in": !client.session().cookies.is_empty(),
        })),
    )
}
