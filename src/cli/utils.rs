use serde_json::{json, Value};

use crate::cli::client::CliResponse;
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Print a gateway response: JSON mode wraps it with the status, text mode
/// prints the body alone
pub fn output_response(output_format: &OutputFormat, response: &CliResponse) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "status": response.status.as_u16(),
                    "body": response.body,
                }))?
            );
        }
        OutputFormat::Text => match &response.body {
            Value::Null => println!("{}", response.status),
            Value::String(text) => println!("{}", text),
            body => println!("{}", serde_json::to_string_pretty(body)?),
        },
    }
    Ok(())
}

/// Pull the `error` field out of a gateway error body
pub fn error_message(response: &CliResponse) -> String {
    response
        .body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with {}", response.status))
}
