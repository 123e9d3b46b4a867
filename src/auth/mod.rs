// auth/mod.rs - Session token claims
//
// The gateway never verifies token signatures; the backends own that trust
// decision. Tokens are only decoded here to read who the caller is.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Claims read from the payload segment of a session token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, deserialize_with = "string_or_number")]
    pub sub: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub company_id: Option<String>,
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,
}

/// Decode the payload of a `header.payload.signature` token.
///
/// Returns `None` for anything that is not exactly three segments with a
/// base64url JSON object in the middle. The signature is not checked and
/// neither is `exp`.
pub fn decode(token: &str) -> Option<Claims> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    // Some issuers keep the base64 padding, the URL-safe alphabet never needs it
    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .ok()?;

    serde_json::from_slice(&payload).ok()
}

/// Expiry view of a token as reported by the token-info endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub user_id: Option<String>,
    pub company_id: Option<String>,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
    /// Seconds left; negative once the token has expired
    pub expires_in: Option<i64>,
    pub expires_at_iso: Option<String>,
    pub expired: Option<bool>,
}

impl Claims {
    pub fn token_info(&self, now: i64) -> TokenInfo {
        let expires_in = self.exp.map(|exp| exp - now);
        TokenInfo {
            user_id: self.sub.clone(),
            company_id: self.company_id.clone(),
            issued_at: self.iat,
            expires_at: self.exp,
            expires_in,
            expires_at_iso: self
                .exp
                .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
                .map(|dt| dt.to_rfc3339()),
            expired: expires_in.map(|left| left <= 0),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_with_payload(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }

    #[test]
    fn decodes_claims_without_verifying() {
        let token = token_with_payload(&json!({
            "sub": "user-1",
            "company_id": "acme",
            "iat": 1_700_000_000,
            "exp": 1_700_003_600
        }));

        let claims = decode(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.company_id.as_deref(), Some("acme"));
        assert_eq!(claims.iat, Some(1_700_000_000));
        assert_eq!(claims.exp, Some(1_700_003_600));
    }

    #[test]
    fn wrong_segment_count_is_none() {
        assert!(decode("").is_none());
        assert!(decode("only-one").is_none());
        assert!(decode("two.segments").is_none());
        assert!(decode("a.b.c.d").is_none());

        let good = token_with_payload(&json!({ "sub": "x" }));
        assert!(decode(&format!("{}.extra", good)).is_none());
    }

    #[test]
    fn invalid_payload_is_none() {
        assert!(decode("head.!!!not-base64!!!.sig").is_none());

        let not_json = URL_SAFE_NO_PAD.encode("definitely not json");
        assert!(decode(&format!("head.{}.sig", not_json)).is_none());

        let not_object = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert!(decode(&format!("head.{}.sig", not_object)).is_none());

        assert!(decode("head..sig").is_none());
    }

    #[test]
    fn numeric_ids_and_padding_are_tolerated() {
        let body = base64::engine::general_purpose::URL_SAFE
            .encode(json!({ "sub": 42, "company_id": 7, "exp": 1.7e9 }).to_string());
        let claims = decode(&format!("h.{}.s", body)).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.company_id.as_deref(), Some("7"));
        assert_eq!(claims.exp, Some(1_700_000_000));
    }

    #[test]
    fn token_info_reports_remaining_lifetime() {
        let t0 = 1_700_000_000;
        let claims = Claims {
            sub: Some("u".into()),
            company_id: None,
            iat: Some(t0 - 100),
            exp: Some(t0 + 3600),
        };

        let info = claims.token_info(t0);
        assert_eq!(info.expires_in, Some(3600));
        assert_eq!(info.expires_at, Some(t0 + 3600));
        assert_eq!(info.issued_at, Some(t0 - 100));
        assert_eq!(info.expired, Some(false));
    }

    #[test]
    fn expired_token_gives_negative_expires_in() {
        let t0 = 1_700_000_000;
        let claims = Claims {
            exp: Some(t0 - 60),
            ..Claims::default()
        };

        let info = claims.token_info(t0);
        assert_eq!(info.expires_in, Some(-60));
        assert_eq!(info.expired, Some(true));
    }
}
