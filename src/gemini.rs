//! Thin client for the Gemini `generateContent` endpoint.

use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use std::time::Duration;

pub const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub fn build_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(90))
        .build()
        .context("failed to build HTTP client")?;

    Ok(client)
}

/// Free-text generation; returns the first candidate's text.
pub async fn query_text(
    client: &reqwest::Client,
    key: &str,
    model: &str,
    prompt: &str,
) -> Result<String> {
    let url = format!("{ENDPOINT}/models/{model}:generateContent?key={key}");

    let body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
    });

    let resp = client.post(&url).json(&body).send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let msg = resp.text().await?;
        return Err(anyhow!("{} — {}", status, msg));
    }

    let resp_json: Value = resp.json().await?;

    // Gracefully report any layout surprises with the full payload
    let text = resp_json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| {
            anyhow!(
                "unexpected response structure; full JSON from Gemini:\n{}",
                serde_json::to_string_pretty(&resp_json)
                    .unwrap_or_else(|_| "<unable to serialise>".to_string())
            )
        })?;

    Ok(text.to_owned())
}
