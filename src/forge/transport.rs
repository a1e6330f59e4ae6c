//! HTTP plumbing shared by the adapters: status mapping, transfer decoding
//! and webhook failure classification.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::HeaderMap;
use http::StatusCode;
use http::header::RETRY_AFTER;
use reqwest::Response;
use serde::de::DeserializeOwned;

use super::GitApiError;

/// Body fragment vendors return when a hook with the same URL is registered.
const HOOK_EXISTS_PATTERN: &str = "Hook already exists";

/// Pass a successful response through; turn anything else into
/// [`GitApiError::Api`].
pub async fn check_status(response: Response) -> Result<Response, GitApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    let err = api_error(status, &headers, body);
    tracing::debug!(%status, error = %err, "request failed");
    Err(err)
}

/// Check the status and decode the JSON body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GitApiError> {
    let bytes = check_status(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Build an API error from a failed response's pieces.
///
/// The message is taken from the vendor's JSON error shape when there is one
/// (`{"message": ..}` for GitHub/GitLab, `{"error": {"message": ..}}` for
/// Bitbucket), otherwise the raw body.
pub fn api_error(status: StatusCode, headers: &HeaderMap, body: String) -> GitApiError {
    let retry_after = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.pointer("/error/message"))
                .and_then(serde_json::Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.clone());

    GitApiError::Api {
        status,
        message,
        body,
        retry_after,
    }
}

/// Decode a base64 `content` field. Vendors wrap the payload in newlines.
pub fn decode_base64(content: &str) -> Result<Vec<u8>, GitApiError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(BASE64.decode(compact)?)
}

/// Reclassify a webhook creation failure.
///
/// A response body naming an existing hook becomes
/// [`GitApiError::WebhookAlreadyExists`]; everything else is wrapped in
/// [`GitApiError::UnknownWebhook`].
pub fn classify_webhook_error(err: GitApiError) -> GitApiError {
    match &err {
        GitApiError::Api { body, .. } if body.contains(HOOK_EXISTS_PATTERN) => {
            GitApiError::WebhookAlreadyExists
        }
        _ => GitApiError::UnknownWebhook {
            source: Box::new(err),
        },
    }
}

/// Percent-encode each segment of a repository path, keeping the `/`
/// separators.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Strip any trailing slashes from a base URL.
pub fn trim_trailing_slash(url: &str) -> &str {
    url.trim_end_matches('/')
}
