use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::LlmSettings;
use crate::error::BackendError;

pub(super) fn build_http_client(settings: &LlmSettings) -> Result<Client, BackendError> {
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .user_agent(settings.user_agent.clone())
        .build()
        .map_err(|err| BackendError::Transport(format!("Failed to build HTTP client: {err}")))
}

pub(super) fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Transport(format!("request timed out: {err}"))
    } else {
        BackendError::Transport(err.to_string())
    }
}

/// Map non-success statuses onto [`BackendError`] variants.
pub(super) async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
        // Gemini reports a bad key as a 400.
        StatusCode::BAD_REQUEST if error_text.contains("API_KEY_INVALID") => {
            BackendError::Unauthorized
        }
        StatusCode::BAD_REQUEST => BackendError::InvalidRequest(error_text),
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited(error_text),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => BackendError::Unavailable,
        other => BackendError::Http {
            status: other.as_u16(),
            body: if error_text.is_empty() {
                "Unknown error".to_string()
            } else {
                error_text
            },
        },
    })
}

pub(super) async fn decode_json<T: DeserializeOwned>(
    response: Response,
) -> Result<T, BackendError> {
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|err| BackendError::Decode(format!("{err}: {body}")))
}

pub(super) fn trim_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}
