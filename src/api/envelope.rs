use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::types::ApiError;

/// Response body convention of a backend lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{ "status": "...", "message": "...", "data": ... }`
    Wrapped,
    /// The payload itself.
    Bare,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct ApiResponse<T> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

impl Envelope {
    /// Decode a response body, returning `None` when the server sent no payload.
    pub fn decode<T: DeserializeOwned>(self, body: &[u8]) -> Result<Option<T>, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        match self {
            Envelope::Bare => serde_json::from_slice::<Option<T>>(body)
                .map_err(|e| ApiError::Decode(e.to_string())),
            Envelope::Wrapped => {
                let response: ApiResponse<T> =
                    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))?;

                if let Some(status) = response.status.as_deref() {
                    if status.eq_ignore_ascii_case("error") || status.eq_ignore_ascii_case("fail")
                    {
                        let message = response
                            .message
                            .unwrap_or_else(|| "request failed".to_string());
                        tracing::debug!(status = %status, message = %message, "Wrapped response reported failure");
                        return Err(ApiError::Server(message));
                    }
                }

                Ok(response.data)
            }
        }
    }
}
