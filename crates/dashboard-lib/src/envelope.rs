//! The uniform success/error wrapper returned by every backend call

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Response envelope: `{is_successful, data?, error_code?, error_msg?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub is_successful: bool,
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            is_successful: true,
            data: Some(data),
            error_code: None,
            error_msg: None,
        }
    }

    pub fn failure(error_code: Option<String>, error_msg: impl Into<String>) -> Self {
        Self {
            is_successful: false,
            data: None,
            error_code,
            error_msg: Some(error_msg.into()),
        }
    }

    /// The payload, only when the call reported success
    pub fn payload(&self) -> Option<&T> {
        if self.is_successful {
            self.data.as_ref()
        } else {
            None
        }
    }

    /// Take the payload, turning an application failure into an error
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.is_successful {
            Ok(self.data)
        } else {
            Err(ApiError::Application {
                code: self.error_code,
                message: self.error_msg,
            })
        }
    }
}

/// Payload of an optional response; `None` unless `is_successful` is true
pub fn extract_payload<T>(response: Option<&ApiResponse<T>>) -> Option<&T> {
    response.and_then(ApiResponse::payload)
}

/// Single displayable message for a failed call.
///
/// A transport error wins over an application error. Returns `None` when
/// neither occurred.
pub fn failure_message<T>(
    transport: Option<&ApiError>,
    response: Option<&ApiResponse<T>>,
) -> Option<String> {
    if let Some(err) = transport {
        return Some(err.to_string());
    }

    match response {
        Some(resp) if !resp.is_successful => Some(
            resp.error_msg
                .clone()
                .or_else(|| resp.error_code.clone())
                .unwrap_or_else(|| "Request was not successful".to_string()),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_payload_on_success() {
        let response = ApiResponse::success(vec![1, 2, 3]);
        assert_eq!(extract_payload(Some(&response)), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn test_extract_payload_ignores_data_on_failure() {
        let response = ApiResponse {
            is_successful: false,
            data: Some(7),
            error_code: None,
            error_msg: None,
        };
        assert_eq!(extract_payload(Some(&response)), None);
        assert_eq!(extract_payload::<i32>(None), None);
    }

    #[test]
    fn test_extract_payload_is_a_pure_read() {
        let response = ApiResponse::success(String::from("payload"));
        let first = extract_payload(Some(&response)).unwrap();
        let second = extract_payload(Some(&response)).unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_decode_wire_shape() {
        let ok: ApiResponse<u32> =
            serde_json::from_str(r#"{"is_successful": true, "data": 5}"#).unwrap();
        assert_eq!(ok.payload(), Some(&5));

        let failed: ApiResponse<u32> = serde_json::from_str(
            r#"{"is_successful": false, "error_code": "E1", "error_msg": "boom"}"#,
        )
        .unwrap();
        assert!(failed.payload().is_none());
        assert_eq!(failed.error_msg.as_deref(), Some("boom"));
    }

    #[test]
    fn test_failure_message_prefers_transport_error() {
        let transport = ApiError::Transport("connection refused".to_string());
        let response: ApiResponse<()> = ApiResponse::failure(None, "not ready");

        let message = failure_message(Some(&transport), Some(&response));
        assert_eq!(message.as_deref(), Some("request failed: connection refused"));

        let message = failure_message(None, Some(&response));
        assert_eq!(message.as_deref(), Some("not ready"));

        let ok = ApiResponse::success(());
        assert!(failure_message(None, Some(&ok)).is_none());
        assert!(failure_message::<()>(None, None).is_none());
    }

    #[test]
    fn test_into_result() {
        let failed: ApiResponse<u8> = ApiResponse::failure(Some("E2".to_string()), "denied");
        assert_eq!(
            failed.into_result(),
            Err(ApiError::Application {
                code: Some("E2".to_string()),
                message: Some("denied".to_string()),
            })
        );
        assert_eq!(ApiResponse::success(3u8).into_result(), Ok(Some(3)));
    }
}
