//! Command implementations, one module per dashboard page

pub mod alerts;
pub mod info;
pub mod inventory;
pub mod metrics;
pub mod system;

use anyhow::{anyhow, Result};
use dashboard_lib::{extract_payload, failure_message, ApiError, ApiResponse};

/// Turn a request result into its payload, or a single displayable error.
///
/// A successful envelope without data is reported as missing data.
pub(crate) fn require_payload<T: Clone>(result: Result<ApiResponse<T>, ApiError>) -> Result<T> {
    let (transport, response) = match result {
        Ok(response) => (None, Some(response)),
        Err(e) => (Some(e), None),
    };

    if let Some(message) = failure_message(transport.as_ref(), response.as_ref()) {
        return Err(anyhow!(message));
    }

    extract_payload(response.as_ref())
        .cloned()
        .ok_or_else(|| anyhow!("response contained no data"))
}

/// Like `require_payload`, for actions whose success envelope may carry no data
pub(crate) fn require_success<T>(result: Result<ApiResponse<T>, ApiError>) -> Result<Option<T>> {
    Ok(result?.into_result()?)
}
