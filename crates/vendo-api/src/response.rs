//! Response envelope and error-to-status mapping.

use http::StatusCode;
use serde::Serialize;
use vendo_commerce::CommerceError;

/// The JSON envelope every endpoint returns.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// A successful response carrying data.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed response carrying the error message.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Fold a result into an envelope plus its status code. `created`
    /// selects 201 over 200 for the success case.
    pub fn from_result(
        result: Result<T, CommerceError>,
        created: bool,
    ) -> (StatusCode, Self) {
        match result {
            Ok(data) => {
                let status = if created {
                    StatusCode::CREATED
                } else {
                    StatusCode::OK
                };
                (status, Self::ok(data))
            }
            Err(err) => (status_for(&err), Self::err(err.to_string())),
        }
    }
}

/// Map an error to its conventional status code.
///
/// Expired and limit-reached links get their own distinguishable codes so
/// a storefront can render the right message instead of a generic error.
pub fn status_for(err: &CommerceError) -> StatusCode {
    match err {
        CommerceError::Validation(_)
        | CommerceError::InvalidQuantity(_)
        | CommerceError::DuplicateSlug(_)
        | CommerceError::CurrencyMismatch { .. }
        | CommerceError::RefundExceedsPayment { .. } => StatusCode::BAD_REQUEST,

        CommerceError::LinkExpired => StatusCode::GONE,
        CommerceError::DownloadLimitReached => StatusCode::FORBIDDEN,

        CommerceError::InvalidTransition { .. }
        | CommerceError::InsufficientStock { .. }
        | CommerceError::MissingTransactionId(_) => StatusCode::CONFLICT,

        CommerceError::Gateway(_) => StatusCode::BAD_GATEWAY,

        err if err.is_not_found() => StatusCode::NOT_FOUND,

        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
