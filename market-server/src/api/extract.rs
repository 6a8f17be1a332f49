//! Body and query extractors that reject with [`AppError`]
//!
//! axum's own `Json` and `Query` answer a bad body with a plain-text 422.
//! These wrappers keep the `ApiResponse` envelope, and name an unknown
//! order status, product category or product condition by its own code.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::utils::{AppError, ErrorCode};

/// JSON body extractor and response
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query-string extractor
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    let text = rejection.body_text();
    let code = match rejection {
        JsonRejection::JsonDataError(_) => decode_error_code(&text),
        JsonRejection::JsonSyntaxError(_) => ErrorCode::InvalidFormat,
        _ => ErrorCode::InvalidRequest,
    };
    tracing::debug!(code = %code, error = %text, "Rejected request body");
    AppError::with_message(code, text)
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    let text = rejection.body_text();
    let code = decode_error_code(&text);
    tracing::debug!(code = %code, error = %text, "Rejected query string");
    AppError::with_message(code, text)
}

/// Code for a serde failure message of the form `<path>: <error>`
fn decode_error_code(text: &str) -> ErrorCode {
    let Some((prefix, _)) = text.split_once(": unknown variant") else {
        return ErrorCode::InvalidFormat;
    };
    // "<context>: items[0].category" → "category"
    let path = prefix.rsplit(": ").next().unwrap_or(prefix);
    let field = path.rsplit('.').next().unwrap_or(path);
    match field {
        "status" => ErrorCode::OrderUnknownStatus,
        "category" => ErrorCode::ProductUnknownCategory,
        "condition" => ErrorCode::ProductUnknownCondition,
        _ => ErrorCode::InvalidFormat,
    }
}
