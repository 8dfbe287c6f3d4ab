// =============================================================================
// Orrery API - Validating Extractors
// =============================================================================
// `Json` and `Query` wrappers whose rejections become `ApiError`, so a bad
// payload gets the same JSON error body as every other failure.
// =============================================================================

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ValidJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ValidQuery<T>(pub T);
