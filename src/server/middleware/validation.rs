use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::errors::CoreError;
use crate::serializers::Validate;

/// JSON body parsed into `T` and checked with [`Validate`]. Holds the
/// validated output, so handlers only ever see clean drafts.
///
/// Malformed JSON is rejected with `400 {detail}`, failed validation with
/// `400 {field: [messages]}`.
pub struct ValidatedJson<T: Validate>(pub T::Output);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    T::Output: Send,
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| CoreError::validation(format!("Failed to read request body: {}", e)))?;

        let payload: T = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::validation(format!("JSON parse error - {}", e)))?;

        payload.validate().map(ValidatedJson)
    }
}
