use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use tembea_core::validation::Validate;

use super::error::ApiError;

/// JSON body that passed [`Validate`]; the handler never runs on a rejected body.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        body.validate().map_err(ApiError::validation)?;
        Ok(Self(body))
    }
}
