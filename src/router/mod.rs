//! HTTP surface of the relay.

pub mod metrics;
pub mod send_email;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;

/// JSON body that passed its `validator` rules.
#[derive(Debug)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Answer every method a route does not handle.
pub async fn method_not_allowed() -> ServerError {
    ServerError::MethodNotAllowed
}
