use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use pil_types::ActorId;

use crate::error::ApiError;

/// Header carrying the caller identity established by the upstream
/// authentication layer.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The authenticated caller of a mutating request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor(pub ActorId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| ApiError::InvalidArgument(format!("missing {ACTOR_HEADER} header")))?;
        let value = raw
            .to_str()
            .map_err(|_| ApiError::InvalidArgument(format!("{ACTOR_HEADER} is not valid text")))?;
        Ok(Self(ActorId::new(value.trim())?))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(header: Option<&str>) -> Result<Actor, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(ACTOR_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_actor_from_header() {
        let actor = extract(Some("finance-admin")).await.unwrap();
        assert_eq!(actor.0.as_str(), "finance-admin");
    }

    #[tokio::test]
    async fn missing_or_blank_actor_is_rejected() {
        assert!(matches!(extract(None).await, Err(ApiError::InvalidArgument(_))));
        assert!(matches!(extract(Some("  ")).await, Err(ApiError::InvalidArgument(_))));
    }
}
