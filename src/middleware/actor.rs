//! Identidad del operador
//!
//! El actor llega en la cabecera `X-Actor` y acaba en `changed_by` del
//! historial; sin cabecera el historial registra "system".

use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

pub const ACTOR_HEADER: &str = "x-actor";

const MAX_ACTOR_LEN: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor(pub Option<String>);

impl Actor {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.chars().take(MAX_ACTOR_LEN).collect());

        Ok(Actor(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Actor {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(ACTOR_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_actor_header() {
        assert_eq!(extract(Some(" operador-7 ")).await.as_deref(), Some("operador-7"));
        assert_eq!(extract(Some("   ")).await, Actor(None));
        assert_eq!(extract(None).await, Actor(None));
    }
}
