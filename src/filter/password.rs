//! Password hashing before the body reaches the member service.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::GatewayError;
use crate::filter::{Exchange, Filter, FilterOutcome};
use crate::rewrite::{rewrite_password, FieldLocation, PasswordHasher};

#[derive(Debug)]
pub struct PasswordRewriteFilter {
    location: FieldLocation,
    hasher: PasswordHasher,
}

impl PasswordRewriteFilter {
    pub fn new(location: FieldLocation, hasher: PasswordHasher) -> Self {
        Self { location, hasher }
    }
}

impl Filter for PasswordRewriteFilter {
    fn name(&self) -> &'static str {
        "hash_password"
    }

    fn apply<'a>(&'a self, exchange: Exchange) -> BoxFuture<'a, Result<FilterOutcome, GatewayError>> {
        async move {
            let body = rewrite_password(exchange.body(), &self.location, &self.hasher).await?;
            Ok(FilterOutcome::Continue(exchange.with_body(body)))
        }
        .boxed()
    }

    fn reads_body(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::testing::exchange;
    use axum::http::{Method, StatusCode};
    use axum::response::IntoResponse;
    use bytes::Bytes;
    use serde_json::Value;

    fn filter(location: FieldLocation) -> PasswordRewriteFilter {
        PasswordRewriteFilter::new(location, PasswordHasher::new(4, 1))
    }

    fn post(body: &'static str) -> Exchange {
        exchange(Method::POST, "/api/members").with_body(Bytes::from_static(body.as_bytes()))
    }

    #[tokio::test]
    async fn test_signup_body_hashed() {
        let outcome = filter(FieldLocation::Guarded { guard: "name".into() })
            .apply(post(r#"{"name":"kim","username":"kim01","password":"pw1234"}"#))
            .await
            .unwrap();

        let FilterOutcome::Continue(forwarded) = outcome else {
            panic!("expected continue");
        };
        let body: Value = serde_json::from_slice(forwarded.body()).unwrap();
        let hashed = body["password"].as_str().unwrap();
        assert!(hashed.starts_with("$2a$"));
        assert!(bcrypt::verify("pw1234", hashed).unwrap());
        assert_eq!(body["username"], "kim01");
    }

    #[tokio::test]
    async fn test_non_json_body_fails_with_500() {
        for location in [
            FieldLocation::TopLevel,
            FieldLocation::Nested { parent: "customerRegister".into() },
            FieldLocation::Guarded { guard: "name".into() },
        ] {
            let err = filter(location).apply(post("password=pw")).await.unwrap_err();

            assert!(matches!(err, GatewayError::BodyParse(_)));
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn test_absent_field_left_alone() {
        let outcome = filter(FieldLocation::TopLevel)
            .apply(post(r#"{"name":"kim","phone":"010"}"#))
            .await
            .unwrap();

        let FilterOutcome::Continue(forwarded) = outcome else {
            panic!("expected continue");
        };
        assert_eq!(forwarded.body(), &Bytes::from_static(br#"{"name":"kim","phone":"010"}"#));
    }
}
