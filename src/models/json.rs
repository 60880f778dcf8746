use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use super::Validate;
use crate::error::ApiError;

/// JSON body that has been deserialized and passed [`Validate`].
///
/// Malformed JSON is rejected with 400 and constraint failures with 422,
/// before the handler runs.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await.map_err(|rejection| {
            tracing::warn!("rejected request body: {}", rejection.body_text());
            ApiError::invalid_json(format!("Deserializing error: {}", rejection.body_text()))
        })?;

        let violations = value.validate();
        if !violations.is_empty() {
            let messages = violations.messages();
            tracing::warn!("request body failed validation: {:?}", messages);
            return Err(ApiError::unprocessable_entity(messages));
        }

        Ok(ValidJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnippetCreate;
    use axum::{body::Body, http::header, http::StatusCode};

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let err = ValidJson::<SnippetCreate>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_fields_are_unprocessable() {
        let err = ValidJson::<SnippetCreate>::from_request(
            json_request(r#"{"title":"","content":"body","expires":"30"}"#),
            &(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_json()["messages"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn valid_body_passes_through() {
        let ValidJson(body) = ValidJson::<SnippetCreate>::from_request(
            json_request(r#"{"title":"hello","content":"world","expires":"7"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(body.title, "hello");
    }
}
