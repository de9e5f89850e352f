//! Push and pull endpoints.
//!
//! Both accept `GET` and `POST`. Fields are read from the query string and,
//! for `POST`, from an `application/x-www-form-urlencoded` or
//! `multipart/form-data` body. The first occurrence of a field wins, body
//! values before query values. Missing fields are treated as empty strings.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::relay::{Message, PullOutcome};
use crate::server::AppState;

/// Form fields shared by `/push` and `/pull`.
#[derive(Debug, Default)]
pub struct RelayParams {
    pub user: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
}

impl RelayParams {
    /// Build from key/value pairs in precedence order; repeated keys keep
    /// their first value and unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut params = RelayParams::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "user" => &mut params.user,
                "title" => &mut params.title,
                "message" => &mut params.message,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// Response envelope: `{"response": ..., "dropped": n}`.
#[derive(Debug, Serialize)]
pub struct RelayResponse<T: Serialize> {
    pub response: T,
    #[serde(skip_serializing_if = "is_zero")]
    pub dropped: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl<T: Serialize> RelayResponse<T> {
    fn new(response: T) -> Self {
        Self {
            response,
            dropped: 0,
        }
    }
}

/// Extractor merging query string and form body into [`RelayParams`].
pub struct RelayForm(pub RelayParams);

impl<S> FromRequest<S> for RelayForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(req.uri())
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let body = if req.method() == Method::GET || req.method() == Method::HEAD {
            Vec::new()
        } else {
            body_pairs(req, state).await?
        };

        Ok(RelayForm(RelayParams::from_pairs(body.into_iter().chain(query))))
    }
}

async fn body_pairs<S>(req: Request, state: &S) -> Result<Vec<(String, String)>>
where
    S: Send + Sync,
{
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        return Ok(pairs);
    }

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut pairs = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            // File uploads are not form values
            if field.file_name().is_some() {
                continue;
            }
            let name = field.name().unwrap_or_default().to_string();
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            pairs.push((name, value));
        }
        return Ok(pairs);
    }

    let body = Bytes::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    if !body.is_empty() {
        let content_type = if content_type.is_empty() {
            "none".to_string()
        } else {
            content_type
        };
        return Err(AppError::UnsupportedMediaType(content_type));
    }

    Ok(Vec::new())
}

/// GET|POST /pull - wait for the next message for `user`
#[tracing::instrument(name = "relay.pull", skip_all, fields(user_id))]
pub async fn pull(
    State(state): State<AppState>,
    RelayForm(params): RelayForm,
) -> Result<Response> {
    let user_id = params.user.unwrap_or_default();
    tracing::Span::current().record("user_id", user_id.as_str());

    let response = match state.relay.pull(&user_id).await {
        PullOutcome::Delivered { message, .. } => {
            Json(RelayResponse::<Message>::new(message)).into_response()
        }
        PullOutcome::TimedOut => (
            StatusCode::REQUEST_TIMEOUT,
            Json(RelayResponse::new("timeout")),
        )
            .into_response(),
    };

    Ok(response)
}

/// GET|POST /push - queue a message for `user`
#[tracing::instrument(name = "relay.push", skip_all, fields(user_id))]
pub async fn push(
    State(state): State<AppState>,
    RelayForm(params): RelayForm,
) -> Result<Json<RelayResponse<&'static str>>> {
    let user_id = params.user.unwrap_or_default();
    tracing::Span::current().record("user_id", user_id.as_str());

    let receipt = state
        .relay
        .push(
            &user_id,
            params.title.as_deref().unwrap_or_default(),
            params.message.as_deref().unwrap_or_default(),
        )
        .await;

    Ok(Json(RelayResponse {
        response: "success",
        dropped: receipt.dropped,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dropped_omitted_when_zero() {
        let value = serde_json::to_value(RelayResponse::new("success")).unwrap();
        assert_eq!(value, json!({"response": "success"}));
    }

    #[test]
    fn test_dropped_present_when_nonzero() {
        let value = serde_json::to_value(RelayResponse {
            response: "success",
            dropped: 3,
        })
        .unwrap();
        assert_eq!(value, json!({"response": "success", "dropped": 3}));
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn test_first_occurrence_wins() {
        let params = RelayParams::from_pairs(vec![
            pair("user", "from-body"),
            pair("user", "from-query"),
            pair("title", "t"),
            pair("ignored", "x"),
        ]);
        assert_eq!(params.user.as_deref(), Some("from-body"));
        assert_eq!(params.title.as_deref(), Some("t"));
        assert!(params.message.is_none());
    }

    #[test]
    fn test_empty_value_still_counts_as_present() {
        let params = RelayParams::from_pairs(vec![pair("message", ""), pair("message", "later")]);
        assert_eq!(params.message.as_deref(), Some(""));
    }
}
