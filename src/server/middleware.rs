//! Tower layer that guards axum routes with a [`Validator`]
//!
//! The layer decodes the location the schema addresses (JSON body, query
//! string or route parameters), runs the validator, and either forwards the
//! request untouched or answers with the rejection.
//!
//! # Example
//!
//! ```rust,ignore
//! let guard = ValidationLayer::new(Validator::new(&schema));
//!
//! let app = Router::new()
//!     .route("/users", post(create_user))
//!     .route_layer(guard);
//! ```

use crate::core::error::{Fault, Rejection, RequestFault};
use crate::core::schema::Location;
use crate::core::validation::{RequestView, Validator};
use axum::body::{Body, to_bytes};
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{FromRequestParts, Query, RawPathParams, Request, State};
use axum::http::Uri;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Largest body read when the schema addresses the body (2 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Layer applying one validator to every request of the wrapped service
#[derive(Debug, Clone)]
pub struct ValidationLayer {
    validator: Validator,
    body_limit: usize,
}

impl ValidationLayer {
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Decode the request, check it, and hand it back ready to forward
    pub async fn guard(&self, req: Request) -> Result<Request, Rejection> {
        let (mut parts, body) = req.into_parts();
        let mut view = RequestView::new(parts.uri.path());

        let body = match self.validator.location() {
            Some(Location::Body) => {
                let bytes = to_bytes(body, self.body_limit)
                    .await
                    .map_err(|err| body_fault(&err, self.body_limit))?;
                view = view.with_body(decode_body(&bytes)?);
                Body::from(bytes)
            }
            Some(Location::Query) => {
                view = view.with_query(decode_query(&parts.uri)?);
                body
            }
            Some(Location::Params) => {
                view = view.with_params(decode_params(&mut parts).await?);
                body
            }
            None => body,
        };

        self.validator.check(&view)?;
        Ok(Request::from_parts(parts, body))
    }
}

impl<S> Layer<S> for ValidationLayer {
    type Service = ValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationService {
            inner,
            layer: self.clone(),
        }
    }
}

/// Service produced by [`ValidationLayer`]
#[derive(Debug, Clone)]
pub struct ValidationService<S> {
    inner: S,
    layer: ValidationLayer,
}

impl<S> Service<Request> for ValidationService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let layer = self.layer.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();
            match layer.guard(req).await {
                Ok(req) => inner.call(req).await,
                Err(rejection) => Ok(reject(&path, rejection)),
            }
        })
    }
}

/// Same guard for `axum::middleware::from_fn_with_state`
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/users/{id}", get(get_user))
///     .route_layer(middleware::from_fn_with_state(layer, validate_request));
/// ```
pub async fn validate_request(
    State(layer): State<ValidationLayer>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    match layer.guard(req).await {
        Ok(req) => next.run(req).await,
        Err(rejection) => reject(&path, rejection),
    }
}

fn reject(path: &str, rejection: Rejection) -> Response {
    tracing::debug!(
        path = %path,
        code = rejection.first().error_code(),
        faults = rejection.len(),
        "Request rejected: {}",
        rejection
    );
    rejection.into_response()
}

/// Only a length-limit failure is a 413; any other read failure is a 400
fn body_fault(err: &axum::Error, limit: usize) -> Fault {
    let mut cause: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(current) = cause {
        if current.is::<LengthLimitError>() {
            return RequestFault::BodyTooLarge { limit }.into();
        }
        cause = current.source();
    }
    RequestFault::UnreadableBody.into()
}

fn decode_body(bytes: &[u8]) -> Result<Value, Fault> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    match serde_json::from_slice(bytes) {
        Ok(Value::Object(map)) => Ok(Value::Object(map)),
        Ok(_) => Err(RequestFault::BodyNotObject.into()),
        Err(_) => Err(RequestFault::InvalidJson.into()),
    }
}

/// Repeated keys keep every value, as an array in request order
fn decode_query(uri: &Uri) -> Result<Value, Fault> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|_| Fault::from(RequestFault::MalformedQuery))?;

    let mut fields = Map::new();
    for (key, value) in pairs {
        match fields.get_mut(&key) {
            None => {
                fields.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(first) => *first = Value::Array(vec![first.take(), Value::String(value)]),
        }
    }
    Ok(Value::Object(fields))
}

async fn decode_params(parts: &mut Parts) -> Result<Value, Fault> {
    let params = match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params,
        // Not behind a matched route: nothing to check.
        Err(RawPathParamsRejection::MissingPathParams(_)) => return Ok(Value::Object(Map::new())),
        Err(_) => return Err(RequestFault::InvalidPathParams.into()),
    };

    let fields = params
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect();
    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{RuleDefinition, SchemaDefinition};
    use axum::body::Bytes;
    use serde_json::json;

    #[test]
    fn test_decode_body_empty_is_empty_object() {
        assert_eq!(decode_body(b"").unwrap(), json!({}));
        assert_eq!(decode_body(b"  \n").unwrap(), json!({}));
    }

    #[test]
    fn test_decode_body_keeps_key_order() {
        let body = decode_body(br#"{"zeta": 1, "alpha": 2}"#).unwrap();
        let keys: Vec<&str> = body
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_decode_body_rejects_non_objects() {
        assert_eq!(
            decode_body(b"[1, 2]").unwrap_err(),
            Fault::Request(RequestFault::BodyNotObject)
        );
        assert_eq!(
            decode_body(b"{not json").unwrap_err(),
            Fault::Request(RequestFault::InvalidJson)
        );
    }

    #[test]
    fn test_decode_query_values_are_strings() {
        let uri: Uri = "/search?term=rust&page=2".parse().unwrap();
        assert_eq!(
            decode_query(&uri).unwrap(),
            json!({"term": "rust", "page": "2"})
        );
    }

    #[test]
    fn test_decode_query_repeated_key_keeps_every_value() {
        let uri: Uri = "/search?page=abc&term=rust&page=2&page=3".parse().unwrap();
        assert_eq!(
            decode_query(&uri).unwrap(),
            json!({"page": ["abc", "2", "3"], "term": "rust"})
        );
    }

    #[test]
    fn test_decode_query_without_query_string() {
        let uri: Uri = "/search".parse().unwrap();
        assert_eq!(decode_query(&uri).unwrap(), json!({}));
    }

    fn body_layer(limit: usize) -> ValidationLayer {
        let schema = SchemaDefinition::new(Location::Body).field("name", RuleDefinition::string());
        ValidationLayer::new(Validator::new(&schema)).with_body_limit(limit)
    }

    async fn guard_fault(layer: &ValidationLayer, body: Body) -> Fault {
        let req = axum::http::Request::builder().uri("/users").body(body).unwrap();
        match layer.guard(req).await {
            Ok(_) => panic!("request should be rejected"),
            Err(rejection) => rejection.first().clone(),
        }
    }

    #[tokio::test]
    async fn test_body_over_limit_is_too_large() {
        let fault = guard_fault(&body_layer(8), Body::from(r#"{"name": "far too long"}"#)).await;
        assert_eq!(fault, Fault::Request(RequestFault::BodyTooLarge { limit: 8 }));
    }

    #[tokio::test]
    async fn test_body_stream_error_is_unreadable() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"name\"")),
            Err(std::io::Error::other("connection reset")),
        ];
        let fault = guard_fault(&body_layer(1024), Body::from_stream(futures::stream::iter(chunks))).await;

        assert_eq!(fault, Fault::Request(RequestFault::UnreadableBody));
        assert_eq!(fault.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
