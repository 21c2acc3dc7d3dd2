//! Per-request transport context
//!
//! [`RequestContext`] is everything the pipeline needs from the HTTP layer:
//! path parameters, the query string, headers, the raw body and the caller's
//! [`AuthContext`]. It is an axum extractor, so a handler can take it
//! directly:
//!
//! ```rust,ignore
//! async fn create_product(ctx: RequestContext) -> Envelope {
//!     let mut product = Product::default();
//!     service
//!         .create(CreateRequest::<Product, AddProductForm>::new(&ctx, &mut product))
//!         .await
//! }
//! ```
//!
//! When a [`SharedAuthProvider`] is installed as a request extension (the
//! server builder does this) it resolves the auth context; a provider error
//! leaves the request anonymous so that authentication fails closed.

use anyhow::{Context, Result, anyhow};
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use super::auth::{AuthContext, SharedAuthProvider};
use super::envelope::Envelope;

/// Largest request body accepted by the extractor
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Transport data of one request
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
    auth: AuthContext,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            params: HashMap::new(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            auth: AuthContext::Anonymous,
        }
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the request URI; its query string becomes the query map
    pub fn with_uri(mut self, uri: &str) -> Result<Self> {
        let uri: Uri = uri.parse().with_context(|| format!("invalid uri '{}'", uri))?;
        self.query = parse_query(&uri)?;
        self.uri = uri;
        Ok(self)
    }

    /// Add a path parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set the headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set a JSON body
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = Bytes::from(body.to_string());
        self
    }

    /// Set a raw body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the caller identity
    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = auth;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Path parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Query parameter by name
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Decoded query string
    pub fn query_map(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Decode the JSON body into `T`
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Err(anyhow!("request body is empty"));
        }
        serde_json::from_slice(&self.body).context("request body is not valid JSON for the form")
    }

    /// Decode the query string into `T`
    pub fn bind_query<T: DeserializeOwned>(&self) -> Result<T> {
        let Query(value) = Query::<T>::try_from_uri(&self.uri)
            .map_err(|e| anyhow!("cannot decode query string: {}", e))?;
        Ok(value)
    }
}

fn parse_query(uri: &Uri) -> Result<HashMap<String, String>> {
    let Query(query) = Query::<HashMap<String, String>>::try_from_uri(uri)
        .map_err(|e| anyhow!("cannot decode query string: {}", e))?;
    Ok(query)
}

impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Envelope;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();

        let query = parse_query(&parts.uri).map_err(|e| {
            Envelope::error(StatusCode::BAD_REQUEST, Some(&e), "cannot read query string")
        })?;

        let auth = match parts.extensions.get::<SharedAuthProvider>() {
            Some(provider) => match provider.extract_context(&parts.headers).await {
                Ok(auth) => auth,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot resolve caller identity, treating as anonymous");
                    AuthContext::Anonymous
                }
            },
            None => AuthContext::Anonymous,
        };

        let body = axum::body::to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
            let e = anyhow!("{}", e);
            Envelope::error(StatusCode::BAD_REQUEST, Some(&e), "cannot read request body")
        })?;

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            params,
            query,
            headers: parts.headers,
            body,
            auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct NameFilter {
        name: Option<String>,
        min_price: Option<f64>,
    }

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    #[test]
    fn test_query_and_params() {
        let ctx = RequestContext::new()
            .with_uri("/product/list?limit=5&sort=name%3Adesc")
            .expect("valid uri")
            .with_param("id", "42");

        assert_eq!(ctx.query("limit"), Some("5"));
        assert_eq!(ctx.query("sort"), Some("name:desc"));
        assert_eq!(ctx.query("page"), None);
        assert_eq!(ctx.param("id"), Some("42"));
        assert_eq!(ctx.param("other"), None);
    }

    #[test]
    fn test_bind_query_decodes_typed_fields() {
        let ctx = RequestContext::new()
            .with_uri("/product/list?name=lamp&min_price=9.5&page=2")
            .unwrap();
        let filter: NameFilter = ctx.bind_query().expect("query decodes");
        assert_eq!(filter.name.as_deref(), Some("lamp"));
        assert_eq!(filter.min_price, Some(9.5));

        let bad = RequestContext::new()
            .with_uri("/product/list?min_price=cheap")
            .unwrap();
        assert!(bad.bind_query::<NameFilter>().is_err());
    }

    #[test]
    fn test_bind_json() {
        let ctx = RequestContext::new().with_json(&json!({"name": "lamp"}));
        let payload: Payload = ctx.bind_json().expect("body decodes");
        assert_eq!(payload.name, "lamp");

        assert!(RequestContext::new().bind_json::<Payload>().is_err());
        assert!(
            RequestContext::new()
                .with_body("{not json")
                .bind_json::<Payload>()
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_extractor_reads_request() {
        let req = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/product/create?debug=1")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"name":"lamp"}"#))
            .expect("failed to build request");

        let ctx = RequestContext::from_request(req, &())
            .await
            .expect("extraction succeeds");

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.query("debug"), Some("1"));
        assert!(ctx.auth().is_anonymous());
        let payload: Payload = ctx.bind_json().unwrap();
        assert_eq!(payload.name, "lamp");
    }
}
