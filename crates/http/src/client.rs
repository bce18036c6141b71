//! NetStorage client implementation
//!
//! Issues signed usage API requests over reqwest and implements the
//! Lister trait from ns-core.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method, Request};
use url::Url;

use ns_core::signer::{ACTION_HEADER, AUTH_DATA_HEADER, AUTH_SIGN_HEADER};
use ns_core::{
    AuthHeaders, ClientConfig, Credentials, Error, FailureSink, ListRequest, ListResult, Lister,
    NonceSource, RandomNonce, RequestFailure, Result, Signer,
};

use crate::dump::{dump_request, dump_response};
use crate::xml::decode_listing;

/// Upper bound on the diagnostic host lookup after a failed call
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Client for the NetStorage usage API
///
/// Cheap to clone; clones share the HTTP connection pool and credentials.
#[derive(Clone)]
pub struct NetStorageClient {
    http_client: Client,
    signer: Signer,
    config: Arc<ClientConfig>,
    failures: Option<Arc<dyn FailureSink>>,
}

impl fmt::Debug for NetStorageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetStorageClient")
            .field("key_name", &self.signer.key_name())
            .field("config", &self.config)
            .field("failure_sink", &self.failures.is_some())
            .finish()
    }
}

/// Builder for [`NetStorageClient`]
pub struct NetStorageClientBuilder {
    credentials: Credentials,
    config: ClientConfig,
    http_client: Option<Client>,
    nonces: Arc<dyn NonceSource>,
    failures: Option<Arc<dyn FailureSink>>,
}

impl NetStorageClientBuilder {
    /// Use a custom configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an existing reqwest client; timeouts and user agent from the
    /// configuration are then not applied
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Draw nonces from a custom source
    pub fn nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    /// Report failed calls to a diagnostics sink
    pub fn failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failures = Some(sink);
        self
    }

    pub fn build(self) -> Result<NetStorageClient> {
        self.config.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => build_http_client(&self.config)?,
        };

        Ok(NetStorageClient {
            http_client,
            signer: Signer::with_nonce_source(self.credentials, self.nonces),
            config: Arc::new(self.config),
            failures: self.failures,
        })
    }
}

fn build_http_client(config: &ClientConfig) -> Result<Client> {
    let mut builder = Client::builder();

    if let Some(timeout) = &config.timeout {
        builder = builder
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .timeout(Duration::from_millis(timeout.read_ms));
    }

    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }

    builder
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))
}

impl NetStorageClient {
    /// Create a client with default configuration
    pub fn new(key_name: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        Self::builder(Credentials::new(key_name, secret)).build()
    }

    /// Start building a client for the given credentials
    pub fn builder(credentials: Credentials) -> NetStorageClientBuilder {
        NetStorageClientBuilder {
            credentials,
            config: ClientConfig::default(),
            http_client: None,
            nonces: Arc::new(RandomNonce),
            failures: None,
        }
    }

    /// Compute the auth headers for a path and action.
    ///
    /// `nonce` and `timestamp` are generated when `None`.
    pub fn sign(
        &self,
        rel_path: &str,
        action: &str,
        nonce: Option<u64>,
        timestamp: Option<i64>,
    ) -> Result<AuthHeaders> {
        self.signer.sign(rel_path, action, nonce, timestamp)
    }

    /// Attach freshly generated auth headers to a request
    pub fn auth(&self, request: &mut Request, rel_path: &str, action: &str) -> Result<()> {
        let auth = self.signer.auth_headers(rel_path, action)?;
        let headers = request.headers_mut();
        headers.insert(header_name(AUTH_DATA_HEADER)?, header_value(&auth.data)?);
        headers.insert(header_name(AUTH_SIGN_HEADER)?, header_value(&auth.signature)?);
        Ok(())
    }

    /// Absolute URL a listing request is sent to
    pub fn list_url(&self, request: &ListRequest) -> String {
        let host = request.host(&self.config.domain);
        format!("{}{}", self.config.base_url(&host), request.relative_path())
    }

    /// Build the signed GET request for a listing
    fn build_list_request(&self, request: &ListRequest) -> Result<(Request, String)> {
        let action = request.action();
        let rel_path = request.relative_path();
        let abs_url = self.list_url(request);

        if !rel_path.starts_with('/') {
            return Err(Error::InvalidRequest(format!(
                "Relative path '{rel_path}' must start with '/'"
            )));
        }

        let url = Url::parse(&abs_url)
            .map_err(|e| Error::InvalidRequest(format!("Invalid URL '{abs_url}': {e}")))?;
        self.check_host(request, &url)?;

        let mut http_request = Request::new(Method::GET, url);
        http_request
            .headers_mut()
            .insert(header_name(ACTION_HEADER)?, header_value(&action)?);
        self.auth(&mut http_request, &rel_path, &action)?;

        Ok((http_request, abs_url))
    }

    /// Reject URLs whose host drifted away from the storage group host
    fn check_host(&self, request: &ListRequest, url: &Url) -> Result<()> {
        let base = self.config.base_url(&request.host(&self.config.domain));
        let expected = Url::parse(&base)
            .map_err(|e| Error::InvalidRequest(format!("Invalid URL '{base}': {e}")))?;

        if url.host_str() != expected.host_str()
            || url.port_or_known_default() != expected.port_or_known_default()
        {
            return Err(Error::InvalidRequest(format!(
                "URL '{url}' does not point at host '{}'",
                expected.host_str().unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Hand a failure record to the sink, if there is one
    async fn report(
        &self,
        url: &str,
        ip: Option<String>,
        message: String,
        request: Vec<u8>,
        response: Vec<u8>,
    ) {
        let Some(sink) = &self.failures else {
            return;
        };

        let ip = match ip {
            Some(ip) => Some(ip),
            None => resolve_ip(url).await,
        };

        sink.record(RequestFailure {
            ip,
            message,
            request,
            response,
        });
    }

    /// Bounded prefix of an error body
    fn body_snippet(&self, body: &[u8]) -> String {
        let end = body.len().min(self.config.error_body_limit);
        String::from_utf8_lossy(&body[..end]).into_owned()
    }
}

#[async_trait]
impl Lister for NetStorageClient {
    async fn list(&self, request: &ListRequest) -> Result<ListResult> {
        let (http_request, url) = self.build_list_request(request)?;
        let request_dump = dump_request(&http_request);

        tracing::debug!(url = %url, max_entries = request.max_entries, "Listing directory");

        let response = match self.http_client.execute(http_request).await {
            Ok(response) => response,
            Err(e) => {
                let err = Error::Network {
                    url: url.clone(),
                    message: e.to_string(),
                };
                tracing::warn!(url = %url, error = %e, "List request failed");
                self.report(&url, None, format!("ERROR: {err}"), request_dump, Vec::new())
                    .await;
                return Err(err);
            }
        };

        let ip = response.remote_addr().map(|addr| addr.ip().to_string());
        let version = response.version();
        let status = response.status();
        let headers = response.headers().clone();

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                let err = Error::Network {
                    url: url.clone(),
                    message: format!("Failed to read response: {e}"),
                };
                tracing::warn!(url = %url, error = %e, "Reading list response failed");
                let response_dump = dump_response(version, status, &headers, &[]);
                self.report(&url, ip, format!("ERROR: {err}"), request_dump, response_dump)
                    .await;
                return Err(err);
            }
        };

        if !status.is_success() {
            let err = Error::Status {
                url: url.clone(),
                status: status.as_u16(),
                body: self.body_snippet(&body),
            };
            tracing::warn!(url = %url, status = status.as_u16(), "List request rejected");
            let response_dump = dump_response(version, status, &headers, &body);
            self.report(
                &url,
                ip,
                format!("BAD STATUSCODE: {err}"),
                request_dump,
                response_dump,
            )
            .await;
            return Err(err);
        }

        match decode_listing(&body) {
            Ok(result) => {
                tracing::debug!(
                    url = %url,
                    entries = result.entries.len(),
                    truncated = result.is_truncated(),
                    "Listing decoded"
                );
                Ok(result)
            }
            Err(e) => {
                let err = Error::Decode {
                    url: url.clone(),
                    message: e.to_string(),
                };
                tracing::warn!(url = %url, error = %e, "List response could not be decoded");
                let response_dump = dump_response(version, status, &headers, &body);
                self.report(&url, ip, err.to_string(), request_dump, response_dump)
                    .await;
                Err(err)
            }
        }
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::InvalidRequest(format!("Invalid header name '{name}': {e}")))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidRequest(format!("Invalid header value: {e}")))
}

/// Best-effort address lookup for diagnostics
async fn resolve_ip(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?.to_string();
    let port = url.port_or_known_default()?;

    let lookup = tokio::net::lookup_host((host.as_str(), port));
    match tokio::time::timeout(RESOLVE_TIMEOUT, lookup).await {
        Ok(Ok(mut addrs)) => addrs.next().map(|addr| addr.ip().to_string()),
        Ok(Err(e)) => {
            tracing::debug!(host = %host, error = %e, "Could not resolve host for diagnostics");
            None
        }
        Err(_) => {
            tracing::debug!(host = %host, "Timed out resolving host for diagnostics");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> NetStorageClient {
        NetStorageClient::new("key1", "abcdefghij").unwrap()
    }

    #[test]
    fn test_list_url() {
        let request = ListRequest::new(123, "example").path("/dir");
        assert_eq!(
            client().list_url(&request),
            "http://example-nsu.akamaihd.net/123/dir"
        );
    }

    #[test]
    fn test_list_url_with_endpoint() {
        let client = NetStorageClient::builder(Credentials::new("key1", "secret"))
            .config(ClientConfig::default().with_endpoint("http://127.0.0.1:9000/"))
            .build()
            .unwrap();
        let request = ListRequest::new(123, "example").resume("/123/dir/b");
        assert_eq!(client.list_url(&request), "http://127.0.0.1:9000/123/dir/b");
    }

    #[test]
    fn test_sign_matches_signer() {
        let headers = client()
            .sign(
                "/dir1/dir2/file.ext",
                "version=1&action=upload&md5=0123456789abcdef0123456789abcdef&mtime=1260000000",
                Some(382644692),
                Some(1280000000),
            )
            .unwrap();
        assert_eq!(headers.data, "5, 0.0.0.0, 0.0.0.0, 1280000000, 382644692, key1");
        assert_eq!(
            headers.signature,
            "Ix98xZYkwygidinpmtKVk9+xPNn5QjozWDMROLjVWSo="
        );
    }

    #[test]
    fn test_build_list_request_headers() {
        let request = ListRequest::new(123, "example").path("dir").max_entries(5);
        let (http_request, url) = client().build_list_request(&request).unwrap();

        assert_eq!(url, "http://example-nsu.akamaihd.net/123/dir");
        assert_eq!(http_request.method(), &Method::GET);

        let headers = http_request.headers();
        assert_eq!(
            headers["x-akamai-acs-action"],
            "version=1&action=list&format=xml&max_entries=5"
        );
        let data = headers["x-akamai-acs-auth-data"].to_str().unwrap();
        assert!(data.starts_with("5, 0.0.0.0, 0.0.0.0, "));
        assert!(data.ends_with(", key1"));
        assert!(headers.contains_key("x-akamai-acs-auth-sign"));
    }

    #[test]
    fn test_resume_token_without_slash_is_rejected() {
        let request = ListRequest::new(123, "grp").resume("123/sub");
        let err = client().build_list_request(&request).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(ref msg) if msg.contains("123/sub")));
    }

    #[test]
    fn test_foreign_host_is_rejected() {
        let request = ListRequest::new(123, "grp");
        let client = client();

        let url = Url::parse("http://grp-nsu.akamaihd.net/123/").unwrap();
        assert!(client.check_host(&request, &url).is_ok());

        let url = Url::parse("http://grp-nsu.akamaihd.net123/sub").unwrap();
        let err = client.check_host(&request, &url).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        let url = Url::parse("http://grp-nsu.akamaihd.net:8080/123/").unwrap();
        assert!(client.check_host(&request, &url).is_err());
    }

    #[test]
    fn test_resume_token_with_slash_keeps_host() {
        let request = ListRequest::new(123, "grp").resume("/123/sub");
        let (http_request, url) = client().build_list_request(&request).unwrap();
        assert_eq!(url, "http://grp-nsu.akamaihd.net/123/sub");
        assert_eq!(http_request.url().host_str(), Some("grp-nsu.akamaihd.net"));
    }

    #[test]
    fn test_invalid_key_name_is_an_error() {
        let client = NetStorageClient::new("bad\nkey", "secret").unwrap();
        let err = client
            .build_list_request(&ListRequest::new(1, "grp"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        let config = ClientConfig {
            scheme: "gopher".into(),
            ..Default::default()
        };
        let err = NetStorageClient::builder(Credentials::new("k", "s"))
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_body_snippet_is_bounded() {
        let body = vec![b'x'; 500];
        assert_eq!(client().body_snippet(&body).len(), 50);
        assert_eq!(client().body_snippet(b"short"), "short");
    }

    #[test]
    fn test_debug_omits_secret() {
        let rendered = format!("{:?}", client());
        assert!(rendered.contains("key1"));
        assert!(!rendered.contains("abcdefghij"));
    }
}
