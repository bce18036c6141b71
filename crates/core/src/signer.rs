//! Request signing
//!
//! Every NetStorage request carries two headers derived from the account
//! credentials: an auth-data header describing the signing input and an
//! auth-sign header holding an HMAC-SHA256 over that data, the request path
//! and the action string.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use rand::Rng as _;
use secrecy::{ExposeSecret as _, SecretString};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the action string
pub const ACTION_HEADER: &str = "X-Akamai-ACS-Action";

/// Header carrying the auth data string
pub const AUTH_DATA_HEADER: &str = "X-Akamai-ACS-Auth-Data";

/// Header carrying the base64 signature
pub const AUTH_SIGN_HEADER: &str = "X-Akamai-ACS-Auth-Sign";

/// Auth data format version understood by the server
const AUTH_VERSION: u32 = 5;

/// Placeholder for the client and server IP fields of the auth data
const UNSPECIFIED_IP: &str = "0.0.0.0";

/// Account credentials: key name plus shared secret
#[derive(Debug)]
pub struct Credentials {
    key_name: String,
    secret: SecretString,
}

impl Credentials {
    /// Create credentials from a key name and its shared secret
    pub fn new(key_name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// Key name identifying the account
    pub fn key_name(&self) -> &str {
        &self.key_name
    }
}

/// Source of per-request nonces
#[cfg_attr(test, mockall::automock)]
pub trait NonceSource: Send + Sync {
    /// Produce a fresh non-negative nonce
    fn next_nonce(&self) -> u64;
}

/// Default nonce source backed by the thread-local CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNonce;

impl NonceSource for RandomNonce {
    fn next_nonce(&self) -> u64 {
        // Stays within the signed 63-bit range so servers parsing it as a
        // signed integer accept it.
        rand::rng().random_range(0..=i64::MAX as u64)
    }
}

/// The two authentication header values for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    /// Value of the auth-data header
    pub data: String,
    /// Value of the auth-sign header
    pub signature: String,
}

/// Computes authentication headers for a set of credentials
#[derive(Clone)]
pub struct Signer {
    credentials: Arc<Credentials>,
    nonces: Arc<dyn NonceSource>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Create a signer drawing nonces from [`RandomNonce`]
    pub fn new(credentials: Credentials) -> Self {
        Self::with_nonce_source(credentials, Arc::new(RandomNonce))
    }

    /// Create a signer with a custom nonce source
    pub fn with_nonce_source(credentials: Credentials, nonces: Arc<dyn NonceSource>) -> Self {
        Self {
            credentials: Arc::new(credentials),
            nonces,
        }
    }

    /// Key name of the underlying credentials
    pub fn key_name(&self) -> &str {
        self.credentials.key_name()
    }

    /// Sign a request path and action.
    ///
    /// `nonce` and `timestamp` are generated when `None`; passing them
    /// explicitly makes the output fully deterministic.
    pub fn sign(
        &self,
        rel_path: &str,
        action: &str,
        nonce: Option<u64>,
        timestamp: Option<i64>,
    ) -> Result<AuthHeaders> {
        let nonce = nonce.unwrap_or_else(|| self.nonces.next_nonce());
        let timestamp = timestamp.unwrap_or_else(|| jiff::Timestamp::now().as_second());

        let data = format!(
            "{AUTH_VERSION}, {UNSPECIFIED_IP}, {UNSPECIFIED_IP}, {timestamp}, {nonce}, {}",
            self.credentials.key_name
        );
        let sign_string = format!("{rel_path}\nx-akamai-acs-action:{action}\n");

        let mut mac =
            HmacSha256::new_from_slice(self.credentials.secret.expose_secret().as_bytes())
                .map_err(|e| Error::Config(format!("HMAC error: {e}")))?;
        mac.update(data.as_bytes());
        mac.update(sign_string.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(AuthHeaders { data, signature })
    }

    /// Sign with a generated nonce and the current time
    pub fn auth_headers(&self, rel_path: &str, action: &str) -> Result<AuthHeaders> {
        self.sign(rel_path, action, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const GOLDEN_PATH: &str = "/dir1/dir2/file.ext";
    const GOLDEN_ACTION: &str =
        "version=1&action=upload&md5=0123456789abcdef0123456789abcdef&mtime=1260000000";

    fn golden_signer() -> Signer {
        Signer::new(Credentials::new("key1", "abcdefghij"))
    }

    #[test]
    fn test_sign_golden_vector() {
        let headers = golden_signer()
            .sign(GOLDEN_PATH, GOLDEN_ACTION, Some(382644692), Some(1280000000))
            .unwrap();

        assert_eq!(
            headers.data,
            "5, 0.0.0.0, 0.0.0.0, 1280000000, 382644692, key1"
        );
        assert_eq!(
            headers.signature,
            "Ix98xZYkwygidinpmtKVk9+xPNn5QjozWDMROLjVWSo="
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = golden_signer();
        let a = signer
            .sign(GOLDEN_PATH, GOLDEN_ACTION, Some(1), Some(2))
            .unwrap();
        let b = signer
            .sign(GOLDEN_PATH, GOLDEN_ACTION, Some(1), Some(2))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_depends_on_path_and_action() {
        let signer = golden_signer();
        let base = signer
            .sign(GOLDEN_PATH, GOLDEN_ACTION, Some(1), Some(2))
            .unwrap();
        let other_path = signer
            .sign("/dir1/other.ext", GOLDEN_ACTION, Some(1), Some(2))
            .unwrap();
        let other_action = signer
            .sign(GOLDEN_PATH, "version=1&action=list", Some(1), Some(2))
            .unwrap();

        assert_eq!(base.data, other_path.data);
        assert_ne!(base.signature, other_path.signature);
        assert_ne!(base.signature, other_action.signature);
    }

    #[test]
    fn test_sign_uses_nonce_source() {
        let mut nonces = MockNonceSource::new();
        nonces.expect_next_nonce().times(1).return_const(42u64);

        let signer =
            Signer::with_nonce_source(Credentials::new("key1", "secret"), Arc::new(nonces));
        let headers = signer.sign("/1/", "a", None, Some(100)).unwrap();

        assert_eq!(headers.data, "5, 0.0.0.0, 0.0.0.0, 100, 42, key1");
    }

    #[test]
    fn test_explicit_nonce_skips_nonce_source() {
        let mut nonces = MockNonceSource::new();
        nonces.expect_next_nonce().never();

        let signer =
            Signer::with_nonce_source(Credentials::new("key1", "secret"), Arc::new(nonces));
        let headers = signer.sign("/1/", "a", Some(7), Some(100)).unwrap();

        assert_eq!(headers.data, "5, 0.0.0.0, 0.0.0.0, 100, 7, key1");
    }

    #[test]
    fn test_default_timestamp_is_current_time() {
        let before = jiff::Timestamp::now().as_second();
        let headers = golden_signer().sign("/1/", "a", Some(1), None).unwrap();
        let after = jiff::Timestamp::now().as_second();

        let timestamp: i64 = headers.data.split(", ").nth(3).unwrap().parse().unwrap();
        assert!(timestamp >= before && timestamp <= after);
    }

    #[test]
    fn test_generated_auth_data_is_unique() {
        let signer = golden_signer();
        let seen: HashSet<String> = (0..1000)
            .map(|_| signer.auth_headers("/1/", "a").unwrap().data)
            .collect();
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_debug_hides_secret() {
        let credentials = Credentials::new("key1", "abcdefghij");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("key1"));
        assert!(!rendered.contains("abcdefghij"));
    }
}
