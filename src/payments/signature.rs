//! Request signing shared with the gateway
//!
//! Every request and response exchanged with the gateway carries a `pg_sig`
//! digest over the endpoint name, the non-empty parameter values in key order
//! and the merchant secret, joined with `;`. Both sides recompute the digest
//! over the same canonical sequence, so any deviation here rejects every
//! request.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::payments::traits::SaltSource;
use crate::payments::types::{ParameterSet, SIGNATURE_FIELD};

pub const INIT_PAYMENT_SCRIPT: &str = "init_payment.php";

const SEPARATOR: &str = ";";
const SALT_LENGTH: usize = 32;
// Base used to resolve relative callback paths when extracting their script name.
const RELATIVE_BASE: &str = "http://localhost/";

/// Digest function applied to the canonical string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// Wire-compatible default of the gateway protocol
    #[default]
    Md5,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    fn hex_digest(&self, input: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 => format!("{:x}", md5::compute(input)),
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(input)),
            DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(input)),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(DigestAlgorithm::Sha512),
            other => Err(GatewayError::configuration(format!(
                "Unsupported digest algorithm '{}'",
                other
            ))),
        }
    }
}

/// Script name that opens the signed sequence. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    /// Builds an endpoint from a script name or path, keeping its last segment.
    pub fn new(name: &str) -> GatewayResult<Self> {
        let base = name
            .trim()
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or_default();

        if base.is_empty() {
            return Err(GatewayError::configuration("Endpoint name cannot be empty"));
        }

        Ok(Self(base.to_string()))
    }

    /// Endpoint of a callback URL, absolute or site-relative.
    pub fn from_url(url: &str) -> GatewayResult<Self> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(RELATIVE_BASE)
                .and_then(|base| base.join(url))
                .map_err(|e| {
                    GatewayError::configuration(format!("Invalid callback URL '{}': {}", url, e))
                })?,
            Err(e) => {
                return Err(GatewayError::configuration(format!(
                    "Invalid callback URL '{}': {}",
                    url, e
                )))
            }
        };

        Self::new(parsed.path())
    }

    pub fn init_payment() -> Self {
        Self(INIT_PAYMENT_SCRIPT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Merchant secret shared with the gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(secret: impl Into<String>) -> GatewayResult<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(GatewayError::configuration("secretKey required"));
        }
        Ok(Self(secret))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignatureEngine {
    algorithm: DigestAlgorithm,
}

impl SignatureEngine {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Lowercase hex digest of `endpoint;value1;...;valueN;secret`.
    ///
    /// Null and empty values are skipped, the remaining values follow their
    /// keys in byte-wise ascending order. Key names never enter the input.
    pub fn sign(&self, endpoint: &Endpoint, params: &ParameterSet, secret: &SecretKey) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(params.len() + 2);
        let values: Vec<_> = params.signable_values().collect();

        parts.push(endpoint.as_str());
        parts.extend(values.iter().map(|v| &**v));
        parts.push(secret.expose());

        self.algorithm.hex_digest(parts.join(SEPARATOR).as_bytes())
    }

    /// Checks the `pg_sig` carried by `params_with_sig` in constant time.
    pub fn verify(
        &self,
        endpoint: &Endpoint,
        params_with_sig: &ParameterSet,
        secret: &SecretKey,
    ) -> bool {
        let mut params = params_with_sig.clone();
        let provided = match params.remove(SIGNATURE_FIELD) {
            Some(value) => match value.to_wire() {
                Some(sig) => sig.trim().to_ascii_lowercase(),
                None => return false,
            },
            None => return false,
        };

        let expected = self.sign(endpoint, &params, secret);
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }

    /// Replaces any existing `pg_sig` with a fresh signature over `params`.
    pub fn attach(&self, endpoint: &Endpoint, params: &mut ParameterSet, secret: &SecretKey) {
        params.remove(SIGNATURE_FIELD);
        let signature = self.sign(endpoint, params, secret);
        params.insert(SIGNATURE_FIELD, signature);
    }
}

/// Salt source backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngSalt;

impl SaltSource for OsRngSalt {
    fn generate(&self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(SALT_LENGTH)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretKey {
        SecretKey::new("topsecret").unwrap()
    }

    #[test]
    fn test_reference_vector() {
        let engine = SignatureEngine::default();
        let params = ParameterSet::new()
            .with("pg_order_id", "42")
            .with("pg_amount", "10.00");

        let digest = engine.sign(&Endpoint::init_payment(), &params, &secret());
        assert_eq!(digest, "a164df91ca6da89f6dea833f37a5368e");
    }

    #[test]
    fn test_digest_is_lowercase_hex_of_expected_length() {
        let params = ParameterSet::new().with("pg_a", "1");
        let endpoint = Endpoint::new("result").unwrap();

        for (algorithm, len) in [
            (DigestAlgorithm::Md5, 32),
            (DigestAlgorithm::Sha256, 64),
            (DigestAlgorithm::Sha512, 128),
        ] {
            let digest = SignatureEngine::new(algorithm).sign(&endpoint, &params, &secret());
            assert_eq!(digest.len(), len);
            assert!(digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_verify_accepts_attached_signature() {
        let engine = SignatureEngine::default();
        let endpoint = Endpoint::new("result").unwrap();
        let mut params = ParameterSet::new()
            .with("pg_order_id", "42")
            .with("pg_salt", "abc");

        engine.attach(&endpoint, &mut params, &secret());
        assert!(engine.verify(&endpoint, &params, &secret()));
    }

    #[test]
    fn test_verify_accepts_uppercase_signature() {
        let engine = SignatureEngine::default();
        let endpoint = Endpoint::new("result").unwrap();
        let params = ParameterSet::new().with("pg_order_id", "42");
        let sig = engine.sign(&endpoint, &params, &secret()).to_ascii_uppercase();

        assert!(engine.verify(&endpoint, &params.with(SIGNATURE_FIELD, sig), &secret()));
    }

    #[test]
    fn test_verify_rejects_missing_or_empty_signature() {
        let engine = SignatureEngine::default();
        let endpoint = Endpoint::new("result").unwrap();
        let params = ParameterSet::new().with("pg_order_id", "42");

        assert!(!engine.verify(&endpoint, &params, &secret()));
        assert!(!engine.verify(&endpoint, &params.with(SIGNATURE_FIELD, ""), &secret()));
    }

    #[test]
    fn test_verify_rejects_wrong_secret_and_endpoint() {
        let engine = SignatureEngine::default();
        let endpoint = Endpoint::new("result").unwrap();
        let mut params = ParameterSet::new().with("pg_order_id", "42");
        engine.attach(&endpoint, &mut params, &secret());

        let other_secret = SecretKey::new("othersecret").unwrap();
        assert!(!engine.verify(&endpoint, &params, &other_secret));
        assert!(!engine.verify(&Endpoint::new("check").unwrap(), &params, &secret()));
    }

    #[test]
    fn test_algorithms_are_not_interchangeable() {
        let endpoint = Endpoint::new("result").unwrap();
        let mut params = ParameterSet::new().with("pg_order_id", "42");
        SignatureEngine::new(DigestAlgorithm::Sha256).attach(&endpoint, &mut params, &secret());

        assert!(!SignatureEngine::default().verify(&endpoint, &params, &secret()));
    }

    #[test]
    fn test_endpoint_takes_last_path_segment() {
        assert_eq!(Endpoint::new("init_payment.php").unwrap().as_str(), "init_payment.php");
        assert_eq!(Endpoint::new("/platron/result").unwrap().as_str(), "result");
        assert_eq!(Endpoint::new("/platron/result/").unwrap().as_str(), "result");
    }

    #[test]
    fn test_endpoint_from_url() {
        assert_eq!(
            Endpoint::from_url("https://shop.example/platron/result?x=1")
                .unwrap()
                .as_str(),
            "result"
        );
        assert_eq!(
            Endpoint::from_url("/platron/check").unwrap().as_str(),
            "check"
        );
    }

    #[test]
    fn test_empty_endpoint_is_configuration_error() {
        assert!(matches!(
            Endpoint::new(""),
            Err(GatewayError::Configuration { .. })
        ));
        assert!(matches!(
            Endpoint::new("///"),
            Err(GatewayError::Configuration { .. })
        ));
        assert!(Endpoint::from_url("https://shop.example/").is_err());
    }

    #[test]
    fn test_blank_secret_rejected_and_redacted() {
        assert!(SecretKey::new("  ").is_err());
        assert_eq!(format!("{:?}", secret()), "SecretKey(***)");
    }

    #[test]
    fn test_digest_algorithm_parsing() {
        assert_eq!("MD5".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Md5);
        assert_eq!(
            "sha-256".parse::<DigestAlgorithm>().unwrap(),
            DigestAlgorithm::Sha256
        );
        assert!("crc32".parse::<DigestAlgorithm>().is_err());
    }

    #[test]
    fn test_salt_is_random_alphanumeric() {
        let first = OsRngSalt.generate();
        let second = OsRngSalt.generate();

        assert_eq!(first.len(), SALT_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
