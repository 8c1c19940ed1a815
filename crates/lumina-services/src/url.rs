//! Signed transformation URLs
//!
//! URL shape: `{base}/{assetId}/{param-string}?sig={hmac}&t={unixSeconds}`
//! when signing is enabled; without signing the query suffix is omitted.
//! The signature is an HMAC-SHA256 over `{assetId}:{paramString}:{timestamp}`,
//! base64url-encoded without padding, compared in constant time, and expires
//! once the timestamp is older than the configured TTL (clock-based expiry,
//! no revocation list). Signing is opt-in per deployment: a non-signing
//! configuration treats every signature as valid.
//!
//! This service is independent of storage and metadata: it encodes and
//! verifies URLs, nothing else.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use lumina_core::{AppError, Config, TransformParams, TransformValidation};

type HmacSha256 = Hmac<Sha256>;

/// Decoded transformation URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransformUrl {
    pub id: Uuid,
    pub params: TransformParams,
    pub signature: Option<String>,
    pub timestamp: Option<i64>,
}

#[derive(Clone)]
struct SigningConfig {
    secret: String,
    ttl_secs: u64,
}

/// Generates, parses, and verifies transformation URLs.
#[derive(Clone)]
pub struct UrlTransformService {
    base_url: String,
    signing: Option<SigningConfig>,
}

impl UrlTransformService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let signing = if config.url_signing_enabled {
            let secret = config.url_signing_secret.clone().ok_or_else(|| {
                AppError::Internal("URL signing enabled without a secret".to_string())
            })?;
            Some(SigningConfig {
                secret,
                ttl_secs: config.url_signature_ttl_secs,
            })
        } else {
            None
        };
        Ok(UrlTransformService {
            base_url: config.public_base_url.trim_end_matches('/').to_string(),
            signing,
        })
    }

    /// Encode a transformation URL for an asset. The parameter set is
    /// validated first; every violation is reported at once.
    pub fn generate_url(
        &self,
        asset_id: Uuid,
        params: &TransformParams,
    ) -> Result<String, AppError> {
        let check = params.validate();
        if !check.valid {
            return Err(AppError::Validation(check.errors.join("; ")));
        }

        let param_string = params.to_param_string();
        let url = format!("{}/{}/{}", self.base_url, asset_id, param_string);

        match &self.signing {
            Some(signing) => {
                let timestamp = chrono::Utc::now().timestamp();
                let signature = sign(&signing.secret, asset_id, &param_string, timestamp)?;
                Ok(format!("{}?sig={}&t={}", url, signature, timestamp))
            }
            None => Ok(url),
        }
    }

    /// Decode a transformation URL. Returns `None` for anything that does
    /// not carry a recognizable asset id.
    pub fn parse_url(&self, url: &str) -> Option<ParsedTransformUrl> {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };

        let segments: Vec<&str> = path.split('/').collect();
        let (id, params) = match segments.as_slice() {
            [] => return None,
            [.., second_last, last] => {
                if let Ok(id) = second_last.parse::<Uuid>() {
                    (id, TransformParams::from_param_string(last))
                } else if let Ok(id) = last.parse::<Uuid>() {
                    // No parameter segment at all.
                    (id, TransformParams::default())
                } else {
                    return None;
                }
            }
            [only] => (only.parse::<Uuid>().ok()?, TransformParams::default()),
        };

        let mut signature = None;
        let mut timestamp = None;
        if let Some(query) = query {
            for pair in query.split('&') {
                match pair.split_once('=') {
                    Some(("sig", value)) => signature = Some(value.to_string()),
                    Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
                    _ => {}
                }
            }
        }

        Some(ParsedTransformUrl {
            id,
            params,
            signature,
            timestamp,
        })
    }

    /// Recompute the signature from the parsed transformation set and compare
    /// in constant time; reject expired timestamps. Always true when signing
    /// is disabled.
    pub fn validate_signature(&self, parsed: &ParsedTransformUrl) -> bool {
        let signing = match &self.signing {
            Some(signing) => signing,
            None => return true,
        };
        let (signature, timestamp) = match (&parsed.signature, parsed.timestamp) {
            (Some(signature), Some(timestamp)) => (signature, timestamp),
            _ => return false,
        };

        let age = chrono::Utc::now().timestamp() - timestamp;
        if age > signing.ttl_secs as i64 {
            tracing::debug!(asset_id = %parsed.id, age_secs = age, "Rejected expired URL signature");
            return false;
        }

        let expected = match sign(
            &signing.secret,
            parsed.id,
            &parsed.params.to_param_string(),
            timestamp,
        ) {
            Ok(expected) => expected,
            Err(_) => return false,
        };
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }

    /// Range/enumeration checks for a transformation set; collects every
    /// violation instead of short-circuiting.
    pub fn validate_transformations(&self, params: &TransformParams) -> TransformValidation {
        params.validate()
    }

    pub fn signing_enabled(&self) -> bool {
        self.signing.is_some()
    }
}

fn sign(
    secret: &str,
    asset_id: Uuid,
    param_string: &str,
    timestamp: i64,
) -> Result<String, AppError> {
    let payload = format!("{}:{}:{}", asset_id, param_string, timestamp);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}
