//! Bearer-credential verification against the hosted identity provider.
//!
//! Firebase ID tokens are RS256 JWTs signed by Google. Verification needs the
//! project id plus Google's public signing keys, which are fetched as a JWK
//! set and cached. When no provider is configured a fixed development
//! identity is returned for any token, but only if the operator opted in.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use jsonwebtoken::{
    decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, EncodingKey, Validation,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const KEY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Unknown key ids trigger a refetch at most this often.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

pub const DEV_UID: &str = "dev-admin";
pub const DEV_EMAIL: &str = "admin@cradlebridgeschools.com";

/// The verified caller, attached to requests by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn development() -> Self {
        Self {
            uid: DEV_UID.to_string(),
            email: Some(DEV_EMAIL.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("credential rejected: {0}")]
    Rejected(String),

    #[error("identity provider unavailable")]
    Unavailable(#[source] anyhow::Error),
}

// ── Configuration ────────────────────────────────────────────────────────────

/// Service-account material for the Firebase project.
#[derive(Clone)]
pub struct FirebaseCredentials {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

impl fmt::Debug for FirebaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseCredentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl FirebaseCredentials {
    /// All three parts enable verification; none means "unconfigured".
    /// Anything in between is a configuration error.
    pub fn from_parts(
        project_id: Option<String>,
        client_email: Option<String>,
        private_key: Option<String>,
    ) -> Result<Option<Self>> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (
            present(project_id),
            present(client_email),
            present(private_key),
        ) {
            (Some(project_id), Some(client_email), Some(private_key)) => Ok(Some(Self {
                project_id,
                client_email,
                // Keys pasted into env files usually carry literal "\n".
                private_key: private_key.replace("\\n", "\n"),
            })),
            (None, None, None) => Ok(None),
            _ => bail!(
                "incomplete Firebase configuration: FIREBASE_PROJECT_ID, FIREBASE_CLIENT_EMAIL \
                 and FIREBASE_PRIVATE_KEY must be set together"
            ),
        }
    }
}

// ── Provider ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum IdentityProvider {
    Firebase(FirebaseVerifier),
    /// Accepts every token as the fixed development identity.
    Development,
}

impl IdentityProvider {
    /// Chooses the provider at startup. Without credentials the development
    /// fallback is used only when `allow_fallback` is set.
    pub fn configure(credentials: Option<FirebaseCredentials>, allow_fallback: bool) -> Result<Self> {
        match credentials {
            Some(creds) => {
                let verifier = FirebaseVerifier::new(&creds, GOOGLE_JWKS_URL)?;
                info!(
                    project_id = %creds.project_id,
                    client_email = %creds.client_email,
                    "firebase token verification enabled"
                );
                Ok(Self::Firebase(verifier))
            }
            None if allow_fallback => {
                warn!(
                    uid = DEV_UID,
                    "no identity provider configured: ANY bearer token is accepted as the \
                     development admin. Never run this way in production."
                );
                Ok(Self::Development)
            }
            None => bail!(
                "no identity provider configured: set FIREBASE_PROJECT_ID, FIREBASE_CLIENT_EMAIL \
                 and FIREBASE_PRIVATE_KEY, or CRADLE_ALLOW_DEV_AUTH=true to accept any token"
            ),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Identity, VerifyError> {
        match self {
            Self::Firebase(verifier) => verifier.verify(token).await,
            Self::Development => Ok(Identity::development()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Firebase(_) => "firebase",
            Self::Development => "development",
        }
    }
}

// ── Firebase ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
}

struct CachedKeys {
    set: JwkSet,
    fetched: Instant,
}

struct Inner {
    jwks_url: String,
    client: reqwest::Client,
    validation: Validation,
    keys: RwLock<Option<CachedKeys>>,
}

#[derive(Clone)]
pub struct FirebaseVerifier {
    inner: Arc<Inner>,
}

impl fmt::Debug for FirebaseVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseVerifier")
            .field("jwks_url", &self.inner.jwks_url)
            .finish_non_exhaustive()
    }
}

impl FirebaseVerifier {
    pub fn new(creds: &FirebaseCredentials, jwks_url: &str) -> Result<Self> {
        // Not used for verification, but a key that does not parse means the
        // service account was pasted wrong.
        EncodingKey::from_rsa_pem(creds.private_key.as_bytes())
            .context("FIREBASE_PRIVATE_KEY is not a valid RSA PEM key")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("build identity provider http client")?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[creds.project_id.as_str()]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            creds.project_id
        )]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        Ok(Self {
            inner: Arc::new(Inner {
                jwks_url: jwks_url.to_string(),
                client,
                validation,
                keys: RwLock::new(None),
            }),
        })
    }

    pub async fn verify(&self, token: &str) -> Result<Identity, VerifyError> {
        let header = decode_header(token).map_err(|e| VerifyError::Rejected(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::Rejected(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Rejected("token has no key id".into()))?;

        let key = self.decoding_key(&kid).await?;
        let data = decode::<FirebaseClaims>(token, &key, &self.inner.validation)
            .map_err(|e| VerifyError::Rejected(e.to_string()))?;

        if data.claims.sub.is_empty() {
            return Err(VerifyError::Rejected("empty subject".into()));
        }
        Ok(Identity {
            uid: data.claims.sub,
            email: data.claims.email,
        })
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        {
            let cache = self.inner.keys.read().await;
            if let Some(cached) = cache.as_ref() {
                let age = cached.fetched.elapsed();
                if age < KEY_CACHE_TTL {
                    if let Some(jwk) = cached.set.find(kid) {
                        return to_decoding_key(jwk);
                    }
                    if age < MIN_REFETCH_INTERVAL {
                        return Err(VerifyError::Rejected(format!("unknown key id {kid}")));
                    }
                }
            }
        }

        let set = self.fetch_keys().await.map_err(VerifyError::Unavailable)?;
        debug!(keys = set.keys.len(), "refreshed identity provider signing keys");
        let key = match set.find(kid) {
            Some(jwk) => to_decoding_key(jwk),
            None => Err(VerifyError::Rejected(format!("unknown key id {kid}"))),
        };
        *self.inner.keys.write().await = Some(CachedKeys {
            set,
            fetched: Instant::now(),
        });
        key
    }

    async fn fetch_keys(&self) -> Result<JwkSet> {
        self.inner
            .client
            .get(&self.inner.jwks_url)
            .send()
            .await
            .context("fetch signing keys")?
            .error_for_status()
            .context("signing key endpoint returned an error")?
            .json::<JwkSet>()
            .await
            .context("decode signing keys")
    }
}

fn to_decoding_key(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey, VerifyError> {
    DecodingKey::from_jwk(jwk).map_err(|e| VerifyError::Rejected(e.to_string()))
}
