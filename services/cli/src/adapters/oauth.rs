//! services/cli/src/adapters/oauth.rs
//!
//! OAuth 2.0 plumbing for the Classroom API: the client secret file, the
//! cached token file, the interactive consent flow, and a token source that
//! refreshes expired access tokens.

use chrono::{DateTime, Datelike, Duration, Utc};
use dialoguer::Input;
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Read-only scopes for course listings and the user's own coursework.
/// Changing these requires deleting a previously cached token.
pub const CLASSROOM_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/classroom.courses.readonly",
    "https://www.googleapis.com/auth/classroom.coursework.me.readonly",
];

/// Refresh this long before the recorded expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

const DEFAULT_REDIRECT_URI: &str = "http://localhost";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to read client secret file {path}: {source}")]
    ReadSecret {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse client secret file: {0}")]
    ParseSecret(String),
    #[error("Invalid authorization URL: {0}")]
    Url(String),
    #[error("Failed to read the authorization code: {0}")]
    Prompt(String),
    #[error("Token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token endpoint rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Failed to load cached token: {0}")]
    LoadToken(String),
    #[error("Failed to cache the OAuth token at {path}: {source}")]
    SaveToken {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Access token has expired and no refresh token is available; delete the cached token to re-authorize")]
    NoRefreshToken,
}

//=========================================================================================
// Client Secret
//=========================================================================================

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretRecord>,
    web: Option<ClientSecretRecord>,
}

#[derive(Deserialize)]
struct ClientSecretRecord {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// The OAuth client registered for this application.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthClient {
    /// Parses a downloaded client secret (`installed` or `web` layout).
    pub fn from_json(bytes: &[u8]) -> Result<Self, AuthError> {
        let file: ClientSecretFile =
            serde_json::from_slice(bytes).map_err(|e| AuthError::ParseSecret(e.to_string()))?;
        let record = file.installed.or(file.web).ok_or_else(|| {
            AuthError::ParseSecret("expected an 'installed' or 'web' section".to_string())
        })?;

        Ok(Self {
            redirect_uri: record
                .redirect_uris
                .into_iter()
                .next()
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            client_id: record.client_id,
            client_secret: record.client_secret,
            auth_uri: record.auth_uri,
            token_uri: record.token_uri,
            scopes: CLASSROOM_SCOPES.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let bytes = std::fs::read(path).map_err(|source| AuthError::ReadSecret {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&bytes)
    }

    /// Builds the consent URL, requesting offline access so a refresh token is issued.
    pub fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        let scope = self.scopes.join(" ");
        let url = reqwest::Url::parse_with_params(
            &self.auth_uri,
            &[
                ("access_type", "offline"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| AuthError::Url(e.to_string()))?;
        Ok(url.to_string())
    }

    /// Exchanges an authorization code for a token.
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
    ) -> Result<StoredToken, AuthError> {
        let response = self
            .request_token(
                http,
                &[
                    ("code", code),
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("redirect_uri", self.redirect_uri.as_str()),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await?;
        Ok(response.into_stored(Utc::now(), None))
    }

    /// Obtains a fresh access token. The old refresh token is kept if none is returned.
    pub async fn refresh(
        &self,
        http: &reqwest::Client,
        refresh_token: &str,
    ) -> Result<StoredToken, AuthError> {
        let response = self
            .request_token(
                http,
                &[
                    ("refresh_token", refresh_token),
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;
        Ok(response.into_stored(Utc::now(), Some(refresh_token.to_string())))
    }

    async fn request_token(
        &self,
        http: &reqwest::Client,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let response = http.post(&self.token_uri).form(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>().await?)
    }
}

//=========================================================================================
// Tokens
//=========================================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_stored(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry: self.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

/// A cached credential, in the same JSON layout as the common `oauth2` token files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// True once `now` is within the refresh skew of the expiry.
    /// A missing or zero-year expiry means the token does not expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) if expiry.year() > 1 => {
                expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now
            }
            _ => false,
        }
    }
}

/// Reads and writes the cached token file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<StoredToken, AuthError> {
        let bytes = std::fs::read(&self.path).map_err(|e| AuthError::LoadToken(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| AuthError::LoadToken(e.to_string()))
    }

    /// Writes the token, readable only by the owner on unix.
    pub fn save(&self, token: &StoredToken) -> Result<(), AuthError> {
        use std::io::Write;

        let to_save_error = |source: std::io::Error| AuthError::SaveToken {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_vec(token)
            .map_err(|e| to_save_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(to_save_error)?;
        // `mode` only applies on creation; tighten a pre-existing file too.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(to_save_error)?;
        }
        file.write_all(&json).map_err(to_save_error)?;
        Ok(())
    }
}

//=========================================================================================
// Token Source
//=========================================================================================

/// Hands out valid access tokens, refreshing and re-caching them when they expire.
pub struct TokenSource {
    client: OAuthClient,
    http: reqwest::Client,
    store: TokenStore,
    current: Mutex<StoredToken>,
}

impl TokenSource {
    pub fn new(
        client: OAuthClient,
        http: reqwest::Client,
        store: TokenStore,
        token: StoredToken,
    ) -> Self {
        Self {
            client,
            http,
            store,
            current: Mutex::new(token),
        }
    }

    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut token = self.current.lock().await;
        if token.is_expired(Utc::now()) {
            let refresh_token = token
                .refresh_token
                .clone()
                .ok_or(AuthError::NoRefreshToken)?;
            info!("Access token expired; refreshing.");
            let refreshed = self.client.refresh(&self.http, &refresh_token).await?;
            if let Err(e) = self.store.save(&refreshed) {
                warn!("Failed to cache refreshed token: {}", e);
            }
            *token = refreshed;
        }
        Ok(token.access_token.clone())
    }
}

/// Produces a token source from the cache, or runs the interactive flow and caches the result.
///
/// The token is validated (and refreshed if needed) before returning, so an
/// unusable credential fails here rather than in the middle of a run.
pub async fn authorize(
    client: OAuthClient,
    http: reqwest::Client,
    store: TokenStore,
) -> Result<TokenSource, AuthError> {
    let token = match store.load() {
        Ok(token) => token,
        Err(e) => {
            info!("No usable cached token ({}); starting the authorization flow.", e);
            let token = token_from_web(&client, &http).await?;
            info!("Saving credential file to: {}", store.path().display());
            store.save(&token)?;
            token
        }
    };
    let source = TokenSource::new(client, http, store, token);
    source.access_token().await?;
    Ok(source)
}

async fn token_from_web(
    client: &OAuthClient,
    http: &reqwest::Client,
) -> Result<StoredToken, AuthError> {
    let url = client.authorization_url("state-token")?;
    eprintln!(
        "Open the following link in your browser and paste the authorization code:\n{}",
        url
    );

    let code = if std::io::stdin().is_terminal() {
        tokio::task::spawn_blocking(|| {
            Input::<String>::new()
                .with_prompt("Authorization code")
                .interact_text()
        })
        .await
        .map_err(|e| AuthError::Prompt(e.to_string()))?
        .map_err(|e| AuthError::Prompt(e.to_string()))?
    } else {
        read_code(BufReader::new(tokio::io::stdin())).await?
    };

    client.exchange_code(http, code.trim()).await
}

/// Reads a piped authorization code: the first non-blank line.
async fn read_code<R: AsyncBufRead + Unpin>(mut reader: R) -> Result<String, AuthError> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| AuthError::Prompt(e.to_string()))?;
        if read == 0 {
            return Err(AuthError::Prompt("no authorization code on stdin".to_string()));
        }
        let code = line.trim();
        if !code.is_empty() {
            return Ok(code.to_string());
        }
    }
}
