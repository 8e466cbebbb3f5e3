//! Serialization and deserialization structures for Google OAuth credential files.
//! - `credentials.json`: OAuth 2.0 client credentials from Google Cloud Console
//! - `token.json`: the access and refresh tokens we receive from Google

use crate::api::OAUTH_SCOPES;
use crate::error::Res;
use crate::utils;
use anyhow::{bail, Context};
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// One of these redirects needs to be present in the OAuth credential file, or else the loopback
/// OAuth flow will not work.
const REDIRECTS: &[&str] = &["http://localhost", "http://127.0.0.1"];

/// A token is treated as expired this long before it actually expires.
const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// Represents a file that we want to `Serialize`, `Deserialize`, and read from memory in-between
/// serializations and deserialization. Basically we are just holding the `path` and the `data`
/// here.
#[derive(Default, Debug, Clone)]
pub(super) struct File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    path: PathBuf,
    data: F,
}

impl<F> File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    /// Load data from a file and create a File instance
    pub(super) async fn load(path: impl Into<PathBuf>) -> Res<Self> {
        let path = path.into();
        let data: F = utils::deserialize(&path).await?;
        Ok(Self { path, data })
    }

    /// Create a File instance with the given path and data
    pub(super) fn new(path: impl Into<PathBuf>, data: F) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Save the current data to the file, readable only by its owner.
    pub(super) async fn save(&self) -> Res<()> {
        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize data to JSON")?;
        utils::write(&self.path, json).await?;
        utils::set_private(&self.path)
    }

    pub(super) fn data(&self) -> &F {
        &self.data
    }

    pub(super) fn data_mut(&mut self) -> &mut F {
        &mut self.data
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

/// Represents the structure of the `credentials.json` file downloaded from Google Cloud Console.
///
/// This file contains OAuth 2.0 Desktop Application credentials. The standard format from Google
/// has an "installed" wrapper around the actual credentials.
///
/// Example:
/// ```json
/// {
///   "installed": {
///     "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
///     "client_secret": "YOUR_CLIENT_SECRET",
///     "redirect_uris": ["http://localhost"],
///     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
///     "token_uri": "https://oauth2.googleapis.com/token"
///   }
/// }
/// ```
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct SecretFile {
    installed: InstalledCredentials,
}

impl SecretFile {
    /// Loads the OAuth client credentials.
    pub(crate) async fn load(path: &Path) -> Res<SecretFile> {
        utils::deserialize(path).await.with_context(|| {
            format!(
                "Unable to read the OAuth client credentials file {}. Download it from the \
                Google Cloud Console (Desktop app credentials).",
                path.display()
            )
        })
    }

    pub(super) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(super) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(super) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

/// The actual OAuth credentials nested within the `credentials.json` file.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct InstalledCredentials {
    client_id: String,

    client_secret: String,

    /// For this application, should contain "http://localhost" or "http://127.0.0.1" (without a
    /// port number).
    #[serde(deserialize_with = "deserialize_redirects")]
    redirect_uris: Vec<String>,

    /// Google's OAuth authorization endpoint
    auth_uri: String,

    /// Google's OAuth token endpoint
    token_uri: String,
}

fn deserialize_redirects<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let vec = Vec::<String>::deserialize(deserializer)?;
    if !vec.iter().any(|s| REDIRECTS.contains(&s.as_str())) {
        return Err(D::Error::custom(format!(
            "At least one of the redirects needs to be {}, but this was not found. When creating \
            the OAuth client for your Google project, you must choose the Desktop app type",
            REDIRECTS[0]
        )));
    }
    Ok(vec)
}

/// This is how we save the token information that we receive from Google OAuth.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct TokenFile {
    scopes: Vec<String>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenFile {
    /// Loads the token and checks that it was granted the scopes we need.
    pub(super) async fn load(p: impl AsRef<Path>) -> Res<File<Self>> {
        let file: File<Self> = File::load(p.as_ref())
            .await
            .context("Unable to deserialize the token JSON file")?;
        file.data().validate_scopes()?;
        Ok(file)
    }

    fn validate_scopes(&self) -> Res<()> {
        let found_scopes: HashSet<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        for &required_scope in OAUTH_SCOPES {
            if !found_scopes.contains(required_scope) {
                bail!("OAuth scope '{required_scope}' is missing.");
            }
        }
        Ok(())
    }

    pub(super) fn new(
        scopes: Vec<String>,
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scopes,
            access_token,
            refresh_token,
            expires_at,
        }
    }

    pub(super) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(super) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(super) fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is expired or will expire soon.
    pub(super) fn is_expired(&self) -> bool {
        let buffer = TimeDelta::minutes(EXPIRY_BUFFER_MINUTES);
        self.expires_at <= Utc::now() + buffer
    }

    /// Update the token with new values. Google does not always send a new refresh token, in
    /// which case the old one is kept.
    pub(super) fn update(
        &mut self,
        access_token: String,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = expires_at;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SECRET_JSON: &str = r#"
{
    "installed": {
        "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
        "client_secret": "YOUR_CLIENT_SECRET",
        "redirect_uris": ["REDIRECT", "https://example.com:4040/whatever"],
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token"
    }
}
"#;

    async fn load_secret(redirect: &str) -> Res<SecretFile> {
        let temp_dir = TempDir::new().unwrap();
        let p = temp_dir.path().join("credentials.json");
        utils::write(&p, SECRET_JSON.replace("REDIRECT", redirect))
            .await
            .unwrap();
        SecretFile::load(&p).await
    }

    #[tokio::test]
    async fn test_client_secret_good_redirect() {
        let secret_file = load_secret("http://localhost").await.unwrap();
        assert_eq!(
            secret_file.client_id(),
            "YOUR_CLIENT_ID.apps.googleusercontent.com"
        );
        assert_eq!(secret_file.token_uri(), "https://oauth2.googleapis.com/token");
        assert!(load_secret("http://127.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_client_secret_bad_redirect() {
        let parse_error = load_secret("http://localhost:9900").await.unwrap_err();
        let parse_error_message = format!("{parse_error:?}");
        assert!(
            parse_error_message.contains("At least one of the redirects needs to be"),
            "{parse_error_message}"
        );
    }

    #[tokio::test]
    async fn test_client_secret_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = SecretFile::load(&temp_dir.path().join("credentials.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Google Cloud Console"));
    }

    #[tokio::test]
    async fn test_validate_token_file_bad() {
        let json = r##"
        {
            "scopes": ["https://www.googleapis.com/auth/spreadsheets"],
            "access_token":"abc12",
            "refresh_token":"xyz89",
            "expires_at":"2025-01-01T00:00:00Z"
        }
        "##;
        let tmp = TempDir::new().unwrap();
        let json_path = tmp.path().join("token.json");
        utils::write(&json_path, json).await.unwrap();

        let error_message = TokenFile::load(&json_path).await.unwrap_err().to_string();
        assert!(error_message.contains("https://www.googleapis.com/auth/drive"));
    }

    #[tokio::test]
    async fn test_token_file_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let json_path = tmp.path().join("token.json");
        let expires_at = Utc::now() + TimeDelta::hours(1);
        let token = TokenFile::new(
            OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
            "abc12".to_string(),
            "xyz89".to_string(),
            expires_at,
        );
        File::new(&json_path, token).save().await.unwrap();

        let loaded = TokenFile::load(&json_path).await.unwrap();
        assert_eq!(loaded.data().access_token(), "abc12");
        assert_eq!(loaded.data().refresh_token(), "xyz89");
        assert!(!loaded.data().is_expired());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&json_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_token_expiry_and_update() {
        let mut token = TokenFile::new(
            vec![],
            "old".to_string(),
            "refresh".to_string(),
            Utc::now() + TimeDelta::minutes(2),
        );
        // Inside the buffer counts as expired.
        assert!(token.is_expired());

        token.update("new".to_string(), Utc::now() + TimeDelta::hours(1), None);
        assert!(!token.is_expired());
        assert_eq!(token.access_token(), "new");
        assert_eq!(token.refresh_token(), "refresh");

        token.update(
            "newer".to_string(),
            Utc::now() + TimeDelta::hours(1),
            Some("rotated".to_string()),
        );
        assert_eq!(token.refresh_token(), "rotated");
    }
}
