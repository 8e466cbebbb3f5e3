//! OAuth 2.0 authentication flow implementation for the Google Drive API.
//!
//! This module handles the complete OAuth workflow including:
//! - Loading OAuth credentials from credentials.json
//! - Managing access and refresh tokens in token.json
//! - Running the OAuth consent flow with a local callback server
//! - Automatic token refresh when expired

use crate::api::files::{File, SecretFile, TokenFile};
use crate::api::OAUTH_SCOPES;
use crate::error::Res;
use anyhow::{bail, Context};
use chrono::{DateTime, TimeDelta, Utc};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long to wait for the user to finish the consent screen.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Used when Google does not tell us how long the access token lives.
const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;

/// An OAuth client with the authorization and token endpoints configured.
type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Holds the client credentials and the cached token, and keeps the access token fresh.
#[derive(Debug)]
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
    http: reqwest::Client,
}

impl TokenProvider {
    /// Runs the interactive consent flow and saves the resulting token to `token_path`.
    ///
    /// This is the only path that asks the user to visit a browser.
    pub(crate) async fn initialize(
        secret_path: impl AsRef<Path>,
        token_path: impl Into<PathBuf>,
    ) -> Res<Self> {
        let secret = SecretFile::load(secret_path.as_ref()).await?;
        let http = http_client()?;
        let token = run_consent_flow(&secret, &http).await?;
        let token = File::new(token_path, token);
        token.save().await?;
        info!("Tokens saved to {}", token.path().display());
        Ok(Self {
            secret,
            token,
            http,
        })
    }

    /// Loads existing credentials and tokens. Never opens a browser.
    pub(crate) async fn load(
        secret_path: impl AsRef<Path>,
        token_path: impl AsRef<Path>,
    ) -> Res<Self> {
        let secret = SecretFile::load(secret_path.as_ref()).await?;
        let token = TokenFile::load(token_path.as_ref()).await?;
        Ok(Self {
            secret,
            token,
            http: http_client()?,
        })
    }

    /// Establishes a session for a run.
    ///
    /// A cached token is used if there is one, refreshed if it has expired. When there is no
    /// usable cached token, the interactive consent flow runs and its token is cached.
    pub(crate) async fn authenticate(
        secret_path: impl AsRef<Path>,
        token_path: impl AsRef<Path>,
    ) -> Res<Self> {
        let secret_path = secret_path.as_ref();
        let token_path = token_path.as_ref();
        if token_path.is_file() {
            match Self::load(secret_path, token_path).await {
                Ok(mut provider) => {
                    provider.refresh_if_needed().await?;
                    return Ok(provider);
                }
                Err(e) => warn!("Unable to use the cached token, re-authorizing: {e:#}"),
            }
        } else {
            info!("No cached token at {}, authorizing", token_path.display());
        }
        Self::initialize(secret_path, token_path.to_path_buf()).await
    }

    /// Exchanges the refresh token for a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Res<()> {
        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        if refresh_token.secret().is_empty() {
            bail!("The cached token has no refresh token, run the authorization again");
        }
        let client = oauth_client(&self.secret, None)?;
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
            .context("Failed to refresh the OAuth token")?;

        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            expires_at(&response),
            response.refresh_token().map(|rt| rt.secret().to_string()),
        );
        self.token.save().await?;
        debug!("Token refreshed, valid until {}", self.token.data().expires_at());
        Ok(())
    }

    async fn refresh_if_needed(&mut self) -> Res<()> {
        if self.token.data().is_expired() {
            debug!("Token expired at {}, refreshing", self.token.data().expires_at());
            self.refresh().await?;
        }
        Ok(())
    }

    /// Returns a valid access token, refreshing it first if it is about to expire.
    pub(crate) async fn token_with_refresh(&mut self) -> Res<&str> {
        self.refresh_if_needed().await?;
        Ok(self.token.data().access_token())
    }
}

fn http_client() -> Res<reqwest::Client> {
    // The token endpoint must not be followed through redirects.
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to create the HTTP client")
}

fn oauth_client(secret: &SecretFile, redirect: Option<String>) -> Res<GoogleClient> {
    let client = BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?)
        .set_token_uri(
            TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?,
        );
    Ok(match redirect {
        Some(redirect) => {
            client.set_redirect_uri(RedirectUrl::new(redirect).context("Invalid redirect URI")?)
        }
        None => client,
    })
}

fn expires_at(response: &BasicTokenResponse) -> DateTime<Utc> {
    let lifetime = response
        .expires_in()
        .and_then(|d| TimeDelta::from_std(d).ok())
        .unwrap_or_else(|| TimeDelta::seconds(DEFAULT_TOKEN_LIFETIME_SECONDS));
    Utc::now() + lifetime
}

/// The parameters Google sends back to the loopback redirect.
#[derive(Debug)]
enum Callback {
    Code { code: String, state: String },
    Denied(String),
}

/// Runs the installed-app flow:
/// 1. Starts a local HTTP server on a free loopback port
/// 2. Prints the Google consent URL for the user to open
/// 3. Waits for the OAuth callback with the authorization code
/// 4. Exchanges the code for access and refresh tokens
async fn run_consent_flow(secret: &SecretFile, http: &reqwest::Client) -> Res<TokenFile> {
    info!("Starting OAuth consent flow");
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .context("Unable to start the local OAuth callback server")?;
    let port = listener
        .local_addr()
        .context("Unable to read the callback server address")?
        .port();
    let redirect = format!("http://127.0.0.1:{port}");
    let client = oauth_client(secret, Some(redirect.clone()))?;

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf_token) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent")
        .set_pkce_challenge(pkce_challenge)
        .url();

    info!("Open this URL in your browser to authorize access to Google Drive:\n\n{auth_url}\n");
    info!("Waiting for the authorization callback on {redirect}");

    let callback = tokio::time::timeout(CONSENT_TIMEOUT, wait_for_callback(listener))
        .await
        .context("Timed out waiting for the OAuth authorization")??;

    let code = match callback {
        Callback::Code { code, state } => {
            if state != *csrf_token.secret() {
                bail!("The OAuth state parameter did not match, the authorization was rejected");
            }
            code
        }
        Callback::Denied(reason) => bail!("Authorization was denied: {reason}"),
    };

    let response = client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request_async(http)
        .await
        .context("Failed to exchange the authorization code for a token")?;

    let refresh_token = response
        .refresh_token()
        .map(|rt| rt.secret().to_string())
        .context("Google did not return a refresh token")?;
    let scopes = match response.scopes() {
        Some(scopes) => scopes.iter().map(|s| s.as_str().to_string()).collect(),
        None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
    };

    info!("Authorization successful!");
    Ok(TokenFile::new(
        scopes,
        response.access_token().secret().to_string(),
        refresh_token,
        expires_at(&response),
    ))
}

/// Serves connections until one of them carries the OAuth callback parameters.
async fn wait_for_callback(listener: TcpListener) -> Res<Callback> {
    let (tx, mut rx) = mpsc::channel::<Callback>(1);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = accepted.context("Failed to accept a callback connection")?;
                let tx = tx.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| handle_callback(req, tx.clone()));
                    if let Err(e) = http1::Builder::new()
                        .keep_alive(false)
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!("Callback connection error: {e}");
                    }
                });
            }
            Some(callback) = rx.recv() => return Ok(callback),
        }
    }
}

async fn handle_callback(
    req: Request<Incoming>,
    tx: mpsc::Sender<Callback>,
) -> std::result::Result<Response<String>, Infallible> {
    let params: HashMap<String, String> =
        url::form_urlencoded::parse(req.uri().query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect();

    let callback = match (params.get("code"), params.get("error")) {
        (Some(code), _) => Callback::Code {
            code: code.clone(),
            state: params.get("state").cloned().unwrap_or_default(),
        },
        (None, Some(error)) => Callback::Denied(error.clone()),
        (None, None) => {
            let mut response = Response::new(String::from("Not found"));
            *response.status_mut() = StatusCode::NOT_FOUND;
            return Ok(response);
        }
    };

    let message = match &callback {
        Callback::Code { .. } => "Authorization received. You may close this window.",
        Callback::Denied(_) => "Authorization was denied. You may close this window.",
    };
    let _ = tx.send(callback).await;
    Ok(Response::new(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils;
    use tempfile::TempDir;

    const SECRET_JSON: &str = r#"{
        "installed": {
            "client_id": "test-client-id",
            "client_secret": "test-secret",
            "redirect_uris": ["http://localhost"],
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token"
        }
    }"#;

    async fn write_token(path: &Path, expires_at: DateTime<Utc>) {
        let token = TokenFile::new(
            OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
            "cached-access".to_string(),
            "cached-refresh".to_string(),
            expires_at,
        );
        File::new(path, token).save().await.unwrap();
    }

    #[tokio::test]
    async fn test_authenticate_uses_cached_token() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("credentials.json");
        let token = dir.path().join("token.json");
        utils::write(&secret, SECRET_JSON).await.unwrap();
        write_token(&token, Utc::now() + TimeDelta::hours(1)).await;

        let mut provider = TokenProvider::authenticate(&secret, &token).await.unwrap();
        assert_eq!(provider.token_with_refresh().await.unwrap(), "cached-access");
    }

    #[tokio::test]
    async fn test_load_requires_token() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("credentials.json");
        utils::write(&secret, SECRET_JSON).await.unwrap();
        let result = TokenProvider::load(&secret, dir.path().join("token.json")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_authenticate_requires_secret_file() {
        let dir = TempDir::new().unwrap();
        let token = dir.path().join("token.json");
        write_token(&token, Utc::now() + TimeDelta::hours(1)).await;
        // The cached token is unusable without its client credentials, and the consent flow
        // cannot start either.
        let result =
            TokenProvider::authenticate(dir.path().join("credentials.json"), &token).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_callback_server_receives_code() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let waiter = tokio::spawn(wait_for_callback(listener));

        let body = reqwest::get(format!(
            "http://127.0.0.1:{port}/?state=abc&code=4%2F0Ab&scope=drive"
        ))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
        assert!(body.contains("Authorization received"));

        match waiter.await.unwrap().unwrap() {
            Callback::Code { code, state } => {
                assert_eq!(code, "4/0Ab");
                assert_eq!(state, "abc");
            }
            other => panic!("unexpected callback {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_callback_server_ignores_other_requests() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let waiter = tokio::spawn(wait_for_callback(listener));

        let status = reqwest::get(format!("http://127.0.0.1:{port}/favicon.ico"))
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::NOT_FOUND);

        reqwest::get(format!("http://127.0.0.1:{port}/?error=access_denied"))
            .await
            .unwrap();
        match waiter.await.unwrap().unwrap() {
            Callback::Denied(reason) => assert_eq!(reason, "access_denied"),
            other => panic!("unexpected callback {other:?}"),
        }
    }
}
