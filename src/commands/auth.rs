//! Authentication command handlers for OAuth flow.
//!
//! This module implements the CLI commands for:
//! - `photo-report auth` - Initial OAuth consent flow
//! - `photo-report auth --verify` - Verify and refresh authentication

use crate::api::TokenProvider;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;

/// Handles the `photo-report auth` command - runs the OAuth consent flow
///
/// This guides the user through setting up Google Drive authentication:
/// 1. Checks for the client credentials file (provides instructions if missing)
/// 2. Opens browser for OAuth consent
/// 3. Saves tokens to the token file with the required scopes
///
/// `run` will also start this flow when there is no usable token, but doing it up front means a
/// scheduled run never waits on a browser.
///
/// # Errors
/// Returns an `ErrorType::Auth` error if the OAuth flow fails or if the credentials are missing
pub async fn auth(config: &Config) -> Result<Out<()>> {
    let _ = TokenProvider::initialize(config.client_secret_path(), config.token_path())
        .await
        .pub_result(ErrorType::Auth)?;
    Ok(format!(
        "Authorization complete, the token was saved to {}",
        config.token_path().display()
    )
    .into())
}

/// Handles the `photo-report auth --verify` command - verifies authentication
///
/// This command NEVER opens a browser or triggers an interactive OAuth flow.
/// It only verifies that existing cached tokens are valid by refreshing them.
///
/// If the token is missing, invalid, or has the wrong scopes, this command will
/// fail with an error message telling the user to run `photo-report auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<()>> {
    let mut token_provider = TokenProvider::load(config.client_secret_path(), config.token_path())
        .await
        .context(
            "Unable to use the existing tokens found in the token JSON file. \n\n\
            You should run 'photo-report auth' (without the --verify flag).",
        )
        .pub_result(ErrorType::Auth)?;
    token_provider
        .refresh()
        .await
        .context("Unable to refresh the token")
        .pub_result(ErrorType::Auth)?;
    Ok("Your OAuth token is valid!".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_auth_verify_without_token() {
        let env = TestEnv::new().await;
        let err = auth_verify(&env.config()).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Auth);
        assert!(err.to_string().contains("photo-report auth"));
    }

    #[tokio::test]
    async fn test_auth_without_credentials() {
        let env = TestEnv::new().await;
        let err = auth(&env.config()).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Auth);
    }
}
