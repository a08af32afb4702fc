//! services/content_sync/src/adapters/consent.rs
//!
//! A consent flow for terminal use: prints the authorization URL and waits for the
//! callback URL (or bare token) to be pasted back. An empty line cancels.

use async_trait::async_trait;
use party_content_core::ports::{AuthError, AuthResult, ConsentCallback, ConsentFlow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConsentFlow;

impl TerminalConsentFlow {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn parse_callback(line: &str) -> Option<ConsentCallback> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let token = match line.split_once('?') {
        Some((_, query)) => query
            .split('&')
            .find_map(|pair| pair.strip_prefix("token="))?
            .to_string(),
        None => line.to_string(),
    };
    if token.is_empty() {
        return None;
    }
    Some(ConsentCallback {
        callback_url: line.to_string(),
        token,
    })
}

#[async_trait]
impl ConsentFlow for TerminalConsentFlow {
    async fn run(&self, authorization_url: &str) -> AuthResult<ConsentCallback> {
        info!("Waiting for sign-in consent");
        println!("Open this address to sign in:\n  {authorization_url}");
        println!("Paste the callback URL (empty line to cancel):");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| AuthError::NetworkUnavailable(format!("failed to read callback: {e}")))?;

        parse_callback(&line).ok_or(AuthError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_taken_from_the_callback_query() {
        let callback = parse_callback("partygames://auth-callback?state=x&token=abc123\n").expect("callback");
        assert_eq!(callback.token, "abc123");
        assert_eq!(callback.callback_url, "partygames://auth-callback?state=x&token=abc123");
    }

    #[test]
    fn bare_token_is_accepted() {
        assert_eq!(parse_callback("abc123").map(|c| c.token), Some("abc123".to_string()));
    }

    #[test]
    fn empty_or_tokenless_input_cancels() {
        assert_eq!(parse_callback("   \n"), None);
        assert_eq!(parse_callback("partygames://auth-callback?error=denied"), None);
    }
}
