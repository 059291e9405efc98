//! Authentification OAuth2 (client credentials) auprès de TDX

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use super::cache::{Token, TokenCache};
use crate::error::FetchError;
use crate::fetch::HttpFetcher;

const TOKEN_URL: &str =
    "https://tdx.transportdata.tw/auth/realms/TDXConnect/protocol/openid-connect/token";

/// Marge de renouvellement par défaut
const DEFAULT_REFRESH_MARGIN_SECS: i64 = 600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Fournisseur de jetons TDX
pub struct TdxAuth<'a, C: TokenCache> {
    http: &'a HttpFetcher,
    cache: C,
    client_id: String,
    client_secret: String,
    token_url: String,
    refresh_margin: chrono::Duration,
}

impl<'a, C: TokenCache> TdxAuth<'a, C> {
    pub fn new(http: &'a HttpFetcher, cache: C, client_id: &str, client_secret: &str) -> Self {
        Self {
            http,
            cache,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_url: TOKEN_URL.to_string(),
            refresh_margin: chrono::Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
        }
    }

    pub fn with_refresh_margin(mut self, margin: chrono::Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub fn with_token_url(mut self, url: &str) -> Self {
        self.token_url = url.to_string();
        self
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Jeton valide, depuis le cache ou renouvelé
    pub async fn get_token(&mut self) -> Result<String, FetchError> {
        if let Some(token) = self.cache.get(&self.client_id) {
            if token.is_fresh(Utc::now(), self.refresh_margin) {
                debug!("Using cached TDX token");
                return Ok(token.access_token);
            }
        }

        let token = self.request_token().await?;
        self.cache.put(&self.client_id, &token)?;
        info!(expires_at = %token.expires_at, "TDX token refreshed");
        Ok(token.access_token)
    }

    async fn request_token(&self) -> Result<Token, FetchError> {
        let request = self
            .http
            .client()
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ]);
        let response: TokenResponse = self
            .http
            .send_json(&self.token_url, request)
            .await
            .map_err(|e| match e {
                FetchError::Status { status, .. } => {
                    FetchError::Auth(format!("token endpoint returned {status}"))
                }
                other => other,
            })?;

        if response.access_token.is_empty() {
            return Err(FetchError::Auth("empty access_token".into()));
        }
        Ok(Token {
            access_token: response.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(response.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenCache;
    use crate::config::Settings;

    #[tokio::test]
    async fn test_cached_token_skips_request() {
        let http = HttpFetcher::new(&Settings::default(), std::time::Duration::from_secs(1)).unwrap();
        let mut cache = MemoryTokenCache::new();
        cache
            .put(
                "client",
                &Token {
                    access_token: "cached".into(),
                    expires_at: Utc::now() + chrono::Duration::hours(2),
                },
            )
            .unwrap();
        // URL injoignable : seule la lecture du cache peut réussir
        let mut auth = TdxAuth::new(&http, cache, "client", "secret")
            .with_token_url("http://127.0.0.1:9/token");
        assert_eq!(auth.get_token().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let http = HttpFetcher::new(&Settings::default(), std::time::Duration::from_secs(1)).unwrap();
        let mut cache = MemoryTokenCache::new();
        cache
            .put(
                "client",
                &Token {
                    access_token: "old".into(),
                    expires_at: Utc::now() + chrono::Duration::seconds(60),
                },
            )
            .unwrap();
        let mut auth = TdxAuth::new(&http, cache, "client", "secret")
            .with_token_url("http://127.0.0.1:9/token");
        // le renouvellement est tenté et échoue faute de serveur
        assert!(auth.get_token().await.is_err());
    }
}
