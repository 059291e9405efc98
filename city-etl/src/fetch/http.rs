//! Client HTTP avec timeout explicite et proxy optionnel

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::FetchError;

/// Client HTTP d'un pipeline
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    data_dir: PathBuf,
    timeout: Duration,
}

impl HttpFetcher {
    /// Construit le client à partir des réglages et d'un timeout propre au pipeline
    pub fn new(settings: &Settings, timeout: Duration) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("city-etl/", env!("CARGO_PKG_VERSION")));
        // proxy uniquement sur configuration explicite
        builder = match &settings.https_proxy {
            Some(proxy) => builder.proxy(reqwest::Proxy::https(proxy)?),
            None => builder.no_proxy(),
        };
        Ok(Self {
            client: builder.build()?,
            data_dir: settings.data_dir.clone(),
            timeout,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET puis décodage JSON
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        self.send_json(url, self.client.get(url)).await
    }

    /// GET avec jeton bearer puis décodage JSON
    pub async fn get_json_bearer<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
    ) -> Result<T, FetchError> {
        self.send_json(url, self.client.get(url).bearer_auth(token))
            .await
    }

    /// Envoie une requête préparée ; statut non 2xx -> `FetchError::Status`
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, FetchError> {
        let bytes = self.send(url, request).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.send(url, self.client.get(url)).await
    }

    /// Télécharge `url` dans `data_dir/file_name`
    pub async fn download_file(&self, file_name: &str, url: &str) -> Result<PathBuf, FetchError> {
        let bytes = self.get_bytes(url).await?;
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.data_dir.join(file_name);
        tokio::fs::write(&path, &bytes).await?;
        info!(url = %url, path = %path.display(), bytes = bytes.len(), "File downloaded");
        Ok(path)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Vec<u8>, FetchError> {
        debug!(url = %url, "HTTP request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::test_server::serve;

    #[test]
    fn test_new_with_settings() {
        let settings = Settings {
            data_dir: PathBuf::from("/tmp/city-etl"),
            ..Settings::default()
        };
        let fetcher = HttpFetcher::new(&settings, Duration::from_secs(5)).unwrap();
        assert_eq!(fetcher.data_dir(), Path::new("/tmp/city-etl"));
        assert_eq!(fetcher.timeout(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_download_file_writes_into_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let base = serve(vec![("/permit.xml", b"<root/>".to_vec())]).await;
        let settings = Settings {
            data_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let fetcher = HttpFetcher::new(&settings, Duration::from_secs(5)).unwrap();

        let path = fetcher
            .download_file("permit.xml", &format!("{base}/permit.xml"))
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("permit.xml"));
        assert_eq!(std::fs::read(&path).unwrap(), b"<root/>");

        let err = fetcher
            .download_file("missing.xml", &format!("{base}/missing.xml"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[test]
    fn test_status_error_names_url() {
        let err = FetchError::Status {
            url: "https://data.taipei/api".into(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("https://data.taipei/api"));
        assert!(msg.contains("503"));
    }
}
