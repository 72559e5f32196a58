use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use url::Url;

use super::{DatasetSource, LoadError};

/// Datasets served over HTTP(S) below a base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(mut base: Url) -> Self {
        // without the trailing slash `join` would replace the last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            client: Client::new(),
            base,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn resolve(&self, path: &str) -> Result<Url, LoadError> {
        self.base.join(path).map_err(|e| LoadError::Unreachable {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let unreachable = |e: reqwest::Error| LoadError::Unreachable {
            path: path.to_string(),
            reason: e.to_string(),
        };
        let url = self.resolve(path)?;
        let resp = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(unreachable)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await.map_err(unreachable)?;
        Ok(body.to_vec())
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}
