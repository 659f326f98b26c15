//! HTTP client for the polled queries.

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::ClientResult;
use crate::reconcile::QueryKey;

/// Fetches [`QueryKey`]s from the REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

impl ApiClient {
    /// `base` is the server root, e.g. `http://127.0.0.1:5000`.
    pub fn new(base: &str) -> ClientResult<Self> {
        Ok(Self {
            base: Url::parse(base)?,
            http: reqwest::Client::new(),
        })
    }

    pub fn url_for(&self, key: &QueryKey) -> ClientResult<Url> {
        Ok(self.base.join(&key.path())?)
    }

    /// GET the query's path and return its JSON body.
    pub async fn fetch(&self, key: &QueryKey) -> ClientResult<Value> {
        let url = self.url_for(key)?;
        debug!(%url, "Fetching query");
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_query() {
        let api = ApiClient::new("http://127.0.0.1:5000").unwrap();
        assert_eq!(
            api.url_for(&QueryKey::EventStats(1)).unwrap().as_str(),
            "http://127.0.0.1:5000/api/events/1/stats"
        );
    }

    #[test]
    fn test_rejects_bad_base() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
