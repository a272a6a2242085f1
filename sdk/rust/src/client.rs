use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const TOKEN_HEADER: &str = "X-Grab-Token";

/// Body of `/api/v1/probe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// `-1` when the source did not declare a length.
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl Probe {
    pub fn declared_size(&self) -> Option<u64> {
        u64::try_from(self.size).ok()
    }
}

/// Body of `/api/v1/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub max_size_limit: String,
    pub max_concurrent: usize,
}

pub struct GrabClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GrabClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Use a preconfigured `reqwest::Client` (proxy settings, timeouts).
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `X-Grab-Token` with every request.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Fetch the server's configured limits.
    pub async fn info(&self) -> Result<Info, Box<dyn std::error::Error>> {
        let resp = self.get("/api/v1/info").send().await?;
        Self::json(resp).await
    }

    /// Ask the server for the declared size and type of `target`.
    pub async fn probe(&self, target: &str) -> Result<Probe, Box<dyn std::error::Error>> {
        let resp = self
            .get("/api/v1/probe")
            .query(&[("url", target)])
            .send()
            .await?;
        Self::json(resp).await
    }

    /// Start a relay of `target`. The response is returned as-is so the caller
    /// can inspect the status and consume the body as a stream.
    pub async fn stream(&self, target: &str) -> Result<Response, reqwest::Error> {
        self.get("/api/v1/stream")
            .query(&[("url", target)])
            .send()
            .await
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, Box<dyn std::error::Error>> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("Server returned error status {}: {}", status, text.trim()).into());
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_and_token() {
        let grab = GrabClient::new("http://localhost:8080/").with_token("s3cret");
        assert_eq!(grab.base_url, "http://localhost:8080");
        assert_eq!(grab.token.as_deref(), Some("s3cret"));

        let anonymous = GrabClient::new("http://localhost:8080");
        assert_eq!(anonymous.base_url, "http://localhost:8080");
        assert!(anonymous.token.is_none());
    }

    #[test]
    fn test_declared_size() {
        let known = Probe { size: 500, content_type: String::new() };
        assert_eq!(known.declared_size(), Some(500));

        let unknown = Probe { size: -1, content_type: String::new() };
        assert_eq!(unknown.declared_size(), None);
    }
}
