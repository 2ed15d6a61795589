use anyhow::Result;

/// Client for the hosted chat assistant. The reply body is shown as plain text.
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: &str) -> Self {
        ChatClient {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub async fn ask(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query)])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}
