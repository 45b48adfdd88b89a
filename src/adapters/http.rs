use crate::utils::error::{ImportError, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// reqwest transport shared by the search, detail and upload calls.
/// Cloning is cheap; the connection pool is shared between clones.
#[derive(Debug, Clone)]
pub struct WorkflowClient {
    client: Client,
    authorization: Option<String>,
    request_timeout: Duration,
}

impl WorkflowClient {
    pub fn new(authorization: Option<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ImportError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            authorization,
            request_timeout,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.authorization {
            Some(value) => request.header(AUTHORIZATION, value.as_str()),
            None => request,
        }
    }

    /// GET `url` and decode the JSON body. Any non-2xx status is an error.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        tracing::debug!("📡 GET {} {:?}", url, query);

        let mut request = self.authorize(self.client.get(url)).timeout(self.request_timeout);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("📡 Response status: {}", status);

        if !status.is_success() {
            return Err(ImportError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST a multipart form; the caller decides what the status means.
    pub async fn post_multipart(
        &self,
        url: &str,
        form: Form,
        timeout: Duration,
    ) -> Result<StatusCode> {
        tracing::debug!("📡 POST multipart {}", url);

        let response = self
            .authorize(self.client.post(url))
            .timeout(timeout)
            .multipart(form)
            .send()
            .await?;

        Ok(response.status())
    }
}
