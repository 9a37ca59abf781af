//! HTTP client wrapper with JWT signing and fixed-schedule retry.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::config::CoinbaseConfig;
use super::error::CoinbaseError;
use super::jwt::build_jwt;

/// HTTP client for the Coinbase Advanced Trade REST API.
#[derive(Debug, Clone)]
pub struct CoinbaseHttpClient {
    client: Client,
    api_key_name: String,
    private_key_pem: String,
    base_url: String,
    host: String,
    retry: super::config::RetryConfig,
}

impl CoinbaseHttpClient {
    /// Build a client from adapter configuration.
    pub fn new(config: &CoinbaseConfig) -> Result<Self, CoinbaseError> {
        if config.api_key_name.is_empty() || config.private_key_pem.is_empty() {
            return Err(CoinbaseError::InvalidCredentials(
                "api key name and private key must both be set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CoinbaseError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key_name: config.api_key_name.clone(),
            private_key_pem: config.private_key_pem.clone(),
            base_url: config.base_url(),
            host: config.host.clone(),
            retry: config.retry.clone(),
        })
    }

    /// `GET` against the REST API.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CoinbaseError> {
        self.request("GET", path, None::<&()>).await
    }

    /// `POST` against the REST API.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CoinbaseError> {
        self.request("POST", path, Some(body)).await
    }

    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, CoinbaseError> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0u32;

        loop {
            let jwt = build_jwt(&self.api_key_name, &self.private_key_pem, method, &self.host, path)?;

            let request = match method {
                "GET" => self.client.get(&url).bearer_auth(&jwt),
                "POST" => {
                    let mut req = self.client.post(&url).bearer_auth(&jwt);
                    if let Some(b) = body {
                        req = req.json(b);
                    }
                    req
                }
                other => return Err(CoinbaseError::Network(format!("unsupported method: {other}"))),
            };

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    attempt += 1;
                    if let Some(delay) = self.retry.backoff_schedule.get((attempt - 1) as usize) {
                        tracing::warn!(error = %e, attempt, "Coinbase request failed, retrying");
                        tokio::time::sleep(*delay).await;
                        continue;
                    }
                    return Err(CoinbaseError::MaxRetriesExceeded { attempts: attempt });
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(|e| CoinbaseError::Network(e.to_string()))?;
                return serde_json::from_str(&text).map_err(|e| CoinbaseError::JsonParse(e.to_string()));
            }

            let body_text = response.text().await.unwrap_or_default();

            if matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ) {
                attempt += 1;
                if let Some(delay) = self.retry.backoff_schedule.get((attempt - 1) as usize) {
                    tracing::warn!(
                        status = status.as_u16(),
                        attempt,
                        "Coinbase rejected the request transiently, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                    continue;
                }
                return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                    CoinbaseError::RateLimited
                } else {
                    CoinbaseError::MaxRetriesExceeded { attempts: attempt }
                });
            }

            return match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Err(CoinbaseError::AuthenticationFailed)
                }
                _ => Err(CoinbaseError::Api {
                    code: status.as_u16(),
                    message: body_text,
                }),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_construction_without_credentials() {
        let config = CoinbaseConfig::new(String::new(), String::new());
        let result = CoinbaseHttpClient::new(&config);
        assert!(matches!(result, Err(CoinbaseError::InvalidCredentials(_))));
    }
}
