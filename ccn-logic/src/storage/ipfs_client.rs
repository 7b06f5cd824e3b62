use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

use super::settings::IpfsSettings;

/// HTTP client for a local IPFS daemon/gateway. Only the HTTP API surface is
/// spoken here; peer discovery/DHT internals are out of scope (spec §4.1
/// non-goal), grounded on `eigenda_proxy_client.rs`'s retry/timeout wrapping.
#[derive(Clone)]
pub struct IpfsClient {
    inner: ClientWithMiddleware,
    gateway_url: String,
}

impl IpfsClient {
    pub fn new(settings: &IpfsSettings) -> Self {
        let retry_policy = ExponentialBackoff::builder()
            .build_with_max_retries(settings.request_retries);
        let inner = ClientBuilder::new(
            reqwest::Client::builder()
                .timeout(settings.fetch_timeout)
                .build()
                .expect("failed to build ipfs http client"),
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        Self {
            inner,
            gateway_url: settings.gateway_url.clone(),
        }
    }

    pub async fn cat(&self, hash: &str) -> Result<Option<Vec<u8>>, reqwest_middleware::Error> {
        let url = format!("{}/api/v0/cat?arg={hash}", self.gateway_url);
        let response = self.inner.post(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    pub async fn add(&self, bytes: Vec<u8>) -> Result<String, reqwest_middleware::Error> {
        let url = format!("{}/api/v0/add", self.gateway_url);
        let part = reqwest::multipart::Part::bytes(bytes);
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .inner
            .post(url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        let body: AddResponse = response.json().await?;
        Ok(body.hash)
    }

    pub async fn pin(&self, hash: &str) -> Result<(), reqwest_middleware::Error> {
        let url = format!("{}/api/v0/pin/add?arg={hash}", self.gateway_url);
        self.inner.post(url).send().await?.error_for_status()?;
        Ok(())
    }
}

#[derive(serde::Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn settings_for(gateway_url: String) -> IpfsSettings {
        IpfsSettings {
            enabled: true,
            gateway_url,
            request_retries: 0,
            fetch_timeout: std::time::Duration::from_secs(5),
            pin_timeout: std::time::Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn cat_returns_the_gateway_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/cat"))
            .and(query_param("arg", "QmHash"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;

        let client = IpfsClient::new(&settings_for(server.uri()));
        let body = client.cat("QmHash").await.unwrap();
        assert_eq!(body, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn cat_returns_none_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/cat"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = IpfsClient::new(&settings_for(server.uri()));
        let body = client.cat("missing").await.unwrap();
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn pin_succeeds_against_a_200_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/pin/add"))
            .and(query_param("arg", "QmHash"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = IpfsClient::new(&settings_for(server.uri()));
        client.pin("QmHash").await.unwrap();
    }
}
