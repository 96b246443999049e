//! Fetched page responses and the reqwest-backed dispatcher.
//!
//! Not a browser, just HTTP requests. Redirects, timeouts, retry on 5xx and
//! backoff on 429 live here, in the dispatching infrastructure; the
//! detection and extraction protocols only ever see successful responses.

use crate::carrier::{HttpMethod, OutboundRequest, RequestBody};
use crate::chain::Dispatcher;
use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, GeneratorResult};
use async_trait::async_trait;
use scraper::Html;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

/// A fetched page or API response.
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
}

impl PageResponse {
    /// A 200 response whose final URL equals the requested one.
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// URL that relative links in the body resolve against.
    pub fn base_url(&self) -> &str {
        &self.final_url
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> GeneratorResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Parse the body as an HTML document.
    ///
    /// `Html` is `!Send`; keep it inside synchronous code.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// HTTP client performing outbound requests on behalf of request chains.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &GeneratorConfig) -> GeneratorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    /// Perform a request with retry on 5xx and backoff on 429.
    pub async fn execute(&self, request: &OutboundRequest) -> GeneratorResult<PageResponse> {
        let mut retries = 0u32;
        let max_retries = 2;

        loop {
            let result = self.build(request).send().await;

            match result {
                Ok(r) => {
                    let status = r.status().as_u16();

                    if status >= 500 && retries < max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        debug!("{} returned {status}, retrying in {delay:?}", request.url);
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if status == 429 && retries < max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        let delay = Duration::from_secs(retry_after.min(10));
                        debug!("{} rate limited, backing off {delay:?}", request.url);
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let final_url = r.url().to_string();
                    let headers: Vec<(String, String)> = r
                        .headers()
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                        .collect();
                    let body = r.text().await?;

                    trace!("{} {} -> {status} ({} bytes)", request.method, request.url, body.len());
                    return Ok(PageResponse {
                        url: request.url.clone(),
                        final_url,
                        status,
                        headers,
                        body,
                    });
                }
                Err(e) => {
                    if retries < max_retries && (e.is_timeout() || e.is_connect()) {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Fetch a page with a plain GET.
    pub async fn get(&self, url: &str) -> GeneratorResult<PageResponse> {
        self.execute(&OutboundRequest::get(url)).await
    }

    fn build(&self, request: &OutboundRequest) -> reqwest::RequestBuilder {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        }
        .timeout(self.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Json(value) => builder.json(value),
        }
    }
}

#[async_trait]
impl Dispatcher for HttpClient {
    async fn dispatch(&self, request: &OutboundRequest) -> GeneratorResult<PageResponse> {
        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(GeneratorError::Status {
                url: response.url,
                status: response.status,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new(&GeneratorConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_redirect_limit_from_config() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        for hop in 0..3 {
            Mock::given(method("GET"))
                .and(path(format!("/hop{hop}")))
                .respond_with(
                    ResponseTemplate::new(302)
                        .insert_header("location", format!("/hop{}", hop + 1).as_str()),
                )
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/hop3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("arrived"))
            .mount(&server)
            .await;
        let url = format!("{}/hop0", server.uri());

        let relaxed = HttpClient::new(&GeneratorConfig::default()).unwrap();
        let page = relaxed.get(&url).await.unwrap();
        assert_eq!(page.body, "arrived");
        assert!(page.final_url.ends_with("/hop3"));

        let strict = HttpClient::new(&GeneratorConfig {
            max_redirects: 1,
            ..GeneratorConfig::default()
        })
        .unwrap();
        assert!(matches!(strict.get(&url).await, Err(GeneratorError::Http(_))));
    }

    #[test]
    fn test_page_response_helpers() {
        let page = PageResponse::new("https://acme.example/api", r#"{"success": true}"#)
            .with_header("Content-Type", "application/json");

        assert!(page.is_success());
        assert_eq!(page.header("content-type"), Some("application/json"));
        let body: Value = page.json().unwrap();
        assert_eq!(body["success"], true);
        assert!(!page.clone().with_status(404).is_success());
    }

    #[test]
    fn test_page_response_json_error() {
        let page = PageResponse::new("https://acme.example/api", "<html></html>");
        assert!(matches!(
            page.json::<Value>(),
            Err(GeneratorError::Json(_))
        ));
    }
}
