//! End-to-end pipeline: fetch a site, find its store finder, extract the
//! spider attributes and render a ready-to-run spider.

use crate::carrier::{OutboundRequest, Platform};
use crate::chain::{ChainRunner, Dispatcher};
use crate::config::GeneratorConfig;
use crate::definition::{DefinitionMetadata, SpiderDefinition};
use crate::error::{GeneratorError, GeneratorResult};
use crate::http::{HttpClient, PageResponse};
use crate::record::{ALLOWED_DOMAINS, NAME, START_URLS};
use crate::registry::Registry;
use crate::synthesizer::{self, identifier};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

/// A rendered spider and what it was built from.
#[derive(Debug, Clone)]
pub struct GeneratedSpider {
    pub platform: Platform,
    pub definition: SpiderDefinition,
    pub source: String,
}

/// Outcome of probing one site in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
    pub url: String,
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct SpiderGenerator<D: Dispatcher> {
    registry: Registry,
    dispatcher: D,
    config: GeneratorConfig,
}

impl SpiderGenerator<HttpClient> {
    /// Generator over HTTP with every built-in platform registered.
    pub fn from_config(config: GeneratorConfig) -> GeneratorResult<Self> {
        let client = HttpClient::new(&config)?;
        Ok(Self::new(Registry::default(), client, config))
    }
}

impl<D: Dispatcher> SpiderGenerator<D> {
    pub fn new(registry: Registry, dispatcher: D, config: GeneratorConfig) -> Self {
        Self {
            registry,
            dispatcher,
            config,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn runner(&self) -> ChainRunner<'_> {
        ChainRunner::new(&self.registry, &self.dispatcher, self.config.max_chain_steps)
    }

    async fn fetch(&self, url: &str) -> GeneratorResult<PageResponse> {
        Url::parse(url)?;
        let response = self.dispatcher.dispatch(&OutboundRequest::get(url)).await?;
        if !response.is_success() {
            return Err(GeneratorError::Status {
                url: response.url,
                status: response.status,
            });
        }
        Ok(response)
    }

    /// Which registered store finder, if any, the site at `url` embeds.
    pub async fn detect(&self, url: &str) -> GeneratorResult<Option<Platform>> {
        let page = self.fetch(url).await?;
        Ok(self.runner().detect_platform(&page).await)
    }

    /// Probe many sites, at most `config.concurrency` at once. Reports come
    /// back in input order.
    pub async fn detect_many(&self, urls: &[String]) -> Vec<DetectionReport> {
        let mut reports: Vec<(usize, DetectionReport)> = stream::iter(urls.iter().enumerate())
            .map(|(index, url)| async move {
                let report = match self.detect(url).await {
                    Ok(platform) => DetectionReport {
                        url: url.clone(),
                        platform,
                        error: None,
                    },
                    Err(e) => {
                        warn!("detection failed for {url}: {e}");
                        DetectionReport {
                            url: url.clone(),
                            platform: None,
                            error: Some(e.to_string()),
                        }
                    }
                };
                (index, report)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }

    /// Detect the site's store finder and generate its spider. `Ok(None)`
    /// means no registered platform was found.
    pub async fn generate(
        &self,
        url: &str,
        metadata: DefinitionMetadata,
    ) -> GeneratorResult<Option<GeneratedSpider>> {
        let page = self.fetch(url).await?;
        let Some(platform) = self.runner().detect_platform(&page).await else {
            info!("no store finder detected on {url}");
            return Ok(None);
        };
        self.build(platform, url, &page, metadata).await.map(Some)
    }

    /// Generate a spider for a platform already known to be present.
    pub async fn generate_for(
        &self,
        platform: Platform,
        url: &str,
        metadata: DefinitionMetadata,
    ) -> GeneratorResult<GeneratedSpider> {
        let page = self.fetch(url).await?;
        self.build(platform, url, &page, metadata).await
    }

    async fn build(
        &self,
        platform: Platform,
        url: &str,
        page: &PageResponse,
        mut metadata: DefinitionMetadata,
    ) -> GeneratorResult<GeneratedSpider> {
        let finder = self
            .registry
            .get(platform)
            .ok_or(GeneratorError::UnregisteredPlatform(platform))?;

        let extracted = self.runner().run_extraction(platform, page).await?;
        let extracted_start_urls = extracted.contains_key(START_URLS);
        if extracted.is_empty() {
            warn!("{platform} detected on {url} but no attributes were extracted");
        }
        metadata.extracted_attributes = Some(match metadata.extracted_attributes.take() {
            Some(given) => given.merged(extracted),
            None => extracted,
        });

        let host = Url::parse(url)?
            .host_str()
            .map(str::to_string)
            .unwrap_or_default();
        let key = metadata
            .spider_key
            .clone()
            .filter(|k| !k.is_empty())
            .map(|k| identifier(&k))
            .unwrap_or_else(|| spider_key_for(&host));

        let mut builder = SpiderDefinition::builder(class_name_for(&key))
            .base(finder.base_type())
            .attribute(NAME, spider_key_for(&host))
            .attribute(ALLOWED_DOMAINS, vec![host.clone()]);
        if !extracted_start_urls {
            builder = builder.attribute(START_URLS, vec![url.to_string()]);
        }
        let definition = builder.metadata(metadata).build();

        let source = synthesizer::render(&definition);
        info!(
            "generated {} ({platform}) for {url}",
            definition.class_name()
        );

        Ok(GeneratedSpider {
            platform,
            definition,
            source,
        })
    }
}

/// Spider key derived from a host: `www.acme-stores.example` becomes
/// `acme_stores_example`. Always a valid identifier.
pub fn spider_key_for(host: &str) -> String {
    identifier(&host.trim_start_matches("www.").to_ascii_lowercase())
}

/// Class name for a spider key: `acme_stores_example` becomes
/// `AcmeStoresExampleSpider`. A name that would start with a digit gets a
/// `_` prefix.
pub fn class_name_for(key: &str) -> String {
    let mut name: String = key
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    name.push_str("Spider");
    identifier(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spider_key_for() {
        assert_eq!(spider_key_for("www.acme-stores.example"), "acme_stores_example");
        assert_eq!(spider_key_for("Shop.Acme.example"), "shop_acme_example");
        assert_eq!(spider_key_for("www.7-eleven.com"), "_7_eleven_com");
        assert_eq!(spider_key_for("127.0.0.1"), "_127_0_0_1");
    }

    #[test]
    fn test_class_name_for() {
        assert_eq!(class_name_for("acme_stores_example"), "AcmeStoresExampleSpider");
        assert_eq!(class_name_for("poczta_polska_pl"), "PocztaPolskaPlSpider");
        assert_eq!(class_name_for("7eleven_us"), "_7elevenUsSpider");
        assert_eq!(class_name_for("acme stores (uk)"), "AcmeStoresUkSpider");
    }

    #[test]
    fn test_digit_leading_host_renders_valid_class() {
        let key = spider_key_for("www.7-eleven.com");
        let class = class_name_for(&key);
        assert_eq!(class, "_7ElevenComSpider");

        let definition = SpiderDefinition::builder(class)
            .base(crate::definition::BaseType::new("scraping_lib", "Spider"))
            .attribute(NAME, key)
            .build();
        let source = synthesizer::render(&definition);
        assert!(source.contains("\n\nclass _7ElevenComSpider(Spider):\n\tname = \"_7_eleven_com\""));
    }
}
