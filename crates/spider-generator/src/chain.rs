//! Drives detection and extraction chains to completion.
//!
//! One chain issues at most one request at a time: a step's follow-up
//! request is dispatched, the response is routed to the continuation named
//! in the request's carrier, and the loop repeats until a step concludes.
//! Independent chains (different sites) may run concurrently; they share
//! nothing but the dispatcher.

use crate::carrier::{OutboundRequest, Platform};
use crate::error::{GeneratorError, GeneratorResult};
use crate::http::PageResponse;
use crate::protocol::{DetectionVerdict, ExtractionResult};
use crate::record::AttributeRecord;
use crate::registry::{Registry, Resumed};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Performs outbound requests. Transport failures, retries and timeouts
/// are the dispatcher's business; chains only see what it returns.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: &OutboundRequest) -> GeneratorResult<PageResponse>;
}

pub struct ChainRunner<'a> {
    registry: &'a Registry,
    dispatcher: &'a dyn Dispatcher,
    max_steps: usize,
}

impl<'a> ChainRunner<'a> {
    pub fn new(registry: &'a Registry, dispatcher: &'a dyn Dispatcher, max_steps: usize) -> Self {
        Self {
            registry,
            dispatcher,
            max_steps,
        }
    }

    /// Run `platform`'s detection chain starting from `page`.
    pub async fn run_detection(
        &self,
        platform: Platform,
        page: &PageResponse,
    ) -> GeneratorResult<bool> {
        let finder = self
            .registry
            .get(platform)
            .ok_or(GeneratorError::UnregisteredPlatform(platform))?;

        let mut verdict = finder.detect(page)?;
        let mut steps = 0;
        loop {
            let request = match verdict {
                DetectionVerdict::Detected => return Ok(true),
                DetectionVerdict::NotDetected => return Ok(false),
                DetectionVerdict::Pending(request) => request,
            };
            steps += 1;
            debug!("{platform} detection step {steps}: {}", request.url);

            verdict = match self.follow(request, steps).await? {
                Resumed::Detection(next) => next,
                Resumed::Extraction(_) => {
                    return Err(GeneratorError::CarrierMismatch(page.url.clone()))
                }
            };
        }
    }

    /// Run `platform`'s extraction chain starting from `page` and return the
    /// accumulated record with private keys removed.
    pub async fn run_extraction(
        &self,
        platform: Platform,
        page: &PageResponse,
    ) -> GeneratorResult<AttributeRecord> {
        let finder = self
            .registry
            .get(platform)
            .ok_or(GeneratorError::UnregisteredPlatform(platform))?;

        let mut result = finder.extract(page)?;
        let mut steps = 0;
        loop {
            let request = match result {
                ExtractionResult::Complete(mut record) => {
                    record.strip_private();
                    debug!("{platform} extraction finished after {steps} follow-ups");
                    return Ok(record);
                }
                ExtractionResult::Pending(request) => request,
            };
            steps += 1;
            debug!("{platform} extraction step {steps}: {}", request.url);

            result = match self.follow(request, steps).await? {
                Resumed::Extraction(next) => next,
                Resumed::Detection(_) => {
                    return Err(GeneratorError::CarrierMismatch(page.url.clone()))
                }
            };
        }
    }

    /// Probe every registered platform in priority order and return the first
    /// one detected. A platform whose chain fails counts as not detected.
    pub async fn detect_platform(&self, page: &PageResponse) -> Option<Platform> {
        for platform in self.registry.platforms() {
            match self.run_detection(platform, page).await {
                Ok(true) => {
                    info!("detected {platform} on {}", page.url);
                    return Some(platform);
                }
                Ok(false) => {}
                Err(e) => warn!("abandoning {platform} detection on {}: {e}", page.url),
            }
        }
        None
    }

    async fn follow(&self, request: OutboundRequest, steps: usize) -> GeneratorResult<Resumed> {
        if steps > self.max_steps {
            return Err(GeneratorError::ChainTooLong(self.max_steps));
        }
        let response = self.dispatcher.dispatch(&request).await?;
        if !response.is_success() {
            return Err(GeneratorError::Status {
                url: response.url,
                status: response.status,
            });
        }
        self.registry.resume(request, &response)
    }
}
