//! Where2GetIt: hosted locator usually embedded through one or more
//! iframes. Both detection and extraction follow nested frames one request
//! at a time until the app key turns up or the frames run out.

use super::html::{iframe_sources, origin_of};
use crate::carrier::{Continuation, OutboundRequest, Platform, Step};
use crate::definition::BaseType;
use crate::error::{GeneratorError, GeneratorResult};
use crate::http::PageResponse;
use crate::protocol::{DetectionVerdict, ExtractionResult, StoreFinder};
use crate::record::AttributeRecord;
use regex::Regex;
use url::Url;

pub struct Where2GetIt;

impl StoreFinder for Where2GetIt {
    fn platform(&self) -> Platform {
        Platform::Where2GetIt
    }

    fn base_type(&self) -> BaseType {
        BaseType::new("locations.storefinders.where2getit", "Where2GetItSpider")
    }

    fn detect(&self, response: &PageResponse) -> GeneratorResult<DetectionVerdict> {
        if mentions_platform(&response.body) && app_key(&response.body).is_some() {
            return Ok(DetectionVerdict::Detected);
        }
        Ok(probe_frame(response))
    }

    fn continue_detection(
        &self,
        step: Step,
        response: &PageResponse,
    ) -> GeneratorResult<DetectionVerdict> {
        if step != Step::Where2GetItProbeFrame {
            return Err(GeneratorError::UnknownContinuation {
                platform: self.platform(),
                step,
            });
        }
        if app_key(&response.body).is_some() {
            return Ok(DetectionVerdict::Detected);
        }
        Ok(probe_frame(response))
    }

    fn extract(&self, response: &PageResponse) -> GeneratorResult<ExtractionResult> {
        if mentions_platform(&response.body) {
            if let Some(key) = app_key(&response.body) {
                let mut record = AttributeRecord::new();
                record.insert("api_key", key);
                return Ok(ExtractionResult::Complete(record));
            }
        }
        Ok(read_frame(response, AttributeRecord::new()))
    }

    fn continue_extraction(
        &self,
        step: Step,
        response: &PageResponse,
        mut partial: AttributeRecord,
    ) -> GeneratorResult<ExtractionResult> {
        if step != Step::Where2GetItReadFrame {
            return Err(GeneratorError::UnknownContinuation {
                platform: self.platform(),
                step,
            });
        }

        let Some(key) = app_key(&response.body) else {
            return Ok(read_frame(response, partial));
        };

        let mut found = AttributeRecord::new();
        found.insert("api_key", key);
        if let Some(endpoint) = api_endpoint(response.base_url()) {
            found.insert("api_endpoint", endpoint);
        }
        partial.merge(found);
        Ok(ExtractionResult::Complete(partial))
    }
}

fn mentions_platform(body: &str) -> bool {
    body.to_ascii_lowercase().contains("where2getit")
}

fn app_key(body: &str) -> Option<String> {
    let re = Regex::new(r#"(?i)appkey["']?\s*[:=]\s*["']([0-9A-F][0-9A-F-]{7,})["']"#)
        .expect("valid regex");
    re.captures(body).map(|c| c[1].to_string())
}

fn locator_frame(response: &PageResponse) -> Option<String> {
    iframe_sources(&response.document(), response.base_url())
        .into_iter()
        .find(|src| mentions_platform(src))
}

fn probe_frame(response: &PageResponse) -> DetectionVerdict {
    match locator_frame(response) {
        Some(frame) => DetectionVerdict::probe(
            OutboundRequest::get(frame),
            Continuation::new(Platform::Where2GetIt, Step::Where2GetItProbeFrame),
        ),
        None => DetectionVerdict::NotDetected,
    }
}

fn read_frame(response: &PageResponse, partial: AttributeRecord) -> ExtractionResult {
    match locator_frame(response) {
        Some(frame) => ExtractionResult::pending(
            OutboundRequest::get(frame),
            Continuation::new(Platform::Where2GetIt, Step::Where2GetItReadFrame),
            partial,
        ),
        None => ExtractionResult::Complete(partial),
    }
}

/// `<origin>/<first path segment>/rest/getlist` of the locator frame.
fn api_endpoint(frame_url: &str) -> Option<String> {
    let origin = origin_of(frame_url)?;
    let parsed = Url::parse(frame_url).ok()?;
    let first_segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next())
        .filter(|s| !s.is_empty() && !s.contains('.'));
    Some(match first_segment {
        Some(segment) => format!("{origin}/{segment}/rest/getlist"),
        None => format!("{origin}/rest/getlist"),
    })
}
