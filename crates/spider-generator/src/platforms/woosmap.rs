//! Woosmap: the public project key (`woos-<uuid>`) sits either in the page
//! or in one of the site's own script bundles. Bundles are fetched one per
//! step; the ones still to scan ride along in the private
//! `_pending_scripts` attribute.

use super::html::{origin_of, same_origin, script_sources};
use crate::carrier::{Continuation, OutboundRequest, Platform, Step};
use crate::definition::BaseType;
use crate::error::{GeneratorError, GeneratorResult};
use crate::http::PageResponse;
use crate::protocol::{DetectionVerdict, ExtractionResult, StoreFinder};
use crate::record::AttributeRecord;
use regex::Regex;
use serde_json::Value;

const PENDING_SCRIPTS: &str = "_pending_scripts";

/// Bundles scanned per site at most.
const MAX_BUNDLES: usize = 5;

pub struct Woosmap;

impl StoreFinder for Woosmap {
    fn platform(&self) -> Platform {
        Platform::Woosmap
    }

    fn base_type(&self) -> BaseType {
        BaseType::new("locations.storefinders.woosmap", "WoosmapSpider")
    }

    fn detect(&self, response: &PageResponse) -> GeneratorResult<DetectionVerdict> {
        Ok(DetectionVerdict::from_bool(
            response.body.to_ascii_lowercase().contains("woosmap"),
        ))
    }

    fn extract(&self, response: &PageResponse) -> GeneratorResult<ExtractionResult> {
        if let Some(record) = found_key(response) {
            return Ok(ExtractionResult::Complete(record));
        }

        let bundles: Vec<String> = script_sources(&response.document(), response.base_url())
            .into_iter()
            .filter(|src| same_origin(src, response.base_url()))
            .take(MAX_BUNDLES)
            .collect();

        Ok(scan_next(bundles, AttributeRecord::new()))
    }

    fn continue_extraction(
        &self,
        step: Step,
        response: &PageResponse,
        mut partial: AttributeRecord,
    ) -> GeneratorResult<ExtractionResult> {
        if step != Step::WoosmapScanBundle {
            return Err(GeneratorError::UnknownContinuation {
                platform: self.platform(),
                step,
            });
        }

        let remaining = take_pending(&mut partial);
        match found_key(response) {
            Some(record) => {
                partial.merge(record);
                Ok(ExtractionResult::Complete(partial))
            }
            None => Ok(scan_next(remaining, partial)),
        }
    }
}

fn project_key(text: &str) -> Option<String> {
    let re = Regex::new(
        r"woos-[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    )
    .expect("valid regex");
    re.find(text).map(|m| m.as_str().to_string())
}

/// Key plus the origin it is registered for, when `response` contains one.
fn found_key(response: &PageResponse) -> Option<AttributeRecord> {
    let key = project_key(&response.body)?;
    let mut record = AttributeRecord::new();
    record.insert("key", key);
    if let Some(origin) = origin_of(response.base_url()) {
        record.insert("origin", origin);
    }
    Some(record)
}

fn take_pending(partial: &mut AttributeRecord) -> Vec<String> {
    match partial.remove(PENDING_SCRIPTS) {
        Some(Value::Array(urls)) => urls
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn scan_next(mut bundles: Vec<String>, mut partial: AttributeRecord) -> ExtractionResult {
    if bundles.is_empty() {
        return ExtractionResult::Complete(partial);
    }
    let next = bundles.remove(0);
    if !bundles.is_empty() {
        partial.insert(PENDING_SCRIPTS, bundles);
    }
    ExtractionResult::pending(
        OutboundRequest::get(next),
        Continuation::new(Platform::Woosmap, Step::WoosmapScanBundle),
        partial,
    )
}
