//! StoreRocket: widget container carrying the account id, or an
//! `Storerocket.init` call in an inline script.

use super::html::{attr_value, has_element, inline_scripts, script_sources};
use crate::carrier::Platform;
use crate::definition::BaseType;
use crate::error::GeneratorResult;
use crate::http::PageResponse;
use crate::protocol::{DetectionVerdict, ExtractionResult, StoreFinder};
use crate::record::AttributeRecord;
use regex::Regex;

pub struct StoreRocket;

impl StoreFinder for StoreRocket {
    fn platform(&self) -> Platform {
        Platform::StoreRocket
    }

    fn base_type(&self) -> BaseType {
        BaseType::new("locations.storefinders.storerocket", "StoreRocketSpider")
    }

    fn detect(&self, response: &PageResponse) -> GeneratorResult<DetectionVerdict> {
        let document = response.document();
        let detected = has_element(&document, "[data-storerocket-id]")
            || script_sources(&document, response.base_url())
                .iter()
                .any(|src| src.contains("storerocket.io"))
            || response.body.contains("Storerocket.init(");
        Ok(DetectionVerdict::from_bool(detected))
    }

    fn extract(&self, response: &PageResponse) -> GeneratorResult<ExtractionResult> {
        let document = response.document();
        let mut record = AttributeRecord::new();

        let account = attr_value(&document, "[data-storerocket-id]", "data-storerocket-id")
            .or_else(|| {
                inline_scripts(&document)
                    .iter()
                    .find_map(|script| account_from_init(script))
            });
        if let Some(account) = account {
            record.insert("storerocket_id", account);
        }

        Ok(ExtractionResult::Complete(record))
    }
}

fn account_from_init(script: &str) -> Option<String> {
    let re = Regex::new(r#"Storerocket\.init\([^)]*?account\s*:\s*["']([A-Za-z0-9]+)["']"#)
        .expect("valid regex");
    re.captures(script).map(|c| c[1].to_string())
}
