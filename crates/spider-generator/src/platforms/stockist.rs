//! Stockist: the embed tag (`u<digits>`) on the widget container or in the
//! widget API URL.

use super::html::{attr_value, script_sources};
use crate::carrier::Platform;
use crate::definition::BaseType;
use crate::error::GeneratorResult;
use crate::http::PageResponse;
use crate::protocol::{DetectionVerdict, ExtractionResult, StoreFinder};
use crate::record::AttributeRecord;
use regex::Regex;

pub struct Stockist;

impl StoreFinder for Stockist {
    fn platform(&self) -> Platform {
        Platform::Stockist
    }

    fn base_type(&self) -> BaseType {
        BaseType::new("locations.storefinders.stockist", "StockistSpider")
    }

    fn detect(&self, response: &PageResponse) -> GeneratorResult<DetectionVerdict> {
        let document = response.document();
        let detected = attr_value(&document, "[data-stockist-widget-tag]", "data-stockist-widget-tag")
            .is_some()
            || script_sources(&document, response.base_url())
                .iter()
                .any(|src| src.contains("stockist.co"));
        Ok(DetectionVerdict::from_bool(detected))
    }

    fn extract(&self, response: &PageResponse) -> GeneratorResult<ExtractionResult> {
        let document = response.document();
        let mut record = AttributeRecord::new();

        let key = attr_value(&document, "[data-stockist-widget-tag]", "data-stockist-widget-tag")
            .or_else(|| key_from_api_url(&response.body));
        if let Some(key) = key {
            record.insert("key", key);
        }

        Ok(ExtractionResult::Complete(record))
    }
}

fn key_from_api_url(body: &str) -> Option<String> {
    let re = Regex::new(r"stockist\.co/api/v1/(u\d+)/").expect("valid regex");
    re.captures(body).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_tag() {
        let page = PageResponse::new(
            "https://acme.example/stockists",
            r#"<div data-stockist-widget-tag="u12345">Loading...</div>
               <script src="https://stockist.co/embed/v1/widget.min.js"></script>"#,
        );
        assert_eq!(Stockist.detect(&page).unwrap(), DetectionVerdict::Detected);
        let ExtractionResult::Complete(record) = Stockist.extract(&page).unwrap() else {
            panic!("single step extraction");
        };
        assert_eq!(record.get_str("key"), Some("u12345"));
    }

    #[test]
    fn test_api_url_fallback() {
        let page = PageResponse::new(
            "https://acme.example/stockists",
            r#"<script>fetch("https://stockist.co/api/v1/u777/locations/all.js")</script>"#,
        );
        let ExtractionResult::Complete(record) = Stockist.extract(&page).unwrap() else {
            panic!("single step extraction");
        };
        assert_eq!(record.get_str("key"), Some("u777"));
    }

    #[test]
    fn test_absent() {
        let page = PageResponse::new("https://acme.example/", "<p>stockists coming soon</p>");
        assert_eq!(Stockist.detect(&page).unwrap(), DetectionVerdict::NotDetected);
    }
}
