//! Storepoint: map key on the widget container, confirmed against the
//! public locations API before it is reported.

use super::html::{attr_value, has_element, script_sources};
use crate::carrier::{Continuation, OutboundRequest, Platform, Step};
use crate::definition::BaseType;
use crate::error::{GeneratorError, GeneratorResult};
use crate::http::PageResponse;
use crate::protocol::{DetectionVerdict, ExtractionResult, StoreFinder};
use crate::record::AttributeRecord;
use serde_json::Value;
use tracing::warn;

const API_BASE: &str = "https://api.storepoint.co/v1";

pub struct Storepoint;

impl Storepoint {
    pub fn locations_url(key: &str) -> String {
        format!("{API_BASE}/{key}/locations?rq")
    }
}

impl StoreFinder for Storepoint {
    fn platform(&self) -> Platform {
        Platform::Storepoint
    }

    fn base_type(&self) -> BaseType {
        BaseType::new("locations.storefinders.storepoint", "StorepointSpider")
    }

    fn detect(&self, response: &PageResponse) -> GeneratorResult<DetectionVerdict> {
        let document = response.document();
        let detected = has_element(&document, "#storepoint-container")
            || script_sources(&document, response.base_url())
                .iter()
                .any(|src| src.contains("storepoint.co"));
        Ok(DetectionVerdict::from_bool(detected))
    }

    fn extract(&self, response: &PageResponse) -> GeneratorResult<ExtractionResult> {
        let document = response.document();
        let Some(key) = attr_value(&document, "#storepoint-container", "data-map-id") else {
            return Ok(ExtractionResult::Complete(AttributeRecord::new()));
        };

        let mut partial = AttributeRecord::new();
        partial.insert("key", key.as_str());
        Ok(ExtractionResult::pending(
            OutboundRequest::get(Self::locations_url(&key)),
            Continuation::new(Platform::Storepoint, Step::StorepointConfirmKey),
            partial,
        ))
    }

    fn continue_extraction(
        &self,
        step: Step,
        response: &PageResponse,
        mut partial: AttributeRecord,
    ) -> GeneratorResult<ExtractionResult> {
        if step != Step::StorepointConfirmKey {
            return Err(GeneratorError::UnknownContinuation {
                platform: self.platform(),
                step,
            });
        }

        let body: Value = response.json()?;
        let confirmed = body.get("success").and_then(Value::as_bool).ok_or_else(|| {
            GeneratorError::malformed(self.platform(), &response.url, "missing `success` flag")
        })?;

        if confirmed {
            Ok(ExtractionResult::Complete(partial))
        } else {
            // The provisional key was rejected; only that key is revoked.
            let revoked = partial.remove("key");
            warn!(
                "storepoint rejected key {}",
                revoked.as_ref().and_then(serde_json::Value::as_str).unwrap_or_default()
            );
            Ok(ExtractionResult::Complete(partial))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"<div id="storepoint-container" data-map-id="1645b1d8e6e7a2"></div>
        <script src="https://cdn.storepoint.co/api/v1/js/1645b1d8e6e7a2.js"></script>"#;

    fn confirm(body: &str) -> GeneratorResult<ExtractionResult> {
        Storepoint.continue_extraction(
            Step::StorepointConfirmKey,
            &PageResponse::new(Storepoint::locations_url("1645b1d8e6e7a2"), body),
            AttributeRecord::from([("key", json!("1645b1d8e6e7a2"))]),
        )
    }

    #[test]
    fn test_extract_issues_confirmation_request() {
        let page = PageResponse::new("https://acme.example/locations", PAGE);
        assert_eq!(Storepoint.detect(&page).unwrap(), DetectionVerdict::Detected);

        let result = Storepoint.extract(&page).unwrap();
        let ExtractionResult::Pending(request) = &result else {
            panic!("expected a confirmation request");
        };
        assert_eq!(
            request.url,
            "https://api.storepoint.co/v1/1645b1d8e6e7a2/locations?rq"
        );
        assert_eq!(
            result.partial().and_then(|p| p.get_str("key")),
            Some("1645b1d8e6e7a2")
        );
    }

    #[test]
    fn test_confirmed_key_completes() {
        let ExtractionResult::Complete(record) =
            confirm(r#"{"success": true, "results": {"locations": []}}"#).unwrap()
        else {
            panic!("confirmation is the last step");
        };
        assert_eq!(record.get_str("key"), Some("1645b1d8e6e7a2"));
    }

    #[test]
    fn test_rejected_key_is_revoked() {
        assert_eq!(
            confirm(r#"{"success": false}"#).unwrap(),
            ExtractionResult::Complete(AttributeRecord::new())
        );
    }

    #[test]
    fn test_rejected_key_keeps_other_attributes() {
        let partial = AttributeRecord::from([
            ("key", json!("1645b1d8e6e7a2")),
            ("brand", json!("Acme")),
        ]);
        let result = Storepoint
            .continue_extraction(
                Step::StorepointConfirmKey,
                &PageResponse::new(
                    Storepoint::locations_url("1645b1d8e6e7a2"),
                    r#"{"success": false}"#,
                ),
                partial,
            )
            .unwrap();
        assert_eq!(
            result,
            ExtractionResult::Complete(AttributeRecord::from([("brand", json!("Acme"))]))
        );
    }

    #[test]
    fn test_malformed_confirmation() {
        assert!(matches!(
            confirm(r#"{"results": []}"#),
            Err(GeneratorError::MalformedResponse { .. })
        ));
        assert!(matches!(confirm("<html>"), Err(GeneratorError::Json(_))));
    }

    #[test]
    fn test_container_without_key() {
        let page = PageResponse::new(
            "https://acme.example/locations",
            r#"<div id="storepoint-container"></div>"#,
        );
        assert_eq!(
            Storepoint.extract(&page).unwrap(),
            ExtractionResult::Complete(AttributeRecord::new())
        );
    }
}
