//! Spider definitions and their declaration-time enrichment.
//!
//! A definition is immutable once built. Metadata such as brand and operator
//! Wikidata identifiers, a spider key rename or a pre-extracted attribute
//! mapping is folded into the attributes exactly once, by
//! [`SpiderDefinitionBuilder::build`]; rendering never changes it.

use crate::record::{AttributeRecord, NAME};
use crate::synthesizer::identifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A type a generated spider derives from, and the module it is imported from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseType {
    pub module: String,
    pub name: String,
}

impl BaseType {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

/// Optional metadata supplied when a spider is declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionMetadata {
    /// Human-readable brand. Only applied together with `brand_wikidata`.
    pub brand: Option<String>,
    pub brand_wikidata: Option<String>,
    /// Human-readable operator. Only applied together with `operator_wikidata`.
    pub operator: Option<String>,
    pub operator_wikidata: Option<String>,
    /// Replaces the `name` attribute, reduced to a valid identifier.
    pub spider_key: Option<String>,
    /// Attributes already extracted for this spider.
    pub extracted_attributes: Option<AttributeRecord>,
}

impl DefinitionMetadata {
    fn enrich(self, attributes: &mut AttributeRecord) {
        if let Some(extracted) = self.extracted_attributes {
            attributes.merge(extracted);
        }

        if let Some(wikidata) = non_empty(self.brand_wikidata) {
            attributes.set_item_attribute("brand_wikidata", wikidata);
            if let Some(brand) = non_empty(self.brand) {
                attributes.set_item_attribute("brand", brand);
            }
        }

        if let Some(wikidata) = non_empty(self.operator_wikidata) {
            attributes.set_item_attribute("operator_wikidata", wikidata);
            if let Some(operator) = non_empty(self.operator) {
                attributes.set_item_attribute("operator", operator);
            }
        }

        if let Some(key) = non_empty(self.spider_key) {
            attributes.revise(NAME, identifier(&key));
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// A fully populated spider ready to be rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpiderDefinition {
    class_name: String,
    bases: Vec<BaseType>,
    attributes: AttributeRecord,
}

impl SpiderDefinition {
    pub fn builder(class_name: impl Into<String>) -> SpiderDefinitionBuilder {
        SpiderDefinitionBuilder::new(class_name)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn bases(&self) -> &[BaseType] {
        &self.bases
    }

    pub fn attributes(&self) -> &AttributeRecord {
        &self.attributes
    }

    /// The spider's `name` attribute, if it has a string one.
    pub fn name(&self) -> Option<&str> {
        self.attributes.get_str(NAME)
    }
}

/// Collects the parts of a spider definition; [`build`] applies metadata
/// enrichment and freezes the result.
///
/// [`build`]: SpiderDefinitionBuilder::build
#[derive(Debug, Clone)]
pub struct SpiderDefinitionBuilder {
    class_name: String,
    bases: Vec<BaseType>,
    attributes: AttributeRecord,
    metadata: DefinitionMetadata,
}

impl SpiderDefinitionBuilder {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            bases: Vec::new(),
            attributes: AttributeRecord::new(),
            metadata: DefinitionMetadata::default(),
        }
    }

    pub fn base(mut self, base: BaseType) -> Self {
        self.bases.push(base);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn attributes(mut self, attributes: AttributeRecord) -> Self {
        for (key, value) in attributes.into_map() {
            self.attributes.insert(key, value);
        }
        self
    }

    pub fn metadata(mut self, metadata: DefinitionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn brand(mut self, brand: impl Into<String>, wikidata: impl Into<String>) -> Self {
        self.metadata.brand = Some(brand.into());
        self.metadata.brand_wikidata = Some(wikidata.into());
        self
    }

    pub fn operator(mut self, operator: impl Into<String>, wikidata: impl Into<String>) -> Self {
        self.metadata.operator = Some(operator.into());
        self.metadata.operator_wikidata = Some(wikidata.into());
        self
    }

    pub fn spider_key(mut self, key: impl Into<String>) -> Self {
        self.metadata.spider_key = Some(key.into());
        self
    }

    pub fn extracted_attributes(mut self, extracted: AttributeRecord) -> Self {
        self.metadata.extracted_attributes = Some(extracted);
        self
    }

    /// Enrich the attributes and freeze the definition. The class name is
    /// reduced to a valid identifier.
    pub fn build(self) -> SpiderDefinition {
        let mut attributes = self.attributes;
        self.metadata.enrich(&mut attributes);
        SpiderDefinition {
            class_name: identifier(&self.class_name),
            bases: self.bases,
            attributes,
        }
    }
}
