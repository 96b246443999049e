//! Spider generator: detects embedded store finders, follows their
//! multi-request extraction chains and renders spider source code.

pub mod carrier;
pub mod chain;
pub mod config;
pub mod definition;
pub mod error;
pub mod generator;
pub mod http;
pub mod platforms;
pub mod protocol;
pub mod record;
pub mod registry;
pub mod synthesizer;

pub use carrier::{Carrier, Continuation, HttpMethod, OutboundRequest, Platform, RequestBody, Step};
pub use chain::{ChainRunner, Dispatcher};
pub use config::GeneratorConfig;
pub use definition::{BaseType, DefinitionMetadata, SpiderDefinition, SpiderDefinitionBuilder};
pub use error::{GeneratorError, GeneratorResult};
pub use generator::{class_name_for, spider_key_for, DetectionReport, GeneratedSpider, SpiderGenerator};
pub use http::{HttpClient, PageResponse};
pub use protocol::{DetectionVerdict, ExtractionResult, StoreFinder};
pub use record::AttributeRecord;
pub use registry::{Registry, Resumed};
pub use synthesizer::{identifier, render, write_spider};
