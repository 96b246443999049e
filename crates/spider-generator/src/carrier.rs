//! Outbound request descriptors and the state they carry across the
//! request/response boundary.
//!
//! A follow-up request names the continuation that must handle its response
//! as plain data, never as a closure, so it can be serialized, queued and
//! dispatched by infrastructure outside this crate. Extraction chains also
//! carry the partial record accumulated so far. Nothing but the immediate
//! predecessor/successor pair reads the carrier; dropping a request abandons
//! its chain with no cleanup.

use crate::record::AttributeRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Every store finder platform this crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Where2GetIt,
    Woosmap,
    StoreRocket,
    Stockist,
    Storepoint,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Where2GetIt => "where2getit",
            Platform::Woosmap => "woosmap",
            Platform::StoreRocket => "storerocket",
            Platform::Stockist => "stockist",
            Platform::Storepoint => "storepoint",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "where2getit" => Some(Platform::Where2GetIt),
            "woosmap" => Some(Platform::Woosmap),
            "storerocket" => Some(Platform::StoreRocket),
            "stockist" => Some(Platform::Stockist),
            "storepoint" => Some(Platform::Storepoint),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known next-step identifiers. Each belongs to exactly one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Where2GetIt: look for the app key inside an embedded locator frame.
    Where2GetItProbeFrame,
    /// Where2GetIt: read the app key out of an embedded locator frame.
    Where2GetItReadFrame,
    /// Woosmap: search one same-origin script bundle for the project key.
    WoosmapScanBundle,
    /// Storepoint: confirm a map key against the locations API.
    StorepointConfirmKey,
}

/// Names the method that must handle a pending request's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Continuation {
    pub platform: Platform,
    pub step: Step,
}

impl Continuation {
    pub fn new(platform: Platform, step: Step) -> Self {
        Self { platform, step }
    }
}

/// Pass-through state attached to a follow-up request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chain", rename_all = "snake_case")]
pub enum Carrier {
    Detection {
        next: Continuation,
    },
    Extraction {
        next: Continuation,
        partial: AttributeRecord,
    },
}

impl Carrier {
    pub fn continuation(&self) -> Continuation {
        match self {
            Carrier::Detection { next } | Carrier::Extraction { next, .. } => *next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RequestBody {
    #[default]
    Empty,
    Form(Vec<(String, String)>),
    Json(Value),
}

/// Everything an external dispatcher needs to perform a request and route
/// its response back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: RequestBody,
    #[serde(default)]
    pub carrier: Option<Carrier>,
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: RequestBody::Empty,
            carrier: None,
        }
    }

    pub fn post_form(url: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        Self {
            method: HttpMethod::Post,
            body: RequestBody::Form(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Self::get(url)
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            body: RequestBody::Json(body),
            ..Self::get(url)
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_carrier(mut self, carrier: Carrier) -> Self {
        self.carrier = Some(carrier);
        self
    }

    pub fn continuation(&self) -> Option<Continuation> {
        self.carrier.as_ref().map(Carrier::continuation)
    }
}
