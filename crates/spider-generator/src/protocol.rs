//! Detection and extraction protocols implemented by every store finder.
//!
//! Both protocols are three-way (or two-way) tagged results rather than
//! booleans: a step may conclude, or hand back one follow-up request whose
//! carrier names the continuation for its response. Chains are strictly
//! sequential and terminate only when some step concludes.

use crate::carrier::{Carrier, Continuation, OutboundRequest, Platform, Step};
use crate::definition::BaseType;
use crate::error::{GeneratorError, GeneratorResult};
use crate::http::PageResponse;
use crate::record::AttributeRecord;

/// Outcome of one detection step.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionVerdict {
    NotDetected,
    Detected,
    /// Conclusive evidence needs another fetch. The request's carrier names
    /// the continuation.
    Pending(OutboundRequest),
}

impl DetectionVerdict {
    /// Follow-up probe handled by `next`.
    pub fn probe(request: OutboundRequest, next: Continuation) -> Self {
        DetectionVerdict::Pending(request.with_carrier(Carrier::Detection { next }))
    }

    pub fn from_bool(detected: bool) -> Self {
        if detected {
            DetectionVerdict::Detected
        } else {
            DetectionVerdict::NotDetected
        }
    }
}

/// Outcome of one extraction step.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    /// No further requests needed. An empty record means nothing was
    /// extracted.
    Complete(AttributeRecord),
    /// More data must be fetched. The request's carrier holds the
    /// continuation and the record accumulated so far.
    Pending(OutboundRequest),
}

impl ExtractionResult {
    pub fn pending(request: OutboundRequest, next: Continuation, partial: AttributeRecord) -> Self {
        ExtractionResult::Pending(request.with_carrier(Carrier::Extraction { next, partial }))
    }

    /// The record accumulated so far, whichever variant this is.
    pub fn partial(&self) -> Option<&AttributeRecord> {
        match self {
            ExtractionResult::Complete(record) => Some(record),
            ExtractionResult::Pending(request) => match &request.carrier {
                Some(Carrier::Extraction { partial, .. }) => Some(partial),
                _ => None,
            },
        }
    }
}

/// Capability set of one embeddable store finder platform.
///
/// Every method is a pure function of its arguments. Absence is a normal
/// return value; only responses of an unexpected shape produce errors.
pub trait StoreFinder: Send + Sync {
    fn platform(&self) -> Platform;

    /// Module and class the generated spider derives from.
    fn base_type(&self) -> BaseType;

    /// Is this platform present on the page?
    fn detect(&self, _response: &PageResponse) -> GeneratorResult<DetectionVerdict> {
        Ok(DetectionVerdict::NotDetected)
    }

    /// Resume a detection chain with the response to a probe this platform
    /// issued.
    fn continue_detection(
        &self,
        step: Step,
        _response: &PageResponse,
    ) -> GeneratorResult<DetectionVerdict> {
        Err(GeneratorError::UnknownContinuation {
            platform: self.platform(),
            step,
        })
    }

    /// Extract the spider attributes available from a page of a site where
    /// this platform was detected.
    fn extract(&self, _response: &PageResponse) -> GeneratorResult<ExtractionResult> {
        Ok(ExtractionResult::Complete(AttributeRecord::new()))
    }

    /// Resume an extraction chain. `partial` is exactly what the previous
    /// step left; the result must keep everything already in it. Values may
    /// be revised, and a key the platform itself invalidates (a rejected
    /// credential) may be removed; other keys are never dropped.
    fn continue_extraction(
        &self,
        step: Step,
        _response: &PageResponse,
        _partial: AttributeRecord,
    ) -> GeneratorResult<ExtractionResult> {
        Err(GeneratorError::UnknownContinuation {
            platform: self.platform(),
            step,
        })
    }
}
