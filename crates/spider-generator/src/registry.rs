//! Ordered registry of store finder platforms and continuation routing.

use crate::carrier::{Carrier, OutboundRequest, Platform};
use crate::error::{GeneratorError, GeneratorResult};
use crate::http::PageResponse;
use crate::platforms::{StoreRocket, Stockist, Storepoint, Where2GetIt, Woosmap};
use crate::protocol::{DetectionVerdict, ExtractionResult, StoreFinder};

/// What a routed response produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Resumed {
    Detection(DetectionVerdict),
    Extraction(ExtractionResult),
}

/// Store finders in the priority order they are probed.
pub struct Registry {
    finders: Vec<Box<dyn StoreFinder>>,
}

impl Default for Registry {
    /// All built-in platforms. Platforms whose evidence takes follow-up
    /// requests come first so a cheap single-page match elsewhere on the
    /// page cannot shadow them.
    fn default() -> Self {
        Self::new()
            .with(Where2GetIt)
            .with(Woosmap)
            .with(StoreRocket)
            .with(Stockist)
            .with(Storepoint)
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            finders: Vec::new(),
        }
    }

    /// Append a platform at the lowest priority. A platform registered twice
    /// keeps its first position.
    pub fn with(mut self, finder: impl StoreFinder + 'static) -> Self {
        if self.get(finder.platform()).is_none() {
            self.finders.push(Box::new(finder));
        }
        self
    }

    pub fn get(&self, platform: Platform) -> Option<&dyn StoreFinder> {
        self.finders
            .iter()
            .find(|f| f.platform() == platform)
            .map(|f| f.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn StoreFinder> {
        self.finders.iter().map(|f| f.as_ref())
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.finders.iter().map(|f| f.platform()).collect()
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }

    /// Deliver `response` to the continuation named by the carrier of the
    /// request that fetched it.
    pub fn resume(
        &self,
        request: OutboundRequest,
        response: &PageResponse,
    ) -> GeneratorResult<Resumed> {
        let carrier = request
            .carrier
            .ok_or_else(|| GeneratorError::MissingCarrier(request.url.clone()))?;
        let next = carrier.continuation();
        let finder = self
            .get(next.platform)
            .ok_or(GeneratorError::UnregisteredPlatform(next.platform))?;

        match carrier {
            Carrier::Detection { .. } => finder
                .continue_detection(next.step, response)
                .map(Resumed::Detection),
            Carrier::Extraction { partial, .. } => finder
                .continue_extraction(next.step, response, partial)
                .map(Resumed::Extraction),
        }
    }
}
