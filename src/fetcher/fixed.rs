//! Fixed-result fetchers, for defaults and test doubles

use async_trait::async_trait;

use super::ControllerFetcher;
use super::error::{FetchError, FetchResult};
use crate::models::ControllerKeyWithApiVersion;

/// Treats every key as its own top-level controller
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFetcher;

#[async_trait]
impl ControllerFetcher for IdentityFetcher {
    async fn find_top_level(
        &self,
        key: Option<ControllerKeyWithApiVersion>,
    ) -> FetchResult<Option<ControllerKeyWithApiVersion>> {
        Ok(key)
    }
}

/// Ignores its input and always answers with the same key
#[derive(Debug, Clone, Default)]
pub struct ConstantFetcher {
    result: Option<ControllerKeyWithApiVersion>,
}

impl ConstantFetcher {
    pub fn new(result: Option<ControllerKeyWithApiVersion>) -> Self {
        Self { result }
    }
}

#[async_trait]
impl ControllerFetcher for ConstantFetcher {
    async fn find_top_level(
        &self,
        _key: Option<ControllerKeyWithApiVersion>,
    ) -> FetchResult<Option<ControllerKeyWithApiVersion>> {
        Ok(self.result.clone())
    }
}

/// Checks it is called with `expected` and answers with `result`
///
/// `None` expected matches only a `None` argument.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    expected: Option<ControllerKeyWithApiVersion>,
    result: Option<ControllerKeyWithApiVersion>,
}

impl MockFetcher {
    pub fn new(
        expected: Option<ControllerKeyWithApiVersion>,
        result: Option<ControllerKeyWithApiVersion>,
    ) -> Self {
        Self { expected, result }
    }
}

#[async_trait]
impl ControllerFetcher for MockFetcher {
    async fn find_top_level(
        &self,
        key: Option<ControllerKeyWithApiVersion>,
    ) -> FetchResult<Option<ControllerKeyWithApiVersion>> {
        if key != self.expected {
            return Err(FetchError::AssertionMismatch {
                expected: self.expected.clone(),
                actual: key,
            });
        }
        Ok(self.result.clone())
    }
}
