//! Browser driver abstraction
//!
//! The scenario only needs to find elements, click them, type into them and
//! read their attributes. Anything that can do that drives the scenario:
//! a WebDriver session in production, a simulated workspace in tests.

use async_trait::async_trait;

use crate::common::Result;

use super::locator::Locator;

/// Opaque reference to an element found by a driver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Minimal UI automation surface
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// All elements matching the locator, in document order. An empty list
    /// is not an error here; callers decide whether absence is fatal.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// Click an element
    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// Clear a text field
    async fn clear(&self, element: &ElementHandle) -> Result<()>;

    /// Type text into an element
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()>;

    /// Value of an HTML attribute, `None` when the element lacks it
    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// Value of a DOM property, `None` when it is null or undefined
    async fn property(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;
}
