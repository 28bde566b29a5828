//! WebDriver session
//!
//! Drives a browser through a W3C WebDriver server (geckodriver,
//! chromedriver or a Selenium grid) with fantoccini. Elements cross the
//! `UiDriver` boundary as their WebDriver references and are rebound to
//! the session on each call.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::elements::{Element, ElementRef};
use fantoccini::{Client, ClientBuilder, Locator as Search};
use serde_json::{Map, Value};

use crate::common::{Error, Result};

use super::driver::{ElementHandle, UiDriver};
use super::locator::{Locator, Strategy};

/// An open browser session
pub struct WebDriverSession {
    client: Client,
    request_timeout: Duration,
}

impl WebDriverSession {
    /// Create a session on the given server
    pub async fn start(server: &str, browser: &str, request_timeout: Duration) -> Result<Self> {
        let mut capabilities = Map::new();
        capabilities.insert("browserName".to_string(), Value::from(browser));

        let mut builder = ClientBuilder::native();
        builder.capabilities(capabilities);
        let server = server_url(server);
        let client = timed(request_timeout, builder.connect(&server)).await?;

        tracing::info!(server = %server, browser, "WebDriver session started");

        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Load a page in the session's browser
    pub async fn navigate(&self, url: &str) -> Result<()> {
        tracing::debug!(url, "Navigating");
        timed(self.request_timeout, self.client.goto(url)).await
    }

    /// End the session and close the browser
    pub async fn quit(self) -> Result<()> {
        timed(self.request_timeout, self.client.close()).await?;
        tracing::debug!("WebDriver session closed");
        Ok(())
    }

    fn element(&self, handle: &ElementHandle) -> Element {
        Element::from_element_id(self.client.clone(), ElementRef::from(handle.id().to_string()))
    }
}

/// Server URLs are joined with relative command paths, so they need a
/// trailing slash to keep a path prefix such as `/wd/hub`
fn server_url(server: &str) -> String {
    format!("{}/", server.trim_end_matches('/'))
}

async fn timed<T, E>(limit: Duration, request: impl Future<Output = std::result::Result<T, E>>) -> Result<T>
where
    Error: From<E>,
{
    tokio::time::timeout(limit, request)
        .await
        .map_err(|_| Error::Timeout(limit.as_secs()))?
        .map_err(Error::from)
}

#[async_trait]
impl UiDriver for WebDriverSession {
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let (strategy, query) = locator.query();
        let search = match strategy {
            Strategy::XPath => Search::XPath(&query),
            Strategy::Css => Search::Css(&query),
        };
        tracing::trace!(locator = %locator, "Find elements");

        let found = timed(self.request_timeout, self.client.find_all(search)).await?;
        Ok(found
            .iter()
            .map(|element| ElementHandle::new(element.element_id().to_string()))
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let element = self.element(element);
        timed(self.request_timeout, element.click()).await
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        let element = self.element(element);
        timed(self.request_timeout, element.clear()).await
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let element = self.element(element);
        timed(self.request_timeout, element.send_keys(text)).await
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let element = self.element(element);
        timed(self.request_timeout, element.attr(name)).await
    }

    async fn property(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let element = self.element(element);
        timed(self.request_timeout, element.prop(name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_url_keeps_path_prefix() {
        assert_eq!(server_url("http://127.0.0.1:4444"), "http://127.0.0.1:4444/");
        assert_eq!(server_url("http://grid:4444/wd/hub/"), "http://grid:4444/wd/hub/");
    }

    #[tokio::test]
    async fn test_timed_maps_errors_and_deadline() {
        let ok: Result<u8> = timed(Duration::from_secs(1), async { Ok::<_, std::io::Error>(3) }).await;
        assert_eq!(ok.unwrap(), 3);

        let failed: Result<()> = timed(Duration::from_secs(1), async {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "refused"))
        })
        .await;
        assert!(matches!(failed, Err(Error::Io(_))));

        let slow: Result<()> = timed(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, std::io::Error>(())
        })
        .await;
        assert!(matches!(slow, Err(Error::Timeout(_))));
    }
}
