//! WebDriver primitives behind a trait
//!
//! Everything above this module talks to the browser through [`Driver`], so
//! the workflow and validator can run against a real WebDriver session or an
//! in-memory page in tests.

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{Client, Locator};
use std::fmt;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::locator::Query;

/// Browser automation primitives used by the suite
#[async_trait]
pub trait Driver: Send + Sync {
    /// Ephemeral handle into the live page; invalid after navigation
    type Element: Clone + fmt::Debug + Send + Sync;

    async fn goto(&self, url: &str) -> E2eResult<()>;

    /// First element matching `query` in document order, under `scope` if given
    async fn find(&self, scope: Option<&Self::Element>, query: &Query)
        -> E2eResult<Self::Element>;

    async fn click(&self, element: &Self::Element) -> E2eResult<()>;

    async fn send_keys(&self, element: &Self::Element, text: &str) -> E2eResult<()>;

    async fn is_displayed(&self, element: &Self::Element) -> E2eResult<bool>;

    async fn is_enabled(&self, element: &Self::Element) -> E2eResult<bool>;

    async fn text(&self, element: &Self::Element) -> E2eResult<String>;

    /// Full rendered page source
    async fn page_source(&self) -> E2eResult<String>;

    /// End the browser session
    async fn quit(&self) -> E2eResult<()>;
}

/// [`Driver`] backed by a fantoccini WebDriver client
#[derive(Clone)]
pub struct WebDriverClient {
    client: Client,
}

impl WebDriverClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl fmt::Debug for WebDriverClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebDriverClient").finish_non_exhaustive()
    }
}

/// Map a command error, naming what was being done
fn command_error(err: CmdError, context: &str) -> E2eError {
    match err {
        CmdError::Standard(ref wd) if matches!(wd.error, ErrorStatus::StaleElementReference) => {
            E2eError::StaleElement(context.to_string())
        }
        err if err.is_no_such_element() => E2eError::NotFound(context.to_string()),
        err => E2eError::Driver(format!("{}: {}", context, err)),
    }
}

#[async_trait]
impl Driver for WebDriverClient {
    type Element = Element;

    async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("goto {}", url);
        self.client
            .goto(url)
            .await
            .map_err(|e| command_error(e, url))
    }

    async fn find(&self, scope: Option<&Element>, query: &Query) -> E2eResult<Element> {
        let xpath = query.xpath(scope.is_some());
        let found = match scope {
            Some(parent) => parent.find(Locator::XPath(&xpath)).await,
            None => self.client.find(Locator::XPath(&xpath)).await,
        };
        found.map_err(|e| command_error(e, &xpath))
    }

    async fn click(&self, element: &Element) -> E2eResult<()> {
        element.click().await.map_err(|e| command_error(e, "click"))
    }

    async fn send_keys(&self, element: &Element, text: &str) -> E2eResult<()> {
        element
            .send_keys(text)
            .await
            .map_err(|e| command_error(e, "send keys"))
    }

    async fn is_displayed(&self, element: &Element) -> E2eResult<bool> {
        element
            .is_displayed()
            .await
            .map_err(|e| command_error(e, "is displayed"))
    }

    async fn is_enabled(&self, element: &Element) -> E2eResult<bool> {
        element
            .is_enabled()
            .await
            .map_err(|e| command_error(e, "is enabled"))
    }

    async fn text(&self, element: &Element) -> E2eResult<String> {
        element.text().await.map_err(|e| command_error(e, "text"))
    }

    async fn page_source(&self) -> E2eResult<String> {
        self.client
            .source()
            .await
            .map_err(|e| command_error(e, "page source"))
    }

    async fn quit(&self) -> E2eResult<()> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| command_error(e, "close session"))
    }
}
