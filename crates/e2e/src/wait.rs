//! Bounded polling for conditions on a live page
//!
//! The form renders client-side and validation banners appear some time after
//! a submit click, so a lookup that fails now may succeed a moment later.
//! [`Waiter`] retries a probe on a fixed interval until it reports ready or
//! the deadline passes.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::locator::{self, Query};

/// Default timeout for a single wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Readiness predicate over a resolved element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Resolves at all
    Present,
    /// Rendered and displayed
    Visible,
    /// Displayed and enabled
    Clickable,
}

impl Condition {
    pub async fn holds<D: Driver>(self, driver: &D, element: &D::Element) -> E2eResult<bool> {
        match self {
            Condition::Present => Ok(true),
            Condition::Visible => driver.is_displayed(element).await,
            Condition::Clickable => {
                Ok(driver.is_displayed(element).await? && driver.is_enabled(element).await?)
            }
        }
    }
}

/// Poll settings for one session
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Waiter {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Waiter {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Run `probe` until it yields a value.
    ///
    /// `Ok(None)` and `NotFound` mean "not ready"; any other error, a stale
    /// handle included, ends the wait immediately.
    pub async fn poll<T, F, Fut>(&self, what: &str, mut probe: F) -> E2eResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<Option<T>>>,
    {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match probe().await {
                Ok(Some(value)) => {
                    debug!("{} ready after {} attempt(s)", what, attempts);
                    return Ok(value);
                }
                Ok(None) => {
                    trace!("{} not ready (attempt {})", what, attempts);
                }
                Err(e) if e.is_transient() => {
                    trace!("{} not ready: {} (attempt {})", what, e, attempts);
                }
                Err(e) => return Err(e),
            }

            if start.elapsed() >= self.timeout {
                return Err(E2eError::Timeout {
                    what: what.to_string(),
                    waited: start.elapsed(),
                    attempts,
                });
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Re-run `produce` until the element it yields satisfies `condition`.
    ///
    /// An element that goes stale between being produced and being checked
    /// is produced again. Errors from `produce` itself, such as a stale
    /// scope, are never retried.
    pub async fn until<D, P, Fut>(
        &self,
        driver: &D,
        condition: Condition,
        what: &str,
        mut produce: P,
    ) -> E2eResult<D::Element>
    where
        D: Driver,
        P: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<D::Element>>,
    {
        self.poll(what, move || {
            let pending = produce();
            async move {
                let element = pending.await?;
                match condition.holds(driver, &element).await {
                    Ok(true) => Ok(Some(element)),
                    Ok(false) | Err(E2eError::StaleElement(_)) => Ok(None),
                    Err(e) => Err(e),
                }
            }
        })
        .await
    }

    /// Locate `query` (under `scope`) and wait for `condition` on it
    pub async fn for_element<D: Driver>(
        &self,
        driver: &D,
        scope: Option<&D::Element>,
        query: &Query,
        condition: Condition,
    ) -> E2eResult<D::Element> {
        let what = format!("{:?} {}", condition, query.xpath(scope.is_some()));
        self.until(driver, condition, &what, || locator::find(driver, scope, query))
            .await
    }
}
