//! formcheck E2E suite
//!
//! This crate drives Chrome over WebDriver against a hosted contact form and
//! checks how the form validates and accepts submissions:
//! - Spawns chromedriver (or connects to a running WebDriver)
//! - Locates elements with structural XPath queries, never cached ids
//! - Polls the live page until each element is ready before acting on it
//! - Parses declarative YAML scenarios and classifies each submission
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Scenario Runner                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── Launcher::launch(url) -> Session                     │
//! │    ├── form::submit(session, choice, fields) -> sections    │
//! │    ├── outcome::classify(session, sections) -> Outcome      │
//! │    ├── Expectation::verify(outcome)                         │
//! │    └── Session::close()                                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Waiter (poll until ready or timeout)                       │
//! │    └── locator::find(scope, Query) -> Driver::Element       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags, choice?                     │
//! │    ├── fields: { name, email, address, phone, comments }    │
//! │    └── expect: accepted | rejected { field, messages }      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod form;
pub mod locator;
pub mod outcome;
pub mod runner;
pub mod session;
pub mod spec;
pub mod wait;

pub use config::{FormProfile, SessionConfig};
pub use driver::{Driver, WebDriverClient};
pub use error::{E2eError, E2eResult};
pub use form::{Field, FieldAssignment, FieldSections};
pub use locator::Query;
pub use outcome::{Expectation, MessageCategory, Outcome, ValidationMessages};
pub use runner::TestRunner;
pub use session::{Launcher, Session};
pub use spec::Scenario;
pub use wait::{Condition, Waiter};
