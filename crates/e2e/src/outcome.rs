//! Classifying what the form did with a submission

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FormProfile;
use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::form::{Field, FieldSections};
use crate::locator::{self, Query};
use crate::session::Session;
use crate::wait::Condition;

/// Kind of validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    /// A required question was left blank
    Required,
    /// The value does not have the expected format
    InvalidFormat,
}

/// Validation texts the form may show, in every language it renders in.
///
/// The form picks its language itself, so a message matches a category when
/// it contains any of that category's phrasings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationMessages {
    pub required: Vec<String>,
    pub invalid_format: Vec<String>,
}

impl Default for ValidationMessages {
    fn default() -> Self {
        Self {
            required: vec![
                "This is a required question".to_string(),
                "See on kohustuslik küsimus".to_string(),
            ],
            invalid_format: vec![
                "Please enter a valid email address".to_string(),
                "Sisestage kehtiv e-posti aadress".to_string(),
            ],
        }
    }
}

impl ValidationMessages {
    pub fn phrasings(&self, category: MessageCategory) -> &[String] {
        match category {
            MessageCategory::Required => &self.required,
            MessageCategory::InvalidFormat => &self.invalid_format,
        }
    }

    pub fn matches(&self, category: MessageCategory, text: &str) -> bool {
        self.phrasings(category)
            .iter()
            .any(|phrase| text.contains(phrase.as_str()))
    }

    pub fn categorize(&self, text: &str) -> Option<MessageCategory> {
        [MessageCategory::Required, MessageCategory::InvalidFormat]
            .into_iter()
            .find(|category| self.matches(*category, text))
    }
}

/// Result of a submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The confirmation page was shown
    Accepted,
    /// A validation alert is shown under `field`
    Rejected { field: Field, message: String },
}

/// The alert a question shows when its value is rejected
fn alert_query() -> Query {
    Query::tag("div").with_attr("role", "alert")
}

/// Wait for the page to settle after submit and classify it.
///
/// The success phrase anywhere in the page source means `Accepted`. Otherwise
/// the first visible alert under `expected_field` (or, when `None`, under any
/// section in fill order) means `Rejected`. Neither within the session's
/// timeout is a `Timeout`.
pub async fn classify<D: Driver>(
    session: &Session<D>,
    profile: &FormProfile,
    sections: &FieldSections<D::Element>,
    expected_field: Option<Field>,
) -> E2eResult<Outcome> {
    let candidates: Vec<(Field, &D::Element)> = match expected_field {
        Some(field) => {
            let section = sections.get(field).ok_or_else(|| {
                E2eError::AssertionFailed(format!("no section resolved for {}", field))
            })?;
            vec![(field, section)]
        }
        None => sections.iter().collect(),
    };

    let driver = session.driver();
    let candidates = &candidates;
    let alert = &alert_query();
    let success_phrase = profile.success_phrase.as_str();

    session
        .waiter()
        .poll("submission outcome", move || async move {
            if driver.page_source().await?.contains(success_phrase) {
                return Ok(Some(Outcome::Accepted));
            }

            for &(field, section) in candidates {
                let element = match locator::find(driver, Some(section), alert).await {
                    Ok(element) => element,
                    Err(e) if e.is_transient() => continue,
                    // Sections go stale once the confirmation page has replaced the form.
                    Err(E2eError::StaleElement(reason)) => {
                        if driver.page_source().await?.contains(success_phrase) {
                            return Ok(Some(Outcome::Accepted));
                        }
                        return Err(E2eError::StaleElement(reason));
                    }
                    Err(e) => return Err(e),
                };
                if Condition::Visible.holds(driver, &element).await? {
                    let message = driver.text(&element).await?;
                    debug!("{} rejected: {:?}", field, message);
                    return Ok(Some(Outcome::Rejected { field, message }));
                }
            }

            Ok(None)
        })
        .await
}

/// What a scenario expects the form to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Expectation {
    Accepted,
    /// Rejected on `field` with a message from any of `messages`
    Rejected {
        field: Field,
        messages: Vec<MessageCategory>,
    },
}

impl Expectation {
    /// Field whose alert the validator should read
    pub fn field(&self) -> Option<Field> {
        match self {
            Expectation::Accepted => None,
            Expectation::Rejected { field, .. } => Some(*field),
        }
    }

    pub fn verify(&self, outcome: &Outcome, messages: &ValidationMessages) -> E2eResult<()> {
        match (self, outcome) {
            (Expectation::Accepted, Outcome::Accepted) => Ok(()),
            (Expectation::Accepted, Outcome::Rejected { field, message }) => Err(
                E2eError::AssertionFailed(format!(
                    "expected acceptance, {} was rejected: {:?}",
                    field, message
                )),
            ),
            (Expectation::Rejected { field, .. }, Outcome::Accepted) => Err(
                E2eError::AssertionFailed(format!("expected {} to be rejected, form was accepted", field)),
            ),
            (
                Expectation::Rejected {
                    field: expected,
                    messages: categories,
                },
                Outcome::Rejected { field, message },
            ) => {
                if expected != field {
                    return Err(E2eError::AssertionFailed(format!(
                        "expected {} to be rejected, got alert on {}",
                        expected, field
                    )));
                }
                if categories.iter().any(|c| messages.matches(*c, message)) {
                    Ok(())
                } else {
                    Err(E2eError::AssertionFailed(format!(
                        "alert on {} reads {:?}, expected one of {:?}",
                        field, message, categories
                    )))
                }
            }
        }
    }
}
