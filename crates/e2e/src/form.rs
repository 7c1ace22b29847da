//! Filling and submitting the contact form

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::config::FormProfile;
use crate::driver::Driver;
use crate::error::E2eResult;
use crate::locator::Query;
use crate::session::Session;
use crate::wait::Condition;

/// A question on the contact form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Email,
    Address,
    Phone,
    Comments,
}

impl Field {
    /// Order in which the fields are filled
    pub const ORDER: [Field; 5] = [
        Field::Name,
        Field::Email,
        Field::Address,
        Field::Phone,
        Field::Comments,
    ];

    /// Question title as rendered on the form
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Address => "Address",
            Field::Phone => "Phone number",
            Field::Comments => "Comments",
        }
    }

    pub fn control(self) -> ControlKind {
        match self {
            Field::Name | Field::Phone => ControlKind::Text,
            Field::Email => ControlKind::Email,
            Field::Address | Field::Comments => ControlKind::TextArea,
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, Field::Name | Field::Email | Field::Address)
    }

    /// The question's container, found through its `data-params` payload
    pub fn section_query(self) -> Query {
        Query::attribute_contains("data-params", format!("\"{}\"", self.label()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of input control a question renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Email,
    TextArea,
}

impl ControlKind {
    /// Query for the control, relative to its section
    pub fn query(self) -> Query {
        match self {
            ControlKind::Text => Query::tag("input").with_attr("type", "text"),
            ControlKind::Email => Query::tag("input").with_attr("type", "email"),
            ControlKind::TextArea => Query::tag("textarea"),
        }
    }
}

/// Values to type into each field; a missing or empty value leaves it blank
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldAssignment {
    values: BTreeMap<Field, String>,
}

impl FieldAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn get(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }
}

/// Resolved question containers, kept for reading validation alerts
#[derive(Debug, Clone)]
pub struct FieldSections<E> {
    sections: BTreeMap<Field, E>,
}

impl<E> Default for FieldSections<E> {
    fn default() -> Self {
        Self {
            sections: BTreeMap::new(),
        }
    }
}

impl<E> FieldSections<E> {
    pub fn insert(&mut self, field: Field, section: E) {
        self.sections.insert(field, section);
    }

    pub fn get(&self, field: Field) -> Option<&E> {
        self.sections.get(&field)
    }

    /// Sections in fill order
    pub fn iter(&self) -> impl Iterator<Item = (Field, &E)> {
        self.sections.iter().map(|(field, section)| (*field, section))
    }
}

/// Pick `selection`, fill every field in order, and click submit.
///
/// Each step waits for its control to become clickable first; a wait that
/// times out aborts the rest of the workflow.
pub async fn submit<D: Driver>(
    session: &Session<D>,
    profile: &FormProfile,
    selection: &str,
    fields: &FieldAssignment,
) -> E2eResult<FieldSections<D::Element>> {
    let driver = session.driver();
    let waiter = session.waiter();

    debug!("Selecting choice {:?}", selection);
    let choice = waiter
        .for_element(driver, None, &FormProfile::choice_query(selection), Condition::Clickable)
        .await?;
    driver.click(&choice).await?;

    let mut sections = FieldSections::default();
    for field in Field::ORDER {
        let section = waiter
            .for_element(driver, None, &field.section_query(), Condition::Present)
            .await?;
        let control = waiter
            .for_element(driver, Some(&section), &field.control().query(), Condition::Clickable)
            .await?;

        let value = fields.get(field);
        debug!("Filling {} with {:?}", field, value);
        driver.send_keys(&control, value).await?;

        sections.insert(field, section);
    }

    let button = waiter
        .for_element(driver, None, &profile.submit_query(), Condition::Clickable)
        .await?;
    driver.click(&button).await?;
    info!("Submitted form on {}", session.url());

    Ok(sections)
}
