//! In-memory stand-in for the hosted contact form.
//!
//! Renders a small element tree that behaves like the live page: the
//! question sections appear only after the choice is clicked, controls enable
//! after a delay, alerts show up a moment after submit, and a valid
//! submission navigates to a confirmation page (making old handles stale).

#![allow(dead_code)]

use async_trait::async_trait;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use formcheck_e2e::form::Field;
use formcheck_e2e::session::{Launcher, Session};
use formcheck_e2e::wait::Waiter;
use formcheck_e2e::{Driver, E2eError, E2eResult, FormProfile, Query, ValidationMessages};

/// Language the fake form renders in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    Et,
}

#[derive(Debug, Clone)]
pub struct FormOptions {
    pub locale: Locale,
    /// Delay before newly rendered controls become enabled
    pub render_delay: Duration,
    /// Delay before alerts show or the confirmation page loads
    pub response_delay: Duration,
    pub choice: String,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            locale: Locale::En,
            render_delay: Duration::from_millis(20),
            response_delay: Duration::from_millis(30),
            choice: "Option 3".to_string(),
        }
    }
}

/// Poll settings small enough for tests
pub fn quick_waiter() -> Waiter {
    Waiter::new(Duration::from_millis(500), Duration::from_millis(5))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeElement {
    id: usize,
    generation: u64,
}

#[derive(Debug)]
struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<usize>,
    visible_at: Instant,
    enabled_at: Instant,
    value: String,
}

impl Node {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    generation: u64,
    navigate_at: Option<Instant>,
    quit: bool,
    typed: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct FakeForm {
    options: FormOptions,
    messages: ValidationMessages,
    state: Mutex<State>,
}

impl FakeForm {
    pub fn new(options: FormOptions) -> Self {
        Self {
            options,
            messages: ValidationMessages::default(),
            state: Mutex::new(State::default()),
        }
    }

    /// Values typed so far, as (question label, text)
    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn is_quit(&self) -> bool {
        self.state.lock().unwrap().quit
    }

    fn required_message(&self) -> &str {
        let idx = if self.options.locale == Locale::En { 0 } else { 1 };
        &self.messages.required[idx]
    }

    fn invalid_email_message(&self) -> &str {
        let idx = if self.options.locale == Locale::En { 0 } else { 1 };
        &self.messages.invalid_format[idx]
    }

    fn submit_label(&self) -> &str {
        match self.options.locale {
            Locale::En => "Submit",
            Locale::Et => "Saada ära",
        }
    }

    fn live(&self) -> E2eResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        if state.quit {
            return Err(E2eError::Driver("invalid session id".into()));
        }
        if let Some(at) = state.navigate_at {
            if Instant::now() >= at {
                state.navigate_at = None;
                render_confirmation(&mut state);
            }
        }
        Ok(state)
    }

    fn resolve(&self, state: &State, element: &FakeElement) -> E2eResult<usize> {
        if element.generation != state.generation || element.id >= state.nodes.len() {
            return Err(E2eError::StaleElement(format!("{:?}", element)));
        }
        Ok(element.id)
    }

    fn goto_sync(&self, _url: &str) -> E2eResult<()> {
        let mut state = self.live()?;
        state.navigate_at = None;
        reset(&mut state);
        let body = add(&mut state, Some(0), "body", &[], "");
        let group = add(&mut state, Some(body), "div", &[("role", "radiogroup")], "");
        for option in ["Option 1", "Option 2", "Option 3"] {
            let radio = add(&mut state, Some(group), "div", &[("role", "radio")], "");
            add(&mut state, Some(radio), "span", &[], option);
        }
        let label = self.submit_label().to_string();
        let button = add(&mut state, Some(body), "div", &[("role", "button")], "");
        let inner = add(&mut state, Some(button), "div", &[], "");
        add(&mut state, Some(inner), "span", &[("class", "label")], &label);
        Ok(())
    }

    fn find_sync(&self, scope: Option<&FakeElement>, query: &Query) -> E2eResult<FakeElement> {
        let state = self.live()?;
        let start = match scope {
            Some(element) => self.resolve(&state, element)?,
            None => 0,
        };
        descendants(&state, start)
            .into_iter()
            .find(|&id| matches(&state, id, query))
            .map(|id| FakeElement {
                id,
                generation: state.generation,
            })
            .ok_or_else(|| E2eError::NotFound(query.xpath(scope.is_some())))
    }

    fn interactable(&self, state: &State, id: usize) -> E2eResult<()> {
        let now = Instant::now();
        let node = &state.nodes[id];
        if now < node.visible_at || now < node.enabled_at {
            return Err(E2eError::Driver("element not interactable".into()));
        }
        Ok(())
    }

    fn click_sync(&self, element: &FakeElement) -> E2eResult<()> {
        let mut state = self.live()?;
        let id = self.resolve(&state, element)?;
        self.interactable(&state, id)?;

        let node = &state.nodes[id];
        if node.tag == "span" && node.text == self.options.choice {
            self.render_sections(&mut state);
        } else if node.attr("role") == Some("button") {
            self.handle_submit(&mut state);
        }
        Ok(())
    }

    fn render_sections(&self, state: &mut State) {
        let body = 1;
        if state.nodes.iter().any(|n| n.attr("data-params").is_some()) {
            return;
        }
        let enabled_at = Instant::now() + self.options.render_delay;
        for (idx, field) in Field::ORDER.into_iter().enumerate() {
            let params = format!(
                "%.@.[{},\"{}\",null,{},[[{},null,{}]]]",
                1000 + idx,
                field.label(),
                idx,
                2000 + idx,
                field.is_required()
            );
            let section = add(state, Some(body), "div", &[("data-params", params.as_str())], "");
            add(state, Some(section), "div", &[("role", "heading")], field.label());
            let (tag, kind) = match field {
                Field::Name | Field::Phone => ("input", Some("text")),
                Field::Email => ("input", Some("email")),
                Field::Address | Field::Comments => ("textarea", None),
            };
            let mut attrs = vec![("aria-label", field.label())];
            if let Some(kind) = kind {
                attrs.push(("type", kind));
            }
            let control = add(state, Some(section), tag, &attrs, "");
            state.nodes[control].enabled_at = enabled_at;
        }
        // Keep the submit button after the questions in document order.
        let button = state.nodes[body]
            .children
            .iter()
            .position(|&c| state.nodes[c].attr("role") == Some("button"));
        if let Some(pos) = button {
            let id = state.nodes[body].children.remove(pos);
            state.nodes[body].children.push(id);
        }
    }

    fn handle_submit(&self, state: &mut State) {
        let email = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
        let visible_at = Instant::now() + self.options.response_delay;
        let mut rejected = false;

        for field in Field::ORDER {
            let needle = format!("\"{}\"", field.label());
            let Some(section) = state
                .nodes
                .iter()
                .position(|n| n.attr("data-params").is_some_and(|p| p.contains(needle.as_str())))
            else {
                continue;
            };
            let value = control_value(state, section);
            let message = if field.is_required() && value.is_empty() {
                Some(self.required_message().to_string())
            } else if field == Field::Email && !email.is_match(&value) {
                Some(self.invalid_email_message().to_string())
            } else {
                None
            };
            if let Some(message) = message {
                rejected = true;
                let alert = add(state, Some(section), "div", &[("role", "alert")], "");
                let span = add(state, Some(alert), "span", &[], &message);
                state.nodes[alert].visible_at = visible_at;
                state.nodes[span].visible_at = visible_at;
            }
        }

        if !rejected {
            state.navigate_at = Some(visible_at);
        }
    }

    fn send_keys_sync(&self, element: &FakeElement, text: &str) -> E2eResult<()> {
        let mut state = self.live()?;
        let id = self.resolve(&state, element)?;
        self.interactable(&state, id)?;
        let node = &mut state.nodes[id];
        if node.tag != "input" && node.tag != "textarea" {
            return Err(E2eError::Driver("element not interactable".into()));
        }
        node.value.push_str(text);
        let label = node.attr("aria-label").unwrap_or_default().to_string();
        state.typed.push((label, text.to_string()));
        Ok(())
    }

    fn is_displayed_sync(&self, element: &FakeElement) -> E2eResult<bool> {
        let state = self.live()?;
        let id = self.resolve(&state, element)?;
        Ok(Instant::now() >= state.nodes[id].visible_at)
    }

    fn is_enabled_sync(&self, element: &FakeElement) -> E2eResult<bool> {
        let state = self.live()?;
        let id = self.resolve(&state, element)?;
        Ok(Instant::now() >= state.nodes[id].enabled_at)
    }

    fn text_sync(&self, element: &FakeElement) -> E2eResult<String> {
        let state = self.live()?;
        let id = self.resolve(&state, element)?;
        let mut text = state.nodes[id].text.clone();
        for child in descendants(&state, id) {
            text.push_str(&state.nodes[child].text);
        }
        Ok(text)
    }

    fn source_sync(&self) -> E2eResult<String> {
        let state = self.live()?;
        let mut out = String::new();
        serialize(&state, 0, &mut out);
        Ok(out)
    }
}

fn reset(state: &mut State) {
    state.generation += 1;
    state.nodes.clear();
    add(state, None, "html", &[], "");
}

fn render_confirmation(state: &mut State) {
    reset(state);
    let body = add(state, Some(0), "body", &[], "");
    add(state, Some(body), "div", &[("role", "heading")], "Contact information");
    add(state, Some(body), "div", &[], "Thanks for submitting your contact info!");
}

fn add(state: &mut State, parent: Option<usize>, tag: &str, attrs: &[(&str, &str)], text: &str) -> usize {
    let now = Instant::now();
    let id = state.nodes.len();
    state.nodes.push(Node {
        tag: tag.to_string(),
        attrs: attrs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect(),
        text: text.to_string(),
        children: Vec::new(),
        visible_at: now,
        enabled_at: now,
        value: String::new(),
    });
    if let Some(parent) = parent {
        state.nodes[parent].children.push(id);
    }
    id
}

/// Descendants of `id` in document order, excluding `id`
fn descendants(state: &State, id: usize) -> Vec<usize> {
    let mut out = Vec::new();
    for &child in &state.nodes[id].children {
        out.push(child);
        out.extend(descendants(state, child));
    }
    out
}

fn matches(state: &State, id: usize, query: &Query) -> bool {
    let node = &state.nodes[id];
    match query {
        Query::Text { tag, text } => node.tag == *tag && node.text == *text,
        Query::AttributeContains { attribute, needle } => node
            .attr(attribute)
            .is_some_and(|value| value.contains(needle.as_str())),
        Query::Tag { tag, attributes } => {
            node.tag == *tag
                && attributes
                    .iter()
                    .all(|(name, value)| node.attr(name) == Some(value.as_str()))
        }
        Query::RoleWithLabel { tag, role, labels } => {
            node.tag == *tag
                && node.attr("role") == Some(role.as_str())
                && descendants(state, id).into_iter().any(|d| {
                    labels
                        .iter()
                        .any(|label| state.nodes[d].text.contains(label.as_str()))
                })
        }
    }
}

fn control_value(state: &State, section: usize) -> String {
    descendants(state, section)
        .into_iter()
        .find(|&d| matches!(state.nodes[d].tag.as_str(), "input" | "textarea"))
        .map(|d| state.nodes[d].value.clone())
        .unwrap_or_default()
}

fn serialize(state: &State, id: usize, out: &mut String) {
    let node = &state.nodes[id];
    out.push('<');
    out.push_str(&node.tag);
    for (name, value) in &node.attrs {
        out.push_str(&format!(" {}=\"{}\"", name, value.replace('"', "&quot;")));
    }
    out.push('>');
    out.push_str(&node.text);
    for &child in &node.children {
        serialize(state, child, out);
    }
    out.push_str(&format!("</{}>", node.tag));
}

#[async_trait]
impl Driver for FakeForm {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.goto_sync(url)
    }

    async fn find(&self, scope: Option<&FakeElement>, query: &Query) -> E2eResult<FakeElement> {
        self.find_sync(scope, query)
    }

    async fn click(&self, element: &FakeElement) -> E2eResult<()> {
        self.click_sync(element)
    }

    async fn send_keys(&self, element: &FakeElement, text: &str) -> E2eResult<()> {
        self.send_keys_sync(element, text)
    }

    async fn is_displayed(&self, element: &FakeElement) -> E2eResult<bool> {
        self.is_displayed_sync(element)
    }

    async fn is_enabled(&self, element: &FakeElement) -> E2eResult<bool> {
        self.is_enabled_sync(element)
    }

    async fn text(&self, element: &FakeElement) -> E2eResult<String> {
        self.text_sync(element)
    }

    async fn page_source(&self) -> E2eResult<String> {
        self.source_sync()
    }

    async fn quit(&self) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.quit {
            return Err(E2eError::Driver("session already closed".into()));
        }
        state.quit = true;
        Ok(())
    }
}

/// Open a session on a fresh fake form
pub async fn open_session(options: FormOptions) -> Session<FakeForm> {
    let profile = FormProfile::default();
    Session::start(FakeForm::new(options), &profile.url, quick_waiter())
        .await
        .unwrap()
}

/// Counts sessions opened and closed by the runner
#[derive(Debug, Default)]
pub struct Counters {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
}

/// Launches fake sessions; optionally refuses to launch
pub struct FakeLauncher {
    pub options: FormOptions,
    pub counters: Arc<Counters>,
    pub fail_launch: bool,
}

impl FakeLauncher {
    pub fn new(options: FormOptions) -> Self {
        Self {
            options,
            counters: Arc::new(Counters::default()),
            fail_launch: false,
        }
    }
}

/// Fake page that reports its quit to shared counters
pub struct CountedForm {
    inner: FakeForm,
    counters: Arc<Counters>,
}

#[async_trait]
impl Driver for CountedForm {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.inner.goto_sync(url)
    }

    async fn find(&self, scope: Option<&FakeElement>, query: &Query) -> E2eResult<FakeElement> {
        self.inner.find_sync(scope, query)
    }

    async fn click(&self, element: &FakeElement) -> E2eResult<()> {
        self.inner.click_sync(element)
    }

    async fn send_keys(&self, element: &FakeElement, text: &str) -> E2eResult<()> {
        self.inner.send_keys_sync(element, text)
    }

    async fn is_displayed(&self, element: &FakeElement) -> E2eResult<bool> {
        self.inner.is_displayed_sync(element)
    }

    async fn is_enabled(&self, element: &FakeElement) -> E2eResult<bool> {
        self.inner.is_enabled_sync(element)
    }

    async fn text(&self, element: &FakeElement) -> E2eResult<String> {
        self.inner.text_sync(element)
    }

    async fn page_source(&self) -> E2eResult<String> {
        self.inner.source_sync()
    }

    async fn quit(&self) -> E2eResult<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.quit().await
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    type Driver = CountedForm;

    async fn launch(&self, url: &str) -> E2eResult<Session<CountedForm>> {
        if self.fail_launch {
            return Err(E2eError::Launch("chromedriver not found".into()));
        }
        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        let driver = CountedForm {
            inner: FakeForm::new(self.options.clone()),
            counters: self.counters.clone(),
        };
        Session::start(driver, url, quick_waiter()).await
    }
}
