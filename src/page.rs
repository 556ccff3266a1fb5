use tracing::debug;

use crate::behaviors::{self, InstallSummary};
use crate::config::BehaviorConfig;
use crate::dialogs::{Dialogs, ScriptedDialogs};
use crate::dom::{Dom, NodeId};
use crate::events::{self, EventState, EventType, ListenerStore};
use crate::html::parse_html;
use crate::scheduler::{PendingTimer, Schedule, TimerQueue};
use crate::{Error, Result};

/// A link activation that was allowed to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub href: String,
}

/// A form submission that was allowed to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub form: NodeId,
    pub action: String,
    pub method: String,
    /// Successful controls as `(name, value)` pairs in document order.
    pub fields: Vec<(String, String)>,
}

impl FormSubmission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// One loaded page with the behaviors installed.
///
/// User actions (`click`, `submit`, `type_text`) dispatch events through the
/// installed listeners and then run the browser's default action unless a
/// listener cancelled it. Timers only run when the clock is advanced.
#[derive(Debug)]
pub struct Page<D: Dialogs = ScriptedDialogs> {
    dom: Dom,
    listeners: ListenerStore,
    timers: TimerQueue,
    dialogs: D,
    config: BehaviorConfig,
    summary: InstallSummary,
    navigations: Vec<Navigation>,
    submissions: Vec<FormSubmission>,
}

impl Page<ScriptedDialogs> {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_config(html, BehaviorConfig::default())
    }

    pub fn from_html_with_config(html: &str, config: BehaviorConfig) -> Result<Self> {
        Page::with_dialogs(parse_html(html)?, ScriptedDialogs::new(), config)
    }

    pub fn from_dom(dom: Dom) -> Result<Self> {
        Page::with_dialogs(dom, ScriptedDialogs::new(), BehaviorConfig::default())
    }
}

impl<D: Dialogs> Page<D> {
    /// Takes ownership of `dom` and installs the behaviors, which is the
    /// equivalent of the document becoming ready.
    pub fn with_dialogs(dom: Dom, dialogs: D, config: BehaviorConfig) -> Result<Self> {
        let mut listeners = ListenerStore::default();
        let mut timers = TimerQueue::new();
        let summary = behaviors::install(&dom, &mut listeners, &mut timers, &config)?;
        Ok(Self {
            dom,
            listeners,
            timers,
            dialogs,
            config,
            summary,
            navigations: Vec::new(),
            submissions: Vec::new(),
        })
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    pub fn install_summary(&self) -> InstallSummary {
        self.summary
    }

    pub fn dialogs(&self) -> &D {
        &self.dialogs
    }

    pub fn dialogs_mut(&mut self) -> &mut D {
        &mut self.dialogs
    }

    pub fn navigations(&self) -> &[Navigation] {
        &self.navigations
    }

    pub fn submissions(&self) -> &[FormSubmission] {
        &self.submissions
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.is_disabled(target) {
            return Ok(());
        }

        let outcome = self.dispatch_event(target, EventType::Click)?;
        if outcome.default_prevented {
            return Ok(());
        }

        let Some(activated) = self.activation_target(target) else {
            return Ok(());
        };
        if self.dom.tag_name(activated) == Some("a") {
            let href = self.dom.attr(activated, "href").unwrap_or_default();
            debug!(%href, "navigation");
            self.navigations.push(Navigation { href });
        } else if let Some(form) = self.form_owner(activated) {
            self.submit_form(form)?;
        }
        Ok(())
    }

    /// Submits the form at `selector`, or the form owning the matched control.
    /// Submit listeners run first, as with `requestSubmit()`.
    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if let Some(form) = self.form_owner(target) {
            self.submit_form(form)?;
        }
        Ok(())
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let tag = self.dom.tag_name(target).unwrap_or_default().to_string();
        if !matches!(tag.as_str(), "input" | "textarea" | "select") {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input, textarea or select".into(),
                actual: tag,
            });
        }
        if self.dom.is_disabled(target) || self.dom.has_attr(target, "readonly") {
            return Ok(());
        }
        self.dom.set_value(target, text)
    }

    pub fn now_ms(&self) -> i64 {
        self.timers.now_ms()
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.timers.pending()
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        self.timers.set_step_limit(max_steps)
    }

    /// Drops every pending timer, as leaving the page would.
    pub fn clear_all_timers(&mut self) -> usize {
        self.timers.clear_all()
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        let now = self.timers.deadline_after(delta_ms)?;
        let ran = self.run_timers(Some(now))?;
        debug!(delta_ms, now_ms = now, ran, "advance time");
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let now = self.timers.check_deadline(target_ms)?;
        let ran = self.run_timers(Some(now))?;
        debug!(now_ms = now, ran, "advance time to");
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let now = self.timers.now_ms();
        self.run_timers(Some(now))
    }

    /// Runs the earliest pending timer, moving the clock to its deadline.
    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Some(timer) = self.timers.take_next(None) else {
            return Ok(false);
        };
        behaviors::run_timer_task(&mut self.dom, &mut self.timers, &self.config, timer.task)?;
        Ok(true)
    }

    /// Runs timers until none are left, moving the clock as needed.
    pub fn flush(&mut self) -> Result<()> {
        let ran = self.run_timers(None)?;
        debug!(now_ms = self.timers.now_ms(), ran, "flush");
        Ok(())
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub fn style(&self, selector: &str, property: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.style(target, property))
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.select_one(selector).map(|_| ())
    }

    pub fn assert_count(&self, selector: &str, expected: usize) -> Result<()> {
        let actual = self.dom.query_selector_all(selector)?.len();
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                dom_snippet: self.node_snippet(self.dom.root()),
            });
        }
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        self.check(selector, target, expected, actual)
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        self.check(selector, target, expected, actual)
    }

    /// Compares an inline style property; a missing property reads as `""`.
    pub fn assert_style(&self, selector: &str, property: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.style(target, property).unwrap_or_default();
        self.check(selector, target, expected, actual)
    }

    fn check(&self, selector: &str, target: NodeId, expected: &str, actual: String) -> Result<()> {
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }

    fn dispatch_event(&mut self, target: NodeId, event_type: EventType) -> Result<EventState> {
        let path = events::propagation_path(&self.dom, target);
        let Self {
            dom,
            listeners,
            dialogs,
            config,
            ..
        } = self;
        listeners.dispatch(&path, EventState::new(event_type, target), |event, listener| {
            behaviors::handle_event(listener, event, dom, dialogs, config)
        })
    }

    /// Runs timers due by `until`, or every timer when `until` is `None`.
    fn run_timers(&mut self, until: Option<i64>) -> Result<usize> {
        let Self {
            dom,
            timers,
            config,
            ..
        } = self;
        let exec = |timers: &mut TimerQueue, timer: PendingTimer| {
            behaviors::run_timer_task(dom, timers, config, timer.task)
        };
        match until {
            Some(target_ms) => timers.run_until(target_ms, exec),
            None => timers.run_queue(None, exec),
        }
    }

    /// Nearest inclusive ancestor with activation behavior: a link with
    /// `href` or a submit button.
    fn activation_target(&self, target: NodeId) -> Option<NodeId> {
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            if self.is_link(node) || self.is_submit_control(node) {
                return Some(node);
            }
            cursor = self.dom.parent(node);
        }
        None
    }

    fn is_link(&self, node: NodeId) -> bool {
        self.dom.tag_name(node) == Some("a") && self.dom.has_attr(node, "href")
    }

    fn is_submit_control(&self, node: NodeId) -> bool {
        let kind = self
            .dom
            .attr(node, "type")
            .map(|kind| kind.to_ascii_lowercase());
        match self.dom.tag_name(node) {
            Some("button") => matches!(kind.as_deref(), None | Some("") | Some("submit")),
            Some("input") => matches!(kind.as_deref(), Some("submit") | Some("image")),
            _ => false,
        }
    }

    fn form_owner(&self, node: NodeId) -> Option<NodeId> {
        if self.dom.tag_name(node) == Some("form") {
            return Some(node);
        }
        if let Some(form_id) = self.dom.attr(node, "form") {
            return self
                .dom
                .by_id(&form_id)
                .filter(|form| self.dom.tag_name(*form) == Some("form"));
        }
        self.dom.find_ancestor_by_tag(node, "form")
    }

    fn submit_form(&mut self, form: NodeId) -> Result<()> {
        let outcome = self.dispatch_event(form, EventType::Submit)?;
        if outcome.default_prevented {
            debug!(form = form.0, "submission cancelled");
            return Ok(());
        }
        let submission = FormSubmission {
            form,
            action: self.dom.attr(form, "action").unwrap_or_default(),
            method: self
                .dom
                .attr(form, "method")
                .map(|method| method.to_ascii_lowercase())
                .unwrap_or_else(|| "get".into()),
            fields: self.form_data(form)?,
        };
        debug!(form = form.0, action = %submission.action, "form submitted");
        self.submissions.push(submission);
        Ok(())
    }

    fn form_data(&self, form: NodeId) -> Result<Vec<(String, String)>> {
        let mut fields = Vec::new();
        for control in self
            .dom
            .query_selector_all_from(form, "input[name], textarea[name], select[name]")?
        {
            if self.dom.is_disabled(control) {
                continue;
            }
            let kind = self
                .dom
                .attr(control, "type")
                .unwrap_or_default()
                .to_ascii_lowercase();
            match kind.as_str() {
                "submit" | "button" | "reset" | "image" | "file" => continue,
                "checkbox" | "radio" if !self.dom.has_attr(control, "checked") => continue,
                _ => {}
            }
            let name = self.dom.attr(control, "name").unwrap_or_default();
            let value = match kind.as_str() {
                "checkbox" | "radio" => self
                    .dom
                    .attr(control, "value")
                    .unwrap_or_else(|| "on".into()),
                _ => self.dom.value(control)?,
            };
            fields.push((name, value));
        }
        Ok(fields)
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out: String = it.by_ref().take(max_chars).collect();
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}
