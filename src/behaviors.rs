//! The three page behaviors: notice dismissal, destructive-action
//! confirmation and required-field validation.
//!
//! [`install`] runs once per page load against the document as it is at that
//! moment. Elements added later are not picked up. Each behavior only touches
//! its own elements, so the three never interact.

use tracing::{debug, trace};

use crate::Result;
use crate::config::BehaviorConfig;
use crate::dialogs::Dialogs;
use crate::dom::{Dom, NodeId};
use crate::events::{EventState, EventType, Listener, ListenerStore};
use crate::scheduler::{Schedule, TimerTask};

/// What [`install`] attached to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallSummary {
    pub notices: usize,
    pub destructive_controls: usize,
    pub forms: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValidity {
    Valid,
    Invalid,
}

impl FieldValidity {
    /// A value is valid when it has content besides whitespace.
    pub fn of(value: &str) -> Self {
        if value.trim().is_empty() {
            Self::Invalid
        } else {
            Self::Valid
        }
    }
}

/// Outcome of checking one form's required fields, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub form: NodeId,
    pub fields: Vec<(NodeId, FieldValidity)>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.fields
            .iter()
            .all(|(_, validity)| *validity == FieldValidity::Valid)
    }

    pub fn invalid_fields(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.fields
            .iter()
            .filter(|(_, validity)| *validity == FieldValidity::Invalid)
            .map(|(field, _)| *field)
    }
}

/// Wires all three behaviors into `dom`.
pub fn install<S: Schedule>(
    dom: &Dom,
    listeners: &mut ListenerStore,
    timers: &mut S,
    config: &BehaviorConfig,
) -> Result<InstallSummary> {
    config.validate()?;
    let summary = InstallSummary {
        notices: schedule_notice_dismissal(dom, timers, config)?,
        destructive_controls: guard_destructive_controls(dom, listeners, config)?,
        forms: guard_required_fields(dom, listeners, config)?,
    };
    debug!(
        notices = summary.notices,
        destructive_controls = summary.destructive_controls,
        forms = summary.forms,
        "page behaviors installed"
    );
    Ok(summary)
}

fn schedule_notice_dismissal<S: Schedule>(
    dom: &Dom,
    timers: &mut S,
    config: &BehaviorConfig,
) -> Result<usize> {
    let notices = dom.query_selector_all(&config.notice_selector)?;
    for notice in &notices {
        timers.set_timeout(config.notice_fade_delay_ms, TimerTask::FadeNotice(*notice));
    }
    Ok(notices.len())
}

fn guard_destructive_controls(
    dom: &Dom,
    listeners: &mut ListenerStore,
    config: &BehaviorConfig,
) -> Result<usize> {
    let controls = dom.query_selector_all(&config.danger_selector)?;
    for control in &controls {
        listeners.add(*control, EventType::Click, Listener::ConfirmDestructive, false);
    }
    Ok(controls.len())
}

fn guard_required_fields(
    dom: &Dom,
    listeners: &mut ListenerStore,
    config: &BehaviorConfig,
) -> Result<usize> {
    let forms = dom.query_selector_all(&config.form_selector)?;
    for form in &forms {
        listeners.add(*form, EventType::Submit, Listener::ValidateRequired, false);
    }
    Ok(forms.len())
}

/// Runs one listener for `event`.
pub fn handle_event<D: Dialogs + ?Sized>(
    listener: Listener,
    event: &mut EventState,
    dom: &mut Dom,
    dialogs: &mut D,
    config: &BehaviorConfig,
) -> Result<()> {
    match listener {
        Listener::ConfirmDestructive => {
            if !dialogs.confirm(&config.confirm_message) {
                debug!(control = event.current_target.0, "destructive action declined");
                event.prevent_default();
            }
        }
        Listener::ValidateRequired => {
            let report = validate_form(dom, event.current_target, config)?;
            if !report.is_valid() {
                event.prevent_default();
                dialogs.alert(&config.required_alert_message);
            }
        }
    }
    Ok(())
}

/// Runs a scheduled notice step.
pub fn run_timer_task<S: Schedule + ?Sized>(
    dom: &mut Dom,
    timers: &mut S,
    config: &BehaviorConfig,
    task: TimerTask,
) -> Result<()> {
    match task {
        TimerTask::FadeNotice(notice) => {
            dom.set_style(notice, "opacity", "0")?;
            timers.set_timeout(config.notice_hide_delay_ms, TimerTask::HideNotice(notice));
        }
        TimerTask::HideNotice(notice) => {
            dom.set_style(notice, "display", "none")?;
        }
    }
    Ok(())
}

/// Checks every required field of `form` and updates borders and error
/// indicators. The DOM keeps at most one indicator directly after a field.
pub fn validate_form(
    dom: &mut Dom,
    form: NodeId,
    config: &BehaviorConfig,
) -> Result<ValidationReport> {
    let fields = dom.query_selector_all_from(form, &config.required_selector)?;
    let mut report = ValidationReport {
        form,
        fields: Vec::with_capacity(fields.len()),
    };

    for field in fields {
        let validity = FieldValidity::of(&dom.value(field)?);
        trace!(field = field.0, ?validity, "required field checked");
        match validity {
            FieldValidity::Valid => mark_valid(dom, field, config)?,
            FieldValidity::Invalid => mark_invalid(dom, field, config)?,
        }
        report.fields.push((field, validity));
    }

    debug!(
        form = form.0,
        fields = report.fields.len(),
        valid = report.is_valid(),
        "form validated"
    );
    Ok(report)
}

fn error_indicator_after(dom: &Dom, field: NodeId, config: &BehaviorConfig) -> Option<NodeId> {
    dom.next_element_sibling(field)
        .filter(|sibling| dom.class_contains(*sibling, &config.error_class))
}

fn mark_valid(dom: &mut Dom, field: NodeId, config: &BehaviorConfig) -> Result<()> {
    dom.set_style(field, "border-color", &config.valid_color)?;
    if let Some(indicator) = error_indicator_after(dom, field, config) {
        dom.remove_node(indicator)?;
        dom.release(indicator)?;
    }
    Ok(())
}

fn mark_invalid(dom: &mut Dom, field: NodeId, config: &BehaviorConfig) -> Result<()> {
    dom.set_style(field, "border-color", &config.invalid_color)?;
    if error_indicator_after(dom, field, config).is_some() {
        return Ok(());
    }
    let indicator = dom.create_detached_element("div");
    dom.set_attr(indicator, "class", &config.error_class)?;
    dom.set_attr(indicator, "style", &config.error_indicator_style())?;
    dom.set_text_content(indicator, &config.field_error_message)?;
    dom.insert_after(field, indicator)
}
