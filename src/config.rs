use serde::Deserialize;

use crate::{Error, Result};

/// Presentation constants for the page behaviors.
///
/// `Default` carries the values the blog templates were written against. The
/// struct deserializes with `#[serde(default)]`, so a partial JSON or TOML
/// document only overrides the keys it names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub notice_selector: String,
    pub danger_selector: String,
    pub form_selector: String,
    pub required_selector: String,
    pub notice_fade_delay_ms: i64,
    pub notice_hide_delay_ms: i64,
    pub confirm_message: String,
    pub required_alert_message: String,
    pub field_error_message: String,
    pub error_class: String,
    pub invalid_color: String,
    pub valid_color: String,
    pub error_font_size: String,
    pub error_margin_top: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            notice_selector: ".alert".into(),
            danger_selector: ".btn-danger".into(),
            form_selector: "form".into(),
            required_selector: "[required]".into(),
            notice_fade_delay_ms: 5000,
            notice_hide_delay_ms: 300,
            confirm_message: "Are you sure you want to delete this post?".into(),
            required_alert_message: "Please fill in all required fields.".into(),
            field_error_message: "This field is required".into(),
            error_class: "error-message".into(),
            invalid_color: "#dc3545".into(),
            valid_color: "#28a745".into(),
            error_font_size: "0.875rem".into(),
            error_margin_top: "5px".into(),
        }
    }
}

impl BehaviorConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, selector) in [
            ("notice_selector", &self.notice_selector),
            ("danger_selector", &self.danger_selector),
            ("form_selector", &self.form_selector),
            ("required_selector", &self.required_selector),
        ] {
            if selector.trim().is_empty() {
                return Err(Error::Config(format!("{name} must not be empty")));
            }
        }
        if self.error_class.trim().is_empty() || self.error_class.contains(char::is_whitespace) {
            return Err(Error::Config(format!(
                "error_class must be a single class name, got {:?}",
                self.error_class
            )));
        }
        if self.notice_fade_delay_ms < 0 || self.notice_hide_delay_ms < 0 {
            return Err(Error::Config("notice delays must be non-negative".into()));
        }
        Ok(())
    }

    /// Inline style applied to a freshly created error indicator.
    pub fn error_indicator_style(&self) -> String {
        format!(
            "color: {}; font-size: {}; margin-top: {};",
            self.invalid_color, self.error_font_size, self.error_margin_top
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_blog_templates() {
        let config = BehaviorConfig::default();
        assert_eq!(config.notice_fade_delay_ms, 5000);
        assert_eq!(config.notice_hide_delay_ms, 300);
        assert_eq!(
            config.error_indicator_style(),
            "color: #dc3545; font-size: 0.875rem; margin-top: 5px;"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_only_named_keys() {
        let config: BehaviorConfig = serde_json::from_str(
            r#"{ "notice_fade_delay_ms": 1000, "confirm_message": "Really?" }"#,
        )
        .expect("config should deserialize");
        assert_eq!(config.notice_fade_delay_ms, 1000);
        assert_eq!(config.confirm_message, "Really?");
        assert_eq!(config.notice_hide_delay_ms, 300);
        assert_eq!(config.danger_selector, ".btn-danger");
    }

    #[test]
    fn validate_rejects_empty_selector_and_bad_class() {
        let config = BehaviorConfig {
            form_selector: "  ".into(),
            ..BehaviorConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(Error::Config("form_selector must not be empty".into()))
        );

        let config = BehaviorConfig {
            error_class: "error message".into(),
            ..BehaviorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = BehaviorConfig {
            notice_hide_delay_ms: -1,
            ..BehaviorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
