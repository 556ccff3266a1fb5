//! Page behaviors for server-rendered blog pages.
//!
//! Three independent behaviors are installed once per page load:
//!
//! - notices (`.alert`) fade out after five seconds and are hidden 300 ms later,
//! - danger controls (`.btn-danger`) ask for confirmation before their default action,
//! - forms check their `[required]` fields on submit and render inline error hints.
//!
//! The behaviors run against an owned [`Dom`] with a simulated clock and scripted
//! dialogs, so a page can be driven deterministically:
//!
//! ```
//! use page_behaviors::{Page, Result};
//!
//! fn main() -> Result<()> {
//!     let html = r#"
//!         <form id='post' action='/post/new/' method='post'>
//!           <input id='title' name='title' required>
//!           <button id='save' type='submit'>Save</button>
//!         </form>
//!     "#;
//!     let mut page = Page::from_html(html)?;
//!     page.click("#save")?;
//!     page.assert_count("#post .error-message", 1)?;
//!     assert_eq!(page.dialogs().alert_messages(), ["Please fill in all required fields."]);
//!
//!     page.type_text("#title", "Hello")?;
//!     page.click("#save")?;
//!     page.assert_count("#post .error-message", 0)?;
//!     assert_eq!(page.submissions().len(), 1);
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod behaviors;
pub mod config;
pub mod dialogs;
pub mod dom;
pub mod events;
pub mod html;
pub mod page;
pub mod scheduler;
pub mod selector;

pub use behaviors::{FieldValidity, ValidationReport};
pub use config::BehaviorConfig;
pub use dialogs::{Dialogs, ScriptedDialogs};
pub use dom::{Dom, NodeId};
pub use page::{FormSubmission, Navigation, Page};
pub use scheduler::{PendingTimer, Schedule, TimerId, TimerQueue, TimerTask};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),

    #[error("invalid node: {0}")]
    InvalidNode(String),

    #[error("timer error: {0}")]
    Timer(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },

    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}
