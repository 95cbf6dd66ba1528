//! Recognising "resource not found" failures.
//!
//! The management API reports a read of a missing resource as an ordinary
//! failure. The only way to tell it apart from a real error is the text of the
//! failure description, which differs between server generations. The
//! templates are matched by prefix and suffix, since the resource address sits
//! in between.

use serde::{Deserialize, Serialize};

/// One failure-description template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    /// Start of the description, including the message code.
    pub prefix: String,
    /// End of the description.
    pub suffix: String,
}

impl MessageTemplate {
    /// Creates a template.
    #[must_use]
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Returns true if the description fits this template.
    #[must_use]
    pub fn matches(&self, description: &str) -> bool {
        description.len() >= self.prefix.len() + self.suffix.len()
            && description.starts_with(&self.prefix)
            && description.ends_with(&self.suffix)
    }
}

/// Table of not-found templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundMatcher {
    templates: Vec<MessageTemplate>,
}

impl Default for NotFoundMatcher {
    fn default() -> Self {
        Self {
            templates: vec![
                // JBoss AS 7 / EAP 6
                MessageTemplate::new("JBAS014807: Management resource", " not found"),
                // WildFly
                MessageTemplate::new("WFLYCTL0216: Management resource", " not found"),
            ],
        }
    }
}

impl NotFoundMatcher {
    /// Creates a matcher with the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template.
    #[must_use]
    pub fn with_template(mut self, template: MessageTemplate) -> Self {
        if !self.templates.contains(&template) {
            self.templates.push(template);
        }
        self
    }

    /// The templates in match order.
    #[must_use]
    pub fn templates(&self) -> &[MessageTemplate] {
        &self.templates
    }

    /// Returns true if the failure description means "does not exist".
    #[must_use]
    pub fn is_not_found(&self, description: &str) -> bool {
        let description = description.trim().trim_matches('"');
        self.templates.iter().any(|t| t.matches(description))
    }
}
