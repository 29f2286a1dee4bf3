use crate::error::{Error, Result};

/// An `_trackEvent()` call: category and action are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub category: Option<String>,
    pub action: Option<String>,
    pub label: Option<String>,
    pub value: Option<i64>,
    /// Sent as `utmni=1`; the event does not affect bounce rate.
    pub non_interaction: bool,
}

impl Event {
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            action: Some(action.into()),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn non_interactive(mut self) -> Self {
        self.non_interaction = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.category.is_none() || self.action.is_none() {
            return Err(Error::validation(
                "Events need at least to have a category and action defined.",
            ));
        }
        Ok(())
    }
}
