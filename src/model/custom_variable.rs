use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifetime of a custom variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    Visitor,
    Session,
    #[default]
    Page,
}

impl Scope {
    /// Numeric code on the wire.
    pub fn code(self) -> u8 {
        match self {
            Scope::Visitor => 1,
            Scope::Session => 2,
            Scope::Page => 3,
        }
    }
}

/// An `_setCustomVar()` slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomVariable {
    /// 1-based slot. Two variables with the same index overwrite each other.
    pub index: Option<u32>,
    pub name: Option<String>,
    pub value: Option<String>,
    pub scope: Scope,
}

impl CustomVariable {
    pub fn new(index: u32, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            name: Some(name.into()),
            value: Some(value.into()),
            scope: Scope::Page,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match (self.index, &self.name, &self.value) {
            (Some(0), _, _) => Err(Error::validation("Custom Variable index starts at 1.")),
            (Some(_), Some(_), Some(_)) => Ok(()),
            _ => Err(Error::validation(
                "Custom Variables need to have an index, name and value defined.",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_codes() {
        assert_eq!(Scope::default(), Scope::Page);
        assert_eq!(Scope::Visitor.code(), 1);
        assert_eq!(Scope::Session.code(), 2);
        assert_eq!(Scope::Page.code(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(CustomVariable::new(1, "Member", "yes").validate().is_ok());
        assert!(CustomVariable::new(0, "Member", "yes").validate().is_err());

        let nameless = CustomVariable {
            index: Some(2),
            value: Some("x".into()),
            ..Default::default()
        };
        assert!(nameless.validate().is_err());
    }
}
