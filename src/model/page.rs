use crate::error::{Error, Result};

/// A tracked page, mapped onto `utmp`/`utmdt`/`utmcs`/`utmr`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Path and query, e.g. `/docs/?q=1`. Must start with `/`.
    pub path: Option<String>,
    pub title: Option<String>,
    /// e.g. `UTF-8`.
    pub charset: Option<String>,
    /// Full referring URL, or `0` for internal navigation.
    pub referrer: Option<String>,
}

impl Page {
    /// Referrer value ga.js sends for navigation within the same site.
    pub const REFERRER_INTERNAL: &'static str = "0";

    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.path.as_deref() {
            None | Some("") => Err(Error::validation("Pages need to have a path defined.")),
            Some(path) if !path.starts_with('/') => Err(Error::validation(format!(
                "The page path should always start with a slash (\"/\"), got {:?}",
                path
            ))),
            Some(_) => Ok(()),
        }
    }
}
