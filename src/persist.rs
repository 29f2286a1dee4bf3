//! Visitor/session state between process runs.
//!
//! A browser keeps this in `__utma`/`__utmb` cookies; a server-side tracker
//! has to store it itself, keyed however the caller identifies the user.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Session, Visitor};

pub trait PersistStore {
    /// The stored pair, or a fresh visitor and session if nothing is stored.
    fn load(&self) -> Result<(Visitor, Session)>;

    fn save(&self, visitor: &Visitor, session: &Session) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<(Visitor, Session)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistStore for MemoryStore {
    fn load(&self) -> Result<(Visitor, Session)> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .clone()
            .unwrap_or_else(|| (Visitor::new(), Session::new())))
    }

    fn save(&self, visitor: &Visitor, session: &Session) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = Some((visitor.clone(), session.clone()));
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Stored {
    visitor: Visitor,
    session: Session,
}

/// One JSON document per user: `{ "visitor": …, "session": … }`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistStore for JsonFileStore {
    fn load(&self) -> Result<(Visitor, Session)> {
        if !self.path.exists() {
            log::debug!("no state at {}, starting fresh", self.path.display());
            return Ok((Visitor::new(), Session::new()));
        }
        let json = fs::read_to_string(&self.path)?;
        let stored: Stored = serde_json::from_str(&json)?;
        Ok((stored.visitor, stored.session))
    }

    fn save(&self, visitor: &Visitor, session: &Session) -> Result<()> {
        let stored = Stored {
            visitor: visitor.clone(),
            session: session.clone(),
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        log::debug!("saved state to {}", self.path.display());
        Ok(())
    }
}
