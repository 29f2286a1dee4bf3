use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::random32;

/// One visit. Persist it alongside the `Visitor` for as long as the visit
/// lasts (the browser equivalent is the `__utmb` cookie).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Sent as `utmhid`.
    pub session_id: u32,
    /// Beacons sent so far in this session.
    pub track_count: u32,
    pub start_time: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            session_id: random32(),
            track_count: 0,
            start_time: Utc::now(),
        }
    }

    pub fn with_session_id(mut self, session_id: u32) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Count one more beacon; returns the new count.
    pub fn increase_track_count(&mut self) -> u32 {
        self.track_count = self.track_count.saturating_add(1);
        self.track_count
    }
}
