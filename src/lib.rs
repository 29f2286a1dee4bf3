//! Server-side Google Analytics (ga.js / `__utm.gif`) tracking.
//!
//! ```text
//! Page / Event / Transaction / CustomVariable
//!     → request builder (validate, session hit, visitor, X10, cookies)
//!     → Request (HTTP/1.0 GET bytes)
//!     → Transport (socket now, or queued until shutdown)
//! ```
//!
//! ```no_run
//! use utm_beacon::{Config, Tracker};
//! use utm_beacon::model::{Page, Session, Visitor};
//!
//! let tracker = Tracker::new("UA-1234567-8", "example.com", Config::default())?;
//! let mut visitor = Visitor::new().with_user_agent("Mozilla/5.0").with_locale("en-US");
//! let mut session = Session::new();
//! tracker.track_pageview(&Page::new("/").with_title("Home"), &mut session, &mut visitor)?;
//! # Ok::<(), utm_beacon::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod net;
pub mod persist;
pub mod request;
pub mod tracker;
pub mod util;
pub mod x10;

pub use config::Config;
pub use error::{Error, Result};
pub use request::{Beacon, BeaconKind, Request};
pub use tracker::Tracker;
