//! Tracking entities. Owned by the caller, read by the request builders.

pub mod campaign;
pub mod custom_variable;
pub mod event;
pub mod page;
pub mod session;
pub mod transaction;
pub mod visitor;

pub use campaign::Campaign;
pub use custom_variable::{CustomVariable, Scope};
pub use event::Event;
pub use page::Page;
pub use session::Session;
pub use transaction::{Item, Transaction};
pub use visitor::Visitor;
