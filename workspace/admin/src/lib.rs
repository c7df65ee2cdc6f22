//! Administrative console binding for HousePark user records.
//!
//! The console is described by a [`UserAdmin`] configuration value and
//! operates on rows exclusively through SeaORM queries.

pub mod actions;
pub mod changelist;
pub mod error;
pub mod forms;
pub mod i18n;
pub mod options;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::{ActionInfo, ActionOutcome, ActionRegistry, BulkAction};
pub use error::AdminError;
pub use options::UserAdmin;
