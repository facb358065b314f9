//! Game state as the display layer sees it: poll the link, resolve ids to
//! names, diff against the last state and notify subscribers per field.

mod orchestrator;
mod resolve;
mod source;
mod state;
mod subscribers;

pub use orchestrator::StateOrchestrator;
pub use resolve::resolve;
pub use source::SnapshotSource;
pub use state::{Field, FieldValue, Named, ResolvedState, UnknownField, diff};
pub use subscribers::{Notification, Topic, Unsubscribe};
