pub mod diff;
pub mod snapshot;

pub use diff::{Change, DiffEntry, diff};
pub use snapshot::BrowserSnapshot;
