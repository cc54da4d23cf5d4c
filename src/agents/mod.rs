pub mod lockfile_locator;
pub mod package_manager;
pub mod updater;

pub use lockfile_locator::LockfileLocator;
pub use package_manager::{CommandRunner, SystemRunner};
pub use updater::{ApplyOutcome, DbUpdater, LockStatus};
