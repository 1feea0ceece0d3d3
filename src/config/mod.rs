/// Configuration subsystem - Engine options and their persistence
///
/// `Settings` holds the options the engine consults; `RcLoader` reads and writes
/// them as .vibinderrc files.

pub mod rc;
pub mod settings;

// Re-export public interface
pub use rc::{RC_FILE_NAME, RcLoader};
pub use settings::{FileFormat, SettingChange, Settings, WhichWrap};
