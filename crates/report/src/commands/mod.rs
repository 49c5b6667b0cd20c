pub mod automation;
pub mod cleaning;
pub mod export;
pub mod verify;

pub use automation::{AutomationStatus, test_command};
pub use cleaning::cleaning_command;
pub use export::{ExportReport, export_command};
pub use verify::verify_command;
