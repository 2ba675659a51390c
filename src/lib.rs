pub mod backup;
pub mod google_drive;
pub mod local;
pub mod settings;
pub mod types;

pub use backup::{run, Outcome};
pub use settings::Settings;
