pub mod domain;
pub mod infra;
pub mod library;

pub use domain::*;
pub use infra::ProgressCallback;
pub use library::LaunchLibrary;
