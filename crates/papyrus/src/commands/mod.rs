pub mod build;
pub mod edit;
pub mod format;
pub mod lint;
