pub mod clipboard;
pub mod format;
pub mod paths;
