pub mod collection;
pub mod config;
pub mod core;
pub mod entry;
pub mod library;
pub mod loader;
pub mod model;
pub mod sequential;
pub mod shuffle;
