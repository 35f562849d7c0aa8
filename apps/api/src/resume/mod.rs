pub mod analyzer;
pub mod file_store;
pub mod handlers;
pub mod locks;
pub mod service;
