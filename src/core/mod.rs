pub mod config;
pub mod grid;
pub mod viewport;
