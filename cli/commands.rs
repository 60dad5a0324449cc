pub mod cache;
pub mod completion;
pub mod config;
pub mod flatten;
pub mod render;
pub mod scan;
pub mod stats;
