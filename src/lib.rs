pub mod bridge;
pub mod bundle;
pub mod cli;
pub mod compress;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod raw;
pub mod report;
pub mod store;
pub mod util;
