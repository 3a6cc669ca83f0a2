pub mod cli;
pub mod entry;
pub mod gateway;
pub mod logging;
pub mod profiling;
pub mod version;
