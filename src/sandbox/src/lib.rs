pub mod cli;
pub mod config;
pub mod context;
pub mod kernel;
pub mod syscalls;
