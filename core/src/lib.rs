pub mod action;
pub mod cmdline;
pub mod config;
pub mod judge;
pub mod serdable;
pub mod style;

pub use crate::config::Config;
