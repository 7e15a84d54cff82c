pub mod commands;
pub mod config;
pub mod prompt;
pub mod replay;
