//! CLI commands

pub mod blocks;
pub mod init;
pub mod login;
pub mod plugins;
pub mod render;
pub mod serve;
pub mod upload;
