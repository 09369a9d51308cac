pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod render;
pub mod unseal;
