pub mod app;
pub mod config;
pub mod keybinds;
pub mod logging;

pub use config::Config;
