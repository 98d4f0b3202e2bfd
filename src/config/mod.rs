// src/config/mod.rs
pub mod bot;

pub use bot::{load_default, load_from, BotConfig};
