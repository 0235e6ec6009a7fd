//! Core of Linkdeck: turns `Name: URL` text lists into self-contained HTML
//! link pages, plus the configuration, persistence and job tracking the bot
//! front-end builds on.
pub mod catalog;
pub mod classify;
pub mod config;
pub mod conversion_queue;
pub mod convert;
pub mod db;
pub mod errors;
pub mod label;
pub mod models;
pub mod parser;
pub mod render;

pub use catalog::{Catalog, Layout};
pub use convert::{ConvertOptions, Conversion, Converter};
pub use errors::{LinkdeckError, LinkdeckResult};
