// src/core/mod.rs

pub mod annotation;
pub mod cli_surface;
pub mod commons;
pub mod config_loader;
pub mod converters;
pub mod dispatcher;
pub mod groups;
pub mod inclusion;
pub mod invocation;
pub mod listing;
pub mod parameters;
pub mod registry;
pub mod scope;
