#![forbid(unsafe_code)]

//! Shared library for the tubeframe player server.

pub mod config;
pub mod metadata;
pub mod player;
pub mod render;
pub mod security;
pub mod validate;
