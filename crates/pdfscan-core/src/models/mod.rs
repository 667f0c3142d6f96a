//! Data models for recovered images and configuration.

pub mod config;
pub mod extracted;
