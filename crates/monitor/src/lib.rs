//! HTTP surface and configuration for the performance monitor binary

pub mod api;
pub mod config;
