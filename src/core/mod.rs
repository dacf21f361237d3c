//! Core session services: authentication, storage and configuration

pub mod auth;
pub mod config;
pub mod db;
pub mod metrics;
