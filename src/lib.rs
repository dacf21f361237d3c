//! Chirpy - session and credential services
//!
//! Password hashing, signed access tokens, revocable refresh tokens and the
//! HTTP endpoints that tie them together.

pub mod core;
