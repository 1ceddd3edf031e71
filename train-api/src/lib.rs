//! # trAIn API Server Library
//!
//! HTTP surface of the trAIn task marketplace: trainers submit work, clients
//! review it, admins run monetization.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
