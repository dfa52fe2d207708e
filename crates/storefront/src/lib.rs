//! Pixstore storefront library.
//!
//! The JSON API for the PIX digital-goods store: catalog, session cart,
//! checkout with PIX charges, credential delivery, support chat, realtime
//! events and the `/api/admin` back-office. Built as a library so the
//! integration tests and the CLI can reuse it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
