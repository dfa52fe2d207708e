//! Pixstore Core - Shared domain types.
//!
//! This crate provides the types every Pixstore component agrees on:
//! - `storefront` - The JSON API server (storefront + admin back-office)
//! - `cli` - Command-line tools for migrations, seeding and admin grants
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Pricing, cart totals and order status rules live
//! here so every caller computes them the same way.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money math, statuses, cart, deliverables, phone and email

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
