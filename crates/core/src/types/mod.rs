//! Core types for Pixstore.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod deliverable;
pub mod email;
pub mod id;
pub mod phone;
pub mod price;
pub mod status;

pub use cart::{Cart, CartLine, CartTotals};
pub use deliverable::{DeliverableLine, OUT_OF_STOCK_PLACEHOLDER, format_deliverable, parse_deliverable};
pub use email::{Email, EmailError};
pub use id::*;
pub use phone::normalize_br_phone;
pub use price::{apply_discount, discount_percent, format_amount, format_brl, round_money};
pub use status::*;
