//! Business logic services for the store.
//!
//! # Services
//!
//! - `auth` - Email and password accounts
//! - `pix` - PIX provider client with retry/backoff
//! - `checkout` - Cart to order, payment status
//! - `fulfillment` - Payment confirmation and credential delivery
//! - `events` - Realtime event bus behind the SSE endpoints
//! - `dashboard` - Back-office metrics
//! - `payment_watcher` - Background reconciliation of pending orders

pub mod auth;
pub mod checkout;
pub mod dashboard;
pub mod events;
pub mod fulfillment;
pub mod payment_watcher;
pub mod pix;
