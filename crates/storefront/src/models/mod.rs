//! Domain models for the store.
//!
//! Row types double as API response bodies, so they derive both
//! `sqlx::FromRow` and `Serialize`.

pub mod catalog;
pub mod order;
pub mod session;
pub mod settings;
pub mod support;
pub mod user;

pub use catalog::{Category, Product, StockItem};
pub use order::{AdminOrder, Order, OrderItem, OrderWithItems};
pub use session::{CurrentUser, keys as session_keys};
pub use settings::StoreSettings;
pub use support::{Message, Ticket, TicketSummary};
pub use user::{AdminUserSummary, Profile, User};
