//! Store-wide settings.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Setting key for the checkout minimum.
pub const MINIMUM_ORDER_VALUE: &str = "minimum_order_value";
/// Setting key for the PIX discount percentage.
pub const PIX_DISCOUNT_PERCENT: &str = "pix_discount_percent";

/// Typed view over the `store_settings` key/value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub minimum_order_value: Decimal,
    pub pix_discount_percent: Decimal,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            minimum_order_value: Decimal::new(2000, 2),
            pix_discount_percent: Decimal::from(5),
        }
    }
}

impl StoreSettings {
    /// Build from stored `(key, value)` rows.
    ///
    /// Missing or unparsable values keep their defaults; unknown keys are
    /// ignored.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut settings = Self::default();
        for (key, value) in pairs {
            let Ok(parsed) = Decimal::from_str(value.trim()) else {
                tracing::warn!(key, value, "ignoring unparsable store setting");
                continue;
            };
            match key {
                MINIMUM_ORDER_VALUE => settings.minimum_order_value = parsed,
                PIX_DISCOUNT_PERCENT => settings.pix_discount_percent = parsed,
                _ => {}
            }
        }
        settings
    }

    /// Key/value rows to store.
    #[must_use]
    pub fn to_pairs(&self) -> [(&'static str, String); 2] {
        [
            (MINIMUM_ORDER_VALUE, self.minimum_order_value.to_string()),
            (PIX_DISCOUNT_PERCENT, self.pix_discount_percent.to_string()),
        ]
    }
}
