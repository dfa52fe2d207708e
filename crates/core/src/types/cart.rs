//! Shopping cart and its totals.
//!
//! The cart holds a snapshot of name, image and price taken when the item
//! was added. Checkout re-prices every line against the catalog before an
//! order is created, so a stale snapshot only affects what the cart shows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{apply_discount, round_money};

/// Upper bound on the quantity of a single line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A customer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

/// Derived cart amounts shown at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub item_count: u32,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub pix_total: Decimal,
    pub minimum_order_value: Decimal,
    pub meets_minimum: bool,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a line, merging with an existing line for the same product.
    ///
    /// The merged line takes the newer snapshot and the summed quantity.
    pub fn add(&mut self, line: CartLine) {
        if line.quantity == 0 {
            return;
        }
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity = (existing.quantity + line.quantity).min(MAX_LINE_QUANTITY);
            existing.name = line.name;
            existing.image = line.image;
            existing.price = line.price;
        } else {
            self.lines.push(CartLine {
                quantity: line.quantity.min(MAX_LINE_QUANTITY),
                ..line
            });
        }
    }

    /// Set the quantity of a product. Zero or less removes the line.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> bool {
        let Some(pos) = self.lines.iter().position(|l| l.product_id == product_id) else {
            return false;
        };
        if quantity <= 0 {
            self.lines.remove(pos);
        } else if let Some(line) = self.lines.get_mut(pos) {
            line.quantity = u32::try_from(quantity)
                .unwrap_or(MAX_LINE_QUANTITY)
                .min(MAX_LINE_QUANTITY);
        }
        true
    }

    /// Remove a product. Returns `false` if it was not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        round_money(self.lines.iter().map(CartLine::line_total).sum())
    }

    /// Compute totals for a minimum order value and PIX discount percent.
    #[must_use]
    pub fn totals(&self, minimum_order_value: Decimal, pix_discount_percent: Decimal) -> CartTotals {
        let subtotal = self.subtotal();
        let pix_total = apply_discount(subtotal, pix_discount_percent);
        CartTotals {
            item_count: self.item_count(),
            subtotal,
            discount: subtotal - pix_total,
            pix_total,
            minimum_order_value,
            meets_minimum: !self.is_empty() && subtotal >= minimum_order_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, price_cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            image: format!("https://img.example/{id}.png"),
            price: Decimal::new(price_cents, 2),
            quantity,
        }
    }

    #[test]
    fn test_example_cart_totals() {
        let mut cart = Cart::new();
        cart.add(line(1, 2990, 2));

        let totals = cart.totals(Decimal::from(20), Decimal::from(5));
        assert_eq!(totals.subtotal, Decimal::new(5980, 2));
        assert_eq!(totals.pix_total, Decimal::new(5681, 2));
        assert_eq!(totals.discount, Decimal::new(299, 2));
        assert_eq!(totals.item_count, 2);
        assert!(totals.meets_minimum);
    }

    #[test]
    fn test_subtotal_is_sum_of_lines() {
        let mut cart = Cart::new();
        cart.add(line(1, 1999, 3));
        cart.add(line(2, 550, 1));
        cart.add(line(3, 10_000, 2));

        let expected: Decimal = cart.lines.iter().map(CartLine::line_total).sum();
        assert_eq!(cart.subtotal(), expected);
        assert_eq!(cart.subtotal(), Decimal::new(26_547, 2));
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new();
        cart.add(line(1, 1000, 1));
        cart.add(line(1, 1200, 2));

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 3);
        assert_eq!(cart.lines[0].price, Decimal::new(1200, 2));
    }

    #[test]
    fn test_add_caps_quantity() {
        let mut cart = Cart::new();
        cart.add(line(1, 100, 90));
        cart.add(line(1, 100, 50));
        assert_eq!(cart.lines[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_add_ignores_zero_quantity() {
        let mut cart = Cart::new();
        cart.add(line(1, 100, 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(line(1, 100, 2));
        assert!(cart.set_quantity(ProductId::new(1), 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_negative_removes() {
        let mut cart = Cart::new();
        cart.add(line(1, 100, 2));
        assert!(cart.set_quantity(ProductId::new(1), -1));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_unknown_product() {
        let mut cart = Cart::new();
        assert!(!cart.set_quantity(ProductId::new(9), 1));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(line(1, 100, 1));
        cart.add(line(2, 100, 1));
        assert!(cart.remove(ProductId::new(1)));
        assert!(!cart.remove(ProductId::new(1)));
        assert_eq!(cart.lines.len(), 1);
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_minimum_order_gate() {
        let mut cart = Cart::new();
        cart.add(line(1, 1990, 1));

        let totals = cart.totals(Decimal::from(20), Decimal::from(5));
        assert!(!totals.meets_minimum);

        cart.set_quantity(ProductId::new(1), 2);
        let totals = cart.totals(Decimal::from(20), Decimal::from(5));
        assert!(totals.meets_minimum);
    }

    #[test]
    fn test_empty_cart_never_meets_minimum() {
        let totals = Cart::new().totals(Decimal::ZERO, Decimal::from(5));
        assert!(!totals.meets_minimum);
        assert_eq!(totals.subtotal, Decimal::ZERO);
    }
}
