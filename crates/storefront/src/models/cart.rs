//! The cart ledger.
//!
//! A session-scoped mapping of product → quantity with one hard rule:
//! digital goods are capped at quantity 1. The ledger stores a snapshot
//! of the product (name, canonical price, digital flag) taken at
//! add-time, so later catalog price changes never move a cart total.

use paperstack_core::{FileId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::types::Product;

/// One cart line: a product snapshot plus a quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog numeric id (order-item relations point at this).
    pub product_id: ProductId,
    /// File-storage id; also the ledger key.
    pub file_id: FileId,
    /// Name at add-time.
    pub name: String,
    /// Canonical unit price at add-time.
    pub unit_price: Decimal,
    /// Digital goods never exceed quantity 1.
    pub is_digital: bool,
    /// Always >= 1; a line at 0 is removed, not kept.
    pub quantity: u32,
}

impl CartLine {
    fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id,
            file_id: product.file_id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            is_digital: product.is_digital,
            quantity: 1,
        }
    }

    /// Line total (unit price × quantity) in the canonical currency.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The cart ledger: at most one line per product.
///
/// Created empty at session start; cleared only through [`Cart::clear`]
/// (invoked once a purchase is confirmed). Not persisted anywhere beyond
/// the session store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Add a product to the cart.
    ///
    /// No line yet → a new line at quantity 1. Existing physical line →
    /// quantity + 1. Existing digital line → silent no-op; digital goods
    /// are pinned at quantity 1.
    pub fn add_item(&mut self, product: &Product) {
        if let Some(line) = self.line_mut(&product.file_id) {
            if !line.is_digital {
                line.quantity += 1;
            }
            return;
        }

        self.lines.push(CartLine::from_product(product));
    }

    /// Remove a line unconditionally. Absent ids are ignored.
    pub fn remove_item(&mut self, file_id: &FileId) {
        self.lines.retain(|line| line.file_id != *file_id);
    }

    /// Adjust a line's quantity by `delta`, clamping at zero.
    ///
    /// A digital line ignores positive deltas. A line whose quantity
    /// reaches zero is removed from the ledger entirely.
    pub fn update_quantity(&mut self, file_id: &FileId, delta: i32) {
        if let Some(line) = self.line_mut(file_id) {
            if line.is_digital && delta > 0 {
                return;
            }
            let quantity = i64::from(line.quantity) + i64::from(delta);
            line.quantity = u32::try_from(quantity.max(0)).unwrap_or(0);
        }
        self.lines.retain(|line| line.quantity > 0);
    }

    /// Empty the ledger.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// True when the ledger holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total unit count across all lines (the badge number).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Cart total in the canonical currency: Σ price × quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Iterate the lines in insertion order.
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter()
    }

    /// Consume the cart, yielding its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    fn line_mut(&mut self, file_id: &FileId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.file_id == *file_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use paperstack_core::ProductId;
    use std::str::FromStr;

    fn digital(file_id: &str, price: i64) -> Product {
        Product {
            id: ProductId::new(1),
            document_id: None,
            name: format!("Digital {file_id}"),
            price: Decimal::from(price),
            file_id: FileId::from(file_id),
            is_digital: true,
            thumbnail: None,
            details: None,
        }
    }

    fn physical(file_id: &str, price: i64) -> Product {
        Product {
            is_digital: false,
            ..digital(file_id, price)
        }
    }

    #[test]
    fn test_digital_add_is_idempotent() {
        let mut cart = Cart::default();
        let product = digital("file-a", 20);
        for _ in 0..5 {
            cart.add_item(&product);
        }
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines().next().unwrap().quantity, 1);
    }

    #[test]
    fn test_physical_add_accumulates() {
        let mut cart = Cart::default();
        let product = physical("file-b", 10);
        for _ in 0..3 {
            cart.add_item(&product);
        }
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines().next().unwrap().quantity, 3);
    }

    #[test]
    fn test_digital_increment_is_noop() {
        let mut cart = Cart::default();
        cart.add_item(&digital("file-a", 20));
        cart.update_quantity(&FileId::from("file-a"), 1);
        cart.update_quantity(&FileId::from("file-a"), 3);
        assert_eq!(cart.lines().next().unwrap().quantity, 1);
    }

    #[test]
    fn test_digital_decrement_removes_line() {
        let mut cart = Cart::default();
        cart.add_item(&digital("file-a", 20));
        cart.update_quantity(&FileId::from("file-a"), -1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_never_negative() {
        let mut cart = Cart::default();
        let product = physical("file-b", 10);
        cart.add_item(&product);
        cart.add_item(&product);
        cart.update_quantity(&FileId::from("file-b"), -10);
        // Clamped at zero, and zero means gone
        assert!(cart.is_empty());
    }

    #[test]
    fn test_decrement_to_zero_removes_line() {
        let mut cart = Cart::default();
        let product = physical("file-b", 10);
        for _ in 0..3 {
            cart.add_item(&product);
        }
        cart.update_quantity(&FileId::from("file-b"), -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::default();
        cart.add_item(&physical("file-b", 10));
        cart.remove_item(&FileId::from("missing"));
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_subtotal_is_order_independent() {
        let mut forward = Cart::default();
        forward.add_item(&digital("file-a", 20));
        forward.add_item(&physical("file-b", 10));
        forward.add_item(&physical("file-b", 10));

        let mut reverse = Cart::default();
        reverse.add_item(&physical("file-b", 10));
        reverse.add_item(&digital("file-a", 20));
        reverse.add_item(&physical("file-b", 10));

        assert_eq!(forward.subtotal(), reverse.subtotal());
        assert_eq!(forward.subtotal(), Decimal::from(40));
    }

    #[test]
    fn test_subtotal_uses_snapshot_price() {
        let mut cart = Cart::default();
        let mut product = physical("file-b", 10);
        cart.add_item(&product);
        // A catalog price change after add-time must not move the total
        product.price = Decimal::from(99);
        cart.add_item(&product);
        assert_eq!(cart.subtotal(), Decimal::from(20));
    }

    #[test]
    fn test_clear_empties_ledger() {
        let mut cart = Cart::default();
        cart.add_item(&digital("file-a", 20));
        cart.add_item(&physical("file-b", 10));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Decimal::from(0));
    }

    #[test]
    fn test_checkout_figure_for_mixed_cart() {
        // One digital at 20, one physical at 10 x 2, PHP rate 58
        let mut cart = Cart::default();
        cart.add_item(&digital("file-a", 20));
        let phys = physical("file-b", 10);
        cart.add_item(&phys);
        cart.add_item(&phys);

        let rate = Decimal::from(58);
        assert_eq!(
            cart.subtotal() * rate,
            Decimal::from_str("2320").unwrap()
        );
    }
}
