//! The shopping cart.
//!
//! A `Cart` is a plain owned value. The web layer builds one per checkout request from catalog prices and hands it to
//! [`crate::OrderFlowApi::place_order`]; nothing about it is global.
use serde::{Deserialize, Serialize};

use crate::db_types::{Centavos, GrindType, NewOrderItem, Product};

/// Subscription boxes are sold at a flat price per coffee, regardless of the catalog price.
pub const SUBSCRIPTION_UNIT_PRICE: Centavos = Centavos::from_reais(35);

/// The most units of one product a single cart line can hold.
pub const MAX_LINE_QUANTITY: i64 = 999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Centavos,
    pub quantity: i64,
    pub grind_type: Option<GrindType>,
}

impl CartLine {
    /// `unit_price × quantity`, saturating at the largest representable amount.
    pub fn line_total(&self) -> Centavos {
        self.unit_price.saturating_mul(self.quantity)
    }

    pub fn checked_line_total(&self) -> Option<Centavos> {
        self.unit_price.checked_mul(self.quantity)
    }

    pub fn to_order_item(&self) -> NewOrderItem {
        NewOrderItem::new(self.product_id, self.name.clone(), self.quantity, self.unit_price)
            .with_grind_type(self.grind_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one unit of `product`. Stock is not checked here. A line already at [`MAX_LINE_QUANTITY`] stays there.
    pub fn add(&mut self, product: &Product) -> &mut Self {
        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity = (line.quantity + 1).min(MAX_LINE_QUANTITY),
            None => self.lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity: 1,
                grind_type: None,
            }),
        }
        self
    }

    /// Adds `product` as one coffee of a monthly subscription box. Selecting the same coffee twice has no effect.
    pub fn add_subscription(&mut self, product: &Product, grind_type: GrindType) -> &mut Self {
        if !self.contains(product.id) {
            self.lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: SUBSCRIPTION_UNIT_PRICE,
                quantity: 1,
                grind_type: Some(grind_type),
            });
        }
        self
    }

    /// Sets the quantity of an existing line. Zero or negative quantities remove the line, and quantities above
    /// [`MAX_LINE_QUANTITY`] are capped. Unknown products are ignored.
    pub fn set_quantity(&mut self, product_id: i64, quantity: i64) -> &mut Self {
        if quantity <= 0 {
            return self.remove(product_id);
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity.min(MAX_LINE_QUANTITY);
        }
        self
    }

    pub fn remove(&mut self, product_id: i64) -> &mut Self {
        self.lines.retain(|l| l.product_id != product_id);
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.lines.clear();
        self
    }

    /// Exact sum of `unit_price × quantity` over all lines, for any cart whose [`Cart::checked_total`] is `Some`.
    /// Never wraps around; an unrepresentable total saturates.
    pub fn total(&self) -> Centavos {
        self.lines.iter().map(CartLine::line_total).fold(Centavos::default(), Centavos::saturating_add)
    }

    /// The cart total, or `None` if it doesn't fit in a [`Centavos`].
    pub fn checked_total(&self) -> Option<Centavos> {
        self.lines.iter().try_fold(Centavos::default(), |acc, line| acc.checked_add(line.checked_line_total()?))
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn contains(&self, product_id: i64) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn to_order_items(&self) -> Vec<NewOrderItem> {
        self.lines.iter().map(CartLine::to_order_item).collect()
    }
}
