use bigdecimal::BigDecimal;

/// Current catalog data for one product, or one variant of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPricing {
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub unit_price: BigDecimal,
    pub available_stock: i32,
    pub is_active: bool,
}

impl ProductPricing {
    pub fn has_stock_for(&self, quantity: i32) -> bool {
        self.available_stock >= quantity
    }

    /// Name shown to users: "Product" or "Product (Variant)".
    pub fn display_name(&self) -> String {
        match &self.variant_name {
            Some(variant) => format!("{} ({})", self.product_name, variant),
            None => self.product_name.clone(),
        }
    }
}
