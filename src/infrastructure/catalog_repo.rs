use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::ProductPricing;
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogOracle;
use crate::schema::{product_variants, products};

use super::models::{ProductRow, ProductVariantRow};

/// Reads pricing from the `products` / `product_variants` tables. The
/// catalog itself is maintained elsewhere; this service never writes to it.
pub struct DieselCatalogOracle {
    pool: DbPool,
}

impl DieselCatalogOracle {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogOracle for DieselCatalogOracle {
    fn validate_and_get_pricing(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<ProductPricing, DomainError> {
        let mut conn = self.pool.get()?;

        let product: ProductRow = products::table
            .find(product_id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| DomainError::ProductInvalid(product_id.to_string()))?;

        let Some(variant_id) = variant_id else {
            return Ok(ProductPricing {
                product_name: product.name,
                variant_name: None,
                sku: product.sku,
                unit_price: product.price,
                available_stock: product.stock,
                is_active: product.active,
            });
        };

        let variant: ProductVariantRow = ProductVariantRow::belonging_to(&product)
            .filter(product_variants::id.eq(variant_id))
            .select(ProductVariantRow::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| DomainError::ProductInvalid(format!("{} variant {}", product.name, variant_id)))?;

        Ok(ProductPricing {
            // Variants without their own price sell at the product price.
            unit_price: variant.price.unwrap_or(product.price),
            available_stock: variant.stock,
            is_active: product.active && variant.active,
            sku: variant.sku,
            variant_name: Some(variant.name),
            product_name: product.name,
        })
    }
}
