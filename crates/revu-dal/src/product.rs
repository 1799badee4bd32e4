use serde::{Deserialize, Serialize};

use crate::{error::Result, Error, Pool};

/// Subset of the product catalog the review service touches. `rating` is
/// derived from active reviews and owned by this service; everything else
/// is maintained by the products service.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub rating: f64,
    pub is_active: bool,
}

pub struct ProductRepository {
    pool: Pool,
}

impl ProductRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Product> {
        let product =
            sqlx::query_as::<_, Product>("SELECT id, name, rating, is_active FROM products WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        product.ok_or_else(|| Error::RecordNotFound("Product".to_string()))
    }
}
