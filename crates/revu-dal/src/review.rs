use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Transaction;
use tracing::debug;

use crate::{error::Result, ChosenDB, Error, Pool};

const REVIEW_COLUMNS: &str = "id, comment, grade, user_id, product_id, comment_date, is_active";

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub comment: String,
    pub grade: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub comment_date: time::PrimitiveDateTime,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateReview {
    #[garde(skip)]
    pub product_id: i64,
    #[garde(length(max = 5000))]
    pub comment: String,
    #[garde(range(min = 1, max = 5))]
    pub grade: i64,
}

pub struct ReviewRepository {
    pool: Pool,
}

impl ReviewRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// All active reviews, in storage order.
    pub async fn list_active(&self) -> Result<Vec<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE is_active = 1");
        let reviews = sqlx::query_as::<_, Review>(&sql).fetch_all(&self.pool).await?;
        Ok(reviews)
    }

    /// Active reviews of one product, most recent first. The product itself
    /// must exist and be active.
    pub async fn list_for_product(&self, product_id: i64) -> Result<Vec<Review>> {
        let product: Option<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE id = ? AND is_active = 1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;
        if product.is_none() {
            return Err(Error::RecordNotFound("Product".to_string()));
        }

        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = ? AND is_active = 1
             ORDER BY comment_date DESC, id DESC"
        );
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(reviews)
    }

    /// Inserts a review and refreshes the product rating in one transaction.
    /// Checks run in the same order as the HTTP contract promises: product
    /// existence before payload validation.
    pub async fn create(&self, user_id: i64, payload: CreateReview) -> Result<Review> {
        let mut tx = self.pool.begin().await?;

        let product: Option<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE id = ? AND is_active = 1")
                .bind(payload.product_id)
                .fetch_optional(&mut *tx)
                .await?;
        if product.is_none() {
            return Err(Error::RecordNotFound("Product".to_string()));
        }

        payload.validate().map_err(Error::InvalidInput)?;

        let result =
            sqlx::query("INSERT INTO reviews (comment, grade, user_id, product_id) VALUES (?, ?, ?, ?)")
                .bind(&payload.comment)
                .bind(payload.grade)
                .bind(user_id)
                .bind(payload.product_id)
                .execute(&mut *tx)
                .await?;
        let id = result.last_insert_rowid();

        refresh_product_rating(&mut tx, payload.product_id).await?;

        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?");
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("Created review {} for product {}", review.id, review.product_id);
        Ok(review)
    }

    /// Flags a review inactive and refreshes the product rating in one
    /// transaction. An already inactive review counts as not found.
    pub async fn soft_delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let product_id: Option<i64> =
            sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = ? AND is_active = 1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let product_id = match product_id {
            Some(product_id) => product_id,
            None => return Err(Error::RecordNotFound("Review".to_string())),
        };

        sqlx::query("UPDATE reviews SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        refresh_product_rating(&mut tx, product_id).await?;

        tx.commit().await?;
        debug!("Deactivated review {}", id);
        Ok(())
    }
}

/// Restores the rating invariant: mean grade of active reviews, 0.0 if none.
async fn refresh_product_rating(tx: &mut Transaction<'_, ChosenDB>, product_id: i64) -> Result<()> {
    let avg: Option<f64> =
        sqlx::query_scalar("SELECT AVG(grade) FROM reviews WHERE product_id = ? AND is_active = 1")
            .bind(product_id)
            .fetch_one(&mut **tx)
            .await?;

    sqlx::query("UPDATE products SET rating = ? WHERE id = ?")
        .bind(avg.unwrap_or(0.0))
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
