use anyhow::Result;
use reqwest::Url;
use revu_dal::review::Review;
use serde_json::json;
use tracing::info;

/// Inserts a product row directly, the way the products service would have.
pub async fn seed_product(pool: &revu_dal::Pool, name: &str, is_active: bool) -> Result<i64> {
    let result = sqlx::query("INSERT INTO products (name, rating, is_active) VALUES (?, 0.0, ?)")
        .bind(name)
        .bind(is_active)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn create_review(
    client: &reqwest::Client,
    base_url: &Url,
    product_id: i64,
    comment: &str,
    grade: i64,
) -> Result<Review> {
    let payload = json!({"product_id": product_id, "comment": comment, "grade": grade});
    let api_url = base_url.join("reviews/").unwrap();

    let response = client.post(api_url.clone()).json(&payload).send().await?;
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_review: Review = response.json().await?;

    Ok(new_review)
}

pub async fn product_rating(pool: &revu_dal::Pool, product_id: i64) -> Result<f64> {
    let product = revu_dal::product::ProductRepository::new(pool.clone())
        .get(product_id)
        .await?;
    Ok(product.rating)
}
