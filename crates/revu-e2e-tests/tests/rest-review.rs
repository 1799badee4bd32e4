use revu_dal::review::Review;
use revu_e2e_tests::rest::{create_review, product_rating, seed_product};
use revu_e2e_tests::{launch_env, test_config, TestUser};
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_review_lifecycle() {
    let (config, _config_guard) = test_config("test_review_lifecycle").unwrap();
    let env = launch_env(config).await.unwrap();

    let product = seed_product(&env.pool, "Walnut desk", true).await.unwrap();
    assert_eq!(product_rating(&env.pool, product).await.unwrap(), 0.0);

    let buyer_a = env.client(TestUser::Buyer(1)).unwrap();
    let buyer_b = env.client(TestUser::Buyer(2)).unwrap();
    let admin = env.client(TestUser::Admin(3)).unwrap();

    let first = create_review(&buyer_a, &env.base_url, product, "Sturdy, no wobble", 4)
        .await
        .unwrap();
    assert_eq!(first.user_id, 1);
    assert_eq!(first.product_id, product);
    assert_eq!(first.grade, 4);
    assert!(first.is_active);
    assert_eq!(product_rating(&env.pool, product).await.unwrap(), 4.0);

    let second = create_review(&buyer_b, &env.base_url, product, "Scratched on arrival", 2)
        .await
        .unwrap();
    assert_eq!(product_rating(&env.pool, product).await.unwrap(), 3.0);

    // admin removes the first review, rating follows
    let delete_url = env
        .base_url
        .join(&format!("reviews/{}", first.id))
        .unwrap();
    let response = admin.delete(delete_url).send().await.unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({"message": "Review deleted"}));
    assert_eq!(product_rating(&env.pool, product).await.unwrap(), 2.0);

    let by_product_url = env
        .base_url
        .join(&format!("reviews/products/{}/reviews", product))
        .unwrap();
    let response = env
        .anonymous_client()
        .unwrap()
        .get(by_product_url.clone())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let listed: Vec<Review> = response.json().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[0].grade, 2);

    // a later review comes back first
    let third = create_review(&buyer_a, &env.base_url, product, "Still holding up", 5)
        .await
        .unwrap();
    let response = env
        .anonymous_client()
        .unwrap()
        .get(by_product_url)
        .send()
        .await
        .unwrap();
    let listed: Vec<Review> = response.json().await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![third.id, second.id]);

    // the soft deleted review is gone from the global listing too
    let list_url = env.base_url.join("reviews/").unwrap();
    let response = env
        .anonymous_client()
        .unwrap()
        .get(list_url)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let all: Vec<Review> = response.json().await.unwrap();
    assert!(all.iter().all(|r| r.id != first.id));
    assert_eq!(all.len(), 2);
}

#[tokio::test]
#[traced_test]
async fn test_review_authorization() {
    let (config, _config_guard) = test_config("test_review_authorization").unwrap();
    let env = launch_env(config).await.unwrap();

    let product = seed_product(&env.pool, "Ceramic mug", true).await.unwrap();
    let payload = json!({"product_id": product, "comment": "nice", "grade": 5});
    let create_url = env.base_url.join("reviews/").unwrap();

    // no token at all
    let anonymous = env.anonymous_client().unwrap();
    let response = anonymous
        .post(create_url.clone())
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // garbage token
    let bogus = env.client_with_raw_token("not-a-jwt").unwrap();
    let response = bogus
        .post(create_url.clone())
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // authenticated, wrong role
    for client in [
        env.client(TestUser::Admin(3)).unwrap(),
        env.client(TestUser::NoRole(4)).unwrap(),
    ] {
        let response = client
            .post(create_url.clone())
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 403);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(
            body["detail"],
            "Only users with role 'buyer' can add reviews"
        );
    }

    // deletion requires admin
    let buyer = env.client(TestUser::Buyer(1)).unwrap();
    let review = create_review(&buyer, &env.base_url, product, "nice", 5)
        .await
        .unwrap();
    let delete_url = env
        .base_url
        .join(&format!("reviews/{}", review.id))
        .unwrap();

    let response = anonymous.delete(delete_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    for client in [
        env.client(TestUser::Buyer(1)).unwrap(),
        env.client(TestUser::NoRole(4)).unwrap(),
    ] {
        let response = client.delete(delete_url.clone()).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 403);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Only admins can delete reviews");
    }

    // the review survived all failed attempts
    assert_eq!(product_rating(&env.pool, product).await.unwrap(), 5.0);
}

#[tokio::test]
#[traced_test]
async fn test_review_validation() {
    let (config, _config_guard) = test_config("test_review_validation").unwrap();
    let env = launch_env(config).await.unwrap();

    let product = seed_product(&env.pool, "Desk lamp", true).await.unwrap();
    let buyer = env.client(TestUser::Buyer(1)).unwrap();
    let create_url = env.base_url.join("reviews/").unwrap();

    for grade in [0, 6, -1] {
        let payload = json!({"product_id": product, "comment": "grade check", "grade": grade});
        let response = buyer
            .post(create_url.clone())
            .json(&payload)
            .send()
            .await
            .unwrap();
        info!("Response: {:#?}", response);
        assert_eq!(response.status().as_u16(), 422, "grade {grade} accepted");
    }
    assert_eq!(product_rating(&env.pool, product).await.unwrap(), 0.0);

    for grade in 1..=5 {
        create_review(&buyer, &env.base_url, product, "grade check", grade)
            .await
            .unwrap();
    }
    assert_eq!(product_rating(&env.pool, product).await.unwrap(), 3.0);
}

#[tokio::test]
#[traced_test]
async fn test_review_not_found() {
    let (config, _config_guard) = test_config("test_review_not_found").unwrap();
    let env = launch_env(config).await.unwrap();

    let retired = seed_product(&env.pool, "Retired lamp", false).await.unwrap();
    let buyer = env.client(TestUser::Buyer(1)).unwrap();
    let admin = env.client(TestUser::Admin(3)).unwrap();
    let create_url = env.base_url.join("reviews/").unwrap();

    // create against missing and inactive products
    for product_id in [9999, retired] {
        let payload = json!({"product_id": product_id, "comment": "nope", "grade": 3});
        let response = buyer
            .post(create_url.clone())
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Product not found or inactive");
    }

    // listing reviews of missing and inactive products
    for product_id in [9999, retired] {
        let url = env
            .base_url
            .join(&format!("reviews/products/{}/reviews", product_id))
            .unwrap();
        let response = env
            .anonymous_client()
            .unwrap()
            .get(url)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }

    // deleting a review that never existed
    let delete_url = env.base_url.join("reviews/9999").unwrap();
    let response = admin.delete(delete_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // deleting twice reports not found on the second call
    let product = seed_product(&env.pool, "Walnut desk", true).await.unwrap();
    let review = create_review(&buyer, &env.base_url, product, "fine", 4)
        .await
        .unwrap();
    let delete_url = env
        .base_url
        .join(&format!("reviews/{}", review.id))
        .unwrap();
    let response = admin.delete(delete_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let response = admin.delete(delete_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Review not found or inactive");
}
