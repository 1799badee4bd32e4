use revu_dal::review::ReviewRepository;

use crate::state::AppState;
use axum::routing::{delete, get};

crate::repository_from_request!(ReviewRepository);

mod crud_api {
    use super::*;
    use crate::error::{ApiError, ApiResult};
    use axum::{extract::Path, response::IntoResponse, Json};
    use http::StatusCode;
    use revu_dal::review::CreateReview;
    use revu_types::claim::{ApiClaim, Authorization as _, Role};
    use serde_json::json;

    pub async fn list(repository: ReviewRepository) -> ApiResult<impl IntoResponse> {
        let reviews = repository.list_active().await?;
        Ok((StatusCode::OK, Json(reviews)))
    }

    pub async fn list_by_product(
        Path(product_id): Path<i64>,
        repository: ReviewRepository,
    ) -> ApiResult<impl IntoResponse> {
        let reviews = repository.list_for_product(product_id).await?;
        Ok((StatusCode::OK, Json(reviews)))
    }

    pub async fn create(
        claim: ApiClaim,
        repository: ReviewRepository,
        Json(payload): Json<CreateReview>,
    ) -> ApiResult<impl IntoResponse> {
        if !claim.has_role(Role::Buyer) {
            return Err(ApiError::Forbidden(
                "Only users with role 'buyer' can add reviews".to_string(),
            ));
        }
        let user_id = claim
            .user_id()
            .map_err(|_| ApiError::Unauthorized("Invalid subject in token".to_string()))?;

        let record = repository.create(user_id, payload).await?;

        Ok((StatusCode::CREATED, Json(record)))
    }

    pub async fn delete(
        claim: ApiClaim,
        Path(review_id): Path<i64>,
        repository: ReviewRepository,
    ) -> ApiResult<impl IntoResponse> {
        if !claim.has_role(Role::Admin) {
            return Err(ApiError::Forbidden(
                "Only admins can delete reviews".to_string(),
            ));
        }
        repository.soft_delete(review_id).await?;

        Ok((StatusCode::OK, Json(json!({ "message": "Review deleted" }))))
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(crud_api::list).post(crud_api::create))
        .route(
            "/products/{product_id}/reviews",
            get(crud_api::list_by_product),
        )
        .route("/{review_id}", delete(crud_api::delete))
}
