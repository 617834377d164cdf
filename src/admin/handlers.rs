use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser,
    error::ApiError,
    extract::{Json, Path},
    state::AppState,
    users::repo::User,
};

use super::repo::DashboardSummary;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard-summary", get(dashboard_summary))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:user_id", delete(delete_user))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn dashboard_summary(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<DashboardSummary>, ApiError> {
    let summary = DashboardSummary::load(&state.db).await?;
    Ok(Json(summary))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    // The password hash is skipped by User's Serialize impl.
    let users = User::list_all(&state.db).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    User::delete(&state.db, user_id).await?;

    info!(admin_id = %claims.sub, %user_id, "user deleted by admin");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRef;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::auth::jwt::JwtKeys;
    use crate::users::repo::UserRole;

    async fn send(req: Request<Body>) -> (StatusCode, String) {
        let app = router().with_state(AppState::fake());
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn bearer(user: &User) -> String {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        format!("Bearer {}", keys.sign(user).unwrap())
    }

    #[tokio::test]
    async fn dashboard_requires_a_token() {
        let req = Request::builder()
            .uri("/admin/dashboard-summary")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("auth token not present"));
    }

    #[tokio::test]
    async fn regular_users_are_turned_away() {
        let user = User::fixture();
        let req = Request::builder()
            .uri("/admin/users")
            .header(header::AUTHORIZATION, bearer(&user))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("Access denied. Only admins are allowed."));
    }

    #[tokio::test]
    async fn delete_rejects_a_malformed_user_id() {
        let mut admin = User::fixture();
        admin.role = UserRole::Admin;
        let req = Request::builder()
            .method("DELETE")
            .uri("/admin/users/not-a-uuid")
            .header(header::AUTHORIZATION, bearer(&admin))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("{\"error\""));
    }
}
