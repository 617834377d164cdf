use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{claims::Claims, extractors::AuthUser},
    error::ApiError,
    extract::{Json, Path},
    state::AppState,
    uploads,
    users::repo::{User, UserRole, UserSnapshot},
};

use super::dto::{
    AddReviewRequest, CreatePackageRequest, EnrichedPackage, SearchQuery, UpdatePackageRequest,
};
use super::repo::{self, NewPackage, Package, Review};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/packages", get(list_all).post(create_package))
        .route("/packages/others", get(list_others))
        .route("/packages/my-packages", get(list_mine))
        .route("/packages/bookmarked-packages", get(list_bookmarked))
        .route("/packages/search", get(search))
        .route(
            "/packages/bookmark/:package_id",
            post(bookmark).delete(unbookmark),
        )
        .route("/packages/add-review/:package_id", post(add_review))
        .route(
            "/packages/:package_id",
            get(get_package).put(update_package).delete(delete_package),
        )
        .merge(
            Router::new()
                .route("/packages/upload-cover", post(upload_cover))
                .layer(DefaultBodyLimit::max(uploads::MAX_UPLOAD_BYTES)), // 20MB
        )
}

fn can_modify(package: &Package, claims: &Claims) -> bool {
    package.owner.id == claims.sub || claims.role == UserRole::Admin
}

fn apply_patch(package: &mut Package, patch: UpdatePackageRequest) {
    if let Some(v) = patch.destination {
        package.destination = v;
    }
    if let Some(v) = patch.name {
        package.name = v;
    }
    if let Some(v) = patch.description {
        package.description = v;
    }
    if let Some(v) = patch.duration {
        package.duration = v;
    }
    if let Some(v) = patch.location {
        package.location = v;
    }
    if let Some(v) = patch.price {
        package.price = v;
    }
    if let Some(v) = patch.remaining {
        package.remaining = v;
    }
    if let Some(v) = patch.route {
        package.route = v;
    }
    if let Some(v) = patch.cover_image {
        package.cover_image = Some(v);
    }
    if let Some(v) = patch.plan {
        package.plan = v;
    }
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let packages = Package::list_all(&state.db).await?;
    Ok(Json(json!({ "data": packages })))
}

#[instrument(skip(state))]
pub async fn list_others(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let packages = Package::list_all(&state.db).await?;
    let now = OffsetDateTime::now_utc();
    let others: Vec<EnrichedPackage> = packages
        .into_iter()
        .filter(|p| p.owner.id != claims.sub)
        .map(|p| EnrichedPackage::new(p, now, &user.bookmarked_packages))
        .collect();

    Ok(Json(json!({ "data": others })))
}

#[instrument(skip(state))]
pub async fn list_mine(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let packages = Package::list_by_owner(&state.db, claims.sub).await?;
    Ok(Json(json!({ "data": packages })))
}

#[instrument(skip(state))]
pub async fn list_bookmarked(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let mut packages = Package::list_by_ids(&state.db, &user.bookmarked_packages).await?;
    // render in the order the bookmarks were added
    packages.sort_by_key(|p| {
        user.bookmarked_packages
            .iter()
            .position(|id| *id == p.id)
    });

    let now = OffsetDateTime::now_utc();
    let bookmarked: Vec<EnrichedPackage> = packages
        .into_iter()
        .map(|p| EnrichedPackage::new(p, now, &user.bookmarked_packages))
        .collect();

    Ok(Json(json!({ "data": bookmarked })))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = params.query.unwrap_or_default();
    let packages = Package::search(&state.db, &query).await?;
    if packages.is_empty() {
        return Ok(Json(json!({ "message": "No packages found" })));
    }
    Ok(Json(json!({ "data": packages })))
}

#[instrument(skip(state, payload))]
pub async fn create_package(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreatePackageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let destination = payload.destination.unwrap_or_default();
    let name = payload.name.unwrap_or_default();
    let description = payload.description.unwrap_or_default();
    let duration = payload.duration.unwrap_or_default();
    let location = payload.location.unwrap_or_default();
    let route = payload.route.unwrap_or_default();
    let cover_image = payload.cover_image.unwrap_or_default();
    let plan = payload.plan.unwrap_or_default();

    let (Some(price), Some(remaining)) = (payload.price, payload.remaining) else {
        return Err(ApiError::Validation(
            "Please fill in all required fields".into(),
        ));
    };
    if destination.is_empty()
        || name.is_empty()
        || description.is_empty()
        || duration.is_empty()
        || location.is_empty()
        || route.is_empty()
        || cover_image.is_empty()
        || plan.is_empty()
    {
        return Err(ApiError::Validation(
            "Please fill in all required fields".into(),
        ));
    }

    let owner = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let package = Package::create(
        &state.db,
        NewPackage {
            destination,
            name,
            description,
            duration,
            location,
            price,
            remaining,
            route,
            cover_image,
            plan,
            owner: UserSnapshot::from(&owner),
        },
    )
    .await?;

    info!(user_id = %owner.id, package_id = %package.id, "package created");
    Ok((StatusCode::CREATED, Json(package)))
}

#[instrument(skip(state))]
pub async fn get_package(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let package = Package::find_by_id(&state.db, package_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Package not found".into()))?;
    Ok(Json(json!({ "data": [package] })))
}

#[instrument(skip(state, payload))]
pub async fn update_package(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(package_id): Path<Uuid>,
    Json(payload): Json<UpdatePackageRequest>,
) -> Result<Json<Package>, ApiError> {
    let mut package = Package::find_by_id(&state.db, package_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Package not found".into()))?;

    if !can_modify(&package, &claims) {
        return Err(ApiError::Forbidden("You do not own this package".into()));
    }

    apply_patch(&mut package, payload);
    let updated = package.save(&state.db).await?;

    info!(user_id = %claims.sub, package_id = %updated.id, "package updated");
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn delete_package(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(package_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let package = Package::find_by_id(&state.db, package_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Package not found".into()))?;

    if !can_modify(&package, &claims) {
        return Err(ApiError::Forbidden("You do not own this package".into()));
    }

    Package::delete(&state.db, package.id).await?;

    // the stored cover object goes with the row
    if let Some(cover) = package
        .cover_image
        .as_deref()
        .filter(|k| k.starts_with("covers/"))
    {
        if let Err(e) = state.storage.delete_object(cover).await {
            warn!(error = %e, key = cover, "package cover not deleted");
        }
    }

    info!(user_id = %claims.sub, %package_id, "package deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn bookmark(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(package_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !repo::insert_bookmark(&mut user.bookmarked_packages, package_id) {
        return Err(ApiError::Conflict("Package is already bookmarked".into()));
    }
    User::save_bookmarks(&state.db, user.id, &user.bookmarked_packages).await?;

    info!(user_id = %user.id, %package_id, "package bookmarked");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Package bookmarked successfully" })),
    ))
}

#[instrument(skip(state))]
pub async fn unbookmark(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(package_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !repo::remove_bookmark(&mut user.bookmarked_packages, package_id) {
        return Err(ApiError::Conflict("Package is not bookmarked".into()));
    }
    User::save_bookmarks(&state.db, user.id, &user.bookmarked_packages).await?;

    info!(user_id = %user.id, %package_id, "bookmark removed");
    Ok(Json(json!({ "message": "Bookmark removed successfully" })))
}

#[instrument(skip(state, payload))]
pub async fn add_review(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(package_id): Path<Uuid>,
    Json(payload): Json<AddReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let review_text = payload.review.unwrap_or_default();
    let rating = match payload.rating {
        Some(r) if !review_text.is_empty() => r,
        _ => return Err(ApiError::Validation("Please fill in all fields".into())),
    };

    let mut package = Package::find_by_id(&state.db, package_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Package not found".into()))?;

    if repo::has_review_by(&package.reviews, claims.sub) {
        return Err(ApiError::Conflict(
            "You have already reviewed this package".into(),
        ));
    }

    let new_review = Review {
        package_id,
        reviewer_id: claims.sub,
        review: review_text,
        rating,
    };
    package.reviews.0.push(new_review.clone());
    Package::save_reviews(&state.db, package.id, &package.reviews).await?;

    info!(user_id = %claims.sub, %package_id, "review added");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review added successfully", "data": new_review })),
    ))
}

#[instrument(skip(state, multipart))]
pub async fn upload_cover(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (data, ext, content_type) = uploads::read_image_field(&mut multipart).await?;

    let key = format!("covers/{}/{}.{}", claims.sub, Uuid::new_v4(), ext);
    state.storage.put_object(&key, data, &content_type).await?;

    info!(user_id = %claims.sub, %key, "package cover uploaded");
    Ok(Json(json!({ "success": true, "data": key })))
}
