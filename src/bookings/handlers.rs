use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    extract::{Json, Path},
    packages::repo::{Package, PackageSnapshot},
    state::AppState,
    users::repo::{User, UserSnapshot},
};

use super::dto::{AcceptedRequestView, CreateBookingRequestBody, EnrichedRequest};
use super::repo::{self, BookingRequest, NewBookingRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/booking", get(list_all))
        .route("/booking/booking-requests", get(list_incoming))
        .route("/booking/booking-requests/accepted", get(list_accepted))
        .route("/booking/:package_id/booking-request", post(create_request))
        .route(
            "/booking/booking-request/:request_id/accept",
            put(accept_request),
        )
        .route(
            "/booking/booking-request/:request_id/decline",
            delete(decline_request),
        )
        .route("/users/:user_id/booking-requests", get(list_for_requester))
}

/// Annotate requests with the relative age and the package owner's current
/// record. The owner is re-fetched live per entry while the request itself
/// stays snapshot data.
async fn enrich_requests(
    state: &AppState,
    requests: Vec<BookingRequest>,
) -> Result<Vec<EnrichedRequest>, ApiError> {
    let now = OffsetDateTime::now_utc();
    let mut enriched = Vec::with_capacity(requests.len());
    for request in requests {
        let owner = User::find_by_id(&state.db, request.requested_user)
            .await?
            .map(|u| UserSnapshot::from(&u));
        if owner.is_none() {
            warn!(request_id = %request.id, owner_id = %request.requested_user, "package owner no longer exists");
        }
        enriched.push(EnrichedRequest::new(request, owner, now));
    }
    Ok(enriched)
}

/// Both manage verbs resolve the same way: a missing id is a 404, and anyone
/// but the package owner is turned away.
fn authorize_manage(
    request: Option<BookingRequest>,
    caller: Uuid,
) -> Result<BookingRequest, ApiError> {
    let request = request.ok_or_else(|| ApiError::NotFound("Booking request not found".into()))?;
    if request.requested_user != caller {
        return Err(ApiError::Forbidden(
            "Only the package owner can manage this request".into(),
        ));
    }
    Ok(request)
}

// --- handlers ---

#[instrument(skip(state, payload))]
pub async fn create_request(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(package_id): Path<Uuid>,
    Json(payload): Json<CreateBookingRequestBody>,
) -> Result<Json<BookingRequest>, ApiError> {
    let email = payload.email.unwrap_or_default();
    let contact_number = payload.contact_number.unwrap_or_default();
    let further_requirements = payload.further_requirements.unwrap_or_default();

    if email.is_empty() || contact_number.is_empty() {
        return Err(ApiError::Validation("Please fill in all fields".into()));
    }

    let requester = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("Requester user not found".into()))?;
    let package = Package::find_by_id(&state.db, package_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Requested package not found".into()))?;

    let request = BookingRequest::create(
        &state.db,
        NewBookingRequest {
            requester: UserSnapshot::from(&requester),
            requested_package: PackageSnapshot::from(&package),
            requested_user: package.owner.id,
            email,
            contact_number,
            further_requirements,
        },
    )
    .await?;

    info!(user_id = %requester.id, request_id = %request.id, %package_id, "booking request created");
    Ok(Json(request))
}

#[instrument(skip(state))]
pub async fn list_all(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
) -> Result<Json<Vec<BookingRequest>>, ApiError> {
    let requests = BookingRequest::list_all(&state.db).await?;
    Ok(Json(requests))
}

#[instrument(skip(state))]
pub async fn list_incoming(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests = BookingRequest::list_incoming(&state.db, claims.sub).await?;
    let enriched = enrich_requests(&state, requests).await?;
    Ok(Json(json!({ "data": enriched })))
}

#[instrument(skip(state))]
pub async fn list_for_requester(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = BookingRequest::list_by_requester(&state.db, user_id).await?;
    let enriched = enrich_requests(&state, requests).await?;
    Ok(Json(json!({ "data": enriched })))
}

#[instrument(skip(state))]
pub async fn list_accepted(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let all_accepted = BookingRequest::list_accepted(&state.db).await?;
    let mine = repo::filter_by_requester(all_accepted, claims.sub);

    let now = OffsetDateTime::now_utc();
    let views: Vec<AcceptedRequestView> = mine
        .into_iter()
        .map(|r| AcceptedRequestView::new(r, now))
        .collect();

    Ok(Json(json!({ "data": views })))
}

#[instrument(skip(state))]
pub async fn accept_request(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(request_id): Path<Uuid>,
) -> Result<Json<BookingRequest>, ApiError> {
    authorize_manage(
        BookingRequest::find_by_id(&state.db, request_id).await?,
        claims.sub,
    )?;

    let accepted = BookingRequest::accept(&state.db, request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking request not found".into()))?;

    info!(user_id = %claims.sub, %request_id, "booking request accepted");
    Ok(Json(accepted))
}

#[instrument(skip(state))]
pub async fn decline_request(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authorize_manage(
        BookingRequest::find_by_id(&state.db, request_id).await?,
        claims.sub,
    )?;

    if !BookingRequest::delete(&state.db, request_id).await? {
        return Err(ApiError::NotFound("Booking request not found".into()));
    }

    info!(user_id = %claims.sub, %request_id, "booking request declined and deleted");
    Ok(Json(json!({ "message": "Booking request declined" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRef;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::auth::jwt::JwtKeys;

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
    async fn listing_requires_a_token() {
        let req = Request::builder()
            .uri("/booking")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("auth token not present"));
    }

    #[tokio::test]
    async fn create_rejects_missing_contact_details() {
        let user = User::fixture();
        let req = Request::builder()
            .method("POST")
            .uri(format!("/booking/{}/booking-request", Uuid::new_v4()))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, bearer(&user))
            .body(Body::from(r#"{"email":"trip@example.com"}"#))
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Please fill in all fields"));
    }

    #[tokio::test]
    async fn accept_rejects_a_malformed_request_id() {
        let user = User::fixture();
        let req = Request::builder()
            .method("PUT")
            .uri("/booking/booking-request/not-a-uuid/accept")
            .header(header::AUTHORIZATION, bearer(&user))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("{\"error\""));
    }

    #[test]
    fn managing_an_unknown_request_is_a_not_found() {
        match authorize_manage(None, Uuid::new_v4()) {
            Err(ApiError::NotFound(msg)) => assert_eq!(msg, "Booking request not found"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn only_the_package_owner_may_manage_a_request() {
        let requester = User::fixture();
        let package = Package::fixture(&User::fixture());
        let request = BookingRequest::fixture(&requester, &package);
        let owner = request.requested_user;

        match authorize_manage(Some(request.clone()), Uuid::new_v4()) {
            Err(ApiError::Forbidden(msg)) => {
                assert_eq!(msg, "Only the package owner can manage this request")
            }
            other => panic!("unexpected: {other:?}"),
        }

        let allowed = authorize_manage(Some(request), owner).unwrap();
        assert_eq!(allowed.requested_user, owner);
    }
}
