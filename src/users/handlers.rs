use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::ApiError,
    extract::{Json, Path},
    state::AppState,
    uploads,
    users::{
        dto::{ChangePasswordRequest, EditProfileRequest, LoginRequest, RegisterRequest},
        repo::User,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users", get(get_profile))
        .route("/users/change-password", put(change_password))
        .route("/users/edit-profile", put(edit_profile))
        .route("/users/:user_id", get(get_user_by_id))
        .merge(
            Router::new()
                .route("/users/upload-image", post(upload_avatar))
                .layer(DefaultBodyLimit::max(uploads::MAX_UPLOAD_BYTES)), // 20MB
        )
}

fn is_valid_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

/// Identity fields are unique across users, so any lookup hit is a conflict.
/// The store query stays with the caller; this only decides the outcome.
fn require_unclaimed(existing: Option<&User>, message: &str) -> Result<(), ApiError> {
    if existing.is_some() {
        return Err(ApiError::Conflict(message.into()));
    }
    Ok(())
}

/// The two refusal messages stay distinct so a caller can tell an unknown
/// account from a wrong password.
fn login_outcome(account: Option<User>, password: &str) -> Result<User, ApiError> {
    let user = account.ok_or_else(|| ApiError::Unauthorized("User is not registered".into()))?;
    if !verify_password(password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Password does not match".into()));
    }
    Ok(user)
}

// --- handlers ---

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    let fullname = payload.fullname.unwrap_or_default();
    let email = payload.email.unwrap_or_default();

    if username.is_empty() || password.is_empty() || fullname.is_empty() || email.is_empty() {
        return Err(ApiError::Validation("Please fill in all fields".into()));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email on register");
        return Err(ApiError::Validation("Please enter a valid email".into()));
    }
    let existing = User::find_by_username(&state.db, &username).await?;
    if existing.is_some() {
        warn!(%username, "duplicate username");
    }
    require_unclaimed(existing.as_ref(), "Duplicate username")?;

    let hash = hash_password(&password)?;
    let user = User::create(&state.db, &username, &fullname, &email, &hash).await?;

    info!(user_id = %user.id, %username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "message": "User created" })),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if username.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("Please fill in all fields".into()));
    }

    let account = User::find_by_username(&state.db, &username).await?;
    let user = match login_outcome(account, &password) {
        Ok(user) => user,
        Err(e) => {
            warn!(%username, "login rejected");
            return Err(e);
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(&user)?;

    info!(user_id = %user.id, %username, "user logged in");
    Ok(Json(json!({ "status": "success", "token": token })))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(json!({ "data": [user] })))
}

#[instrument(skip(state))]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let current = payload.current_password.unwrap_or_default();
    let new = payload.new_password.unwrap_or_default();
    let confirm = payload.confirm_password.unwrap_or_default();

    if current.is_empty() || new.is_empty() || confirm.is_empty() {
        return Err(ApiError::Validation("Please fill in all fields".into()));
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    check_password_change(&current, &new, &confirm, &user.password_hash)?;

    let hash = hash_password(&new)?;
    User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// Precondition order matters: the current password is verified before the
/// new/confirm pair is inspected.
fn check_password_change(
    current: &str,
    new: &str,
    confirm: &str,
    password_hash: &str,
) -> Result<(), ApiError> {
    if !verify_password(current, password_hash)? {
        return Err(ApiError::Unauthorized("Incorrect current password".into()));
    }
    if new != confirm {
        return Err(ApiError::Validation(
            "New password and confirm password do not match".into(),
        ));
    }
    if current == new {
        return Err(ApiError::Validation(
            "New password must be different from the current password".into(),
        ));
    }
    Ok(())
}

#[derive(Debug)]
struct ProfileChanges {
    username: Option<String>,
    fullname: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    phone_number: Option<String>,
}

/// Work out which profile fields actually change. Empty strings do not touch
/// username/fullname/email but may clear bio; a value equal to the current
/// one is a no-op rather than a conflict.
fn diff_profile(user: &User, payload: EditProfileRequest) -> ProfileChanges {
    ProfileChanges {
        username: payload
            .username
            .filter(|v| !v.is_empty() && *v != user.username),
        fullname: payload
            .fullname
            .filter(|v| !v.is_empty() && *v != user.fullname),
        email: payload.email.filter(|v| !v.is_empty() && *v != user.email),
        bio: payload.bio.filter(|v| *v != user.bio),
        phone_number: payload
            .phone_number
            .filter(|v| user.phone_number.as_deref() != Some(v.as_str())),
    }
}

#[instrument(skip(state, payload))]
pub async fn edit_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<EditProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let changes = diff_profile(&user, payload);

    if let Some(username) = changes.username {
        let holder = User::find_by_username(&state.db, &username).await?;
        require_unclaimed(holder.as_ref(), "Username is already taken")?;
        user.username = username;
    }
    if let Some(fullname) = changes.fullname {
        user.fullname = fullname;
    }
    if let Some(email) = changes.email {
        let holder = User::find_by_email(&state.db, &email).await?;
        require_unclaimed(holder.as_ref(), "Email is already taken")?;
        user.email = email;
    }
    if let Some(bio) = changes.bio {
        user.bio = bio;
    }
    if let Some(phone) = changes.phone_number {
        let holder = User::find_by_phone(&state.db, &phone).await?;
        require_unclaimed(holder.as_ref(), "Phone number is already taken")?;
        user.phone_number = Some(phone);
    }

    let updated = user.save_profile(&state.db).await?;
    info!(user_id = %updated.id, "profile updated");
    Ok(Json(json!({ "data": [updated] })))
}

#[instrument(skip(state, multipart))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (data, ext, content_type) = uploads::read_image_field(&mut multipart).await?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let key = format!("avatars/{}/{}.{}", claims.sub, Uuid::new_v4(), ext);
    state.storage.put_object(&key, data, &content_type).await?;
    User::set_image(&state.db, claims.sub, &key).await?;

    // replaced avatars do not linger in the bucket
    if let Some(old) = user.image.as_deref().filter(|k| k.starts_with("avatars/")) {
        if let Err(e) = state.storage.delete_object(old).await {
            warn!(error = %e, key = old, "stale avatar not deleted");
        }
    }

    info!(user_id = %claims.sub, %key, "avatar uploaded");
    Ok(Json(json!({ "success": true, "data": key })))
}
