use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo::UserRole;

/// JWT payload issued at login and carried on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // user ID
    pub username: String,
    pub fullname: String,
    pub role: UserRole,
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
    pub iss: String,    // issuer
    pub aud: String,    // audience
}
