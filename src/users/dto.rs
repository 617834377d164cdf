use serde::Deserialize;

/// All fields optional so presence is checked by the handler, not the
/// deserializer; missing and empty both mean "not filled in".
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub fullname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditProfileRequest {
    pub username: Option<String>,
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}
