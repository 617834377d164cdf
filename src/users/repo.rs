use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub role: UserRole,
    pub username: String,
    pub fullname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: String,
    pub image: Option<String>,
    pub phone_number: Option<String>,
    pub booking_requests: Vec<Uuid>,
    pub bookmarked_packages: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Public user fields copied into packages and booking requests at creation
/// time. Not kept in sync with later profile edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: Uuid,
    pub role: UserRole,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub bio: String,
    pub image: Option<String>,
    pub phone_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for UserSnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            email: user.email.clone(),
            bio: user.bio.clone(),
            image: user.image.clone(),
            phone_number: user.phone_number.clone(),
            created_at: user.created_at,
        }
    }
}

impl User {
    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, role, username, fullname, email, password_hash, bio, image,
                   phone_number, booking_requests, bookmarked_packages, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, role, username, fullname, email, password_hash, bio, image,
                   phone_number, booking_requests, bookmarked_packages, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, role, username, fullname, email, password_hash, bio, image,
                   phone_number, booking_requests, bookmarked_packages, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_phone(db: &PgPool, phone_number: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, role, username, fullname, email, password_hash, bio, image,
                   phone_number, booking_requests, bookmarked_packages, created_at
            FROM users
            WHERE phone_number = $1
            "#,
        )
        .bind(phone_number)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with a hashed password. Role defaults to `user`.
    pub async fn create(
        db: &PgPool,
        username: &str,
        fullname: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, fullname, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, role, username, fullname, email, password_hash, bio, image,
                      phone_number, booking_requests, bookmarked_packages, created_at
            "#,
        )
        .bind(username)
        .bind(fullname)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, role, username, fullname, email, password_hash, bio, image,
                   phone_number, booking_requests, bookmarked_packages, created_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Write back the editable profile columns of this record.
    pub async fn save_profile(&self, db: &PgPool) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, fullname = $3, email = $4, bio = $5, phone_number = $6
            WHERE id = $1
            RETURNING id, role, username, fullname, email, password_hash, bio, image,
                      phone_number, booking_requests, bookmarked_packages, created_at
            "#,
        )
        .bind(self.id)
        .bind(&self.username)
        .bind(&self.fullname)
        .bind(&self.email)
        .bind(&self.bio)
        .bind(&self.phone_number)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_image(db: &PgPool, id: Uuid, key: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET image = $2 WHERE id = $1")
            .bind(id)
            .bind(key)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Overwrite the bookmark set after an in-process mutation.
    pub async fn save_bookmarks(db: &PgPool, id: Uuid, bookmarks: &[Uuid]) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET bookmarked_packages = $2 WHERE id = $1")
            .bind(id)
            .bind(bookmarks)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
impl User {
    pub fn fixture() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: UserRole::User,
            username: "wanderer".into(),
            fullname: "Wanda Explorer".into(),
            email: "wanda@example.com".into(),
            password_hash: "$argon2id$fixture".into(),
            bio: String::new(),
            image: None,
            phone_number: None,
            booking_requests: Vec::new(),
            bookmarked_packages: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_user_never_carries_the_password_hash() {
        let user = User::fixture();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains("wanderer"));
    }

    #[test]
    fn snapshot_copies_public_fields() {
        let mut user = User::fixture();
        user.bio = "chasing summits".into();
        user.phone_number = Some("555-0101".into());

        let snapshot = UserSnapshot::from(&user);
        assert_eq!(snapshot.id, user.id);
        assert_eq!(snapshot.username, user.username);
        assert_eq!(snapshot.bio, "chasing summits");
        assert_eq!(snapshot.phone_number.as_deref(), Some("555-0101"));

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("password"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&UserRole::User).unwrap(), "\"user\"");
    }
}
