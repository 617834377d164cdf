use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::UserSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub package_id: Uuid,
    pub reviewer_id: Uuid,
    pub review: String,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Package {
    pub id: Uuid,
    pub destination: String,
    pub name: String,
    pub description: String,
    pub duration: String,
    pub location: String,
    pub price: f64,
    pub remaining: i32,
    pub route: String,
    pub cover_image: Option<String>,
    pub plan: String,
    pub reviews: Json<Vec<Review>>,
    pub owner: Json<UserSnapshot>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Package fields copied into a booking request at creation time. The
/// embedded review list is left out of the copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSnapshot {
    pub id: Uuid,
    pub destination: String,
    pub name: String,
    pub description: String,
    pub duration: String,
    pub location: String,
    pub price: f64,
    pub remaining: i32,
    pub route: String,
    pub cover_image: Option<String>,
    pub plan: String,
    pub owner: UserSnapshot,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Package> for PackageSnapshot {
    fn from(package: &Package) -> Self {
        Self {
            id: package.id,
            destination: package.destination.clone(),
            name: package.name.clone(),
            description: package.description.clone(),
            duration: package.duration.clone(),
            location: package.location.clone(),
            price: package.price,
            remaining: package.remaining,
            route: package.route.clone(),
            cover_image: package.cover_image.clone(),
            plan: package.plan.clone(),
            owner: package.owner.0.clone(),
            created_at: package.created_at,
        }
    }
}

/// Fields required to insert a new package.
pub struct NewPackage {
    pub destination: String,
    pub name: String,
    pub description: String,
    pub duration: String,
    pub location: String,
    pub price: f64,
    pub remaining: i32,
    pub route: String,
    pub cover_image: String,
    pub plan: String,
    pub owner: UserSnapshot,
}

// --- bookmark and review set logic ---

/// Add `package_id` to the bookmark set. Returns false when already present.
pub fn insert_bookmark(bookmarks: &mut Vec<Uuid>, package_id: Uuid) -> bool {
    if bookmarks.contains(&package_id) {
        return false;
    }
    bookmarks.push(package_id);
    true
}

/// Remove `package_id` from the bookmark set. Returns false when absent.
pub fn remove_bookmark(bookmarks: &mut Vec<Uuid>, package_id: Uuid) -> bool {
    let before = bookmarks.len();
    bookmarks.retain(|id| *id != package_id);
    bookmarks.len() != before
}

/// Linear scan of the embedded review list for this reviewer.
pub fn has_review_by(reviews: &[Review], reviewer_id: Uuid) -> bool {
    reviews.iter().any(|r| r.reviewer_id == reviewer_id)
}

impl Package {
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Package>> {
        let packages = sqlx::query_as::<_, Package>(
            r#"
            SELECT id, destination, name, description, duration, location, price, remaining,
                   route, cover_image, plan, reviews, owner, created_at, updated_at
            FROM packages
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(packages)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Package>> {
        let package = sqlx::query_as::<_, Package>(
            r#"
            SELECT id, destination, name, description, duration, location, price, remaining,
                   route, cover_image, plan, reviews, owner, created_at, updated_at
            FROM packages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(package)
    }

    /// Packages whose owner snapshot carries this user id, newest first.
    pub async fn list_by_owner(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Package>> {
        let packages = sqlx::query_as::<_, Package>(
            r#"
            SELECT id, destination, name, description, duration, location, price, remaining,
                   route, cover_image, plan, reviews, owner, created_at, updated_at
            FROM packages
            WHERE (owner->>'id')::uuid = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(db)
        .await?;
        Ok(packages)
    }

    pub async fn list_by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Package>> {
        let packages = sqlx::query_as::<_, Package>(
            r#"
            SELECT id, destination, name, description, duration, location, price, remaining,
                   route, cover_image, plan, reviews, owner, created_at, updated_at
            FROM packages
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(packages)
    }

    /// Case-insensitive substring match over destination, name and location.
    pub async fn search(db: &PgPool, query: &str) -> anyhow::Result<Vec<Package>> {
        let packages = sqlx::query_as::<_, Package>(
            r#"
            SELECT id, destination, name, description, duration, location, price, remaining,
                   route, cover_image, plan, reviews, owner, created_at, updated_at
            FROM packages
            WHERE destination ILIKE '%' || $1 || '%'
               OR name ILIKE '%' || $1 || '%'
               OR location ILIKE '%' || $1 || '%'
            ORDER BY created_at DESC
            "#,
        )
        .bind(query)
        .fetch_all(db)
        .await?;
        Ok(packages)
    }

    pub async fn create(db: &PgPool, new: NewPackage) -> anyhow::Result<Package> {
        let package = sqlx::query_as::<_, Package>(
            r#"
            INSERT INTO packages (destination, name, description, duration, location, price,
                                  remaining, route, cover_image, plan, owner)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, destination, name, description, duration, location, price, remaining,
                      route, cover_image, plan, reviews, owner, created_at, updated_at
            "#,
        )
        .bind(new.destination)
        .bind(new.name)
        .bind(new.description)
        .bind(new.duration)
        .bind(new.location)
        .bind(new.price)
        .bind(new.remaining)
        .bind(new.route)
        .bind(new.cover_image)
        .bind(new.plan)
        .bind(Json(new.owner))
        .fetch_one(db)
        .await?;
        Ok(package)
    }

    /// Write back the patchable columns of this record.
    pub async fn save(&self, db: &PgPool) -> anyhow::Result<Package> {
        let package = sqlx::query_as::<_, Package>(
            r#"
            UPDATE packages
            SET destination = $2, name = $3, description = $4, duration = $5, location = $6,
                price = $7, remaining = $8, route = $9, cover_image = $10, plan = $11,
                updated_at = now()
            WHERE id = $1
            RETURNING id, destination, name, description, duration, location, price, remaining,
                      route, cover_image, plan, reviews, owner, created_at, updated_at
            "#,
        )
        .bind(self.id)
        .bind(&self.destination)
        .bind(&self.name)
        .bind(&self.description)
        .bind(&self.duration)
        .bind(&self.location)
        .bind(self.price)
        .bind(self.remaining)
        .bind(&self.route)
        .bind(&self.cover_image)
        .bind(&self.plan)
        .fetch_one(db)
        .await?;
        Ok(package)
    }

    /// Overwrite the embedded review list after an in-process append.
    pub async fn save_reviews(db: &PgPool, id: Uuid, reviews: &[Review]) -> anyhow::Result<()> {
        sqlx::query("UPDATE packages SET reviews = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(Json(reviews))
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM packages WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
impl Package {
    pub fn fixture(owner: &crate::users::repo::User) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            destination: "Lofoten".into(),
            name: "Midnight Sun Trek".into(),
            description: "Five days above the Arctic circle".into(),
            duration: "5 days".into(),
            location: "Norway".into(),
            price: 1290.0,
            remaining: 8,
            route: "Svolvaer - Reine - A".into(),
            cover_image: Some("covers/fixture.jpg".into()),
            plan: "Day 1: arrival...".into(),
            reviews: Json(Vec::new()),
            owner: Json(UserSnapshot::from(owner)),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bookmark_roundtrip_restores_the_set() {
        let mut bookmarks = vec![Uuid::new_v4()];
        let original = bookmarks.clone();
        let package_id = Uuid::new_v4();

        assert!(insert_bookmark(&mut bookmarks, package_id));
        assert!(bookmarks.contains(&package_id));
        assert!(remove_bookmark(&mut bookmarks, package_id));
        assert_eq!(bookmarks, original);
    }

    #[test]
    fn double_bookmark_is_rejected() {
        let mut bookmarks = Vec::new();
        let package_id = Uuid::new_v4();
        assert!(insert_bookmark(&mut bookmarks, package_id));
        assert!(!insert_bookmark(&mut bookmarks, package_id));
        assert_eq!(bookmarks.len(), 1);
    }

    #[test]
    fn removing_an_absent_bookmark_fails() {
        let mut bookmarks = vec![Uuid::new_v4()];
        assert!(!remove_bookmark(&mut bookmarks, Uuid::new_v4()));
        assert_eq!(bookmarks.len(), 1);
    }

    #[test]
    fn one_review_per_reviewer() {
        let package_id = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let reviews = vec![Review {
            package_id,
            reviewer_id: alice,
            review: "Stunning views".into(),
            rating: 5.0,
        }];

        assert!(has_review_by(&reviews, alice));
        assert!(!has_review_by(&reviews, bob));
    }

    #[test]
    fn snapshot_drops_the_review_list() {
        let owner = crate::users::repo::User::fixture();
        let mut package = Package::fixture(&owner);
        package.reviews.0.push(Review {
            package_id: package.id,
            reviewer_id: Uuid::new_v4(),
            review: "Great".into(),
            rating: 4.0,
        });

        let snapshot = PackageSnapshot::from(&package);
        assert_eq!(snapshot.id, package.id);
        assert_eq!(snapshot.owner.id, owner.id);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("reviews").is_none());
    }
}
