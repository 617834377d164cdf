use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::packages::repo::PackageSnapshot;
use crate::users::repo::UserSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

/// A request by one user to book another user's package. Requester and
/// package are stored as snapshots taken at creation time; `requested_user`
/// is the package owner by reference.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookingRequest {
    pub id: Uuid,
    pub requester: Json<UserSnapshot>,
    pub requested_package: Json<PackageSnapshot>,
    pub requested_user: Uuid,
    pub email: String,
    pub contact_number: String,
    pub further_requirements: String,
    pub status: RequestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub status_updated_at: OffsetDateTime,
}

pub struct NewBookingRequest {
    pub requester: UserSnapshot,
    pub requested_package: PackageSnapshot,
    pub requested_user: Uuid,
    pub email: String,
    pub contact_number: String,
    pub further_requirements: String,
}

/// In-process share of the accepted scan belonging to one requester.
pub fn filter_by_requester(
    requests: Vec<BookingRequest>,
    requester_id: Uuid,
) -> Vec<BookingRequest> {
    requests
        .into_iter()
        .filter(|r| r.requester.id == requester_id)
        .collect()
}

impl BookingRequest {
    pub async fn create(db: &PgPool, new: NewBookingRequest) -> anyhow::Result<BookingRequest> {
        let request = sqlx::query_as::<_, BookingRequest>(
            r#"
            INSERT INTO booking_requests
                (requester, requested_package, requested_user, email, contact_number,
                 further_requirements)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, requester, requested_package, requested_user, email, contact_number,
                      further_requirements, status, created_at, status_updated_at
            "#,
        )
        .bind(Json(new.requester))
        .bind(Json(new.requested_package))
        .bind(new.requested_user)
        .bind(new.email)
        .bind(new.contact_number)
        .bind(new.further_requirements)
        .fetch_one(db)
        .await?;
        Ok(request)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<BookingRequest>> {
        let request = sqlx::query_as::<_, BookingRequest>(
            r#"
            SELECT id, requester, requested_package, requested_user, email, contact_number,
                   further_requirements, status, created_at, status_updated_at
            FROM booking_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(request)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<BookingRequest>> {
        let requests = sqlx::query_as::<_, BookingRequest>(
            r#"
            SELECT id, requester, requested_package, requested_user, email, contact_number,
                   further_requirements, status, created_at, status_updated_at
            FROM booking_requests
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(requests)
    }

    /// Requests made by this user, newest first.
    pub async fn list_by_requester(
        db: &PgPool,
        requester_id: Uuid,
    ) -> anyhow::Result<Vec<BookingRequest>> {
        let requests = sqlx::query_as::<_, BookingRequest>(
            r#"
            SELECT id, requester, requested_package, requested_user, email, contact_number,
                   further_requirements, status, created_at, status_updated_at
            FROM booking_requests
            WHERE (requester->>'id')::uuid = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(requester_id)
        .fetch_all(db)
        .await?;
        Ok(requests)
    }

    /// Requests targeting packages owned by this user, newest first.
    pub async fn list_incoming(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<BookingRequest>> {
        let requests = sqlx::query_as::<_, BookingRequest>(
            r#"
            SELECT id, requester, requested_package, requested_user, email, contact_number,
                   further_requirements, status, created_at, status_updated_at
            FROM booking_requests
            WHERE requested_user = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(db)
        .await?;
        Ok(requests)
    }

    /// Every accepted request in the system, newest first. Callers filter
    /// down to one requester in process.
    pub async fn list_accepted(db: &PgPool) -> anyhow::Result<Vec<BookingRequest>> {
        let requests = sqlx::query_as::<_, BookingRequest>(
            r#"
            SELECT id, requester, requested_package, requested_user, email, contact_number,
                   further_requirements, status, created_at, status_updated_at
            FROM booking_requests
            WHERE status = 'accepted'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(requests)
    }

    /// pending -> accepted, stamping `status_updated_at`. Re-accepting an
    /// accepted request just re-stamps; there is no status precondition.
    pub async fn accept(db: &PgPool, id: Uuid) -> anyhow::Result<Option<BookingRequest>> {
        let request = sqlx::query_as::<_, BookingRequest>(
            r#"
            UPDATE booking_requests
            SET status = $2, status_updated_at = now()
            WHERE id = $1
            RETURNING id, requester, requested_package, requested_user, email, contact_number,
                      further_requirements, status, created_at, status_updated_at
            "#,
        )
        .bind(id)
        .bind(RequestStatus::Accepted)
        .fetch_optional(db)
        .await?;
        Ok(request)
    }

    /// Declining removes the record outright; `declined` never persists.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM booking_requests WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
impl BookingRequest {
    pub fn fixture(
        requester: &crate::users::repo::User,
        package: &crate::packages::repo::Package,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            requester: Json(UserSnapshot::from(requester)),
            requested_package: Json(PackageSnapshot::from(package)),
            requested_user: package.owner.id,
            email: "trip@example.com".into(),
            contact_number: "555-0100".into(),
            further_requirements: String::new(),
            status: RequestStatus::Pending,
            created_at: now,
            status_updated_at: now,
        }
    }
}
