use serde::Serialize;
use sqlx::PgPool;

use crate::bookings::repo::RequestStatus;

/// Aggregate counts shown on the admin dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_users: i64,
    pub total_packages: i64,
    pub total_booking_requests: i64,
    pub pending_booking_requests: i64,
    pub accepted_booking_requests: i64,
    pub declined_booking_requests: i64,
}

impl DashboardSummary {
    pub async fn load(db: &PgPool) -> anyhow::Result<DashboardSummary> {
        let total_users = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM users")
            .fetch_one(db)
            .await?;
        let total_packages = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM packages")
            .fetch_one(db)
            .await?;
        let total_booking_requests =
            sqlx::query_scalar::<_, i64>("SELECT count(*) FROM booking_requests")
                .fetch_one(db)
                .await?;

        let pending_booking_requests = count_by_status(db, RequestStatus::Pending).await?;
        let accepted_booking_requests = count_by_status(db, RequestStatus::Accepted).await?;
        // Declined requests are deleted rather than kept, so this count only
        // moves if rows are backfilled by hand.
        let declined_booking_requests = count_by_status(db, RequestStatus::Declined).await?;

        Ok(DashboardSummary {
            total_users,
            total_packages,
            total_booking_requests,
            pending_booking_requests,
            accepted_booking_requests,
            declined_booking_requests,
        })
    }
}

async fn count_by_status(db: &PgPool, status: RequestStatus) -> anyhow::Result<i64> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM booking_requests WHERE status = $1")
            .bind(status)
            .fetch_one(db)
            .await?;
    Ok(count)
}
