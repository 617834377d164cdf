use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::bookings::repo::{BookingRequest, RequestStatus};
use crate::packages::repo::PackageSnapshot;
use crate::timefmt::time_ago;
use crate::users::repo::UserSnapshot;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequestBody {
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub further_requirements: Option<String>,
}

/// A request as rendered in the inbox/outbox listings: stored snapshots plus
/// the relative age and the package owner's record as it is now. The owner is
/// the only live piece; everything else stays creation-time data.
#[derive(Debug, Serialize)]
pub struct EnrichedRequest {
    pub id: Uuid,
    pub requester: UserSnapshot,
    pub requested_package: PackageSnapshot,
    pub package_owner: Option<UserSnapshot>,
    pub status: RequestStatus,
    pub formatted_created_at: String,
    pub email: String,
    pub contact_number: String,
    pub further_requirements: String,
}

impl EnrichedRequest {
    pub fn new(
        request: BookingRequest,
        package_owner: Option<UserSnapshot>,
        now: OffsetDateTime,
    ) -> Self {
        let formatted_created_at = time_ago(request.created_at, now);
        Self {
            id: request.id,
            requester: request.requester.0,
            requested_package: request.requested_package.0,
            package_owner,
            status: request.status,
            formatted_created_at,
            email: request.email,
            contact_number: request.contact_number,
            further_requirements: request.further_requirements,
        }
    }
}

/// The accepted listing carries less: snapshots, status and the relative age.
#[derive(Debug, Serialize)]
pub struct AcceptedRequestView {
    pub id: Uuid,
    pub requester: UserSnapshot,
    pub requested_package: PackageSnapshot,
    pub status: RequestStatus,
    pub formatted_created_at: String,
}

impl AcceptedRequestView {
    pub fn new(request: BookingRequest, now: OffsetDateTime) -> Self {
        let formatted_created_at = time_ago(request.created_at, now);
        Self {
            id: request.id,
            requester: request.requester.0,
            requested_package: request.requested_package.0,
            status: request.status,
            formatted_created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::repo::Package;
    use crate::users::repo::User;
    use time::Duration;

    #[test]
    fn enrichment_carries_the_live_owner_and_age() {
        let owner = User::fixture();
        let package = Package::fixture(&owner);
        let requester = User::fixture();
        let mut request = BookingRequest::fixture(&requester, &package);

        let now = OffsetDateTime::now_utc();
        request.created_at = now - Duration::minutes(2) - Duration::seconds(5);

        let enriched = EnrichedRequest::new(request, Some(UserSnapshot::from(&owner)), now);
        assert_eq!(enriched.formatted_created_at, "2 minutes ago");
        assert_eq!(enriched.requester.id, requester.id);
        assert_eq!(
            enriched.package_owner.as_ref().map(|o| o.id),
            Some(owner.id)
        );
        assert_eq!(enriched.status, RequestStatus::Pending);
    }

    #[test]
    fn a_deleted_owner_renders_as_null() {
        let owner = User::fixture();
        let package = Package::fixture(&owner);
        let requester = User::fixture();
        let request = BookingRequest::fixture(&requester, &package);

        let enriched = EnrichedRequest::new(request, None, OffsetDateTime::now_utc());
        let json = serde_json::to_value(&enriched).unwrap();
        assert!(json["package_owner"].is_null());
        // the stale snapshot still names the owner it was created against
        assert_eq!(
            json["requested_package"]["owner"]["id"],
            owner.id.to_string()
        );
    }

    #[test]
    fn accepted_view_renders_age_and_status() {
        let owner = User::fixture();
        let package = Package::fixture(&owner);
        let requester = User::fixture();
        let mut request = BookingRequest::fixture(&requester, &package);
        request.status = RequestStatus::Accepted;

        let now = OffsetDateTime::now_utc();
        request.created_at = now - Duration::days(2);

        let view = AcceptedRequestView::new(request, now);
        assert_eq!(view.formatted_created_at, "2 days ago");
        assert_eq!(view.status, RequestStatus::Accepted);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("package_owner").is_none());
    }
}
