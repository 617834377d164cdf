use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::packages::repo::Package;
use crate::timefmt::time_ago;

#[derive(Debug, Deserialize)]
pub struct CreatePackageRequest {
    pub destination: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub location: Option<String>,
    pub price: Option<f64>,
    pub remaining: Option<i32>,
    pub route: Option<String>,
    pub cover_image: Option<String>,
    pub plan: Option<String>,
}

/// Patch body: only provided fields overwrite the stored record.
#[derive(Debug, Deserialize)]
pub struct UpdatePackageRequest {
    pub destination: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub location: Option<String>,
    pub price: Option<f64>,
    pub remaining: Option<i32>,
    pub route: Option<String>,
    pub cover_image: Option<String>,
    pub plan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddReviewRequest {
    pub review: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// A package as rendered in browse listings: the stored fields plus the
/// relative age and whether the viewer has bookmarked it.
#[derive(Debug, Serialize)]
pub struct EnrichedPackage {
    #[serde(flatten)]
    pub package: Package,
    pub formatted_created_at: String,
    pub is_bookmarked: bool,
}

impl EnrichedPackage {
    pub fn new(package: Package, now: OffsetDateTime, bookmarks: &[Uuid]) -> Self {
        let formatted_created_at = time_ago(package.created_at, now);
        let is_bookmarked = bookmarks.contains(&package.id);
        Self {
            package,
            formatted_created_at,
            is_bookmarked,
        }
    }
}
