pub const ASSESSMENTS_URL: &str = "/assessments";
pub const ASSESSMENT_FILTER_URL: &str = "/assessments/filter";
pub const ASSESSMENT_URL: &str = "/assessments/{id}";
pub const ASSESSMENT_STATUS_URL: &str = "/assessments/{id}/status";
pub const HEALTH_URL: &str = "/health";

pub fn assessment_url(id: &str) -> String {
    format!("/assessments/{id}")
}

pub fn assessment_status_url(id: &str) -> String {
    format!("/assessments/{id}/status")
}

// Listing defaults
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Question ids carry a three digit sequence number.
pub const MAX_QUESTIONS: usize = 999;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
