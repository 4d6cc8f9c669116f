//! Request validation
//!
//! Runs before any network activity. The whole request is checked; a run
//! either passes as a unit or never dispatches.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{MultiPlatformPostRequest, Platform};

/// Check a request's structure and platform-specific mandatory fields
pub fn validate_request(request: &MultiPlatformPostRequest) -> Result<(), ValidationError> {
    if request.platforms.is_empty() {
        return Err(ValidationError::NoPlatforms);
    }

    let mut seen = HashSet::with_capacity(request.platforms.len());
    for platform in &request.platforms {
        if !seen.insert(*platform) {
            return Err(ValidationError::DuplicatePlatform(*platform));
        }
    }

    if seen.contains(&Platform::Substack) {
        let has_title = request
            .platform_specific
            .substack
            .as_ref()
            .is_some_and(|s| !s.title.trim().is_empty());
        if !has_title {
            return Err(ValidationError::MissingSubstackTitle);
        }
    }

    Ok(())
}
