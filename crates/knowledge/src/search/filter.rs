//! OData filter construction.

use crate::overrides::Overrides;
use crate::types::AuthClaims;
use regwise_core::{AppError, AppResult};

/// Access control settings of the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecuritySettings {
    /// Every query must be filtered by the caller's identity
    pub require_access_control: bool,

    /// The index has `oids` and `groups` fields
    pub has_auth_fields: bool,
}

fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// Build the identity filter, if one applies.
pub fn build_security_filter(
    settings: SecuritySettings,
    overrides: &Overrides,
    auth_claims: &AuthClaims,
) -> AppResult<Option<String>> {
    let use_oid = settings.require_access_control
        || overrides.use_oid_security_filter.unwrap_or(false);
    let use_groups = settings.require_access_control
        || overrides.use_groups_security_filter.unwrap_or(false);

    if (use_oid || use_groups) && !settings.has_auth_fields {
        return Err(AppError::Config(
            "oids and groups must be included in the search index to use security filters"
                .to_string(),
        ));
    }

    let oid_filter = use_oid.then(|| {
        format!(
            "oids/any(g:search.in(g, '{}'))",
            auth_claims.oid.as_deref().unwrap_or_default()
        )
    });
    let groups_filter = use_groups
        .then(|| format!("groups/any(g:search.in(g, '{}'))", auth_claims.groups.join(", ")));

    Ok(match (oid_filter, groups_filter) {
        (Some(oid), Some(groups)) => Some(format!("({} or {})", oid, groups)),
        (Some(oid), None) => Some(oid),
        (None, Some(groups)) => Some(groups),
        (None, None) => None,
    })
}

/// Combine category and security filters with `and`.
pub fn build_filter(
    settings: SecuritySettings,
    overrides: &Overrides,
    auth_claims: &AuthClaims,
) -> AppResult<Option<String>> {
    let mut filters = Vec::new();

    if let Some(category) = overrides.include_category.as_deref().filter(|c| !c.is_empty()) {
        filters.push(format!("category eq '{}'", quote(category)));
    }
    if let Some(category) = overrides.exclude_category.as_deref().filter(|c| !c.is_empty()) {
        filters.push(format!("category ne '{}'", quote(category)));
    }
    if let Some(security) = build_security_filter(settings, overrides, auth_claims)? {
        filters.push(security);
    }

    if filters.is_empty() {
        Ok(None)
    } else {
        Ok(Some(filters.join(" and ")))
    }
}
