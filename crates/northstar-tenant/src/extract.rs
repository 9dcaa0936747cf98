//! Tenant context extraction from HTTP requests.
//!
//! Provides functions to extract the district and school ids from headers,
//! falling back to query parameters.

use crate::config::TenantConfig;
use crate::error::TenantError;
use http::{Extensions, Request};
use northstar_core::{OrganizationId, SubUnitId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The caller's tenant for the duration of one request.
///
/// Inserted into the request extensions by [`crate::TenantService`] and
/// dropped together with the request. Handlers receive it through
/// `Extension<TenantContext>` (or `Option<Extension<TenantContext>>` when the
/// layer is configured with `require_tenant(false)`) and pass it explicitly to
/// the escalation engine.
///
/// # Example
///
/// ```rust
/// use northstar_core::{OrganizationId, SubUnitId};
/// use northstar_tenant::TenantContext;
///
/// let district = OrganizationId::new();
/// let school = SubUnitId::new();
/// let ctx = TenantContext::for_sub_unit(district, school);
///
/// assert_eq!(ctx.organization_id(), district);
/// assert_eq!(ctx.sub_unit_id(), Some(school));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    organization_id: OrganizationId,
    sub_unit_id: Option<SubUnitId>,
}

impl TenantContext {
    /// Context scoped to a whole district.
    #[must_use]
    pub fn new(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            sub_unit_id: None,
        }
    }

    /// Context scoped to one school within a district.
    #[must_use]
    pub fn for_sub_unit(organization_id: OrganizationId, sub_unit_id: SubUnitId) -> Self {
        Self {
            organization_id,
            sub_unit_id: Some(sub_unit_id),
        }
    }

    /// Get the district id.
    #[must_use]
    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Get the school id, if the caller is scoped to one.
    #[must_use]
    pub fn sub_unit_id(&self) -> Option<SubUnitId> {
        self.sub_unit_id
    }

    /// Read the context stored in request extensions, if any.
    #[must_use]
    pub fn current(extensions: &Extensions) -> Option<Self> {
        extensions.get::<Self>().copied()
    }

    /// Whether a resource owned by `organization_id` / `sub_unit_id` is
    /// visible to this caller.
    ///
    /// A district-wide caller sees every school in its district. A school
    /// caller sees its own school and district-wide resources.
    #[must_use]
    pub fn can_access(&self, organization_id: OrganizationId, sub_unit_id: Option<SubUnitId>) -> bool {
        if self.organization_id != organization_id {
            return false;
        }
        match (self.sub_unit_id, sub_unit_id) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => true,
        }
    }
}

impl From<OrganizationId> for TenantContext {
    fn from(organization_id: OrganizationId) -> Self {
        Self::new(organization_id)
    }
}

/// Extract the tenant context from the HTTP request.
///
/// Lookup order:
/// 1. A `TenantContext` already in the request extensions (set by an earlier layer)
/// 2. The district/school headers named in `config`
/// 3. The district/school query parameters named in `config`
///
/// # Errors
///
/// `TenantError::MissingDistrict` when no district is present, and
/// `InvalidDistrictId` / `InvalidSchoolId` when an id is not a UUID.
///
/// # Example
///
/// ```rust,ignore
/// use northstar_tenant::{extract_tenant_context, TenantConfig};
///
/// let tenant = extract_tenant_context(&request, &TenantConfig::default())?;
/// ```
pub fn extract_tenant_context<B>(
    req: &Request<B>,
    config: &TenantConfig,
) -> Result<TenantContext, TenantError> {
    if let Some(ctx) = TenantContext::current(req.extensions()) {
        return Ok(ctx);
    }

    let organization_id: OrganizationId = lookup(
        req,
        &config.district_header,
        &config.district_param,
        TenantError::InvalidDistrictId,
    )?
    .ok_or(TenantError::MissingDistrict)?;
    let sub_unit_id: Option<SubUnitId> = lookup(
        req,
        &config.school_header,
        &config.school_param,
        TenantError::InvalidSchoolId,
    )?;

    Ok(TenantContext {
        organization_id,
        sub_unit_id,
    })
}

/// Header first, then query parameter. Blank values count as absent.
fn lookup<B, T>(
    req: &Request<B>,
    header_name: &str,
    param_name: &str,
    invalid: fn(String) -> TenantError,
) -> Result<Option<T>, TenantError>
where
    T: FromStr,
{
    let value = match header_value(req, header_name)? {
        Some(value) => Some(value),
        None => query_value(req, param_name),
    };
    value
        .map(|value| value.parse::<T>().map_err(|_| invalid(value)))
        .transpose()
}

fn header_value<B>(req: &Request<B>, header_name: &str) -> Result<Option<String>, TenantError> {
    let Some(value) = req.headers().get(header_name) else {
        return Ok(None);
    };

    let value_str = value
        .to_str()
        .map_err(|_| TenantError::UnreadableHeader(header_name.to_string()))?;

    let trimmed = value_str.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.to_string()))
}

fn query_value<B>(req: &Request<B>, param_name: &str) -> Option<String> {
    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == param_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
