//! Configuration for tenant context extraction.

/// Default header carrying the district (organization) id.
pub const DEFAULT_DISTRICT_HEADER: &str = "X-District-Id";
/// Default header carrying the school (sub-unit) id.
pub const DEFAULT_SCHOOL_HEADER: &str = "X-School-Id";
/// Default query parameter used when the district header is absent.
pub const DEFAULT_DISTRICT_PARAM: &str = "districtId";
/// Default query parameter used when the school header is absent.
pub const DEFAULT_SCHOOL_PARAM: &str = "schoolId";

/// Tenant extraction settings.
///
/// # Example
///
/// ```rust
/// use northstar_tenant::TenantConfig;
///
/// let config = TenantConfig::builder()
///     .district_header("X-Org-Id")
///     .require_tenant(true)
///     .build();
///
/// assert_eq!(config.district_header, "X-Org-Id");
/// assert_eq!(config.school_header, "X-School-Id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantConfig {
    /// Header holding the district id.
    pub district_header: String,
    /// Header holding the optional school id.
    pub school_header: String,
    /// Query parameter fallback for the district id.
    pub district_param: String,
    /// Query parameter fallback for the school id.
    pub school_param: String,
    /// Reject requests that carry no district.
    pub require_tenant: bool,
}

impl TenantConfig {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> TenantConfigBuilder {
        TenantConfigBuilder::default()
    }
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            district_header: DEFAULT_DISTRICT_HEADER.to_string(),
            school_header: DEFAULT_SCHOOL_HEADER.to_string(),
            district_param: DEFAULT_DISTRICT_PARAM.to_string(),
            school_param: DEFAULT_SCHOOL_PARAM.to_string(),
            require_tenant: true,
        }
    }
}

/// Builder for [`TenantConfig`].
#[derive(Debug, Clone, Default)]
pub struct TenantConfigBuilder {
    config: TenantConfig,
}

impl TenantConfigBuilder {
    /// Set the district header name.
    #[must_use]
    pub fn district_header(mut self, name: impl Into<String>) -> Self {
        self.config.district_header = name.into();
        self
    }

    /// Set the school header name.
    #[must_use]
    pub fn school_header(mut self, name: impl Into<String>) -> Self {
        self.config.school_header = name.into();
        self
    }

    /// Set the district query parameter name.
    #[must_use]
    pub fn district_param(mut self, name: impl Into<String>) -> Self {
        self.config.district_param = name.into();
        self
    }

    /// Set the school query parameter name.
    #[must_use]
    pub fn school_param(mut self, name: impl Into<String>) -> Self {
        self.config.school_param = name.into();
        self
    }

    /// Whether requests without a district are rejected.
    #[must_use]
    pub fn require_tenant(mut self, require: bool) -> Self {
        self.config.require_tenant = require;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> TenantConfig {
        self.config
    }
}
