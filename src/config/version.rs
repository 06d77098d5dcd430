//! Admin API version definitions.
//!
//! Shopify releases new API versions quarterly (January, April, July,
//! October). The [`ApiVersion`] enum names the versions inside the current
//! support window, plus `Unstable` for development and `Custom` for future
//! or unrecognized versions.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Admin API version used when building `graphql.json` endpoints.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::ApiVersion;
///
/// let version = ApiVersion::latest();
/// assert!(version.is_stable());
///
/// let version: ApiVersion = "2025-01".parse().unwrap();
/// assert_eq!(version, ApiVersion::V2025_01);
/// assert_eq!(format!("{}", ApiVersion::V2025_01), "2025-01");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    /// API version 2024-10 (October 2024)
    V2024_10,
    /// API version 2025-01 (January 2025)
    V2025_01,
    /// API version 2025-04 (April 2025)
    V2025_04,
    /// API version 2025-07 (July 2025)
    V2025_07,
    /// API version 2025-10 (October 2025)
    V2025_10,
    /// Unstable API version for development and testing.
    Unstable,
    /// Custom version string for future or unrecognized versions.
    Custom(String),
}

impl ApiVersion {
    /// Returns the latest stable API version.
    ///
    /// Updated when new stable versions are released.
    #[must_use]
    pub const fn latest() -> Self {
        Self::V2025_10
    }

    /// Returns `true` if this is a known stable API version.
    ///
    /// Returns `false` for `Unstable` and `Custom` variants.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        !matches!(self, Self::Unstable | Self::Custom(_))
    }

    /// Returns the version string used in endpoint paths.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::V2024_10 => "2024-10",
            Self::V2025_01 => "2025-01",
            Self::V2025_04 => "2025-04",
            Self::V2025_07 => "2025-07",
            Self::V2025_10 => "2025-10",
            Self::Unstable => "unstable",
            Self::Custom(version) => version,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2024-10" => Ok(Self::V2024_10),
            "2025-01" => Ok(Self::V2025_01),
            "2025-04" => Ok(Self::V2025_04),
            "2025-07" => Ok(Self::V2025_07),
            "2025-10" => Ok(Self::V2025_10),
            "unstable" => Ok(Self::Unstable),
            other => {
                if Self::looks_like_version(other) {
                    Ok(Self::Custom(other.to_string()))
                } else {
                    Err(ConfigError::InvalidApiVersion {
                        version: other.to_string(),
                    })
                }
            }
        }
    }
}

impl ApiVersion {
    /// Checks the `YYYY-MM` shape without pinning to a known release.
    fn looks_like_version(s: &str) -> bool {
        let bytes = s.as_bytes();
        bytes.len() == 7
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[4] == b'-'
            && bytes[5..].iter().all(u8::is_ascii_digit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_is_stable() {
        assert!(ApiVersion::latest().is_stable());
    }

    #[test]
    fn test_display_round_trips_known_versions() {
        for version in ["2024-10", "2025-01", "2025-04", "2025-07", "2025-10"] {
            let parsed: ApiVersion = version.parse().unwrap();
            assert_eq!(parsed.to_string(), version);
            assert!(parsed.is_stable());
        }
    }

    #[test]
    fn test_unstable_parses() {
        let version: ApiVersion = "unstable".parse().unwrap();
        assert_eq!(version, ApiVersion::Unstable);
        assert!(!version.is_stable());
    }

    #[test]
    fn test_future_version_becomes_custom() {
        let version: ApiVersion = "2026-01".parse().unwrap();
        assert_eq!(version, ApiVersion::Custom("2026-01".to_string()));
        assert_eq!(version.to_string(), "2026-01");
        assert!(!version.is_stable());
    }

    #[test]
    fn test_invalid_version_rejected() {
        assert!("not-a-version".parse::<ApiVersion>().is_err());
        assert!("2025".parse::<ApiVersion>().is_err());
        assert!("2025-1".parse::<ApiVersion>().is_err());
    }
}
