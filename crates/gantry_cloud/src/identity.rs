//! Deployer identity resolution.

use gantry_core::Identity;
use tracing::debug;

use crate::error::{CloudError, CloudResult};

/// Environment variables read by [`EnvIdentity`].
pub const ACCOUNT_VAR: &str = "GANTRY_ACCOUNT_ID";
pub const REGION_VAR: &str = "GANTRY_REGION";

/// Source of the ambient cloud account and region.
///
/// Resolution happens once, before any resource is declared; a failure
/// here halts the whole composition run.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self) -> CloudResult<Identity>;
}

/// Fixed identity, used by tests and dry-runs.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    identity: Identity,
}

impl StaticIdentity {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            identity: Identity::new(account_id, region),
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn resolve(&self) -> CloudResult<Identity> {
        Ok(self.identity.clone())
    }
}

/// Identity resolved from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvIdentity;

impl EnvIdentity {
    pub fn new() -> Self {
        Self
    }

    fn read(var: &str) -> CloudResult<String> {
        std::env::var(var).map_err(|_| {
            CloudError::Identity(format!("environment variable {} is not set", var))
        })
    }
}

impl IdentityProvider for EnvIdentity {
    fn resolve(&self) -> CloudResult<Identity> {
        let account_id = Self::read(ACCOUNT_VAR)?;
        let region = Self::read(REGION_VAR)?;
        debug!("Resolved identity from environment: {}/{}", account_id, region);
        Ok(Identity::new(account_id, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity() {
        let provider = StaticIdentity::new("218821328974", "us-west-1");
        let identity = provider.resolve().unwrap();
        assert_eq!(identity.account_id, "218821328974");
        assert_eq!(identity.region, "us-west-1");
    }

    #[test]
    fn test_mocked_identity_failure() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_resolve()
            .returning(|| Err(CloudError::Identity("no credential source".to_string())));

        assert!(matches!(
            provider.resolve(),
            Err(CloudError::Identity(_))
        ));
    }
}
