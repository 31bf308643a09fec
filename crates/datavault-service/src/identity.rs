//! The verified caller of one in-flight request.

use datavault_vault::Claims;

/// The login bound to a request after its token verified.
///
/// Built only from verified token [`Claims`]; passed explicitly into each
/// authenticated [`VaultService`](crate::VaultService) operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdentity {
    login: String,
}

impl CallIdentity {
    /// Bind the login carried by verified `claims`.
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            login: claims.login.clone(),
        }
    }

    /// The caller's login.
    pub fn login(&self) -> &str {
        &self.login
    }
}

impl std::fmt::Display for CallIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.login)
    }
}
