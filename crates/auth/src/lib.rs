//! `grantflow-auth`: capability catalog, grant matrices and dependency-aware
//! grant evaluation.
//!
//! Pure: no HTTP, no storage, no clock reads outside of token validation.

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod dependencies;
pub mod error;
pub mod grants;
pub mod jwt;
pub mod principal;
pub mod resolver;
pub mod roles;

pub use authorize::{AuthorizationExplanation, DenialKind, DenialReason, authorize, explain_authorization};
pub use catalog::{Action, Capability, Module, all_capabilities};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use dependencies::{DEPENDENCY_RULES, DependencyRule, requirements_for};
pub use error::{GrantError, MissingDependency};
pub use grants::{GrantChanges, GrantSet, GrantSnapshot};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use principal::Principal;
pub use resolver::{ChangeSource, Decision, DependencyResolver, PendingChange, ProposedChange};
pub use roles::Role;

pub use grantflow_core::PrincipalId;
