use serde::Serialize;

use grantflow_core::PrincipalId;

use crate::catalog::Capability;
use crate::dependencies::{DEPENDENCY_RULES, requirements_for};
use crate::grants::GrantSet;

/// Authorization decision over a grant matrix.
///
/// - No IO
/// - No panics
/// - Inapplicable pairs are denied whatever the stored value says
pub fn authorize(grants: &GrantSet, capability: Capability) -> bool {
    capability.is_applicable() && grants.get(capability)
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Why a capability check came out the way it did.
///
/// The outcome is the same as [`authorize`]; the explanation only adds what a
/// permission editor needs to render a precise message.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub principal_id: PrincipalId,
    pub capability: Capability,
    pub granted: bool,
    pub reason: String,
    pub denial: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// The action does not exist on this module.
    NotApplicable,
    /// The action exists but is not granted.
    NotGranted,
}

pub fn explain_authorization(
    principal_id: PrincipalId,
    grants: &GrantSet,
    capability: Capability,
) -> AuthorizationExplanation {
    if !capability.is_applicable() {
        return AuthorizationExplanation {
            principal_id,
            capability,
            granted: false,
            reason: format!(
                "'{}' is not an action of module '{}'",
                capability.action, capability.module
            ),
            denial: Some(DenialReason {
                kind: DenialKind::NotApplicable,
                message: format!("{capability} cannot be granted to anyone"),
                suggestions: vec![format!(
                    "Applicable actions for '{}': {}",
                    capability.module,
                    capability
                        .module
                        .applicable_actions()
                        .iter()
                        .map(|a| a.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )],
            }),
        };
    }

    if grants.get(capability) {
        return AuthorizationExplanation {
            principal_id,
            capability,
            granted: true,
            reason: format!("Principal holds '{capability}'"),
            denial: None,
        };
    }

    let mut suggestions = vec![format!("Grant '{capability}' to the principal")];
    let unmet: Vec<String> = requirements_for(DEPENDENCY_RULES, capability)
        .iter()
        .filter(|c| !grants.get(**c))
        .map(|c| c.to_string())
        .collect();
    if !unmet.is_empty() {
        suggestions.push(format!(
            "Granting '{capability}' will also require: {}",
            unmet.join(", ")
        ));
    }

    AuthorizationExplanation {
        principal_id,
        capability,
        granted: false,
        reason: format!("Principal does not hold '{capability}'"),
        denial: Some(DenialReason {
            kind: DenialKind::NotGranted,
            message: format!("Missing required capability: '{capability}'"),
            suggestions,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Action, Module, all_capabilities};
    use proptest::prelude::*;

    #[test]
    fn granted_capability_is_allowed() {
        let mut grants = GrantSet::new();
        let cap = Capability::new(Module::Sales, Action::Approve);
        grants.set(cap, true).unwrap();
        assert!(authorize(&grants, cap));

        let explanation = explain_authorization(PrincipalId::new(), &grants, cap);
        assert!(explanation.granted);
        assert!(explanation.denial.is_none());
    }

    #[test]
    fn inapplicable_and_ungranted_are_both_denied_but_explained_differently() {
        let grants = GrantSet::full();
        let inapplicable = Capability::new(Module::Stock, Action::Approve);
        assert!(!authorize(&grants, inapplicable));
        let e = explain_authorization(PrincipalId::new(), &grants, inapplicable);
        assert_eq!(e.denial.unwrap().kind, DenialKind::NotApplicable);

        let grants = GrantSet::new();
        let ungranted = Capability::new(Module::Stock, Action::Read);
        assert!(!authorize(&grants, ungranted));
        let e = explain_authorization(PrincipalId::new(), &grants, ungranted);
        assert_eq!(e.denial.unwrap().kind, DenialKind::NotGranted);
    }

    #[test]
    fn denial_suggests_unmet_dependencies() {
        let grants = GrantSet::new();
        let cap = Capability::new(Module::Stock, Action::Create);
        let e = explain_authorization(PrincipalId::new(), &grants, cap);
        let suggestions = e.denial.unwrap().suggestions;
        assert!(suggestions.iter().any(|s| s.contains("category:read, warehouse:read")));
    }

    fn arb_inapplicable() -> impl Strategy<Value = Capability> {
        let caps: Vec<Capability> = Module::ALL
            .iter()
            .flat_map(|m| Action::ALL.iter().map(move |a| Capability::new(*m, *a)))
            .filter(|c| !c.is_applicable())
            .collect();
        proptest::sample::select(caps)
    }

    proptest! {
        #[test]
        fn inapplicable_pairs_are_never_authorized(cap in arb_inapplicable()) {
            // even a matrix with everything applicable granted says no
            let mut grants = GrantSet::new();
            for c in all_capabilities() {
                grants.set(c, true).unwrap();
            }
            prop_assert!(!authorize(&grants, cap));
        }
    }
}
