//! Best-method-match selection among the policies declared for an action.

use super::policy::Policy;

/// Pick the policy that best applies to `method`.
///
/// A policy naming the method explicitly beats a wildcard, and among explicit
/// matches the one with the fewest methods wins; equal sizes fall back to
/// declaration order. Without an explicit match the first wildcard is used.
pub fn select_policy<'a>(method: &str, policies: &'a [Policy]) -> Option<&'a Policy> {
    let specific = policies
        .iter()
        .enumerate()
        .filter(|(_, policy)| !policy.methods.is_wildcard() && policy.methods.contains(method))
        .min_by_key(|(index, policy)| (policy.methods.len(), *index))
        .map(|(_, policy)| policy);

    specific.or_else(|| policies.iter().find(|policy| policy.methods.is_wildcard()))
}
