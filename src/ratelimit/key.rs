//! Counter key derivation.

use super::action::ActionIdentity;
use super::policy::MethodSet;

/// Identifies the counter a policy is tracked under.
///
/// The policy's method set is part of the key, so an action with separate
/// per-method policies keeps a separate counter for each of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// A policy declared on a controller action
    Action {
        methods: MethodSet,
        action: ActionIdentity,
    },
    /// A policy matched by request path pattern
    Path { methods: MethodSet, pattern: String },
}

impl RateLimitKey {
    pub fn for_action(methods: &MethodSet, action: &ActionIdentity) -> Self {
        RateLimitKey::Action {
            methods: methods.clone(),
            action: action.clone(),
        }
    }

    pub fn for_path(methods: &MethodSet, pattern: &str) -> Self {
        RateLimitKey::Path {
            methods: methods.clone(),
            pattern: pattern.to_string(),
        }
    }

    /// The string the counter store is addressed with.
    pub fn to_string_key(&self) -> String {
        match self {
            RateLimitKey::Action { methods, action } => format!(
                "{}:{}:{}",
                methods.key_fragment(),
                action.controller,
                action.action
            ),
            RateLimitKey::Path { methods, pattern } => {
                format!("{}:{}", methods.key_fragment(), pattern)
            }
        }
    }
}

impl std::fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_action_key() {
        let action = ActionIdentity::new("app::MockController", "mockAction");
        let key = RateLimitKey::for_action(&MethodSet::any(), &action);
        assert_eq!(key.to_string_key(), ":app::MockController:mockAction");
    }

    #[test]
    fn test_method_specific_action_key() {
        let action = ActionIdentity::new("Users", "edit");
        let key = RateLimitKey::for_action(&MethodSet::new(["POST", "PUT"]), &action);
        assert_eq!(key.to_string(), "POST.PUT:Users:edit");
    }

    #[test]
    fn test_path_key() {
        let key = RateLimitKey::for_path(&MethodSet::new(["GET"]), "/api/*");
        assert_eq!(key.to_string_key(), "GET:/api/*");
    }

    #[test]
    fn test_keys_are_stable() {
        let action = ActionIdentity::new("Users", "list");
        let a = RateLimitKey::for_action(&MethodSet::new(["get"]), &action);
        let b = RateLimitKey::for_action(&MethodSet::new(["GET"]), &action);
        assert_eq!(a, b);
        assert_eq!(a.to_string_key(), b.to_string_key());
    }
}
