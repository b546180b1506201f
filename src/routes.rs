//! Binding of request paths to operations.

use std::sync::Arc;

use strum::IntoEnumIterator;

use crate::error::GatehouseError;
use crate::pattern::{CompiledPattern, PathMatch};
use crate::types::{Convention, Operation};

/// The path template each operation answers on.
///
/// Role operations are keyed on their trailing action alone, so that a path
/// of the wrong shape still reaches the operation and is rejected there with
/// its usage message.
pub fn default_template(operation: Operation) -> String {
    match operation.convention() {
        Some(Convention::GrantRecall) => format!("/{{path:.*}}/{operation}"),
        Some(Convention::FieldMutation) => format!("/{{class}}/{{id}}/{{field}}/{operation}"),
        None => format!("/{operation}"),
    }
}

/// Ordered `(pattern, operation)` pairs; the first matching pattern wins.
#[derive(Debug, Clone)]
pub struct OperationRoutes {
    routes: Vec<(Arc<CompiledPattern>, Operation)>,
}

impl OperationRoutes {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Every operation on its default template. Exact routes come first; the
    /// role operations follow as prefix routes.
    pub fn defaults() -> Result<Self, GatehouseError> {
        let (prefixed, exact): (Vec<_>, Vec<_>) = Operation::iter()
            .partition(|operation| operation.convention() == Some(Convention::GrantRecall));

        let routes = exact.into_iter().try_fold(Self::new(), |routes, operation| {
            routes.with_route(&default_template(operation), operation)
        })?;
        prefixed.into_iter().try_fold(routes, |routes, operation| {
            routes.with_prefix_route(&default_template(operation), operation)
        })
    }

    /// Route paths matching `template` exactly.
    pub fn with_route(self, template: &str, operation: Operation) -> Result<Self, GatehouseError> {
        self.push(template, true, operation)
    }

    /// Route every path that starts with a match of `template`.
    pub fn with_prefix_route(
        self,
        template: &str,
        operation: Operation,
    ) -> Result<Self, GatehouseError> {
        self.push(template, false, operation)
    }

    fn push(
        mut self,
        template: &str,
        anchor_end: bool,
        operation: Operation,
    ) -> Result<Self, GatehouseError> {
        self.routes
            .push((CompiledPattern::cached(template, anchor_end)?, operation));
        Ok(self)
    }

    pub fn resolve(&self, path: &str) -> Option<(Operation, PathMatch)> {
        self.routes.iter().find_map(|(pattern, operation)| {
            let found = pattern.match_path(path);
            found.matched.then_some((*operation, found))
        })
    }

    pub fn templates(&self) -> impl Iterator<Item = (&str, Operation)> {
        self.routes
            .iter()
            .map(|(pattern, operation)| (pattern.template(), *operation))
    }
}

impl Default for OperationRoutes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_default_table() {
        let routes = OperationRoutes::defaults().unwrap();
        let templates: Vec<_> = routes.templates().collect();
        assert_eq!(
            templates,
            vec![
                ("/{class}/{id}/{field}/appendUnique", Operation::Append),
                ("/{class}/{id}/{field}/remove", Operation::Remove),
                ("/register", Operation::Register),
                ("/login", Operation::Login),
                ("/changePassword", Operation::ChangePassword),
                ("/resetPassword", Operation::ResetPassword),
                ("/{path:.*}/grantRole", Operation::GrantRole),
                ("/{path:.*}/recallRole", Operation::RecallRole),
            ]
        );
    }

    #[parameterized(
        grant = { "/users/42/grantRole", Operation::GrantRole, &[("path", "users/42")] },
        recall = { "/users/42/recallRole", Operation::RecallRole, &[("path", "users/42")] },
        append = { "/groups/g1/members/appendUnique", Operation::Append, &[("class", "groups"), ("id", "g1"), ("field", "members")] },
        remove = { "/groups/g1/members/remove", Operation::Remove, &[("class", "groups"), ("id", "g1"), ("field", "members")] },
        login = { "/login", Operation::Login, &[] },
        reset = { "/resetPassword", Operation::ResetPassword, &[] },
    )]
    fn test_resolve(path: &str, operation: Operation, params: &[(&str, &str)]) {
        let (resolved, found) = OperationRoutes::defaults().unwrap().resolve(path).unwrap();
        assert_eq!(resolved, operation);
        for (name, value) in params {
            assert_eq!(found.get(name), Some(*value));
        }
        assert_eq!(found.params.len(), params.len());
    }

    #[parameterized(
        other_collection = { "/groups/42/grantRole", Operation::GrantRole },
        capitalised_collection = { "/Users/42/grantRole", Operation::GrantRole },
        too_short = { "/users/grantRole", Operation::GrantRole },
        trailing_slash = { "/users/42/recallRole/", Operation::RecallRole },
        roles_field = { "/users/42/_roles/grantRole", Operation::GrantRole },
        field_named_like_action = { "/groups/g1/recallRole/remove", Operation::Remove },
    )]
    fn test_role_routes_accept_any_shape(path: &str, operation: Operation) {
        let (resolved, _) = OperationRoutes::defaults().unwrap().resolve(path).unwrap();
        assert_eq!(resolved, operation);
    }

    #[parameterized(
        unknown = { "/users/42/promote" },
        trailing = { "/login/now" },
        bare_action = { "/grantRole" },
        empty = { "" },
    )]
    fn test_unresolved(path: &str) {
        assert!(OperationRoutes::defaults().unwrap().resolve(path).is_none());
    }

    #[test]
    fn test_first_route_wins() {
        let routes = OperationRoutes::new()
            .with_route("/{anything}", Operation::Login)
            .unwrap()
            .with_route("/login", Operation::Register)
            .unwrap();
        assert_eq!(routes.resolve("/login").unwrap().0, Operation::Login);
    }

    #[test]
    fn test_prefix_route() {
        let routes = OperationRoutes::new()
            .with_prefix_route("/admin", Operation::Login)
            .unwrap();
        assert_eq!(routes.resolve("/admin/extra").unwrap().0, Operation::Login);
        assert!(routes.resolve("/other").is_none());
    }
}
