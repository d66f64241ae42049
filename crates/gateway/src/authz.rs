use tollgate_core::{RouteEntry, ScopeSpec, TokenRecord};

use crate::error::GatewayError;

/// The service name a route prefix grants access to: its second non-empty
/// path segment (`/api/image` -> `image`).
pub fn service_name(path_prefix: &str) -> Option<&str> {
    path_prefix.split('/').filter(|s| !s.is_empty()).nth(1)
}

/// Decide whether `token` may call `route`.
///
/// Allowed when the token holds `*`, the route's service name, or a
/// `tag:` scope naming one of the route's tags.
pub fn authorize(token: &TokenRecord, route: &RouteEntry) -> Result<(), GatewayError> {
    if token.scopes.contains(&ScopeSpec::All) {
        return Ok(());
    }

    let service = service_name(&route.path_prefix);
    let service_allowed = service.is_some_and(|service| {
        token
            .scopes
            .iter()
            .any(|scope| matches!(scope, ScopeSpec::Service(name) if name == service))
    });
    if service_allowed {
        return Ok(());
    }

    let tag_allowed = token
        .scopes
        .iter()
        .filter_map(ScopeSpec::as_tag)
        .any(|tag| route.tags.contains(tag));
    if tag_allowed {
        return Ok(());
    }

    Err(GatewayError::PermissionDenied {
        service: service.unwrap_or(&route.path_prefix).to_owned(),
        scopes: token.scope_list(),
    })
}
