//! `Location` rewriting for upstream redirects.
//!
//! Backends redirect in their own address space. A redirect that points back
//! at the backend is moved under the gateway host and the route's prefix so
//! the caller stays on the gateway; everything else passes through.

use std::borrow::Cow;

use url::Url;

/// What a `Location` value is rewritten against.
#[derive(Debug, Clone, Copy)]
pub struct RedirectContext<'a> {
    pub backend_base_url: &'a str,
    pub matched_prefix: &'a str,
    pub gateway_scheme: &'a str,
    /// Host (with optional port) callers use to reach the gateway.
    pub gateway_host: &'a str,
}

/// Rewrite a redirect target.
///
/// - Absolute URL on the backend's host: re-rooted at the gateway
///   under the matched prefix, keeping path, query and fragment.
/// - Absolute URL on the gateway host, or on any other host: unchanged.
/// - Absolute path: re-rooted at the gateway under the matched prefix.
/// - Network-path reference (`//host/...`): resolved with the backend's
///   scheme, then handled as an absolute URL.
/// - Anything else (relative references): unchanged.
///
/// Ports are compared only when both the backend base URL and the target
/// carry an explicit one.
///
/// A path already under the matched prefix is not prefixed again, and a
/// backend base path (`https://svc/v1`) is stripped before prefixing.
pub fn rewrite_location<'l>(location: &'l str, ctx: &RedirectContext<'_>) -> Cow<'l, str> {
    let backend = Url::parse(ctx.backend_base_url).ok();

    if let Some(rest) = location.strip_prefix("//") {
        let Some(backend) = &backend else {
            return Cow::Borrowed(location);
        };
        let resolved = format!("{}://{rest}", backend.scheme());
        return match rewrite_absolute(&resolved, Some(backend), ctx) {
            Some(rewritten) => Cow::Owned(rewritten),
            None => Cow::Borrowed(location),
        };
    }

    if location.starts_with('/') {
        let split = location.find(['?', '#']).unwrap_or(location.len());
        let (path, suffix) = location.split_at(split);
        let path = gateway_path(path, backend.as_ref(), ctx.matched_prefix);
        return Cow::Owned(format!("{}{suffix}", gateway_origin(ctx, &path)));
    }

    match rewrite_absolute(location, backend.as_ref(), ctx) {
        Some(rewritten) => Cow::Owned(rewritten),
        None => Cow::Borrowed(location),
    }
}

fn rewrite_absolute(location: &str, backend: Option<&Url>, ctx: &RedirectContext<'_>) -> Option<String> {
    let target = Url::parse(location).ok()?;
    let host = target.host_str()?;

    let authority = match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    if authority.eq_ignore_ascii_case(ctx.gateway_host) {
        return None;
    }

    let backend = backend?;
    let same_host = backend
        .host_str()
        .is_some_and(|b| b.eq_ignore_ascii_case(host));
    // Ports conflict only when both sides are explicit.
    let port_conflict = matches!((backend.port(), target.port()), (Some(b), Some(t)) if b != t);
    if !same_host || port_conflict {
        return None;
    }

    let path = gateway_path(target.path(), Some(backend), ctx.matched_prefix);
    let mut rewritten = gateway_origin(ctx, &path);
    if let Some(query) = target.query() {
        rewritten.push('?');
        rewritten.push_str(query);
    }
    if let Some(fragment) = target.fragment() {
        rewritten.push('#');
        rewritten.push_str(fragment);
    }
    Some(rewritten)
}

/// Map a backend path into the gateway's path space.
fn gateway_path(path: &str, backend: Option<&Url>, matched_prefix: &str) -> String {
    let base_path = backend.map_or("", |b| b.path().trim_end_matches('/'));
    let path = strip_segment_prefix(path, base_path).unwrap_or(path);

    let prefix = matched_prefix.trim_end_matches('/');
    if prefix.is_empty() || strip_segment_prefix(path, prefix).is_some() {
        return path.to_owned();
    }
    format!("{prefix}{path}")
}

/// `path` with `prefix` removed, if `prefix` ends on a segment boundary.
fn strip_segment_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    if prefix.is_empty() {
        return None;
    }
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

fn gateway_origin(ctx: &RedirectContext<'_>, path: &str) -> String {
    format!("{}://{}{path}", ctx.gateway_scheme, ctx.gateway_host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(backend: &'a str, prefix: &'a str) -> RedirectContext<'a> {
        RedirectContext {
            backend_base_url: backend,
            matched_prefix: prefix,
            gateway_scheme: "https",
            gateway_host: "gw.example.com",
        }
    }

    #[test]
    fn same_host_absolute_is_rerooted() {
        let c = ctx("https://svc.internal", "/api/docs");
        assert_eq!(
            rewrite_location("https://svc.internal/new-page", &c),
            "https://gw.example.com/api/docs/new-page"
        );
        assert_eq!(
            rewrite_location("https://svc.internal/a?x=1#frag", &c),
            "https://gw.example.com/api/docs/a?x=1#frag"
        );
    }

    #[test]
    fn other_host_passes_through() {
        let c = ctx("https://svc.internal", "/api/docs");
        let external = "https://login.example.org/authorize?next=1";
        assert!(matches!(rewrite_location(external, &c), Cow::Borrowed(_)));
    }

    #[test]
    fn same_host_different_port_passes_through() {
        let c = ctx("http://svc.internal:8080", "/api/docs");
        assert_eq!(
            rewrite_location("http://svc.internal:9090/x", &c),
            "http://svc.internal:9090/x"
        );
        assert_eq!(
            rewrite_location("http://svc.internal:8080/x", &c),
            "https://gw.example.com/api/docs/x"
        );
    }

    #[test]
    fn scheme_change_on_backend_host_is_rerooted() {
        let c = ctx("http://svc.internal", "/api/docs");
        assert_eq!(
            rewrite_location("https://svc.internal/new-page", &c),
            "https://gw.example.com/api/docs/new-page"
        );
        let c = ctx("http://svc.internal:8080", "/api/docs");
        assert_eq!(
            rewrite_location("https://svc.internal/x", &c),
            "https://gw.example.com/api/docs/x"
        );
    }

    #[test]
    fn absolute_path_is_prefixed() {
        let c = ctx("https://svc.internal", "/api/docs");
        assert_eq!(
            rewrite_location("/login?next=%2F", &c),
            "https://gw.example.com/api/docs/login?next=%2F"
        );
    }

    #[test]
    fn relative_reference_passes_through() {
        let c = ctx("https://svc.internal", "/api/docs");
        assert_eq!(rewrite_location("next-page", &c), "next-page");
        assert_eq!(rewrite_location("../up", &c), "../up");
        assert_eq!(rewrite_location("?page=2", &c), "?page=2");
    }

    #[test]
    fn rewriting_twice_is_stable() {
        let c = ctx("https://svc.internal", "/api/docs");
        let once = rewrite_location("https://svc.internal/new-page", &c).into_owned();
        let twice = rewrite_location(&once, &c);
        assert_eq!(twice, once);
    }

    #[test]
    fn already_prefixed_path_is_not_doubled() {
        let c = ctx("https://svc.internal", "/api/docs");
        assert_eq!(
            rewrite_location("/api/docs/page", &c),
            "https://gw.example.com/api/docs/page"
        );
        assert_eq!(
            rewrite_location("/api/docs-old/page", &c),
            "https://gw.example.com/api/docs/api/docs-old/page"
        );
    }

    #[test]
    fn backend_base_path_is_stripped() {
        let c = ctx("https://svc.internal/v1/", "/api/docs");
        assert_eq!(
            rewrite_location("https://svc.internal/v1/items", &c),
            "https://gw.example.com/api/docs/items"
        );
        assert_eq!(
            rewrite_location("/v1/items", &c),
            "https://gw.example.com/api/docs/items"
        );
        assert_eq!(
            rewrite_location("/v10/items", &c),
            "https://gw.example.com/api/docs/v10/items"
        );
    }

    #[test]
    fn network_path_uses_backend_scheme() {
        let c = ctx("https://svc.internal", "/api/docs");
        assert_eq!(
            rewrite_location("//svc.internal/x", &c),
            "https://gw.example.com/api/docs/x"
        );
        assert_eq!(rewrite_location("//cdn.example/x", &c), "//cdn.example/x");
    }

    #[test]
    fn host_comparison_ignores_case() {
        let c = ctx("https://svc.internal", "/api/docs");
        assert_eq!(
            rewrite_location("https://SVC.internal/x", &c),
            "https://gw.example.com/api/docs/x"
        );
    }
}
