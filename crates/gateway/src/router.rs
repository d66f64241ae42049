use tollgate_core::{RouteEntry, RouteTable};

use crate::error::GatewayError;

/// A route selected for a request path.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    /// The request path with the matched prefix removed.
    pub residual: &'a str,
}

impl RouteMatch<'_> {
    pub fn prefix(&self) -> &str {
        &self.entry.path_prefix
    }
}

/// Select the route whose prefix is the longest string prefix of `path`.
///
/// Matching is plain string prefixing, so `/api/image` also matches
/// `/api/images`. Equal-length candidates are tried in lexicographic order.
pub fn match_route<'a>(table: &'a RouteTable, path: &'a str) -> Result<RouteMatch<'a>, GatewayError> {
    let mut candidates: Vec<&RouteEntry> = table.entries().iter().collect();
    candidates.sort_by(|a, b| {
        b.path_prefix
            .len()
            .cmp(&a.path_prefix.len())
            .then_with(|| a.path_prefix.cmp(&b.path_prefix))
    });

    candidates
        .into_iter()
        .find_map(|entry| {
            path.strip_prefix(entry.path_prefix.as_str())
                .map(|residual| RouteMatch { entry, residual })
        })
        .ok_or_else(|| GatewayError::RouteNotFound(path.to_owned()))
}
