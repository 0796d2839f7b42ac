//! Upstream path rewriting
//!
//! Pure mapping from the inbound model-path convention onto the upstream
//! platform's publisher scheme. Callers may ask for `v1beta` or `v1`; all
//! upstream traffic is pinned to a single API version regardless.

/// The single API version used for every upstream call
pub const UPSTREAM_API_VERSION: &str = "v1";

/// Inbound path prefixes recognized by the relay
const INBOUND_PREFIXES: [&str; 2] = ["/v1beta/models/", "/v1/models/"];

/// Rewrite an inbound path to its upstream form.
///
/// Returns `None` when the path does not follow the relay convention or
/// names no model. With a resolved project the rewritten path is scoped to
/// that project; without one the generic publisher form is produced, which
/// the upstream accepts when the caller's own key travels with the request.
pub fn rewrite(inbound_path: &str, project_id: Option<&str>) -> Option<String> {
    let rest = strip_inbound_prefix(inbound_path)?;

    Some(match project_id {
        Some(project_id) => format!(
            "/{}/projects/{}/locations/global/publishers/google/models/{}",
            UPSTREAM_API_VERSION, project_id, rest
        ),
        None => format!(
            "/{}/publishers/google/models/{}",
            UPSTREAM_API_VERSION, rest
        ),
    })
}

/// Strip a recognized prefix, returning the model-and-action suffix
fn strip_inbound_prefix(path: &str) -> Option<&str> {
    INBOUND_PREFIXES
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
}
