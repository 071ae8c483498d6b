//! Branch gating for the invocation shim.

/// True when `branch` participates in serialization.
///
/// `list` is a comma-separated allow-list; empty or whitespace-only
/// means every branch participates.
pub fn branch_enabled(list: &str, branch: &str) -> bool {
    let mut entries = list
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .peekable();
    if entries.peek().is_none() {
        return true;
    }
    entries.any(|e| e == branch)
}
