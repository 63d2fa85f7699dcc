use crate::error::{Error, Result};

/// Moves a discovered hostname into `target_domain`.
///
/// "build-box.local." with target "example.com" becomes
/// "build-box.example.com.". Everything after the first label is treated as
/// the discovery domain and dropped. Names come off the network, so anything
/// without a non-empty first label and a non-empty remainder is rejected.
pub fn rewrite(native: &str, target_domain: &str) -> Result<String> {
    let (label, rest) = native
        .split_once('.')
        .ok_or_else(|| Error::MalformedEntry(native.to_string()))?;
    if label.is_empty() || rest.trim_end_matches('.').is_empty() {
        return Err(Error::MalformedEntry(native.to_string()));
    }
    Ok(format!("{}.{}.", label, target_domain.trim_end_matches('.')))
}

/// The suffix every rewritten name ends with: ".example.com."
pub fn qualified_suffix(target_domain: &str) -> String {
    format!(".{}.", target_domain.trim_end_matches('.'))
}
