//! Points the host's resolver at us while the daemon runs.
//!
//! Injected nameserver lines carry a trailing marker so they can be found and
//! removed again at shutdown without touching anything else in the file.

use std::ffi::OsString;
use std::path::Path;
use crate::error::Result;

const MARKER: &str = "# mdns-dnsd";

/// Strip injected lines, then insert `nameservers` ahead of the existing ones.
pub fn inject(contents: &str, nameservers: &[String]) -> String {
    let lines: Vec<&str> = contents.lines().filter(|line| !is_injected(line)).collect();
    let insert_at = lines
        .iter()
        .position(|line| line.trim_start().starts_with("nameserver"))
        .unwrap_or(lines.len());

    let injected = nameservers
        .iter()
        .map(|ns| format!("nameserver {} {}", ns, MARKER));

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + nameservers.len());
    out.extend(lines[..insert_at].iter().map(|l| l.to_string()));
    out.extend(injected);
    out.extend(lines[insert_at..].iter().map(|l| l.to_string()));
    render(out)
}

/// Remove every injected line.
pub fn restore(contents: &str) -> String {
    render(
        contents
            .lines()
            .filter(|line| !is_injected(line))
            .map(str::to_string)
            .collect(),
    )
}

fn is_injected(line: &str) -> bool {
    line.trim_end().ends_with(MARKER)
}

fn render(lines: Vec<String>) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Rewrite `path` with `nameservers` injected; an empty list restores it.
pub fn apply(path: impl AsRef<Path>, nameservers: &[String]) -> Result<()> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let updated = if nameservers.is_empty() {
        restore(&contents)
    } else {
        inject(&contents, nameservers)
    };
    if updated != contents {
        replace_file(path, &updated)?;
    }
    Ok(())
}

/// Write `contents` to a sibling temp file and rename it over `path`, so
/// readers never see a half-written file. Symlinks are followed and the
/// original permissions are kept.
fn replace_file(path: &Path, contents: &str) -> Result<()> {
    let target = std::fs::canonicalize(path)?;
    let mut tmp_name = OsString::from(".");
    tmp_name.push(target.file_name().unwrap_or_default());
    tmp_name.push(".mdns-dnsd.tmp");
    let tmp = target.with_file_name(tmp_name);

    let permissions = std::fs::metadata(&target)?.permissions();
    let written = std::fs::write(&tmp, contents)
        .and_then(|_| std::fs::set_permissions(&tmp, permissions))
        .and_then(|_| std::fs::rename(&tmp, &target));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Startup half of the hook. Write failures are logged, not fatal.
pub fn on_startup(path: &Path, nameservers: &[String]) {
    if nameservers.is_empty() {
        return;
    }
    match apply(path, nameservers) {
        Ok(()) => tracing::info!("Injected nameservers {:?} into {}", nameservers, path.display()),
        Err(e) => tracing::error!("Could not write dns nameserver in {}: {}", path.display(), e),
    }
}

pub fn on_shutdown(path: &Path, nameservers: &[String]) {
    if nameservers.is_empty() {
        return;
    }
    match apply(path, &[]) {
        Ok(()) => tracing::info!("Restored {}", path.display()),
        Err(e) => tracing::error!("Could not restore {}: {}", path.display(), e),
    }
}
