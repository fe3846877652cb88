//! Path resolution for the directory restriction layer.
//!
//! [`LexicalPath`] never looks at the disk: `.` and `..` are folded by hand.
//! `/` always separates components. `\` separates them only in
//! Windows-style paths, which are every path on Windows plus any path
//! starting with a drive (`C:`); those compare case-insensitively. On Unix
//! a backslash is an ordinary file name character, exactly as the kernel
//! sees it.
//!
//! [`PathGuard`] applies the same resolution at execution time and then
//! follows symlinks, so the file an action touches is the one the policy
//! checked.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ApprovalError, ApprovalResult};

/// A path reduced to absolute, normalized components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalPath {
    components: Vec<String>,
    windows: bool,
}

impl LexicalPath {
    /// Resolve `path` against `base` and fold `.` / `..`.
    ///
    /// `base` is used only when `path` is relative.
    #[must_use]
    pub fn resolve(base: &Path, path: &Path) -> Self {
        let raw = path.to_string_lossy();
        let base = base.to_string_lossy();
        let absolute = is_absolute_like(&raw);
        let windows = windows_style(&raw) || (!absolute && windows_style(&base));

        let mut components = Vec::new();
        if !absolute {
            push_components(&mut components, &base, windows);
        }
        push_components(&mut components, &raw, windows);
        Self {
            components,
            windows,
        }
    }

    /// Parse an absolute prefix such as `/etc` or `C:\Windows`.
    #[must_use]
    pub fn prefix(raw: &str) -> Self {
        Self::resolve(Path::new("/"), Path::new(raw))
    }

    /// Normalized components, drive first for Windows-style paths.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Whether this path uses the conventions of the running platform.
    ///
    /// A drive path seen on Unix is not: no file it names can be opened.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.windows == cfg!(windows)
    }

    /// The path as the operating system should receive it.
    #[must_use]
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.to_string())
    }

    /// Component-wise prefix test. `/etc` covers `/etc/hosts` but not
    /// `/etcetera`.
    #[must_use]
    pub fn starts_with(&self, prefix: &LexicalPath) -> bool {
        if prefix.components.len() > self.components.len() {
            return false;
        }
        let fold = self.windows || prefix.windows;
        self.components
            .iter()
            .zip(&prefix.components)
            .all(|(a, b)| if fold { a.eq_ignore_ascii_case(b) } else { a == b })
    }

    /// Whether any component contains `needle`, ignoring ASCII case.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.components
            .iter()
            .any(|c| c.to_ascii_lowercase().contains(&needle))
    }

    fn from_real(path: &Path) -> Self {
        let raw = path.to_string_lossy();
        // Windows canonical paths carry the verbatim prefix.
        let raw = raw.strip_prefix(r"\\?\").unwrap_or(&raw);
        Self::prefix(raw)
    }
}

impl fmt::Display for LexicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.components.split_first() {
            Some((drive, rest)) if is_drive(drive) => {
                write!(f, "{drive}\\")?;
                f.write_str(&rest.join("\\"))
            },
            _ => write!(f, "/{}", self.components.join("/")),
        }
    }
}

/// Execution-time confinement for file actions.
///
/// Holds the base directory and restricted prefixes of one policy.
/// [`confine`](Self::confine) touches the filesystem, so call it from a
/// blocking context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGuard {
    base_dir: PathBuf,
    restricted: Vec<LexicalPath>,
}

impl PathGuard {
    /// Guard resolving relative paths against `base_dir` and refusing
    /// anything under `restricted`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, restricted: Vec<LexicalPath>) -> Self {
        Self {
            base_dir: base_dir.into(),
            restricted,
        }
    }

    /// Directory relative paths resolve against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `path` and follow symlinks in every existing ancestor.
    ///
    /// The returned path is absolute and is what the driver must open.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::PathRefused`] when the path is foreign to this
    /// platform, ends in a dangling symlink, or lands, before or after
    /// symlinks are followed, under a restricted directory.
    pub fn confine(&self, path: &Path) -> ApprovalResult<PathBuf> {
        let lexical = LexicalPath::resolve(&self.base_dir, path);
        if !lexical.is_native() {
            return Err(refused(path, format!("'{lexical}' is not a path on this platform")));
        }
        if let Some(prefix) = self.restriction(&lexical, false) {
            return Err(refused(path, format!("it is inside restricted directory '{prefix}'")));
        }

        let real = real_path(&lexical.to_path_buf()).map_err(|reason| refused(path, reason))?;
        if let Some(prefix) = self.restriction(&LexicalPath::from_real(&real), true) {
            return Err(refused(
                path,
                format!("it resolves to '{}' inside restricted directory '{prefix}'", real.display()),
            ));
        }
        Ok(real)
    }

    /// The restricted prefix covering `path`. With `follow`, prefixes that
    /// are themselves symlinks are compared by their targets too.
    fn restriction(&self, path: &LexicalPath, follow: bool) -> Option<LexicalPath> {
        self.restricted.iter().find_map(|prefix| {
            if path.starts_with(prefix) {
                return Some(prefix.clone());
            }
            if !follow || !prefix.is_native() {
                return None;
            }
            let real = std::fs::canonicalize(prefix.to_path_buf()).ok()?;
            let real = LexicalPath::from_real(&real);
            path.starts_with(&real).then(|| prefix.clone())
        })
    }
}

fn refused(path: &Path, reason: String) -> ApprovalError {
    ApprovalError::PathRefused {
        path: path.display().to_string(),
        reason,
    }
}

/// Canonicalize the deepest existing ancestor of `path` and append the
/// components that do not exist yet.
fn real_path(path: &Path) -> Result<PathBuf, String> {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        match std::fs::canonicalize(existing) {
            Ok(real) => return Ok(missing.iter().rev().fold(real, |acc, name| acc.join(name))),
            // Present but unresolvable: a dangling or looping symlink.
            Err(_) if std::fs::symlink_metadata(existing).is_ok() => {
                return Err(format!("'{}' is a symlink that cannot be resolved", existing.display()));
            },
            Err(_) => {},
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            },
            _ => return Ok(path.to_path_buf()),
        }
    }
}

fn is_drive(component: &str) -> bool {
    let bytes = component.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn windows_style(raw: &str) -> bool {
    cfg!(windows) || raw.split(['/', '\\']).next().is_some_and(is_drive)
}

fn is_absolute_like(raw: &str) -> bool {
    raw.starts_with('/')
        || (windows_style(raw)
            && (raw.starts_with('\\') || raw.split(['/', '\\']).next().is_some_and(is_drive)))
}

fn push_components(out: &mut Vec<String>, raw: &str, windows: bool) {
    let separators: &[char] = if windows { &['/', '\\'] } else { &['/'] };
    for part in raw.split(separators) {
        match part {
            "" | "." => {},
            ".." => {
                // A drive is the root of a Windows path and is never popped.
                let root = usize::from(out.first().is_some_and(|c| is_drive(c)));
                if out.len() > root {
                    out.pop();
                }
            },
            other => out.push(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_joins_base() {
        let p = LexicalPath::resolve(Path::new("/home/user/docs"), Path::new("notes/today.txt"));
        assert_eq!(p.to_string(), "/home/user/docs/notes/today.txt");
    }

    #[test]
    fn test_absolute_ignores_base() {
        let p = LexicalPath::resolve(Path::new("/home/user"), Path::new("/tmp/a.txt"));
        assert_eq!(p.to_string(), "/tmp/a.txt");
    }

    #[test]
    fn test_dot_dot_folds() {
        let p = LexicalPath::resolve(Path::new("/home/user"), Path::new("../../etc/./passwd"));
        assert_eq!(p.to_string(), "/etc/passwd");
        assert!(p.starts_with(&LexicalPath::prefix("/etc")));
    }

    #[test]
    fn test_dot_dot_stops_at_root() {
        let p = LexicalPath::resolve(Path::new("/"), Path::new("../../../etc/hosts"));
        assert_eq!(p.to_string(), "/etc/hosts");
    }

    #[test]
    fn test_prefix_is_component_wise() {
        let etc = LexicalPath::prefix("/etc");
        assert!(!LexicalPath::prefix("/etcetera/file.txt").starts_with(&etc));
        assert!(LexicalPath::prefix("/etc").starts_with(&etc));
    }

    #[test]
    fn test_windows_paths_fold_case() {
        let windows = LexicalPath::prefix(r"C:\Windows");
        let target = LexicalPath::resolve(Path::new("/home/user"), Path::new(r"c:\WINDOWS\system32\x.txt"));
        assert!(target.starts_with(&windows));
        assert_eq!(target.to_string(), r"c:\WINDOWS\system32\x.txt");
    }

    #[test]
    fn test_windows_drive_is_root() {
        let p = LexicalPath::prefix(r"C:\Users\..\..\Windows\x.txt");
        assert_eq!(p.components(), ["C:", "Windows", "x.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_backslash_is_a_name_character_on_unix() {
        let p = LexicalPath::prefix(r"/etc/a\..\..\tmp/x.txt");
        assert_eq!(p.components(), ["etc", r"a\..\..\tmp", "x.txt"]);
        assert!(p.starts_with(&LexicalPath::prefix("/etc")));
        assert_eq!(p.to_path_buf(), PathBuf::from(r"/etc/a\..\..\tmp/x.txt"));
        assert!(p.is_native());
    }

    #[cfg(unix)]
    #[test]
    fn test_drive_paths_are_foreign_on_unix() {
        assert!(!LexicalPath::prefix(r"C:\Windows\x.txt").is_native());
    }

    #[test]
    fn test_mentions() {
        let p = LexicalPath::prefix("/home/user/System Files/a.txt");
        assert!(p.mentions("system"));
        assert!(!p.mentions("program"));
    }

    fn guard(base: &Path, restricted: &[&Path]) -> PathGuard {
        PathGuard::new(
            base,
            restricted
                .iter()
                .map(|p| LexicalPath::prefix(&p.to_string_lossy()))
                .collect(),
        )
    }

    #[test]
    fn test_guard_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let real_dir = std::fs::canonicalize(dir.path()).unwrap();
        let g = guard(dir.path(), &[]);

        let path = g.confine(Path::new("notes/new.txt")).unwrap();
        assert_eq!(path, real_dir.join("notes").join("new.txt"));
    }

    #[test]
    fn test_guard_refuses_restricted_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        let g = guard(dir.path(), &[&locked]);

        let err = g.confine(Path::new("locked/../locked/x.txt")).unwrap_err();
        assert!(matches!(err, ApprovalError::PathRefused { .. }));
        assert!(g.confine(Path::new("open/x.txt")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_keeps_backslash_names_inside_restricted_dir() {
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        let g = guard(dir.path(), &[&locked]);

        let sneaky = format!(r"{}/a\..\..\ok/x.txt", locked.display());
        assert!(g.confine(Path::new(&sneaky)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_follows_symlinks_into_restricted_dir() {
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::os::unix::fs::symlink(&locked, dir.path().join("shortcut")).unwrap();
        let g = guard(dir.path(), &[&locked]);

        let err = g.confine(Path::new("shortcut/new/x.txt")).unwrap_err();
        assert!(err.to_string().contains("resolves to"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_matches_symlinked_restricted_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        std::fs::create_dir(&target).unwrap();
        let alias = dir.path().join("alias");
        std::os::unix::fs::symlink(&target, &alias).unwrap();
        let g = guard(dir.path(), &[&alias]);

        assert!(g.confine(Path::new("target/x.txt")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_refuses_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("link.txt")).unwrap();
        let g = guard(dir.path(), &[]);

        assert!(g.confine(Path::new("link.txt")).is_err());
    }
}
