//! Dual-representation paths: a human-materialized projection and a
//! backend-identifier projection over the same ordered sequence of parts
//! (specification §3 "Path" and §4.2).

use std::fmt;

/// One segment of a [`Path`]: a display name and, for backends that key
/// entities by opaque id, the id assigned to this segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPart {
    name: String,
    identifier: Option<String>,
}

impl PathPart {
    /// Builds a part with no identifier (permissive construction; id-based
    /// backends resolve it later via `revalidate_path`).
    pub fn new(name: impl Into<String>) -> Self {
        PathPart {
            name: name.into(),
            identifier: None,
        }
    }

    /// Builds a part that already carries a backend identifier.
    pub fn with_id(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        PathPart {
            name: name.into(),
            identifier: Some(identifier.into()),
        }
    }

    /// The segment's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The segment's backend-assigned identifier, if resolved.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Returns a copy of this part with the identifier set.
    pub fn identified(&self, identifier: impl Into<String>) -> Self {
        PathPart {
            name: self.name.clone(),
            identifier: Some(identifier.into()),
        }
    }
}

/// An ordered sequence of [`PathPart`]s, always rooted at `/`.
///
/// Invariants (specification §3):
/// - Always begins with `/`. Folder paths end with `/`; file paths never do.
/// - The last part may lack an identifier; all non-last parts must carry one
///   when addressing an id-based backend.
/// - Two paths are equal iff their parts are equal under both the
///   materialized and identifier projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    parts: Vec<PathPart>,
    is_dir: bool,
}

impl Path {
    /// The root path `/`, always a folder.
    pub fn root() -> Self {
        Path {
            parts: Vec::new(),
            is_dir: true,
        }
    }

    /// Builds a path from already-resolved parts.
    pub fn from_parts(parts: Vec<PathPart>, is_dir: bool) -> Self {
        Path { parts, is_dir }
    }

    /// Splits a raw materialized path string (e.g. `/Parent/Foo.txt`) into
    /// an unresolved [`Path`] — no identifiers are assigned. Backends call
    /// this as the first step of `validate_path`.
    pub fn split(raw: &str) -> Self {
        let is_dir = raw.ends_with('/') || raw.is_empty();
        let parts = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(PathPart::new)
            .collect();
        Path { parts, is_dir }
    }

    /// Whether this path is the root.
    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    /// Whether this path denotes a folder.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Whether this path denotes a file.
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    /// The parts making up this path, root-to-leaf.
    pub fn parts(&self) -> &[PathPart] {
        &self.parts
    }

    /// The display name of the final part, or empty string for the root.
    pub fn name(&self) -> &str {
        self.parts.last().map(|p| p.name()).unwrap_or("")
    }

    /// Builds a child path under this folder.
    ///
    /// # Panics
    /// Panics if `self` is not a folder — callers are expected to check
    /// `is_dir()` (or come from `validate_path`, which always returns
    /// folders for container paths) before calling this.
    pub fn child(&self, name: impl Into<String>, identifier: Option<String>, folder: bool) -> Self {
        assert!(self.is_dir, "cannot build a child of a file path");
        let mut parts = self.parts.clone();
        let name = name.into();
        parts.push(match identifier {
            Some(id) => PathPart::with_id(name, id),
            None => PathPart::new(name),
        });
        Path { parts, is_dir: folder }
    }

    /// The parent of this path. The root's parent is the root.
    pub fn parent(&self) -> Self {
        if self.parts.is_empty() {
            return Path::root();
        }
        let mut parts = self.parts.clone();
        parts.pop();
        Path { parts, is_dir: true }
    }

    /// Returns a copy of this path with the last part's display name
    /// replaced. The identifier, if any, is preserved.
    pub fn rename(&self, new_name: impl Into<String>) -> Self {
        let mut parts = self.parts.clone();
        if let Some(last) = parts.last_mut() {
            let identifier = last.identifier.clone();
            *last = PathPart {
                name: new_name.into(),
                identifier,
            };
        }
        Path {
            parts,
            is_dir: self.is_dir,
        }
    }

    /// Returns a copy of this path with the last part's identifier set.
    pub fn with_last_identifier(&self, identifier: impl Into<String>) -> Self {
        let mut parts = self.parts.clone();
        if let Some(last) = parts.last_mut() {
            *last = last.identified(identifier);
        }
        Path {
            parts,
            is_dir: self.is_dir,
        }
    }

    /// Applies the numeric-suffix conflict-resolution rule to the last
    /// part's display name: `Foo.txt` → `Foo (1).txt` → `Foo (2).txt`;
    /// folders: `Bar/` → `Bar (1)/`. The identifier of the renamed part is
    /// cleared since it now names a different (not-yet-existing) entity.
    pub fn increment_name(&self) -> Self {
        let mut parts = self.parts.clone();
        if let Some(last) = parts.last_mut() {
            let incremented = increment_display_name(&last.name, self.is_dir);
            *last = PathPart::new(incremented);
        }
        Path {
            parts,
            is_dir: self.is_dir,
        }
    }

    /// The human-readable materialized path, e.g. `/Parent Folder/Foo.txt`.
    pub fn materialized_path(&self) -> String {
        if self.parts.is_empty() {
            return "/".to_string();
        }
        let mut out = String::from("/");
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            out.push_str(&part.name);
        }
        if self.is_dir {
            out.push('/');
        }
        out
    }

    /// The backend-identifier path, e.g. `/<id-of-parent>/<id-of-foo>`.
    /// Parts lacking an identifier fall back to their display name so a
    /// partially-resolved path still renders to something legible.
    pub fn identifier_path(&self) -> String {
        if self.parts.is_empty() {
            return "/".to_string();
        }
        let mut out = String::from("/");
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            out.push_str(part.identifier().unwrap_or(&part.name));
        }
        if self.is_dir {
            out.push('/');
        }
        out
    }

    /// Alias for [`Path::identifier_path`], matching the spec's "full path"
    /// terminology (§4.2) used when a backend speaks purely in ids.
    pub fn full_path(&self) -> String {
        self.identifier_path()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.materialized_path())
    }
}

/// Splits `name` into `(stem, suffix)` where `suffix` is everything from
/// the last `.` onward, unless the name has no extension or is a dotfile
/// with no further extension (`.bashrc` has no "stem.ext" split).
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) => (name, ""),
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}

fn increment_display_name(name: &str, is_dir: bool) -> String {
    let (stem, ext) = if is_dir { (name, "") } else { split_extension(name) };

    // Does the stem already end in " (N)"? If so, bump N; otherwise append " (1)".
    if let Some(open) = stem.rfind(" (") {
        if stem.ends_with(')') {
            let inner = &stem[open + 2..stem.len() - 1];
            if let Ok(n) = inner.parse::<u32>() {
                return format!("{}({}){}", &stem[..open + 1], n + 1, ext);
            }
        }
    }
    format!("{stem} (1){ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitting_and_materializing_round_trips_a_file_path() {
        let raw = "/Parent Folder/Foo.txt";
        let path = Path::split(raw);
        assert_eq!(path.materialized_path(), raw);
        assert!(path.is_file());
    }

    #[test]
    fn splitting_and_materializing_round_trips_a_folder_path() {
        let raw = "/Parent Folder/Sub/";
        let path = Path::split(raw);
        assert_eq!(path.materialized_path(), raw);
        assert!(path.is_dir());
    }

    #[test]
    fn root_materializes_to_a_single_slash_and_is_a_folder() {
        let root = Path::root();
        assert_eq!(root.materialized_path(), "/");
        assert!(root.is_root());
        assert!(root.is_dir());
    }

    #[test]
    fn increment_name_applies_numeric_suffix_before_extension() {
        let path = Path::split("/Foo.txt");
        let once = path.increment_name();
        assert_eq!(once.name(), "Foo (1).txt");
        let twice = once.increment_name();
        assert_eq!(twice.name(), "Foo (2).txt");
    }

    #[test]
    fn increment_name_on_a_folder_appends_before_trailing_slash() {
        let path = Path::split("/Bar/");
        let once = path.increment_name();
        assert_eq!(once.name(), "Bar (1)");
        assert_eq!(once.materialized_path(), "/Bar (1)/");
    }

    #[test]
    fn parent_of_root_is_root() {
        assert_eq!(Path::root().parent(), Path::root());
    }

    #[test]
    fn child_builds_a_path_one_level_deeper() {
        let parent = Path::split("/Parent/");
        let child = parent.child("Foo.txt", None, false);
        assert_eq!(child.materialized_path(), "/Parent/Foo.txt");
        assert!(child.is_file());
    }

    #[test]
    fn rename_preserves_identifier_and_changes_only_display_name() {
        let path = Path::from_parts(vec![PathPart::with_id("old.txt", "abc123")], false);
        let renamed = path.rename("new.txt");
        assert_eq!(renamed.name(), "new.txt");
        assert_eq!(renamed.parts()[0].identifier(), Some("abc123"));
    }

    #[test]
    fn equality_requires_matching_materialized_and_identifier_projections() {
        let a = Path::from_parts(vec![PathPart::with_id("a", "1")], true);
        let b = Path::from_parts(vec![PathPart::with_id("a", "1")], true);
        let c = Path::from_parts(vec![PathPart::with_id("a", "2")], true);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
