// src/steps/sassglob.rs

//! Glob imports for Sass.
//!
//! `@import "components/**/*.scss";` is not valid Sass; it is expanded here
//! into one `@import` per matching file, sorted by path, before the source
//! is piped to the compiler.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::fs::{FileSystem, relative_slash_path, walk_files};
use crate::watch::compile_glob;

/// An `@import` whose path contains a wildcard.
const GLOB_IMPORT_PATTERN: &str = r#"@import\s+["']([^"']*[*?\[{][^"']*)["']\s*;?"#;

/// Expand glob imports in `source`, which was read from `file`.
///
/// Patterns are resolved relative to the directory of `file`. The importing
/// file itself is never included. A pattern matching nothing expands to an
/// empty string.
pub fn expand_glob_imports(fs: &dyn FileSystem, file: &Path, source: &str) -> Result<String> {
    let glob_import = Regex::new(GLOB_IMPORT_PATTERN).context("compiling glob import pattern")?;
    let base_dir = file.parent().unwrap_or_else(|| Path::new("."));

    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for caps in glob_import.captures_iter(source) {
        let (Some(whole), Some(pattern)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&source[last..whole.start()]);

        let imports = matching_imports(fs, base_dir, file, pattern.as_str())
            .with_context(|| format!("expanding glob import '{}'", pattern.as_str()))?;
        out.push_str(&imports.join("\n"));

        last = whole.end();
    }
    out.push_str(&source[last..]);

    Ok(out)
}

fn matching_imports(
    fs: &dyn FileSystem,
    base_dir: &Path,
    file: &Path,
    pattern: &str,
) -> Result<Vec<String>> {
    let matcher = compile_glob(pattern)?.compile_matcher();

    let mut imports: Vec<String> = walk_files(fs, base_dir)?
        .into_iter()
        .filter(|p| p.as_path() != file)
        .filter_map(|p| relative_slash_path(base_dir, &p))
        .filter(|rel| is_stylesheet(rel) && matcher.is_match(rel))
        .collect();
    imports.sort();

    Ok(imports
        .into_iter()
        .map(|rel| format!("@import \"{rel}\";"))
        .collect())
}

fn is_stylesheet(rel: &str) -> bool {
    rel.ends_with(".scss") || rel.ends_with(".sass") || rel.ends_with(".css")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn expands_sorted_matches_and_keeps_plain_imports() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/scss/main.scss", "");
        fs.add_file("./src/scss/components/_card.scss", "");
        fs.add_file("./src/scss/components/_button.scss", "");
        fs.add_file("./src/scss/components/forms/_input.scss", "");
        fs.add_file("./src/scss/components/notes.md", "");

        let source = "@import \"variables\";\n@import \"components/**/*.scss\";\nbody { margin: 0; }\n";
        let out = expand_glob_imports(&fs, Path::new("./src/scss/main.scss"), source).unwrap();

        assert_eq!(
            out,
            "@import \"variables\";\n\
             @import \"components/_button.scss\";\n\
             @import \"components/_card.scss\";\n\
             @import \"components/forms/_input.scss\";\n\
             body { margin: 0; }\n"
        );
    }

    #[test]
    fn unmatched_glob_expands_to_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/scss/main.scss", "");
        let out =
            expand_glob_imports(&fs, Path::new("./src/scss/main.scss"), "@import 'none/*.scss';")
                .unwrap();
        assert_eq!(out, "");
    }
}
