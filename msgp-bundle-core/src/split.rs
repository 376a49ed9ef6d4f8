//! Declaration splitter: separates a Go file's package line and imports from
//! the rest of its text.
//!
//! This is a line scanner, not a parser. It recognises:
//! - the first `package <name>` line,
//! - `import ( ... )` blocks, where every non-comment line between the
//!   opening and a line starting with `)` is one import entry,
//! - single-line `import "path"` / `import alias "path"` statements.
//!
//! Everything else is kept verbatim, blank lines included.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::contract::{FileRecord, SourceFile};
use crate::error::{PipelineError, PipelineResult};

fn package_line() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"^\s*package\s+(\w+)").expect("valid package regex"))
}

fn import_block_start() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"^\s*import\s*\((.*)$").expect("valid import block regex"))
}

fn import_single() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| {
        Regex::new(r#"^\s*import\s+("[^"]*"|[\w.]+\s+"[^"]*")"#).expect("valid import regex")
    })
}

/// Splits one file into a [`FileRecord`].
///
/// An `import (` that is never closed swallows the rest of the file. With
/// `strict_imports` that is an error; otherwise the record is flagged and a
/// warning is logged.
pub fn split(source: &SourceFile, strict_imports: bool) -> PipelineResult<FileRecord> {
    let mut unit_name: Option<String> = None;
    let mut dependencies = BTreeSet::new();
    let mut body: Vec<&str> = Vec::new();
    // 1-based line of the `import (` that is currently open
    let mut open_block: Option<usize> = None;

    for (idx, line) in source.text.lines().enumerate() {
        let trimmed = line.trim();

        if open_block.is_some() {
            if trimmed.starts_with(')') {
                open_block = None;
            } else {
                add_entry(&mut dependencies, trimmed);
            }
            continue;
        }

        if trimmed.is_empty() {
            body.push(line);
            continue;
        }

        if unit_name.is_none() {
            if let Some(caps) = package_line().captures(line) {
                unit_name = Some(caps[1].to_string());
                continue;
            }
        }

        if let Some(caps) = import_block_start().captures(line) {
            let rest = caps.get(1).map_or("", |m| m.as_str());
            match rest.find(')') {
                Some(close) => rest[..close]
                    .split(';')
                    .for_each(|entry| add_entry(&mut dependencies, entry.trim())),
                None => {
                    add_entry(&mut dependencies, rest.trim());
                    open_block = Some(idx + 1);
                }
            }
            continue;
        }

        if let Some(caps) = import_single().captures(line) {
            dependencies.insert(caps[1].trim().to_string());
            continue;
        }

        body.push(line);
    }

    let unterminated_import = match open_block {
        Some(line) if strict_imports => {
            return Err(PipelineError::UnterminatedImport {
                path: source.path.clone(),
                line,
            });
        }
        Some(line) => {
            warn!(
                path = %source.path.display(),
                line,
                "Import block is never closed; the rest of the file was dropped"
            );
            true
        }
        None => false,
    };

    debug!(
        path = %source.path.display(),
        unit_name = ?unit_name,
        imports = dependencies.len(),
        "Split source file"
    );

    Ok(FileRecord {
        path: source.path.clone(),
        unit_name,
        dependencies,
        body: body.join("\n"),
        unterminated_import,
    })
}

fn add_entry(dependencies: &mut BTreeSet<String>, entry: &str) {
    if !entry.is_empty() && !entry.starts_with("//") {
        dependencies.insert(entry.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source(text: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from("user.go"),
            text: text.to_string(),
        }
    }

    fn deps(record: &FileRecord) -> Vec<&str> {
        record.dependencies.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_split_extracts_package_imports_and_body() {
        let text = "\
// Copyright notice
package revolt

//go:generate msgp

import (
\t\"fmt\"
\t// the serializer
\tmsgp \"github.com/tinylib/msgp/msgp\"

\t\"fmt\"
)

import \"time\"

type User struct {
\tID string
}
";
        let record = split(&source(text), false).unwrap();
        assert_eq!(record.unit_name.as_deref(), Some("revolt"));
        assert_eq!(
            deps(&record),
            vec!["\"fmt\"", "\"time\"", "msgp \"github.com/tinylib/msgp/msgp\""]
        );
        assert_eq!(
            record.body,
            "// Copyright notice\n\n//go:generate msgp\n\n\ntype User struct {\n\tID string\n}"
        );
        assert!(!record.unterminated_import);
    }

    #[test]
    fn test_header_and_imports_only_leave_blank_lines() {
        let text = "package alpha\n\nimport (\n\t\"os\"\n)\n\nimport \"fmt\"\n";
        let record = split(&source(text), false).unwrap();
        assert!(record.body.lines().all(|l| l.trim().is_empty()));
        assert!(!record.body.contains("package"));
        assert!(!record.body.contains("import"));
        assert_eq!(deps(&record), vec!["\"fmt\"", "\"os\""]);
    }

    #[test]
    fn test_headerless_file_still_has_body() {
        let record = split(&source("type X int\n"), false).unwrap();
        assert_eq!(record.unit_name, None);
        assert_eq!(record.body, "type X int");
    }

    #[test]
    fn test_only_first_package_line_is_the_header() {
        let text = "package alpha\nvar doc = `\npackage beta\n`\n";
        let record = split(&source(text), false).unwrap();
        assert_eq!(record.unit_name.as_deref(), Some("alpha"));
        assert_eq!(record.body, "var doc = `\npackage beta\n`");
    }

    #[test]
    fn test_aliased_dot_and_blank_single_imports() {
        let text = "package a\nimport . \"strings\"\nimport _ \"embed\"\nimport j \"encoding/json\"\n";
        let record = split(&source(text), false).unwrap();
        assert_eq!(
            deps(&record),
            vec![". \"strings\"", "_ \"embed\"", "j \"encoding/json\""]
        );
        assert_eq!(record.body, "");
    }

    #[test]
    fn test_one_line_import_block_closes_immediately() {
        let text = "package a\nimport (\"fmt\"; \"os\")\ntype T struct{}\n";
        let record = split(&source(text), false).unwrap();
        assert_eq!(deps(&record), vec!["\"fmt\"", "\"os\""]);
        assert_eq!(record.body, "type T struct{}");
    }

    #[test]
    fn test_unterminated_block_swallows_rest_when_lenient() {
        let text = "package a\nimport (\n\t\"fmt\"\ntype T struct{}\n";
        let record = split(&source(text), false).unwrap();
        assert!(record.unterminated_import);
        assert_eq!(record.body, "");
        assert!(record.dependencies.contains("type T struct{}"));
    }

    #[test]
    fn test_unterminated_block_is_an_error_when_strict() {
        let text = "package a\n\nimport (\n\t\"fmt\"\n";
        let err = split(&source(text), true).unwrap_err();
        match err {
            PipelineError::UnterminatedImport { path, line } => {
                assert_eq!(path, PathBuf::from("user.go"));
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
