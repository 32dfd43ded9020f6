//! # Import Rewriting
//!
//! Before a function is deployed, imports of the shared common package are
//! retargeted to the function's own package, so the copied common code can be
//! imported from inside the function:
//!
//! ```text
//! from functions.common.storage import Bucket   ->   from functions.billing.storage import Bucket
//! import functions.common.logging               ->   import functions.billing.logging
//! ```
//!
//! Only lines that are complete import statements are touched, and only when
//! the imported package starts with the common package. Everything else in
//! the file passes through byte for byte, line endings included.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use log::debug;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::Result;

/// Extension of the source files that are rewritten.
pub const SOURCE_EXTENSION: &str = "py";

const IMPORT_PATTERN: &str = r"^(?:from|import)\s(\S+)(?:\simport\s.+)?$";

/// Counts from one rewrite pass over a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub files_scanned: usize,
    pub files_rewritten: usize,
}

/// Rewrites common-package imports to a function package.
#[derive(Debug, Clone)]
pub struct ImportRewriter {
    pattern: Regex,
    common_package: String,
    function_package: String,
}

impl ImportRewriter {
    pub fn new(common_package: impl Into<String>, function_package: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(IMPORT_PATTERN)?,
            common_package: common_package.into(),
            function_package: function_package.into(),
        })
    }

    /// Rewrites a single line without its terminator.
    pub fn rewrite_line<'l>(&self, line: &'l str) -> Cow<'l, str> {
        let imports_common = self
            .pattern
            .captures(line)
            .map(|captures| captures[1].starts_with(self.common_package.as_str()))
            .unwrap_or(false);

        if imports_common {
            Cow::Owned(line.replace(&self.common_package, &self.function_package))
        } else {
            Cow::Borrowed(line)
        }
    }

    /// Rewrites every line of `content`.
    ///
    /// A line that had content and is empty after rewriting is dropped
    /// together with its terminator.
    pub fn process_lines(&self, content: &str) -> String {
        let mut output = String::with_capacity(content.len());
        for raw in content.split_inclusive('\n') {
            let (line, terminator) = split_terminator(raw);
            let rewritten = self.rewrite_line(line);
            if rewritten.is_empty() && !line.is_empty() {
                continue;
            }
            output.push_str(&rewritten);
            output.push_str(terminator);
        }
        output
    }

    /// Rewrites `path` in place. Returns whether the content changed.
    pub fn rewrite_file(&self, path: &Path) -> Result<bool> {
        let content = fs::read_to_string(path)?;
        let rewritten = self.process_lines(&content);
        if rewritten == content {
            return Ok(false);
        }
        fs::write(path, rewritten)?;
        debug!("Rewrote imports in {}", path.display());
        Ok(true)
    }

    /// Rewrites every source file under `root`, recursively.
    pub fn rewrite_tree(&self, root: &Path) -> Result<RewriteSummary> {
        let mut summary = RewriteSummary::default();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_source_file(entry.path()) {
                continue;
            }
            summary.files_scanned += 1;
            if self.rewrite_file(entry.path())? {
                summary.files_rewritten += 1;
            }
        }
        Ok(summary)
    }
}

/// Rewrites every source file under `root` from `common_package` to
/// `function_package`.
pub fn rewrite_tree(root: &Path, common_package: &str, function_package: &str) -> Result<RewriteSummary> {
    ImportRewriter::new(common_package, function_package)?.rewrite_tree(root)
}

fn is_source_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION)
}

fn split_terminator(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, "\n")
    } else {
        (raw, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn rewriter() -> ImportRewriter {
        ImportRewriter::new("acme.common", "acme.func1").unwrap()
    }

    #[test]
    fn test_from_import_is_rewritten() {
        assert_eq!(
            rewriter().rewrite_line("from acme.common.x import y"),
            "from acme.func1.x import y"
        );
    }

    #[test]
    fn test_plain_import_is_rewritten() {
        assert_eq!(rewriter().rewrite_line("import acme.common"), "import acme.func1");
        assert_eq!(
            rewriter().rewrite_line("import acme.common.storage"),
            "import acme.func1.storage"
        );
    }

    #[test]
    fn test_every_occurrence_in_matching_line() {
        assert_eq!(
            rewriter().rewrite_line("from acme.common import acme.common_helpers"),
            "from acme.func1 import acme.func1_helpers"
        );
    }

    #[test]
    fn test_prefix_match_not_exact() {
        assert_eq!(
            rewriter().rewrite_line("from acme.commons.x import y"),
            "from acme.func1s.x import y"
        );
    }

    #[test]
    fn test_other_packages_unchanged() {
        let rewriter = rewriter();
        for line in [
            "from acme.other import common",
            "import os",
            "x = 'from acme.common.x import y'",
            "    from acme.common.x import y",
            "import acme.common as c",
            "# from acme.common.x import y",
        ] {
            assert!(
                matches!(rewriter.rewrite_line(line), Cow::Borrowed(_)),
                "{} should be left alone",
                line
            );
        }
    }

    #[test]
    fn test_process_lines_preserves_terminators_and_blank_lines() {
        let content = "import os\r\n\nfrom acme.common.db import connect\n\ndef main():\n    pass";
        assert_eq!(
            rewriter().process_lines(content),
            "import os\r\n\nfrom acme.func1.db import connect\n\ndef main():\n    pass"
        );
    }

    #[test]
    fn test_rewrite_tree_only_touches_source_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("handlers")).unwrap();
        fs::write(root.join("main.py"), "from acme.common.http import respond\n").unwrap();
        fs::write(root.join("handlers/api.py"), "import acme.common.auth\n").unwrap();
        fs::write(root.join("handlers/util.py"), "import json\n").unwrap();
        fs::write(root.join("notes.txt"), "from acme.common.http import respond\n").unwrap();

        let summary = rewrite_tree(root, "acme.common", "acme.func1").unwrap();
        assert_eq!(
            summary,
            RewriteSummary {
                files_scanned: 3,
                files_rewritten: 2
            }
        );
        assert_eq!(
            fs::read_to_string(root.join("main.py")).unwrap(),
            "from acme.func1.http import respond\n"
        );
        assert_eq!(
            fs::read_to_string(root.join("handlers/api.py")).unwrap(),
            "import acme.func1.auth\n"
        );
        assert_eq!(
            fs::read_to_string(root.join("notes.txt")).unwrap(),
            "from acme.common.http import respond\n"
        );
    }

    proptest! {
        #[test]
        fn prop_matching_from_imports_keep_their_suffix(
            suffix in "(\\.[a-z_]{1,8}){0,3}",
            names in "[a-z_]{1,8}(, [a-z_]{1,8}){0,2}",
        ) {
            prop_assume!(!suffix.contains("acme"));
            let line = format!("from acme.common{} import {}", suffix, names);
            let expected = format!("from acme.func1{} import {}", suffix, names);
            prop_assert_eq!(rewriter().rewrite_line(&line).into_owned(), expected);
        }

        #[test]
        fn prop_non_import_lines_pass_through(line in "[a-z =()'\"]{0,40}") {
            prop_assume!(!line.starts_with("from ") && !line.starts_with("import "));
            prop_assert_eq!(rewriter().rewrite_line(&line).into_owned(), line);
        }
    }
}
