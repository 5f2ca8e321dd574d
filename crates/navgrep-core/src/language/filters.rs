//! Import-aware definition filters.
//!
//! Each filter reads the import statements of the querying file and keeps the
//! candidates whose path is consistent with one of them. Filters may return an
//! empty list; [`LanguageProfile::filter_definitions`](super::LanguageProfile::filter_definitions)
//! restores the unfiltered candidates in that case.

use once_cell::sync::Lazy;
use regex::Regex;

use super::FilterContext;
use crate::types::SearchResult;

static JAVA_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w.]+?)(\.\*)?\s*;?\s*$").expect("static regex")
});
static JAVA_PACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*package\s+([\w.]+)").expect("static regex"));

static C_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*#\s*(?:include|import)\s*["<]([^">]+)[">]"#).expect("static regex"));

static PYTHON_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*import\s+([\w.]+(?:\s*,\s*[\w.]+)*)").expect("static regex"));
static PYTHON_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*from\s+(\.*)([\w.]*)\s+import\b").expect("static regex"));

static GO_SINGLE_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#).expect("static regex"));
static GO_IMPORT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\bimport\s*\((.*?)\)").expect("static regex"));
static GO_BLOCK_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*(?:[\w.]+\s+)?"([^"]+)""#).expect("static regex"));

static JS_RELATIVE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:\bfrom\s+|\bimport\s+|\brequire\(\s*|\bimport\(\s*)['"](\.{1,2}/[^'"]+)['"]"#)
        .expect("static regex")
});

/// Java, Kotlin, Scala and Groovy: dotted packages map onto directories.
pub fn java_filter(results: Vec<SearchResult>, context: &FilterContext<'_>) -> Vec<SearchResult> {
    let mut imports: Vec<(String, bool)> = JAVA_IMPORT
        .captures_iter(context.file_content)
        .map(|caps| (caps[1].replace('.', "/"), caps.get(2).is_some()))
        .collect();
    let package = JAVA_PACKAGE
        .captures(context.file_content)
        .map(|caps| caps[1].replace('.', "/"));
    if let Some(package) = package {
        imports.push((package, true));
    }

    results
        .into_iter()
        .filter(|result| {
            if result.file == context.file_path {
                return true;
            }
            let stem = strip_extension(&result.file);
            let dir = dirname(&result.file);
            imports.iter().any(|(path, wildcard)| {
                if *wildcard {
                    return ends_with_segments(dir, path);
                }
                // `import static a.b.C.member` names the member, so the parent
                // segment is accepted too.
                ends_with_segments(stem, path)
                    || ends_with_segments(stem, dirname(path))
            })
        })
        .collect()
}

/// C, C++, Objective-C and CUDA: `#include` paths, plus the header/source
/// sibling of the querying file.
pub fn c_family_filter(
    results: Vec<SearchResult>,
    context: &FilterContext<'_>,
) -> Vec<SearchResult> {
    let includes: Vec<String> = C_INCLUDE
        .captures_iter(context.file_content)
        .map(|caps| strip_extension(&caps[1]).to_string())
        .collect();
    let own_stem = strip_extension(context.file_path);

    results
        .into_iter()
        .filter(|result| {
            let stem = strip_extension(&result.file);
            result.file == context.file_path
                || stem == own_stem
                || includes
                    .iter()
                    .any(|include| ends_with_segments(stem, include))
        })
        .collect()
}

/// Python: absolute and relative module imports.
pub fn python_filter(
    results: Vec<SearchResult>,
    context: &FilterContext<'_>,
) -> Vec<SearchResult> {
    let mut modules: Vec<String> = Vec::new();
    for caps in PYTHON_IMPORT.captures_iter(context.file_content) {
        for module in caps[1].split(',') {
            let module = module.trim();
            if !module.is_empty() {
                modules.push(module.replace('.', "/"));
            }
        }
    }
    for caps in PYTHON_FROM.captures_iter(context.file_content) {
        let dots = caps[1].len();
        let module = caps[2].replace('.', "/");
        if dots == 0 {
            if !module.is_empty() {
                modules.push(module);
            }
            continue;
        }
        let mut base = dirname(context.file_path).to_string();
        for _ in 1..dots {
            base = dirname(&base).to_string();
        }
        modules.push(join_path(&base, &module));
    }

    results
        .into_iter()
        .filter(|result| {
            if result.file == context.file_path {
                return true;
            }
            let stem = strip_extension(&result.file);
            let dir = dirname(&result.file);
            modules.iter().any(|module| {
                if module.is_empty() {
                    return false;
                }
                ends_with_segments(stem, module)
                    || ends_with_segments(stem, &format!("{module}/__init__"))
                    || ends_with_segments(dir, module)
            })
        })
        .collect()
}

/// Go: import paths name package directories; the querying package is always
/// in scope.
pub fn go_filter(results: Vec<SearchResult>, context: &FilterContext<'_>) -> Vec<SearchResult> {
    let mut imports: Vec<String> = GO_SINGLE_IMPORT
        .captures_iter(context.file_content)
        .map(|caps| caps[1].to_string())
        .collect();
    for block in GO_IMPORT_BLOCK.captures_iter(context.file_content) {
        imports.extend(
            GO_BLOCK_ENTRY
                .captures_iter(&block[1])
                .map(|caps| caps[1].to_string()),
        );
    }
    let own_dir = dirname(context.file_path);

    results
        .into_iter()
        .filter(|result| {
            let dir = dirname(&result.file);
            dir == own_dir
                || imports
                    .iter()
                    .any(|import| ends_with_segments(dir, import) || import_tail_matches(dir, import))
        })
        .collect()
}

/// JavaScript and TypeScript: relative `import`/`require` specifiers resolved
/// against the querying file.
pub fn javascript_filter(
    results: Vec<SearchResult>,
    context: &FilterContext<'_>,
) -> Vec<SearchResult> {
    let base = dirname(context.file_path);
    let targets: Vec<String> = JS_RELATIVE_IMPORT
        .captures_iter(context.file_content)
        .map(|caps| normalize_path(&join_path(base, &caps[1])))
        .collect();

    results
        .into_iter()
        .filter(|result| {
            if result.file == context.file_path {
                return true;
            }
            let stem = strip_extension(&result.file);
            targets.iter().any(|target| {
                let target_stem = strip_extension(target);
                stem == target_stem
                    || stem == target
                    || stem.strip_suffix("/index") == Some(target.as_str())
            })
        })
        .collect()
}

/// Module paths like `github.com/org/repo/pkg` rarely share a prefix with
/// repository-relative paths; compare the trailing package segment.
fn import_tail_matches(dir: &str, import: &str) -> bool {
    match (dir.rsplit('/').next(), import.rsplit('/').next()) {
        (Some(a), Some(b)) => !a.is_empty() && a == b && import.contains('/'),
        _ => false,
    }
}

fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}

fn dirname(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

fn join_path(base: &str, relative: &str) -> String {
    match (base.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{relative}"),
    }
}

fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Whether `path` equals `suffix` or ends with `/suffix`.
fn ends_with_segments(path: &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }
    path == suffix
        || path
            .strip_suffix(suffix)
            .is_some_and(|head| head.ends_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Range;

    fn result(file: &str) -> SearchResult {
        SearchResult {
            repository: "repo".to_string(),
            revision: "HEAD".to_string(),
            file: file.to_string(),
            range: Range::default(),
            preview: None,
            symbol_name: None,
            symbol_kind: None,
            container_name: None,
            file_local: false,
        }
    }

    fn files(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.file.as_str()).collect()
    }

    fn context<'a>(path: &'a str, content: &'a str) -> FilterContext<'a> {
        FilterContext {
            repo: "repo",
            file_path: path,
            file_content: content,
        }
    }

    #[test]
    fn java_keeps_imported_classes_and_same_package() {
        let content = "package com.acme.app;\n\nimport com.acme.util.Strings;\nimport com.acme.io.*;\n";
        let ctx = context("src/main/java/com/acme/app/Main.java", content);
        let kept = java_filter(
            vec![
                result("src/main/java/com/acme/util/Strings.java"),
                result("src/main/java/com/other/util/Strings.java"),
                result("src/main/java/com/acme/io/Reader.java"),
                result("src/main/java/com/acme/app/Helper.java"),
            ],
            &ctx,
        );
        assert_eq!(
            files(&kept),
            vec![
                "src/main/java/com/acme/util/Strings.java",
                "src/main/java/com/acme/io/Reader.java",
                "src/main/java/com/acme/app/Helper.java",
            ]
        );
    }

    #[test]
    fn java_static_imports_match_the_declaring_class() {
        let content = "import static org.junit.Assert.assertEquals;\n";
        let ctx = context("Test.java", content);
        let kept = java_filter(vec![result("lib/org/junit/Assert.java")], &ctx);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn c_family_matches_includes_ignoring_extension() {
        let content = "#include \"net/socket.h\"\n#include <stdio.h>\n";
        let ctx = context("src/server.cpp", content);
        let kept = c_family_filter(
            vec![
                result("lib/net/socket.cc"),
                result("lib/fs/socket.cc"),
                result("src/server.h"),
            ],
            &ctx,
        );
        assert_eq!(files(&kept), vec!["lib/net/socket.cc", "src/server.h"]);
    }

    #[test]
    fn python_resolves_absolute_and_relative_imports() {
        let content = "import os, pkg.tools\nfrom .models import User\nfrom app.db import session\n";
        let ctx = context("app/views/index.py", content);
        let kept = python_filter(
            vec![
                result("pkg/tools.py"),
                result("app/views/models.py"),
                result("app/db/__init__.py"),
                result("app/db/session.py"),
                result("other/models.py"),
            ],
            &ctx,
        );
        assert_eq!(
            files(&kept),
            vec![
                "pkg/tools.py",
                "app/views/models.py",
                "app/db/__init__.py",
                "app/db/session.py",
            ]
        );
    }

    #[test]
    fn go_keeps_imported_packages_and_own_package() {
        let content = "package main\n\nimport (\n\t\"fmt\"\n\tlog \"github.com/acme/svc/logging\"\n)\n";
        let ctx = context("cmd/main.go", content);
        let kept = go_filter(
            vec![
                result("logging/logger.go"),
                result("cmd/util.go"),
                result("internal/other/x.go"),
            ],
            &ctx,
        );
        assert_eq!(files(&kept), vec!["logging/logger.go", "cmd/util.go"]);
    }

    #[test]
    fn javascript_resolves_relative_specifiers() {
        let content = "import { a } from './lib/a';\nconst b = require('../shared/b');\nimport x from 'react';\n";
        let ctx = context("web/src/app.ts", content);
        let kept = javascript_filter(
            vec![
                result("web/src/lib/a.ts"),
                result("web/shared/b/index.js"),
                result("node_modules/react/index.js"),
            ],
            &ctx,
        );
        assert_eq!(files(&kept), vec!["web/src/lib/a.ts", "web/shared/b/index.js"]);
    }

    #[test]
    fn path_helpers() {
        assert_eq!(strip_extension("a/b.c/d.ts"), "a/b.c/d");
        assert_eq!(strip_extension("a/.hidden"), "a/.hidden");
        assert_eq!(dirname("a/b/c.ts"), "a/b");
        assert_eq!(normalize_path("a/b/../c/./d"), "a/c/d");
        assert!(ends_with_segments("x/a/b", "a/b"));
        assert!(!ends_with_segments("x/ya/b", "a/b"));
    }
}
