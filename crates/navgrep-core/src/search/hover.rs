//! Markdown hover text assembled from a definition's source line and docs.

use crate::docstring::find_docstring;
use crate::language::LanguageProfile;
use crate::types::{HoverPayload, SearchResult, split_lines};

const FENCE: &str = "```";

/// Build the hover shown for `definition`, given the content of its file.
///
/// Returns `None` when the definition line is missing or unusable.
pub fn build_hover(
    content: &str,
    definition: &SearchResult,
    profile: &LanguageProfile,
) -> Option<HoverPayload> {
    let line_index = definition.range.start.line;
    let raw_line = split_lines(content).get(line_index).copied()?;
    let signature = clean_definition_line(raw_line)?;

    let mut contents = format!("{FENCE}{}\n{signature}\n{FENCE}", profile.language_id);
    if let Some(docstring) = find_docstring(
        line_index,
        content,
        &profile.comment_styles,
        profile.docstring_ignore.as_ref(),
    ) {
        contents.push_str("\n\n---\n\n");
        contents.push_str(&wrap_indentation_in_code_blocks(&docstring));
    }

    Some(HoverPayload {
        contents,
        range: Some(definition.range),
    })
}

/// Trim a definition line down to its signature. Lines that would break out
/// of the surrounding fence are rejected.
pub fn clean_definition_line(line: &str) -> Option<String> {
    if line.contains(FENCE) {
        return None;
    }
    let cleaned = line
        .trim()
        .trim_end_matches(|c: char| matches!(c, '{' | '(' | ':' | ';' | ',' | '=') || c.is_whitespace());
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Wrap runs of indented docstring lines (four spaces or a tab) in fenced
/// code blocks so markdown renders them verbatim.
pub fn wrap_indentation_in_code_blocks(docstring: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in split_lines(docstring) {
        if is_indented(line) {
            block.push(line);
            continue;
        }
        if !block.is_empty() && line.trim().is_empty() {
            block.push(line);
            continue;
        }
        flush_block(&mut block, &mut out);
        out.push(line.to_string());
    }
    flush_block(&mut block, &mut out);
    out.join("\n")
}

fn is_indented(line: &str) -> bool {
    (line.starts_with("    ") || line.starts_with('\t')) && !line.trim().is_empty()
}

fn flush_block(block: &mut Vec<&str>, out: &mut Vec<String>) {
    // Trailing blank lines belong after the fence.
    let mut trailing = 0;
    while block.last().is_some_and(|line| line.trim().is_empty()) {
        block.pop();
        trailing += 1;
    }
    if !block.is_empty() {
        let indent = block
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.len() - line.trim_start().len())
            .min()
            .unwrap_or(0);
        out.push(FENCE.to_string());
        out.extend(block.iter().map(|line| line.get(indent..).unwrap_or("").to_string()));
        out.push(FENCE.to_string());
    }
    out.extend(std::iter::repeat_n(String::new(), trailing));
    block.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageRegistry;
    use crate::types::{Position, Range};

    fn definition_at(line: usize) -> SearchResult {
        SearchResult {
            repository: "r".to_string(),
            revision: "v".to_string(),
            file: "a".to_string(),
            range: Range::new(Position::new(line, 0), Position::new(line, 3)),
            preview: None,
            symbol_name: None,
            symbol_kind: None,
            container_name: None,
            file_local: false,
        }
    }

    #[test]
    fn strips_trailing_punctuation() {
        assert_eq!(
            clean_definition_line("  func Serve(addr string) error {  ").as_deref(),
            Some("func Serve(addr string) error")
        );
        assert_eq!(clean_definition_line("def handler(:").as_deref(), Some("def handler"));
        assert_eq!(clean_definition_line("const x = ").as_deref(), Some("const x"));
        assert!(clean_definition_line("s = ```").is_none());
        assert!(clean_definition_line("   {").is_none());
    }

    #[test]
    fn go_hover_has_signature_and_docs() {
        let registry = LanguageRegistry::builtin().unwrap();
        let profile = registry.get("go").unwrap();
        let content = "package x\n\n// Serve starts the server.\n// It blocks.\nfunc Serve() {\n}\n";
        let hover = build_hover(content, &definition_at(4), profile).unwrap();
        assert_eq!(
            hover.contents,
            "```go\nfunc Serve()\n```\n\n---\n\nServe starts the server.\nIt blocks."
        );
        assert_eq!(hover.range, Some(definition_at(4).range));
    }

    #[test]
    fn hover_without_docstring_is_only_the_signature() {
        let registry = LanguageRegistry::builtin().unwrap();
        let profile = registry.get("go").unwrap();
        let hover = build_hover("func main() {\n}\n", &definition_at(0), profile).unwrap();
        assert_eq!(hover.contents, "```go\nfunc main()\n```");
    }

    #[test]
    fn indented_block_comment_prose_is_not_fenced() {
        let registry = LanguageRegistry::builtin().unwrap();
        let profile = registry.get("c").unwrap();
        let content = "/*\n    Frobnicates the widget.\n    Returns zero.\n*/\nvoid frob(void);\n";
        let hover = build_hover(content, &definition_at(4), profile).unwrap();
        assert_eq!(
            hover.contents,
            "```c\nvoid frob(void)\n```\n\n---\n\nFrobnicates the widget.\nReturns zero."
        );
    }

    #[test]
    fn missing_line_gives_no_hover() {
        let registry = LanguageRegistry::builtin().unwrap();
        let profile = registry.get("go").unwrap();
        assert!(build_hover("func main() {}", &definition_at(9), profile).is_none());
    }

    #[test]
    fn indented_runs_become_code_blocks() {
        let doc = "Example:\n\n    let x = 1;\n      x + 1\n\nDone.";
        assert_eq!(
            wrap_indentation_in_code_blocks(doc),
            "Example:\n\n```\nlet x = 1;\n  x + 1\n```\n\nDone."
        );
    }

    #[test]
    fn unindented_docs_pass_through() {
        assert_eq!(wrap_indentation_in_code_blocks("plain\ntext"), "plain\ntext");
    }
}
