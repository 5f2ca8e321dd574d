//! Documentation comments adjacent to a definition.

use regex::Regex;

use crate::language::{BlockStyle, CommentStyle, DocPlacement, LineStyle};
use crate::types::split_lines;

/// Extract the documentation attached to the definition on `definition_line`.
///
/// A comment on the definition line itself wins. Otherwise each style is
/// tried in order, scanning away from the definition in the style's placement
/// direction. Lines matching `docstring_ignore` directly next to the
/// definition (annotations, attributes) are skipped first.
pub fn find_docstring(
    definition_line: usize,
    file_text: &str,
    comment_styles: &[CommentStyle],
    docstring_ignore: Option<&Regex>,
) -> Option<String> {
    let lines = split_lines(file_text);
    let definition = lines.get(definition_line)?;

    if let Some(inline) = comment_styles
        .iter()
        .find_map(|style| inline_comment(definition, style))
    {
        return Some(inline);
    }

    comment_styles.iter().find_map(|style| {
        let candidates = candidate_lines(lines.len(), definition_line, style.placement, |i| {
            docstring_ignore.is_some_and(|ignore| ignore.is_match(lines[i]))
        });
        if candidates.is_empty() {
            return None;
        }
        style
            .line()
            .and_then(|line_style| line_comment_run(&lines, &candidates, style.placement, line_style))
            .or_else(|| {
                style
                    .block()
                    .and_then(|block| block_comment(&lines, &candidates, style.placement, block))
            })
    })
}

fn inline_comment(line: &str, style: &CommentStyle) -> Option<String> {
    if let Some(body) = style.line().and_then(|line_style| line_style.trailing_body(line)) {
        let body = body.trim();
        if !body.is_empty() {
            return Some(body.to_string());
        }
    }
    let block = style.block()?;
    let start = block.start.find(line)?;
    let rest = &line[start.end()..];
    let end = block.end.find(rest)?;
    let body = rest[..end.start()].trim();
    (!body.is_empty()).then(|| body.to_string())
}

/// Line indexes moving away from the definition, with ignorable lines next to
/// it removed.
fn candidate_lines(
    total: usize,
    definition_line: usize,
    placement: DocPlacement,
    is_ignored: impl Fn(usize) -> bool,
) -> Vec<usize> {
    let indices: Box<dyn Iterator<Item = usize>> = match placement {
        DocPlacement::Below => Box::new(definition_line + 1..total),
        DocPlacement::Above => Box::new((0..definition_line).rev()),
    };
    indices.skip_while(|&i| is_ignored(i)).collect()
}

fn line_comment_run(
    lines: &[&str],
    candidates: &[usize],
    placement: DocPlacement,
    style: &LineStyle,
) -> Option<String> {
    let mut bodies: Vec<&str> = candidates
        .iter()
        .map_while(|&i| style.leading_body(lines[i]))
        .collect();
    if bodies.is_empty() {
        return None;
    }
    if placement == DocPlacement::Above {
        bodies.reverse();
    }
    finish(bodies.into_iter().map(str::to_string).collect())
}

fn block_comment(
    lines: &[&str],
    candidates: &[usize],
    placement: DocPlacement,
    style: &BlockStyle,
) -> Option<String> {
    let nearest = candidates[0];
    // (first line, byte offset after the opening delimiter, last line, byte
    // offset of the closing delimiter), in source order.
    let (first, body_start, last, body_end) = match placement {
        DocPlacement::Below => {
            let open = style.start.find(lines[nearest])?;
            let mut close = None;
            for (n, &i) in candidates.iter().enumerate() {
                let offset = if n == 0 { open.end() } else { 0 };
                if let Some(m) = style.end.find(&lines[i][offset..]) {
                    close = Some((i, offset + m.start()));
                    break;
                }
            }
            let (last, body_end) = close?;
            (nearest, open.end(), last, body_end)
        }
        DocPlacement::Above => {
            let close = style.end.find_iter(lines[nearest]).last()?;
            let mut open = None;
            for (n, &i) in candidates.iter().enumerate() {
                let haystack = if n == 0 {
                    &lines[i][..close.start()]
                } else {
                    lines[i]
                };
                if let Some(m) = style.start.find(haystack) {
                    open = Some((i, m.end()));
                    break;
                }
            }
            let (first, body_start) = open?;
            (first, body_start, nearest, close.start())
        }
    };

    let segments: Vec<(usize, String)> = (first..=last)
        .map(|i| {
            let line = lines[i];
            let from = if i == first { body_start } else { 0 };
            let to = if i == last { body_end } else { line.len() };
            let segment = if from <= to { &line[from..to] } else { "" };
            let segment = match &style.line_noise {
                Some(noise) => noise.replacen(segment, 1, "").into_owned(),
                None => segment.to_string(),
            };
            (i, segment)
        })
        .collect();

    // Text sharing the opening delimiter's line is indented like that line.
    let indent = segments
        .iter()
        .find(|(_, segment)| !segment.trim().is_empty())
        .map_or(0, |(i, segment)| {
            if *i == first {
                leading_whitespace(lines[first])
            } else {
                leading_whitespace(segment)
            }
        });
    let body: Vec<String> = segments
        .iter()
        .map(|(_, segment)| strip_indent(segment, indent).to_string())
        .collect();
    finish(body)
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn strip_indent(line: &str, amount: usize) -> &str {
    let skip: usize = line
        .chars()
        .take(amount)
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    &line[skip..]
}

fn finish(mut lines: Vec<String>) -> Option<String> {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
    lines.drain(..leading);
    if lines.is_empty() {
        return None;
    }
    Some(
        lines
            .iter()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
