use regex::Regex;

use crate::types::{Position, split_lines};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchToken {
    pub token: String,
    pub is_comment: bool,
}

/// Find the identifier under `position`.
///
/// A cursor at end of line reads the character before it. Returns `None`
/// when that character is not an identifier character.
pub fn find_search_token(
    text: &str,
    position: Position,
    line_comment_patterns: &[&Regex],
    identifier_char: &Regex,
) -> Option<SearchToken> {
    let lines = split_lines(text);
    let line = lines.get(position.line)?;
    let chars: Vec<char> = line.chars().collect();
    // A cursor just past the last character still touches the trailing word.
    let cursor = match position.character {
        c if c < chars.len() => c,
        c if c == chars.len() => c.checked_sub(1)?,
        _ => return None,
    };

    let is_ident = |c: char| {
        let mut buf = [0u8; 4];
        identifier_char.is_match(c.encode_utf8(&mut buf))
    };

    let end = (cursor..chars.len())
        .find(|&i| !is_ident(chars[i]))
        .unwrap_or(chars.len());
    let start = (0..=cursor)
        .rev()
        .find(|&i| !is_ident(chars[i]))
        .map_or(0, |i| i + 1);
    if start >= end {
        return None;
    }

    let token: String = chars[start..end].iter().collect();
    let is_comment = is_in_comment(line, &chars, start, end, line_comment_patterns);
    Some(SearchToken { token, is_comment })
}

fn is_in_comment(
    line: &str,
    chars: &[char],
    start: usize,
    end: usize,
    line_comment_patterns: &[&Regex],
) -> bool {
    let comment_start = line_comment_patterns
        .iter()
        .filter_map(|pattern| pattern.find(line))
        .map(|m| line[..m.start()].chars().count())
        .filter(|&index| index < start)
        .min();
    let Some(comment_start) = comment_start else {
        return false;
    };

    // Code-shaped text inside comments (usage examples in docs) stays
    // navigable.
    let looks_like_call = chars.get(end) == Some(&'(');
    let looks_like_member = start > 0 && chars[start - 1] == '.';
    !(looks_like_call
        || looks_like_member
        || in_string_literal(&chars[comment_start..], start - comment_start, end - comment_start))
}

fn in_string_literal(chars: &[char], start: usize, end: usize) -> bool {
    ['"', '\'', '`'].iter().any(|&quote| {
        let before = chars[..start].iter().filter(|&&c| c == quote).count();
        before % 2 == 1 && chars[end..].contains(&quote)
    })
}
