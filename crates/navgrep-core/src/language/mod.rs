//! Language profiles: comment syntax, identifier characters and result filters.
//!
//! A [`LanguageRegistry`] is built once at startup (usually with
//! [`LanguageRegistry::builtin`]) and shared by reference. Adding a language
//! means adding a profile; the search engine itself never branches on a
//! language id.

mod filters;
mod profiles;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use regex::Regex;

use crate::types::SearchResult;

pub use filters::{
    c_family_filter, go_filter, java_filter, javascript_filter, python_filter,
};

/// Where a definition's documentation lives relative to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DocPlacement {
    #[default]
    Above,
    Below,
}

/// Line comments such as `// body` or `# body`.
#[derive(Clone, Debug)]
pub struct LineStyle {
    /// Matches anywhere in a line; capture group 1 is the comment body.
    pattern: Regex,
    /// Same pattern anchored to the start of a line (after indentation).
    leading: Regex,
}

impl LineStyle {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            leading: Regex::new(&format!(r"^\s*(?:{pattern})"))?,
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Body of a line that consists only of a comment.
    pub fn leading_body<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.leading
            .captures(line)
            .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
    }

    /// Body of a comment anywhere on the line.
    pub fn trailing_body<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(line)
            .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
    }
}

/// Delimited comments such as `/** ... */` or `""" ... """`.
#[derive(Clone, Debug)]
pub struct BlockStyle {
    pub start: Regex,
    pub end: Regex,
    /// Per-line decoration stripped from the body, e.g. a leading `*`.
    pub line_noise: Option<Regex>,
}

impl BlockStyle {
    pub fn new(start: &str, end: &str, line_noise: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            start: Regex::new(start)?,
            end: Regex::new(end)?,
            line_noise: line_noise.map(Regex::new).transpose()?,
        })
    }
}

#[derive(Clone, Debug)]
pub enum CommentSyntax {
    Line(LineStyle),
    Block(BlockStyle),
    Both { line: LineStyle, block: BlockStyle },
}

#[derive(Clone, Debug)]
pub struct CommentStyle {
    pub syntax: CommentSyntax,
    pub placement: DocPlacement,
}

impl CommentStyle {
    pub fn line(&self) -> Option<&LineStyle> {
        match &self.syntax {
            CommentSyntax::Line(line) | CommentSyntax::Both { line, .. } => Some(line),
            CommentSyntax::Block(_) => None,
        }
    }

    pub fn block(&self) -> Option<&BlockStyle> {
        match &self.syntax {
            CommentSyntax::Block(block) | CommentSyntax::Both { block, .. } => Some(block),
            CommentSyntax::Line(_) => None,
        }
    }
}

/// Import context of the file a lookup started from.
#[derive(Clone, Debug)]
pub struct FilterContext<'a> {
    pub repo: &'a str,
    pub file_path: &'a str,
    pub file_content: &'a str,
}

/// Prunes cross-file noise from definition candidates.
pub type DefinitionFilter = fn(Vec<SearchResult>, &FilterContext<'_>) -> Vec<SearchResult>;

#[derive(Clone)]
pub struct LanguageProfile {
    pub language_id: String,
    pub display_name: String,
    pub file_extensions: Vec<String>,
    pub comment_styles: Vec<CommentStyle>,
    pub identifier_char: Regex,
    pub docstring_ignore: Option<Regex>,
    pub filter: Option<DefinitionFilter>,
}

impl fmt::Debug for LanguageProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageProfile")
            .field("language_id", &self.language_id)
            .field("file_extensions", &self.file_extensions)
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

impl LanguageProfile {
    /// Line-comment patterns in style order, used by token extraction.
    pub fn line_comment_patterns(&self) -> Vec<&Regex> {
        self.comment_styles
            .iter()
            .filter_map(CommentStyle::line)
            .map(LineStyle::pattern)
            .collect()
    }

    /// Apply the profile's filter, falling back to the unfiltered list when
    /// nothing would survive.
    pub fn filter_definitions(
        &self,
        results: Vec<SearchResult>,
        context: &FilterContext<'_>,
    ) -> Vec<SearchResult> {
        let Some(filter) = self.filter else {
            return results;
        };
        if results.is_empty() {
            return results;
        }
        let filtered = filter(results.clone(), context);
        if filtered.is_empty() {
            tracing::debug!(
                language = %self.language_id,
                candidates = results.len(),
                "definition filter removed every candidate; keeping unfiltered results"
            );
            results
        } else {
            filtered
        }
    }
}

/// Immutable lookup table of language profiles.
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    profiles: Vec<LanguageProfile>,
    by_id: HashMap<String, usize>,
    by_extension: HashMap<String, usize>,
}

impl LanguageRegistry {
    /// Registry holding every built-in language.
    pub fn builtin() -> Result<Self, regex::Error> {
        Ok(Self::from_profiles(profiles::builtin_profiles()?))
    }

    /// Build a registry from explicit profiles. When several profiles claim
    /// the same extension, the first one registered answers path lookups.
    pub fn from_profiles(profiles: Vec<LanguageProfile>) -> Self {
        let mut by_id = HashMap::new();
        let mut by_extension = HashMap::new();
        for (index, profile) in profiles.iter().enumerate() {
            by_id.entry(profile.language_id.clone()).or_insert(index);
            for ext in &profile.file_extensions {
                by_extension.entry(ext.to_ascii_lowercase()).or_insert(index);
            }
        }
        Self {
            profiles,
            by_id,
            by_extension,
        }
    }

    pub fn get(&self, language_id: &str) -> Option<&LanguageProfile> {
        self.by_id
            .get(language_id)
            .map(|&index| &self.profiles[index])
    }

    pub fn for_path(&self, path: &str) -> Option<&LanguageProfile> {
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension
            .get(&ext)
            .map(|&index| &self.profiles[index])
    }

    /// Resolve by explicit id first, then by file extension.
    pub fn resolve(&self, language_id: Option<&str>, path: &str) -> Option<&LanguageProfile> {
        language_id
            .and_then(|id| self.get(id))
            .or_else(|| self.for_path(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
