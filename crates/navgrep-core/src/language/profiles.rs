use regex::Regex;

use super::filters;
use super::{
    BlockStyle, CommentStyle, CommentSyntax, DefinitionFilter, DocPlacement, LanguageProfile,
    LineStyle,
};

struct BlockDef {
    start: &'static str,
    end: &'static str,
    noise: Option<&'static str>,
}

/// A comment dialect described with plain patterns; compiled into a
/// [`CommentStyle`] when the registry is built.
struct CommentDef {
    line: Option<&'static str>,
    block: Option<BlockDef>,
    placement: DocPlacement,
}

const C_STYLE: CommentDef = CommentDef {
    line: Some(r"///?!?\s?(.*)"),
    block: Some(BlockDef {
        start: r"/\*\*?",
        end: r"\*/",
        noise: Some(r"^\s*\*\s?"),
    }),
    placement: DocPlacement::Above,
};

const SLASH_ONLY: CommentDef = CommentDef {
    line: Some(r"///?\s?(.*)"),
    block: None,
    placement: DocPlacement::Above,
};

const HASH: CommentDef = CommentDef {
    line: Some(r"#+\s?(.*)"),
    block: None,
    placement: DocPlacement::Above,
};

const PYTHON_DOUBLE: CommentDef = CommentDef {
    line: Some(r"#\s?(.*)"),
    block: Some(BlockDef {
        start: r#"[rRuU]?""""#,
        end: r#"""""#,
        noise: None,
    }),
    placement: DocPlacement::Below,
};

const PYTHON_SINGLE: CommentDef = CommentDef {
    line: None,
    block: Some(BlockDef {
        start: r"[rRuU]?'''",
        end: r"'''",
        noise: None,
    }),
    placement: DocPlacement::Below,
};

const RUBY: CommentDef = CommentDef {
    line: Some(r"#\s?(.*)"),
    block: Some(BlockDef {
        start: r"^=begin",
        end: r"^=end",
        noise: None,
    }),
    placement: DocPlacement::Above,
};

const PERL: CommentDef = CommentDef {
    line: Some(r"#\s?(.*)"),
    block: Some(BlockDef {
        start: r"^=(?:pod|head\d|item)",
        end: r"^=cut",
        noise: None,
    }),
    placement: DocPlacement::Above,
};

const R_STYLE: CommentDef = CommentDef {
    line: Some(r"#'?\s?(.*)"),
    block: None,
    placement: DocPlacement::Above,
};

const LISP: CommentDef = CommentDef {
    line: Some(r";+\s?(.*)"),
    block: None,
    placement: DocPlacement::Above,
};

const HASKELL: CommentDef = CommentDef {
    line: Some(r"--\s?\|?\s?(.*)"),
    block: Some(BlockDef {
        start: r"\{-\|?",
        end: r"-\}",
        noise: None,
    }),
    placement: DocPlacement::Above,
};

const LUA: CommentDef = CommentDef {
    line: Some(r"---?\s?(.*)"),
    block: Some(BlockDef {
        start: r"--\[\[",
        end: r"\]\]",
        noise: None,
    }),
    placement: DocPlacement::Above,
};

const SQL_DASH: CommentDef = CommentDef {
    line: Some(r"--\s?(.*)"),
    block: None,
    placement: DocPlacement::Above,
};

const ERLANG: CommentDef = CommentDef {
    line: Some(r"%+\s?(.*)"),
    block: None,
    placement: DocPlacement::Above,
};

const OCAML: CommentDef = CommentDef {
    line: None,
    block: Some(BlockDef {
        start: r"\(\*\*?",
        end: r"\*\)",
        noise: Some(r"^\s*\*\s?"),
    }),
    placement: DocPlacement::Above,
};

const PASCAL: CommentDef = CommentDef {
    line: Some(r"//\s?(.*)"),
    block: Some(BlockDef {
        start: r"\{",
        end: r"\}",
        noise: None,
    }),
    placement: DocPlacement::Above,
};

const FORTRAN: CommentDef = CommentDef {
    line: Some(r"!>?\s?(.*)"),
    block: None,
    placement: DocPlacement::Above,
};

const COBOL: CommentDef = CommentDef {
    line: Some(r"\*>\s?(.*)"),
    block: None,
    placement: DocPlacement::Above,
};

const ELIXIR_DOC: CommentDef = CommentDef {
    line: Some(r"#\s?(.*)"),
    block: Some(BlockDef {
        start: r#"@(?:module)?doc\s+""""#,
        end: r#"""""#,
        noise: None,
    }),
    placement: DocPlacement::Above,
};

const JULIA_DOC: CommentDef = CommentDef {
    line: Some(r"#\s?(.*)"),
    block: Some(BlockDef {
        start: r#"""""#,
        end: r#"""""#,
        noise: None,
    }),
    placement: DocPlacement::Above,
};

const POWERSHELL: CommentDef = CommentDef {
    line: Some(r"#\s?(.*)"),
    block: Some(BlockDef {
        start: r"<#",
        end: r"#>",
        noise: None,
    }),
    placement: DocPlacement::Above,
};

const DEFAULT_IDENT: &str = "[A-Za-z0-9_]";

struct ProfileDef {
    id: &'static str,
    name: &'static str,
    extensions: &'static [&'static str],
    comments: &'static [&'static CommentDef],
    ident: &'static str,
    docstring_ignore: Option<&'static str>,
    filter: Option<DefinitionFilter>,
}

impl ProfileDef {
    const fn new(
        id: &'static str,
        name: &'static str,
        extensions: &'static [&'static str],
        comments: &'static [&'static CommentDef],
    ) -> Self {
        Self {
            id,
            name,
            extensions,
            comments,
            ident: DEFAULT_IDENT,
            docstring_ignore: None,
            filter: None,
        }
    }

    const fn ident(mut self, ident: &'static str) -> Self {
        self.ident = ident;
        self
    }

    const fn ignore(mut self, pattern: &'static str) -> Self {
        self.docstring_ignore = Some(pattern);
        self
    }

    const fn filter(mut self, filter: DefinitionFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

// Order matters for shared extensions: the first profile claiming an
// extension answers path lookups (`.h` resolves to C++).
const PROFILES: &[ProfileDef] = &[
    ProfileDef::new("cpp", "C++", &["cpp", "cc", "cxx", "hpp", "hh", "hxx", "h"], &[&C_STYLE])
        .filter(filters::c_family_filter),
    ProfileDef::new("c", "C", &["c", "h"], &[&C_STYLE]).filter(filters::c_family_filter),
    ProfileDef::new("cuda", "CUDA", &["cu", "cuh"], &[&C_STYLE]).filter(filters::c_family_filter),
    ProfileDef::new("objectivec", "Objective-C", &["m", "mm"], &[&C_STYLE])
        .filter(filters::c_family_filter),
    ProfileDef::new("csharp", "C#", &["cs"], &[&C_STYLE]).ignore(r"^\s*\["),
    ProfileDef::new("go", "Go", &["go"], &[&C_STYLE]).filter(filters::go_filter),
    ProfileDef::new("java", "Java", &["java"], &[&C_STYLE])
        .ignore(r"^\s*@")
        .filter(filters::java_filter),
    ProfileDef::new("kotlin", "Kotlin", &["kt", "kts"], &[&C_STYLE])
        .ignore(r"^\s*@")
        .filter(filters::java_filter),
    ProfileDef::new("scala", "Scala", &["scala", "sc"], &[&C_STYLE])
        .ignore(r"^\s*@")
        .filter(filters::java_filter),
    ProfileDef::new("groovy", "Groovy", &["groovy", "gradle"], &[&C_STYLE])
        .ignore(r"^\s*@")
        .filter(filters::java_filter),
    ProfileDef::new("apex", "Apex", &["cls", "trigger"], &[&C_STYLE]).ignore(r"^\s*@"),
    ProfileDef::new("typescript", "TypeScript", &["ts", "tsx", "mts", "cts"], &[&C_STYLE])
        .ignore(r"^\s*@")
        .filter(filters::javascript_filter),
    ProfileDef::new("javascript", "JavaScript", &["js", "jsx", "mjs", "cjs"], &[&C_STYLE])
        .filter(filters::javascript_filter),
    ProfileDef::new("python", "Python", &["py", "pyi"], &[&PYTHON_DOUBLE, &PYTHON_SINGLE])
        .filter(filters::python_filter),
    ProfileDef::new("rust", "Rust", &["rs"], &[&C_STYLE]).ignore(r"^\s*#!?\["),
    ProfileDef::new("swift", "Swift", &["swift"], &[&C_STYLE]).ignore(r"^\s*@"),
    ProfileDef::new("dart", "Dart", &["dart"], &[&C_STYLE]).ignore(r"^\s*@"),
    ProfileDef::new("php", "PHP", &["php", "phtml"], &[&C_STYLE, &HASH]).ignore(r"^\s*#\["),
    ProfileDef::new("zig", "Zig", &["zig"], &[&SLASH_ONLY]),
    ProfileDef::new("verilog", "Verilog", &["v", "sv", "svh"], &[&C_STYLE]),
    ProfileDef::new("protobuf", "Protocol Buffers", &["proto"], &[&C_STYLE]),
    ProfileDef::new("graphql", "GraphQL", &["graphql", "gql"], &[&HASH]),
    ProfileDef::new("thrift", "Thrift", &["thrift"], &[&C_STYLE, &HASH]),
    ProfileDef::new("ruby", "Ruby", &["rb", "rake", "gemspec"], &[&RUBY]).ident("[A-Za-z0-9_!?]"),
    ProfileDef::new("perl", "Perl", &["pl", "pm"], &[&PERL]),
    ProfileDef::new("shell", "Shell", &["sh", "bash", "zsh"], &[&HASH]),
    ProfileDef::new("powershell", "PowerShell", &["ps1", "psm1"], &[&POWERSHELL])
        .ident(r"[A-Za-z0-9_\-]"),
    ProfileDef::new("tcl", "Tcl", &["tcl"], &[&HASH]),
    ProfileDef::new("starlark", "Starlark", &["bzl", "star"], &[&PYTHON_DOUBLE]),
    ProfileDef::new("r", "R", &["r"], &[&R_STYLE]).ident("[A-Za-z0-9_.]"),
    ProfileDef::new("julia", "Julia", &["jl"], &[&JULIA_DOC]).ident("[A-Za-z0-9_!]"),
    ProfileDef::new("elixir", "Elixir", &["ex", "exs"], &[&ELIXIR_DOC]).ident("[A-Za-z0-9_!?]"),
    ProfileDef::new("erlang", "Erlang", &["erl", "hrl"], &[&ERLANG]),
    ProfileDef::new("haskell", "Haskell", &["hs", "lhs"], &[&HASKELL]).ident("[A-Za-z0-9_']"),
    ProfileDef::new("ocaml", "OCaml", &["ml", "mli"], &[&OCAML]).ident("[A-Za-z0-9_']"),
    ProfileDef::new("lua", "Lua", &["lua"], &[&LUA]),
    ProfileDef::new("sql", "SQL", &["sql"], &[&SQL_DASH]),
    ProfileDef::new("clojure", "Clojure", &["clj", "cljs", "cljc", "edn"], &[&LISP])
        .ident(r"[A-Za-z0-9_!?*+<>=\-]"),
    ProfileDef::new("lisp", "Lisp", &["lisp", "lsp", "cl", "el"], &[&LISP])
        .ident(r"[A-Za-z0-9_!?*+<>=\-]"),
    ProfileDef::new("pascal", "Pascal", &["pas", "pp"], &[&PASCAL]),
    ProfileDef::new("fortran", "Fortran", &["f", "for", "f90", "f95", "f03"], &[&FORTRAN]),
    ProfileDef::new("cobol", "COBOL", &["cbl", "cob", "cpy"], &[&COBOL])
        .ident(r"[A-Za-z0-9_\-]"),
];

pub(super) fn builtin_profiles() -> Result<Vec<LanguageProfile>, regex::Error> {
    PROFILES.iter().map(compile).collect()
}

fn compile(def: &ProfileDef) -> Result<LanguageProfile, regex::Error> {
    let comment_styles = def
        .comments
        .iter()
        .filter_map(|comment| compile_comment(comment).transpose())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LanguageProfile {
        language_id: def.id.to_string(),
        display_name: def.name.to_string(),
        file_extensions: def.extensions.iter().map(|ext| ext.to_string()).collect(),
        comment_styles,
        identifier_char: Regex::new(def.ident)?,
        docstring_ignore: def.docstring_ignore.map(Regex::new).transpose()?,
        filter: def.filter,
    })
}

fn compile_comment(def: &CommentDef) -> Result<Option<CommentStyle>, regex::Error> {
    let line = def.line.map(LineStyle::new).transpose()?;
    let block = def
        .block
        .as_ref()
        .map(|block| BlockStyle::new(block.start, block.end, block.noise))
        .transpose()?;
    let syntax = match (line, block) {
        (Some(line), Some(block)) => CommentSyntax::Both { line, block },
        (Some(line), None) => CommentSyntax::Line(line),
        (None, Some(block)) => CommentSyntax::Block(block),
        (None, None) => return Ok(None),
    };
    Ok(Some(CommentStyle {
        syntax,
        placement: def.placement,
    }))
}
