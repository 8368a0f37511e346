//! Built-in grammar specs and embedded grammar registry.
//!
//! One [`GrammarSpec`] per supported language, plus the statically linked
//! grammar crates that serve as the embedded default when no version pin or
//! library override is in effect.

use mbp_domain::GrammarSpec;
use std::sync::LazyLock;
use tree_sitter::Language;

struct SpecRow {
    language: &'static str,
    symbol: &'static str,
    repository: &'static str,
    version: &'static str,
}

const SPEC_ROWS: &[SpecRow] = &[
    SpecRow {
        language: "c",
        symbol: "tree_sitter_c",
        repository: "tree-sitter/tree-sitter-c",
        version: "0.24.1",
    },
    SpecRow {
        language: "cpp",
        symbol: "tree_sitter_cpp",
        repository: "tree-sitter/tree-sitter-cpp",
        version: "0.23.4",
    },
    SpecRow {
        language: "csharp",
        symbol: "tree_sitter_c_sharp",
        repository: "tree-sitter/tree-sitter-c-sharp",
        version: "0.23.1",
    },
    SpecRow {
        language: "go",
        symbol: "tree_sitter_go",
        repository: "tree-sitter/tree-sitter-go",
        version: "0.25.0",
    },
    SpecRow {
        language: "java",
        symbol: "tree_sitter_java",
        repository: "tree-sitter/tree-sitter-java",
        version: "0.23.5",
    },
    SpecRow {
        language: "javascript",
        symbol: "tree_sitter_javascript",
        repository: "tree-sitter/tree-sitter-javascript",
        version: "0.25.0",
    },
    SpecRow {
        language: "typescript",
        symbol: "tree_sitter_typescript",
        repository: "tree-sitter/tree-sitter-typescript",
        version: "0.23.2",
    },
    SpecRow {
        language: "kotlin",
        symbol: "tree_sitter_kotlin",
        repository: "tree-sitter-grammars/tree-sitter-kotlin",
        version: "1.1.0",
    },
    SpecRow {
        language: "php",
        symbol: "tree_sitter_php",
        repository: "tree-sitter/tree-sitter-php",
        version: "0.24.2",
    },
    SpecRow {
        language: "python",
        symbol: "tree_sitter_python",
        repository: "tree-sitter/tree-sitter-python",
        version: "0.25.0",
    },
    SpecRow {
        language: "ruby",
        symbol: "tree_sitter_ruby",
        repository: "tree-sitter/tree-sitter-ruby",
        version: "0.23.1",
    },
    SpecRow {
        language: "rust",
        symbol: "tree_sitter_rust",
        repository: "tree-sitter/tree-sitter-rust",
        version: "0.24.0",
    },
    SpecRow {
        language: "scala",
        symbol: "tree_sitter_scala",
        repository: "tree-sitter/tree-sitter-scala",
        version: "0.24.0",
    },
    SpecRow {
        language: "swift",
        symbol: "tree_sitter_swift",
        repository: "alex-pinkus/tree-sitter-swift",
        version: "0.7.1",
    },
];

static SPECS: LazyLock<Vec<GrammarSpec>> = LazyLock::new(|| {
    SPEC_ROWS
        .iter()
        .map(|row| {
            GrammarSpec::new(
                row.language,
                row.symbol,
                &format!("libtree-sitter-{}", row.language),
                &format!("tree.sitter.{}.library", row.language),
                &format!("TREE_SITTER_{}_LIB", row.language.to_uppercase()),
                row.repository,
                row.version,
            )
            .expect("built-in grammar spec is well-formed")
        })
        .collect()
});

/// All built-in grammar specs.
pub fn builtin_specs() -> &'static [GrammarSpec] {
    &SPECS
}

/// Built-in spec for one language.
pub fn builtin_spec(language: &str) -> Option<&'static GrammarSpec> {
    SPECS.iter().find(|spec| spec.language() == language)
}

/// Embedded grammar for a language, from the statically linked crates.
///
/// `tsx` is exposed as its own key because the TypeScript grammar ships two
/// entry points.
pub fn bundled_language(language: &str) -> Option<Language> {
    let lang: Language = match language {
        "c" => tree_sitter_c::LANGUAGE.into(),
        "cpp" => tree_sitter_cpp::LANGUAGE.into(),
        "csharp" => tree_sitter_c_sharp::LANGUAGE.into(),
        "go" => tree_sitter_go::LANGUAGE.into(),
        "java" => tree_sitter_java::LANGUAGE.into(),
        "javascript" => tree_sitter_javascript::LANGUAGE.into(),
        "typescript" => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        "tsx" => tree_sitter_typescript::LANGUAGE_TSX.into(),
        "kotlin" => tree_sitter_kotlin_ng::LANGUAGE.into(),
        "php" => tree_sitter_php::LANGUAGE_PHP.into(),
        "python" => tree_sitter_python::LANGUAGE.into(),
        "ruby" => tree_sitter_ruby::LANGUAGE.into(),
        "rust" => tree_sitter_rust::LANGUAGE.into(),
        "scala" => tree_sitter_scala::LANGUAGE.into(),
        "swift" => tree_sitter_swift::LANGUAGE.into(),
        _ => return None,
    };
    Some(lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_spec_has_a_bundled_grammar() {
        for spec in builtin_specs() {
            assert!(
                bundled_language(spec.language()).is_some(),
                "no bundled grammar for {}",
                spec.language()
            );
        }
    }

    #[test]
    fn spec_lookup_by_language() {
        let spec = builtin_spec("python").unwrap();
        assert_eq!(spec.symbol(), "tree_sitter_python");
        assert_eq!(spec.env_key(), "TREE_SITTER_PYTHON_LIB");
        assert_eq!(spec.property_key(), "tree.sitter.python.library");
        assert!(builtin_spec("cobol").is_none());
    }
}
