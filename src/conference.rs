//! Conference name and year inference from free text.
//!
//! Best-effort pattern matching over titles and descriptions. A year is only
//! reported alongside a recognized conference name.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A conference recognized in free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub name: String,
    pub year: Option<i32>,
}

struct Pattern {
    regex: Regex,
    name: &'static str,
    /// Only accept the match when a year follows the name directly.
    needs_year: bool,
}

/// Year directly after a conference name: "PyCon KR 2024", "PyCon.KR-2019",
/// "PyConKR2024". Two-digit years are not recognized.
const ADJACENT_YEAR: &str = r"[\s.\-_:]*((?:19|20)\d{2})";

/// Ordered most specific first: (pattern, name, needs_year, bounded).
///
/// A bounded pattern must end at a word boundary unless a year is attached,
/// so "PyCon Krakow" is not "PyCon KR" but "PyConKR2024" is.
const PATTERNS: &[(&str, &str, bool, bool)] = &[
    (r"pycon[\s.\-_]*(?:kr|korea)", "PyCon KR", false, true),
    (r"파이콘(?:\s*(?:한국|코리아))?", "PyCon KR", false, false),
    (r"pycon[\s.\-_]*(?:us|usa)", "PyCon US", false, true),
    (r"pycon[\s.\-_]*(?:jp|japan)", "PyCon JP", false, true),
    (r"pycon[\s.\-_]*(?:apac|asia[\s\-]*pacific)", "PyCon APAC", false, true),
    (r"djangocon(?:[\s.\-_]*(?:us|eu|europe))?", "DjangoCon", false, false),
    (r"europython", "EuroPython", false, false),
    (r"pycascades", "PyCascades", false, false),
    (r"jupyter[\s\-]*con", "JupyterCon", false, false),
    (r"\bscipy(?:[\s\-]*(?:conference|conf))?", "SciPy", true, false),
    (r"\bpycon", "PyCon", false, false),
    (r"python[\s\-]*conference", "Python Conference", false, false),
];

fn patterns() -> &'static [Pattern] {
    static COMPILED: OnceLock<Vec<Pattern>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|(pattern, name, needs_year, bounded)| {
                let source = if *bounded {
                    format!(r"(?i){}(?:{}|\b)", pattern, ADJACENT_YEAR)
                } else {
                    format!("(?i){}(?:{})?", pattern, ADJACENT_YEAR)
                };
                Pattern {
                    regex: Regex::new(&source).expect("Invalid conference pattern"),
                    name,
                    needs_year: *needs_year,
                }
            })
            .collect()
    })
}

fn standalone_year() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("Invalid regex"))
}

/// First standalone 19xx/20xx year in the text.
pub fn find_year(text: &str) -> Option<i32> {
    standalone_year()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Infer a conference name and year from text.
///
/// When the name is not directly followed by a year, the first standalone
/// 19xx/20xx anywhere in the text is used instead.
pub fn infer_conference(text: &str) -> Option<Conference> {
    for pattern in patterns() {
        let Some(caps) = pattern.regex.captures(text) else {
            continue;
        };

        let adjacent = caps.get(1).and_then(|m| m.as_str().parse::<i32>().ok());
        if pattern.needs_year && adjacent.is_none() {
            continue;
        }

        let year = adjacent.or_else(|| find_year(text));

        return Some(Conference {
            name: pattern.name.to_string(),
            year,
        });
    }

    None
}
