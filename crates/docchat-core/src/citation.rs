//! Citation binding.
//!
//! Marks the places where a generated answer quotes a retrieved passage
//! verbatim and appends a numbered sources section:
//!
//! ```text
//! Python is a programming language.[^1] It is popular.
//!
//! ### Sources
//! - [^1] **Python Guide**
//!   Python is a programming language.
//! ```
//!
//! Matching is literal. A paraphrased passage gets no marker, although its
//! source is still listed.

use serde::Serialize;
use serde_json::Value;

use crate::models::{Candidate, Metadata, SOURCE_ID_KEY};

/// Characters of candidate content shown under each source entry.
pub const EXCERPT_CHARS: usize = 100;

const FALLBACK_LABEL: &str = "Document";

/// One entry of the sources section. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub index: usize,
    pub label: String,
    pub excerpt: String,
}

/// An answer with inline `[^i]` markers and its citation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedResponse {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Annotate `raw_answer` with markers for `results`.
///
/// Every literal occurrence of candidate `i`'s content is followed by
/// `[^i]`. Insertion points are all found in the unmodified answer and
/// spliced in a single pass, so markers never affect matching. With no
/// results the answer comes back unchanged and without a sources section.
pub fn bind(raw_answer: &str, results: &[Candidate]) -> AnnotatedResponse {
    if results.is_empty() {
        return AnnotatedResponse {
            text: raw_answer.to_string(),
            citations: Vec::new(),
        };
    }

    // (byte offset just past the passage, citation index)
    let mut inserts: Vec<(usize, usize)> = Vec::new();
    for (i, candidate) in results.iter().enumerate() {
        if candidate.content.is_empty() {
            continue;
        }
        for (pos, matched) in raw_answer.match_indices(candidate.content.as_str()) {
            inserts.push((pos + matched.len(), i + 1));
        }
    }
    inserts.sort_unstable();

    let mut text = String::with_capacity(raw_answer.len() + inserts.len() * 5 + 64);
    let mut cursor = 0;
    for (pos, index) in inserts {
        text.push_str(&raw_answer[cursor..pos]);
        text.push_str(&format!("[^{}]", index));
        cursor = pos;
    }
    text.push_str(&raw_answer[cursor..]);

    let citations: Vec<Citation> = results
        .iter()
        .enumerate()
        .map(|(i, c)| Citation {
            index: i + 1,
            label: derive_label(&c.metadata),
            excerpt: excerpt(&c.content),
        })
        .collect();

    let entries: Vec<String> = citations
        .iter()
        .map(|c| format!("- [^{}] **{}**\n  {}", c.index, c.label, c.excerpt))
        .collect();
    text.push_str("\n\n### Sources\n");
    text.push_str(&entries.join("\n"));

    AnnotatedResponse { text, citations }
}

/// Human-readable label for a candidate's source.
///
/// Looks up `source`, then `metadata.source`, then `source_id`, and falls
/// back to `"Document"`. The path is reduced to its file stem, underscores
/// become spaces, and the result is title-cased:
///
/// ```rust
/// use docchat_core::citation::derive_label;
/// use serde_json::json;
///
/// let m = json!({"source": "path/to/My_Doc.md"});
/// assert_eq!(derive_label(m.as_object().unwrap()), "My Doc");
/// ```
pub fn derive_label(metadata: &Metadata) -> String {
    let raw = non_empty_str(metadata.get("source"))
        .or_else(|| {
            metadata
                .get("metadata")
                .and_then(Value::as_object)
                .and_then(|nested| non_empty_str(nested.get("source")))
        })
        .or_else(|| non_empty_str(metadata.get(SOURCE_ID_KEY)))
        .unwrap_or(FALLBACK_LABEL);

    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    if stem.is_empty() {
        return FALLBACK_LABEL.to_string();
    }

    title_case(&stem.replace('_', " "))
}

/// First [`EXCERPT_CHARS`] characters of `content`, with `...` appended
/// when anything was cut.
pub fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Upper-case the first letter of each alphabetic run, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    fn candidate(content: &str, source: &str) -> Candidate {
        Candidate {
            content: content.to_string(),
            metadata: meta(json!({ "source": source })),
            distance: 0.2,
        }
    }

    #[test]
    fn test_empty_results_leave_answer_untouched() {
        let out = bind("Nothing to cite here.", &[]);
        assert_eq!(out.text, "Nothing to cite here.");
        assert!(out.citations.is_empty());
    }

    #[test]
    fn test_verbatim_passage_gets_marker_and_source() {
        let results = vec![candidate(
            "Python is a programming language.",
            "docs/python_guide.md",
        )];
        let out = bind(
            "Sure. Python is a programming language. It is popular.",
            &results,
        );
        assert_eq!(
            out.text,
            "Sure. Python is a programming language.[^1] It is popular.\n\n\
             ### Sources\n\
             - [^1] **Python Guide**\n  Python is a programming language."
        );
        assert_eq!(out.text.matches("[^1]").count(), 2);
        assert_eq!(out.citations.len(), 1);
        assert_eq!(out.citations[0].label, "Python Guide");
    }

    #[test]
    fn test_paraphrase_is_listed_but_not_marked() {
        let results = vec![candidate("Rust has no garbage collector.", "rust.md")];
        let out = bind("Rust manages memory without a GC.", &results);
        assert!(out
            .text
            .starts_with("Rust manages memory without a GC.\n\n### Sources\n"));
        assert!(out.text.contains("- [^1] **Rust**"));
    }

    #[test]
    fn test_every_occurrence_is_marked() {
        let results = vec![candidate("tea", "t.md")];
        let out = bind("tea and tea", &results);
        assert!(out.text.starts_with("tea[^1] and tea[^1]"));
    }

    #[test]
    fn test_markers_do_not_break_later_matches() {
        // The second passage spans the end of the first.
        let results = vec![candidate("one two", "a.md"), candidate("two three", "b.md")];
        let out = bind("one two three", &results);
        assert!(out.text.starts_with("one two[^1] three[^2]"));
    }

    #[test]
    fn test_empty_candidate_content_never_matches() {
        let results = vec![candidate("", "a.md")];
        let out = bind("abc", &results);
        assert!(out.text.starts_with("abc\n\n### Sources\n- [^1] **A**\n  "));
    }

    #[test]
    fn test_sources_entries_joined_by_newline() {
        let results = vec![candidate("x", "a.md"), candidate("y", "b.md")];
        let out = bind("z", &results);
        assert!(out
            .text
            .ends_with("### Sources\n- [^1] **A**\n  x\n- [^2] **B**\n  y"));
    }

    #[test]
    fn test_label_lookup_order() {
        assert_eq!(derive_label(&meta(json!({"source": "a/b/user_guide.txt"}))), "User Guide");
        assert_eq!(
            derive_label(&meta(json!({"metadata": {"source": "nested_doc.md"}}))),
            "Nested Doc"
        );
        assert_eq!(derive_label(&meta(json!({"source_id": "notes/api.md"}))), "Api");
        assert_eq!(derive_label(&Metadata::new()), "Document");
    }

    #[test]
    fn test_label_windows_path_and_dotfiles() {
        assert_eq!(derive_label(&meta(json!({"source": "C:\\docs\\READ_ME.md"}))), "Read Me");
        assert_eq!(derive_label(&meta(json!({"source": ".env"}))), ".Env");
        assert_eq!(derive_label(&meta(json!({"source": "archive.tar.gz"}))), "Archive.Tar");
        assert_eq!(derive_label(&meta(json!({"source": "docs/"}))), "Document");
    }

    #[test]
    fn test_label_is_pure() {
        let m = meta(json!({"source": "path/to/My_Doc.md"}));
        assert_eq!(derive_label(&m), derive_label(&m));
        assert_eq!(derive_label(&m), "My Doc");
    }

    #[test]
    fn test_excerpt_truncates_on_characters() {
        assert_eq!(excerpt("short"), "short");
        let exact = "a".repeat(100);
        assert_eq!(excerpt(&exact), exact);
        let long = "é".repeat(150);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 103);
    }
}
