//! Google-style docstring sections.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parser::clean_docstring;

/// A docstring split into its conventional parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocstringSections {
    pub summary: String,
    pub parameters: IndexMap<String, String>,
    pub returns: String,
    pub raises: String,
    pub note: String,
    pub example: String,
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+):(.*)$").expect("valid header regex"))
}

fn param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\*{0,2}\w+)\s*(?:\([^)]*\))?\s*:\s*(.*)$").expect("valid parameter regex")
    })
}

impl DocstringSections {
    /// Split a docstring on unindented `Header:` lines. The text before the
    /// first header is the summary; unknown headers are ignored.
    pub fn parse(docstring: &str) -> Self {
        let mut result = Self::default();
        let text = docstring.trim();
        if text.is_empty() {
            return result;
        }

        let mut sections: Vec<(Option<String>, Vec<&str>)> = vec![(None, Vec::new())];
        for (i, line) in text.lines().enumerate() {
            let header = (i > 0)
                .then(|| header_re().captures(line))
                .flatten();
            match header {
                Some(caps) => {
                    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                    sections.push((Some(caps[1].to_string()), vec![rest]));
                }
                None => {
                    if let Some((_, lines)) = sections.last_mut() {
                        lines.push(line);
                    }
                }
            }
        }

        for (header, lines) in sections {
            match header.as_deref() {
                None => result.summary = lines.join("\n").trim().to_string(),
                Some("Args" | "Arguments" | "Parameters" | "Params") => {
                    result.parameters = parse_parameters(&lines);
                }
                Some("Returns" | "Return" | "Yields") => result.returns = section_body(&lines),
                Some("Raises") => result.raises = section_body(&lines),
                Some("Note" | "Notes") => result.note = section_body(&lines),
                Some("Example" | "Examples") => result.example = section_body(&lines),
                Some(_) => {}
            }
        }

        result
    }

    /// True when nothing beyond an empty summary was found.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.parameters.is_empty()
            && self.returns.is_empty()
            && self.raises.is_empty()
            && self.note.is_empty()
            && self.example.is_empty()
    }
}

fn section_body(lines: &[&str]) -> String {
    clean_docstring(&lines.join("\n"))
}

fn parse_parameters(lines: &[&str]) -> IndexMap<String, String> {
    let mut params: IndexMap<String, String> = IndexMap::new();
    let mut current: Option<String> = None;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(caps) = param_re().captures(line) {
            let name = caps[1].to_string();
            params.insert(name.clone(), caps[2].trim().to_string());
            current = Some(name);
        } else if let Some(desc) = current.as_ref().and_then(|n| params.get_mut(n)) {
            if !desc.is_empty() {
                desc.push(' ');
            }
            desc.push_str(line.trim());
        }
    }

    params
}
