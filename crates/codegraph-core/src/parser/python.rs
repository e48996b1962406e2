//! Python parser using tree-sitter.

use std::collections::VecDeque;

use tree_sitter::Node;

use super::result::{ImportKind, ParseResult, ParsedCall, ParsedFunction, ParsedImport};
use super::traits::Parser;
use super::treesitter::TreeSitterParser;
use super::ParseError;

/// Python parser using tree-sitter.
pub struct PythonParser {
    base: TreeSitterParser,
}

impl PythonParser {
    pub fn new() -> Self {
        Self {
            base: TreeSitterParser::new(
                tree_sitter_python::LANGUAGE.into(),
                "Python",
                &["py"],
            ),
        }
    }

    fn extract_function(&self, node: &Node, content: &str) -> Option<ParsedFunction> {
        let name_node = node.child_by_field_name("name")?;
        let name = TreeSitterParser::node_text(&name_node, content).to_string();

        let is_async = node
            .child(0)
            .map(|c| c.kind() == "async")
            .unwrap_or(false);

        Some(ParsedFunction {
            name,
            start_line: TreeSitterParser::node_line(node),
            end_line: TreeSitterParser::node_end_line(node),
            is_async,
            docstring: self.extract_docstring(node, content),
        })
    }

    /// The docstring is the first statement of the body when that statement
    /// is a bare string literal. f-strings and bytes literals do not count.
    fn extract_docstring(&self, node: &Node, content: &str) -> Option<String> {
        let body = node.child_by_field_name("body")?;
        let mut cursor = body.walk();
        let first_stmt = body
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment")?;

        if first_stmt.kind() != "expression_statement" || first_stmt.named_child_count() != 1 {
            return None;
        }
        let expr = first_stmt.named_child(0)?;

        let raw = match expr.kind() {
            "string" => string_value(&expr, content)?,
            "concatenated_string" => {
                let mut joined = String::new();
                let mut c = expr.walk();
                for part in expr.named_children(&mut c) {
                    if part.kind() == "string" {
                        joined.push_str(&string_value(&part, content)?);
                    }
                }
                joined
            }
            _ => return None,
        };

        Some(clean_docstring(&raw))
    }

    fn extract_imports(&self, node: &Node, content: &str, result: &mut ParseResult) {
        let line = TreeSitterParser::node_line(node);
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    let dotted = match child.kind() {
                        "dotted_name" => Some(child),
                        "aliased_import" => child.child_by_field_name("name"),
                        _ => None,
                    };
                    if let Some(dotted) = dotted {
                        result.imports.push(ParsedImport {
                            module: TreeSitterParser::node_text(&dotted, content).to_string(),
                            kind: ImportKind::Plain,
                            level: 0,
                            line,
                        });
                    }
                }
            }
            "import_from_statement" => {
                let Some(module) = node.child_by_field_name("module_name") else {
                    return;
                };
                let (name, level) = match module.kind() {
                    "relative_import" => {
                        let mut cursor = module.walk();
                        let mut level = 0;
                        let mut name = String::new();
                        for part in module.named_children(&mut cursor) {
                            match part.kind() {
                                "import_prefix" => {
                                    level = TreeSitterParser::node_text(&part, content)
                                        .chars()
                                        .filter(|c| *c == '.')
                                        .count();
                                }
                                "dotted_name" => {
                                    name = TreeSitterParser::node_text(&part, content).to_string();
                                }
                                _ => {}
                            }
                        }
                        (name, level)
                    }
                    _ => (TreeSitterParser::node_text(&module, content).to_string(), 0),
                };
                // `from . import x` names no module
                if !name.is_empty() {
                    result.imports.push(ParsedImport {
                        module: name,
                        kind: ImportKind::From,
                        level,
                        line,
                    });
                }
            }
            "future_import_statement" => {
                result.imports.push(ParsedImport {
                    module: "__future__".to_string(),
                    kind: ImportKind::From,
                    level: 0,
                    line,
                });
            }
            _ => {}
        }
    }

    fn extract_call(&self, node: &Node, content: &str) -> Option<ParsedCall> {
        let func = node.child_by_field_name("function")?;
        if func.kind() != "identifier" {
            return None;
        }
        Some(ParsedCall {
            callee: TreeSitterParser::node_text(&func, content).to_string(),
            caller: enclosing_function(node, content),
            line: TreeSitterParser::node_line(node),
        })
    }

    fn process_tree(&self, root: Node, content: &str, result: &mut ParseResult) {
        // Breadth-first, like walking a module AST level by level.
        let mut queue = VecDeque::from([root]);
        while let Some(node) = queue.pop_front() {
            match node.kind() {
                "function_definition" => {
                    if let Some(func) = self.extract_function(&node, content) {
                        result.functions.push(func);
                    }
                }
                "import_statement" | "import_from_statement" | "future_import_statement" => {
                    self.extract_imports(&node, content, result);
                }
                "call" => {
                    if let Some(call) = self.extract_call(&node, content) {
                        result.calls.push(call);
                    }
                }
                _ => {}
            }

            let mut cursor = node.walk();
            queue.extend(node.named_children(&mut cursor));
        }
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PythonParser {
    fn parse_file(&self, path: &str, content: &str) -> Result<ParseResult, ParseError> {
        let tree = self.base.parse_tree(content)?;
        let mut result = ParseResult::new(path);

        self.process_tree(tree.root_node(), content, &mut result);

        Ok(result)
    }

    fn language_name(&self) -> &'static str {
        self.base.language_name()
    }

    fn supported_extensions(&self) -> &[&'static str] {
        self.base.extensions()
    }
}

fn enclosing_function(node: &Node, content: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "function_definition" {
            return n
                .child_by_field_name("name")
                .map(|name| TreeSitterParser::node_text(&name, content).to_string());
        }
        current = n.parent();
    }
    None
}

/// Decoded value of a plain string literal, `None` for f-strings and bytes.
fn string_value(node: &Node, content: &str) -> Option<String> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    let start = children.iter().find(|c| c.kind() == "string_start")?;
    let end = children.iter().rev().find(|c| c.kind() == "string_end")?;

    let opener = TreeSitterParser::node_text(start, content);
    let prefix: String = opener
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }

    let body = &content[start.end_byte()..end.start_byte()];
    if prefix.contains('r') {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

/// Decode Python string escapes. Malformed escapes are kept verbatim.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let escape = &rest[pos + 1..];
        let (decoded, used) = decode_escape(escape);
        match decoded {
            Some(Some(c)) => out.push(c),
            Some(None) => {}
            None => out.push_str(&rest[pos..pos + 1 + used]),
        }
        rest = &escape[used..];
    }
    out.push_str(rest);
    out
}

/// Decode the escape following a backslash. Returns the character (or
/// `Some(None)` for a line continuation, `None` when malformed) and the
/// number of bytes consumed after the backslash.
fn decode_escape(escape: &str) -> (Option<Option<char>>, usize) {
    let Some(first) = escape.chars().next() else {
        return (None, 0);
    };
    if escape.starts_with("\r\n") {
        return (Some(None), 2);
    }
    let simple = match first {
        '\n' => Some(None),
        'n' => Some(Some('\n')),
        't' => Some(Some('\t')),
        'r' => Some(Some('\r')),
        'a' => Some(Some('\u{07}')),
        'b' => Some(Some('\u{08}')),
        'f' => Some(Some('\u{0C}')),
        'v' => Some(Some('\u{0B}')),
        '\\' | '\'' | '"' => Some(Some(first)),
        _ => None,
    };
    if let Some(decoded) = simple {
        return (Some(decoded), first.len_utf8());
    }

    match first {
        '0'..='7' => {
            let digits = escape.bytes().take(3).take_while(|b| (b'0'..=b'7').contains(b)).count();
            let decoded = u32::from_str_radix(&escape[..digits], 8).ok().and_then(char::from_u32);
            (decoded.map(Some), digits)
        }
        'x' => hex_escape(escape, 2),
        'u' => hex_escape(escape, 4),
        'U' => hex_escape(escape, 8),
        'N' => {
            let name = escape
                .strip_prefix("N{")
                .and_then(|tail| tail.find('}').map(|end| &tail[..end]));
            match name {
                Some(name) => {
                    let used = name.len() + 3;
                    (unicode_names2::character(name).map(Some), used)
                }
                None => (None, 1),
            }
        }
        other => (None, other.len_utf8()),
    }
}

/// `\x`, `\u` and `\U` take exactly `digits` hex digits.
fn hex_escape(escape: &str, digits: usize) -> (Option<Option<char>>, usize) {
    let hex = escape.get(1..1 + digits).filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()));
    match hex {
        Some(hex) => {
            let decoded = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
            (decoded.map(Some), 1 + digits)
        }
        None => (None, 1),
    }
}

/// Normalize docstring indentation the way Python's `inspect.cleandoc` does:
/// the first line is stripped, the common margin of the remaining lines is
/// removed, and blank lines at either end are dropped.
pub fn clean_docstring(raw: &str) -> String {
    let expanded = expand_tabs(raw);
    let lines: Vec<&str> = expanded.split('\n').collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min();

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    if let Some(first) = lines.first() {
        cleaned.push(first.trim().to_string());
    }
    for line in lines.iter().skip(1) {
        let stripped = match margin {
            Some(m) if line.is_char_boundary(m) && line[..m].trim().is_empty() => &line[m..],
            _ => line.trim_start(),
        };
        cleaned.push(stripped.trim_end().to_string());
    }

    while cleaned.first().map(|l| l.is_empty()).unwrap_or(false) {
        cleaned.remove(0);
    }
    while cleaned.last().map(|l| l.is_empty()).unwrap_or(false) {
        cleaned.pop();
    }

    cleaned.join("\n")
}

fn expand_tabs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut column = 0;
    for c in s.chars() {
        match c {
            '\t' => {
                let pad = 8 - column % 8;
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\n' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ParseResult {
        PythonParser::new().parse_file("test.py", src).unwrap()
    }

    #[test]
    fn test_functions_and_docstrings() {
        let result = parse("def foo(): pass\n\ndef bar():\n    \"\"\"does bar\"\"\"\n");
        assert_eq!(result.functions.len(), 2);
        assert_eq!(result.functions[0].name, "foo");
        assert_eq!(result.functions[0].docstring, None);
        assert_eq!(result.functions[1].docstring.as_deref(), Some("does bar"));
    }

    #[test]
    fn test_async_function() {
        let result = parse("async def fetch():\n    'Fetch it.'\n    return 1\n");
        assert_eq!(result.functions.len(), 1);
        assert!(result.functions[0].is_async);
        assert_eq!(result.functions[0].docstring.as_deref(), Some("Fetch it."));
    }

    #[test]
    fn test_methods_and_nested_functions() {
        let src = "class A:\n    def m(self):\n        def inner():\n            pass\n        return inner\n";
        let names: Vec<_> = parse(src).functions.into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["m", "inner"]);
    }

    #[test]
    fn test_fstring_is_not_a_docstring() {
        let result = parse("def f(x):\n    f\"value {x}\"\n");
        assert_eq!(result.functions[0].docstring, None);
    }

    #[test]
    fn test_bytes_is_not_a_docstring() {
        let result = parse("def f():\n    b'raw'\n");
        assert_eq!(result.functions[0].docstring, None);
    }

    #[test]
    fn test_docstring_escapes_are_decoded() {
        let src = "def f():\n    \"Say \\'hi\\' \\x41\\u00e9\\U0001F600 \\101\\0 \\a\\f\\v \\N{BULLET}\"\n";
        let doc = parse(src).functions[0].docstring.clone().unwrap();
        assert_eq!(doc, "Say 'hi' A\u{e9}\u{1F600} A\u{0} \u{07}\u{0C}\u{0B} \u{2022}");
    }

    #[test]
    fn test_unescape_keeps_malformed_escapes() {
        assert_eq!(unescape(r"\q \xZ1 \u12 \N{NOT A NAME} \N"), r"\q \xZ1 \u12 \N{NOT A NAME} \N");
        assert_eq!(unescape("end\\"), "end\\");
        assert_eq!(unescape("one \\\ntwo"), "one two");
        assert_eq!(unescape("one \\\r\ntwo"), "one two");
        assert_eq!(unescape(r"\\x41"), r"\x41");
        assert_eq!(unescape(r"\1234"), "S4");
    }

    #[test]
    fn test_raw_docstring_keeps_backslashes() {
        let result = parse("def f():\n    r\"C:\\new\\x41\"\n");
        assert_eq!(result.functions[0].docstring.as_deref(), Some(r"C:\new\x41"));
    }

    #[test]
    fn test_comment_before_docstring() {
        let result = parse("def f():\n    # note\n    \"\"\"Doc.\"\"\"\n");
        assert_eq!(result.functions[0].docstring.as_deref(), Some("Doc."));
    }

    #[test]
    fn test_multiline_docstring_is_dedented() {
        let src = "def f():\n    \"\"\"\n    Summary line.\n\n    Args:\n        x: value\n    \"\"\"\n";
        let doc = parse(src).functions[0].docstring.clone().unwrap();
        assert_eq!(doc, "Summary line.\n\nArgs:\n    x: value");
    }

    #[test]
    fn test_syntax_error() {
        let err = PythonParser::new()
            .parse_file("bad.py", "def broken(:\n    pass\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_imports() {
        let src = "import os, pkg.sub as s\nfrom models import User\nfrom .local import thing\nfrom . import sibling\n";
        let imports = parse(src).imports;
        let modules: Vec<_> = imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["os", "pkg.sub", "models", "local"]);
        assert_eq!(imports[1].top_level(), "pkg");
        assert_eq!(imports[3].level, 1);
        assert_eq!(imports[2].kind, ImportKind::From);
    }

    #[test]
    fn test_calls_with_enclosing_function() {
        let src = "def outer():\n    helper(1)\n    obj.method()\n\nsetup()\n";
        let calls = parse(src).calls;
        assert_eq!(calls.len(), 2);
        let helper = calls.iter().find(|c| c.callee == "helper").unwrap();
        assert_eq!(helper.caller.as_deref(), Some("outer"));
        let setup = calls.iter().find(|c| c.callee == "setup").unwrap();
        assert_eq!(setup.caller, None);
    }

    #[test]
    fn test_clean_docstring() {
        assert_eq!(clean_docstring("  one line  "), "one line");
        assert_eq!(clean_docstring("First\n      indented\n    less"), "First\n  indented\nless");
        assert_eq!(clean_docstring("\n\n   body\n\n"), "body");
    }
}
