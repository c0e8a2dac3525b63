use crate::models::{ImportKind, ImportStatement};
use tree_sitter::{Node, Parser, Tree};

use super::ParserError;

pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self, ParserError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ParserError::InitError(e.to_string()))?;

        Ok(Self { parser })
    }

    /// Parse source code and extract every import statement in it.
    ///
    /// Fails if the syntax tree contains any error or missing node, or any
    /// construct the grammar recovers into that Python 3 rejects.
    pub fn parse(&mut self, source: &str) -> Result<Vec<ImportStatement>, ParserError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ParserError::InitError("parser returned no tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error_position(&root).unwrap_or((1, 0));
            return Err(ParserError::ParseError { line, column });
        }
        if let Some((line, column)) = first_invalid_position(&root, source) {
            return Err(ParserError::ParseError { line, column });
        }

        Ok(self.extract_imports(source, &tree))
    }

    fn extract_imports(&self, source: &str, tree: &Tree) -> Vec<ImportStatement> {
        let mut imports = Vec::new();
        let root = tree.root_node();

        self.traverse_node(&root, source, &mut imports);

        imports
    }

    fn traverse_node(&self, node: &Node, source: &str, imports: &mut Vec<ImportStatement>) {
        match node.kind() {
            "import_statement" => {
                self.parse_import_statement(node, source, imports);
            }
            "import_from_statement" => {
                self.parse_import_from_statement(node, source, imports);
            }
            "future_import_statement" => {
                imports.push(ImportStatement {
                    module: "__future__".to_string(),
                    kind: ImportKind::From,
                    level: 0,
                    line: node.start_position().row + 1,
                    column: node.start_position().column,
                    alias: None,
                });
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.traverse_node(&child, source, imports);
                }
            }
        }
    }

    /// Parse `import x, y.z` or `import x as alias`
    fn parse_import_statement(
        &self,
        node: &Node,
        source: &str,
        imports: &mut Vec<ImportStatement>,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let (module, alias) = match child.kind() {
                "dotted_name" => (self.get_node_text(&child, source), None),
                "aliased_import" => self.parse_aliased_import(&child, source),
                _ => continue,
            };

            imports.push(ImportStatement {
                module,
                kind: ImportKind::Import,
                level: 0,
                line: child.start_position().row + 1,
                column: child.start_position().column,
                alias,
            });
        }
    }

    /// Parse `from x import y` or `from ..x import y`.
    ///
    /// `from . import y` names no module and yields nothing.
    fn parse_import_from_statement(
        &self,
        node: &Node,
        source: &str,
        imports: &mut Vec<ImportStatement>,
    ) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };

        let (module, level) = match module_node.kind() {
            "relative_import" => self.parse_relative_import(&module_node, source),
            _ => (self.get_node_text(&module_node, source), 0),
        };

        if module.is_empty() {
            return;
        }

        imports.push(ImportStatement {
            module,
            kind: ImportKind::From,
            level,
            line: node.start_position().row + 1,
            column: node.start_position().column,
            alias: None,
        });
    }

    /// Split a relative import into its module part and dot count
    fn parse_relative_import(&self, node: &Node, source: &str) -> (String, usize) {
        let mut level = 0;
        let mut module = String::new();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import_prefix" => {
                    level = self.get_node_text(&child, source).matches('.').count();
                }
                "dotted_name" => {
                    module = self.get_node_text(&child, source);
                }
                _ => {}
            }
        }

        (module, level)
    }

    /// Parse aliased import (x as y)
    fn parse_aliased_import(&self, node: &Node, source: &str) -> (String, Option<String>) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.get_node_text(&n, source))
            .unwrap_or_default();
        let alias = node
            .child_by_field_name("alias")
            .map(|n| self.get_node_text(&n, source));

        (name, alias)
    }

    fn get_node_text(&self, node: &Node, source: &str) -> String {
        source[node.byte_range()].to_string()
    }
}

/// 1-based line and 0-based column of the first error or missing node
fn first_error_position(node: &Node) -> Option<(usize, usize)> {
    if node.is_error() || node.is_missing() {
        let pos = node.start_position();
        return Some((pos.row + 1, pos.column));
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.iter().find_map(first_error_position)
}

/// Position of the first statement Python 3 would reject despite a clean tree.
///
/// The grammar accepts Python 2 `print`/`exec` statements and `except X, e`,
/// and does not enforce indentation of top-level statements.
fn first_invalid_position(root: &Node, source: &str) -> Option<(usize, usize)> {
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != "comment" && is_indented(&child, source) {
            let pos = child.start_position();
            return Some((pos.row + 1, pos.column));
        }
    }

    find_legacy_statement(root)
}

/// True when only whitespace precedes `node` on its first line
fn is_indented(node: &Node, source: &str) -> bool {
    let start = node.start_byte();
    let column = node.start_position().column;
    if column == 0 {
        return false;
    }
    source[start - column..start]
        .chars()
        .all(|c| c == ' ' || c == '\t' || c == '\x0c')
}

fn find_legacy_statement(node: &Node) -> Option<(usize, usize)> {
    let legacy = match node.kind() {
        "print_statement" | "exec_statement" => true,
        "except_clause" => {
            let mut cursor = node.walk();
            let found = node.children(&mut cursor).any(|c| c.kind() == ",");
            found
        }
        _ => false,
    };
    if legacy {
        let pos = node.start_position();
        return Some((pos.row + 1, pos.column));
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.iter().find_map(find_legacy_statement)
}
