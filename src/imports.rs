//! Import extraction.
//!
//! A second pass over the token stream, independent of the parser, that
//! collects `import`/`export ... from` statements so the module
//! resolver can walk the file graph. The extractor is fault-tolerant:
//! malformed import-like syntax never fails the pipeline; the statement
//! is abandoned at the first token that cannot be classified and the
//! scan continues.

use crate::tokenizer::{Token, TokenKind};

/// One import or re-export statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Imported names. For renames (`X as Z`) this holds the original
    /// exported name. Empty for `export * from` and side-effect
    /// imports.
    pub names: Vec<String>,
    /// The module specifier as written.
    pub module_path: String,
    /// `import X from "..."`.
    pub is_default: bool,
    /// `import * as N from "..."` or `export * from "..."`.
    pub is_namespace: bool,
    /// The local alias of a namespace import.
    pub namespace_alias: Option<String>,
}

/// Scan a token stream for import statements.
pub fn extract_imports(tokens: &[Token]) -> Vec<ImportStatement> {
    let mut extractor = Extractor { tokens, pos: 0 };
    let mut statements = Vec::new();
    while extractor.peek().kind != TokenKind::Eof {
        if extractor.peek().is_keyword("import") {
            extractor.bump();
            if let Some(statement) = extractor.import_statement() {
                statements.push(statement);
            }
        } else if extractor.peek().is_keyword("export") {
            extractor.bump();
            if let Some(statement) = extractor.reexport_statement() {
                statements.push(statement);
            }
        } else {
            extractor.bump();
        }
    }
    statements
}

struct Extractor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

static EOF_TOKEN: Token = Token {
    kind: TokenKind::Eof,
    value: String::new(),
    line: 0,
    column: 0,
};

impl<'a> Extractor<'a> {
    fn peek(&self) -> &Token {
        let mut index = self.pos;
        while matches!(
            self.tokens.get(index).map(|t| t.kind),
            Some(TokenKind::Newline)
        ) {
            index += 1;
        }
        self.tokens.get(index).unwrap_or(&EOF_TOKEN)
    }

    fn bump(&mut self) -> &Token {
        while matches!(
            self.tokens.get(self.pos).map(|t| t.kind),
            Some(TokenKind::Newline)
        ) {
            self.pos += 1;
        }
        let index = self.pos;
        if index < self.tokens.len() {
            self.pos += 1;
        }
        self.tokens.get(index).unwrap_or(&EOF_TOKEN)
    }

    fn eat_keyword(&mut self, value: &str) -> bool {
        if self.peek().is_keyword(value) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// After the `import` keyword.
    fn import_statement(&mut self) -> Option<ImportStatement> {
        self.eat_keyword("type");

        let token = self.peek().clone();
        match token.kind {
            // Side-effect import: `import "./polyfill"`.
            TokenKind::String => {
                self.bump();
                Some(ImportStatement {
                    names: Vec::new(),
                    module_path: token.value,
                    is_default: false,
                    is_namespace: false,
                    namespace_alias: None,
                })
            }
            TokenKind::Punctuation if token.value == "{" => {
                let names = self.named_bindings()?;
                let module_path = self.from_clause()?;
                Some(ImportStatement {
                    names,
                    module_path,
                    is_default: false,
                    is_namespace: false,
                    namespace_alias: None,
                })
            }
            TokenKind::Punctuation if token.value == "*" => {
                self.bump();
                if !self.eat_keyword("as") {
                    return None;
                }
                let alias = self.identifier()?;
                let module_path = self.from_clause()?;
                Some(ImportStatement {
                    names: Vec::new(),
                    module_path,
                    is_default: false,
                    is_namespace: true,
                    namespace_alias: Some(alias),
                })
            }
            TokenKind::Identifier => {
                let default_name = self.identifier()?;
                let mut names = vec![default_name];
                // `import X, { Y } from` mixes default and named.
                if self.peek().is_punct(",") {
                    self.bump();
                    if self.peek().is_punct("{") {
                        names.extend(self.named_bindings()?);
                    }
                }
                let module_path = self.from_clause()?;
                Some(ImportStatement {
                    names,
                    module_path,
                    is_default: true,
                    is_namespace: false,
                    namespace_alias: None,
                })
            }
            _ => None,
        }
    }

    /// After the `export` keyword. Only `export ... from` statements
    /// are imports; local export lists are ignored.
    fn reexport_statement(&mut self) -> Option<ImportStatement> {
        self.eat_keyword("type");

        let token = self.peek().clone();
        match token.kind {
            TokenKind::Punctuation if token.value == "{" => {
                let names = self.named_bindings()?;
                if !self.eat_keyword("from") {
                    return None;
                }
                let module_path = self.string()?;
                Some(ImportStatement {
                    names,
                    module_path,
                    is_default: false,
                    is_namespace: false,
                    namespace_alias: None,
                })
            }
            TokenKind::Punctuation if token.value == "*" => {
                self.bump();
                let alias = if self.eat_keyword("as") {
                    Some(self.identifier()?)
                } else {
                    None
                };
                if !self.eat_keyword("from") {
                    return None;
                }
                let module_path = self.string()?;
                Some(ImportStatement {
                    names: Vec::new(),
                    module_path,
                    is_default: false,
                    is_namespace: true,
                    namespace_alias: alias,
                })
            }
            _ => None,
        }
    }

    /// `{ X, Y as Z }` - returns the original exported names.
    fn named_bindings(&mut self) -> Option<Vec<String>> {
        if !self.peek().is_punct("{") {
            return None;
        }
        self.bump();
        let mut names = Vec::new();
        loop {
            let token = self.peek().clone();
            if token.is_punct("}") {
                self.bump();
                break;
            }
            match token.kind {
                TokenKind::Identifier | TokenKind::Keyword | TokenKind::Primitive => {
                    self.bump();
                    let mut name = token.value;
                    // `type X` inside the braces is a per-name type
                    // modifier, not a binding.
                    if name == "type"
                        && matches!(
                            self.peek().kind,
                            TokenKind::Identifier | TokenKind::Keyword | TokenKind::Primitive
                        )
                        && !self.peek().is_keyword("as")
                    {
                        name = self.bump().value.clone();
                    }
                    if self.eat_keyword("as") {
                        // Keep the original name; the alias is local.
                        self.identifier()?;
                    }
                    names.push(name);
                    if self.peek().is_punct(",") {
                        self.bump();
                    }
                }
                _ => return None,
            }
        }
        Some(names)
    }

    fn from_clause(&mut self) -> Option<String> {
        if !self.eat_keyword("from") {
            return None;
        }
        self.string()
    }

    fn identifier(&mut self) -> Option<String> {
        let token = self.peek().clone();
        if token.kind == TokenKind::Identifier {
            self.bump();
            Some(token.value)
        } else {
            None
        }
    }

    fn string(&mut self) -> Option<String> {
        let token = self.peek().clone();
        if token.kind == TokenKind::String {
            self.bump();
            Some(token.value)
        } else {
            None
        }
    }
}
