//! Recursive-descent parser for the declaration subset.
//!
//! Consumes the token stream and produces an ordered [`Declaration`]
//! list. One significant token of lookahead; newlines are transparent
//! to `peek`/`bump`. Malformed input fails with a [`ParseError`] naming
//! the offending token and what was expected - there is no recovery.
//!
//! The parser holds a single-slot pending-doc buffer. A `/** ... */`
//! token fills the slot and the next declaration or property consumed
//! takes it; modifier keywords like `export` in between leave it alone.
//!
//! Statements outside the subset (functions, variables, classes,
//! `declare namespace` bodies, import/export wiring) are skipped with a
//! brace-depth counter so nested blocks never desynchronize the stream.

use crate::ast::{
    Declaration, DeclarationBase, EnumDeclaration, EnumMember, EnumValue, IndexSignature,
    InterfaceDeclaration, PrimitiveKind, Property, TupleElement, TypeAliasDeclaration, TypeNode,
};
use crate::error::ParseError;
use crate::jsdoc::JsDoc;
use crate::tokenizer::{Token, TokenKind};

/// Parse a token stream into declarations.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Declaration>, ParseError> {
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pending_doc: Option<JsDoc>,
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        // The tokenizer guarantees a trailing `eof`, but `parse` accepts
        // any token vector; the sentinel keeps lookahead total.
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let (line, column) = tokens
                .last()
                .map(|t| (t.line, t.column))
                .unwrap_or((1, 1));
            tokens.push(Token {
                kind: TokenKind::Eof,
                value: String::new(),
                line,
                column,
            });
        }
        Parser {
            tokens,
            pos: 0,
            pending_doc: None,
        }
    }

    // =========================================================================
    // Token access
    // =========================================================================

    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    fn skip_newlines(&mut self) {
        while self.current().kind == TokenKind::Newline {
            self.pos += 1;
        }
    }

    /// Next significant token (newlines transparent).
    fn peek(&mut self) -> &Token {
        self.skip_newlines();
        self.current()
    }

    /// Look `offset` significant tokens past the current one.
    fn peek_ahead(&self, offset: usize) -> &Token {
        let mut index = self.pos;
        let mut remaining = offset;
        loop {
            let token = match self.tokens.get(index) {
                Some(token) => token,
                None => return &self.tokens[self.tokens.len() - 1],
            };
            if token.kind == TokenKind::Newline {
                index += 1;
                continue;
            }
            if remaining == 0 {
                return token;
            }
            remaining -= 1;
            index += 1;
            // Skip this significant token and continue.
            while matches!(self.tokens.get(index).map(|t| t.kind), Some(TokenKind::Newline)) {
                index += 1;
            }
        }
    }

    fn bump(&mut self) -> Token {
        self.skip_newlines();
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat_punct(&mut self, value: &str) -> bool {
        if self.peek().is_punct(value) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, value: &str) -> bool {
        if self.peek().is_keyword(value) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, value: &str) -> Result<Token, ParseError> {
        if self.peek().is_punct(value) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(&format!("'{value}'")))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.bump().value)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&mut self, expected: &str) -> ParseError {
        let token = self.peek().clone();
        ParseError {
            expected: expected.to_string(),
            found: token.kind,
            value: token.value,
            line: token.line,
            column: token.column,
        }
    }

    // =========================================================================
    // Top level
    // =========================================================================

    fn parse_program(&mut self) -> Result<Vec<Declaration>, ParseError> {
        let mut declarations = Vec::new();
        loop {
            self.skip_newlines();
            match self.current().kind {
                TokenKind::Eof => break,
                TokenKind::JsDoc => {
                    let body = self.bump().value;
                    self.pending_doc = Some(JsDoc::parse(&body));
                }
                _ => {
                    if let Some(declaration) = self.parse_top_level()? {
                        declarations.push(declaration);
                    }
                }
            }
        }
        Ok(declarations)
    }

    /// Parse one top-level construct. Returns `None` when the construct
    /// is outside the subset and was skipped.
    fn parse_top_level(&mut self) -> Result<Option<Declaration>, ParseError> {
        let mut exported = false;
        loop {
            if self.peek().is_keyword("export") {
                // `export { X } from`, `export * from`, `export type {`:
                // re-export wiring belongs to the import extractor.
                let wiring = {
                    let ahead = self.peek_ahead(1);
                    ahead.is_punct("{") || ahead.is_punct("*") || ahead.is_punct("=")
                };
                if wiring {
                    self.skip_statement();
                    return Ok(None);
                }
                if self.peek_ahead(1).is_keyword("type") && self.peek_ahead(2).is_punct("{") {
                    self.skip_statement();
                    return Ok(None);
                }
                self.bump();
                exported = true;
            } else if self.peek().is_keyword("declare") {
                self.bump();
            } else {
                break;
            }
        }

        let token = self.peek().clone();
        match token.kind {
            TokenKind::Keyword => match token.value.as_str() {
                "interface" => Ok(Some(self.parse_interface(exported)?)),
                "type" => Ok(Some(self.parse_type_alias(exported)?)),
                "enum" => Ok(Some(self.parse_enum(exported)?)),
                "const" => {
                    if self.peek_ahead(1).is_keyword("enum") {
                        self.bump();
                        Ok(Some(self.parse_enum(exported)?))
                    } else {
                        self.skip_statement();
                        Ok(None)
                    }
                }
                "import" => {
                    self.skip_statement();
                    Ok(None)
                }
                "namespace" | "module" => {
                    self.skip_statement();
                    Ok(None)
                }
                _ => Err(self.unexpected("a declaration")),
            },
            // `function`, `class`, `var`, `let`, `async`, `abstract` are
            // identifiers to this lexer; their statements are skipped.
            TokenKind::Identifier
                if matches!(
                    token.value.as_str(),
                    "function" | "class" | "var" | "let" | "async" | "abstract" | "default"
                ) =>
            {
                self.skip_statement();
                Ok(None)
            }
            _ => Err(self.unexpected("a declaration")),
        }
    }

    /// Consume a statement outside the subset. Braces are counted so a
    /// skipped `declare namespace` body with nested blocks ends at its
    /// matching close brace.
    fn skip_statement(&mut self) {
        let mut depth = 0usize;
        loop {
            let token = self.current().clone();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::Newline => {
                    self.pos += 1;
                    if depth == 0 && self.at_top_level_boundary() {
                        return;
                    }
                }
                TokenKind::Punctuation if token.value == "{" => {
                    depth += 1;
                    self.pos += 1;
                }
                TokenKind::Punctuation if token.value == "}" => {
                    self.pos += 1;
                    if depth > 0 {
                        depth -= 1;
                        if depth == 0 {
                            if self.current().is_punct(";") {
                                self.pos += 1;
                            }
                            return;
                        }
                    }
                }
                TokenKind::Punctuation if token.value == ";" && depth == 0 => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn at_top_level_boundary(&mut self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::JsDoc
            || token.kind == TokenKind::Eof
            || (token.kind == TokenKind::Keyword
                && matches!(
                    token.value.as_str(),
                    "interface" | "type" | "enum" | "export" | "declare" | "import" | "const"
                ))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_interface(&mut self, exported: bool) -> Result<Declaration, ParseError> {
        self.bump(); // `interface`
        let name = self.expect_identifier("an interface name")?;
        let type_params = self.parse_type_params()?;

        let mut extends = Vec::new();
        if self.eat_keyword("extends") {
            loop {
                extends.push(self.parse_type()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }

        let (properties, index_signature) = self.parse_object_body()?;
        let mut declaration = Declaration::Interface(InterfaceDeclaration {
            base: DeclarationBase {
                name,
                exported,
                ..DeclarationBase::default()
            },
            type_params,
            extends,
            properties,
            index_signature,
        });
        if let Some(doc) = self.pending_doc.take() {
            declaration.attach_doc(doc);
        }
        Ok(declaration)
    }

    fn parse_type_alias(&mut self, exported: bool) -> Result<Declaration, ParseError> {
        self.bump(); // `type`
        let name = self.expect_identifier("a type alias name")?;
        let type_params = self.parse_type_params()?;
        self.expect_punct("=")?;
        let ty = self.parse_type()?;
        self.eat_punct(";");

        let mut declaration = Declaration::TypeAlias(TypeAliasDeclaration {
            base: DeclarationBase {
                name,
                exported,
                ..DeclarationBase::default()
            },
            type_params,
            ty,
        });
        if let Some(doc) = self.pending_doc.take() {
            declaration.attach_doc(doc);
        }
        Ok(declaration)
    }

    fn parse_enum(&mut self, exported: bool) -> Result<Declaration, ParseError> {
        self.bump(); // `enum`
        let name = self.expect_identifier("an enum name")?;
        self.expect_punct("{")?;

        let mut members = Vec::new();
        let mut next_auto = 0.0f64;
        loop {
            self.skip_newlines();
            if self.current().kind == TokenKind::JsDoc {
                // Member docs are not carried into the schema.
                self.pos += 1;
                continue;
            }
            if self.eat_punct("}") {
                break;
            }
            let member_name = self.parse_member_name("an enum member name")?;
            let value = if self.eat_punct("=") {
                let token = self.peek().clone();
                match token.kind {
                    TokenKind::String => {
                        self.bump();
                        EnumValue::String(token.value)
                    }
                    TokenKind::Number => {
                        self.bump();
                        let number = token.value.parse::<f64>().unwrap_or(0.0);
                        next_auto = number + 1.0;
                        EnumValue::Number(number)
                    }
                    _ => {
                        // Non-literal initializer: tolerated by skipping it.
                        let number = next_auto;
                        next_auto += 1.0;
                        EnumValue::Number(number)
                    }
                }
            } else {
                let number = next_auto;
                next_auto += 1.0;
                EnumValue::Number(number)
            };
            // Anything left of a non-literal initializer (`1 << 2`,
            // `Prefix + "x"`) is dropped up to the separator.
            self.skip_enum_initializer();
            members.push(EnumMember {
                name: member_name,
                value,
            });
            self.eat_punct(",");
        }

        let mut declaration = Declaration::Enum(EnumDeclaration {
            base: DeclarationBase {
                name,
                exported,
                ..DeclarationBase::default()
            },
            members,
        });
        if let Some(doc) = self.pending_doc.take() {
            declaration.attach_doc(doc);
        }
        Ok(declaration)
    }

    fn skip_enum_initializer(&mut self) {
        let mut depth = 0usize;
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::Punctuation => match token.value.as_str() {
                    "(" | "[" | "{" => {
                        depth += 1;
                        self.bump();
                    }
                    ")" | "]" => {
                        depth = depth.saturating_sub(1);
                        self.bump();
                    }
                    "}" if depth > 0 => {
                        depth -= 1;
                        self.bump();
                    }
                    "," | "}" => return,
                    _ => {
                        self.bump();
                    }
                },
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// `<T, U extends X = Y>` - names are kept, constraints and
    /// defaults are consumed and dropped.
    fn parse_type_params(&mut self) -> Result<Vec<String>, ParseError> {
        let mut params = Vec::new();
        if !self.eat_punct("<") {
            return Ok(params);
        }
        loop {
            params.push(self.expect_identifier("a type parameter name")?);
            if self.eat_keyword("extends") {
                self.parse_type()?;
            }
            if self.eat_punct("=") {
                self.parse_type()?;
            }
            if self.eat_punct(",") {
                continue;
            }
            self.expect_punct(">")?;
            break;
        }
        Ok(params)
    }

    // =========================================================================
    // Object bodies
    // =========================================================================

    /// Shared between interface bodies and inline object types.
    #[allow(clippy::type_complexity)]
    fn parse_object_body(
        &mut self,
    ) -> Result<(Vec<Property>, Option<Box<IndexSignature>>), ParseError> {
        self.expect_punct("{")?;
        let mut properties = Vec::new();
        let mut index_signature = None;
        let mut member_doc: Option<JsDoc> = None;

        loop {
            self.skip_newlines();
            if self.current().kind == TokenKind::JsDoc {
                let body = self.bump().value;
                member_doc = Some(JsDoc::parse(&body));
                continue;
            }
            if self.eat_punct("}") {
                break;
            }

            if self.at_index_signature() {
                self.bump(); // `[`
                self.bump(); // key name
                self.expect_punct(":")?;
                let key_type = self.parse_type()?;
                self.expect_punct("]")?;
                self.expect_punct(":")?;
                let value_type = self.parse_type()?;
                index_signature = Some(Box::new(IndexSignature {
                    key_type,
                    value_type,
                }));
            } else {
                let readonly = self.at_readonly_modifier() && {
                    self.bump();
                    true
                };
                let name = self.parse_member_name("a property name")?;
                let optional = self.eat_punct("?");
                self.expect_punct(":")?;
                let ty = self.parse_type()?;

                let mut property = Property::new(name, ty);
                property.optional = optional;
                property.readonly = readonly;
                if let Some(doc) = member_doc.take() {
                    if !doc.description.is_empty() {
                        property.description = Some(doc.description);
                    }
                    property.tags = doc.tags;
                }
                properties.push(property);
            }

            if !self.eat_punct(",") {
                self.eat_punct(";");
            }
        }
        Ok((properties, index_signature))
    }

    fn at_index_signature(&mut self) -> bool {
        self.peek().is_punct("[")
            && matches!(
                self.peek_ahead(1).kind,
                TokenKind::Identifier | TokenKind::Keyword | TokenKind::Primitive
            )
            && self.peek_ahead(2).is_punct(":")
    }

    /// `readonly` starts a modifier unless it is itself the member name
    /// (`readonly: boolean`).
    fn at_readonly_modifier(&mut self) -> bool {
        self.peek().is_keyword("readonly") && {
            let ahead = self.peek_ahead(1);
            !ahead.is_punct(":") && !ahead.is_punct("?")
        }
    }

    /// Member names may be identifiers, strings, keywords, primitives,
    /// or numbers (`type: string` and `"dashed-name": number` are both
    /// legal).
    fn parse_member_name(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek().kind {
            TokenKind::Identifier
            | TokenKind::String
            | TokenKind::Keyword
            | TokenKind::Primitive
            | TokenKind::Number => Ok(self.bump().value),
            _ => Err(self.unexpected(what)),
        }
    }

    // =========================================================================
    // Type grammar
    // =========================================================================

    fn parse_type(&mut self) -> Result<TypeNode, ParseError> {
        self.parse_union_type()
    }

    fn parse_union_type(&mut self) -> Result<TypeNode, ParseError> {
        self.eat_punct("|");
        let mut members = vec![self.parse_intersection_type()?];
        while self.eat_punct("|") {
            members.push(self.parse_intersection_type()?);
        }
        if members.len() == 1 {
            Ok(members.remove(0))
        } else {
            Ok(TypeNode::Union { members })
        }
    }

    fn parse_intersection_type(&mut self) -> Result<TypeNode, ParseError> {
        self.eat_punct("&");
        let mut members = vec![self.parse_postfix_type()?];
        while self.eat_punct("&") {
            members.push(self.parse_postfix_type()?);
        }
        if members.len() == 1 {
            Ok(members.remove(0))
        } else {
            Ok(TypeNode::Intersection { members })
        }
    }

    fn parse_postfix_type(&mut self) -> Result<TypeNode, ParseError> {
        let mut node = self.parse_primary_type()?;
        while self.peek().is_punct("[") && self.peek_ahead(1).is_punct("]") {
            self.bump();
            self.bump();
            node = TypeNode::Array {
                element: Box::new(node),
            };
        }
        Ok(node)
    }

    fn parse_primary_type(&mut self) -> Result<TypeNode, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Primitive => {
                self.bump();
                match token.value.as_str() {
                    "true" => Ok(TypeNode::LiteralBoolean { value: true }),
                    "false" => Ok(TypeNode::LiteralBoolean { value: false }),
                    word => match PrimitiveKind::from_word(word) {
                        Some(primitive) => Ok(TypeNode::primitive(primitive)),
                        None => Err(self.unexpected("a type")),
                    },
                }
            }
            TokenKind::String => {
                self.bump();
                if token.value.contains("${") {
                    Ok(TypeNode::TemplateLiteral {
                        parts: template_literal_parts(&token.value),
                    })
                } else {
                    Ok(TypeNode::LiteralString { value: token.value })
                }
            }
            TokenKind::Number => {
                self.bump();
                Ok(TypeNode::LiteralNumber {
                    value: token.value.parse::<f64>().unwrap_or(0.0),
                })
            }
            TokenKind::Punctuation if token.value == "(" => {
                self.bump();
                let inner = self.parse_union_type()?;
                self.expect_punct(")")?;
                Ok(TypeNode::Parenthesized {
                    inner: Box::new(inner),
                })
            }
            TokenKind::Punctuation if token.value == "[" => self.parse_tuple_type(),
            TokenKind::Punctuation if token.value == "{" => self.parse_object_type(),
            TokenKind::Keyword if token.value == "readonly" => {
                // `readonly T[]` is the same type as `T[]`.
                self.bump();
                self.parse_postfix_type()
            }
            TokenKind::Identifier => self.parse_type_reference(),
            _ => Err(self.unexpected("a type")),
        }
    }

    fn parse_type_reference(&mut self) -> Result<TypeNode, ParseError> {
        let name = self.expect_identifier("a type name")?;
        let mut type_args = None;
        if self.eat_punct("<") {
            let mut args = vec![self.parse_union_type()?];
            while self.eat_punct(",") {
                args.push(self.parse_union_type()?);
            }
            self.expect_punct(">")?;
            type_args = Some(args);
        }

        match (name.as_str(), &mut type_args) {
            ("Array", Some(args)) if args.len() == 1 => Ok(TypeNode::Array {
                element: Box::new(args.remove(0)),
            }),
            ("Promise", Some(args)) if args.len() == 1 => Ok(args.remove(0)),
            ("Record", Some(args)) if args.len() == 2 => {
                let value = args.remove(1);
                let key = args.remove(0);
                Ok(TypeNode::Record {
                    key: Box::new(key),
                    value: Box::new(value),
                })
            }
            _ => Ok(TypeNode::Reference { name, type_args }),
        }
    }

    fn parse_tuple_type(&mut self) -> Result<TypeNode, ParseError> {
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        if self.eat_punct("]") {
            return Ok(TypeNode::Tuple { elements });
        }
        loop {
            let rest = self.at_rest_marker();
            if rest {
                self.bump();
                self.bump();
                self.bump();
            }

            let mut label = None;
            let mut optional = false;
            if self.peek().kind == TokenKind::Identifier {
                let ahead = self.peek_ahead(1);
                let labelled = ahead.is_punct(":")
                    || (ahead.is_punct("?") && self.peek_ahead(2).is_punct(":"));
                if labelled {
                    label = Some(self.bump().value);
                    optional = self.eat_punct("?");
                    self.expect_punct(":")?;
                }
            }

            let ty = self.parse_union_type()?;
            if self.eat_punct("?") {
                optional = true;
            }
            elements.push(TupleElement {
                ty,
                optional,
                label,
                rest,
            });

            if self.eat_punct(",") {
                continue;
            }
            self.expect_punct("]")?;
            break;
        }
        Ok(TypeNode::Tuple { elements })
    }

    fn at_rest_marker(&mut self) -> bool {
        self.peek().is_punct(".")
            && self.peek_ahead(1).is_punct(".")
            && self.peek_ahead(2).is_punct(".")
    }

    /// `{ ... }` in type position: an inline object type, or a mapped
    /// type `{ [K in Keys]?: V }` which is recognized structurally.
    fn parse_object_type(&mut self) -> Result<TypeNode, ParseError> {
        let is_mapped = self.peek().is_punct("{")
            && self.peek_ahead(1).is_punct("[")
            && self.peek_ahead(2).kind == TokenKind::Identifier
            && self.peek_ahead(3).kind == TokenKind::Identifier
            && self.peek_ahead(3).value == "in";
        if is_mapped {
            return self.parse_mapped_type();
        }
        let (properties, index_signature) = self.parse_object_body()?;
        Ok(TypeNode::Object {
            properties,
            index_signature,
        })
    }

    fn parse_mapped_type(&mut self) -> Result<TypeNode, ParseError> {
        self.expect_punct("{")?;
        self.expect_punct("[")?;
        let param = self.expect_identifier("a mapped type parameter")?;
        self.bump(); // `in`
        let constraint = self.parse_union_type()?;
        self.expect_punct("]")?;
        let optional = self.eat_punct("?");
        self.expect_punct(":")?;
        let value = self.parse_union_type()?;
        if !self.eat_punct(";") {
            self.eat_punct(",");
        }
        self.expect_punct("}")?;
        Ok(TypeNode::Mapped {
            param,
            constraint: Box::new(constraint),
            value: Box::new(value),
            optional,
        })
    }
}

/// Literal chunks of a template string, with `${...}` interpolations
/// removed.
fn template_literal_parts(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        if !rest[..start].is_empty() {
            parts.push(rest[..start].to_string());
        }
        match rest[start..].find('}') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                rest = "";
                break;
            }
        }
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}
