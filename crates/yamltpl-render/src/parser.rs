//! Recursive-descent parser from tokens to template trees.
//!
//! A source parses into one top-level [`Tree`] plus one tree per
//! `{{ define }}` or `{{ block }}` it contains. Function names are resolved
//! against the function library here, so a template that calls an unknown
//! helper fails before anything executes.

use std::mem;
use std::sync::Arc;

use crate::ast::{Arg, Branch, Command, List, Node, Pipeline, Tree};
use crate::error::{Location, TemplateError};
use crate::funcs;
use crate::lexer::{tokenize, Token, TokenKind};

/// The trees produced by parsing one source.
#[derive(Debug)]
pub(crate) struct Parsed {
    pub top: Tree,
    pub defined: Vec<Tree>,
}

/// Parses `text` as the template named `name`.
pub(crate) fn parse(name: &str, text: &str) -> Result<Parsed, TemplateError> {
    let tokens = tokenize(name, text)?;
    let mut parser = Parser {
        name,
        source: Arc::from(text),
        tokens,
        index: 0,
        vars: vec!["$".to_string()],
        range_depth: 0,
        defined: Vec::new(),
    };
    let root = parser.parse_top()?;
    let top = parser.tree(name.to_string(), root);
    Ok(Parsed {
        top,
        defined: parser.defined,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchKind {
    If,
    With,
    Range,
}

impl BranchKind {
    fn keyword(self) -> &'static str {
        match self {
            BranchKind::If => "if",
            BranchKind::With => "with",
            BranchKind::Range => "range",
        }
    }

    fn wrap(self, branch: Branch) -> Node {
        match self {
            BranchKind::If => Node::If(branch),
            BranchKind::With => Node::With(branch),
            BranchKind::Range => Node::Range(branch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Close {
    Delim,
    Paren,
}

/// The keyword that ends a list.
enum Stop {
    End(usize),
    Else(usize),
}

/// One parsed item of a list.
enum Item {
    Node(Node),
    Stop(Stop),
}

struct Parser<'a> {
    name: &'a str,
    source: Arc<str>,
    tokens: Vec<Token>,
    index: usize,
    /// Variables visible at the current point, innermost last.
    vars: Vec<String>,
    range_depth: usize,
    defined: Vec<Tree>,
}

impl<'a> Parser<'a> {
    fn tree(&self, name: String, root: List) -> Tree {
        Tree {
            name,
            parse_name: self.name.to_string(),
            source: Arc::clone(&self.source),
            root,
        }
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::Parse {
            location: Location::at(self.name, &self.source, pos),
            message: message.into(),
        }
    }

    fn eof_error(&self) -> TemplateError {
        self.error_at(self.source.len(), "unexpected EOF")
    }

    fn unexpected(&self, token: &Token, context: &str) -> TemplateError {
        self.error_at(
            token.pos,
            format!("unexpected {} in {}", describe(&token.kind), context),
        )
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + offset).map(|t| &t.kind)
    }

    fn peek_keyword(&self, offset: usize) -> Option<&str> {
        match self.peek_kind_at(offset) {
            Some(TokenKind::Identifier(word)) => Some(word),
            _ => None,
        }
    }

    fn next(&mut self) -> Result<Token, TemplateError> {
        let token = self.peek().cloned().ok_or_else(|| self.eof_error())?;
        self.index += 1;
        Ok(token)
    }

    fn expect_close(&mut self, context: &str) -> Result<(), TemplateError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::RightDelim => Ok(()),
            _ => Err(self.unexpected(&token, context)),
        }
    }

    fn expect_name(&mut self, context: &str) -> Result<String, TemplateError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Str(name) => Ok(name),
            _ => Err(self.unexpected(&token, context)),
        }
    }

    fn parse_top(&mut self) -> Result<List, TemplateError> {
        let mut root = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::LeftDelim && self.peek_keyword(1) == Some("define") {
                self.index += 2;
                self.parse_define()?;
                continue;
            }
            match self.parse_item()? {
                Item::Node(node) => root.push(node),
                Item::Stop(Stop::End(pos)) => return Err(self.error_at(pos, "unexpected {{end}}")),
                Item::Stop(Stop::Else(pos)) => {
                    return Err(self.error_at(pos, "unexpected {{else}}"))
                }
            }
        }
        Ok(root)
    }

    /// Parses items until `{{ end }}` or `{{ else }}`.
    fn parse_list(&mut self) -> Result<(List, Stop), TemplateError> {
        let mut list = Vec::new();
        loop {
            if self.peek().is_none() {
                return Err(self.eof_error());
            }
            match self.parse_item()? {
                Item::Node(node) => list.push(node),
                Item::Stop(stop) => return Ok((list, stop)),
            }
        }
    }

    fn parse_item(&mut self) -> Result<Item, TemplateError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Text(text) => Ok(Item::Node(Node::Text(text))),
            TokenKind::LeftDelim => self.parse_action(),
            _ => Err(self.unexpected(&token, "input")),
        }
    }

    fn parse_action(&mut self) -> Result<Item, TemplateError> {
        let (keyword, pos) = match self.peek() {
            Some(Token {
                kind: TokenKind::Identifier(word),
                pos,
                ..
            }) => (word.clone(), *pos),
            _ => return self.parse_plain_action(),
        };

        let branch = match keyword.as_str() {
            "if" => Some(BranchKind::If),
            "with" => Some(BranchKind::With),
            "range" => Some(BranchKind::Range),
            _ => None,
        };
        if let Some(kind) = branch {
            self.index += 1;
            let branch = self.parse_branch(kind, pos)?;
            return Ok(Item::Node(kind.wrap(branch)));
        }

        match keyword.as_str() {
            "else" => {
                self.index += 1;
                Ok(Item::Stop(Stop::Else(pos)))
            }
            "end" => {
                self.index += 1;
                self.expect_close("end")?;
                Ok(Item::Stop(Stop::End(pos)))
            }
            "template" => {
                self.index += 1;
                self.parse_template(pos)
            }
            "block" => {
                self.index += 1;
                self.parse_block(pos)
            }
            "break" | "continue" => {
                self.index += 1;
                if self.range_depth == 0 {
                    return Err(self.error_at(pos, format!("{{{{{}}}}} outside {{{{range}}}}", keyword)));
                }
                self.expect_close(&keyword)?;
                Ok(Item::Node(if keyword == "break" {
                    Node::Break
                } else {
                    Node::Continue
                }))
            }
            "define" => Err(self.error_at(pos, "unexpected <define> in command")),
            _ => self.parse_plain_action(),
        }
    }

    fn parse_plain_action(&mut self) -> Result<Item, TemplateError> {
        let pipe = self.parse_pipeline("command", Close::Delim, false)?;
        Ok(Item::Node(Node::Action(pipe)))
    }

    fn parse_branch(&mut self, kind: BranchKind, pos: usize) -> Result<Branch, TemplateError> {
        let mark = self.vars.len();
        let pipe = self.parse_pipeline(kind.keyword(), Close::Delim, kind == BranchKind::Range)?;

        if kind == BranchKind::Range {
            self.range_depth += 1;
        }
        let body = self.parse_list();
        if kind == BranchKind::Range {
            self.range_depth -= 1;
        }
        let (list, end) = body?;

        let else_list = match end {
            Stop::Else(_) => Some(self.parse_else(kind)?),
            Stop::End(_) => None,
        };

        self.vars.truncate(mark);
        Ok(Branch {
            pos,
            pipe,
            list,
            else_list,
        })
    }

    /// Parses what follows `{{ else`, including `else if` and `else with`
    /// chains, which share the enclosing `{{ end }}`.
    fn parse_else(&mut self, kind: BranchKind) -> Result<List, TemplateError> {
        let chained = match (kind, self.peek_keyword(0)) {
            (BranchKind::If, Some("if")) | (BranchKind::With, Some("with")) => true,
            _ => false,
        };
        if chained {
            let pos = self.next()?.pos;
            let nested = self.parse_branch(kind, pos)?;
            return Ok(vec![kind.wrap(nested)]);
        }

        self.expect_close("else")?;
        let (list, end) = self.parse_list()?;
        if let Stop::Else(pos) = end {
            return Err(self.error_at(pos, "expected end; found {{else}}"));
        }
        Ok(list)
    }

    fn parse_template(&mut self, pos: usize) -> Result<Item, TemplateError> {
        let name = self.expect_name("template clause")?;
        let pipe = if self.peek_kind() == Some(&TokenKind::RightDelim) {
            self.index += 1;
            None
        } else {
            Some(self.parse_pipeline("template clause", Close::Delim, false)?)
        };
        Ok(Item::Node(Node::Template { pos, name, pipe }))
    }

    fn parse_block(&mut self, pos: usize) -> Result<Item, TemplateError> {
        let name = self.expect_name("block clause")?;
        let pipe = self.parse_pipeline("block clause", Close::Delim, false)?;
        let root = self.parse_definition_body()?;
        let tree = self.tree(name.clone(), root);
        self.defined.push(tree);
        Ok(Item::Node(Node::Template {
            pos,
            name,
            pipe: Some(pipe),
        }))
    }

    fn parse_define(&mut self) -> Result<(), TemplateError> {
        let name = self.expect_name("define clause")?;
        self.expect_close("define clause")?;
        let root = self.parse_definition_body()?;
        let tree = self.tree(name, root);
        self.defined.push(tree);
        Ok(())
    }

    /// Parses a `define`/`block` body with a fresh variable scope.
    fn parse_definition_body(&mut self) -> Result<List, TemplateError> {
        let outer_vars = mem::replace(&mut self.vars, vec!["$".to_string()]);
        let outer_range = mem::take(&mut self.range_depth);
        let body = self.parse_list();
        self.vars = outer_vars;
        self.range_depth = outer_range;

        match body? {
            (list, Stop::End(_)) => Ok(list),
            (_, Stop::Else(pos)) => Err(self.error_at(pos, "unexpected {{else}}")),
        }
    }

    fn parse_pipeline(
        &mut self,
        context: &str,
        close: Close,
        allow_pair: bool,
    ) -> Result<Pipeline, TemplateError> {
        let pos = self.peek().map_or(self.source.len(), |t| t.pos);
        let (decl, is_assign) = self.parse_declarations(allow_pair)?;

        let mut cmds = Vec::new();
        loop {
            let token = self.peek().cloned().ok_or_else(|| self.eof_error())?;
            match (&token.kind, close) {
                (TokenKind::RightDelim, Close::Delim) | (TokenKind::RightParen, Close::Paren) => {
                    self.index += 1;
                    break;
                }
                (TokenKind::RightDelim, _) | (TokenKind::RightParen, _) => {
                    return Err(self.unexpected(&token, context));
                }
                _ => {}
            }
            cmds.push(self.parse_command()?);
            if self.peek_kind() == Some(&TokenKind::Pipe) {
                let pipe = self.next()?;
                if matches!(
                    self.peek_kind(),
                    Some(TokenKind::RightDelim) | Some(TokenKind::RightParen)
                ) {
                    return Err(self.error_at(pipe.pos, "missing command after |"));
                }
            }
        }

        if cmds.is_empty() {
            return Err(self.error_at(pos, format!("missing value for {}", context)));
        }
        Ok(Pipeline {
            pos,
            decl,
            is_assign,
            cmds,
        })
    }

    /// Parses `$x :=`, `$x =`, or (in `range`) `$i, $v :=`.
    fn parse_declarations(&mut self, allow_pair: bool) -> Result<(Vec<String>, bool), TemplateError> {
        let first = match self.peek_kind() {
            Some(TokenKind::Variable(name, fields)) if fields.is_empty() => name.clone(),
            _ => return Ok((Vec::new(), false)),
        };

        let mut names = vec![first];
        match self.peek_kind_at(1) {
            Some(TokenKind::Declare) | Some(TokenKind::Assign) => self.index += 1,
            Some(TokenKind::Comma) if allow_pair => {
                let second = match self.peek_kind_at(2) {
                    Some(TokenKind::Variable(name, fields)) if fields.is_empty() => name.clone(),
                    _ => {
                        let token = self.tokens[self.index + 1].clone();
                        return Err(self.unexpected(&token, "range declaration"));
                    }
                };
                names.push(second);
                self.index += 3;
            }
            _ => return Ok((Vec::new(), false)),
        }

        let operator = self.next()?;
        let is_assign = match operator.kind {
            TokenKind::Declare => false,
            TokenKind::Assign => true,
            _ => return Err(self.unexpected(&operator, "declaration")),
        };

        for name in &names {
            if is_assign {
                if !self.vars.contains(name) {
                    return Err(self.error_at(operator.pos, format!("undefined variable {:?}", name)));
                }
            } else {
                self.vars.push(name.clone());
            }
        }
        Ok((names, is_assign))
    }

    fn parse_command(&mut self) -> Result<Command, TemplateError> {
        let pos = self.peek().map_or(self.source.len(), |t| t.pos);
        let mut args = Vec::new();
        loop {
            match self.peek_kind() {
                None => return Err(self.eof_error()),
                Some(TokenKind::RightDelim) | Some(TokenKind::RightParen) | Some(TokenKind::Pipe) => {
                    break
                }
                Some(_) => args.push(self.parse_operand()?),
            }
        }
        match args.first() {
            None => Err(self.error_at(pos, "empty command")),
            Some(Arg::Nil) => Err(self.error_at(pos, "nil is not a command")),
            Some(_) => Ok(Command { pos, args }),
        }
    }

    fn parse_operand(&mut self) -> Result<Arg, TemplateError> {
        let term = self.parse_term()?;
        let fields = match self.peek() {
            Some(Token {
                kind: TokenKind::Field(fields),
                space_before: false,
                pos,
            }) => {
                if term.is_literal() {
                    return Err(self.error_at(*pos, format!("unexpected . after term {:?}", term.to_string())));
                }
                fields.clone()
            }
            _ => return Ok(term),
        };
        self.index += 1;
        Ok(Arg::Chain(Box::new(term), fields))
    }

    fn parse_term(&mut self) -> Result<Arg, TemplateError> {
        let token = self.next()?;
        let arg = match token.kind {
            TokenKind::Identifier(name) => {
                if funcs::lookup(&name).is_none() {
                    return Err(self.error_at(token.pos, format!("function {:?} not defined", name)));
                }
                Arg::Identifier(name)
            }
            TokenKind::Dot => Arg::Dot,
            TokenKind::Nil => Arg::Nil,
            TokenKind::Bool(b) => Arg::Bool(b),
            TokenKind::Number(n) => Arg::Number(n),
            TokenKind::Str(s) => Arg::String(s),
            TokenKind::Field(fields) => Arg::Field(fields),
            TokenKind::Variable(name, fields) => {
                if !self.vars.contains(&name) {
                    return Err(self.error_at(token.pos, format!("undefined variable {:?}", name)));
                }
                Arg::Variable(name, fields)
            }
            TokenKind::LeftParen => {
                let pipe = self.parse_pipeline("parenthesized pipeline", Close::Paren, false)?;
                Arg::Pipe(Box::new(pipe))
            }
            _ => return Err(self.unexpected(&token, "operand")),
        };
        Ok(arg)
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Text(_) => "text".to_string(),
        TokenKind::LeftDelim => "\"{{\"".to_string(),
        TokenKind::RightDelim => "\"}}\"".to_string(),
        TokenKind::Identifier(name) => format!("<{}>", name),
        TokenKind::Field(fields) => format!("<.{}>", fields.join(".")),
        TokenKind::Variable(name, _) => format!("<{}>", name),
        TokenKind::Dot => "<.>".to_string(),
        TokenKind::Str(s) => format!("{:?}", s),
        TokenKind::Number(n) => format!("{:?}", n),
        TokenKind::Bool(b) => format!("<{}>", b),
        TokenKind::Nil => "<nil>".to_string(),
        TokenKind::Pipe => "\"|\"".to_string(),
        TokenKind::LeftParen => "\"(\"".to_string(),
        TokenKind::RightParen => "\")\"".to_string(),
        TokenKind::Declare => "\":=\"".to_string(),
        TokenKind::Assign => "\"=\"".to_string(),
        TokenKind::Comma => "\",\"".to_string(),
    }
}
