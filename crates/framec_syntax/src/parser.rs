//! Recursive-descent parser with precedence climbing for expressions.
//!
//! The parser pulls tokens from its [`Lexer`] one at a time — there is no
//! separate tokenize-everything-first pass — and builds the AST directly
//! into the caller-supplied [`Arena`]. It never panics on malformed input:
//! unrecognized tokens become a recorded [`CompileError`] plus a
//! placeholder node, and parsing continues from the next likely statement
//! boundary.

use framec_base::{CompileError, ErrorKind, ErrorList, Interner, Span, Symbol};

use crate::arenas::Arenas;
use crate::ast::{ASTNode, BinaryOp, FieldDecl, IfArm, NodeKind, Param, UnaryOp};
use crate::lexer::Lexer;
use crate::token::{Keyword, TokenKind};
use crate::types::{BuiltinName, TypeId, TypeTable};

/// Everything a parse produces: the top-level statement list, the type
/// table built up while parsing type expressions, the interner every
/// symbol in the tree and table resolves against, and any parse errors
/// (lex errors included).
pub struct ParseOutput<'ast> {
    pub items: &'ast [&'ast ASTNode<'ast>],
    pub types: TypeTable,
    pub interner: Interner,
    pub errors: ErrorList,
}

pub struct Parser<'src, 'ast> {
    lexer: Lexer<'src>,
    arena: &'ast Arenas<'ast>,
    types: TypeTable,
    errors: ErrorList,
}

fn starts_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident | TokenKind::Int | TokenKind::LParen | TokenKind::LBracket
    )
}

/// Precedence and associativity of a binary operator token, per the §4.2
/// table: level 1 is `=` (right-associative), level 2 is the comparisons,
/// level 3 is `+ -`, level 4 is `* / %`.
fn binary_op_info(kind: TokenKind) -> Option<(BinaryOp, u8, bool)> {
    Some(match kind {
        TokenKind::Assign => (BinaryOp::Assign, 1, true),
        TokenKind::Eq => (BinaryOp::Eq, 2, false),
        TokenKind::NotEq => (BinaryOp::NotEq, 2, false),
        TokenKind::Lt => (BinaryOp::Lt, 2, false),
        TokenKind::Gt => (BinaryOp::Gt, 2, false),
        TokenKind::LtEq => (BinaryOp::LtEq, 2, false),
        TokenKind::GtEq => (BinaryOp::GtEq, 2, false),
        TokenKind::Plus => (BinaryOp::Add, 3, false),
        TokenKind::Minus => (BinaryOp::Sub, 3, false),
        TokenKind::Star => (BinaryOp::Mul, 4, false),
        TokenKind::Slash => (BinaryOp::Div, 4, false),
        TokenKind::Percent => (BinaryOp::Rem, 4, false),
        _ => return None,
    })
}

impl<'src, 'ast> Parser<'src, 'ast> {
    pub fn new(source: &'src [u8], arena: &'ast Arenas<'ast>) -> Self {
        Parser {
            lexer: Lexer::new(source),
            arena,
            types: TypeTable::new(),
            errors: ErrorList::new(),
        }
    }

    pub fn parse_program(mut self) -> ParseOutput<'ast> {
        let mut items = Vec::new();
        while !self.lexer.current().is_eof() {
            items.extend(self.parse_statement());
        }
        let Parser { mut lexer, arena, types, errors } = self;
        let mut all_errors = lexer.take_errors();
        all_errors.extend(errors);
        let interner = lexer.into_interner();
        ParseOutput {
            items: arena.node_refs.alloc_slice(items),
            types,
            interner,
            errors: all_errors,
        }
    }

    fn node(&self, kind: NodeKind<'ast>, span: Span) -> &'ast ASTNode<'ast> {
        self.arena.nodes.alloc(ASTNode::new(kind, span))
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(CompileError::new(ErrorKind::Parse, message, span));
    }

    /// Skips tokens until a likely statement boundary, so one malformed
    /// construct does not cascade into unrelated errors for the rest of
    /// the file.
    fn synchronize(&mut self) {
        loop {
            match self.lexer.current().kind {
                TokenKind::Semicolon => {
                    self.lexer.next();
                    return;
                }
                TokenKind::RBrace | TokenKind::Eof => return,
                TokenKind::Keyword(
                    Keyword::Var
                    | Keyword::Struct
                    | Keyword::If
                    | Keyword::Loop
                    | Keyword::Break
                    | Keyword::Continue
                    | Keyword::Return
                    | Keyword::Func,
                ) => return,
                _ => {
                    self.lexer.next();
                }
            }
        }
    }

    // ---- statements ----------------------------------------------------

    fn parse_statement(&mut self) -> Vec<&'ast ASTNode<'ast>> {
        match self.lexer.current().kind {
            TokenKind::Keyword(Keyword::Var) => self.parse_var_decl(),
            TokenKind::Keyword(Keyword::Struct) => vec![self.parse_struct_decl()],
            TokenKind::Keyword(Keyword::If) => vec![self.parse_if()],
            TokenKind::Keyword(Keyword::Loop) => vec![self.parse_loop()],
            TokenKind::Keyword(Keyword::Break) => vec![self.parse_simple_keyword(NodeKind::Break)],
            TokenKind::Keyword(Keyword::Continue) => {
                vec![self.parse_simple_keyword(NodeKind::Continue)]
            }
            TokenKind::Keyword(Keyword::Return) => vec![self.parse_return()],
            TokenKind::Keyword(Keyword::Func) => vec![self.parse_func_decl()],
            TokenKind::LBrace => vec![self.parse_block()],
            TokenKind::Semicolon => {
                self.lexer.next();
                Vec::new()
            }
            TokenKind::Eof | TokenKind::RBrace => Vec::new(),
            _ => vec![self.parse_expr_stmt()],
        }
    }

    fn parse_var_decl(&mut self) -> Vec<&'ast ASTNode<'ast>> {
        let start = self.lexer.current().span;
        self.lexer.next(); // `var`
        let name = self.lexer.current().lexeme;
        let name_span = self.lexer.current().span;
        self.lexer.skip_expected(TokenKind::Ident, "variable name");
        let ty = self.parse_type();

        let mut out = Vec::with_capacity(2);
        out.push(self.node(NodeKind::Var { name, declared_type: ty }, start.merge(name_span)));

        if self.lexer.current().kind == TokenKind::Assign {
            self.lexer.next();
            let value = self.parse_expr(2);
            let ident = self.node(NodeKind::Ident(name), name_span);
            let span = name_span.merge(value.span);
            out.push(self.node(NodeKind::Binary { op: BinaryOp::Assign, left: ident, right: value }, span));
        }
        self.lexer.skip_expected(TokenKind::Semicolon, ";");
        out
    }

    fn parse_struct_decl(&mut self) -> &'ast ASTNode<'ast> {
        let start = self.lexer.current().span;
        self.lexer.next(); // `struct`
        let name = self.lexer.current().lexeme;
        self.lexer.skip_expected(TokenKind::Ident, "struct name");
        self.lexer.skip_expected(TokenKind::LBrace, "{");

        let mut fields = Vec::new();
        while self.lexer.current().kind != TokenKind::RBrace && !self.lexer.current().is_eof() {
            self.lexer.skip_expected(TokenKind::Keyword(Keyword::Var), "field declaration");
            let fname = self.lexer.current().lexeme;
            self.lexer.skip_expected(TokenKind::Ident, "field name");
            let fty = self.parse_type();
            fields.push(FieldDecl { name: fname, ty: fty });
            self.lexer.skip_expected(TokenKind::Semicolon, ";");
        }
        let end = self.lexer.current().span;
        self.lexer.skip_expected(TokenKind::RBrace, "}");
        let fields = self.arena.fields.alloc_slice(fields);
        self.node(NodeKind::Struct { name, fields }, start.merge(end))
    }

    fn parse_if(&mut self) -> &'ast ASTNode<'ast> {
        let start = self.lexer.current().span;
        self.lexer.next(); // `if`
        let mut arms = Vec::new();
        let cond = self.parse_expr(2);
        let body = self.parse_block_stmts();
        let mut last_span = start.merge(cond.span);
        arms.push(IfArm { cond: Some(cond), body });

        loop {
            if self.lexer.current().kind != TokenKind::Keyword(Keyword::Else) {
                break;
            }
            self.lexer.next(); // `else`
            if self.lexer.current().kind == TokenKind::Keyword(Keyword::If) {
                self.lexer.next(); // `if`
                let c = self.parse_expr(2);
                last_span = last_span.merge(c.span);
                let b = self.parse_block_stmts();
                arms.push(IfArm { cond: Some(c), body: b });
            } else {
                let b = self.parse_block_stmts();
                arms.push(IfArm { cond: None, body: b });
                break;
            }
        }
        let arms = self.arena.arms.alloc_slice(arms);
        self.node(NodeKind::If { arms }, last_span)
    }

    fn parse_loop(&mut self) -> &'ast ASTNode<'ast> {
        let start = self.lexer.current().span;
        self.lexer.next(); // `loop`
        let body = self.parse_block_stmts();
        self.node(NodeKind::Loop(body), start)
    }

    fn parse_simple_keyword(&mut self, kind: NodeKind<'ast>) -> &'ast ASTNode<'ast> {
        let span = self.lexer.current().span;
        self.lexer.next(); // keyword
        self.lexer.skip_expected(TokenKind::Semicolon, ";");
        self.node(kind, span)
    }

    fn parse_return(&mut self) -> &'ast ASTNode<'ast> {
        let start = self.lexer.current().span;
        self.lexer.next(); // `return`
        let value = if self.lexer.current().kind != TokenKind::Semicolon {
            Some(self.parse_expr(2))
        } else {
            None
        };
        let end = self.lexer.current().span;
        self.lexer.skip_expected(TokenKind::Semicolon, ";");
        self.node(NodeKind::Return(value), start.merge(end))
    }

    fn parse_func_decl(&mut self) -> &'ast ASTNode<'ast> {
        let start = self.lexer.current().span;
        self.lexer.next(); // `func`
        let name = self.lexer.current().lexeme;
        self.lexer.skip_expected(TokenKind::Ident, "function name");
        self.lexer.skip_expected(TokenKind::LParen, "(");
        let params = self.parse_params();
        self.lexer.skip_expected(TokenKind::RParen, ")");
        let return_type = if self.lexer.current().kind == TokenKind::Colon {
            self.lexer.next();
            Some(self.parse_type())
        } else {
            None
        };
        let body = self.parse_block_stmts();
        let params = self.arena.params.alloc_slice(params);
        self.node(NodeKind::Func { name, params, return_type, body }, start)
    }

    fn parse_params(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if self.lexer.current().kind == TokenKind::RParen {
            return params;
        }
        loop {
            let mut is_named = true;
            if self.lexer.current().kind == TokenKind::Ident
                && self.lexer.interner().resolve(self.lexer.current().lexeme) == "_"
            {
                is_named = false;
                self.lexer.next(); // `_`
            }
            let name = self.lexer.current().lexeme;
            self.lexer.skip_expected(TokenKind::Ident, "parameter name");
            self.lexer.skip_expected(TokenKind::Colon, ":");
            let ty = self.parse_param_type();
            params.push(Param { name, ty, is_named });
            if self.lexer.current().kind == TokenKind::Comma {
                self.lexer.next();
                continue;
            }
            break;
        }
        params
    }

    fn parse_block_stmts(&mut self) -> &'ast [&'ast ASTNode<'ast>] {
        self.lexer.skip_expected(TokenKind::LBrace, "{");
        let mut stmts = Vec::new();
        while self.lexer.current().kind != TokenKind::RBrace && !self.lexer.current().is_eof() {
            stmts.extend(self.parse_statement());
        }
        self.lexer.skip_expected(TokenKind::RBrace, "}");
        self.arena.node_refs.alloc_slice(stmts)
    }

    fn parse_block(&mut self) -> &'ast ASTNode<'ast> {
        let start = self.lexer.current().span;
        let stmts = self.parse_block_stmts();
        self.node(NodeKind::Block(stmts), start)
    }

    fn parse_expr_stmt(&mut self) -> &'ast ASTNode<'ast> {
        let expr = self.parse_expr(1);
        self.lexer.skip_expected(TokenKind::Semicolon, ";");
        expr
    }

    // ---- type expressions ------------------------------------------------

    /// Parses an identifier followed by any number of postfix `*`/`[]`, and
    /// reports whether the base name was a non-builtin identifier with no
    /// postfix applied — the shape that `parse_param_type` rewrites to a
    /// pointer.
    fn parse_type_expr(&mut self) -> (TypeId, bool) {
        let sym = self.lexer.current().lexeme;
        self.lexer.skip_expected(TokenKind::Ident, "type name");

        let (mut ty, mut is_bare_named) = {
            let text = self.lexer.interner().resolve(sym);
            match text {
                "I64" => (self.types.builtin(BuiltinName::I64), false),
                "U8" => (self.types.builtin(BuiltinName::U8), false),
                "Boolean" => (self.types.builtin(BuiltinName::Boolean), false),
                _ => (self.types.named(sym), true),
            }
        };

        loop {
            match self.lexer.current().kind {
                TokenKind::Star => {
                    self.lexer.next();
                    ty = self.types.pointer(ty);
                    is_bare_named = false;
                }
                TokenKind::LBracket => {
                    self.lexer.next();
                    self.lexer.skip_expected(TokenKind::RBracket, "]");
                    ty = self.types.slice(ty);
                    is_bare_named = false;
                }
                _ => break,
            }
        }
        (ty, is_bare_named)
    }

    fn parse_type(&mut self) -> TypeId {
        self.parse_type_expr().0
    }

    /// A struct-typed parameter is silently rewritten to a pointer-to-struct
    /// parameter (structs are passed by pointer at the ABI).
    fn parse_param_type(&mut self) -> TypeId {
        let (ty, is_bare_struct) = self.parse_type_expr();
        if is_bare_struct {
            self.types.pointer(ty)
        } else {
            ty
        }
    }

    // ---- expressions -------------------------------------------------

    fn parse_expr(&mut self, min_prec: u8) -> &'ast ASTNode<'ast> {
        let mut left = self.parse_unary();
        loop {
            let Some((op, prec, right_assoc)) = binary_op_info(self.lexer.current().kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.lexer.next();
            let next_min = if right_assoc { prec } else { prec + 1 };
            let right = self.parse_expr(next_min);
            let span = left.span.merge(right.span);
            left = self.node(NodeKind::Binary { op, left, right }, span);
        }
        left
    }

    fn parse_unary(&mut self) -> &'ast ASTNode<'ast> {
        if self.lexer.current().kind == TokenKind::Bang {
            let start = self.lexer.current().span;
            self.lexer.next();
            let operand = self.parse_unary();
            let span = start.merge(operand.span);
            return self.node(NodeKind::Unary { op: UnaryOp::Not, operand }, span);
        }
        let primary = self.parse_primary();
        self.parse_postfix(primary)
    }

    fn parse_postfix(&mut self, mut left: &'ast ASTNode<'ast>) -> &'ast ASTNode<'ast> {
        loop {
            match self.lexer.current().kind {
                TokenKind::Dot => {
                    self.lexer.next();
                    let field = self.lexer.current().lexeme;
                    let field_span = self.lexer.current().span;
                    self.lexer.skip_expected(TokenKind::Ident, "field name");
                    let span = left.span.merge(field_span);
                    left = self.node(NodeKind::Dot { base: left, field }, span);
                }
                TokenKind::LBracket => {
                    self.lexer.next();
                    let index = self.parse_expr(2);
                    let end_span = self.lexer.current().span;
                    self.lexer.skip_expected(TokenKind::RBracket, "]");
                    let span = left.span.merge(end_span);
                    left = self.node(NodeKind::Index { base: left, index }, span);
                }
                TokenKind::Amp => {
                    let span = left.span.merge(self.lexer.current().span);
                    self.lexer.next();
                    left = self.node(NodeKind::Unary { op: UnaryOp::AddressOf, operand: left }, span);
                }
                TokenKind::Star => {
                    if starts_expression(self.lexer.peek()) {
                        break;
                    }
                    let span = left.span.merge(self.lexer.current().span);
                    self.lexer.next();
                    left = self.node(NodeKind::Unary { op: UnaryOp::Deref, operand: left }, span);
                }
                _ => break,
            }
        }
        left
    }

    fn parse_primary(&mut self) -> &'ast ASTNode<'ast> {
        let tok = self.lexer.current().clone();
        match tok.kind {
            TokenKind::Int => {
                self.lexer.next();
                self.node(NodeKind::Integer(tok.int_value), tok.span)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.lexer.next();
                self.node(NodeKind::Boolean(true), tok.span)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.lexer.next();
                self.node(NodeKind::Boolean(false), tok.span)
            }
            TokenKind::String => {
                self.lexer.next();
                self.node(NodeKind::String(tok.lexeme), tok.span)
            }
            TokenKind::Ident => {
                self.lexer.next();
                if self.lexer.current().kind == TokenKind::LParen {
                    self.parse_call(tok.lexeme, tok.span)
                } else {
                    self.node(NodeKind::Ident(tok.lexeme), tok.span)
                }
            }
            TokenKind::LParen => {
                self.lexer.next();
                let inner = self.parse_expr(1);
                self.lexer.skip_expected(TokenKind::RParen, ")");
                inner
            }
            _ => {
                self.error(
                    format!("unexpected token {:?} in expression", tok.kind),
                    tok.span,
                );
                self.synchronize();
                self.node(NodeKind::Integer(0), tok.span)
            }
        }
    }

    fn parse_call(&mut self, callee: Symbol, start: Span) -> &'ast ASTNode<'ast> {
        self.lexer.next(); // `(`
        let mut args = Vec::new();
        let mut names = Vec::new();
        let mut seen_named = false;

        if self.lexer.current().kind != TokenKind::RParen {
            loop {
                let is_named_arg = self.lexer.current().kind == TokenKind::Ident
                    && self.lexer.peek() == TokenKind::Colon;
                if is_named_arg {
                    let name = self.lexer.current().lexeme;
                    self.lexer.next(); // name
                    self.lexer.next(); // `:`
                    args.push(self.parse_expr(2));
                    names.push(name);
                    seen_named = true;
                } else {
                    if seen_named {
                        self.error(
                            "positional argument after named argument",
                            self.lexer.current().span,
                        );
                    }
                    args.push(self.parse_expr(2));
                    names.push(Symbol::EMPTY);
                }
                if self.lexer.current().kind == TokenKind::Comma {
                    self.lexer.next();
                    continue;
                }
                break;
            }
        }
        let end = self.lexer.current().span;
        self.lexer.skip_expected(TokenKind::RParen, ")");
        let args = self.arena.node_refs.alloc_slice(args);
        self.node(
            NodeKind::Call { callee, args, arg_names: names },
            start.merge(end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> (Vec<String>, ParseOutput<'_>) {
        let owned = format!("{src}\0");
        let leaked: &'static str = Box::leak(owned.into_boxed_str());
        let arena: &'static Arenas<'static> = Box::leak(Box::new(Arenas::new()));
        let parser = Parser::new(leaked.as_bytes(), arena);
        let output = parser.parse_program();
        let errors = output.errors.iter().map(|e| e.to_string()).collect();
        (errors, output)
    }

    #[test]
    fn parses_empty_main_function() {
        let (errors, output) = parse("func main() { }");
        assert!(errors.is_empty());
        assert_eq!(output.items.len(), 1);
        assert!(matches!(output.items[0].kind, NodeKind::Func { .. }));
    }

    #[test]
    fn arithmetic_precedence_matches_table() {
        // 2 + 3 * 4 parses as 2 + (3 * 4), not (2 + 3) * 4.
        let (errors, output) = parse("func main() { print(2 + 3 * 4); }");
        assert!(errors.is_empty());
        let NodeKind::Func { body, .. } = &output.items[0].kind else { panic!() };
        let NodeKind::Call { args, .. } = &body[0].kind else { panic!() };
        let NodeKind::Binary { op, right, .. } = &args[0].kind else { panic!() };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(right.kind, NodeKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn assignment_is_right_associative_and_lowest_precedence() {
        let (errors, output) = parse("func main() { x = y = 1; }");
        assert!(errors.is_empty());
        let NodeKind::Func { body, .. } = &output.items[0].kind else { panic!() };
        let NodeKind::Binary { op, right, .. } = &body[0].kind else { panic!() };
        assert_eq!(*op, BinaryOp::Assign);
        assert!(matches!(right.kind, NodeKind::Binary { op: BinaryOp::Assign, .. }));
    }

    #[test]
    fn star_after_identifier_followed_by_identifier_is_multiplication() {
        let (errors, output) = parse("func main() { print(a * b); }");
        assert!(errors.is_empty());
        let NodeKind::Func { body, .. } = &output.items[0].kind else { panic!() };
        let NodeKind::Call { args, .. } = &body[0].kind else { panic!() };
        assert!(matches!(args[0].kind, NodeKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn trailing_star_with_no_following_operand_is_dereference() {
        let (errors, output) = parse("func main() { print(ptr*); }");
        assert!(errors.is_empty());
        let NodeKind::Func { body, .. } = &output.items[0].kind else { panic!() };
        let NodeKind::Call { args, .. } = &body[0].kind else { panic!() };
        assert!(matches!(args[0].kind, NodeKind::Unary { op: UnaryOp::Deref, .. }));
    }

    #[test]
    fn postfix_amp_is_address_of() {
        let (errors, output) = parse("func main() { ptr = x&; }");
        assert!(errors.is_empty());
        let NodeKind::Func { body, .. } = &output.items[0].kind else { panic!() };
        let NodeKind::Binary { right, .. } = &body[0].kind else { panic!() };
        assert!(matches!(right.kind, NodeKind::Unary { op: UnaryOp::AddressOf, .. }));
    }

    #[test]
    fn var_with_initializer_desugars_to_two_statements() {
        let (errors, output) = parse("func main() { var x I64 = 5; }");
        assert!(errors.is_empty());
        let NodeKind::Func { body, .. } = &output.items[0].kind else { panic!() };
        assert_eq!(body.len(), 2);
        assert!(matches!(body[0].kind, NodeKind::Var { .. }));
        assert!(matches!(body[1].kind, NodeKind::Binary { op: BinaryOp::Assign, .. }));
    }

    #[test]
    fn struct_param_is_rewritten_to_pointer() {
        let (errors, output) = parse(
            "struct Point { var x I64; var y I64; } func sum(_ p: Point): I64 { return p.x; }",
        );
        assert!(errors.is_empty());
        let NodeKind::Func { params, .. } = &output.items[1].kind else { panic!() };
        assert!(matches!(output.types.get(params[0].ty), crate::types::Type::Pointer(_)));
    }

    #[test]
    fn named_and_positional_call_arguments_parse() {
        let (errors, output) = parse("func main() { f(1, name: 2); }");
        assert!(errors.is_empty());
        let NodeKind::Func { body, .. } = &output.items[0].kind else { panic!() };
        let NodeKind::Call { arg_names, .. } = &body[0].kind else { panic!() };
        assert_eq!(arg_names[0], Symbol::EMPTY);
        assert_ne!(arg_names[1], Symbol::EMPTY);
    }

    #[test]
    fn if_else_if_else_chain_produces_three_arms() {
        let (errors, output) = parse(
            "func main() { if a { } else if b { } else { } }",
        );
        assert!(errors.is_empty());
        let NodeKind::Func { body, .. } = &output.items[0].kind else { panic!() };
        let NodeKind::If { arms } = &body[0].kind else { panic!() };
        assert_eq!(arms.len(), 3);
        assert!(arms[0].cond.is_some());
        assert!(arms[1].cond.is_some());
        assert!(arms[2].cond.is_none());
    }

    #[test]
    fn unexpected_token_records_error_without_panicking() {
        let (errors, _) = parse("func main() { ) }");
        assert!(!errors.is_empty());
    }

    #[test]
    fn top_level_statements_outside_functions_are_accepted() {
        let (errors, output) = parse("var slice U8[];");
        assert!(errors.is_empty());
        assert_eq!(output.items.len(), 1);
    }
}
