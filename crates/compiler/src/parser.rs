//! Recursive-descent parser with precedence climbing for expressions.
//!
//! Consumes the lexer's token stream and produces the untyped AST. Binary
//! expressions use the precedence table on [`BinaryOp`]; the assignment
//! family recurses at its own precedence (right-associative) and `?:` parses
//! its middle expression at precedence zero.

use crate::ast::{
    Block, BlockItem, Declaration, Expr, ForInit, FuncDecl, InfixOp, Program, Stmt, StorageClass,
    UnaryOp, VarDecl,
};
use crate::lexer::{Token, TokenKind};

/// Parse errors. `UnexpectedEof` names the parsing function that ran out of
/// tokens, which is usually enough to locate the truncated construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    TokenType {
        got: Token,
        expected: Vec<String>,
    },
    Syntax(String),
    UnexpectedEof {
        context: &'static str,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::TokenType { got, expected } => write!(
                f,
                "expected {}, got {} @ {}:{}",
                expected.join(" or "),
                got.kind.describe(),
                got.line,
                got.offset
            ),
            ParseError::Syntax(message) => write!(f, "{}", message),
            ParseError::UnexpectedEof { context } => {
                write!(f, "unexpected EOF found in {} function", context)
            }
        }
    }
}

impl std::error::Error for ParseError {}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut declarations = Vec::new();
        while self.pos < self.tokens.len() {
            declarations.push(self.declaration()?);
        }
        Ok(Program { declarations })
    }

    fn advance(&mut self, context: &'static str) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEof { context })?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind, context: &'static str) -> Result<Token, ParseError> {
        let token = self.advance(context)?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::TokenType {
                got: token,
                expected: vec![kind.describe()],
            })
        }
    }

    fn expect_identifier(&mut self, context: &'static str) -> Result<String, ParseError> {
        let token = self.advance(context)?;
        match token.kind {
            TokenKind::Identifier(name) => Ok(name),
            _ => Err(ParseError::TokenType {
                got: token,
                expected: vec!["an identifier".to_string()],
            }),
        }
    }

    fn peek(&self, context: &'static str) -> Result<&Token, ParseError> {
        self.tokens
            .get(self.pos)
            .ok_or(ParseError::UnexpectedEof { context })
    }

    /// Non-failing peek for positions where end-of-input simply means "no".
    fn peek_is(&self, kind: &TokenKind) -> bool {
        matches!(self.tokens.get(self.pos), Some(t) if t.kind == *kind)
    }

    /// Label detection: an identifier directly followed by `:`.
    fn peek2_is_colon(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1), Some(t) if t.kind == TokenKind::Colon)
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn declaration(&mut self) -> Result<Declaration, ParseError> {
        let mut specifiers = Vec::new();
        while self.peek("declaration")?.kind.is_specifier() {
            specifiers.push(self.advance("declaration")?);
        }

        let storage = match Self::type_and_storage_class(&specifiers) {
            Ok(storage) => storage,
            Err(message) => {
                let at = self.peek("declaration")?;
                return Err(ParseError::Syntax(format!(
                    "{} @ {}:{}",
                    message, at.line, at.offset
                )));
            }
        };

        let name = self.expect_identifier("declaration")?;

        if self.peek_is(&TokenKind::LeftParen) {
            Ok(Declaration::Func(self.func_decl(name, storage)?))
        } else {
            Ok(Declaration::Var(self.var_decl(name, storage)?))
        }
    }

    /// Exactly one type specifier (`int`) and at most one storage class.
    fn type_and_storage_class(
        specifiers: &[Token],
    ) -> Result<Option<StorageClass>, String> {
        let mut types = 0usize;
        let mut storage_classes = Vec::new();
        for specifier in specifiers {
            match specifier.kind {
                TokenKind::Int => types += 1,
                TokenKind::Static => storage_classes.push(StorageClass::Static),
                TokenKind::Extern => storage_classes.push(StorageClass::Extern),
                _ => unreachable!("non-specifier token collected as specifier"),
            }
        }

        if types != 1 {
            return Err("invalid type specifiers".to_string());
        }
        match storage_classes.len() {
            0 => Ok(None),
            1 => Ok(Some(storage_classes[0])),
            _ => Err("invalid storage classes".to_string()),
        }
    }

    fn var_decl(
        &mut self,
        name: String,
        storage: Option<StorageClass>,
    ) -> Result<VarDecl, ParseError> {
        let token = self.peek("var_decl")?;
        let init = match token.kind {
            TokenKind::Semicolon => None,
            TokenKind::Equal => {
                self.advance("var_decl")?;
                Some(self.expr(0)?)
            }
            _ => {
                return Err(ParseError::TokenType {
                    got: token.clone(),
                    expected: vec!["';'".to_string(), "'='".to_string()],
                });
            }
        };
        self.expect(TokenKind::Semicolon, "var_decl")?;
        Ok(VarDecl {
            name,
            init,
            storage,
        })
    }

    fn func_decl(
        &mut self,
        name: String,
        storage: Option<StorageClass>,
    ) -> Result<FuncDecl, ParseError> {
        self.expect(TokenKind::LeftParen, "func_decl")?;
        let params = self.func_params()?;
        self.expect(TokenKind::RightParen, "func_decl")?;

        if self.peek("func_decl")?.kind == TokenKind::Semicolon {
            self.advance("func_decl")?;
            return Ok(FuncDecl {
                name,
                params,
                body: None,
                storage,
            });
        }

        self.expect(TokenKind::LeftBrace, "func_decl")?;
        let mut items = Vec::new();
        while self.peek("func_decl")?.kind != TokenKind::RightBrace {
            items.push(self.block_item()?);
        }
        self.expect(TokenKind::RightBrace, "func_decl")?;

        Ok(FuncDecl {
            name,
            params,
            body: Some(Block { items }),
            storage,
        })
    }

    /// `void` or a comma-separated list of `int <name>`.
    fn func_params(&mut self) -> Result<Vec<String>, ParseError> {
        match self.peek("func_params")?.kind {
            TokenKind::Void => {
                self.advance("func_params")?;
                return Ok(Vec::new());
            }
            TokenKind::RightParen => return Ok(Vec::new()),
            _ => {}
        }

        self.expect(TokenKind::Int, "func_params")?;
        let mut params = vec![self.expect_identifier("func_params")?];
        while self.peek("func_params")?.kind != TokenKind::RightParen {
            self.expect(TokenKind::Comma, "func_params")?;
            self.expect(TokenKind::Int, "func_params")?;
            params.push(self.expect_identifier("func_params")?);
        }
        Ok(params)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block_item(&mut self) -> Result<BlockItem, ParseError> {
        if self.peek("block_item")?.kind.is_specifier() {
            Ok(BlockItem::Declaration(self.declaration()?))
        } else {
            Ok(BlockItem::Statement(self.stmt()?))
        }
    }

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek("stmt")?.kind.clone() {
            TokenKind::Return => {
                self.advance("stmt")?;
                let expr = self.expr(0)?;
                self.expect(TokenKind::Semicolon, "stmt")?;
                Ok(Stmt::Return(expr))
            }
            TokenKind::If => {
                self.advance("stmt")?;
                self.expect(TokenKind::LeftParen, "stmt")?;
                let cond = self.expr(0)?;
                self.expect(TokenKind::RightParen, "stmt")?;
                let then = Box::new(self.stmt()?);
                let otherwise = if self.peek("stmt")?.kind == TokenKind::Else {
                    self.advance("stmt")?;
                    Some(Box::new(self.stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    cond,
                    then,
                    otherwise,
                })
            }
            TokenKind::Goto => {
                self.advance("stmt")?;
                let target = self.expect_identifier("stmt")?;
                self.expect(TokenKind::Semicolon, "stmt")?;
                Ok(Stmt::Goto(target))
            }
            TokenKind::Semicolon => {
                self.advance("stmt")?;
                Ok(Stmt::Null)
            }
            TokenKind::Identifier(name) if self.peek2_is_colon() => {
                self.advance("stmt")?;
                self.expect(TokenKind::Colon, "stmt")?;
                Ok(Stmt::Label(name))
            }
            TokenKind::LeftBrace => {
                self.advance("stmt")?;
                let mut items = Vec::new();
                while self.peek("stmt")?.kind != TokenKind::RightBrace {
                    items.push(self.block_item()?);
                }
                self.expect(TokenKind::RightBrace, "stmt")?;
                Ok(Stmt::Compound(Block { items }))
            }
            TokenKind::Break => {
                self.advance("stmt")?;
                self.expect(TokenKind::Semicolon, "stmt")?;
                Ok(Stmt::Break { label: None })
            }
            TokenKind::Continue => {
                self.advance("stmt")?;
                self.expect(TokenKind::Semicolon, "stmt")?;
                Ok(Stmt::Continue { label: None })
            }
            TokenKind::While => {
                self.advance("stmt")?;
                self.expect(TokenKind::LeftParen, "stmt")?;
                let cond = self.expr(0)?;
                self.expect(TokenKind::RightParen, "stmt")?;
                let body = Box::new(self.stmt()?);
                Ok(Stmt::While {
                    cond,
                    body,
                    label: None,
                })
            }
            TokenKind::Do => {
                self.advance("stmt")?;
                let body = Box::new(self.stmt()?);
                self.expect(TokenKind::While, "stmt")?;
                self.expect(TokenKind::LeftParen, "stmt")?;
                let cond = self.expr(0)?;
                self.expect(TokenKind::RightParen, "stmt")?;
                self.expect(TokenKind::Semicolon, "stmt")?;
                Ok(Stmt::DoWhile {
                    body,
                    cond,
                    label: None,
                })
            }
            TokenKind::For => {
                self.advance("stmt")?;
                self.expect(TokenKind::LeftParen, "stmt")?;
                let init = self.for_init()?;
                let cond = if self.peek("stmt")?.kind == TokenKind::Semicolon {
                    None
                } else {
                    Some(self.expr(0)?)
                };
                self.expect(TokenKind::Semicolon, "stmt")?;
                let post = if self.peek("stmt")?.kind == TokenKind::RightParen {
                    None
                } else {
                    Some(self.expr(0)?)
                };
                self.expect(TokenKind::RightParen, "stmt")?;
                let body = Box::new(self.stmt()?);
                Ok(Stmt::For {
                    init,
                    cond,
                    post,
                    body,
                    label: None,
                })
            }
            _ => {
                let expr = self.expr(0)?;
                self.expect(TokenKind::Semicolon, "stmt")?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    /// A for-init is a declaration (never a function), an expression, or
    /// nothing.
    fn for_init(&mut self) -> Result<ForInit, ParseError> {
        let token = self.peek("for_init")?.clone();
        match token.kind {
            TokenKind::Semicolon => {
                self.advance("for_init")?;
                Ok(ForInit::None)
            }
            TokenKind::Int => match self.declaration()? {
                Declaration::Func(_) => Err(ParseError::Syntax(format!(
                    "cannot declare function in for loop init @ {}:{}",
                    token.line, token.offset
                ))),
                Declaration::Var(decl) => Ok(ForInit::Declaration(decl)),
            },
            _ => {
                let expr = self.expr(0)?;
                self.expect(TokenKind::Semicolon, "for_init")?;
                Ok(ForInit::Expression(expr))
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn function_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        if self.peek("function_arguments")?.kind == TokenKind::RightParen {
            return Ok(Vec::new());
        }

        let mut args = vec![self.expr(0)?];
        while self.peek("function_arguments")?.kind != TokenKind::RightParen {
            self.expect(TokenKind::Comma, "function_arguments")?;
            args.push(self.expr(0)?);
        }
        Ok(args)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance("factor")?;
        let res = match token.kind {
            TokenKind::IntLiteral(ref value) => {
                let parsed = value.parse::<i32>().map_err(|_| {
                    ParseError::Syntax(format!(
                        "integer constant '{}' out of range @ {}:{}",
                        value, token.line, token.offset
                    ))
                })?;
                Expr::Constant(parsed)
            }
            TokenKind::Identifier(name) => {
                if self.peek_is(&TokenKind::LeftParen) {
                    self.advance("factor")?;
                    let args = self.function_arguments()?;
                    self.expect(TokenKind::RightParen, "factor")?;
                    // A call is complete; postfix operators do not attach.
                    return Ok(Expr::FuncCall { name, args });
                }
                Expr::Variable(name)
            }
            TokenKind::LeftParen => {
                let inner = self.expr(0)?;
                self.expect(TokenKind::RightParen, "factor")?;
                inner
            }
            ref kind => {
                if let Some(op) = UnaryOp::from_prefix_token(kind) {
                    let inner = self.factor()?;
                    Expr::Unary {
                        op,
                        expr: Box::new(inner),
                    }
                } else {
                    let width = kind.lexeme().chars().count();
                    return Err(ParseError::Syntax(format!(
                        "expected an expression, found {} @ {}:{}",
                        kind.describe(),
                        token.line,
                        token.offset.saturating_sub(width)
                    )));
                }
            }
        };

        // Postfix inc/dec attach once after a completed factor.
        match self.peek("factor")?.kind {
            TokenKind::PlusPlus => {
                self.advance("factor")?;
                Ok(Expr::Unary {
                    op: UnaryOp::PostfixIncrement,
                    expr: Box::new(res),
                })
            }
            TokenKind::MinusMinus => {
                self.advance("factor")?;
                Ok(Expr::Unary {
                    op: UnaryOp::PostfixDecrement,
                    expr: Box::new(res),
                })
            }
            _ => Ok(res),
        }
    }

    fn conditional_middle(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::Question, "conditional_middle")?;
        let middle = self.expr(0)?;
        self.expect(TokenKind::Colon, "conditional_middle")?;
        Ok(middle)
    }

    fn expr(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.factor()?;
        loop {
            let next = self.peek("expr")?;
            let Some(op) = InfixOp::from_token(&next.kind) else {
                break;
            };
            if op.precedence() < min_prec {
                break;
            }

            left = match op {
                InfixOp::Binary(binary) if binary.is_assignment() => {
                    self.advance("expr")?;
                    let right = self.expr(binary.precedence())?;
                    Expr::Binary {
                        op: binary,
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
                InfixOp::Conditional => {
                    // Right-associative: the else arm recurses at the
                    // ternary's own precedence.
                    let middle = self.conditional_middle()?;
                    let right = self.expr(op.precedence())?;
                    Expr::Conditional {
                        cond: Box::new(left),
                        then: Box::new(middle),
                        otherwise: Box::new(right),
                    }
                }
                InfixOp::Binary(binary) => {
                    self.advance("expr")?;
                    let right = self.expr(binary.precedence() + 1)?;
                    Expr::Binary {
                        op: binary,
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
            };
        }
        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = Lexer::new(source).lex().unwrap();
        Parser::new(tokens).parse()
    }

    fn parse_expr(source: &str) -> Expr {
        // Wrap in a return statement to reuse the whole pipeline.
        let program = parse(&format!("int main(void) {{ return {}; }}", source)).unwrap();
        let Declaration::Func(func) = &program.declarations[0] else {
            panic!("expected function");
        };
        let BlockItem::Statement(Stmt::Return(expr)) = &func.body.as_ref().unwrap().items[0]
        else {
            panic!("expected return");
        };
        expr.clone()
    }

    #[test]
    fn test_parse_minimal_program() {
        let program = parse("int main(void) { return 2; }").unwrap();
        assert_eq!(program.declarations.len(), 1);
        let Declaration::Func(func) = &program.declarations[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(func.name, "main");
        assert!(func.params.is_empty());
        assert!(func.storage.is_none());
        assert_eq!(func.body.as_ref().unwrap().items.len(), 1);
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let expr = parse_expr("2 + 3 * 4");
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let program = parse("int main(void) { int a; int b; a = b = 3; }").unwrap();
        let Declaration::Func(func) = &program.declarations[0] else {
            panic!("expected function");
        };
        let BlockItem::Statement(Stmt::Expression(expr)) = &func.body.as_ref().unwrap().items[2]
        else {
            panic!("expected expression statement");
        };
        let Expr::Binary {
            op: BinaryOp::Assign,
            right,
            ..
        } = expr
        else {
            panic!("expected assignment");
        };
        assert!(matches!(
            **right,
            Expr::Binary {
                op: BinaryOp::Assign,
                ..
            }
        ));
    }

    #[test]
    fn test_conditional_expression() {
        let expr = parse_expr("a ? 1 : b ? 2 : 3");
        let Expr::Conditional { otherwise, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*otherwise, Expr::Conditional { .. }));
    }

    #[test]
    fn test_prefix_and_postfix_increment() {
        assert!(matches!(
            parse_expr("++a"),
            Expr::Unary {
                op: UnaryOp::PrefixIncrement,
                ..
            }
        ));
        assert!(matches!(
            parse_expr("a++"),
            Expr::Unary {
                op: UnaryOp::PostfixIncrement,
                ..
            }
        ));
        // Postfix binds to the factor, not the whole sum.
        let Expr::Binary { op, left, .. } = parse_expr("a++ + b") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            *left,
            Expr::Unary {
                op: UnaryOp::PostfixIncrement,
                ..
            }
        ));
    }

    #[test]
    fn test_function_call_arguments() {
        let expr = parse_expr("f(1, 2 + 3, g())");
        let Expr::FuncCall { name, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(name, "f");
        assert_eq!(args.len(), 3);
        assert!(matches!(&args[2], Expr::FuncCall { name, .. } if name == "g"));
    }

    #[test]
    fn test_return_without_expression() {
        let err = parse("int main(void) { return; }").unwrap_err();
        let message = err.to_string();
        assert!(
            message.starts_with("expected an expression"),
            "unexpected message: {}",
            message
        );
    }

    #[test]
    fn test_missing_initializer_token() {
        let err = parse("int main(void) { int x 5; }").unwrap_err();
        assert!(matches!(err, ParseError::TokenType { .. }));
        assert!(err.to_string().contains("';' or '='"));
    }

    #[test]
    fn test_truncated_function_reports_eof() {
        let err = parse("int f(void)").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_storage_specifiers() {
        let program = parse("static int x = 1; int static y = 2; extern int z;").unwrap();
        for (idx, expected) in [
            Some(StorageClass::Static),
            Some(StorageClass::Static),
            Some(StorageClass::Extern),
        ]
        .iter()
        .enumerate()
        {
            let Declaration::Var(var) = &program.declarations[idx] else {
                panic!("expected variable");
            };
            assert_eq!(var.storage, *expected);
        }
    }

    #[test]
    fn test_duplicate_storage_class_rejected() {
        let err = parse("static extern int x;").unwrap_err();
        assert!(err.to_string().contains("invalid storage classes"));
    }

    #[test]
    fn test_missing_type_specifier_rejected() {
        let err = parse("static x;").unwrap_err();
        assert!(err.to_string().contains("invalid type specifiers"));
    }

    #[test]
    fn test_function_in_for_init_rejected() {
        let err = parse("int main(void) { for (int f(void); ;) return 1; }").unwrap_err();
        assert!(
            err.to_string()
                .contains("cannot declare function in for loop init")
        );
    }

    #[test]
    fn test_for_variants() {
        let program = parse(
            "int main(void) { for (;;) break; for (i = 0; i < 3;) i = i + 1; \
             for (int i = 0; i < 3; i = i + 1) ; return 0; }",
        )
        .unwrap();
        let Declaration::Func(func) = &program.declarations[0] else {
            panic!("expected function");
        };
        let items = &func.body.as_ref().unwrap().items;
        assert!(matches!(
            &items[0],
            BlockItem::Statement(Stmt::For {
                init: ForInit::None,
                cond: None,
                post: None,
                ..
            })
        ));
        assert!(matches!(
            &items[1],
            BlockItem::Statement(Stmt::For {
                init: ForInit::Expression(_),
                cond: Some(_),
                post: None,
                ..
            })
        ));
        assert!(matches!(
            &items[2],
            BlockItem::Statement(Stmt::For {
                init: ForInit::Declaration(_),
                cond: Some(_),
                post: Some(_),
                ..
            })
        ));
    }

    #[test]
    fn test_labels_and_goto() {
        let program = parse("int main(void) { top: x = x + 1; goto top; return x; }").unwrap();
        let Declaration::Func(func) = &program.declarations[0] else {
            panic!("expected function");
        };
        let items = &func.body.as_ref().unwrap().items;
        assert!(matches!(
            &items[0],
            BlockItem::Statement(Stmt::Label(name)) if name == "top"
        ));
        assert!(matches!(
            &items[2],
            BlockItem::Statement(Stmt::Goto(name)) if name == "top"
        ));
    }

    #[test]
    fn test_do_while() {
        let program = parse("int main(void) { int i = 0; do i = i + 1; while (i < 3); return i; }")
            .unwrap();
        let Declaration::Func(func) = &program.declarations[0] else {
            panic!("expected function");
        };
        assert!(matches!(
            &func.body.as_ref().unwrap().items[1],
            BlockItem::Statement(Stmt::DoWhile { .. })
        ));
    }

    #[test]
    fn test_declaration_without_definition() {
        let program = parse("int f(int a, int b); int x;").unwrap();
        let Declaration::Func(func) = &program.declarations[0] else {
            panic!("expected function");
        };
        assert_eq!(func.params, vec!["a".to_string(), "b".to_string()]);
        assert!(func.body.is_none());
    }
}
