//! Recursive-descent parser producing the AST.
//!
//! Expressions are parsed with a precedence ladder (lowest to highest:
//! `or`, `and`, comparisons, additive, multiplicative, power, unary,
//! postfix). Calls whose callee names a `data` definition are rewritten to
//! record constructors in a final pass once the whole model is known, so a
//! `data` declared later in the file still constructs.

use std::{collections::HashSet, rc::Rc};

use crate::{
    ast::{
        BinaryOp, CondClause, DataDef, Definition, Expr, ExprLoc, Field, FunctionDef, LambdaDef, LogicalOp,
        MethodDef, Model, Param, Product, UnaryOp, VariableDef,
    },
    error::SimplexError,
    lex::{lex, Token},
    location::CodeRange,
    types::Type,
};

/// Maximum expression nesting depth.
///
/// Prevents stack overflow on pathological input like `((((...))))`; the
/// same bound protects the recursive analyzer and evaluator, which walk the
/// tree no deeper than it was parsed.
const MAX_NESTING_DEPTH: u16 = 200;

/// Parses a whole source file.
pub(crate) fn parse(source: &str) -> Result<Model, SimplexError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let model = parser.model()?;
    Ok(resolve_data_calls(model))
}

struct Parser {
    tokens: Vec<(Token, CodeRange)>,
    pos: usize,
    depth: u16,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> CodeRange {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(CodeRange::new(1, 1), |(_, p)| *p)
    }

    fn advance(&mut self) -> Option<(Token, CodeRange)> {
        let entry = self.tokens.get(self.pos).cloned();
        if entry.is_some() {
            self.pos += 1;
        }
        entry
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<CodeRange, SimplexError> {
        let position = self.position();
        match self.advance() {
            Some((found, pos)) if found == *token => Ok(pos),
            Some((found, pos)) => Err(SimplexError::parser(
                format!("expected {}, found {}", token.describe(), found.describe()),
                pos,
            )),
            None => Err(SimplexError::parser(
                format!("expected {}, found end of input", token.describe()),
                position,
            )),
        }
    }

    fn expect_name(&mut self) -> Result<(String, CodeRange), SimplexError> {
        let position = self.position();
        match self.advance() {
            Some((Token::Name(name), pos)) => Ok((name, pos)),
            Some((found, pos)) => Err(SimplexError::parser(
                format!("expected a name, found {}", found.describe()),
                pos,
            )),
            None => Err(SimplexError::parser("expected a name, found end of input", position)),
        }
    }

    fn unexpected(&self, wanted: &str) -> SimplexError {
        let position = self.position();
        match self.peek() {
            Some(token) => SimplexError::parser(format!("expected {wanted}, found {}", token.describe()), position),
            None => SimplexError::parser(format!("expected {wanted}, found end of input"), position),
        }
    }

    // --- model structure ---

    fn model(&mut self) -> Result<Model, SimplexError> {
        let mut definitions = Vec::new();
        let mut products = Vec::new();
        while let Some(token) = self.peek() {
            match token {
                Token::Let => definitions.push(self.variable_definition()?),
                Token::Fun => definitions.push(self.function_definition()?),
                Token::Meth => definitions.push(self.method_definition()?),
                Token::Data => definitions.push(self.data_definition()?),
                Token::Product => products.push(self.product()?),
                _ => return Err(self.unexpected("a definition or `product`")),
            }
        }
        Ok(Model {
            definitions,
            products,
        })
    }

    fn variable_definition(&mut self) -> Result<Definition, SimplexError> {
        let position = self.expect(&Token::Let)?;
        let (name, _) = self.expect_name()?;
        let declared = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(&Token::Eq)?;
        let init = self.expression()?;
        self.eat(&Token::Semicolon);
        Ok(Definition::Variable(Rc::new(VariableDef {
            name,
            declared,
            init,
            position,
        })))
    }

    fn function_definition(&mut self) -> Result<Definition, SimplexError> {
        let position = self.expect(&Token::Fun)?;
        let (name, _) = self.expect_name()?;
        let params = self.param_list()?;
        self.expect(&Token::Colon)?;
        let ret = self.parse_type()?;
        let (locals, body) = self.function_body()?;
        Ok(Definition::Function(Rc::new(FunctionDef {
            name,
            params,
            ret,
            locals,
            body,
            position,
        })))
    }

    fn method_definition(&mut self) -> Result<Definition, SimplexError> {
        let position = self.expect(&Token::Meth)?;
        let target = self.parse_type()?;
        self.expect(&Token::Dot)?;
        let (name, _) = self.expect_name()?;
        let params = self.param_list()?;
        self.expect(&Token::Colon)?;
        let ret = self.parse_type()?;
        let body = self.expr_block(false)?;
        Ok(Definition::Method(Rc::new(MethodDef {
            target,
            name,
            params,
            ret,
            body,
            position,
        })))
    }

    fn data_definition(&mut self) -> Result<Definition, SimplexError> {
        let position = self.expect(&Token::Data)?;
        let (name, _) = self.expect_name()?;
        self.expect(&Token::LParen)?;
        let mut fields = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let (field_name, _) = self.expect_name()?;
                self.expect(&Token::Colon)?;
                let declared = self.parse_type()?;
                fields.push(Field {
                    name: field_name,
                    declared,
                });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        self.eat(&Token::Semicolon);
        Ok(Definition::Data(Rc::new(DataDef {
            name,
            fields,
            position,
        })))
    }

    fn product(&mut self) -> Result<Product, SimplexError> {
        let position = self.expect(&Token::Product)?;
        let name = match self.advance() {
            Some((Token::StringLit(name), _)) => name,
            Some((found, pos)) => {
                return Err(SimplexError::parser(
                    format!("expected a product name string, found {}", found.describe()),
                    pos,
                ));
            }
            None => return Err(SimplexError::parser("expected a product name string", position)),
        };
        let body = self.expr_block(true)?;
        Ok(Product {
            name,
            body,
            position,
        })
    }

    fn param_list(&mut self) -> Result<Vec<Param>, SimplexError> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let (name, _) = self.expect_name()?;
                self.expect(&Token::Colon)?;
                let declared = self.parse_type()?;
                params.push(Param { name, declared });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        Ok(params)
    }

    /// A function body: optional nested `fun` definitions, then expressions.
    fn function_body(&mut self) -> Result<(Vec<Definition>, Vec<ExprLoc>), SimplexError> {
        self.expect(&Token::LBrace)?;
        let mut locals = Vec::new();
        while self.check(&Token::Fun) {
            locals.push(self.function_definition()?);
        }
        let body = self.block_expressions(false)?;
        Ok((locals, body))
    }

    /// The expressions of a braced block. `allow_empty` is true only for
    /// product bodies.
    fn expr_block(&mut self, allow_empty: bool) -> Result<Vec<ExprLoc>, SimplexError> {
        self.expect(&Token::LBrace)?;
        self.block_expressions(allow_empty)
    }

    /// Expressions up to the closing brace (which is consumed).
    fn block_expressions(&mut self, allow_empty: bool) -> Result<Vec<ExprLoc>, SimplexError> {
        let mut body = Vec::new();
        if !self.check(&Token::RBrace) {
            loop {
                body.push(self.expression()?);
                if !self.eat(&Token::Semicolon) {
                    break;
                }
                if self.check(&Token::RBrace) {
                    break;
                }
            }
        }
        let close = self.expect(&Token::RBrace)?;
        if body.is_empty() && !allow_empty {
            return Err(SimplexError::parser("a block must contain at least one expression", close));
        }
        Ok(body)
    }

    // --- types ---

    fn parse_type(&mut self) -> Result<Type, SimplexError> {
        match self.peek() {
            Some(Token::Name(_)) => {
                let (name, _) = self.expect_name()?;
                Ok(Type::simple(&name))
            }
            Some(Token::LBracket) => {
                self.expect(&Token::LBracket)?;
                let elem = self.parse_type()?;
                self.expect(&Token::RBracket)?;
                Ok(Type::vector(elem))
            }
            Some(Token::LParen) => {
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.check(&Token::RParen) {
                    loop {
                        args.push(self.parse_type()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen)?;
                self.expect(&Token::Arrow)?;
                let ret = self.parse_type()?;
                Ok(Type::function(vec![args], ret))
            }
            _ => Err(self.unexpected("a type")),
        }
    }

    // --- expressions ---

    fn expression(&mut self) -> Result<ExprLoc, SimplexError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(SimplexError::parser("expression nesting too deep", self.position()));
        }
        self.depth += 1;
        let result = self.expression_inner();
        self.depth -= 1;
        result
    }

    fn expression_inner(&mut self) -> Result<ExprLoc, SimplexError> {
        if self.check(&Token::Let) {
            return self.let_binding();
        }
        let expr = self.or_expression()?;
        if self.check(&Token::Walrus) {
            let position = self.expect(&Token::Walrus)?;
            let value = Box::new(self.expression()?);
            return match expr.expr {
                Expr::Name(name) => Ok(ExprLoc::new(Expr::Assign { name, value }, expr.position)),
                Expr::FieldRef { target, field } => Ok(ExprLoc::new(
                    Expr::FieldUpdate {
                        target,
                        field,
                        value,
                    },
                    expr.position,
                )),
                _ => Err(SimplexError::parser(
                    "only a name or a field can be assigned with `:=`",
                    position,
                )),
            };
        }
        Ok(expr)
    }

    fn let_binding(&mut self) -> Result<ExprLoc, SimplexError> {
        let position = self.expect(&Token::Let)?;
        let (name, _) = self.expect_name()?;
        let declared = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(&Token::Eq)?;
        let init = Box::new(self.expression()?);
        Ok(ExprLoc::new(
            Expr::Let {
                name,
                declared,
                init,
            },
            position,
        ))
    }

    fn or_expression(&mut self) -> Result<ExprLoc, SimplexError> {
        let mut left = self.and_expression()?;
        while self.eat(&Token::Or) {
            let right = self.and_expression()?;
            let position = left.position;
            left = ExprLoc::new(
                Expr::Logical {
                    op: LogicalOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                position,
            );
        }
        Ok(left)
    }

    fn and_expression(&mut self) -> Result<ExprLoc, SimplexError> {
        let mut left = self.comparison()?;
        while self.eat(&Token::And) {
            let right = self.comparison()?;
            let position = left.position;
            left = ExprLoc::new(
                Expr::Logical {
                    op: LogicalOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                position,
            );
        }
        Ok(left)
    }

    /// Comparisons are non-associative: `a < b < c` is a parse error at the
    /// second operator.
    fn comparison(&mut self) -> Result<ExprLoc, SimplexError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::EqEq) => Some(BinaryOp::Eq),
            Some(Token::BangEq) => Some(BinaryOp::Ne),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::Le) => Some(BinaryOp::Le),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::Ge) => Some(BinaryOp::Ge),
            _ => None,
        };
        let Some(op) = op else { return Ok(left) };
        self.advance();
        let right = self.additive()?;
        let position = left.position;
        Ok(ExprLoc::new(
            Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            position,
        ))
    }

    fn additive(&mut self) -> Result<ExprLoc, SimplexError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            let position = left.position;
            left = ExprLoc::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                position,
            );
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<ExprLoc, SimplexError> {
        let mut left = self.power()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.power()?;
            let position = left.position;
            left = ExprLoc::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                position,
            );
        }
        Ok(left)
    }

    /// `^` is right-associative: `2 ^ 3 ^ 2` is `2 ^ (3 ^ 2)`.
    fn power(&mut self) -> Result<ExprLoc, SimplexError> {
        let left = self.unary()?;
        if self.eat(&Token::Caret) {
            let right = self.power()?;
            let position = left.position;
            return Ok(ExprLoc::new(
                Expr::Binary {
                    op: BinaryOp::Pow,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                position,
            ));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<ExprLoc, SimplexError> {
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Bang) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let position = self.position();
            self.advance();
            let operand = Box::new(self.unary()?);
            return Ok(ExprLoc::new(Expr::Unary { op, operand }, position));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<ExprLoc, SimplexError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::Arrow) => {
                    self.advance();
                    let (method, _) = self.expect_name()?;
                    let args = self.argument_list()?;
                    let position = expr.position;
                    expr = ExprLoc::new(
                        Expr::MethodCall {
                            target: Box::new(expr),
                            method,
                            args,
                        },
                        position,
                    );
                }
                Some(Token::Dot) => {
                    self.advance();
                    let (field, _) = self.expect_name()?;
                    let position = expr.position;
                    expr = ExprLoc::new(
                        Expr::FieldRef {
                            target: Box::new(expr),
                            field,
                        },
                        position,
                    );
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(&Token::RBracket)?;
                    let position = expr.position;
                    expr = ExprLoc::new(
                        Expr::Binary {
                            op: BinaryOp::Index,
                            left: Box::new(expr),
                            right: Box::new(index),
                        },
                        position,
                    );
                }
                Some(Token::LParen) => {
                    let args = self.argument_list()?;
                    let position = expr.position;
                    expr = ExprLoc::new(
                        Expr::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        position,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn argument_list(&mut self) -> Result<Vec<ExprLoc>, SimplexError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                args.push(self.expression()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<ExprLoc, SimplexError> {
        let position = self.position();
        match self.peek() {
            Some(Token::IntLit(_)) => {
                let Some((Token::IntLit(v), pos)) = self.advance() else {
                    unreachable!()
                };
                Ok(ExprLoc::new(Expr::IntLit(v), pos))
            }
            Some(Token::FloatLit(_)) => {
                let Some((Token::FloatLit(v), pos)) = self.advance() else {
                    unreachable!()
                };
                Ok(ExprLoc::new(Expr::FloatLit(v), pos))
            }
            Some(Token::StringLit(_)) => {
                let Some((Token::StringLit(v), pos)) = self.advance() else {
                    unreachable!()
                };
                Ok(ExprLoc::new(Expr::StrLit(Rc::from(v.as_str())), pos))
            }
            Some(Token::True) => {
                self.advance();
                Ok(ExprLoc::new(Expr::BoolLit(true), position))
            }
            Some(Token::False) => {
                self.advance();
                Ok(ExprLoc::new(Expr::BoolLit(false), position))
            }
            Some(Token::Name(_)) => {
                let (name, pos) = self.expect_name()?;
                Ok(ExprLoc::new(Expr::Name(name), pos))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&Token::RBracket) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RBracket)?;
                Ok(ExprLoc::new(Expr::VectorLit(elements), position))
            }
            Some(Token::LBrace) => {
                let body = self.expr_block(false)?;
                Ok(ExprLoc::new(Expr::Block(body), position))
            }
            Some(Token::If) => self.conditional(),
            Some(Token::While) => self.while_loop(),
            Some(Token::For) => self.for_loop(),
            Some(Token::Lambda) => self.lambda(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn conditional(&mut self) -> Result<ExprLoc, SimplexError> {
        let position = self.expect(&Token::If)?;
        let mut clauses = Vec::new();
        loop {
            self.expect(&Token::LParen)?;
            let guard = self.expression()?;
            self.expect(&Token::RParen)?;
            self.expect(&Token::Then)?;
            let value = self.expression()?;
            clauses.push(CondClause { guard, value });
            if !self.eat(&Token::Elif) {
                break;
            }
        }
        self.expect(&Token::Else)?;
        let otherwise = Box::new(self.expression()?);
        Ok(ExprLoc::new(
            Expr::Cond {
                clauses,
                otherwise,
            },
            position,
        ))
    }

    fn while_loop(&mut self) -> Result<ExprLoc, SimplexError> {
        let position = self.expect(&Token::While)?;
        self.expect(&Token::LParen)?;
        let cond = Box::new(self.expression()?);
        self.expect(&Token::RParen)?;
        let body_position = self.position();
        let body = self.expr_block(false)?;
        Ok(ExprLoc::new(
            Expr::While {
                cond,
                body: Box::new(ExprLoc::new(Expr::Block(body), body_position)),
            },
            position,
        ))
    }

    fn for_loop(&mut self) -> Result<ExprLoc, SimplexError> {
        let position = self.expect(&Token::For)?;
        let (var, _) = self.expect_name()?;
        self.expect(&Token::In)?;
        let collection = Box::new(self.expression()?);
        let body_position = self.position();
        let body = self.expr_block(false)?;
        Ok(ExprLoc::new(
            Expr::For {
                var,
                collection,
                body: Box::new(ExprLoc::new(Expr::Block(body), body_position)),
            },
            position,
        ))
    }

    fn lambda(&mut self) -> Result<ExprLoc, SimplexError> {
        let position = self.expect(&Token::Lambda)?;
        let params = self.param_list()?;
        self.expect(&Token::Colon)?;
        let ret = self.parse_type()?;
        let body = self.expr_block(false)?;
        Ok(ExprLoc::new(
            Expr::Lambda(Rc::new(LambdaDef {
                params,
                ret: Some(ret),
                body,
                position,
            })),
            position,
        ))
    }
}

// --- data-constructor resolution ---

/// Rewrites `Call` nodes whose callee names a data definition into
/// `MakeData` nodes, across the whole model.
fn resolve_data_calls(model: Model) -> Model {
    let data_names: HashSet<String> = model
        .definitions
        .iter()
        .filter_map(|def| match def {
            Definition::Data(data) => Some(data.name.clone()),
            _ => None,
        })
        .collect();
    if data_names.is_empty() {
        return model;
    }
    let definitions = model
        .definitions
        .into_iter()
        .map(|def| resolve_definition(def, &data_names))
        .collect();
    let products = model
        .products
        .into_iter()
        .map(|product| Product {
            name: product.name,
            body: resolve_body(product.body, &data_names),
            position: product.position,
        })
        .collect();
    Model {
        definitions,
        products,
    }
}

fn resolve_definition(def: Definition, data_names: &HashSet<String>) -> Definition {
    match def {
        Definition::Variable(var) => Definition::Variable(Rc::new(VariableDef {
            name: var.name.clone(),
            declared: var.declared.clone(),
            init: resolve_expr(var.init.clone(), data_names),
            position: var.position,
        })),
        Definition::Function(fun) => Definition::Function(Rc::new(FunctionDef {
            name: fun.name.clone(),
            params: fun.params.clone(),
            ret: fun.ret.clone(),
            locals: fun
                .locals
                .iter()
                .cloned()
                .map(|local| resolve_definition(local, data_names))
                .collect(),
            body: resolve_body(fun.body.clone(), data_names),
            position: fun.position,
        })),
        Definition::Method(meth) => Definition::Method(Rc::new(MethodDef {
            target: meth.target.clone(),
            name: meth.name.clone(),
            params: meth.params.clone(),
            ret: meth.ret.clone(),
            body: resolve_body(meth.body.clone(), data_names),
            position: meth.position,
        })),
        Definition::Data(_) => def,
    }
}

fn resolve_body(body: Vec<ExprLoc>, data_names: &HashSet<String>) -> Vec<ExprLoc> {
    body.into_iter().map(|e| resolve_expr(e, data_names)).collect()
}

fn resolve_boxed(expr: Box<ExprLoc>, data_names: &HashSet<String>) -> Box<ExprLoc> {
    Box::new(resolve_expr(*expr, data_names))
}

fn resolve_expr(expr: ExprLoc, data_names: &HashSet<String>) -> ExprLoc {
    let position = expr.position;
    let rewritten = match expr.expr {
        Expr::Call { callee, args } => {
            let args = resolve_body(args, data_names);
            if let Expr::Name(name) = &callee.expr {
                if data_names.contains(name) {
                    return ExprLoc::new(
                        Expr::MakeData {
                            type_name: name.clone(),
                            args,
                        },
                        position,
                    );
                }
            }
            Expr::Call {
                callee: resolve_boxed(callee, data_names),
                args,
            }
        }
        Expr::Assign { name, value } => Expr::Assign {
            name,
            value: resolve_boxed(value, data_names),
        },
        Expr::Block(body) => Expr::Block(resolve_body(body, data_names)),
        Expr::Let {
            name,
            declared,
            init,
        } => Expr::Let {
            name,
            declared,
            init: resolve_boxed(init, data_names),
        },
        Expr::Cond {
            clauses,
            otherwise,
        } => Expr::Cond {
            clauses: clauses
                .into_iter()
                .map(|clause| CondClause {
                    guard: resolve_expr(clause.guard, data_names),
                    value: resolve_expr(clause.value, data_names),
                })
                .collect(),
            otherwise: resolve_boxed(otherwise, data_names),
        },
        Expr::While { cond, body } => Expr::While {
            cond: resolve_boxed(cond, data_names),
            body: resolve_boxed(body, data_names),
        },
        Expr::For {
            var,
            collection,
            body,
        } => Expr::For {
            var,
            collection: resolve_boxed(collection, data_names),
            body: resolve_boxed(body, data_names),
        },
        Expr::VectorLit(elements) => Expr::VectorLit(resolve_body(elements, data_names)),
        Expr::MakeData { type_name, args } => Expr::MakeData {
            type_name,
            args: resolve_body(args, data_names),
        },
        Expr::FieldRef { target, field } => Expr::FieldRef {
            target: resolve_boxed(target, data_names),
            field,
        },
        Expr::FieldUpdate {
            target,
            field,
            value,
        } => Expr::FieldUpdate {
            target: resolve_boxed(target, data_names),
            field,
            value: resolve_boxed(value, data_names),
        },
        Expr::Unary { op, operand } => Expr::Unary {
            op,
            operand: resolve_boxed(operand, data_names),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: resolve_boxed(left, data_names),
            right: resolve_boxed(right, data_names),
        },
        Expr::Logical { op, left, right } => Expr::Logical {
            op,
            left: resolve_boxed(left, data_names),
            right: resolve_boxed(right, data_names),
        },
        Expr::MethodCall {
            target,
            method,
            args,
        } => Expr::MethodCall {
            target: resolve_boxed(target, data_names),
            method,
            args: resolve_body(args, data_names),
        },
        Expr::Lambda(lambda) => Expr::Lambda(Rc::new(LambdaDef {
            params: lambda.params.clone(),
            ret: lambda.ret.clone(),
            body: resolve_body(lambda.body.clone(), data_names),
            position: lambda.position,
        })),
        other @ (Expr::IntLit(_) | Expr::FloatLit(_) | Expr::BoolLit(_) | Expr::StrLit(_) | Expr::Name(_)) => other,
    };
    ExprLoc::new(rewritten, position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse_one_expr(source: &str) -> ExprLoc {
        let model = parse(&format!("product \"p\" {{ {source} }}")).expect("parses");
        model.products.into_iter().next().expect("one product").body.remove(0)
    }

    #[test]
    fn precedence_mul_over_add() {
        let expr = parse_one_expr("1 + 2 * 3");
        let Expr::Binary { op: BinaryOp::Add, right, .. } = expr.expr else {
            panic!("expected addition at the root");
        };
        assert!(matches!(right.expr, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn power_is_right_associative() {
        let expr = parse_one_expr("2 ^ 3 ^ 2");
        let Expr::Binary { op: BinaryOp::Pow, right, .. } = expr.expr else {
            panic!("expected power at the root");
        };
        assert!(matches!(right.expr, Expr::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn method_chain_parses_left_to_right() {
        let expr = parse_one_expr("cuboid(1.0, 1.0, 1.0)->move(1.0, 0.0, 0.0)->scale(2.0, 2.0, 2.0)");
        let Expr::MethodCall { target, method, .. } = expr.expr else {
            panic!("expected a method call at the root");
        };
        assert_eq!(method, "scale");
        assert!(matches!(target.expr, Expr::MethodCall { .. }));
    }

    #[test]
    fn subscript_parses_as_index() {
        let expr = parse_one_expr("v[0]");
        assert!(matches!(expr.expr, Expr::Binary { op: BinaryOp::Index, .. }));
    }

    #[test]
    fn field_update_target() {
        let expr = parse_one_expr("p.x := 5.0");
        assert!(matches!(expr.expr, Expr::FieldUpdate { .. }));
    }

    #[test]
    fn assignment_to_literal_is_rejected() {
        let err = parse("product \"p\" { 3 := 4 }").expect_err("bad target");
        assert_eq!(err.kind, ErrorKind::Parser);
    }

    #[test]
    fn conditional_with_elif() {
        let expr = parse_one_expr("if (a) then 1 elif (b) then 2 else 3");
        let Expr::Cond { clauses, .. } = expr.expr else {
            panic!("expected a conditional");
        };
        assert_eq!(clauses.len(), 2);
    }

    #[test]
    fn data_constructor_calls_are_resolved() {
        let model = parse("data Pt(x: Float, y: Float); product \"p\" { Pt(1.0, 2.0) }").expect("parses");
        let expr = &model.products[0].body[0];
        assert!(matches!(&expr.expr, Expr::MakeData { type_name, .. } if type_name == "Pt"));
    }

    /// A constructor call may appear before the data definition in the file.
    #[test]
    fn data_resolution_is_order_independent() {
        let model = parse("let p = Pt(1.0, 2.0); data Pt(x: Float, y: Float)").expect("parses");
        let Definition::Variable(var) = &model.definitions[0] else {
            panic!("expected a variable definition");
        };
        assert!(matches!(&var.init.expr, Expr::MakeData { .. }));
    }

    #[test]
    fn nested_function_definitions_become_locals() {
        let model = parse("fun outer(n: Int): Int { fun inner(m: Int): Int { m + 1 } inner(n) }").expect("parses");
        let Definition::Function(fun) = &model.definitions[0] else {
            panic!("expected a function definition");
        };
        assert_eq!(fun.locals.len(), 1);
        assert_eq!(fun.body.len(), 1);
    }

    #[test]
    fn method_definition_on_vector_type() {
        let model = parse("meth [Int].head(): Int { self[0] }").expect("parses");
        let Definition::Method(meth) = &model.definitions[0] else {
            panic!("expected a method definition");
        };
        assert_eq!(meth.target, Type::vector(Type::int()));
    }

    #[test]
    fn empty_product_body_is_allowed() {
        let model = parse("product \"empty\" { }").expect("parses");
        assert!(model.products[0].body.is_empty());
    }

    #[test]
    fn empty_block_expression_is_rejected() {
        let err = parse("product \"p\" { while (true) { } }").expect_err("empty block");
        assert_eq!(err.kind, ErrorKind::Parser);
    }

    #[test]
    fn function_type_annotation() {
        let model = parse("let f: (Int, Int) -> Int = g;").expect("parses");
        let Definition::Variable(var) = &model.definitions[0] else {
            panic!("expected a variable definition");
        };
        assert_eq!(
            var.declared,
            Some(Type::function(vec![vec![Type::int(), Type::int()]], Type::int()))
        );
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let mut source = String::from("product \"p\" { ");
        for _ in 0..300 {
            source.push('(');
        }
        source.push('1');
        for _ in 0..300 {
            source.push(')');
        }
        source.push_str(" }");
        let err = parse(&source).expect_err("too deep");
        assert_eq!(err.kind, ErrorKind::Parser);
    }

    #[test]
    fn comparison_is_non_associative() {
        assert!(parse("product \"p\" { 1 < 2 < 3 }").is_err());
    }
}
