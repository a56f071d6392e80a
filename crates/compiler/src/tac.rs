//! Three-address code: the mid-level IR between the AST and assembly.
//!
//! Every instruction has at most two sources and one destination; control
//! flow is explicit labels and jumps. Lowering walks the decorated AST once
//! per function, appending instructions and returning the value that holds
//! each expression's result. Short-circuit operators, conditionals and loops
//! all become label/jump patterns here so the assembly stage never sees
//! structured control flow.

use crate::ast;
use crate::names::NameContext;
use crate::typechecker::{IdentifierAttrs, InitialValue, SymbolTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Constant(i32),
    Variable(String),
    /// Result of a statement; never an instruction operand.
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Complement,
    Negate,
    Not,
    PrefixIncrement,
    PrefixDecrement,
    PostfixIncrement,
    PostfixDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    LeftShift,
    RightShift,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Return(Value),
    Unary {
        op: UnaryOp,
        src: Value,
        dst: Value,
    },
    Binary {
        op: BinaryOp,
        left: Value,
        right: Value,
        dst: Value,
    },
    Copy {
        src: Value,
        dst: Value,
    },
    Jump(String),
    JumpIfZero {
        cond: Value,
        target: String,
    },
    JumpIfNotZero {
        cond: Value,
        target: String,
    },
    Label(String),
    FuncCall {
        name: String,
        args: Vec<Value>,
        dst: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopLevel {
    Function {
        name: String,
        global: bool,
        params: Vec<String>,
        body: Vec<Instruction>,
    },
    StaticVar {
        name: String,
        global: bool,
        init: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub top_level: Vec<TopLevel>,
}

fn unary_op(op: ast::UnaryOp) -> UnaryOp {
    match op {
        ast::UnaryOp::Complement => UnaryOp::Complement,
        ast::UnaryOp::Negate => UnaryOp::Negate,
        ast::UnaryOp::Not => UnaryOp::Not,
        ast::UnaryOp::PrefixIncrement => UnaryOp::PrefixIncrement,
        ast::UnaryOp::PrefixDecrement => UnaryOp::PrefixDecrement,
        ast::UnaryOp::PostfixIncrement => UnaryOp::PostfixIncrement,
        ast::UnaryOp::PostfixDecrement => UnaryOp::PostfixDecrement,
    }
}

fn binary_op(op: ast::BinaryOp) -> BinaryOp {
    match op {
        ast::BinaryOp::Add => BinaryOp::Add,
        ast::BinaryOp::Subtract => BinaryOp::Subtract,
        ast::BinaryOp::Multiply => BinaryOp::Multiply,
        ast::BinaryOp::Divide => BinaryOp::Divide,
        ast::BinaryOp::Remainder => BinaryOp::Remainder,
        ast::BinaryOp::LeftShift => BinaryOp::LeftShift,
        ast::BinaryOp::RightShift => BinaryOp::RightShift,
        ast::BinaryOp::BitwiseAnd => BinaryOp::BitwiseAnd,
        ast::BinaryOp::BitwiseOr => BinaryOp::BitwiseOr,
        ast::BinaryOp::BitwiseXor => BinaryOp::BitwiseXor,
        ast::BinaryOp::Equal => BinaryOp::Equal,
        ast::BinaryOp::NotEqual => BinaryOp::NotEqual,
        ast::BinaryOp::LessThan => BinaryOp::LessThan,
        ast::BinaryOp::LessOrEqual => BinaryOp::LessOrEqual,
        ast::BinaryOp::GreaterThan => BinaryOp::GreaterThan,
        ast::BinaryOp::GreaterOrEqual => BinaryOp::GreaterOrEqual,
        other => unreachable!("{:?} is lowered structurally, not as a TAC binary", other),
    }
}

pub struct TacGen<'a> {
    names: &'a mut NameContext,
    symbols: &'a SymbolTable,
}

impl<'a> TacGen<'a> {
    pub fn new(names: &'a mut NameContext, symbols: &'a SymbolTable) -> Self {
        TacGen { names, symbols }
    }

    pub fn lower_program(&mut self, program: &ast::Program) -> Program {
        let mut top_level = Vec::new();
        for decl in &program.declarations {
            if let ast::Declaration::Func(func) = decl {
                if let Some(lowered) = self.lower_function(func) {
                    top_level.push(lowered);
                }
            }
        }
        top_level.extend(self.static_variables());
        Program { top_level }
    }

    fn lower_function(&mut self, func: &ast::FuncDecl) -> Option<TopLevel> {
        let body = func.body.as_ref()?;

        let Some(symbol) = self.symbols.get(&func.name) else {
            unreachable!("function {} missing from symbol table", func.name);
        };
        let IdentifierAttrs::Func { global, .. } = symbol.attrs else {
            unreachable!("function {} carries non-function attrs", func.name);
        };

        let mut instructions = Vec::new();
        self.emit_block(body, &mut instructions);
        // Control never falls off the end of a function.
        instructions.push(Instruction::Return(Value::Constant(0)));

        Some(TopLevel::Function {
            name: func.name.clone(),
            global,
            params: func.params.clone(),
            body: instructions,
        })
    }

    /// Every `Static` symbol becomes a data definition: explicit initials
    /// keep their value, tentative definitions become zero, and `extern`
    /// references to definitions elsewhere emit nothing.
    fn static_variables(&self) -> Vec<TopLevel> {
        let mut defs = Vec::new();
        for (name, symbol) in self.symbols.iter() {
            let IdentifierAttrs::Static { init, global } = symbol.attrs else {
                continue;
            };
            let init = match init {
                InitialValue::Initial(value) => value,
                InitialValue::Tentative => 0,
                InitialValue::NoInitializer => continue,
            };
            defs.push(TopLevel::StaticVar {
                name: name.clone(),
                global,
                init,
            });
        }
        defs
    }

    fn emit_block(&mut self, block: &ast::Block, instructions: &mut Vec<Instruction>) {
        for item in &block.items {
            match item {
                ast::BlockItem::Statement(stmt) => self.emit_stmt(stmt, instructions),
                ast::BlockItem::Declaration(ast::Declaration::Var(decl)) => {
                    self.emit_var_decl(decl, instructions)
                }
                // Block-scope function declarations have no body to lower.
                ast::BlockItem::Declaration(ast::Declaration::Func(_)) => {}
            }
        }
    }

    /// Automatic variables with initializers become a plain copy; static
    /// locals are materialized from the symbol table instead.
    fn emit_var_decl(&mut self, decl: &ast::VarDecl, instructions: &mut Vec<Instruction>) {
        if decl.storage.is_none() {
            if let Some(init) = &decl.init {
                let value = self.emit_expr(init, instructions);
                instructions.push(Instruction::Copy {
                    src: value,
                    dst: Value::Variable(decl.name.clone()),
                });
            }
        }
    }

    fn emit_stmt(&mut self, stmt: &ast::Stmt, instructions: &mut Vec<Instruction>) {
        match stmt {
            ast::Stmt::Return(expr) => {
                let value = self.emit_expr(expr, instructions);
                instructions.push(Instruction::Return(value));
            }
            ast::Stmt::Expression(expr) => {
                self.emit_expr(expr, instructions);
            }
            ast::Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let end_label = self.names.label("end");
                let else_label = self.names.label("else");
                let cond = self.emit_expr(cond, instructions);
                instructions.push(Instruction::JumpIfZero {
                    cond,
                    target: else_label.clone(),
                });
                self.emit_stmt(then, instructions);
                instructions.push(Instruction::Jump(end_label.clone()));
                instructions.push(Instruction::Label(else_label));
                if let Some(otherwise) = otherwise {
                    self.emit_stmt(otherwise, instructions);
                }
                instructions.push(Instruction::Label(end_label));
            }
            ast::Stmt::Label(name) => instructions.push(Instruction::Label(name.clone())),
            ast::Stmt::Goto(target) => instructions.push(Instruction::Jump(target.clone())),
            ast::Stmt::Compound(block) => self.emit_block(block, instructions),
            ast::Stmt::Break { label } => {
                let Some(label) = label else {
                    unreachable!("break without a loop label after resolution");
                };
                instructions.push(Instruction::Jump(format!("__break__{}", label)));
            }
            ast::Stmt::Continue { label } => {
                let Some(label) = label else {
                    unreachable!("continue without a loop label after resolution");
                };
                instructions.push(Instruction::Jump(format!("__continue__{}", label)));
            }
            ast::Stmt::While { cond, body, label } => {
                let Some(label) = label else {
                    unreachable!("while without a loop label after resolution");
                };
                let continue_label = format!("__continue__{}", label);
                let break_label = format!("__break__{}", label);

                instructions.push(Instruction::Label(continue_label.clone()));
                let cond = self.emit_expr(cond, instructions);
                instructions.push(Instruction::JumpIfZero {
                    cond,
                    target: break_label.clone(),
                });
                self.emit_stmt(body, instructions);
                instructions.push(Instruction::Jump(continue_label));
                instructions.push(Instruction::Label(break_label));
            }
            ast::Stmt::DoWhile { body, cond, label } => {
                let Some(label) = label else {
                    unreachable!("do-while without a loop label after resolution");
                };
                let start_label = format!("__start__{}", label);
                let continue_label = format!("__continue__{}", label);
                let break_label = format!("__break__{}", label);

                instructions.push(Instruction::Label(start_label.clone()));
                self.emit_stmt(body, instructions);
                instructions.push(Instruction::Label(continue_label));
                let cond = self.emit_expr(cond, instructions);
                instructions.push(Instruction::JumpIfNotZero {
                    cond,
                    target: start_label,
                });
                instructions.push(Instruction::Label(break_label));
            }
            ast::Stmt::For {
                init,
                cond,
                post,
                body,
                label,
            } => {
                let Some(label) = label else {
                    unreachable!("for without a loop label after resolution");
                };
                let start_label = format!("__start__{}", label);
                let continue_label = format!("__continue__{}", label);
                let break_label = format!("__break__{}", label);

                match init {
                    ast::ForInit::Declaration(decl) => self.emit_var_decl(decl, instructions),
                    ast::ForInit::Expression(expr) => {
                        self.emit_expr(expr, instructions);
                    }
                    ast::ForInit::None => {}
                }
                instructions.push(Instruction::Label(start_label.clone()));
                if let Some(cond) = cond {
                    let cond = self.emit_expr(cond, instructions);
                    instructions.push(Instruction::JumpIfZero {
                        cond,
                        target: break_label.clone(),
                    });
                }
                self.emit_stmt(body, instructions);
                instructions.push(Instruction::Label(continue_label));
                if let Some(post) = post {
                    self.emit_expr(post, instructions);
                }
                instructions.push(Instruction::Jump(start_label));
                instructions.push(Instruction::Label(break_label));
            }
            ast::Stmt::Null => {}
        }
    }

    fn emit_expr(&mut self, expr: &ast::Expr, instructions: &mut Vec<Instruction>) -> Value {
        match expr {
            ast::Expr::Constant(value) => Value::Constant(*value),
            ast::Expr::Variable(name) => Value::Variable(name.clone()),
            ast::Expr::Unary { op, expr } => {
                let src = self.emit_expr(expr, instructions);
                let dst = Value::Variable(self.names.temp());
                instructions.push(Instruction::Unary {
                    op: unary_op(*op),
                    src,
                    dst: dst.clone(),
                });
                dst
            }
            ast::Expr::Binary { op, left, right } if op.is_assignment() => {
                let lhs = self.emit_expr(left, instructions);
                let rhs = self.emit_expr(right, instructions);
                match op.compound_base() {
                    None => {
                        instructions.push(Instruction::Copy {
                            src: rhs,
                            dst: lhs.clone(),
                        });
                    }
                    Some(base) => {
                        let tmp = Value::Variable(self.names.temp());
                        instructions.push(Instruction::Binary {
                            op: binary_op(base),
                            left: lhs.clone(),
                            right: rhs,
                            dst: tmp.clone(),
                        });
                        instructions.push(Instruction::Copy {
                            src: tmp,
                            dst: lhs.clone(),
                        });
                    }
                }
                lhs
            }
            ast::Expr::Binary {
                op: ast::BinaryOp::And,
                left,
                right,
            } => {
                let dst = Value::Variable(self.names.temp());
                let false_label = self.names.label("and.false");
                let end_label = self.names.label("and.end");

                let left = self.emit_expr(left, instructions);
                instructions.push(Instruction::JumpIfZero {
                    cond: left,
                    target: false_label.clone(),
                });
                let right = self.emit_expr(right, instructions);
                instructions.push(Instruction::JumpIfZero {
                    cond: right,
                    target: false_label.clone(),
                });
                instructions.push(Instruction::Copy {
                    src: Value::Constant(1),
                    dst: dst.clone(),
                });
                instructions.push(Instruction::Jump(end_label.clone()));
                instructions.push(Instruction::Label(false_label));
                instructions.push(Instruction::Copy {
                    src: Value::Constant(0),
                    dst: dst.clone(),
                });
                instructions.push(Instruction::Label(end_label));
                dst
            }
            ast::Expr::Binary {
                op: ast::BinaryOp::Or,
                left,
                right,
            } => {
                let dst = Value::Variable(self.names.temp());
                let true_label = self.names.label("or.true");
                let end_label = self.names.label("or.end");

                let left = self.emit_expr(left, instructions);
                instructions.push(Instruction::JumpIfNotZero {
                    cond: left,
                    target: true_label.clone(),
                });
                let right = self.emit_expr(right, instructions);
                instructions.push(Instruction::JumpIfNotZero {
                    cond: right,
                    target: true_label.clone(),
                });
                instructions.push(Instruction::Copy {
                    src: Value::Constant(0),
                    dst: dst.clone(),
                });
                instructions.push(Instruction::Jump(end_label.clone()));
                instructions.push(Instruction::Label(true_label));
                instructions.push(Instruction::Copy {
                    src: Value::Constant(1),
                    dst: dst.clone(),
                });
                instructions.push(Instruction::Label(end_label));
                dst
            }
            ast::Expr::Binary { op, left, right } => {
                let left = self.emit_expr(left, instructions);
                let right = self.emit_expr(right, instructions);
                let dst = Value::Variable(self.names.temp());
                instructions.push(Instruction::Binary {
                    op: binary_op(*op),
                    left,
                    right,
                    dst: dst.clone(),
                });
                dst
            }
            ast::Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let end_label = self.names.label("end");
                let else_label = self.names.label("else");
                let dst = Value::Variable(self.names.temp());

                let cond = self.emit_expr(cond, instructions);
                instructions.push(Instruction::JumpIfZero {
                    cond,
                    target: else_label.clone(),
                });
                let then_value = self.emit_expr(then, instructions);
                instructions.push(Instruction::Copy {
                    src: then_value,
                    dst: dst.clone(),
                });
                instructions.push(Instruction::Jump(end_label.clone()));
                instructions.push(Instruction::Label(else_label));
                let else_value = self.emit_expr(otherwise, instructions);
                instructions.push(Instruction::Copy {
                    src: else_value,
                    dst: dst.clone(),
                });
                instructions.push(Instruction::Label(end_label));
                dst
            }
            ast::Expr::FuncCall { name, args } => {
                let args: Vec<Value> = args
                    .iter()
                    .map(|arg| self.emit_expr(arg, instructions))
                    .collect();
                let dst = Value::Variable(self.names.temp());
                instructions.push(Instruction::FuncCall {
                    name: name.clone(),
                    args,
                    dst: dst.clone(),
                });
                dst
            }
        }
    }
}
