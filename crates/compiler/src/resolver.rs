//! Semantic resolution.
//!
//! Three successive passes over the AST, each consuming one tree and
//! producing the next:
//!
//! 1. identifier resolution: scoped renaming with linkage tracking,
//! 2. goto-label resolution: per-function label mangling and definedness,
//! 3. loop labeling: attaches a unique label to every loop so `break` and
//!    `continue` know their jump targets.
//!
//! After pass 1 every variable name in the tree is globally unique, which is
//! what lets the later stages use flat maps keyed by name.

use crate::ast::{
    Block, BlockItem, Declaration, Expr, ForInit, FuncDecl, Program, Stmt, StorageClass, VarDecl,
};
use crate::names::NameContext;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    UndefinedVariable(String),
    UndeclaredFunction(String),
    InvalidLvalue(&'static str),
    InvalidIncrementTarget {
        op: &'static str,
        found: &'static str,
    },
    ConflictingDeclarations(String),
    DuplicateLabel(String),
    UndefinedLabel(String),
    BreakOutsideLoop,
    ContinueOutsideLoop,
    NestedFunctionDefinition(String),
    StaticFunctionInBlock(String),
    DuplicateFunctionDeclaration(String),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::UndefinedVariable(name) => write!(f, "undefined variable: {}", name),
            ResolveError::UndeclaredFunction(name) => write!(f, "undeclared function: {}", name),
            ResolveError::InvalidLvalue(found) => write!(f, "invalid lvalue: {}", found),
            ResolveError::InvalidIncrementTarget { op, found } => {
                write!(f, "operand of {} must be a variable, not {}", op, found)
            }
            ResolveError::ConflictingDeclarations(name) => {
                write!(f, "conflicting local definitions for {}", name)
            }
            ResolveError::DuplicateLabel(label) => write!(f, "label already used: {}", label),
            ResolveError::UndefinedLabel(label) => write!(f, "goto undefined label: {}", label),
            ResolveError::BreakOutsideLoop => write!(f, "break statement outside of loop"),
            ResolveError::ContinueOutsideLoop => write!(f, "continue statement outside of loop"),
            ResolveError::NestedFunctionDefinition(name) => {
                write!(f, "cannot define function {} inside function", name)
            }
            ResolveError::StaticFunctionInBlock(name) => {
                write!(f, "function {} in block scope cannot be static", name)
            }
            ResolveError::DuplicateFunctionDeclaration(name) => {
                write!(f, "duplicate function declaration for {}", name)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// One binding in the identifier map of pass 1.
#[derive(Debug, Clone)]
struct MapEntry {
    unique_name: String,
    from_current_scope: bool,
    has_linkage: bool,
}

type IdentifierMap = HashMap<String, MapEntry>;

/// Entering a scope copies the map with every inherited entry marked as not
/// from the current scope, so shadowing is allowed but same-scope
/// re-declaration is caught.
fn copy_scope(map: &IdentifierMap) -> IdentifierMap {
    map.iter()
        .map(|(name, entry)| {
            (
                name.clone(),
                MapEntry {
                    unique_name: entry.unique_name.clone(),
                    from_current_scope: false,
                    has_linkage: entry.has_linkage,
                },
            )
        })
        .collect()
}

fn mangle_label(function: &str, label: &str) -> String {
    format!(".label.{}.{}", function, label)
}

pub struct Resolver<'a> {
    names: &'a mut NameContext,
}

impl<'a> Resolver<'a> {
    pub fn new(names: &'a mut NameContext) -> Self {
        Resolver { names }
    }

    pub fn resolve(&mut self, program: Program) -> Result<Program, ResolveError> {
        let mut map = IdentifierMap::new();
        let mut declarations = Vec::new();
        for decl in program.declarations {
            let decl = self.resolve_declaration(decl, &mut map, false)?;
            let decl = resolve_goto_labels(decl)?;
            let decl = self.resolve_loop_labels(decl)?;
            declarations.push(decl);
        }
        Ok(Program { declarations })
    }

    // ------------------------------------------------------------------
    // Pass 1: identifier resolution
    // ------------------------------------------------------------------

    fn resolve_declaration(
        &mut self,
        decl: Declaration,
        map: &mut IdentifierMap,
        inside_func: bool,
    ) -> Result<Declaration, ResolveError> {
        match decl {
            Declaration::Var(var) if inside_func => {
                Ok(Declaration::Var(self.resolve_block_scope_var(var, map)?))
            }
            Declaration::Var(var) => {
                // File scope: the name maps to itself and has linkage; the
                // initializer is left alone (it must be a constant anyway).
                map.insert(
                    var.name.clone(),
                    MapEntry {
                        unique_name: var.name.clone(),
                        from_current_scope: true,
                        has_linkage: true,
                    },
                );
                Ok(Declaration::Var(var))
            }
            Declaration::Func(func) => Ok(Declaration::Func(
                self.resolve_func_decl(func, map, inside_func)?,
            )),
        }
    }

    fn resolve_block_scope_var(
        &mut self,
        decl: VarDecl,
        map: &mut IdentifierMap,
    ) -> Result<VarDecl, ResolveError> {
        if let Some(prev) = map.get(&decl.name) {
            let extern_redecl =
                prev.has_linkage && decl.storage == Some(StorageClass::Extern);
            if prev.from_current_scope && !extern_redecl {
                return Err(ResolveError::ConflictingDeclarations(decl.name));
            }
        }

        if decl.storage == Some(StorageClass::Extern) {
            map.insert(
                decl.name.clone(),
                MapEntry {
                    unique_name: decl.name.clone(),
                    from_current_scope: true,
                    has_linkage: true,
                },
            );
            return Ok(decl);
        }

        let unique_name = self.names.var(&decl.name);
        map.insert(
            decl.name,
            MapEntry {
                unique_name: unique_name.clone(),
                from_current_scope: true,
                has_linkage: false,
            },
        );
        // The new binding is visible to its own initializer.
        let init = match decl.init {
            Some(expr) => Some(self.resolve_expr(expr, map)?),
            None => None,
        };
        Ok(VarDecl {
            name: unique_name,
            init,
            storage: decl.storage,
        })
    }

    fn resolve_func_decl(
        &mut self,
        decl: FuncDecl,
        map: &mut IdentifierMap,
        inside_func: bool,
    ) -> Result<FuncDecl, ResolveError> {
        if inside_func && decl.body.is_some() {
            return Err(ResolveError::NestedFunctionDefinition(decl.name));
        }
        if inside_func && decl.storage == Some(StorageClass::Static) {
            return Err(ResolveError::StaticFunctionInBlock(decl.name));
        }

        if let Some(prev) = map.get(&decl.name) {
            if prev.from_current_scope && !prev.has_linkage {
                return Err(ResolveError::DuplicateFunctionDeclaration(decl.name));
            }
        }

        map.insert(
            decl.name.clone(),
            MapEntry {
                unique_name: decl.name.clone(),
                from_current_scope: true,
                has_linkage: true,
            },
        );

        let mut inner = copy_scope(map);

        // Parameters behave exactly like variable declarations in the
        // function's outermost scope.
        let mut params = Vec::new();
        for param in decl.params {
            let resolved = self.resolve_block_scope_var(
                VarDecl {
                    name: param,
                    init: None,
                    storage: None,
                },
                &mut inner,
            )?;
            params.push(resolved.name);
        }

        let body = match decl.body {
            Some(block) => Some(self.resolve_block(block, &mut inner)?),
            None => None,
        };

        Ok(FuncDecl {
            name: decl.name,
            params,
            body,
            storage: decl.storage,
        })
    }

    fn resolve_block(
        &mut self,
        block: Block,
        map: &mut IdentifierMap,
    ) -> Result<Block, ResolveError> {
        let mut items = Vec::new();
        for item in block.items {
            let item = match item {
                BlockItem::Statement(stmt) => {
                    BlockItem::Statement(self.resolve_stmt(stmt, map)?)
                }
                BlockItem::Declaration(decl) => {
                    BlockItem::Declaration(self.resolve_declaration(decl, map, true)?)
                }
            };
            items.push(item);
        }
        Ok(Block { items })
    }

    fn resolve_stmt(
        &mut self,
        stmt: Stmt,
        map: &mut IdentifierMap,
    ) -> Result<Stmt, ResolveError> {
        match stmt {
            Stmt::Return(expr) => Ok(Stmt::Return(self.resolve_expr(expr, map)?)),
            Stmt::Expression(expr) => Ok(Stmt::Expression(self.resolve_expr(expr, map)?)),
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.resolve_expr(cond, map)?;
                let then = Box::new(self.resolve_stmt(*then, map)?);
                let otherwise = match otherwise {
                    Some(stmt) => Some(Box::new(self.resolve_stmt(*stmt, map)?)),
                    None => None,
                };
                Ok(Stmt::If {
                    cond,
                    then,
                    otherwise,
                })
            }
            Stmt::Compound(block) => {
                let mut inner = copy_scope(map);
                Ok(Stmt::Compound(self.resolve_block(block, &mut inner)?))
            }
            Stmt::While { cond, body, label } => {
                let cond = self.resolve_expr(cond, map)?;
                let body = Box::new(self.resolve_stmt(*body, map)?);
                Ok(Stmt::While { cond, body, label })
            }
            Stmt::DoWhile { body, cond, label } => {
                let body = Box::new(self.resolve_stmt(*body, map)?);
                let cond = self.resolve_expr(cond, map)?;
                Ok(Stmt::DoWhile { body, cond, label })
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
                label,
            } => {
                // The for-init declaration lives in a scope that encloses
                // cond, post and body.
                let mut inner = copy_scope(map);
                let init = match init {
                    ForInit::Declaration(decl) => {
                        ForInit::Declaration(self.resolve_block_scope_var(decl, &mut inner)?)
                    }
                    ForInit::Expression(expr) => {
                        ForInit::Expression(self.resolve_expr(expr, &inner)?)
                    }
                    ForInit::None => ForInit::None,
                };
                let cond = match cond {
                    Some(expr) => Some(self.resolve_expr(expr, &inner)?),
                    None => None,
                };
                let post = match post {
                    Some(expr) => Some(self.resolve_expr(expr, &inner)?),
                    None => None,
                };
                let body = Box::new(self.resolve_stmt(*body, &mut inner)?);
                Ok(Stmt::For {
                    init,
                    cond,
                    post,
                    body,
                    label,
                })
            }
            other @ (Stmt::Label(_)
            | Stmt::Goto(_)
            | Stmt::Break { .. }
            | Stmt::Continue { .. }
            | Stmt::Null) => Ok(other),
        }
    }

    fn resolve_expr(&mut self, expr: Expr, map: &IdentifierMap) -> Result<Expr, ResolveError> {
        match expr {
            Expr::Constant(value) => Ok(Expr::Constant(value)),
            Expr::Variable(name) => match map.get(&name) {
                Some(entry) => Ok(Expr::Variable(entry.unique_name.clone())),
                None => Err(ResolveError::UndefinedVariable(name)),
            },
            Expr::Unary { op, expr } => {
                if op.is_increment() && !expr.is_lvalue() {
                    return Err(ResolveError::InvalidIncrementTarget {
                        op: op.name(),
                        found: expr.kind_name(),
                    });
                }
                let expr = Box::new(self.resolve_expr(*expr, map)?);
                Ok(Expr::Unary { op, expr })
            }
            Expr::Binary { op, left, right } => {
                if op.is_assignment() && !left.is_lvalue() {
                    return Err(ResolveError::InvalidLvalue(left.kind_name()));
                }
                let left = Box::new(self.resolve_expr(*left, map)?);
                let right = Box::new(self.resolve_expr(*right, map)?);
                Ok(Expr::Binary { op, left, right })
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => Ok(Expr::Conditional {
                cond: Box::new(self.resolve_expr(*cond, map)?),
                then: Box::new(self.resolve_expr(*then, map)?),
                otherwise: Box::new(self.resolve_expr(*otherwise, map)?),
            }),
            Expr::FuncCall { name, args } => {
                let Some(entry) = map.get(&name) else {
                    return Err(ResolveError::UndeclaredFunction(name));
                };
                let unique_name = entry.unique_name.clone();
                let mut resolved = Vec::new();
                for arg in args {
                    resolved.push(self.resolve_expr(arg, map)?);
                }
                Ok(Expr::FuncCall {
                    name: unique_name,
                    args: resolved,
                })
            }
        }
    }

    // ------------------------------------------------------------------
    // Pass 3: loop labeling
    // ------------------------------------------------------------------

    fn resolve_loop_labels(&mut self, decl: Declaration) -> Result<Declaration, ResolveError> {
        match decl {
            Declaration::Func(func) => {
                let body = match func.body {
                    Some(block) => {
                        Some(self.loop_labels_block(block, None, &func.name)?)
                    }
                    None => None,
                };
                Ok(Declaration::Func(FuncDecl { body, ..func }))
            }
            other => Ok(other),
        }
    }

    fn loop_labels_block(
        &mut self,
        block: Block,
        current: Option<&str>,
        function: &str,
    ) -> Result<Block, ResolveError> {
        let mut items = Vec::new();
        for item in block.items {
            let item = match item {
                BlockItem::Statement(stmt) => {
                    BlockItem::Statement(self.loop_labels_stmt(stmt, current, function)?)
                }
                declaration => declaration,
            };
            items.push(item);
        }
        Ok(Block { items })
    }

    fn loop_labels_stmt(
        &mut self,
        stmt: Stmt,
        current: Option<&str>,
        function: &str,
    ) -> Result<Stmt, ResolveError> {
        match stmt {
            Stmt::Break { .. } => match current {
                Some(label) => Ok(Stmt::Break {
                    label: Some(label.to_string()),
                }),
                None => Err(ResolveError::BreakOutsideLoop),
            },
            Stmt::Continue { .. } => match current {
                Some(label) => Ok(Stmt::Continue {
                    label: Some(label.to_string()),
                }),
                None => Err(ResolveError::ContinueOutsideLoop),
            },
            Stmt::While { cond, body, .. } => {
                let label = self.names.label(&format!("while.{}", function));
                let body = Box::new(self.loop_labels_stmt(*body, Some(label.as_str()), function)?);
                Ok(Stmt::While {
                    cond,
                    body,
                    label: Some(label),
                })
            }
            Stmt::DoWhile { body, cond, .. } => {
                let label = self.names.label(&format!("dowhile.{}", function));
                let body = Box::new(self.loop_labels_stmt(*body, Some(label.as_str()), function)?);
                Ok(Stmt::DoWhile {
                    body,
                    cond,
                    label: Some(label),
                })
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
                ..
            } => {
                let label = self.names.label(&format!("for.{}", function));
                let body = Box::new(self.loop_labels_stmt(*body, Some(label.as_str()), function)?);
                Ok(Stmt::For {
                    init,
                    cond,
                    post,
                    body,
                    label: Some(label),
                })
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let then = Box::new(self.loop_labels_stmt(*then, current, function)?);
                let otherwise = match otherwise {
                    Some(stmt) => {
                        Some(Box::new(self.loop_labels_stmt(*stmt, current, function)?))
                    }
                    None => None,
                };
                Ok(Stmt::If {
                    cond,
                    then,
                    otherwise,
                })
            }
            Stmt::Compound(block) => Ok(Stmt::Compound(self.loop_labels_block(
                block, current, function,
            )?)),
            other => Ok(other),
        }
    }
}

// ----------------------------------------------------------------------
// Pass 2: goto labels (no name generation involved)
// ----------------------------------------------------------------------

fn resolve_goto_labels(decl: Declaration) -> Result<Declaration, ResolveError> {
    let Declaration::Func(func) = decl else {
        return Ok(decl);
    };

    let mut labels: HashMap<String, bool> = HashMap::new();
    let body = match func.body {
        Some(block) => Some(goto_labels_block(block, &mut labels, &func.name)?),
        None => None,
    };

    for (label, defined) in &labels {
        if !defined {
            return Err(ResolveError::UndefinedLabel(label.clone()));
        }
    }

    Ok(Declaration::Func(FuncDecl { body, ..func }))
}

fn goto_labels_block(
    block: Block,
    labels: &mut HashMap<String, bool>,
    function: &str,
) -> Result<Block, ResolveError> {
    let mut items = Vec::new();
    for item in block.items {
        let item = match item {
            BlockItem::Statement(stmt) => {
                BlockItem::Statement(goto_labels_stmt(stmt, labels, function)?)
            }
            declaration => declaration,
        };
        items.push(item);
    }
    Ok(Block { items })
}

fn goto_labels_stmt(
    stmt: Stmt,
    labels: &mut HashMap<String, bool>,
    function: &str,
) -> Result<Stmt, ResolveError> {
    match stmt {
        Stmt::Label(name) => {
            let mangled = mangle_label(function, &name);
            if labels.get(&mangled).copied().unwrap_or(false) {
                return Err(ResolveError::DuplicateLabel(mangled));
            }
            labels.insert(mangled.clone(), true);
            Ok(Stmt::Label(mangled))
        }
        Stmt::Goto(target) => {
            let mangled = mangle_label(function, &target);
            labels.entry(mangled.clone()).or_insert(false);
            Ok(Stmt::Goto(mangled))
        }
        Stmt::If {
            cond,
            then,
            otherwise,
        } => {
            let then = Box::new(goto_labels_stmt(*then, labels, function)?);
            let otherwise = match otherwise {
                Some(stmt) => Some(Box::new(goto_labels_stmt(*stmt, labels, function)?)),
                None => None,
            };
            Ok(Stmt::If {
                cond,
                then,
                otherwise,
            })
        }
        Stmt::Compound(block) => Ok(Stmt::Compound(goto_labels_block(block, labels, function)?)),
        Stmt::While { cond, body, label } => Ok(Stmt::While {
            cond,
            body: Box::new(goto_labels_stmt(*body, labels, function)?),
            label,
        }),
        Stmt::DoWhile { body, cond, label } => Ok(Stmt::DoWhile {
            body: Box::new(goto_labels_stmt(*body, labels, function)?),
            cond,
            label,
        }),
        Stmt::For {
            init,
            cond,
            post,
            body,
            label,
        } => Ok(Stmt::For {
            init,
            cond,
            post,
            body: Box::new(goto_labels_stmt(*body, labels, function)?),
            label,
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn resolve(source: &str) -> Result<Program, ResolveError> {
        let tokens = Lexer::new(source).lex().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let mut names = NameContext::new();
        Resolver::new(&mut names).resolve(program)
    }

    fn main_body(program: &Program) -> &Block {
        let Declaration::Func(func) = &program.declarations[0] else {
            panic!("expected function");
        };
        func.body.as_ref().unwrap()
    }

    #[test]
    fn test_undefined_variable() {
        let err = resolve("int main(void) { a = a + 1; return a; }").unwrap_err();
        assert_eq!(err, ResolveError::UndefinedVariable("a".into()));
        assert_eq!(err.to_string(), "undefined variable: a");
    }

    #[test]
    fn test_invalid_lvalue() {
        let err = resolve("int main(void) { 2 = 3; return 0; }").unwrap_err();
        assert_eq!(err, ResolveError::InvalidLvalue("Constant"));
        assert_eq!(err.to_string(), "invalid lvalue: Constant");
    }

    #[test]
    fn test_increment_target_must_be_variable() {
        let err = resolve("int main(void) { return ++3; }").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::InvalidIncrementTarget {
                found: "Constant",
                ..
            }
        ));
    }

    #[test]
    fn test_variables_get_unique_mangled_names() {
        let program = resolve("int main(void) { int a = 1; { int a = 2; } return a; }").unwrap();
        let body = main_body(&program);
        let BlockItem::Declaration(Declaration::Var(outer)) = &body.items[0] else {
            panic!("expected declaration");
        };
        let BlockItem::Statement(Stmt::Compound(inner_block)) = &body.items[1] else {
            panic!("expected compound");
        };
        let BlockItem::Declaration(Declaration::Var(inner)) = &inner_block.items[0] else {
            panic!("expected declaration");
        };
        assert!(outer.name.starts_with(".var.a."));
        assert!(inner.name.starts_with(".var.a."));
        assert_ne!(outer.name, inner.name);
        // The trailing return sees the outer binding.
        let BlockItem::Statement(Stmt::Return(Expr::Variable(returned))) = &body.items[2] else {
            panic!("expected return of a variable");
        };
        assert_eq!(returned, &outer.name);
    }

    #[test]
    fn test_initializer_sees_its_own_binding() {
        let program = resolve("int main(void) { int a = a; return a; }").unwrap();
        let body = main_body(&program);
        let BlockItem::Declaration(Declaration::Var(decl)) = &body.items[0] else {
            panic!("expected declaration");
        };
        assert_eq!(decl.init, Some(Expr::Variable(decl.name.clone())));
    }

    #[test]
    fn test_same_scope_redeclaration_conflicts() {
        let err = resolve("int main(void) { int a = 1; int a = 2; return a; }").unwrap_err();
        assert_eq!(err, ResolveError::ConflictingDeclarations("a".into()));
    }

    #[test]
    fn test_extern_redeclaration_is_allowed() {
        assert!(resolve("int main(void) { extern int a; extern int a; return a; }").is_ok());
    }

    #[test]
    fn test_break_outside_loop() {
        let err = resolve("int main(void) { break; return 0; }").unwrap_err();
        assert_eq!(err.to_string(), "break statement outside of loop");
    }

    #[test]
    fn test_continue_outside_loop() {
        let err = resolve("int main(void) { continue; return 0; }").unwrap_err();
        assert_eq!(err.to_string(), "continue statement outside of loop");
    }

    #[test]
    fn test_loop_labels_attach_to_innermost() {
        let program = resolve(
            "int main(void) { while (1) { for (;;) break; continue; } return 0; }",
        )
        .unwrap();
        let body = main_body(&program);
        let BlockItem::Statement(Stmt::While { body: while_body, label, .. }) = &body.items[0]
        else {
            panic!("expected while");
        };
        let while_label = label.clone().unwrap();
        assert!(while_label.contains("while.main"));
        let Stmt::Compound(block) = while_body.as_ref() else {
            panic!("expected compound body");
        };
        let BlockItem::Statement(Stmt::For { body: for_body, label, .. }) = &block.items[0]
        else {
            panic!("expected for");
        };
        let for_label = label.clone().unwrap();
        assert!(for_label.contains("for.main"));
        assert!(matches!(
            for_body.as_ref(),
            Stmt::Break { label: Some(l) } if *l == for_label
        ));
        assert!(matches!(
            &block.items[1],
            BlockItem::Statement(Stmt::Continue { label: Some(l) }) if *l == while_label
        ));
    }

    #[test]
    fn test_goto_labels_are_mangled_per_function() {
        let program = resolve("int main(void) { top: x(); goto top; return 0; } int x(void);")
            .unwrap_err();
        // x() is undeclared at its use site
        assert_eq!(program, ResolveError::UndeclaredFunction("x".into()));

        let program =
            resolve("int x(void); int main(void) { top: x(); goto top; return 0; }").unwrap();
        let Declaration::Func(func) = &program.declarations[1] else {
            panic!("expected function");
        };
        let items = &func.body.as_ref().unwrap().items;
        assert!(matches!(
            &items[0],
            BlockItem::Statement(Stmt::Label(l)) if l == ".label.main.top"
        ));
        assert!(matches!(
            &items[2],
            BlockItem::Statement(Stmt::Goto(l)) if l == ".label.main.top"
        ));
    }

    #[test]
    fn test_duplicate_label() {
        let err = resolve("int main(void) { top: ; top: ; return 0; }").unwrap_err();
        assert_eq!(
            err,
            ResolveError::DuplicateLabel(".label.main.top".into())
        );
    }

    #[test]
    fn test_goto_undefined_label() {
        let err = resolve("int main(void) { goto nowhere; return 0; }").unwrap_err();
        assert_eq!(
            err,
            ResolveError::UndefinedLabel(".label.main.nowhere".into())
        );
        assert_eq!(
            err.to_string(),
            "goto undefined label: .label.main.nowhere"
        );
    }

    #[test]
    fn test_function_defined_inside_function() {
        let err =
            resolve("int main(void) { int f(void) { return 1; } return f(); }").unwrap_err();
        assert_eq!(err, ResolveError::NestedFunctionDefinition("f".into()));
    }

    #[test]
    fn test_static_function_in_block_scope() {
        let err = resolve("int main(void) { static int f(void); return 0; }").unwrap_err();
        assert_eq!(err, ResolveError::StaticFunctionInBlock("f".into()));
    }

    #[test]
    fn test_for_init_scope_does_not_leak() {
        let err =
            resolve("int main(void) { for (int i = 0; i < 3; i = i + 1) ; return i; }")
                .unwrap_err();
        assert_eq!(err, ResolveError::UndefinedVariable("i".into()));
    }

    #[test]
    fn test_parameters_are_renamed() {
        let program = resolve("int f(int x) { return x; }").unwrap();
        let Declaration::Func(func) = &program.declarations[0] else {
            panic!("expected function");
        };
        assert!(func.params[0].starts_with(".var.x."));
        let BlockItem::Statement(Stmt::Return(Expr::Variable(name))) =
            &func.body.as_ref().unwrap().items[0]
        else {
            panic!("expected return");
        };
        assert_eq!(name, &func.params[0]);
    }

    #[test]
    fn test_param_and_local_conflict() {
        let err = resolve("int f(int x) { int x = 2; return x; }").unwrap_err();
        assert_eq!(err, ResolveError::ConflictingDeclarations("x".into()));
    }
}
