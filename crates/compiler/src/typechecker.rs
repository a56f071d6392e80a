//! Type checking and symbol-table construction.
//!
//! Walks the resolved AST once, recording every identifier in the symbol
//! table and enforcing C's linkage and storage-duration rules: function
//! declarations must agree, file-scope variables follow the
//! tentative-definition model, and `static`/`extern` interact with linkage
//! the way the standard says they do. The finished table is shared read-only
//! with TAC lowering and code generation, which need to know whether a name
//! lives in static data or on the stack.

use crate::ast::{
    Block, BlockItem, Declaration, Expr, ForInit, FuncDecl, Program, Stmt, StorageClass, VarDecl,
};
use std::collections::HashMap;

/// How a static variable gets its initial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialValue {
    /// Declared without initializer or `extern`; becomes zero if nothing
    /// better shows up.
    Tentative,
    Initial(i32),
    /// `extern` declaration referencing a definition elsewhere.
    NoInitializer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierAttrs {
    Func { defined: bool, global: bool },
    Static { init: InitialValue, global: bool },
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Func { params: Vec<Type>, defined: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub ty: Type,
    pub attrs: IdentifierAttrs,
}

impl Symbol {
    pub fn is_static(&self) -> bool {
        matches!(self.attrs, IdentifierAttrs::Static { .. })
    }
}

/// Symbol table preserving insertion order, so downstream passes that
/// iterate it (static-data synthesis) produce deterministic output.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
    order: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn insert(&mut self, name: String, symbol: Symbol) {
        if !self.entries.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.entries.insert(name, symbol);
    }

    /// Iterate in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        self.order
            .iter()
            .map(|name| (name, &self.entries[name]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCheckError {
    IncompatibleFuncDeclarations(String),
    ArityMismatch { name: String, old: usize, new: usize },
    DuplicateDefinition(String),
    StaticAfterNonStatic(String),
    FunctionRedeclaredAsVariable(String),
    ConflictingLinkage(String),
    ConflictingDefinitions(String),
    ExternInitializer(String),
    NonConstantInitializer(String),
    FunctionAsVariable(String),
    VariableAsFunction(String),
    WrongArgumentCount { name: String, expected: usize, got: usize },
    StorageClassInForInit(String),
}

impl std::fmt::Display for TypeCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeCheckError::IncompatibleFuncDeclarations(name) => {
                write!(f, "incompatible function declarations for {}", name)
            }
            TypeCheckError::ArityMismatch { name, old, new } => write!(
                f,
                "function {} redeclared from {} to {} parameters",
                name, old, new
            ),
            TypeCheckError::DuplicateDefinition(name) => {
                write!(f, "function {} is defined more than once", name)
            }
            TypeCheckError::StaticAfterNonStatic(name) => {
                write!(f, "static function decl follows non-static for {}", name)
            }
            TypeCheckError::FunctionRedeclaredAsVariable(name) => {
                write!(f, "function {} redeclared as variable", name)
            }
            TypeCheckError::ConflictingLinkage(name) => {
                write!(f, "conflicting variable linkage for {}", name)
            }
            TypeCheckError::ConflictingDefinitions(name) => {
                write!(f, "conflicting file-scope variable definitions: {}", name)
            }
            TypeCheckError::ExternInitializer(name) => write!(
                f,
                "initializer on local extern variable declaration for {}",
                name
            ),
            TypeCheckError::NonConstantInitializer(name) => {
                write!(f, "non-constant initializer for static variable {}", name)
            }
            TypeCheckError::FunctionAsVariable(name) => {
                write!(f, "function name {} used as a variable", name)
            }
            TypeCheckError::VariableAsFunction(name) => {
                write!(f, "variable {} used as a function name", name)
            }
            TypeCheckError::WrongArgumentCount {
                name,
                expected,
                got,
            } => write!(
                f,
                "function {} called with wrong number of arguments: {} != {}",
                name, expected, got
            ),
            TypeCheckError::StorageClassInForInit(name) => write!(
                f,
                "cannot apply storage-class specifiers in for loop init for {}",
                name
            ),
        }
    }
}

impl std::error::Error for TypeCheckError {}

#[derive(Debug, Default)]
pub struct TypeChecker {
    symbols: SymbolTable,
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker::default()
    }

    /// Consume the checker, handing the finished table to the back end.
    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }

    pub fn check_program(&mut self, program: &Program) -> Result<(), TypeCheckError> {
        for decl in &program.declarations {
            match decl {
                Declaration::Func(func) => self.check_func_decl(func)?,
                Declaration::Var(var) => self.check_file_scope_var(var)?,
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn check_func_decl(&mut self, decl: &FuncDecl) -> Result<(), TypeCheckError> {
        let params: Vec<Type> = decl.params.iter().map(|_| Type::Int).collect();
        let has_body = decl.body.is_some();
        let mut already_defined = false;
        let mut global = decl.storage != Some(StorageClass::Static);

        if let Some(old) = self.symbols.get(&decl.name) {
            let Type::Func {
                params: old_params, ..
            } = &old.ty
            else {
                return Err(TypeCheckError::IncompatibleFuncDeclarations(
                    decl.name.clone(),
                ));
            };
            if old_params.len() != params.len() {
                return Err(TypeCheckError::ArityMismatch {
                    name: decl.name.clone(),
                    old: old_params.len(),
                    new: params.len(),
                });
            }

            let IdentifierAttrs::Func {
                defined,
                global: old_global,
            } = old.attrs
            else {
                unreachable!("function symbol {} carries non-function attrs", decl.name);
            };

            already_defined = defined;
            if already_defined && has_body {
                return Err(TypeCheckError::DuplicateDefinition(decl.name.clone()));
            }

            if old_global && decl.storage == Some(StorageClass::Static) {
                return Err(TypeCheckError::StaticAfterNonStatic(decl.name.clone()));
            }
            global = old_global;
        }

        let defined = already_defined || has_body;
        self.symbols.insert(
            decl.name.clone(),
            Symbol {
                ty: Type::Func { params, defined },
                attrs: IdentifierAttrs::Func { defined, global },
            },
        );

        if let Some(body) = &decl.body {
            for param in &decl.params {
                self.symbols.insert(
                    param.clone(),
                    Symbol {
                        ty: Type::Int,
                        attrs: IdentifierAttrs::Local,
                    },
                );
            }
            self.check_block(body)?;
        }
        Ok(())
    }

    fn check_file_scope_var(&mut self, decl: &VarDecl) -> Result<(), TypeCheckError> {
        let mut init = match &decl.init {
            None if decl.storage == Some(StorageClass::Extern) => InitialValue::NoInitializer,
            None => InitialValue::Tentative,
            Some(Expr::Constant(value)) => InitialValue::Initial(*value),
            Some(_) => {
                return Err(TypeCheckError::NonConstantInitializer(decl.name.clone()));
            }
        };

        let mut global = decl.storage != Some(StorageClass::Static);

        if let Some(old) = self.symbols.get(&decl.name) {
            if !matches!(old.ty, Type::Int) {
                return Err(TypeCheckError::FunctionRedeclaredAsVariable(
                    decl.name.clone(),
                ));
            }
            let IdentifierAttrs::Static {
                init: old_init,
                global: old_global,
            } = old.attrs
            else {
                unreachable!("file-scope variable {} carries non-static attrs", decl.name);
            };

            // `extern` inherits the established linkage before the conflict
            // check.
            if decl.storage == Some(StorageClass::Extern) {
                global = old_global;
            } else if old_global != global {
                return Err(TypeCheckError::ConflictingLinkage(decl.name.clone()));
            }

            if let InitialValue::Initial(_) = old_init {
                if matches!(init, InitialValue::Initial(_)) {
                    return Err(TypeCheckError::ConflictingDefinitions(decl.name.clone()));
                }
                init = old_init;
            } else if !matches!(init, InitialValue::Initial(_))
                && old_init == InitialValue::Tentative
            {
                init = InitialValue::Tentative;
            }
        }

        self.symbols.insert(
            decl.name.clone(),
            Symbol {
                ty: Type::Int,
                attrs: IdentifierAttrs::Static { init, global },
            },
        );
        Ok(())
    }

    fn check_block_scope_var(&mut self, decl: &VarDecl) -> Result<(), TypeCheckError> {
        match decl.storage {
            Some(StorageClass::Extern) => {
                if decl.init.is_some() {
                    return Err(TypeCheckError::ExternInitializer(decl.name.clone()));
                }
                if let Some(old) = self.symbols.get(&decl.name) {
                    if !matches!(old.ty, Type::Int) {
                        return Err(TypeCheckError::FunctionRedeclaredAsVariable(
                            decl.name.clone(),
                        ));
                    }
                } else {
                    self.symbols.insert(
                        decl.name.clone(),
                        Symbol {
                            ty: Type::Int,
                            attrs: IdentifierAttrs::Static {
                                init: InitialValue::NoInitializer,
                                global: true,
                            },
                        },
                    );
                }
                Ok(())
            }
            Some(StorageClass::Static) => {
                let init = match &decl.init {
                    Some(Expr::Constant(value)) => InitialValue::Initial(*value),
                    None => InitialValue::Initial(0),
                    Some(_) => {
                        return Err(TypeCheckError::NonConstantInitializer(decl.name.clone()));
                    }
                };
                self.symbols.insert(
                    decl.name.clone(),
                    Symbol {
                        ty: Type::Int,
                        attrs: IdentifierAttrs::Static {
                            init,
                            global: false,
                        },
                    },
                );
                Ok(())
            }
            None => {
                self.symbols.insert(
                    decl.name.clone(),
                    Symbol {
                        ty: Type::Int,
                        attrs: IdentifierAttrs::Local,
                    },
                );
                if let Some(init) = &decl.init {
                    self.check_expr(init)?;
                }
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements and expressions
    // ------------------------------------------------------------------

    fn check_block(&mut self, block: &Block) -> Result<(), TypeCheckError> {
        for item in &block.items {
            match item {
                BlockItem::Statement(stmt) => self.check_stmt(stmt)?,
                BlockItem::Declaration(Declaration::Var(var)) => {
                    self.check_block_scope_var(var)?
                }
                BlockItem::Declaration(Declaration::Func(func)) => self.check_func_decl(func)?,
            }
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), TypeCheckError> {
        match stmt {
            Stmt::Return(expr) | Stmt::Expression(expr) => self.check_expr(expr),
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.check_expr(cond)?;
                self.check_stmt(then)?;
                if let Some(otherwise) = otherwise {
                    self.check_stmt(otherwise)?;
                }
                Ok(())
            }
            Stmt::Compound(block) => self.check_block(block),
            Stmt::While { cond, body, .. } => {
                self.check_expr(cond)?;
                self.check_stmt(body)
            }
            Stmt::DoWhile { body, cond, .. } => {
                self.check_stmt(body)?;
                self.check_expr(cond)
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
                ..
            } => {
                match init {
                    ForInit::Declaration(decl) => {
                        self.check_block_scope_var(decl)?;
                        // Whatever storage class the declaration smuggled in,
                        // a for-init variable must be automatic.
                        let symbol = self
                            .symbols
                            .get(&decl.name)
                            .unwrap_or_else(|| {
                                unreachable!("for-init variable {} missing", decl.name)
                            });
                        if symbol.attrs != IdentifierAttrs::Local {
                            return Err(TypeCheckError::StorageClassInForInit(
                                decl.name.clone(),
                            ));
                        }
                    }
                    ForInit::Expression(expr) => self.check_expr(expr)?,
                    ForInit::None => {}
                }
                if let Some(cond) = cond {
                    self.check_expr(cond)?;
                }
                self.check_stmt(body)?;
                if let Some(post) = post {
                    self.check_expr(post)?;
                }
                Ok(())
            }
            Stmt::Label(_)
            | Stmt::Goto(_)
            | Stmt::Break { .. }
            | Stmt::Continue { .. }
            | Stmt::Null => Ok(()),
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<(), TypeCheckError> {
        match expr {
            Expr::Constant(_) => Ok(()),
            Expr::Variable(name) => {
                let Some(symbol) = self.symbols.get(name) else {
                    unreachable!("variable {} missing from symbol table", name);
                };
                if matches!(symbol.ty, Type::Func { .. }) {
                    return Err(TypeCheckError::FunctionAsVariable(name.clone()));
                }
                Ok(())
            }
            Expr::Unary { expr, .. } => self.check_expr(expr),
            Expr::Binary { left, right, .. } => {
                self.check_expr(left)?;
                self.check_expr(right)
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.check_expr(cond)?;
                self.check_expr(then)?;
                self.check_expr(otherwise)
            }
            Expr::FuncCall { name, args } => {
                let Some(symbol) = self.symbols.get(name) else {
                    unreachable!("function {} missing from symbol table", name);
                };
                match &symbol.ty {
                    Type::Int => Err(TypeCheckError::VariableAsFunction(name.clone())),
                    Type::Func { params, .. } => {
                        if params.len() != args.len() {
                            return Err(TypeCheckError::WrongArgumentCount {
                                name: name.clone(),
                                expected: params.len(),
                                got: args.len(),
                            });
                        }
                        for arg in args {
                            self.check_expr(arg)?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::names::NameContext;
    use crate::parser::Parser;
    use crate::resolver::Resolver;

    fn check(source: &str) -> Result<SymbolTable, TypeCheckError> {
        let tokens = Lexer::new(source).lex().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let mut names = NameContext::new();
        let program = Resolver::new(&mut names).resolve(program).unwrap();
        let mut checker = TypeChecker::new();
        checker.check_program(&program)?;
        Ok(checker.into_symbols())
    }

    #[test]
    fn test_arity_mismatch_across_declarations() {
        let err = check("int foo(int a); int foo(int a, int b);").unwrap_err();
        assert_eq!(
            err,
            TypeCheckError::ArityMismatch {
                name: "foo".into(),
                old: 1,
                new: 2
            }
        );
    }

    #[test]
    fn test_static_function_decl_follows_non_static() {
        let err = check("int f(void); static int f(void) { return 1; }").unwrap_err();
        assert_eq!(err, TypeCheckError::StaticAfterNonStatic("f".into()));
        assert_eq!(
            err.to_string(),
            "static function decl follows non-static for f"
        );
    }

    #[test]
    fn test_non_static_after_static_keeps_internal_linkage() {
        let table = check("static int f(void) { return 1; } int f(void);").unwrap();
        let symbol = table.get("f").unwrap();
        assert_eq!(
            symbol.attrs,
            IdentifierAttrs::Func {
                defined: true,
                global: false
            }
        );
    }

    #[test]
    fn test_duplicate_function_definition() {
        let err = check("int f(void) { return 1; } int f(void) { return 2; }").unwrap_err();
        assert_eq!(err, TypeCheckError::DuplicateDefinition("f".into()));
    }

    #[test]
    fn test_tentative_definition_becomes_zero() {
        let table = check("int n; int main(void) { return n; }").unwrap();
        assert_eq!(
            table.get("n").unwrap().attrs,
            IdentifierAttrs::Static {
                init: InitialValue::Tentative,
                global: true
            }
        );
    }

    #[test]
    fn test_initial_beats_tentative() {
        let table = check("int n; int n = 7;").unwrap();
        assert_eq!(
            table.get("n").unwrap().attrs,
            IdentifierAttrs::Static {
                init: InitialValue::Initial(7),
                global: true
            }
        );
        // And the other order.
        let table = check("int m = 7; int m;").unwrap();
        assert_eq!(
            table.get("m").unwrap().attrs,
            IdentifierAttrs::Static {
                init: InitialValue::Initial(7),
                global: true
            }
        );
    }

    #[test]
    fn test_conflicting_file_scope_initializers() {
        let err = check("int n = 1; int n = 2;").unwrap_err();
        assert_eq!(err, TypeCheckError::ConflictingDefinitions("n".into()));
    }

    #[test]
    fn test_conflicting_linkage() {
        let err = check("static int n; int n;").unwrap_err();
        assert_eq!(err, TypeCheckError::ConflictingLinkage("n".into()));
    }

    #[test]
    fn test_extern_inherits_prior_linkage() {
        let table = check("static int n; extern int n;").unwrap();
        assert_eq!(
            table.get("n").unwrap().attrs,
            IdentifierAttrs::Static {
                init: InitialValue::Tentative,
                global: false
            }
        );
    }

    #[test]
    fn test_non_constant_file_scope_initializer() {
        let err = check("int a = 1; int b = a + 1;").unwrap_err();
        assert!(matches!(err, TypeCheckError::NonConstantInitializer(_)));
    }

    #[test]
    fn test_local_extern_initializer_rejected() {
        let err = check("int main(void) { extern int a = 1; return a; }").unwrap_err();
        assert!(matches!(err, TypeCheckError::ExternInitializer(_)));
    }

    #[test]
    fn test_local_static_defaults_to_zero() {
        let table = check("int main(void) { static int counter; return counter; }").unwrap();
        let (name, symbol) = table
            .iter()
            .find(|(name, _)| name.starts_with(".var.counter."))
            .unwrap();
        assert!(name.starts_with(".var.counter."));
        assert_eq!(
            symbol.attrs,
            IdentifierAttrs::Static {
                init: InitialValue::Initial(0),
                global: false
            }
        );
    }

    #[test]
    fn test_function_used_as_variable() {
        let err = check("int f(void); int main(void) { return f + 1; }").unwrap_err();
        assert_eq!(err, TypeCheckError::FunctionAsVariable("f".into()));
    }

    #[test]
    fn test_variable_called_as_function() {
        let err = check("int main(void) { int a = 1; return a(); }").unwrap_err();
        assert!(matches!(err, TypeCheckError::VariableAsFunction(_)));
    }

    #[test]
    fn test_call_arity_checked() {
        let err = check("int f(int a, int b); int main(void) { return f(1); }").unwrap_err();
        assert_eq!(
            err,
            TypeCheckError::WrongArgumentCount {
                name: "f".into(),
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_function_redeclared_as_file_scope_variable() {
        let err = check("int f(void); int f;").unwrap_err();
        assert_eq!(err, TypeCheckError::FunctionRedeclaredAsVariable("f".into()));
    }

    #[test]
    fn test_variable_redeclared_as_function() {
        let err = check("int f; int f(void);").unwrap_err();
        assert_eq!(
            err,
            TypeCheckError::IncompatibleFuncDeclarations("f".into())
        );
    }

    #[test]
    fn test_storage_class_in_for_init() {
        let err = check(
            "int main(void) { for (int static i = 0; i < 3; i = i + 1) ; return 0; }",
        )
        .unwrap_err();
        assert!(matches!(err, TypeCheckError::StorageClassInForInit(_)));
    }

    #[test]
    fn test_symbol_table_preserves_insertion_order() {
        let table = check("int a = 1; int b = 2; int main(void) { return a + b; }").unwrap();
        let names: Vec<&String> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names[0], "a");
        assert_eq!(names[1], "b");
        assert_eq!(names[2], "main");
    }
}
