//! Minimal JavaScript IR for generated component code, and its printer.
//!
//! The emitter never concatenates code strings itself: it builds [`Stmt`] trees and the
//! [`Printer`] takes care of indentation, quoting and statement termination. User code
//! (method bodies, rewritten binding expressions, constructor text) travels as
//! [`Expr::Raw`] / [`Body::Raw`] and is printed verbatim.

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Raw(String),
    Ident(String),
    /// Single-quoted string literal.
    Str(String),
    Member(Box<Expr>, String),
    /// `object._get('name')`
    Get(Box<Expr>, String),
    Index(Box<Expr>, usize),
    Call(Box<Expr>, Vec<Expr>),
    New(Box<Expr>, Vec<Expr>),
    Function { params: Vec<String>, body: Body },
    /// `(function).bind(target)`
    Bind(Box<Expr>, Box<Expr>),
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Raw(String),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(String, Option<Expr>),
    Expr(Expr),
    Assign(Expr, Expr),
    Return(Expr),
    Comment(String),
    DocComment(Vec<String>),
    /// Verbatim user code, e.g. a constructor override.
    Raw(String),
    Blank,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTRUCTORS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn raw(code: impl Into<String>) -> Expr {
    Expr::Raw(code.into())
}

pub fn ident(name: impl Into<String>) -> Expr {
    Expr::Ident(name.into())
}

pub fn string(value: impl Into<String>) -> Expr {
    Expr::Str(value.into())
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call(Box::new(callee), args)
}

pub fn new_object(constructor: Expr, args: Vec<Expr>) -> Expr {
    Expr::New(Box::new(constructor), args)
}

pub fn function(params: &[&str], body: Vec<Stmt>) -> Expr {
    Expr::Function {
        params: params.iter().map(|p| p.to_string()).collect(),
        body: Body::Block(body),
    }
}

pub fn raw_function(params: &[String], code: impl Into<String>) -> Expr {
    Expr::Function {
        params: params.to_vec(),
        body: Body::Raw(code.into()),
    }
}

/// `(function() { ... }).bind(target)`
pub fn bound(function: Expr, target: &str) -> Expr {
    Expr::Bind(Box::new(function), Box::new(ident(target)))
}

impl Expr {
    pub fn member(self, name: &str) -> Expr {
        Expr::Member(Box::new(self), name.to_string())
    }

    pub fn get(self, name: &str) -> Expr {
        Expr::Get(Box::new(self), name.to_string())
    }

    pub fn index(self, index: usize) -> Expr {
        Expr::Index(Box::new(self), index)
    }

    pub fn call(self, method: &str, args: Vec<Expr>) -> Expr {
        call(self.member(method), args)
    }

    pub fn paren(self) -> Expr {
        Expr::Paren(Box::new(self))
    }

    pub fn stmt(self) -> Stmt {
        Stmt::Expr(self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRINTER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Printer {
    indent: String,
    level: usize,
    out: String,
}

impl Printer {
    pub fn new(indent: &str) -> Self {
        Self {
            indent: indent.to_string(),
            level: 0,
            out: String::new(),
        }
    }

    pub fn print(mut self, stmts: &[Stmt]) -> String {
        self.stmts(stmts);
        self.out
    }

    fn write_indent(&mut self) {
        for _ in 0..self.level {
            self.out.push_str(&self.indent);
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Blank => {
                self.out.push('\n');
                return;
            }
            Stmt::DocComment(lines) => {
                self.write_indent();
                self.out.push_str("/**\n");
                for line in lines {
                    self.write_indent();
                    self.out.push_str(" * ");
                    self.out.push_str(line);
                    self.out.push('\n');
                }
                self.write_indent();
                self.out.push_str(" */\n");
                return;
            }
            _ => {}
        }

        self.write_indent();
        match stmt {
            Stmt::Var(name, init) => {
                self.out.push_str("var ");
                self.out.push_str(name);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.expr(init);
                }
                self.out.push(';');
            }
            Stmt::Expr(expr) => {
                self.expr(expr);
                self.out.push(';');
            }
            Stmt::Assign(target, value) => {
                self.expr(target);
                self.out.push_str(" = ");
                self.expr(value);
                self.out.push(';');
            }
            Stmt::Return(expr) => {
                self.out.push_str("return ");
                self.expr(expr);
                self.out.push(';');
            }
            Stmt::Comment(text) => {
                self.out.push_str("// ");
                self.out.push_str(text);
            }
            Stmt::Raw(code) => self.out.push_str(code.trim()),
            Stmt::Blank | Stmt::DocComment(_) => unreachable!(),
        }
        self.out.push('\n');
    }

    fn args(&mut self, args: &[Expr]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(arg);
        }
        self.out.push(')');
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Raw(code) | Expr::Ident(code) => self.out.push_str(code),
            Expr::Str(value) => {
                self.out.push('\'');
                self.out.push_str(&escape_string(value));
                self.out.push('\'');
            }
            Expr::Member(object, name) => {
                self.expr(object);
                self.out.push('.');
                self.out.push_str(name);
            }
            Expr::Get(object, name) => {
                self.expr(object);
                self.out.push_str("._get('");
                self.out.push_str(&escape_string(name));
                self.out.push_str("')");
            }
            Expr::Index(object, index) => {
                self.expr(object);
                self.out.push_str(&format!("[{}]", index));
            }
            Expr::Call(callee, args) => {
                self.expr(callee);
                self.args(args);
            }
            Expr::New(constructor, args) => {
                self.out.push_str("new ");
                self.expr(constructor);
                self.args(args);
            }
            Expr::Function { params, body } => {
                self.out.push_str("function(");
                self.out.push_str(&params.join(", "));
                self.out.push_str(") ");
                match body {
                    Body::Raw(code) => self.out.push_str(code.trim()),
                    Body::Block(stmts) => {
                        self.out.push_str("{\n");
                        self.level += 1;
                        self.stmts(stmts);
                        self.level -= 1;
                        self.write_indent();
                        self.out.push('}');
                    }
                }
            }
            Expr::Bind(function, target) => {
                self.out.push('(');
                self.expr(function);
                self.out.push_str(").bind(");
                self.expr(target);
                self.out.push(')');
            }
            Expr::Paren(inner) => {
                self.out.push('(');
                self.expr(inner);
                self.out.push(')');
            }
        }
    }
}

fn escape_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
}
