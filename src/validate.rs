use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// INVARIANT CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const INV_DUPLICATE_DECLARATION: &str = "Q-ERR-DECL-001";
pub const INV_UNHANDLED_ELEMENT: &str = "Q-ERR-AST-001";
pub const INV_UNKNOWN_PROPERTY: &str = "Q-ERR-SCOPE-001";
pub const INV_INVALID_ID_USAGE: &str = "Q-ERR-ID-001";
pub const INV_MALFORMED_BINDING_TARGET: &str = "Q-ERR-ID-002";
pub const INV_UNSUPPORTED_RUNTIME_ENUM: &str = "Q-ERR-ENUM-001";
pub const INV_UNKNOWN_COMPONENT: &str = "Q-ERR-TYPE-001";
pub const INV_INVALID_EXPRESSION: &str = "Q-ERR-SYNTAX-001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DuplicateDeclaration,
    UnhandledElement,
    UnknownProperty,
    InvalidIdUsage,
    UnsupportedRuntimeEnum,
    MalformedBindingTarget,
    UnknownComponent,
    InvalidExpression,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::DuplicateDeclaration => INV_DUPLICATE_DECLARATION,
            ErrorKind::UnhandledElement => INV_UNHANDLED_ELEMENT,
            ErrorKind::UnknownProperty => INV_UNKNOWN_PROPERTY,
            ErrorKind::InvalidIdUsage => INV_INVALID_ID_USAGE,
            ErrorKind::UnsupportedRuntimeEnum => INV_UNSUPPORTED_RUNTIME_ENUM,
            ErrorKind::MalformedBindingTarget => INV_MALFORMED_BINDING_TARGET,
            ErrorKind::UnknownComponent => INV_UNKNOWN_COMPONENT,
            ErrorKind::InvalidExpression => INV_INVALID_EXPRESSION,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::DuplicateDeclaration => {
            "Every property, alias, enum, signal, handler and animation name is declared once per component."
        }
        ErrorKind::UnhandledElement => "Every declaration node has a known meaning.",
        ErrorKind::UnknownProperty => {
            "Assignments and aliases only target properties declared on the component or its bases."
        }
        ErrorKind::InvalidIdUsage => "Identifiers are bound only with `id:` and never remotely.",
        ErrorKind::UnsupportedRuntimeEnum => "Enums are declared on types, never on instances.",
        ErrorKind::MalformedBindingTarget => "An identifier binding names a bare identifier.",
        ErrorKind::UnknownComponent => "Every component type resolves through the registry.",
        ErrorKind::InvalidExpression => "Binding expressions are valid JavaScript expressions.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub guarantee: String,
    /// Generator the error was raised in, e.g. `controls.<anonymous>`.
    pub component: String,
    /// Declared type of that generator, e.g. `Rectangle`.
    pub type_name: String,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(kind: ErrorKind, message: &str, component: &str, type_name: &str) -> Self {
        CompilerError {
            kind,
            code: kind.code().to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(kind).to_string(),
            component: component.to_string(),
            type_name: type_name.to_string(),
            context: None,
            hints: vec![],
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} in {} ({})",
            self.code, self.message, self.component, self.type_name
        )?;
        if let Some(context) = &self.context {
            write!(f, ": {}", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilerError {}

pub type Result<T> = std::result::Result<T, CompilerError>;
