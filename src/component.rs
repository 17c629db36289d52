//! Component generator construction.
//!
//! A [`ComponentGenerator`] is the compiled form of one component literal or type. It is
//! built eagerly from the declaration tree: every node is classified into exactly one
//! bucket, nested components spawn their own generators immediately, and after
//! construction the generator is never mutated again.

use crate::ast::{self, Component, Node, Value};
use crate::validate::{CompilerError, ErrorKind, Result};
use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `onXyzzy` style event method names.
    static ref EVENT_METHOD_RE: Regex = Regex::new(r"^on(\p{Lu})(.*)$").unwrap();
}

const KEY_SUFFIX: &str = "Pressed";
const CHANGED_SUFFIX: &str = "Changed";
/// Plain method even when declared with handler syntax.
const EXEMPT_EVENT_NAME: &str = "onChanged";

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFIED DECLARATIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum AssignmentValue {
    Literal(String),
    Component(Box<ComponentGenerator>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Method,
    SignalHandler,
    ChangedHandler,
    KeyHandler,
}

impl HandlerKind {
    fn describe(self) -> &'static str {
        match self {
            HandlerKind::Method => "method",
            HandlerKind::SignalHandler => "signal handler",
            HandlerKind::ChangedHandler => "changed handler",
            HandlerKind::KeyHandler => "key handler",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Handler {
    pub kind: HandlerKind,
    /// Classified key: method name, signal name, property name or key name.
    pub name: String,
    pub args: Vec<String>,
    pub code: String,
}

/// Decide which bucket a method lands in and under which key.
///
/// `onClicked` → signal handler `clicked`, `onEnterPressed` → key handler `Enter`,
/// `onTextChanged` → changed handler `text`. Non-event methods and `onChanged` stay
/// plain methods.
pub fn classify_method(name: &str, event: bool) -> (HandlerKind, String) {
    if !event || name == EXEMPT_EVENT_NAME {
        return (HandlerKind::Method, name.to_string());
    }
    let caps = match EVENT_METHOD_RE.captures(name) {
        Some(caps) => caps,
        None => return (HandlerKind::Method, name.to_string()),
    };

    let stem = format!("{}{}", caps[1].to_lowercase(), &caps[2]);
    if let Some(key) = stem.strip_suffix(KEY_SUFFIX) {
        (HandlerKind::KeyHandler, capitalize(key))
    } else if let Some(property) = stem.strip_suffix(CHANGED_SUFFIX) {
        (HandlerKind::ChangedHandler, property.to_string())
    } else {
        (HandlerKind::SignalHandler, stem)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `controls.Button` → `controls`, `Button` → ``.
pub fn get_package(name: &str) -> String {
    match name.rfind('.') {
        Some(pos) => name[..pos].to_string(),
        None => String::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATOR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ComponentGenerator {
    pub name: String,
    pub package: String,
    /// Type name of the component literal, resolved against the registry to find the base type.
    pub component_name: String,
    pub prototype: bool,
    pub id: Option<String>,
    pub ctor: Option<String>,
    pub properties: IndexMap<String, ast::Property>,
    pub aliases: IndexMap<String, String>,
    pub enums: IndexMap<String, ast::EnumProperty>,
    pub assignments: IndexMap<String, AssignmentValue>,
    pub animations: IndexMap<String, ComponentGenerator>,
    pub children: Vec<ComponentGenerator>,
    pub handlers: IndexMap<(HandlerKind, String), Handler>,
    pub signals: IndexSet<String>,
    pub elements: Vec<serde_json::Value>,
}

impl ComponentGenerator {
    pub fn new(name: &str, component: &Component, prototype: bool) -> Result<Self> {
        let mut generator = ComponentGenerator {
            name: name.to_string(),
            package: get_package(name),
            component_name: component.name.clone(),
            prototype,
            id: None,
            ctor: None,
            properties: IndexMap::new(),
            aliases: IndexMap::new(),
            enums: IndexMap::new(),
            assignments: IndexMap::new(),
            animations: IndexMap::new(),
            children: Vec::new(),
            handlers: IndexMap::new(),
            signals: IndexSet::new(),
            elements: Vec::new(),
        };

        for child in &component.children {
            generator.add_child(child)?;
        }

        log::debug!(
            "built generator {} ({}): {} properties, {} assignments, {} children",
            generator.name,
            generator.component_name,
            generator.properties.len(),
            generator.assignments.len(),
            generator.children.len()
        );
        Ok(generator)
    }

    /// Generator for a reusable type registered as `type_id`.
    pub fn prototype(type_id: &str, component: &Component) -> Result<Self> {
        Self::new(type_id, component, true)
    }

    /// Generator for an inline instance living in `package`.
    pub fn instance(package: &str, component: &Component) -> Result<Self> {
        Self::new(&anonymous_name(package, "<anonymous>"), component, false)
    }

    pub(crate) fn error(&self, kind: ErrorKind, message: &str) -> CompilerError {
        CompilerError::new(kind, message, &self.name, &self.component_name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
            || self.aliases.contains_key(name)
            || self.enums.contains_key(name)
    }

    pub fn handlers_of(&self, kind: HandlerKind) -> impl Iterator<Item = &Handler> {
        self.handlers.values().filter(move |h| h.kind == kind)
    }

    pub fn handler(&self, kind: HandlerKind, name: &str) -> Option<&Handler> {
        self.handlers.get(&(kind, name.to_string()))
    }

    fn check_new_property(&self, name: &str) -> Result<()> {
        if self.has_property(name) {
            return Err(self
                .error(
                    ErrorKind::DuplicateDeclaration,
                    &format!("duplicate property {}", name),
                )
                .with_hint("properties, aliases and enums share one namespace"));
        }
        Ok(())
    }

    fn assign(&mut self, target: &str, value: &Value) -> Result<()> {
        let value = match value {
            Value::Literal(text) => AssignmentValue::Literal(text.replace("\\\n", "")),
            Value::Component(component) => AssignmentValue::Component(Box::new(
                ComponentGenerator::instance(&self.package, component)?,
            )),
        };
        self.assignments.insert(target.to_string(), value);
        Ok(())
    }

    fn add_handler(&mut self, method: &ast::Method) -> Result<()> {
        let (kind, name) = classify_method(&method.name, method.event);
        let key = (kind, name.clone());
        if self.handlers.contains_key(&key) {
            return Err(self.error(
                ErrorKind::DuplicateDeclaration,
                &format!("duplicate {} {}", kind.describe(), method.name),
            ));
        }
        self.handlers.insert(
            key,
            Handler {
                kind,
                name,
                args: method.args.clone(),
                code: method.code.clone(),
            },
        );
        Ok(())
    }

    fn add_child(&mut self, child: &Node) -> Result<()> {
        match child {
            Node::Property(prop) => {
                self.check_new_property(&prop.name)?;
                self.properties.insert(prop.name.clone(), prop.clone());
                if let Some(value) = &prop.value {
                    if !prop.is_trivial() {
                        self.assign(&prop.name, value)?;
                    }
                }
            }
            Node::AliasProperty(alias) => {
                self.check_new_property(&alias.name)?;
                self.aliases.insert(alias.name.clone(), alias.target.clone());
            }
            Node::EnumProperty(enumeration) => {
                self.check_new_property(&enumeration.name)?;
                self.enums
                    .insert(enumeration.name.clone(), enumeration.clone());
            }
            Node::Assignment(assignment) => {
                if assignment.target == "id" {
                    return Err(self
                        .error(ErrorKind::InvalidIdUsage, "assigning non-id for id")
                        .with_hint("use an identifier binding (`id: name`) instead"));
                }
                self.assign(&assignment.target, &assignment.value)?;
            }
            Node::IdAssignment { name } => {
                self.id = Some(name.clone());
                self.assign("id", &Value::Literal(name.clone()))?;
            }
            Node::Component(component) => {
                let child = ComponentGenerator::instance(&self.package, component)?;
                self.children.push(child);
            }
            Node::Behavior(behavior) => {
                for target in &behavior.target {
                    if self.animations.contains_key(target) {
                        return Err(self.error(
                            ErrorKind::DuplicateDeclaration,
                            &format!("duplicate animation on property {}", target),
                        ));
                    }
                    let animation = ComponentGenerator::new(
                        &anonymous_name(&self.package, "<anonymous-animation>"),
                        &behavior.animation,
                        false,
                    )?;
                    self.animations.insert(target.clone(), animation);
                }
            }
            Node::Method(method) => self.add_handler(method)?,
            Node::Constructor { code } => {
                if self.ctor.is_some() {
                    return Err(self.error(
                        ErrorKind::DuplicateDeclaration,
                        "duplicate constructor override",
                    ));
                }
                self.ctor = Some(code.clone());
            }
            Node::Signal { name } => {
                if !self.signals.insert(name.clone()) {
                    return Err(self.error(
                        ErrorKind::DuplicateDeclaration,
                        &format!("duplicate signal {}", name),
                    ));
                }
            }
            Node::ListElement { data } => self.elements.push(data.clone()),
            Node::AssignmentScope(scope) => {
                for assignment in &scope.values {
                    let target = format!("{}.{}", scope.target, assignment.target);
                    self.assign(&target, &assignment.value)?;
                }
            }
            Node::Unsupported => {
                return Err(self.error(
                    ErrorKind::UnhandledElement,
                    &format!("unhandled element: {}", child.kind_name()),
                ));
            }
        }
        Ok(())
    }
}

fn anonymous_name(package: &str, suffix: &str) -> String {
    if package.is_empty() {
        suffix.to_string()
    } else {
        format!("{}.{}", package, suffix)
    }
}
