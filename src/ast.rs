//! Declaration tree handed over by the front-end.
//!
//! Nodes arrive as JSON (internally tagged by `kind`) or are built directly in Rust.
//! The set of node kinds is closed: anything the front-end produces that this backend
//! does not know deserializes to [`Node::Unsupported`] and is rejected by the classifier.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref TRIVIAL_LITERAL_RE: Regex = Regex::new(
        r#"^\s*(?:-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|true|false|null|undefined|"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')\s*$"#
    )
    .unwrap();
}

/// A component literal: `Rectangle { ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Type name as written (`Rectangle`, `controls.Button`).
    pub name: String,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Component {
    pub fn new(name: &str, children: Vec<Node>) -> Self {
        Self {
            name: name.to_string(),
            children,
        }
    }
}

/// Right-hand side of an assignment or property initializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Literal(String),
    Component(Component),
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Literal(text.to_string())
    }
}

impl From<Component> for Value {
    fn from(component: Component) -> Self {
        Value::Component(component)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(rename = "type")]
    pub ty: String,
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl Property {
    /// A trivial property can be declared with its default inline and needs no
    /// assignment at setup time.
    pub fn is_trivial(&self) -> bool {
        match &self.value {
            None => true,
            Some(Value::Literal(text)) => TRIVIAL_LITERAL_RE.is_match(text),
            Some(Value::Component(_)) => false,
        }
    }

    /// Literal default, only meaningful when the property is trivial.
    pub fn default_literal(&self) -> Option<&str> {
        match &self.value {
            Some(Value::Literal(text)) => Some(text.trim()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasProperty {
    pub name: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumProperty {
    pub name: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub target: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    /// Every property path the animation is attached to.
    pub target: Vec<String>,
    pub animation: Component,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Function body including its braces.
    pub code: String,
    /// Declared with `on...:` handler syntax rather than `function`.
    #[serde(default)]
    pub event: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentScope {
    pub target: String,
    pub values: Vec<Assignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Node {
    Property(Property),
    AliasProperty(AliasProperty),
    EnumProperty(EnumProperty),
    Assignment(Assignment),
    IdAssignment { name: String },
    Component(Component),
    Behavior(Behavior),
    Method(Method),
    Constructor { code: String },
    Signal { name: String },
    ListElement { data: serde_json::Value },
    AssignmentScope(AssignmentScope),
    #[serde(other)]
    Unsupported,
}

impl Node {
    pub fn property(ty: &str, name: &str, value: Option<Value>) -> Self {
        Node::Property(Property {
            ty: ty.to_string(),
            name: name.to_string(),
            value,
        })
    }

    pub fn alias(name: &str, target: &str) -> Self {
        Node::AliasProperty(AliasProperty {
            name: name.to_string(),
            target: target.to_string(),
        })
    }

    pub fn enumeration(name: &str, values: &[&str], default: Option<&str>) -> Self {
        Node::EnumProperty(EnumProperty {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            default: default.map(str::to_string),
        })
    }

    pub fn assign(target: &str, value: impl Into<Value>) -> Self {
        Node::Assignment(Assignment {
            target: target.to_string(),
            value: value.into(),
        })
    }

    pub fn id(name: &str) -> Self {
        Node::IdAssignment {
            name: name.to_string(),
        }
    }

    pub fn method(name: &str, args: &[&str], code: &str, event: bool) -> Self {
        Node::Method(Method {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            code: code.to_string(),
            event,
        })
    }

    pub fn signal(name: &str) -> Self {
        Node::Signal {
            name: name.to_string(),
        }
    }

    pub fn behavior(targets: &[&str], animation: Component) -> Self {
        Node::Behavior(Behavior {
            target: targets.iter().map(|t| t.to_string()).collect(),
            animation,
        })
    }

    /// Short label used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Property(_) => "property",
            Node::AliasProperty(_) => "aliasProperty",
            Node::EnumProperty(_) => "enumProperty",
            Node::Assignment(_) => "assignment",
            Node::IdAssignment { .. } => "idAssignment",
            Node::Component(_) => "component",
            Node::Behavior(_) => "behavior",
            Node::Method(_) => "method",
            Node::Constructor { .. } => "constructor",
            Node::Signal { .. } => "signal",
            Node::ListElement { .. } => "listElement",
            Node::AssignmentScope(_) => "assignmentScope",
            Node::Unsupported => "unsupported",
        }
    }
}
