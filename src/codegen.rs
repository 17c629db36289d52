//! Codegen module for the component compiler
//!
//! Emits runtime JavaScript from a built [`ComponentGenerator`] tree in two phases:
//!
//! - CREATE allocates every object of a subtree and links it to its structural parent,
//!   parents before children. Instances also declare their own properties and signals.
//! - SETUP wires behavior: aliases, bindings, handlers, list payloads and animations.
//!
//! A node's SETUP is only emitted after CREATE has been emitted for its whole subtree, so
//! bindings and handlers may freely refer to siblings and children.

use crate::ast::Component;
use crate::binding::{analyze_binding, replace_enums, Dependency};
use crate::component::{AssignmentValue, ComponentGenerator, HandlerKind};
use crate::js::{bound, call, function, ident, new_object, raw, raw_function, string, Expr, Printer, Stmt};
use crate::registry::{ComponentRegistry, Registry};
use crate::scope::ValidationContext;
use crate::validate::{CompilerError, ErrorKind, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref NON_IDENT_RE: Regex = Regex::new(r"[^A-Za-z0-9_$]").unwrap();
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

const DELEGATE_TARGET: &str = "delegate";
const COMPLETED_SIGNAL: &str = "completed";

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT/OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodegenOptions {
    /// Indentation unit of the emitted code.
    pub indent: String,
    /// Prefix each emitted component with a `// <type id>` line.
    pub banner: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            indent: "\t".to_string(),
            banner: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSource {
    pub type_id: String,
    pub component: Component,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedComponent {
    pub name: String,
    pub base_type: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub outputs: Vec<EmittedComponent>,
    pub errors: Vec<CompilerError>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PACKAGE ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Register every source as a prototype, then emit them all.
pub fn compile_components(sources: &[ComponentSource], options: &CodegenOptions) -> CompileOutput {
    let mut registry = ComponentRegistry::new();
    for source in sources {
        if let Err(error) = registry.register(&source.type_id, &source.component) {
            return CompileOutput {
                outputs: vec![],
                errors: vec![error],
            };
        }
    }

    match registry.generate_all(options) {
        Ok(outputs) => CompileOutput {
            outputs,
            errors: vec![],
        },
        Err(error) => CompileOutput {
            outputs: vec![],
            errors: vec![error],
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAMING HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Turn a property path or variable name into something usable inside an identifier.
pub fn escape(name: &str) -> String {
    NON_IDENT_RE.replace_all(name, "_").into_owned()
}

fn type_ref(type_id: &str) -> Expr {
    raw(format!("_globals.{}", type_id))
}

fn export_ref(name: &str) -> Expr {
    raw(format!("exports.{}", name))
}

/// `parent._get('a')._get('b').c` for target `a.b.c`.
fn target_lvalue(parent: Expr, target: &str) -> Expr {
    let (owner, property) = target_owner(parent, target);
    owner.member(property)
}

/// Object owning the last segment of `target`, and that segment.
fn target_owner<'t>(parent: Expr, target: &'t str) -> (Expr, &'t str) {
    match target.rsplit_once('.') {
        Some((path, property)) => (
            path.split('.').fold(parent, |object, segment| object.get(segment)),
            property,
        ),
        None => (parent, target),
    }
}

fn dependency_path(owner: Expr, dependency: &Dependency) -> Expr {
    dependency
        .path
        .iter()
        .fold(owner, |object, segment| object.get(segment))
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMISSION
// ═══════════════════════════════════════════════════════════════════════════════

impl ComponentGenerator {
    fn resolve_type(&self, ctx: &ValidationContext<'_>, generator: &ComponentGenerator) -> Result<String> {
        ctx.registry()
            .find_component(&generator.package, &generator.component_name)
            .ok_or_else(|| {
                self.error(
                    ErrorKind::UnknownComponent,
                    &format!("unknown component type {}", generator.component_name),
                )
            })
    }

    pub fn base_type(&self, ctx: &ValidationContext<'_>) -> Result<String> {
        self.resolve_type(ctx, self)
    }

    fn call_create(&self, ctx: &ValidationContext<'_>, target: &str) -> Result<Vec<Stmt>> {
        let mut code = vec![ident(target).call("__create", vec![]).stmt()];
        if !self.prototype {
            let (prologue, creators) = self.generate_creators(ctx, target)?;
            code.extend(prologue);
            code.extend(creators);
        }
        Ok(code)
    }

    fn call_setup(&self, ctx: &ValidationContext<'_>, target: &str) -> Result<Vec<Stmt>> {
        let mut code = vec![ident(target).call("__setup", vec![]).stmt()];
        if !self.prototype {
            code.extend(self.generate_setup_code(ctx, target)?);
        }
        Ok(code)
    }

    /// CREATE phase for the object held in variable `parent`.
    ///
    /// Returns the allocation prologue (every direct child and component-valued
    /// assignment) separately from the per-object creation code, so that all direct
    /// allocations precede any nested creation.
    pub fn generate_creators(
        &self,
        ctx: &ValidationContext<'_>,
        parent: &str,
    ) -> Result<(Vec<Stmt>, Vec<Stmt>)> {
        let mut prologue = Vec::new();
        let mut r = Vec::new();

        if !self.prototype {
            if let Some(name) = self.enums.keys().next() {
                return Err(self
                    .error(
                        ErrorKind::UnsupportedRuntimeEnum,
                        &format!("adding enums in runtime is unsupported ({})", name),
                    )
                    .with_hint("consider putting this property in a prototype"));
            }

            for name in &self.signals {
                if self.base_declares_signal(ctx, name) {
                    continue;
                }
                let signal = call(raw("_globals.core.createSignal"), vec![string(name.as_str())])
                    .call("bind", vec![ident(parent)]);
                r.push(Stmt::Assign(ident(parent).member(name), signal));
            }

            for (name, prop) in &self.properties {
                if self.base_declares_property(ctx, name) {
                    continue;
                }
                let mut args = vec![ident(parent), string(prop.ty.as_str()), string(name.as_str())];
                if prop.is_trivial() {
                    if let Some(default) = prop.default_literal() {
                        args.push(raw(default));
                    }
                }
                r.push(call(raw("core.addProperty"), args).stmt());
            }
        }

        for (idx, child) in self.children.iter().enumerate() {
            let var = format!("{}_child{}", escape(parent), idx);
            let component = self.resolve_type(ctx, child)?;
            prologue.push(Stmt::Var(
                var.clone(),
                Some(new_object(type_ref(&component), vec![ident(parent)])),
            ));
            prologue.push(ident(parent).call("addChild", vec![ident(var.as_str())]).stmt());
            r.extend(child.call_create(ctx, &var)?);
        }

        for (target, value) in &self.assignments {
            if target == "id" {
                match value {
                    AssignmentValue::Literal(id) if IDENT_RE.is_match(id.trim()) => {
                        r.push(ident(parent).call("_setId", vec![string(id.trim())]).stmt());
                        continue;
                    }
                    AssignmentValue::Literal(id) => {
                        return Err(self
                            .error(
                                ErrorKind::MalformedBindingTarget,
                                "expected identifier, not expression",
                            )
                            .with_context(format!("id: {}", id)));
                    }
                    AssignmentValue::Component(_) => {
                        return Err(self.error(ErrorKind::InvalidIdUsage, "assigning component to id"));
                    }
                }
            } else if target.ends_with(".id") {
                return Err(self
                    .error(
                        ErrorKind::InvalidIdUsage,
                        "setting id of the remote object is prohibited",
                    )
                    .with_context(format!("target {}", target)));
            } else {
                self.check_target_property(ctx, target)?;
            }

            if let AssignmentValue::Component(generator) = value {
                let var = format!("{}_{}", parent, escape(target));
                let component = self.resolve_type(ctx, generator)?;
                if target != DELEGATE_TARGET {
                    prologue.push(Stmt::Var(
                        var.clone(),
                        Some(new_object(type_ref(&component), vec![ident(parent)])),
                    ));
                    r.extend(generator.call_create(ctx, &var)?);
                    r.push(Stmt::Assign(target_lvalue(ident(parent), target), ident(var.as_str())));
                } else {
                    let mut factory = vec![Stmt::Var(
                        var.clone(),
                        Some(new_object(type_ref(&component), vec![ident(parent), raw("true")])),
                    )];
                    factory.extend(generator.call_create(ctx, &var)?);
                    factory.extend(generator.call_setup(ctx, &var)?);
                    factory.push(Stmt::Return(ident(var.as_str())));
                    r.push(Stmt::Assign(
                        ident(parent).member(DELEGATE_TARGET),
                        bound(function(&[], factory), parent),
                    ));
                }
            }
        }

        Ok((prologue, r))
    }

    /// SETUP phase for the object held in variable `parent`.
    pub fn generate_setup_code(&self, ctx: &ValidationContext<'_>, parent: &str) -> Result<Vec<Stmt>> {
        let mut r = Vec::new();

        for (name, target) in &self.aliases {
            self.check_target_property(ctx, target)?;
            let (getter, property) = target_owner(ident("this"), target);
            r.push(
                call(
                    raw("core.addAliasProperty"),
                    vec![
                        ident(parent),
                        string(name.as_str()),
                        bound(function(&[], vec![Stmt::Return(getter)]), parent),
                        string(property),
                    ],
                )
                .stmt(),
            );
        }

        if !self.prototype {
            // Redeclared on an instance but already added by a base type: only the
            // default value is left to apply.
            for (name, prop) in &self.properties {
                if !prop.is_trivial() || self.assignments.contains_key(name) {
                    continue;
                }
                if let Some(default) = prop.default_literal() {
                    if self.base_declares_property(ctx, name) {
                        r.extend(self.generate_binding(ctx, parent, name, default)?);
                    }
                }
            }
        }

        for (target, value) in &self.assignments {
            if target == "id" {
                continue;
            }
            match value {
                AssignmentValue::Literal(text) => {
                    r.extend(self.generate_binding(ctx, parent, target, text)?);
                }
                AssignmentValue::Component(generator) => {
                    if target == DELEGATE_TARGET {
                        continue;
                    }
                    let var = format!("{}_{}", parent, escape(target));
                    r.push(Stmt::Var(var.clone(), Some(target_lvalue(ident(parent), target))));
                    r.extend(generator.call_setup(ctx, &var)?);
                }
            }
        }

        for (idx, child) in self.children.iter().enumerate() {
            let var = format!("{}_child{}", escape(parent), idx);
            r.push(Stmt::Var(
                var.clone(),
                Some(ident(parent).member("children").index(idx)),
            ));
            r.extend(child.call_setup(ctx, &var)?);
        }

        if !self.elements.is_empty() {
            let payload = serde_json::Value::Array(self.elements.clone()).to_string();
            r.push(ident(parent).call("assign", vec![raw(payload)]).stmt());
        }

        if !self.prototype {
            for method in self.handlers_of(HandlerKind::Method) {
                let code = replace_enums(self, ctx, &method.args, &method.code);
                r.push(Stmt::Assign(
                    ident(parent).member(&method.name),
                    bound(raw_function(&method.args, code), parent),
                ));
            }
        }

        for handler in self.handlers_of(HandlerKind::SignalHandler) {
            let code = replace_enums(self, ctx, &handler.args, &handler.code);
            if handler.name != COMPLETED_SIGNAL {
                r.push(
                    ident(parent)
                        .call(
                            "on",
                            vec![
                                string(handler.name.as_str()),
                                bound(raw_function(&handler.args, code), parent),
                            ],
                        )
                        .stmt(),
                );
            } else {
                r.push(
                    ident(parent)
                        .member("_context")
                        .call("_onCompleted", vec![bound(raw_function(&[], code), parent)])
                        .stmt(),
                );
            }
        }

        let value_arg = ["value".to_string()];
        for handler in self.handlers_of(HandlerKind::ChangedHandler) {
            let code = replace_enums(self, ctx, &value_arg, &handler.code);
            r.push(
                ident(parent)
                    .call(
                        "onChanged",
                        vec![
                            string(handler.name.as_str()),
                            bound(raw_function(&value_arg, code), parent),
                        ],
                    )
                    .stmt(),
            );
        }

        let key_args = ["key".to_string(), "event".to_string()];
        for handler in self.handlers_of(HandlerKind::KeyHandler) {
            let code = replace_enums(self, ctx, &key_args, &handler.code);
            r.push(
                ident(parent)
                    .call(
                        "onPressed",
                        vec![
                            string(handler.name.as_str()),
                            bound(raw_function(&key_args, code), parent),
                        ],
                    )
                    .stmt(),
            );
        }

        r.extend(self.generate_animations(ctx, parent)?);
        Ok(r)
    }

    /// Assignment of expression text to `target`, tracked when it has dependencies.
    fn generate_binding(
        &self,
        ctx: &ValidationContext<'_>,
        parent: &str,
        target: &str,
        text: &str,
    ) -> Result<Vec<Stmt>> {
        let binding = analyze_binding(self, ctx, text)?;
        let value = raw(binding.expression.as_str()).paren();

        if !binding.is_dynamic() {
            // Evaluated once, but still against the owning object.
            let value = if binding.uses_this {
                function(&[], vec![Stmt::Return(value)])
                    .paren()
                    .call("call", vec![ident(parent)])
            } else {
                value
            };
            return Ok(vec![
                ident(parent).call("_removeUpdater", vec![string(target)]).stmt(),
                Stmt::Assign(target_lvalue(ident(parent), target), value),
            ]);
        }

        let var = format!("_update_var_{}__{}", escape(parent), escape(target));
        let mut r = vec![
            Stmt::Var(
                var.clone(),
                Some(bound(
                    function(&[], vec![Stmt::Assign(target_lvalue(ident("this"), target), value)]),
                    parent,
                )),
            ),
            call(ident(var.as_str()), vec![]).stmt(),
        ];

        let mut teardown = Vec::new();
        for dependency in &binding.dependencies {
            r.push(
                ident(parent)
                    .call(
                        "connectOnChanged",
                        vec![
                            dependency_path(ident(parent), dependency),
                            string(dependency.property.as_str()),
                            ident(var.as_str()),
                        ],
                    )
                    .stmt(),
            );
            teardown.push(
                dependency_path(ident("this"), dependency)
                    .call(
                        "removeOnChanged",
                        vec![string(dependency.property.as_str()), ident(var.as_str())],
                    )
                    .stmt(),
            );
        }
        r.push(
            ident(parent)
                .call(
                    "_removeUpdater",
                    vec![string(target), bound(function(&[], teardown), parent)],
                )
                .stmt(),
        );
        Ok(r)
    }

    fn generate_animations(&self, ctx: &ValidationContext<'_>, parent: &str) -> Result<Vec<Stmt>> {
        let mut r = Vec::new();
        for (name, animation) in &self.animations {
            let var = format!("behavior_on_{}", escape(name));
            let component = self.resolve_type(ctx, animation)?;
            r.push(Stmt::Var(
                var.clone(),
                Some(new_object(type_ref(&component), vec![ident(parent)])),
            ));
            r.extend(animation.call_create(ctx, &var)?);
            r.extend(animation.call_setup(ctx, &var)?);
            let (owner, property) = target_owner(ident(parent), name);
            r.push(
                owner
                    .call("setAnimation", vec![string(property), ident(var.as_str())])
                    .stmt(),
            );
        }
        Ok(r)
    }

    /// Reusable type: constructor, descriptors, shared methods and the overridden
    /// `__create`/`__setup` phases chaining to the base type.
    pub fn generate_prototype(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Stmt>> {
        let base_type = self.base_type(ctx)?;
        let this_type = export_ref(&self.name);
        let proto = export_ref(&format!("{}.prototype", self.name));
        let mut r = Vec::new();

        let mut ctor = vec![type_ref(&base_type)
            .call("apply", vec![ident("this"), ident("arguments")])
            .stmt()];
        if let Some(code) = &self.ctor {
            ctor.push(Stmt::Comment("custom constructor:".to_string()));
            ctor.push(Stmt::Raw(code.clone()));
        }
        r.push(Stmt::DocComment(vec![
            "@constructor".to_string(),
            format!("@extends {{_globals.{}}}", base_type),
        ]));
        r.push(Stmt::Assign(this_type.clone(), function(&["parent", "_delegate"], ctor)));
        r.push(Stmt::Assign(
            proto.clone(),
            call(
                raw("Object.create"),
                vec![type_ref(&base_type).member("prototype")],
            ),
        ));
        r.push(Stmt::Assign(proto.clone().member("constructor"), this_type.clone()));
        r.push(Stmt::Blank);

        r.push(Stmt::Assign(
            proto.clone().member("componentName"),
            string(self.name.as_str()),
        ));

        for name in &self.signals {
            r.push(Stmt::Assign(
                proto.clone().member(name),
                call(raw("_globals.core.createSignal"), vec![string(name.as_str())]),
            ));
        }

        for method in self.handlers_of(HandlerKind::Method) {
            let code = replace_enums(self, ctx, &method.args, &method.code);
            r.push(Stmt::Assign(
                proto.clone().member(&method.name),
                raw_function(&method.args, code),
            ));
        }

        for (name, prop) in &self.properties {
            let mut args = vec![proto.clone(), string(prop.ty.as_str()), string(name.as_str())];
            if prop.is_trivial() {
                if let Some(default) = prop.default_literal() {
                    args.push(raw(default));
                }
            }
            r.push(call(raw("core.addProperty"), args).stmt());
        }

        for (name, enumeration) in &self.enums {
            for (ordinal, value) in enumeration.values.iter().enumerate() {
                r.push(Stmt::DocComment(vec!["@const @type {number}".to_string()]));
                r.push(Stmt::Assign(proto.clone().member(value), raw(ordinal.to_string())));
                r.push(Stmt::DocComment(vec!["@const @type {number}".to_string()]));
                r.push(Stmt::Assign(this_type.clone().member(value), raw(ordinal.to_string())));
            }
            let mut args = vec![proto.clone(), string("enum"), string(name.as_str())];
            if let Some(default) = &enumeration.default {
                args.push(this_type.clone().member(default));
            }
            r.push(call(raw("core.addProperty"), args).stmt());
        }

        let base_proto = type_ref(&format!("{}.prototype", base_type));
        let (prologue, creators) = self.generate_creators(ctx, "this")?;
        let mut create = vec![base_proto
            .clone()
            .member("__create")
            .call("apply", vec![ident("this")])
            .stmt()];
        create.extend(prologue);
        create.extend(creators);
        r.push(Stmt::Assign(proto.clone().member("__create"), function(&[], create)));

        let mut setup = vec![base_proto
            .member("__setup")
            .call("apply", vec![ident("this")])
            .stmt()];
        setup.extend(self.generate_setup_code(ctx, "this")?);
        r.push(Stmt::Assign(proto.member("__setup"), function(&[], setup)));

        Ok(r)
    }

    /// Inline instance attached to the object expression `parent`: allocation, CREATE for
    /// the whole subtree, then SETUP.
    pub fn generate_instance(&self, ctx: &ValidationContext<'_>, parent: &str) -> Result<Vec<Stmt>> {
        let var = escape(self.id.as_deref().unwrap_or("instance"));
        let component = self.base_type(ctx)?;
        let mut r = vec![Stmt::Var(
            var.clone(),
            Some(new_object(type_ref(&component), vec![raw(parent)])),
        )];
        r.extend(self.call_create(ctx, &var)?);
        r.extend(self.call_setup(ctx, &var)?);
        Ok(r)
    }

    /// Emit this generator as a prototype or, for an instance generator, as inline code
    /// attached to a `parent` variable.
    pub fn emit(&self, registry: &dyn Registry, options: &CodegenOptions) -> Result<EmittedComponent> {
        let ctx = ValidationContext::new(registry, self);
        log::debug!(
            "emitting {} {} ({} identifiers in scope)",
            if self.prototype { "prototype" } else { "instance" },
            self.name,
            ctx.ids().len()
        );

        let mut stmts = Vec::new();
        if options.banner {
            stmts.push(Stmt::Comment(self.name.clone()));
        }
        if self.prototype {
            stmts.extend(self.generate_prototype(&ctx)?);
        } else {
            stmts.extend(self.generate_instance(&ctx, "parent")?);
        }

        Ok(EmittedComponent {
            name: self.name.clone(),
            base_type: self.base_type(&ctx)?,
            code: Printer::new(&options.indent).print(&stmts),
        })
    }

    /// Emit with default options.
    pub fn generate(&self, registry: &dyn Registry) -> Result<String> {
        Ok(self.emit(registry, &CodegenOptions::default())?.code)
    }
}

/// Render IR with default options; handy for emitting individual phases.
pub fn print(stmts: &[Stmt]) -> String {
    Printer::new(&CodegenOptions::default().indent).print(stmts)
}

