//! Binding expression analysis.
//!
//! A binding value is parsed as a JavaScript expression and rewritten in place using
//! span-based replacements:
//!
//! - `Type.Value` enum literals become the value's ordinal,
//! - scope names (bound identifiers, `parent`, declared properties) become explicit
//!   `this._get('name')` lookups,
//! - `model` becomes the delegate's current data row.
//!
//! Every reference that can change at runtime is recorded as a [`Dependency`], relative
//! to the object owning the binding.

use crate::component::ComponentGenerator;
use crate::scope::ValidationContext;
use crate::validate::{ErrorKind, Result};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, BindingIdentifier, CatchClause, Expression, Function,
    IdentifierReference, ObjectProperty, StaticMemberExpression, ThisExpression,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

const PARENT: &str = "parent";
const MODEL: &str = "model";
const DELEGATE: &str = "_delegate";
const MODEL_ROW: &str = "_row";

/// `(path, property)` pair a binding must be re-evaluated on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// `_get` lookups from the owning object to the object holding `property`.
    pub path: Vec<String>,
    pub property: String,
}

impl Dependency {
    pub fn new(path: &[&str], property: &str) -> Self {
        Self {
            path: path.iter().map(|segment| segment.to_string()).collect(),
            property: property.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzedBinding {
    /// Rewritten expression, evaluated with `this` bound to the owning object.
    pub expression: String,
    pub dependencies: Vec<Dependency>,
    /// The rewritten expression reads `this`, so it must run against the owning object
    /// even when it has no dependencies.
    pub uses_this: bool,
}

impl AnalyzedBinding {
    pub fn is_dynamic(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

/// Names bound by a function or catch clause, without descending into nested functions.
struct LocalNames {
    names: HashSet<String>,
}

impl<'a> Visit<'a> for LocalNames {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.insert(ident.name.to_string());
    }

    fn visit_function(&mut self, func: &Function<'a>, _flags: ScopeFlags) {
        if let Some(id) = &func.id {
            self.names.insert(id.name.to_string());
        }
    }

    fn visit_arrow_function_expression(&mut self, _func: &ArrowFunctionExpression<'a>) {}
}

struct BindingCollector<'s> {
    generator: &'s ComponentGenerator,
    ctx: &'s ValidationContext<'s>,
    /// Off for method bodies: only enum literals are rewritten there.
    track_scope: bool,
    /// One frame per enclosing function or catch clause inside the expression.
    locals: Vec<HashSet<String>>,
    uses_this: bool,
    replacements: Vec<(u32, u32, String)>,
    dependencies: Vec<Dependency>,
}

impl<'s> BindingCollector<'s> {
    fn new(generator: &'s ComponentGenerator, ctx: &'s ValidationContext<'s>, track_scope: bool) -> Self {
        Self {
            generator,
            ctx,
            track_scope,
            locals: Vec::new(),
            uses_this: false,
            replacements: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    fn depend(&mut self, dependency: Dependency) {
        if !self.dependencies.contains(&dependency) {
            log::trace!(
                "{}: dependency {:?}.{}",
                self.generator.name,
                dependency.path,
                dependency.property
            );
            self.dependencies.push(dependency);
        }
    }

    fn replace(&mut self, start: u32, end: u32, text: String) {
        self.replacements.push((start, end, text));
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().any(|frame| frame.contains(name))
    }

    fn is_scope_object(&self, name: &str) -> bool {
        name == PARENT || self.ctx.is_id(name)
    }

    fn enum_ordinal(&self, type_name: &str, value: &str) -> Option<usize> {
        if self.is_local(type_name) {
            return None;
        }
        let registry = self.ctx.registry();
        let type_id = registry.find_component(&self.generator.package, type_name)?;
        registry.component(&type_id)?.enum_ordinal(self.ctx, value)
    }

    /// Replacement text for a free identifier, recording its dependency.
    fn rewrite_reference(&mut self, name: &str) -> Option<String> {
        if !self.track_scope || self.is_local(name) {
            return None;
        }
        let text = if name == MODEL {
            self.depend(Dependency::new(&[DELEGATE], MODEL_ROW));
            format!("this._get('{}').{}", DELEGATE, MODEL_ROW)
        } else if self.is_scope_object(name) {
            format!("this._get('{}')", name)
        } else if self.generator.find_property(self.ctx, name).is_some() {
            self.depend(Dependency::new(&[], name));
            format!("this._get('{}')", name)
        } else {
            return None;
        };
        self.uses_this = true;
        Some(text)
    }

    fn push_frame(&mut self, collect: impl FnOnce(&mut LocalNames)) {
        let mut frame = LocalNames {
            names: HashSet::new(),
        };
        collect(&mut frame);
        self.locals.push(frame.names);
    }

    fn apply(mut self, source: &str) -> (String, Vec<Dependency>) {
        self.replacements.sort_by(|a, b| b.0.cmp(&a.0));
        let mut result = source.to_string();
        for (start, end, replacement) in self.replacements {
            result.replace_range((start as usize)..(end as usize), &replacement);
        }
        (result, self.dependencies)
    }
}

impl<'a, 's> Visit<'a> for BindingCollector<'s> {
    fn visit_static_member_expression(&mut self, expr: &StaticMemberExpression<'a>) {
        let property = expr.property.name.as_str();
        match &expr.object {
            Expression::Identifier(ident) => {
                let root = ident.name.as_str();
                if let Some(ordinal) = self.enum_ordinal(root, property) {
                    self.replace(expr.span.start, expr.span.end, ordinal.to_string());
                    return;
                }
                if self.track_scope
                    && root != MODEL
                    && !self.is_local(root)
                    && self.is_scope_object(root)
                {
                    self.replace(ident.span.start, ident.span.end, format!("this._get('{}')", root));
                    self.depend(Dependency::new(&[root], property));
                    self.uses_this = true;
                    return;
                }
            }
            Expression::ThisExpression(_) if self.track_scope => {
                self.depend(Dependency::new(&[], property));
            }
            _ => {}
        }
        oxc_ast_visit::walk::walk_static_member_expression(self, expr);
    }

    fn visit_this_expression(&mut self, _expr: &ThisExpression) {
        self.uses_this = true;
    }

    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        if let Some(text) = self.rewrite_reference(ident.name.as_str()) {
            self.replace(ident.span.start, ident.span.end, text);
        }
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        // `{ width }` has to keep its key once the value is rewritten.
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                if let Some(text) = self.rewrite_reference(ident.name.as_str()) {
                    self.replace(
                        ident.span.start,
                        ident.span.end,
                        format!("{}: {}", ident.name, text),
                    );
                }
                return;
            }
        }
        oxc_ast_visit::walk::walk_object_property(self, prop);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        self.push_frame(|frame| {
            if let Some(id) = &func.id {
                frame.names.insert(id.name.to_string());
            }
            frame.visit_formal_parameters(&func.params);
            if let Some(body) = &func.body {
                frame.visit_function_body(body);
            }
        });
        oxc_ast_visit::walk::walk_function(self, func, flags);
        self.locals.pop();
    }

    fn visit_arrow_function_expression(&mut self, func: &ArrowFunctionExpression<'a>) {
        self.push_frame(|frame| {
            frame.visit_formal_parameters(&func.params);
            frame.visit_function_body(&func.body);
        });
        oxc_ast_visit::walk::walk_arrow_function_expression(self, func);
        self.locals.pop();
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        self.push_frame(|frame| {
            if let Some(param) = &clause.param {
                frame.visit_catch_parameter(param);
            }
        });
        oxc_ast_visit::walk::walk_catch_clause(self, clause);
        self.locals.pop();
    }
}

/// Rewrite a binding expression and extract its dependencies.
pub fn analyze_binding(
    generator: &ComponentGenerator,
    ctx: &ValidationContext<'_>,
    text: &str,
) -> Result<AnalyzedBinding> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let expr = Parser::new(&allocator, text, source_type)
        .parse_expression()
        .map_err(|errors| {
            generator
                .error(
                    ErrorKind::InvalidExpression,
                    &format!("invalid binding expression `{}`", text),
                )
                .with_context(format!("{:?}", errors))
        })?;

    let mut collector = BindingCollector::new(generator, ctx, true);
    collector.visit_expression(&expr);
    let uses_this = collector.uses_this;
    let (expression, dependencies) = collector.apply(text);
    Ok(AnalyzedBinding {
        expression,
        dependencies,
        uses_this,
    })
}

/// Rewrite enum literals inside a method body. Bodies that fail to parse are returned
/// unchanged; the runtime reports their syntax errors.
pub fn replace_enums(
    generator: &ComponentGenerator,
    ctx: &ValidationContext<'_>,
    args: &[String],
    code: &str,
) -> String {
    let prefix = format!("(function({}) ", args.join(", "));
    let wrapped = format!("{}{})", prefix, code);

    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let expr = match Parser::new(&allocator, &wrapped, source_type).parse_expression() {
        Ok(expr) => expr,
        Err(_) => {
            log::warn!("{}: could not parse method body, enums left as written", generator.name);
            return code.to_string();
        }
    };

    let mut collector = BindingCollector::new(generator, ctx, false);
    collector.visit_expression(&expr);
    let (rewritten, _) = collector.apply(&wrapped);
    rewritten[prefix.len()..rewritten.len() - 1].to_string()
}
