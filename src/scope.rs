//! Property resolution.
//!
//! Names are resolved against the generator's own declarations first, then up the
//! inheritance chain through the registry. Dotted target paths rooted at an explicitly
//! bound identifier are accepted as-is: the remote object's type is not known here.

use crate::ast::{EnumProperty, Property};
use crate::component::{AssignmentValue, ComponentGenerator};
use crate::registry::{Registry, ROOT_TYPE};
use crate::validate::{ErrorKind, Result};
use std::collections::HashSet;

/// Identifier every component tree can refer to without binding it.
pub const ROOT_ID: &str = "context";

/// Everything a resolution call may consult. Built once per emission root, after the
/// identifier set has been collected, and never mutated afterwards.
pub struct ValidationContext<'r> {
    registry: &'r dyn Registry,
    ids: HashSet<String>,
}

impl<'r> ValidationContext<'r> {
    pub fn new(registry: &'r dyn Registry, root: &ComponentGenerator) -> Self {
        let mut ids = HashSet::new();
        ids.insert(ROOT_ID.to_string());
        root.collect_id(&mut ids);
        Self { registry, ids }
    }

    pub fn registry(&self) -> &'r dyn Registry {
        self.registry
    }

    pub fn is_id(&self, name: &str) -> bool {
        self.ids.contains(name)
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }
}

/// A declaration found by [`ComponentGenerator::find_property`].
#[derive(Debug, Clone, Copy)]
pub enum PropertyDecl<'a> {
    Property(&'a Property),
    Enum(&'a EnumProperty),
    Alias(&'a str),
}

impl ComponentGenerator {
    /// Add every identifier bound in this subtree to `ids`.
    pub fn collect_id(&self, ids: &mut HashSet<String>) {
        if let Some(id) = &self.id {
            ids.insert(id.clone());
        }
        for value in self.assignments.values() {
            if let AssignmentValue::Component(generator) = value {
                generator.collect_id(ids);
            }
        }
        for animation in self.animations.values() {
            animation.collect_id(ids);
        }
        for child in &self.children {
            child.collect_id(ids);
        }
    }

    /// Base type generators, nearest first. Stops at the runtime root type, at the first
    /// base the registry cannot provide, or when the chain loops back on itself.
    pub fn ancestors<'a>(&'a self, registry: &'a dyn Registry) -> Vec<&'a ComponentGenerator> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self;
        while let Some(base) = registry.find_component(&current.package, &current.component_name) {
            if base == ROOT_TYPE || base == current.name || !seen.insert(base.clone()) {
                break;
            }
            match registry.component(&base) {
                Some(generator) => {
                    chain.push(generator);
                    current = generator;
                }
                None => break,
            }
        }
        chain
    }

    fn own_property(&self, name: &str) -> Option<PropertyDecl<'_>> {
        if let Some(prop) = self.properties.get(name) {
            return Some(PropertyDecl::Property(prop));
        }
        if let Some(enumeration) = self.enums.get(name) {
            return Some(PropertyDecl::Enum(enumeration));
        }
        self.aliases
            .get(name)
            .map(|target| PropertyDecl::Alias(target.as_str()))
    }

    pub fn find_property<'a>(
        &'a self,
        ctx: &ValidationContext<'a>,
        name: &str,
    ) -> Option<PropertyDecl<'a>> {
        self.own_property(name).or_else(|| {
            self.ancestors(ctx.registry())
                .into_iter()
                .find_map(|base| base.own_property(name))
        })
    }

    /// True when a base type already declares `name`, so an instance must not redeclare it.
    pub fn base_declares_property(&self, ctx: &ValidationContext<'_>, name: &str) -> bool {
        self.ancestors(ctx.registry())
            .into_iter()
            .any(|base| base.own_property(name).is_some())
    }

    pub fn base_declares_signal(&self, ctx: &ValidationContext<'_>, name: &str) -> bool {
        self.ancestors(ctx.registry())
            .into_iter()
            .any(|base| base.signals.contains(name))
    }

    /// Ordinal of `value` in an enum declared on this type or one of its bases.
    pub fn enum_ordinal(&self, ctx: &ValidationContext<'_>, value: &str) -> Option<usize> {
        std::iter::once(self)
            .chain(self.ancestors(ctx.registry()))
            .flat_map(|generator| generator.enums.values())
            .find_map(|enumeration| enumeration.values.iter().position(|v| v == value))
    }

    pub fn check_target_property(&self, ctx: &ValidationContext<'_>, target: &str) -> Result<()> {
        let mut path = target.split('.');
        let head = path.next().unwrap_or(target);
        let dotted = path.next().is_some();

        if dotted && ctx.is_id(head) {
            return Ok(());
        }

        if self.find_property(ctx, head).is_none() {
            return Err(self
                .error(
                    ErrorKind::UnknownProperty,
                    &format!("unknown property {}", head),
                )
                .with_context(format!("target {}", target)));
        }
        Ok(())
    }
}
