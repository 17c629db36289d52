//! Component type registry.
//!
//! The generator only ever queries the registry: it resolves the type name written in a
//! component literal to a type id, and fetches the prototype generator behind a type id
//! when property lookup has to walk up the inheritance chain.

use crate::ast::Component;
use crate::codegen::{CodegenOptions, EmittedComponent};
use crate::component::ComponentGenerator;
use crate::validate::{CompilerError, ErrorKind, Result};
use indexmap::IndexMap;
use rayon::prelude::*;

/// Type id of the runtime's well-known root type. Inheritance lookup stops here.
pub const ROOT_TYPE: &str = "core.CoreObject";

pub trait Registry {
    /// Resolve a type name as written inside `package` to a type id.
    fn find_component(&self, package: &str, name: &str) -> Option<String>;

    /// Prototype generator registered for `type_id`.
    fn component(&self, type_id: &str) -> Option<&ComponentGenerator>;
}

#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, ComponentGenerator>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `component` as the prototype of `type_id` and register it.
    pub fn register(&mut self, type_id: &str, component: &Component) -> Result<()> {
        let generator = ComponentGenerator::prototype(type_id, component)?;
        self.insert(generator)
    }

    pub fn insert(&mut self, generator: ComponentGenerator) -> Result<()> {
        if self.components.contains_key(&generator.name) {
            return Err(CompilerError::new(
                ErrorKind::DuplicateDeclaration,
                &format!("duplicate component type {}", generator.name),
                &generator.name,
                &generator.component_name,
            ));
        }
        log::debug!("registered component type {}", generator.name);
        self.components.insert(generator.name.clone(), generator);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Emit every registered prototype. Generators are immutable, so emission runs in
    /// parallel; results keep registration order and the first error aborts the pass.
    pub fn generate_all(&self, options: &CodegenOptions) -> Result<Vec<EmittedComponent>> {
        let generators: Vec<&ComponentGenerator> = self.components.values().collect();
        generators
            .par_iter()
            .map(|generator| generator.emit(self, options))
            .collect()
    }
}

impl Registry for ComponentRegistry {
    fn find_component(&self, package: &str, name: &str) -> Option<String> {
        if name == ROOT_TYPE || (name == "CoreObject" && !self.components.contains_key(name)) {
            return Some(ROOT_TYPE.to_string());
        }

        if name.contains('.') {
            return self.components.get_key_value(name).map(|(k, _)| k.clone());
        }

        if !package.is_empty() {
            let qualified = format!("{}.{}", package, name);
            if self.components.contains_key(&qualified) {
                return Some(qualified);
            }
        }

        let suffix = format!(".{}", name);
        let mut candidates = self
            .components
            .keys()
            .filter(|id| id.as_str() == name || id.ends_with(&suffix));
        match (candidates.next(), candidates.next()) {
            (Some(id), None) => Some(id.clone()),
            _ => None,
        }
    }

    fn component(&self, type_id: &str) -> Option<&ComponentGenerator> {
        self.components.get(type_id)
    }
}
