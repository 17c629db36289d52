//! # Declarative component code generator
//!
//! Backend of a declarative-UI compiler: turns a component declaration tree into
//! JavaScript driving a property/signal runtime.
//!
//! ## Generation Invariants
//!
//! 1. **Eager construction**: a [`ComponentGenerator`] classifies every declaration and
//!    builds every nested generator when it is constructed. Afterwards it is read-only.
//!
//! 2. **Shared namespace**: properties, aliases and enums of one component share a single
//!    namespace. Signals, each handler kind and animation targets have their own.
//!
//! 3. **Identifier set first**: the set of bound identifiers of an emission root is
//!    collected before any target path is validated. Dotted targets rooted at one of
//!    those identifiers are not validated further.
//!
//! 4. **CREATE before SETUP**: structure for a whole subtree is emitted before any of
//!    its behavior, and parents are allocated before their children.
//!
//! 5. **Bindings**: expressions with dependencies get a recomputation closure, one
//!    subscription per dependency and a teardown registered with `_removeUpdater`.
//!    Expressions without dependencies clear any previous updater and assign once.
//!
//! 6. **Enums live on types**: declaring an enum on an inline instance is an error.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod ast;
mod binding;
mod codegen;
mod component;
pub mod js;
mod registry;
mod scope;
mod validate;

#[cfg(test)]
mod codegen_tests;

pub use binding::{analyze_binding, replace_enums, AnalyzedBinding, Dependency};
pub use codegen::{
    compile_components, escape, print, CodegenOptions, CompileOutput, ComponentSource,
    EmittedComponent,
};
pub use component::{
    classify_method, get_package, AssignmentValue, ComponentGenerator, Handler, HandlerKind,
};
pub use registry::{ComponentRegistry, Registry, ROOT_TYPE};
pub use scope::{PropertyDecl, ValidationContext, ROOT_ID};
pub use validate::*;

/// Node entry point: `components_json` is an array of `{ typeId, component }` objects,
/// the result is a serialized [`CompileOutput`].
#[cfg(feature = "napi")]
#[napi]
pub fn compile_components_native(components_json: String, options_json: Option<String>) -> String {
    let options: CodegenOptions = match options_json.as_deref().map(serde_json::from_str) {
        Some(Ok(options)) => options,
        Some(Err(e)) => {
            log::warn!("ignoring malformed codegen options: {}", e);
            CodegenOptions::default()
        }
        None => CodegenOptions::default(),
    };

    let sources: Vec<ComponentSource> = match serde_json::from_str(&components_json) {
        Ok(sources) => sources,
        Err(e) => {
            let error = CompilerError::new(
                ErrorKind::UnhandledElement,
                &format!("malformed component input: {}", e),
                "<input>",
                "",
            );
            return serde_json::to_string(&CompileOutput {
                outputs: vec![],
                errors: vec![error],
            })
            .unwrap_or_default();
        }
    };

    serde_json::to_string(&compile_components(&sources, &options)).unwrap_or_default()
}
