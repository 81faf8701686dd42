//! Lexical environments.
//!
//! All scopes live in one arena and refer to their parent by id, so closures
//! can capture their defining scope without forming `Rc` cycles: a captured
//! environment is just an [`EnvId`] into the arena owned by the run.
//!
//! A binding is `name -> (declared type, optional value)`. The declared type
//! is installed first (static pass); the value arrives later (value pass)
//! and must be matched by the declared type. Lookup walks the parent chain;
//! shadowing is permitted across scopes but not within one.

use indexmap::IndexMap;
use std::rc::Rc;

use crate::{
    error::{AnalyzeResult, EvalResult, SimplexError},
    types::Type,
    value::{DataDescriptor, Value},
};

/// Identifier of a scope inside the [`EnvArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(u32);

impl EnvId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Binding {
    declared: Type,
    value: Option<Value>,
}

/// One lexical scope.
#[derive(Debug)]
struct Scope {
    parent: Option<EnvId>,
    bindings: IndexMap<String, Binding>,
    /// Data-type descriptors registered in this scope (root, in practice).
    type_defs: IndexMap<String, Rc<DataDescriptor>>,
}

/// Storage for every scope created during analysis and evaluation.
///
/// The root scope is created by [`EnvArena::new`] and always has id 0.
/// Scopes are dropped with the arena at the end of the run; nothing inside
/// a program can observe the difference from eager per-scope teardown.
#[derive(Debug)]
pub struct EnvArena {
    scopes: Vec<Scope>,
}

impl Default for EnvArena {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvArena {
    /// Creates the arena with an empty root scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                parent: None,
                bindings: IndexMap::new(),
                type_defs: IndexMap::new(),
            }],
        }
    }

    /// The root scope's id.
    #[must_use]
    pub fn root(&self) -> EnvId {
        EnvId(0)
    }

    /// Opens a new child scope of `parent`.
    pub fn push(&mut self, parent: EnvId) -> EnvId {
        let id = EnvId(u32::try_from(self.scopes.len()).expect("scope count fits in u32"));
        self.scopes.push(Scope {
            parent: Some(parent),
            bindings: IndexMap::new(),
            type_defs: IndexMap::new(),
        });
        id
    }

    fn scope(&self, env: EnvId) -> &Scope {
        &self.scopes[env.index()]
    }

    fn scope_mut(&mut self, env: EnvId) -> &mut Scope {
        &mut self.scopes[env.index()]
    }

    /// Declares `name` with its type in scope `env`.
    ///
    /// Fails with `Redefined` if the name is already declared in this exact
    /// scope; shadowing an outer scope is fine.
    pub fn declare_type(&mut self, env: EnvId, name: &str, declared: Type) -> AnalyzeResult<()> {
        let scope = self.scope_mut(env);
        if scope.bindings.contains_key(name) {
            return Err(SimplexError::redefined(name));
        }
        scope.bindings.insert(
            name.to_owned(),
            Binding {
                declared,
                value: None,
            },
        );
        Ok(())
    }

    /// Installs the value for an already-declared name.
    ///
    /// Walks the chain to the declaring scope. Fails with `Undefined` if no
    /// declaration exists and with `TypeMismatch` if the value's type is not
    /// matched by the declared type.
    pub fn add_value(&mut self, env: EnvId, name: &str, value: Value) -> EvalResult<()> {
        let declaring = self
            .find_declaring_scope(env, name)
            .ok_or_else(|| SimplexError::undefined_name(name))?;
        let binding = self
            .scope_mut(declaring)
            .bindings
            .get_mut(name)
            .expect("declaring scope contains binding");
        // An empty vector adopts the declared element type at bind time.
        if let (Type::Vector(declared_elem), Value::Vector(vector)) = (&binding.declared, &value) {
            let mut vector = vector.borrow_mut();
            if vector.values.is_empty() && vector.elem.is_any() {
                vector.elem = (**declared_elem).clone();
            }
        }
        let actual = value.value_type();
        if !binding.declared.matched_by(&actual) {
            return Err(SimplexError::type_mismatch(&binding.declared, &actual));
        }
        binding.value = Some(value);
        Ok(())
    }

    /// Replaces the value of an existing binding, checking the declared type.
    pub fn update_value(&mut self, env: EnvId, name: &str, value: Value) -> EvalResult<()> {
        self.add_value(env, name, value)
    }

    /// The declared type of `name`, walking the parent chain.
    pub fn lookup_type(&self, env: EnvId, name: &str) -> AnalyzeResult<Type> {
        let declaring = self
            .find_declaring_scope(env, name)
            .ok_or_else(|| SimplexError::undefined_name(name))?;
        Ok(self.scope(declaring).bindings[name].declared.clone())
    }

    /// The current value of `name`, walking the parent chain.
    ///
    /// A name that is declared but not yet installed (its initializer has
    /// not run) also reports `Undefined`.
    pub fn lookup_value(&self, env: EnvId, name: &str) -> EvalResult<Value> {
        let declaring = self
            .find_declaring_scope(env, name)
            .ok_or_else(|| SimplexError::undefined_name(name))?;
        self.scope(declaring).bindings[name]
            .value
            .clone()
            .ok_or_else(|| SimplexError::undefined_name(name))
    }

    /// Registers a data-type descriptor in scope `env`.
    pub fn register_type_def(&mut self, env: EnvId, descriptor: Rc<DataDescriptor>) -> AnalyzeResult<()> {
        let scope = self.scope_mut(env);
        let name = descriptor.name.to_string();
        if scope.type_defs.contains_key(&name) {
            return Err(SimplexError::redefined(&name));
        }
        scope.type_defs.insert(name, descriptor);
        Ok(())
    }

    /// Finds a registered data-type descriptor by name, walking the chain.
    #[must_use]
    pub fn lookup_type_def(&self, env: EnvId, name: &str) -> Option<Rc<DataDescriptor>> {
        let mut current = Some(env);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(descriptor) = scope.type_defs.get(name) {
                return Some(Rc::clone(descriptor));
            }
            current = scope.parent;
        }
        None
    }

    fn find_declaring_scope(&self, env: EnvId, name: &str) -> Option<EnvId> {
        let mut current = Some(env);
        while let Some(id) = current {
            let scope = self.scope(id);
            if scope.bindings.contains_key(name) {
                return Some(id);
            }
            current = scope.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn declare_then_add_then_lookup() {
        let mut envs = EnvArena::new();
        let root = envs.root();
        envs.declare_type(root, "x", Type::int()).expect("declare");
        envs.add_value(root, "x", Value::Int(3)).expect("add");
        assert!(matches!(envs.lookup_value(root, "x"), Ok(Value::Int(3))));
        assert_eq!(envs.lookup_type(root, "x").expect("type"), Type::int());
    }

    #[test]
    fn redeclare_in_same_scope_fails() {
        let mut envs = EnvArena::new();
        let root = envs.root();
        envs.declare_type(root, "x", Type::int()).expect("declare");
        let err = envs.declare_type(root, "x", Type::float()).expect_err("redefined");
        assert_eq!(err.kind, ErrorKind::Redefined);
    }

    /// Shadowing is permitted in nested scopes but not within one.
    #[test]
    fn shadowing_in_child_scope() {
        let mut envs = EnvArena::new();
        let root = envs.root();
        envs.declare_type(root, "x", Type::int()).expect("declare");
        envs.add_value(root, "x", Value::Int(1)).expect("add");
        let child = envs.push(root);
        envs.declare_type(child, "x", Type::string()).expect("shadow");
        envs.add_value(child, "x", Value::string("s")).expect("add");
        assert!(matches!(envs.lookup_value(child, "x"), Ok(Value::Str(_))));
        assert!(matches!(envs.lookup_value(root, "x"), Ok(Value::Int(1))));
    }

    #[test]
    fn add_value_without_declaration_fails() {
        let mut envs = EnvArena::new();
        let root = envs.root();
        let err = envs.add_value(root, "y", Value::Int(1)).expect_err("undeclared");
        assert_eq!(err.kind, ErrorKind::Undefined);
    }

    #[test]
    fn add_value_checks_declared_type() {
        let mut envs = EnvArena::new();
        let root = envs.root();
        envs.declare_type(root, "x", Type::int()).expect("declare");
        let err = envs.add_value(root, "x", Value::Float(1.5)).expect_err("mismatch");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn declared_but_uninstalled_value_reports_undefined() {
        let mut envs = EnvArena::new();
        let root = envs.root();
        envs.declare_type(root, "x", Type::int()).expect("declare");
        let err = envs.lookup_value(root, "x").expect_err("no value yet");
        assert_eq!(err.kind, ErrorKind::Undefined);
    }

    #[test]
    fn any_declaration_accepts_every_value() {
        let mut envs = EnvArena::new();
        let root = envs.root();
        envs.declare_type(root, "x", Type::any()).expect("declare");
        envs.add_value(root, "x", Value::string("anything")).expect("add");
    }
}
