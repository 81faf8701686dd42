//! Per-type operation tables.
//!
//! Every type has one table mapping method names to overloaded signatures.
//! Operators, method-call expressions, and built-ins all dispatch through
//! this registry; there is no other dispatch mechanism. Built-in operations
//! are installed when the registry is created, user `meth` definitions are
//! added during static install, and the registry is immutable afterwards.

use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    ast::MethodDef,
    error::{AnalyzeResult, SimplexError},
    types::{names, Type},
    value::DataDescriptor,
};

/// One overload of a method: its parameter types, return type, and how to
/// run it.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub params: Vec<Type>,
    pub ret: Type,
    pub imp: MethodImpl,
}

/// How a method entry executes.
#[derive(Debug, Clone)]
pub enum MethodImpl {
    /// Implemented natively; dispatched structurally on the receiver value.
    Builtin,
    /// A user `meth` definition evaluated against the root environment.
    User(Rc<MethodDef>),
}

type SigList = SmallVec<[MethodEntry; 2]>;

#[derive(Debug, Default)]
struct OpTable {
    methods: IndexMap<String, Vec<MethodEntry>>,
}

impl OpTable {
    fn add(&mut self, name: &str, params: Vec<Type>, ret: Type, imp: MethodImpl) {
        self.methods
            .entry(name.to_owned())
            .or_default()
            .push(MethodEntry { params, ret, imp });
    }
}

/// The process-wide registry of operation tables, keyed by the type's
/// canonical name.
#[derive(Debug)]
pub struct TypeRegistry {
    tables: AHashMap<String, OpTable>,
}

impl TypeRegistry {
    /// A registry with the built-in tables for every primitive and geometry
    /// type already populated.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            tables: AHashMap::new(),
        };
        registry.install_int();
        registry.install_float();
        registry.install_boolean();
        registry.install_string();
        registry.install_point();
        registry.install_solid();
        registry.install_polygon();
        registry
    }

    /// Opens the operation table for a freshly registered data type.
    ///
    /// Every record type supports `eq` (reference identity); user methods
    /// extend the table later.
    pub fn register_data(&mut self, descriptor: &DataDescriptor) {
        let table = self.tables.entry(descriptor.name.to_string()).or_default();
        table.add("eq", vec![Type::any()], Type::boolean(), MethodImpl::Builtin);
    }

    /// Adds a user method to its target type's table.
    ///
    /// Fails with `Redefined` when an overload with identical parameter
    /// types already exists (built-in or user).
    pub fn add_user_method(&mut self, def: &Rc<MethodDef>) -> AnalyzeResult<()> {
        let key = def.target.to_string();
        let params: Vec<Type> = def.params.iter().map(|p| p.declared.clone()).collect();
        if self
            .get_method(&def.target, &def.name)
            .is_some_and(|entries| entries.iter().any(|e| e.params == params))
        {
            return Err(SimplexError::redefined(&format!("{key}.{}", def.name)).at(def.position));
        }
        self.tables
            .entry(key)
            .or_default()
            .add(&def.name, params, def.ret.clone(), MethodImpl::User(Rc::clone(def)));
        Ok(())
    }

    /// All overloads of `name` on `target`, or `None` when the type does not
    /// define the method at all.
    ///
    /// Vector types get their generic built-ins (`sub`, `plus`, `eq`,
    /// `length`) synthesized for the concrete element type, merged with any
    /// user methods registered against the written-out vector type.
    #[must_use]
    pub fn get_method(&self, target: &Type, name: &str) -> Option<SigList> {
        let mut entries: SigList = SmallVec::new();
        if let Type::Vector(elem) = target {
            match name {
                "sub" => entries.push(MethodEntry {
                    params: vec![Type::int()],
                    ret: (**elem).clone(),
                    imp: MethodImpl::Builtin,
                }),
                "plus" => entries.push(MethodEntry {
                    params: vec![target.clone()],
                    ret: target.clone(),
                    imp: MethodImpl::Builtin,
                }),
                "eq" => entries.push(MethodEntry {
                    params: vec![Type::any()],
                    ret: Type::boolean(),
                    imp: MethodImpl::Builtin,
                }),
                "length" => entries.push(MethodEntry {
                    params: vec![],
                    ret: Type::int(),
                    imp: MethodImpl::Builtin,
                }),
                _ => {}
            }
        }
        if let Some(table) = self.tables.get(&target.to_string()) {
            if let Some(found) = table.methods.get(name) {
                entries.extend(found.iter().cloned());
            }
        }
        if entries.is_empty() { None } else { Some(entries) }
    }

    /// The method type of `name` on `target`, for diagnostics and the
    /// type-descriptor surface.
    #[must_use]
    pub fn method_type(&self, target: &Type, name: &str) -> Option<Type> {
        let entries = self.get_method(target, name)?;
        let ret = entries[0].ret.clone();
        Some(Type::Method {
            target: Box::new(target.clone()),
            arg_lists: entries.into_iter().map(|e| e.params).collect(),
            ret: Box::new(ret),
        })
    }

    fn table(&mut self, name: &str) -> &mut OpTable {
        self.tables.entry(name.to_owned()).or_default()
    }

    fn install_int(&mut self) {
        let (int, float) = (Type::int, Type::float);
        let table = self.table(names::INT);
        for op in ["plus", "minus", "times", "div", "mod", "pow"] {
            table.add(op, vec![int()], int(), MethodImpl::Builtin);
            table.add(op, vec![float()], float(), MethodImpl::Builtin);
        }
        table.add("neg", vec![], int(), MethodImpl::Builtin);
        table.add("eq", vec![Type::any()], Type::boolean(), MethodImpl::Builtin);
        table.add("compare", vec![int()], int(), MethodImpl::Builtin);
        table.add("compare", vec![float()], int(), MethodImpl::Builtin);
        table.add("to_float", vec![], float(), MethodImpl::Builtin);
    }

    fn install_float(&mut self) {
        let (int, float) = (Type::int, Type::float);
        let table = self.table(names::FLOAT);
        for op in ["plus", "minus", "times", "div", "mod", "pow"] {
            table.add(op, vec![float()], float(), MethodImpl::Builtin);
            table.add(op, vec![int()], float(), MethodImpl::Builtin);
        }
        table.add("neg", vec![], float(), MethodImpl::Builtin);
        table.add("eq", vec![Type::any()], Type::boolean(), MethodImpl::Builtin);
        table.add("compare", vec![float()], int(), MethodImpl::Builtin);
        table.add("compare", vec![int()], int(), MethodImpl::Builtin);
        table.add("sqrt", vec![], float(), MethodImpl::Builtin);
    }

    fn install_boolean(&mut self) {
        let table = self.table(names::BOOLEAN);
        table.add("eq", vec![Type::any()], Type::boolean(), MethodImpl::Builtin);
        table.add("not", vec![], Type::boolean(), MethodImpl::Builtin);
    }

    fn install_string(&mut self) {
        let table = self.table(names::STRING);
        table.add("plus", vec![Type::string()], Type::string(), MethodImpl::Builtin);
        table.add("times", vec![Type::int()], Type::string(), MethodImpl::Builtin);
        table.add("eq", vec![Type::any()], Type::boolean(), MethodImpl::Builtin);
        table.add("compare", vec![Type::string()], Type::int(), MethodImpl::Builtin);
        table.add("sub", vec![Type::int()], Type::string(), MethodImpl::Builtin);
        table.add("length", vec![], Type::int(), MethodImpl::Builtin);
    }

    fn install_point(&mut self) {
        let table = self.table(names::POINT);
        table.add("plus", vec![Type::point()], Type::point(), MethodImpl::Builtin);
        table.add("minus", vec![Type::point()], Type::point(), MethodImpl::Builtin);
        table.add("times", vec![Type::float()], Type::point(), MethodImpl::Builtin);
        table.add("eq", vec![Type::any()], Type::boolean(), MethodImpl::Builtin);
        for accessor in ["x", "y", "z"] {
            table.add(accessor, vec![], Type::float(), MethodImpl::Builtin);
        }
    }

    fn install_solid(&mut self) {
        let float = Type::float;
        let table = self.table(names::SOLID);
        for transform in ["move", "rotate", "scale"] {
            table.add(transform, vec![float(), float(), float()], Type::solid(), MethodImpl::Builtin);
        }
        for combinator in ["union", "intersect", "difference"] {
            table.add(combinator, vec![Type::solid()], Type::solid(), MethodImpl::Builtin);
        }
        table.add("bounds", vec![], Type::vector(Type::point()), MethodImpl::Builtin);
    }

    fn install_polygon(&mut self) {
        let table = self.table(names::POLYGON);
        table.add("area", vec![], Type::float(), MethodImpl::Builtin);
        table.add("extrude", vec![Type::float()], Type::solid(), MethodImpl::Builtin);
        table.add("move", vec![Type::float(), Type::float()], Type::polygon(), MethodImpl::Builtin);
        table.add("eq", vec![Type::any()], Type::boolean(), MethodImpl::Builtin);
    }
}

/// Picks the first overload whose arity matches and whose declared parameter
/// types accept the given argument types.
///
/// `callee` names the method in errors, e.g. `Int.plus`.
pub fn select_signature<'a>(
    entries: &'a [MethodEntry],
    arg_types: &[Type],
    callee: &str,
) -> AnalyzeResult<&'a MethodEntry> {
    let mut arity_matched = false;
    for entry in entries {
        if entry.params.len() != arg_types.len() {
            continue;
        }
        arity_matched = true;
        if entry.params.iter().zip(arg_types).all(|(p, a)| p.matched_by(a)) {
            return Ok(entry);
        }
    }
    if arity_matched {
        let expected = entries
            .iter()
            .filter(|e| e.params.len() == arg_types.len())
            .map(|e| format_params(&e.params))
            .collect::<Vec<_>>()
            .join(" | ");
        let actual = format_params(arg_types);
        Err(SimplexError::type_mismatch(
            format!("{callee}{expected}"),
            format!("{callee}{actual}"),
        ))
    } else {
        Err(SimplexError::parameter_count(callee, arg_types.len()))
    }
}

fn format_params(params: &[Type]) -> String {
    let inner = params.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
    format!("({inner})")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn int_plus_is_overloaded_on_float() {
        let registry = TypeRegistry::with_builtins();
        let entries = registry.get_method(&Type::int(), "plus").expect("plus exists");
        let int_sig = select_signature(&entries, &[Type::int()], "Int.plus").expect("int overload");
        assert_eq!(int_sig.ret, Type::int());
        let float_sig = select_signature(&entries, &[Type::float()], "Int.plus").expect("float overload");
        assert_eq!(float_sig.ret, Type::float());
    }

    #[test]
    fn vector_sub_returns_element_type() {
        let registry = TypeRegistry::with_builtins();
        let target = Type::vector(Type::string());
        let entries = registry.get_method(&target, "sub").expect("sub exists");
        let entry = select_signature(&entries, &[Type::int()], "[String].sub").expect("signature");
        assert_eq!(entry.ret, Type::string());
    }

    #[test]
    fn missing_method_is_none() {
        let registry = TypeRegistry::with_builtins();
        assert!(registry.get_method(&Type::solid(), "plus").is_none());
        assert!(registry.get_method(&Type::simple("Nope"), "eq").is_none());
    }

    #[test]
    fn wrong_arity_reports_parameter_count() {
        let registry = TypeRegistry::with_builtins();
        let entries = registry.get_method(&Type::int(), "plus").expect("plus exists");
        let err = select_signature(&entries, &[Type::int(), Type::int()], "Int.plus").expect_err("arity");
        assert_eq!(err.kind, ErrorKind::ParameterCount);
    }

    #[test]
    fn wrong_types_report_mismatch() {
        let registry = TypeRegistry::with_builtins();
        let entries = registry.get_method(&Type::int(), "plus").expect("plus exists");
        let err = select_signature(&entries, &[Type::string()], "Int.plus").expect_err("types");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn registered_data_type_supports_eq() {
        let mut registry = TypeRegistry::with_builtins();
        let descriptor = DataDescriptor {
            name: "Pt".into(),
            fields: vec![],
        };
        registry.register_data(&descriptor);
        assert!(registry.get_method(&Type::simple("Pt"), "eq").is_some());
    }
}
