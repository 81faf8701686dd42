//! Static analysis: result types, validation, and the static half of the
//! two-pass install.
//!
//! Analysis depends only on declared types. It walks the same environment
//! chains the evaluator will use, but never touches values; scopes opened
//! here are ordinary arena scopes holding declarations only.

use std::rc::Rc;

use crate::{
    ast::{BinaryOp, Definition, Expr, ExprLoc, FunctionDef, LambdaDef, MethodDef, Param, Product},
    env::{EnvArena, EnvId},
    error::{AnalyzeResult, SimplexError},
    registry::{select_signature, TypeRegistry},
    types::{names, Type},
    value::DataDescriptor,
};

const PRIMITIVE_NAMES: &[&str] = &[
    names::INT,
    names::FLOAT,
    names::BOOLEAN,
    names::STRING,
    names::ANY,
    names::SOLID,
    names::POLYGON,
    names::POINT,
];

/// Checks that every nominal name inside `ty` is a primitive or a registered
/// data type.
fn check_type_resolves(ty: &Type, env: EnvId, envs: &EnvArena) -> AnalyzeResult<()> {
    match ty {
        Type::Simple(name) => {
            if PRIMITIVE_NAMES.contains(&&**name) || envs.lookup_type_def(env, name).is_some() {
                Ok(())
            } else {
                Err(SimplexError::analysis(format!("unknown type `{name}`")))
            }
        }
        Type::Vector(elem) => check_type_resolves(elem, env, envs),
        Type::Function { arg_lists, ret } => {
            for args in arg_lists {
                for arg in args {
                    check_type_resolves(arg, env, envs)?;
                }
            }
            check_type_resolves(ret, env, envs)
        }
        Type::Method {
            target,
            arg_lists,
            ret,
        } => {
            check_type_resolves(target, env, envs)?;
            for args in arg_lists {
                for arg in args {
                    check_type_resolves(arg, env, envs)?;
                }
            }
            check_type_resolves(ret, env, envs)
        }
    }
}

/// The static install pass over a list of definitions.
///
/// Declares every name and registers every type descriptor before any
/// initializer is validated, so definitions can refer to each other
/// regardless of source order. Errors are collected one per offending
/// definition; siblings continue.
pub(crate) fn install_static(
    definitions: &[Definition],
    env: EnvId,
    envs: &mut EnvArena,
    registry: &mut TypeRegistry,
) -> Vec<SimplexError> {
    let mut errors = Vec::new();
    // Data types and function signatures first: variables may refer to them
    // from their initializers, methods from their target types.
    for def in definitions {
        let result = match def {
            Definition::Data(data) => {
                let descriptor = Rc::new(DataDescriptor {
                    name: Rc::from(data.name.as_str()),
                    fields: data.fields.clone(),
                });
                registry.register_data(&descriptor);
                envs.register_type_def(env, descriptor).map_err(|e| e.at(data.position))
            }
            Definition::Function(fun) => envs
                .declare_type(env, &fun.name, fun.function_type())
                .map_err(|e| e.at(fun.position)),
            _ => Ok(()),
        };
        if let Err(err) = result {
            errors.push(err);
        }
    }
    for def in definitions {
        let result = match def {
            Definition::Method(meth) => registry.add_user_method(meth),
            Definition::Variable(var) => {
                let declared = match &var.declared {
                    Some(annotation) => Ok(annotation.clone()),
                    None => {
                        // Infer in a throwaway child scope so a `let` inside
                        // the initializer is not declared twice when the
                        // validation pass re-types it.
                        let probe = envs.push(env);
                        result_type(&var.init, probe, envs, registry)
                    }
                };
                declared.and_then(|ty| envs.declare_type(env, &var.name, ty).map_err(|e| e.at(var.position)))
            }
            _ => Ok(()),
        };
        if let Err(err) = result {
            errors.push(err);
        }
    }
    errors
}

/// Validates every definition. One error per definition; siblings continue.
pub(crate) fn validate_definitions(
    definitions: &[Definition],
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> Vec<SimplexError> {
    let mut errors = Vec::new();
    for def in definitions {
        let result = match def {
            Definition::Variable(var) => validate_variable(var, env, envs, registry),
            Definition::Function(fun) => validate_function(fun, env, envs, registry),
            Definition::Method(meth) => validate_method(meth, env, envs, registry),
            Definition::Data(data) => data
                .fields
                .iter()
                .try_for_each(|field| check_type_resolves(&field.declared, env, envs))
                .map_err(|e| e.at(data.position)),
        };
        if let Err(err) = result {
            errors.push(err);
        }
    }
    errors
}

fn validate_variable(
    var: &crate::ast::VariableDef,
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<()> {
    let actual = result_type(&var.init, env, envs, registry)?;
    if let Some(annotation) = &var.declared {
        check_type_resolves(annotation, env, envs).map_err(|e| e.at(var.position))?;
        if !annotation_accepts(annotation, &actual) {
            return Err(SimplexError::type_mismatch(annotation, &actual).at(var.position));
        }
    }
    Ok(())
}

/// Whether an initializer of type `actual` may be bound under `annotation`.
///
/// `matched_by`, plus one concession: an empty vector literal types as
/// `[Any]` and may seed a binding declared as any vector type. The install
/// pass re-tags the empty value with the declared element type, so the
/// vector invariant holds from the first element on.
fn annotation_accepts(annotation: &Type, actual: &Type) -> bool {
    if annotation.matched_by(actual) {
        return true;
    }
    matches!(
        (annotation, actual),
        (Type::Vector(_), Type::Vector(elem)) if elem.is_any()
    )
}

fn declare_params(params: &[Param], env: EnvId, envs: &mut EnvArena) -> AnalyzeResult<()> {
    for param in params {
        check_type_resolves(&param.declared, env, envs)?;
        envs.declare_type(env, &param.name, param.declared.clone())?;
    }
    Ok(())
}

/// Types a definition body: expressions in order, the last one's type is
/// the body's.
///
/// Each body-level `let` opens an implicit nested scope for the rest of the
/// body, so `let x = e1; let x = e2; x` shadows rather than redefining. The
/// initializer is typed before the name is declared, so it still sees the
/// outer binding.
fn body_type(
    body: &[ExprLoc],
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<Type> {
    let mut env = env;
    let mut last = Type::any();
    for expr in body {
        if matches!(expr.expr, Expr::Let { .. }) {
            env = envs.push(env);
        }
        last = result_type(expr, env, envs, registry)?;
    }
    Ok(last)
}

fn validate_function(
    fun: &Rc<FunctionDef>,
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<()> {
    check_type_resolves(&fun.ret, env, envs).map_err(|e| e.at(fun.position))?;
    let scope = envs.push(env);
    declare_params(&fun.params, scope, envs).map_err(|e| e.at(fun.position))?;
    // Nested functions see each other: static install before their bodies.
    let mut local_errors = Vec::new();
    for local in &fun.locals {
        if let Definition::Function(nested) = local {
            if let Err(err) = envs
                .declare_type(scope, &nested.name, nested.function_type())
                .map_err(|e| e.at(nested.position))
            {
                local_errors.push(err);
            }
        }
    }
    for local in &fun.locals {
        if let Definition::Function(nested) = local {
            if let Err(err) = validate_function(nested, scope, envs, registry) {
                local_errors.push(err);
            }
        }
    }
    if let Some(err) = local_errors.into_iter().next() {
        return Err(err);
    }
    let actual = body_type(&fun.body, scope, envs, registry)?;
    if !fun.ret.matched_by(&actual) {
        return Err(SimplexError::type_mismatch(&fun.ret, &actual).at(fun.position));
    }
    Ok(())
}

fn validate_method(
    meth: &Rc<MethodDef>,
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<()> {
    check_type_resolves(&meth.target, env, envs).map_err(|e| e.at(meth.position))?;
    check_type_resolves(&meth.ret, env, envs).map_err(|e| e.at(meth.position))?;
    let scope = envs.push(env);
    envs.declare_type(scope, "self", meth.target.clone())
        .map_err(|e| e.at(meth.position))?;
    declare_params(&meth.params, scope, envs).map_err(|e| e.at(meth.position))?;
    let actual = body_type(&meth.body, scope, envs, registry)?;
    if !meth.ret.matched_by(&actual) {
        return Err(SimplexError::type_mismatch(&meth.ret, &actual).at(meth.position));
    }
    Ok(())
}

/// Validates one product body in its own child scope of the root.
pub(crate) fn validate_product(
    product: &Product,
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<()> {
    let scope = envs.push(env);
    body_type(&product.body, scope, envs, registry).map(drop)
}

/// Validates an expression without computing anything beyond its type.
pub(crate) fn validate(
    expr: &ExprLoc,
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<()> {
    result_type(expr, env, envs, registry).map(drop)
}

/// Computes the static result type of an expression, raising the first
/// violation found. The evaluator may assume every invariant checked here.
pub(crate) fn result_type(
    expr: &ExprLoc,
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<Type> {
    typed(expr, env, envs, registry).map_err(|e| e.at(expr.position))
}

fn typed(expr: &ExprLoc, env: EnvId, envs: &mut EnvArena, registry: &TypeRegistry) -> AnalyzeResult<Type> {
    match &expr.expr {
        Expr::IntLit(_) => Ok(Type::int()),
        Expr::FloatLit(_) => Ok(Type::float()),
        Expr::BoolLit(_) => Ok(Type::boolean()),
        Expr::StrLit(_) => Ok(Type::string()),
        Expr::Name(name) => envs.lookup_type(env, name),
        Expr::Assign { name, value } => {
            let declared = envs.lookup_type(env, name)?;
            let actual = result_type(value, env, envs, registry)?;
            if !declared.matched_by(&actual) {
                return Err(SimplexError::type_mismatch(&declared, &actual));
            }
            Ok(actual)
        }
        Expr::Block(body) => {
            let scope = envs.push(env);
            body_type(body, scope, envs, registry)
        }
        Expr::Let {
            name,
            declared,
            init,
        } => {
            let actual = result_type(init, env, envs, registry)?;
            let bound = match declared {
                Some(annotation) => {
                    check_type_resolves(annotation, env, envs)?;
                    if !annotation_accepts(annotation, &actual) {
                        return Err(SimplexError::type_mismatch(annotation, &actual));
                    }
                    annotation.clone()
                }
                None => actual,
            };
            envs.declare_type(env, name, bound.clone())?;
            Ok(bound)
        }
        Expr::Cond {
            clauses,
            otherwise,
        } => {
            let mut unified: Option<Type> = None;
            for clause in clauses {
                check_boolean_guard(&clause.guard, env, envs, registry)?;
                let arm = result_type(&clause.value, env, envs, registry)?;
                unify_conditional_arm(&mut unified, arm, clause.value.position)?;
            }
            let arm = result_type(otherwise, env, envs, registry)?;
            unify_conditional_arm(&mut unified, arm, otherwise.position)?;
            Ok(unified.expect("conditional has at least the else arm"))
        }
        Expr::While { cond, body } => {
            check_boolean_guard(cond, env, envs, registry)?;
            result_type(body, env, envs, registry)
        }
        Expr::For {
            var,
            collection,
            body,
        } => {
            let collection_type = result_type(collection, env, envs, registry)?;
            let elem = match collection_type {
                Type::Vector(elem) => *elem,
                other => return Err(SimplexError::type_mismatch(Type::vector(Type::any()), &other)),
            };
            let scope = envs.push(env);
            envs.declare_type(scope, var, elem)?;
            let body_ty = result_type(body, scope, envs, registry)?;
            Ok(Type::vector(body_ty))
        }
        Expr::VectorLit(elements) => {
            let mut elem: Option<Type> = None;
            for element in elements {
                let ty = result_type(element, env, envs, registry)?;
                match &elem {
                    None => elem = Some(ty),
                    Some(previous) if previous.equals_structurally(&ty) => {}
                    Some(previous) => {
                        return Err(SimplexError::analysis(format!(
                            "inconsistent element types in vector literal: `{previous}` and `{ty}`"
                        ))
                        .at(element.position));
                    }
                }
            }
            Ok(Type::vector(elem.unwrap_or_else(Type::any)))
        }
        Expr::Call { callee, args } => {
            let callee_type = result_type(callee, env, envs, registry)?;
            let (arg_lists, ret) = match callee_type {
                Type::Function { arg_lists, ret } => (arg_lists, ret),
                other => {
                    return Err(SimplexError::analysis(format!(
                        "call target is not a function (found `{other}`)"
                    )));
                }
            };
            let arg_types = arg_type_list(args, env, envs, registry)?;
            check_call_signature(&arg_lists, &arg_types, &describe_callee(callee))?;
            Ok(*ret)
        }
        Expr::MakeData { type_name, args } => {
            let descriptor = envs
                .lookup_type_def(env, type_name)
                .ok_or_else(|| SimplexError::undefined_name(type_name))?;
            if descriptor.fields.len() != args.len() {
                return Err(SimplexError::parameter_count(type_name, args.len()));
            }
            let arg_types = arg_type_list(args, env, envs, registry)?;
            for (field, actual) in descriptor.fields.iter().zip(&arg_types) {
                if !field.declared.matched_by(actual) {
                    return Err(SimplexError::type_mismatch(&field.declared, actual));
                }
            }
            Ok(descriptor.as_type())
        }
        Expr::FieldRef { target, field } => {
            let (_, field_type) = field_of(target, field, env, envs, registry)?;
            Ok(field_type)
        }
        Expr::FieldUpdate {
            target,
            field,
            value,
        } => {
            let (record_type, field_type) = field_of(target, field, env, envs, registry)?;
            let actual = result_type(value, env, envs, registry)?;
            if !field_type.matched_by(&actual) {
                return Err(SimplexError::type_mismatch(&field_type, &actual));
            }
            Ok(record_type)
        }
        Expr::Unary { op, operand } => {
            let target = result_type(operand, env, envs, registry)?;
            let entries = registry
                .get_method(&target, op.method_name())
                .ok_or_else(|| SimplexError::unsupported_operation(&target, op.method_name()))?;
            let entry = select_signature(&entries, &[], &format!("{target}.{}", op.method_name()))?;
            Ok(entry.ret.clone())
        }
        Expr::Binary { op, left, right } => {
            let left_type = result_type(left, env, envs, registry)?;
            let right_type = result_type(right, env, envs, registry)?;
            binary_result(*op, &left_type, &right_type, registry)
        }
        Expr::Logical { left, right, .. } => {
            for side in [left, right] {
                let ty = result_type(side, env, envs, registry)?;
                if !Type::boolean().matched_by(&ty) {
                    return Err(SimplexError::type_mismatch(Type::boolean(), &ty).at(side.position));
                }
            }
            Ok(Type::boolean())
        }
        Expr::MethodCall {
            target,
            method,
            args,
        } => {
            let target_type = result_type(target, env, envs, registry)?;
            if target_type.is_any() {
                return Err(SimplexError::unsupported_operation(&target_type, method));
            }
            let entries = registry
                .get_method(&target_type, method)
                .ok_or_else(|| SimplexError::undefined_method(&target_type, method))?;
            let arg_types = arg_type_list(args, env, envs, registry)?;
            let entry = select_signature(&entries, &arg_types, &format!("{target_type}.{method}"))?;
            Ok(entry.ret.clone())
        }
        Expr::Lambda(lambda) => lambda_type(lambda, env, envs, registry),
    }
}

fn describe_callee(callee: &ExprLoc) -> String {
    match &callee.expr {
        Expr::Name(name) => name.clone(),
        _ => "<callable>".to_owned(),
    }
}

fn arg_type_list(
    args: &[ExprLoc],
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<Vec<Type>> {
    args.iter().map(|arg| result_type(arg, env, envs, registry)).collect()
}

/// Checks actual argument types against a function type's overloaded lists.
fn check_call_signature(arg_lists: &[Vec<Type>], arg_types: &[Type], callee: &str) -> AnalyzeResult<()> {
    let mut arity_matched = false;
    for params in arg_lists {
        if params.len() != arg_types.len() {
            continue;
        }
        arity_matched = true;
        if params.iter().zip(arg_types).all(|(p, a)| p.matched_by(a)) {
            return Ok(());
        }
    }
    if arity_matched {
        let actual = arg_types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        Err(SimplexError::type_mismatch(
            format!("a signature of `{callee}`"),
            format!("({actual})"),
        ))
    } else {
        Err(SimplexError::parameter_count(callee, arg_types.len()))
    }
}

fn check_boolean_guard(
    guard: &ExprLoc,
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<()> {
    let ty = result_type(guard, env, envs, registry)?;
    if !Type::boolean().matched_by(&ty) {
        return Err(SimplexError::type_mismatch(Type::boolean(), &ty).at(guard.position));
    }
    Ok(())
}

fn unify_conditional_arm(
    unified: &mut Option<Type>,
    arm: Type,
    position: crate::location::CodeRange,
) -> AnalyzeResult<()> {
    match unified {
        None => {
            *unified = Some(arm);
            Ok(())
        }
        Some(expected) if expected.equals_structurally(&arm) => Ok(()),
        Some(expected) => Err(SimplexError::analysis(format!(
            "conditional branches produce different types: `{expected}` and `{arm}`"
        ))
        .at(position)),
    }
}

/// Resolves `target.field` to `(record type, field type)`.
fn field_of(
    target: &ExprLoc,
    field: &str,
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<(Type, Type)> {
    let target_type = result_type(target, env, envs, registry)?;
    let Type::Simple(name) = &target_type else {
        return Err(SimplexError::analysis(format!(
            "field access on non-record type `{target_type}`"
        )));
    };
    let Some(descriptor) = envs.lookup_type_def(env, name) else {
        return Err(SimplexError::analysis(format!(
            "field access on non-record type `{target_type}`"
        )));
    };
    let Some(index) = descriptor.field_index(field) else {
        return Err(SimplexError::undefined_field(&target_type, field));
    };
    Ok((target_type, descriptor.fields[index].declared.clone()))
}

fn binary_result(op: BinaryOp, left: &Type, right: &Type, registry: &TypeRegistry) -> AnalyzeResult<Type> {
    let method = op.method_name();
    let entries = registry
        .get_method(left, method)
        .ok_or_else(|| SimplexError::unsupported_operation(left, op.symbol()))?;
    let entry = select_signature(&entries, std::slice::from_ref(right), &format!("{left}.{method}"))?;
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            if !entry.ret.is_named(names::BOOLEAN) {
                return Err(SimplexError::analysis(format!(
                    "`eq` on `{left}` must return Boolean, not `{}`",
                    entry.ret
                )));
            }
            Ok(Type::boolean())
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if !entry.ret.is_named(names::INT) {
                return Err(SimplexError::analysis(format!(
                    "`compare` on `{left}` must return Int, not `{}`",
                    entry.ret
                )));
            }
            Ok(Type::boolean())
        }
        _ => Ok(entry.ret.clone()),
    }
}

fn lambda_type(
    lambda: &Rc<LambdaDef>,
    env: EnvId,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
) -> AnalyzeResult<Type> {
    let ret = lambda
        .ret
        .clone()
        .ok_or_else(|| SimplexError::internal("lambda without a return annotation"))?;
    check_type_resolves(&ret, env, envs)?;
    let scope = envs.push(env);
    declare_params(&lambda.params, scope, envs)?;
    let actual = body_type(&lambda.body, scope, envs, registry)?;
    if !ret.matched_by(&actual) {
        return Err(SimplexError::type_mismatch(&ret, &actual));
    }
    Ok(Type::function(
        vec![lambda.params.iter().map(|p| p.declared.clone()).collect()],
        ret,
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{builtins::Builtin, error::ErrorKind, parse::parse};

    fn analyze_product_expr(source: &str) -> AnalyzeResult<Type> {
        let model = parse(&format!("product \"p\" {{ {source} }}")).expect("parses");
        let mut envs = EnvArena::new();
        let root = envs.root();
        let mut registry = TypeRegistry::with_builtins();
        Builtin::install_all(&mut envs, root);
        let errors = install_static(&model.definitions, root, &mut envs, &mut registry);
        assert!(errors.is_empty(), "install errors: {errors:?}");
        let scope = envs.push(root);
        body_type(&model.products[0].body, scope, &mut envs, &registry)
    }

    fn analyze_model(source: &str) -> Vec<SimplexError> {
        let model = parse(source).expect("parses");
        let mut envs = EnvArena::new();
        let root = envs.root();
        let mut registry = TypeRegistry::with_builtins();
        Builtin::install_all(&mut envs, root);
        let mut errors = install_static(&model.definitions, root, &mut envs, &mut registry);
        errors.extend(validate_definitions(&model.definitions, root, &mut envs, &registry));
        for product in &model.products {
            if let Err(err) = validate_product(product, root, &mut envs, &registry) {
                errors.push(err);
            }
        }
        errors
    }

    #[test]
    fn arithmetic_and_let() {
        let ty = analyze_product_expr("let x: Int = 3; let y: Int = 4; x * x + y * y").expect("types");
        assert_eq!(ty, Type::int());
    }

    /// Re-letting a name in the same body shadows instead of redefining.
    #[test]
    fn let_shadowing_in_one_body() {
        let ty = analyze_product_expr("let x = 1; let x = \"two\"; x").expect("types");
        assert_eq!(ty, Type::string());
    }

    #[test]
    fn validate_is_the_typeless_surface() {
        let model = parse("product \"p\" { 1 + 2 }").expect("parses");
        let mut envs = EnvArena::new();
        let root = envs.root();
        let registry = TypeRegistry::with_builtins();
        assert!(validate(&model.products[0].body[0], root, &mut envs, &registry).is_ok());
    }

    #[test]
    fn conditional_unifies_branch_types() {
        let ty = analyze_product_expr("if (1 < 2) then 3 else 4").expect("types");
        assert_eq!(ty, Type::int());
    }

    #[test]
    fn conditional_with_mixed_branches_fails() {
        let err = analyze_product_expr("if (1 < 2) then 3 else \"x\"").expect_err("mixed");
        assert_eq!(err.kind, ErrorKind::Analysis);
    }

    #[test]
    fn conditional_guard_must_be_boolean() {
        let err = analyze_product_expr("if (1) then 2 else 3").expect_err("guard");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn for_each_over_vector() {
        let ty = analyze_product_expr("let v: [Int] = [1, 2, 3]; for i in v { i * i }").expect("types");
        assert_eq!(ty, Type::vector(Type::int()));
    }

    #[test]
    fn for_each_over_non_vector_fails() {
        let err = analyze_product_expr("for i in 3 { i }").expect_err("not a vector");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn mixed_vector_literal_fails() {
        let err = analyze_product_expr("[1, \"two\"]").expect_err("mixed elements");
        assert_eq!(err.kind, ErrorKind::Analysis);
        assert!(err.message.contains("inconsistent element types"));
    }

    #[test]
    fn let_annotation_must_match() {
        let err = analyze_product_expr("let x: Int = 1.5").expect_err("annotation mismatch");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    /// `[Any]` is reachable through an annotation because `Any` matches any
    /// element type.
    #[test]
    fn any_vector_annotation_is_allowed() {
        let ty = analyze_product_expr("let v: [Any] = [1, 2]; v").expect("types");
        assert_eq!(ty, Type::vector(Type::any()));
    }

    #[test]
    fn undefined_name_reports_undefined() {
        let err = analyze_product_expr("nope + 1").expect_err("undefined");
        assert_eq!(err.kind, ErrorKind::Undefined);
    }

    #[test]
    fn operators_resolve_through_method_tables() {
        assert_eq!(analyze_product_expr("1 + 2").expect("types"), Type::int());
        assert_eq!(analyze_product_expr("1 + 2.0").expect("types"), Type::float());
        assert_eq!(analyze_product_expr("1 < 2").expect("types"), Type::boolean());
        assert_eq!(analyze_product_expr("\"a\" + \"b\"").expect("types"), Type::string());
    }

    #[test]
    fn operator_without_method_is_unsupported() {
        let err = analyze_product_expr("true + false").expect_err("no plus on Boolean");
        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn builtin_calls_are_typed() {
        assert_eq!(
            analyze_product_expr("cuboid(1.0, 2.0, 3.0)").expect("types"),
            Type::solid()
        );
        let err = analyze_product_expr("cuboid(1.0, 2.0)").expect_err("arity");
        assert_eq!(err.kind, ErrorKind::ParameterCount);
    }

    #[test]
    fn method_call_on_solid() {
        assert_eq!(
            analyze_product_expr("cuboid(1.0, 1.0, 1.0)->move(1.0, 0.0, 0.0)").expect("types"),
            Type::solid()
        );
    }

    #[test]
    fn data_definition_round_trip() {
        let errors = analyze_model(
            "data Pt(x: Float, y: Float)\nproduct \"p\" { let p = Pt(1.0, 2.0); p.x + p.y }",
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn field_update_type_checks() {
        let errors = analyze_model("data Pt(x: Float, y: Float)\nproduct \"p\" { let p = Pt(1.0, 2.0); p.x := 5 }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn unknown_field_reports_undefined() {
        let errors = analyze_model("data Pt(x: Float, y: Float)\nproduct \"p\" { Pt(1.0, 2.0).q }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Undefined);
    }

    #[test]
    fn recursive_function_validates() {
        let errors = analyze_model(
            "fun fact(n: Int): Int { if (n <= 1) then 1 else n * fact(n - 1) }\nproduct \"p\" { fact(5) }",
        );
        assert_eq!(errors, vec![]);
    }

    /// Sibling definitions keep reporting after one fails.
    #[test]
    fn sibling_definitions_continue_after_error() {
        let errors = analyze_model("let a: Int = \"no\"\nlet b: Float = 2");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn function_body_must_match_return_type() {
        let errors = analyze_model("fun f(n: Int): Int { \"nope\" }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn user_method_on_data_type() {
        let errors = analyze_model(
            "data Pt(x: Float, y: Float)\nmeth Pt.norm(): Float { (self.x * self.x + self.y * self.y)->sqrt() }\nproduct \"p\" { Pt(3.0, 4.0)->norm() }",
        );
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn method_dispatch_on_any_is_rejected() {
        let errors = analyze_model("let v: Any = 3\nproduct \"p\" { v->to_float() }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn logical_operands_must_be_boolean() {
        let err = analyze_product_expr("1 and true").expect_err("non-boolean");
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn lambda_types_as_function() {
        let ty = analyze_product_expr("lambda(x: Int): Int { x + 1 }").expect("types");
        assert_eq!(ty, Type::function(vec![vec![Type::int()]], Type::int()));
    }

    #[test]
    fn errors_carry_locations() {
        let err = analyze_product_expr("1 +\ntrue").expect_err("bad operand");
        assert!(err.location.is_some());
    }
}
