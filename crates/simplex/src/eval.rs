//! The tree-walking evaluator.
//!
//! Evaluation is single-threaded and recursion-driven: every expression
//! completes before its parent returns, operands evaluate left to right,
//! and the only suspension is the error channel unwinding to the driver.
//! Operator and method dispatch both route through the registry's operation
//! tables; there is no other dispatch mechanism.

use std::{cell::RefCell, rc::Rc};

use crate::{
    analyze,
    ast::{BinaryOp, Definition, Expr, ExprLoc, LogicalOp, MethodDef},
    env::{EnvArena, EnvId},
    error::{EvalResult, SimplexError},
    ops,
    registry::{select_signature, MethodImpl, TypeRegistry},
    types::Type,
    value::{ClosureBody, ClosureValue, RecordValue, Value},
};

/// Maximum depth of nested closure/method calls.
///
/// The evaluator is recursion-driven, so user-level recursion consumes the
/// host stack; this bound turns an impending overflow into `Evaluation`.
const MAX_CALL_DEPTH: usize = 256;

/// Walks the AST producing values.
///
/// Borrows the environment arena and the (frozen) registry for the duration
/// of one run; products share one evaluator so top-level state persists
/// across them.
pub(crate) struct Evaluator<'a> {
    envs: &'a mut EnvArena,
    registry: &'a TypeRegistry,
    call_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(envs: &'a mut EnvArena, registry: &'a TypeRegistry) -> Self {
        Self {
            envs,
            registry,
            call_depth: 0,
        }
    }

    /// The value pass of the two-pass install for top-level definitions.
    ///
    /// Names and type descriptors were declared by the analyzer in the same
    /// environment; this pass binds initial values in source order.
    pub fn install_values(&mut self, definitions: &[Definition], env: EnvId) -> EvalResult<()> {
        for def in definitions {
            match def {
                Definition::Variable(var) => {
                    let value = self.evaluate(&var.init, env)?;
                    self.envs
                        .add_value(env, &var.name, value)
                        .map_err(|e| e.at(var.position))?;
                }
                Definition::Function(fun) => {
                    let closure = Value::Closure(Rc::new(ClosureValue {
                        name: Some(fun.name.clone()),
                        params: fun.params.clone(),
                        ret: fun.ret.clone(),
                        body: ClosureBody::Function(Rc::clone(fun)),
                        env,
                    }));
                    self.envs
                        .add_value(env, &fun.name, closure)
                        .map_err(|e| e.at(fun.position))?;
                }
                // Methods and data types live in the registry.
                Definition::Method(_) | Definition::Data(_) => {}
            }
        }
        Ok(())
    }

    /// Two-pass install for a function's local definitions inside a fresh
    /// call scope: declare every local first so they can be mutually
    /// recursive, then bind the closure values.
    fn install_locals(&mut self, locals: &[Definition], env: EnvId) -> EvalResult<()> {
        for local in locals {
            if let Definition::Function(fun) = local {
                self.envs
                    .declare_type(env, &fun.name, fun.function_type())
                    .map_err(|e| e.at(fun.position))?;
            }
        }
        self.install_values(locals, env)
    }

    pub fn evaluate(&mut self, expr: &ExprLoc, env: EnvId) -> EvalResult<Value> {
        self.eval_inner(expr, env).map_err(|e| e.at(expr.position))
    }

    fn eval_inner(&mut self, expr: &ExprLoc, env: EnvId) -> EvalResult<Value> {
        match &expr.expr {
            Expr::IntLit(v) => Ok(Value::Int(*v)),
            Expr::FloatLit(v) => Ok(Value::Float(*v)),
            Expr::BoolLit(v) => Ok(Value::Bool(*v)),
            Expr::StrLit(s) => Ok(Value::Str(Rc::clone(s))),
            Expr::Name(name) => self.envs.lookup_value(env, name),
            Expr::Assign { name, value } => {
                let value = self.evaluate(value, env)?;
                self.envs.update_value(env, name, value.clone())?;
                Ok(value)
            }
            Expr::Block(body) => {
                let scope = self.envs.push(env);
                self.eval_body(body, scope)
            }
            Expr::Let {
                name,
                declared,
                init,
            } => {
                let value = self.evaluate(init, env)?;
                let bound = declared.clone().unwrap_or_else(|| value.value_type());
                self.envs.declare_type(env, name, bound)?;
                self.envs.add_value(env, name, value.clone())?;
                Ok(value)
            }
            Expr::Cond {
                clauses,
                otherwise,
            } => {
                for clause in clauses {
                    if self.evaluate(&clause.guard, env)?.is_truthy() {
                        return self.evaluate(&clause.value, env);
                    }
                }
                self.evaluate(otherwise, env)
            }
            Expr::While { cond, body } => {
                let mut last = Value::Bool(false);
                while self.evaluate(cond, env)?.is_truthy() {
                    last = self.evaluate(body, env)?;
                }
                Ok(last)
            }
            Expr::For {
                var,
                collection,
                body,
            } => self.eval_for(var, collection, body, env),
            Expr::VectorLit(elements) => {
                let values: Vec<Value> = elements
                    .iter()
                    .map(|element| self.evaluate(element, env))
                    .collect::<EvalResult<_>>()?;
                let elem = values.first().map_or_else(Type::any, Value::value_type);
                Ok(Value::vector_of(elem, values))
            }
            Expr::Call { callee, args } => {
                let callee_value = self.evaluate(callee, env)?;
                let args = self.eval_args(args, env)?;
                match callee_value {
                    Value::Builtin(builtin) => builtin.call(&args),
                    Value::Closure(closure) => self.call_closure(&closure, args),
                    other => Err(SimplexError::evaluation(format!(
                        "value of type `{}` is not callable",
                        other.value_type()
                    ))),
                }
            }
            Expr::MakeData { type_name, args } => {
                let descriptor = self
                    .envs
                    .lookup_type_def(env, type_name)
                    .ok_or_else(|| SimplexError::undefined_name(type_name))?;
                let values = self.eval_args(args, env)?;
                if values.len() != descriptor.fields.len() {
                    return Err(SimplexError::parameter_count(type_name, values.len()));
                }
                for (field, value) in descriptor.fields.iter().zip(&values) {
                    let actual = value.value_type();
                    if !field.declared.matched_by(&actual) {
                        return Err(SimplexError::type_mismatch(&field.declared, &actual));
                    }
                }
                Ok(Value::Record(Rc::new(RecordValue {
                    descriptor,
                    fields: RefCell::new(values),
                })))
            }
            Expr::FieldRef { target, field } => {
                let record = self.eval_record(target, env)?;
                let index = record
                    .descriptor
                    .field_index(field)
                    .ok_or_else(|| SimplexError::undefined_field(record.descriptor.as_type(), field))?;
                let value = record.fields.borrow()[index].clone();
                Ok(value)
            }
            Expr::FieldUpdate {
                target,
                field,
                value,
            } => {
                let record = self.eval_record(target, env)?;
                let index = record
                    .descriptor
                    .field_index(field)
                    .ok_or_else(|| SimplexError::undefined_field(record.descriptor.as_type(), field))?;
                let new_value = self.evaluate(value, env)?;
                let field_type = &record.descriptor.fields[index].declared;
                let actual = new_value.value_type();
                if !field_type.matched_by(&actual) {
                    return Err(SimplexError::type_mismatch(field_type, &actual));
                }
                record.fields.borrow_mut()[index] = new_value;
                Ok(Value::Record(record))
            }
            Expr::Unary { op, operand } => {
                let target = self.evaluate(operand, env)?;
                self.dispatch(&target, op.method_name(), &[])
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left, env)?;
                let right = self.evaluate(right, env)?;
                self.eval_binary(*op, &left, right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.evaluate(left, env)?.is_truthy();
                match op {
                    LogicalOp::And if !left => Ok(Value::Bool(false)),
                    LogicalOp::Or if left => Ok(Value::Bool(true)),
                    _ => Ok(Value::Bool(self.evaluate(right, env)?.is_truthy())),
                }
            }
            Expr::MethodCall {
                target,
                method,
                args,
            } => {
                let target = self.evaluate(target, env)?;
                let args = self.eval_args(args, env)?;
                self.dispatch(&target, method, &args)
            }
            Expr::Lambda(lambda) => {
                let ret = lambda
                    .ret
                    .clone()
                    .ok_or_else(|| SimplexError::internal("lambda without a return annotation"))?;
                Ok(Value::Closure(Rc::new(ClosureValue {
                    name: None,
                    params: lambda.params.clone(),
                    ret,
                    body: ClosureBody::Lambda(Rc::clone(lambda)),
                    env,
                })))
            }
        }
    }

    /// Evaluates a definition body: expressions in order, the last value is
    /// the result. Mirrors the analyzer: each body-level `let` opens an
    /// implicit nested scope for the rest of the body.
    pub fn eval_body(&mut self, body: &[ExprLoc], env: EnvId) -> EvalResult<Value> {
        let mut env = env;
        let mut last = Value::Bool(false);
        for expr in body {
            if matches!(expr.expr, Expr::Let { .. }) {
                env = self.envs.push(env);
            }
            last = self.evaluate(expr, env)?;
        }
        Ok(last)
    }

    /// Evaluates a product body, collecting every expression's value.
    pub fn eval_product_body(&mut self, body: &[ExprLoc], env: EnvId) -> EvalResult<Vec<Value>> {
        let mut env = env;
        let mut results = Vec::with_capacity(body.len());
        for expr in body {
            if matches!(expr.expr, Expr::Let { .. }) {
                env = self.envs.push(env);
            }
            results.push(self.evaluate(expr, env)?);
        }
        Ok(results)
    }

    fn eval_args(&mut self, args: &[ExprLoc], env: EnvId) -> EvalResult<Vec<Value>> {
        args.iter().map(|arg| self.evaluate(arg, env)).collect()
    }

    fn eval_record(&mut self, target: &ExprLoc, env: EnvId) -> EvalResult<Rc<RecordValue>> {
        match self.evaluate(target, env)? {
            Value::Record(record) => Ok(record),
            other => Err(SimplexError::evaluation(format!(
                "field access on non-record value of type `{}`",
                other.value_type()
            ))),
        }
    }

    fn eval_for(&mut self, var: &str, collection: &ExprLoc, body: &ExprLoc, env: EnvId) -> EvalResult<Value> {
        let collection_value = self.evaluate(collection, env)?;
        let vector = match collection_value {
            Value::Vector(vector) => vector,
            other => {
                return Err(SimplexError::evaluation(format!(
                    "for-each requires a vector, found `{}`",
                    other.value_type()
                )));
            }
        };
        let (elem, items) = {
            let vector = vector.borrow();
            (vector.elem.clone(), vector.values.clone())
        };
        let scope = self.envs.push(env);
        self.envs.declare_type(scope, var, elem)?;
        if items.is_empty() {
            // The body never runs, so recover its statically-computed type:
            // the empty result must still match the expression's result
            // type, which is the body's element type, not the input's.
            let body_elem = analyze::result_type(body, scope, self.envs, self.registry)?;
            return Ok(Value::vector_of(body_elem, Vec::new()));
        }
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            // The index variable updates in place across iterations.
            self.envs.add_value(scope, var, item)?;
            results.push(self.evaluate(body, scope)?);
        }
        // The result element type is taken from the first result.
        let result_elem = results.first().expect("loop ran at least once").value_type();
        Ok(Value::vector_of(result_elem, results))
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Value, right: Value) -> EvalResult<Value> {
        match op {
            BinaryOp::Eq => self.dispatch(left, "eq", std::slice::from_ref(&right)),
            BinaryOp::Ne => {
                let eq = self.dispatch(left, "eq", std::slice::from_ref(&right))?;
                Ok(Value::Bool(!eq.is_truthy()))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = match self.dispatch(left, "compare", std::slice::from_ref(&right))? {
                    Value::Int(ordering) => ordering,
                    other => {
                        return Err(SimplexError::evaluation(format!(
                            "`compare` must return Int, got `{}`",
                            other.value_type()
                        )));
                    }
                };
                let result = match op {
                    BinaryOp::Lt => ordering < 0,
                    BinaryOp::Le => ordering <= 0,
                    BinaryOp::Gt => ordering > 0,
                    _ => ordering >= 0,
                };
                Ok(Value::Bool(result))
            }
            _ => self.dispatch(left, op.method_name(), std::slice::from_ref(&right)),
        }
    }

    /// Routes a method call through the target type's operation table,
    /// dispatching on the runtime type of the receiver (left dispatch).
    fn dispatch(&mut self, target: &Value, method: &str, args: &[Value]) -> EvalResult<Value> {
        let target_type = target.value_type();
        let entries = self
            .registry
            .get_method(&target_type, method)
            .ok_or_else(|| SimplexError::undefined_method(&target_type, method))?;
        let arg_types: Vec<Type> = args.iter().map(Value::value_type).collect();
        let entry = select_signature(&entries, &arg_types, &format!("{target_type}.{method}"))?;
        match entry.imp.clone() {
            MethodImpl::Builtin => ops::apply_builtin(target, method, args),
            MethodImpl::User(def) => self.call_method(&def, target, args),
        }
    }

    fn call_closure(&mut self, closure: &ClosureValue, args: Vec<Value>) -> EvalResult<Value> {
        self.enter_call()?;
        let result = self.run_closure(closure, args);
        self.call_depth -= 1;
        result
    }

    fn run_closure(&mut self, closure: &ClosureValue, args: Vec<Value>) -> EvalResult<Value> {
        if args.len() != closure.params.len() {
            let name = closure.name.as_deref().unwrap_or("<lambda>");
            return Err(SimplexError::parameter_count(name, args.len()));
        }
        let scope = self.envs.push(closure.env);
        for (param, arg) in closure.params.iter().zip(args) {
            self.envs.declare_type(scope, &param.name, param.declared.clone())?;
            self.envs.add_value(scope, &param.name, arg)?;
        }
        let body: &[ExprLoc] = match &closure.body {
            ClosureBody::Function(fun) => {
                self.install_locals(&fun.locals, scope)?;
                &fun.body
            }
            ClosureBody::Lambda(lambda) => &lambda.body,
        };
        let result = self.eval_body(body, scope)?;
        check_return(&closure.ret, &result)?;
        Ok(result)
    }

    /// Runs a user method: a fresh scope on the root environment with `self`
    /// bound to the receiver.
    fn call_method(&mut self, def: &Rc<MethodDef>, target: &Value, args: &[Value]) -> EvalResult<Value> {
        self.enter_call()?;
        let result = self.run_method(def, target, args);
        self.call_depth -= 1;
        result
    }

    fn run_method(&mut self, def: &Rc<MethodDef>, target: &Value, args: &[Value]) -> EvalResult<Value> {
        let root = self.envs.root();
        let scope = self.envs.push(root);
        self.envs.declare_type(scope, "self", def.target.clone())?;
        self.envs.add_value(scope, "self", target.clone())?;
        for (param, arg) in def.params.iter().zip(args) {
            self.envs.declare_type(scope, &param.name, param.declared.clone())?;
            self.envs.add_value(scope, &param.name, arg.clone())?;
        }
        let result = self.eval_body(&def.body, scope)?;
        check_return(&def.ret, &result)?;
        Ok(result)
    }

    fn enter_call(&mut self) -> EvalResult<()> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(SimplexError::evaluation("recursion depth exceeded"));
        }
        self.call_depth += 1;
        Ok(())
    }
}

fn check_return(declared: &Type, value: &Value) -> EvalResult<()> {
    let actual = value.value_type();
    if declared.matched_by(&actual) {
        Ok(())
    } else {
        Err(SimplexError::type_mismatch(declared, &actual))
    }
}
