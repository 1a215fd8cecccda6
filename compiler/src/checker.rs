//! Static checker
//!
//! Walks every user method body and then the main program, computing a type
//! for each expression and failing on the first violation. Runs after the
//! subtype pass so `isa` is final, and before dispatch construction.

use crate::class_info::{MethodKey, MethodKind};
use crate::error::{SemanticError, SemanticErrorKind, SemanticResult};
use crate::ids::{ClassId, MethodId};
use crate::registry::{BuiltinClasses, ClassRegistry};
use crate::scope::{ScopeKind, ScopeTree, VariableInfo};
use log::{debug, info, trace};
use parser::{Expr, ExprKind, Ident, Operator, Stmt, StmtKind};
use source_map::{FileId, SourceLocation};

/// Static type of an expression. `null` has no class and fits any target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    Class(ClassId),
    Null,
}

pub struct Checker<'r> {
    registry: &'r ClassRegistry,
    builtins: BuiltinClasses,
    scopes: ScopeTree,
    file: FileId,
    current_class: Option<ClassId>,
}

/// Check all user methods, then the main program
pub fn check_program(
    registry: &ClassRegistry,
    builtins: BuiltinClasses,
    main: &[Stmt],
    main_file: FileId,
) -> SemanticResult<()> {
    let mut checker = Checker::new(registry, builtins, main_file);
    for class in registry.classes() {
        for &method in class.methods.values() {
            checker.check_method(method)?;
        }
    }
    checker.check_main(main, main_file)?;
    info!("static check passed ({} scopes)", checker.scopes.len());
    Ok(())
}

fn fail(kind: SemanticErrorKind, message: String, location: SourceLocation) -> SemanticError {
    SemanticError::new(kind, message).at(location)
}

impl<'r> Checker<'r> {
    pub fn new(registry: &'r ClassRegistry, builtins: BuiltinClasses, file: FileId) -> Self {
        Self {
            registry,
            builtins,
            scopes: ScopeTree::new(),
            file,
            current_class: None,
        }
    }

    pub fn check_method(&mut self, id: MethodId) -> SemanticResult<()> {
        let method = self.registry.method(id);
        let MethodKind::User(body) = &method.kind else {
            return Ok(());
        };
        debug!(
            "checking {}.{}",
            self.registry.class_name(method.owner),
            method.key
        );
        self.file = method.file();
        self.current_class = Some(method.owner);
        self.scopes.push_root(ScopeKind::Method, Some(id));
        for param in &method.params {
            self.scopes.declare(VariableInfo {
                name: param.name.clone(),
                ty: param.ty,
                location: param.location,
            })?;
        }
        let result = self.check_block(body);
        self.scopes.pop();
        self.current_class = None;
        result
    }

    pub fn check_main(&mut self, main: &[Stmt], file: FileId) -> SemanticResult<()> {
        self.file = file;
        self.current_class = None;
        self.scopes.push_root(ScopeKind::Main, None);
        let result = self.check_block(main);
        self.scopes.pop();
        result
    }

    fn loc(&self, span: parser::Span) -> SourceLocation {
        span.at(self.file)
    }

    fn type_name(&self, ty: Ty) -> &str {
        match ty {
            Ty::Class(id) => self.registry.class_name(id),
            Ty::Null => "null",
        }
    }

    fn self_type(&self) -> ClassId {
        self.current_class.unwrap_or(self.builtins.object)
    }

    fn is_numeric(&self, ty: Ty) -> bool {
        matches!(ty, Ty::Class(id) if self.builtins.is_numeric(id))
    }

    fn is(&self, ty: Ty, class: ClassId) -> bool {
        ty == Ty::Class(class)
    }

    fn resolve_class(&self, ident: &Ident) -> SemanticResult<ClassId> {
        self.registry
            .lookup(&ident.name)
            .map_err(|e| e.at(self.loc(ident.span)))
    }

    fn check_block(&mut self, stmts: &[Stmt]) -> SemanticResult<()> {
        for stmt in stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_nested(&mut self, stmts: &[Stmt]) -> SemanticResult<()> {
        self.scopes.push_block();
        let result = self.check_block(stmts);
        self.scopes.pop();
        result
    }

    /// Variables accept numeric values across Integer and Float
    fn variable_accepts(&self, target: ClassId, value: Ty) -> bool {
        match value {
            Ty::Null => true,
            Ty::Class(class) => {
                self.registry.isa(class, target)
                    || (self.builtins.is_numeric(class) && self.builtins.is_numeric(target))
            }
        }
    }

    fn field_accepts(&self, target: ClassId, value: Ty) -> bool {
        match value {
            Ty::Null => true,
            Ty::Class(class) => self.registry.isa(class, target),
        }
    }

    fn assign_error(&self, value: Ty, name: &str, location: SourceLocation) -> SemanticError {
        fail(
            SemanticErrorKind::TypeMismatch,
            format!("Cannot assign a {} to {}", self.type_name(value), name),
            location,
        )
    }

    fn check_condition(&mut self, cond: &Expr) -> SemanticResult<()> {
        let ty = self.check_expr(cond)?;
        if !self.is(ty, self.builtins.boolean) {
            return Err(fail(
                SemanticErrorKind::InvalidCondition,
                "Condition must be a Boolean".to_string(),
                self.loc(cond.span),
            ));
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> SemanticResult<()> {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                let declared = self.resolve_class(ty)?;
                if let Some(init) = init {
                    let value = self.check_expr(init)?;
                    if !self.variable_accepts(declared, value) {
                        return Err(self.assign_error(value, &name.name, self.loc(init.span)));
                    }
                }
                let location = self.loc(name.span);
                self.scopes.declare(VariableInfo {
                    name: name.name.clone(),
                    ty: declared,
                    location,
                })
            }
            StmtKind::Assign { name, value } => {
                let target = self.scopes.resolve(&name.name, self.loc(name.span))?.ty;
                let value_ty = self.check_expr(value)?;
                if !self.variable_accepts(target, value_ty) {
                    return Err(self.assign_error(value_ty, &name.name, self.loc(value.span)));
                }
                Ok(())
            }
            StmtKind::FieldAssign { field, value } => {
                let target = self.field_type(field)?;
                let value_ty = self.check_expr(value)?;
                if !self.field_accepts(target, value_ty) {
                    return Err(self.assign_error(value_ty, &field.name, self.loc(value.span)));
                }
                Ok(())
            }
            StmtKind::While { cond, body } => {
                self.check_condition(cond)?;
                self.check_nested(body)
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.check_condition(cond)?;
                self.check_nested(then_body)?;
                match else_body {
                    Some(else_body) => self.check_nested(else_body),
                    None => Ok(()),
                }
            }
            StmtKind::Return(value) => self.check_return(value.as_ref(), stmt),
            StmtKind::Call(call) => self.check_expr(call).map(|_| ()),
        }
    }

    fn check_return(&mut self, value: Option<&Expr>, stmt: &Stmt) -> SemanticResult<()> {
        let location = self.loc(stmt.span);
        let Some(method) = self.scopes.current_method() else {
            return Err(fail(
                SemanticErrorKind::IllegalReturn,
                "Cannot return in the main program".to_string(),
                location,
            ));
        };
        let return_type = self.registry.method(method).return_type;
        match (value, return_type) {
            (Some(_), None) => Err(fail(
                SemanticErrorKind::IllegalReturn,
                "Return not necessary".to_string(),
                location,
            )),
            (Some(value), Some(required)) => {
                let given = self.check_expr(value)?;
                if let Ty::Class(class) = given {
                    if !self.registry.isa(class, required) {
                        return Err(fail(
                            SemanticErrorKind::TypeMismatch,
                            format!(
                                "Required return type : {}. Given : {}",
                                self.registry.class_name(required),
                                self.registry.class_name(class)
                            ),
                            self.loc(value.span),
                        ));
                    }
                }
                Ok(())
            }
            (None, _) => Ok(()),
        }
    }

    fn field_type(&self, field: &Ident) -> SemanticResult<ClassId> {
        let location = self.loc(field.span);
        let Some(class) = self.current_class else {
            return Err(fail(
                SemanticErrorKind::FieldOutsideMethod,
                format!("field {} cannot be used in the main program", field.name),
                location,
            ));
        };
        self.registry
            .find_field(class, &field.name)
            .map(|info| info.ty)
            .ok_or_else(|| {
                fail(
                    SemanticErrorKind::UndefinedField,
                    format!(
                        "class {} has no field {}",
                        self.registry.class_name(class),
                        field.name
                    ),
                    location,
                )
            })
    }

    pub fn check_expr(&mut self, expr: &Expr) -> SemanticResult<Ty> {
        let ty = match &expr.kind {
            ExprKind::Integer(_) => Ty::Class(self.builtins.integer),
            ExprKind::Float(_) => Ty::Class(self.builtins.float),
            ExprKind::String(_) => Ty::Class(self.builtins.string),
            ExprKind::True | ExprKind::False => Ty::Class(self.builtins.boolean),
            ExprKind::Null => Ty::Null,
            ExprKind::SelfRef => Ty::Class(self.self_type()),
            ExprKind::Var(name) => Ty::Class(self.scopes.resolve(&name.name, self.loc(name.span))?.ty),
            ExprKind::Field(field) => Ty::Class(self.field_type(field)?),
            ExprKind::New(class) => {
                let id = self.resolve_class(class)?;
                if self.registry.class(id).is_value_class() {
                    return Err(fail(
                        SemanticErrorKind::InvalidNew,
                        "invalid use of new operator".to_string(),
                        self.loc(expr.span),
                    ));
                }
                Ty::Class(id)
            }
            ExprKind::Is { left, right } => {
                self.check_expr(left)?;
                self.check_expr(right)?;
                Ty::Class(self.builtins.boolean)
            }
            ExprKind::Isa { expr: inner, class } => {
                self.check_expr(inner)?;
                self.resolve_class(class)?;
                Ty::Class(self.builtins.boolean)
            }
            ExprKind::Not(operand) => {
                let ty = self.check_expr(operand)?;
                if !self.is(ty, self.builtins.boolean) {
                    return Err(fail(
                        SemanticErrorKind::InvalidCondition,
                        "Operand of not must be a Boolean".to_string(),
                        self.loc(operand.span),
                    ));
                }
                ty
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                let receiver_ty = self.check_expr(receiver)?;
                let Ty::Class(class) = receiver_ty else {
                    return Err(fail(
                        SemanticErrorKind::NullReceiver,
                        format!("Cannot call {} on null", method.name),
                        self.loc(receiver.span),
                    ));
                };
                self.check_named_call(class, method, args)?
            }
            ExprKind::SelfCall { method, args } => {
                let class = self.self_type();
                self.check_named_call(class, method, args)?
            }
            ExprKind::Binary { op, left, right } => {
                let left_ty = self.check_expr(left)?;
                let right_ty = self.check_expr(right)?;
                let location = self.loc(expr.span);
                if op.is_equality() {
                    self.check_equality(*op, left_ty, right_ty, location)?
                } else if op.is_ordering() {
                    self.check_ordering(*op, left_ty, right_ty, location)?
                } else {
                    self.check_arithmetic(*op, left_ty, right_ty, location)?
                }
            }
        };
        trace!(
            "expression {}..{} : {}",
            expr.span.start,
            expr.span.end,
            self.type_name(ty)
        );
        Ok(ty)
    }

    fn check_named_call(&mut self, class: ClassId, method: &Ident, args: &[Expr]) -> SemanticResult<Ty> {
        let location = self.loc(method.span);
        let key = MethodKey::named(method.name.clone());
        let id = self.registry.find_method(class, &key).ok_or_else(|| {
            fail(
                SemanticErrorKind::UndefinedMethod,
                format!(
                    "class {} has no {} method",
                    self.registry.class_name(class),
                    method.name
                ),
                location,
            )
        })?;
        let mut arg_types = Vec::with_capacity(args.len());
        for arg in args {
            arg_types.push(self.check_expr(arg)?);
        }
        self.check_arguments(class, id, &arg_types, location)
    }

    /// Positional argument check; the result is the declared return type or the receiver's
    fn check_arguments(
        &self,
        receiver: ClassId,
        method: MethodId,
        args: &[Ty],
        location: SourceLocation,
    ) -> SemanticResult<Ty> {
        let info = self.registry.method(method);
        for (index, param) in info.params.iter().enumerate() {
            let Some(&arg) = args.get(index) else {
                return Err(fail(
                    SemanticErrorKind::ArgumentCount,
                    format!("argument #{} is missing", index + 1),
                    location,
                ));
            };
            if !self.field_accepts(param.ty, arg) {
                return Err(fail(
                    SemanticErrorKind::TypeMismatch,
                    format!(
                        "argument #{} is not of {} type",
                        index + 1,
                        self.registry.class_name(param.ty)
                    ),
                    location,
                ));
            }
        }
        if args.len() > info.params.len() {
            return Err(fail(
                SemanticErrorKind::ArgumentCount,
                format!("only {} arguments were expected", info.params.len()),
                location,
            ));
        }
        Ok(Ty::Class(info.return_type.unwrap_or(receiver)))
    }

    /// Operator on a class without a native rule: resolve it as a method
    fn check_operator_call(
        &self,
        op: Operator,
        class: ClassId,
        right: Ty,
        location: SourceLocation,
    ) -> SemanticResult<Ty> {
        let method = self
            .registry
            .find_method(class, &MethodKey::Operator(op))
            .ok_or_else(|| {
                fail(
                    SemanticErrorKind::UndefinedMethod,
                    format!(
                        "class {} has no {} method",
                        self.registry.class_name(class),
                        op
                    ),
                    location,
                )
            })?;
        self.check_arguments(class, method, &[right], location)
    }

    /// String and Boolean restrictions shared by `= != < <= > >=`
    fn check_comparable(&self, left: Ty, right: Ty, location: SourceLocation) -> SemanticResult<()> {
        let string = self.builtins.string;
        let boolean = self.builtins.boolean;
        let is_string = |ty: Ty| ty == Ty::Class(string);
        let mismatched_string = match (left, right) {
            (Ty::Null, _) | (_, Ty::Null) => false,
            _ => is_string(left) != is_string(right),
        };
        if mismatched_string {
            return Err(fail(
                SemanticErrorKind::InvalidComparison,
                "Cannot compare String with something else".to_string(),
                location,
            ));
        }
        if self.is(left, boolean) || self.is(right, boolean) {
            return Err(fail(
                SemanticErrorKind::InvalidComparison,
                "Cannot compare boolean".to_string(),
                location,
            ));
        }
        Ok(())
    }

    fn check_equality(
        &self,
        op: Operator,
        left: Ty,
        right: Ty,
        location: SourceLocation,
    ) -> SemanticResult<Ty> {
        self.check_comparable(left, right, location)?;
        match left {
            Ty::Class(class) if self.registry.class(class).builtin.is_none() => {
                match self.registry.find_method(class, &MethodKey::Operator(op)) {
                    Some(_) => self.check_operator_call(op, class, right, location),
                    None => Ok(Ty::Class(self.builtins.boolean)),
                }
            }
            _ => Ok(Ty::Class(self.builtins.boolean)),
        }
    }

    fn check_ordering(
        &self,
        op: Operator,
        left: Ty,
        right: Ty,
        location: SourceLocation,
    ) -> SemanticResult<Ty> {
        if left == Ty::Null || right == Ty::Null {
            return Err(fail(
                SemanticErrorKind::InvalidComparison,
                "Cannot compare null".to_string(),
                location,
            ));
        }
        self.check_comparable(left, right, location)?;
        let boolean = Ty::Class(self.builtins.boolean);
        match (self.is_numeric(left), self.is_numeric(right)) {
            (true, true) => return Ok(boolean),
            (true, false) | (false, true) => {
                return Err(fail(
                    SemanticErrorKind::InvalidComparison,
                    "Cannot compare Integer or Float with something else".to_string(),
                    location,
                ));
            }
            (false, false) => {}
        }
        match left {
            Ty::Class(class) if class == self.builtins.string => Ok(boolean),
            Ty::Class(class) => self.check_operator_call(op, class, right, location),
            Ty::Null => Ok(boolean),
        }
    }

    fn check_arithmetic(
        &self,
        op: Operator,
        left: Ty,
        right: Ty,
        location: SourceLocation,
    ) -> SemanticResult<Ty> {
        let invalid = || {
            let verb = match op {
                Operator::Plus => "add",
                Operator::Minus => "subtract",
                Operator::Mult => "multiply",
                Operator::Div => "divide",
                _ => "modulo",
            };
            fail(
                SemanticErrorKind::InvalidOperands,
                format!(
                    "Cannot {} {} with {}",
                    verb,
                    self.type_name(left),
                    self.type_name(right)
                ),
                location,
            )
        };
        let (Ty::Class(left_class), Ty::Class(right_class)) = (left, right) else {
            return Err(invalid());
        };
        if !self.registry.class(left_class).is_value_class() {
            return self.check_operator_call(op, left_class, right, location);
        }

        let b = &self.builtins;
        let (integer, float, string, boolean) = (b.integer, b.float, b.string, b.boolean);
        let numeric_right = right_class == integer || right_class == float;
        let result = if left_class == float && numeric_right {
            Some(float)
        } else if left_class == integer && right_class == integer {
            Some(integer)
        } else if left_class == integer && right_class == float {
            Some(float)
        } else if op == Operator::Plus && left_class == string {
            (numeric_right || right_class == string || right_class == boolean).then_some(string)
        } else if op == Operator::Plus && left_class == integer && right_class == string {
            Some(string)
        } else {
            None
        };
        result.map(Ty::Class).ok_or_else(invalid)
    }
}
