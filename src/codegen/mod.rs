use log::debug;

use crate::{
    ast::{
        BinaryOperator, Compound, Declaration, Direction, Expr, ExprKind, Ident, Name, Program,
        Routine, Stmt, StmtKind, Target, UnaryOperator, VarGroup,
    },
    codegen::emitter::{Emitter, Instr, Label},
    scope::{Scope, Slot, Storage},
    token::{Span, Spanned},
    type_checker::{Error, Inferencer},
    types::{Scalar, Signature, Type, TypeEnv},
};

mod builtins;
pub mod emitter;


type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Entry label of the main statement block.
const MAIN: &str = "main";

/// Generates the instruction text for a parsed program.
///
/// Routine signatures are recorded in `env` before any code is generated.
pub fn generate(program: &Program, env: &mut TypeEnv) -> Result<String> {
    let mut g = Generator::new(env);
    g.g_program(program)?;
    Ok(g.em.finish())
}

pub struct Generator<'env> {
    em: Emitter,
    scope: Scope,
    env: &'env mut TypeEnv,
}

impl Generator<'_> {
    pub fn new(env: &mut TypeEnv) -> Generator<'_> {
        Generator {
            em: Emitter::new(),
            scope: Scope::new(),
            env,
        }
    }

    fn g_program(&mut self, program: &Program) -> Result<()> {
        debug!("generating program {}", program.name.name);
        self.em.emit(Instr::Jump(Label::named(MAIN)));
        self.register_signatures(&program.block.declarations)?;

        // Global slots are reserved in declaration order, while routines are
        // generated in place. The initial values are only pushed once the
        // main block starts.
        let mut global_defaults = Vec::new();
        for declaration in &program.block.declarations {
            match declaration {
                Declaration::Var(groups) => {
                    for group in groups {
                        for name in &group.names {
                            if self.env.signatures.contains_key(&name.name) {
                                let error = Error::Redeclaration(name.name.clone());
                                return Err(name.span.wrap(error));
                            }
                            global_defaults.extend(Self::default_value(group)?);
                            self.declare(name)?;
                        }
                    }
                }
                Declaration::Routine(routine) => self.g_routine(routine)?,
            }
        }

        self.em.label(Label::named(MAIN));
        self.em.emit(Instr::Start);
        for instr in global_defaults {
            self.em.emit(instr);
        }
        self.g_compound(&program.block.body)?;
        self.em.emit(Instr::Stop);
        Ok(())
    }

    /// Records every routine's signature, so that calls may precede the
    /// callee's definition.
    fn register_signatures(&mut self, declarations: &[Declaration]) -> Result<()> {
        for declaration in declarations {
            let Declaration::Routine(routine) = declaration else {
                continue;
            };
            let name = &routine.name;
            if &*name.name == MAIN || crate::types::builtins::get(&name.name).is_some() {
                return Err(name.span.wrap(Error::ReservedName(name.name.clone())));
            }
            if self.env.signatures.contains_key(&name.name) {
                return Err(name.span.wrap(Error::Redeclaration(name.name.clone())));
            }

            let params = routine
                .param_names()
                .map(|(ident, ty)| Self::scalar_of(ident, ty))
                .collect::<Result<Vec<_>>>()?;
            let return_ty = match &routine.return_ty {
                Some(ty) => Some(Self::scalar_of(name, ty)?),
                None => None,
            };

            debug!("registered {} with {} parameter(s)", name.name, params.len());
            self.env
                .signatures
                .insert(name.name.clone(), Signature { return_ty, params });
        }
        Ok(())
    }

    fn g_routine(&mut self, routine: &Routine) -> Result<()> {
        let name = &routine.name;
        debug!("generating {:?} {}", routine.kind, name.name);
        self.scope.push();
        self.em.label(Label::named(&name.name));

        // Arguments sit right below the frame pointer, the first one closest.
        let param_count = routine.param_count();
        for (k, (ident, _)) in routine.param_names().enumerate() {
            self.declare(ident)?;
            self.em.emit(Instr::PushFp);
            self.em.emit(Instr::Load(-offset(k + 1)));
        }

        // The result variable shares the function's name.
        let result_slot = match &routine.return_ty {
            Some(ty) => {
                let ty = Self::scalar_of(name, ty)?;
                self.em.emit(Self::scalar_default(ty));
                Some(self.declare(name)?)
            }
            None => None,
        };

        for declaration in &routine.block.declarations {
            match declaration {
                Declaration::Var(groups) => {
                    for group in groups {
                        for ident in &group.names {
                            for instr in Self::default_value(group)? {
                                self.em.emit(instr);
                            }
                            self.declare(ident)?;
                        }
                    }
                }
                Declaration::Routine(nested) => {
                    let error = Error::Unsupported("nested routine declaration");
                    return Err(nested.name.span.wrap(error));
                }
            }
        }

        self.g_compound(&routine.block.body)?;

        if let Some(slot) = result_slot {
            self.em.emit(Instr::PushL(offset(slot)));
            self.em.emit(Instr::StoreL(-offset(param_count + 1)));
        }
        let frame_len = self.scope.frame_len();
        if frame_len > 0 {
            self.em.emit(Instr::Pop(frame_len));
        }
        self.em.emit(Instr::Return);
        self.scope.pop().map_err(|e| name.span.wrap(e.into()))
    }

    fn g_compound(&mut self, compound: &Compound) -> Result<()> {
        for stmt in &compound.body {
            self.g_stmt(stmt)?;
        }
        Ok(())
    }

    fn g_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Compound(compound) => self.g_compound(compound)?,
            StmtKind::Assignment { target, value } => self.g_assignment(target, value)?,
            StmtKind::Call(call) => {
                if let Some(builtin) = crate::types::builtins::get(call.callee.as_str()) {
                    return self.g_builtin(builtin, call, true);
                }
                let signature = self.inferencer().check_call(call)?.clone();
                self.g_call(call.callee.as_str(), &call.args, &signature)?;
                if signature.is_function() {
                    self.em.emit(Instr::Pop(1));
                }
            }
            StmtKind::IfThen {
                predicate,
                then_arm,
            } => {
                let end = self.em.new_label();
                self.g_condition(predicate)?;
                self.em.emit(Instr::Jz(end.clone()));
                self.g_stmt(then_arm)?;
                self.em.label(end);
            }
            StmtKind::IfThenElse {
                predicate,
                then_arm,
                else_arm,
            } => {
                let else_label = self.em.new_label();
                let end = self.em.new_label();
                self.g_condition(predicate)?;
                self.em.emit(Instr::Jz(else_label.clone()));
                self.g_stmt(then_arm)?;
                self.em.emit(Instr::Jump(end.clone()));
                self.em.label(else_label);
                self.g_stmt(else_arm)?;
                self.em.label(end);
            }
            StmtKind::While { predicate, body } => {
                let loop_label = self.em.new_label();
                let end = self.em.new_label();
                self.em.label(loop_label.clone());
                self.g_condition(predicate)?;
                self.em.emit(Instr::Jz(end.clone()));
                self.g_stmt(body)?;
                self.em.emit(Instr::Jump(loop_label));
                self.em.label(end);
            }
            StmtKind::For {
                var,
                init,
                direction,
                limit,
                body,
            } => self.g_for(var, init, *direction, limit, body)?,
        }
        Ok(())
    }

    fn g_condition(&mut self, predicate: &Expr) -> Result<()> {
        self.inferencer().check(predicate, Scalar::Boolean)?;
        self.g_expr(predicate)
    }

    fn g_for(
        &mut self,
        var: &Name,
        init: &Expr,
        direction: Direction,
        limit: &Expr,
        body: &Stmt,
    ) -> Result<()> {
        let slot = self.resolve(var)?;
        {
            let inferencer = self.inferencer();
            let actual = inferencer.declared_scalar(var)?;
            if actual != Scalar::Integer {
                let error = Error::Mismatch {
                    expected: Scalar::Integer,
                    actual,
                };
                return Err(var.span().wrap(error));
            }
            inferencer.check(init, Scalar::Integer)?;
            inferencer.check(limit, Scalar::Integer)?;
        }
        let (compare, step) = match direction {
            Direction::To => (Instr::InfEq, Instr::Add),
            Direction::Downto => (Instr::SupEq, Instr::Sub),
        };

        let loop_label = self.em.new_label();
        let end = self.em.new_label();

        self.g_expr(init)?;
        self.g_store(slot);
        self.em.label(loop_label.clone());
        self.g_load(slot);
        self.g_expr(limit)?;
        self.em.emit(compare);
        self.em.emit(Instr::Jz(end.clone()));
        self.g_stmt(body)?;
        self.g_load(slot);
        self.em.emit(Instr::PushI(1));
        self.em.emit(step);
        self.g_store(slot);
        self.em.emit(Instr::Jump(loop_label));
        self.em.label(end);
        Ok(())
    }

    fn g_assignment(&mut self, target: &Target, value: &Expr) -> Result<()> {
        match target {
            Target::Name(name) => {
                let slot = self.resolve(name)?;
                let ty = self.inferencer().declared_scalar(name)?;
                self.inferencer().check(value, ty)?;
                self.g_coerced(value, ty)?;
                self.g_store(slot);
            }
            Target::Index { target, index } => {
                let slot = self.resolve(target)?;
                match &target.declared_type {
                    Some(Type::Array(array)) => {
                        let elem = Self::scalar_of(&target.ident, &array.elem)?;
                        self.inferencer().check(index, Scalar::Integer)?;
                        self.inferencer().check(value, elem)?;
                        self.g_element_address(slot, index, array.lo)?;
                        self.g_coerced(value, elem)?;
                        self.em.emit(Instr::StoreN);
                    }
                    Some(Type::String) => {
                        let error = Error::Unsupported("assignment to a string character");
                        return Err(target.span().wrap(error));
                    }
                    _ => {
                        let error = Error::NotIndexable(target.as_str().into());
                        return Err(target.span().wrap(error));
                    }
                }
            }
        }
        Ok(())
    }

    /// Pushes the base address and the zero-based offset of `target[index]`.
    fn g_element_address(&mut self, base: Slot, index: &Expr, lo: i64) -> Result<()> {
        self.g_load(base);
        self.g_expr(index)?;
        self.em.emit(Instr::PushI(lo));
        self.em.emit(Instr::Sub);
        Ok(())
    }

    /// Emits a call to a user routine whose arguments were already checked.
    ///
    /// Functions get a placeholder for their result pushed below the
    /// arguments; after the arguments are dropped, the result is on top.
    fn g_call(&mut self, callee: &str, args: &[Expr], signature: &Signature) -> Result<()> {
        if signature.is_function() {
            self.em.emit(Instr::PushI(0));
        }
        for (arg, &ty) in args.iter().zip(&signature.params).rev() {
            self.g_coerced(arg, ty)?;
        }
        self.em.emit(Instr::PushA(Label::named(callee)));
        self.em.emit(Instr::Call);
        if !args.is_empty() {
            self.em.emit(Instr::Pop(args.len()));
        }
        Ok(())
    }

    fn g_expr(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Int(n) => self.em.emit(Instr::PushI(*n)),
            ExprKind::Char(c) => self.em.emit(Instr::PushI(i64::from(u32::from(*c)))),
            ExprKind::String(s) => self.em.emit(Instr::PushS(s.clone())),
            ExprKind::Bool(b) => self.em.emit(Instr::PushI(i64::from(*b))),
            ExprKind::Real(_) => {
                return Err(expr.span.wrap(Error::Unsupported("real literal")));
            }
            ExprKind::Paren(inner) => self.g_expr(inner)?,
            ExprKind::Name(name) => self.g_name(name)?,
            ExprKind::Index { target, index } => {
                let slot = self.resolve(target)?;
                match &target.declared_type {
                    Some(Type::Array(array)) => {
                        self.g_element_address(slot, index, array.lo)?;
                        self.em.emit(Instr::LoadN);
                    }
                    Some(Type::String) => {
                        // Strings are indexed from 1.
                        self.g_element_address(slot, index, 1)?;
                        self.em.emit(Instr::CharAt);
                    }
                    _ => {
                        let error = Error::NotIndexable(target.as_str().into());
                        return Err(target.span().wrap(error));
                    }
                }
            }
            ExprKind::Call(call) => {
                if let Some(builtin) = crate::types::builtins::get(call.callee.as_str()) {
                    return self.g_builtin(builtin, call, false);
                }
                let signature = self.inferencer().check_call(call)?.clone();
                if !signature.is_function() {
                    let error = Error::NotAValue(call.callee.as_str().into());
                    return Err(call.span.wrap(error));
                }
                self.g_call(call.callee.as_str(), &call.args, &signature)?;
            }
            ExprKind::Unary { op, expr: operand } => match op {
                UnaryOperator::Plus => self.g_expr(operand)?,
                UnaryOperator::Minus => {
                    self.em.emit(Instr::PushI(0));
                    self.g_expr(operand)?;
                    self.em.emit(Instr::Sub);
                }
                UnaryOperator::Not => {
                    self.g_expr(operand)?;
                    self.em.emit(Instr::PushI(0));
                    self.em.emit(Instr::Equal);
                }
            },
            ExprKind::Binary { op, lhs, rhs } => self.g_binary(expr.span, *op, lhs, rhs)?,
        }
        Ok(())
    }

    fn g_name(&mut self, name: &Name) -> Result<()> {
        if let Some(slot) = self.scope.resolve(name.as_str()) {
            self.g_load(slot);
            return Ok(());
        }
        // A bare function name outside of its own body calls it.
        let Some(signature) = self.env.signature(name.as_str()).cloned() else {
            let error = Error::UndeclaredIdentifier(name.as_str().into());
            return Err(name.span().wrap(error));
        };
        self.inferencer()
            .check_args(name.as_str(), name.span(), &[], &signature.params)?;
        if !signature.is_function() {
            return Err(name.span().wrap(Error::NotAValue(name.as_str().into())));
        }
        self.g_call(name.as_str(), &[], &signature)
    }

    fn g_binary(&mut self, span: Span, op: BinaryOperator, lhs: &Expr, rhs: &Expr) -> Result<()> {
        use BinaryOperator::*;
        let instr = match op {
            Eq | NotEq => {
                let ty = self.inferencer().equality_operand(op, lhs, rhs)?;
                self.g_coerced(lhs, ty)?;
                self.g_coerced(rhs, ty)?;
                self.em.emit(Instr::Equal);
                if op == NotEq {
                    self.em.emit(Instr::PushI(0));
                    self.em.emit(Instr::Equal);
                }
                return Ok(());
            }
            RealDiv => return Err(span.wrap(Error::Unsupported("real division"))),
            Add => Instr::Add,
            Sub => Instr::Sub,
            Mul | And => Instr::Mul,
            Div => Instr::Div,
            Mod => Instr::Mod,
            Less => Instr::Inf,
            Greater => Instr::Sup,
            LessEq => Instr::InfEq,
            GreaterEq => Instr::SupEq,
            Or => Instr::Add,
        };
        self.g_expr(lhs)?;
        self.g_expr(rhs)?;
        self.em.emit(instr);
        if op == Or {
            // Normalize the sum of two booleans back to 0 or 1.
            self.em.emit(Instr::PushI(0));
            self.em.emit(Instr::Sup);
        }
        Ok(())
    }

    /// Emits `expr` as a value of type `expected`, turning a character
    /// literal into a one-character string where a string is expected.
    fn g_coerced(&mut self, expr: &Expr, expected: Scalar) -> Result<()> {
        if expected == Scalar::String {
            if let ExprKind::Char(c) = expr.unparen().kind {
                self.em.emit(Instr::PushS(c.to_string().into()));
                return Ok(());
            }
        }
        self.g_expr(expr)
    }
}

// Utility functions.
impl Generator<'_> {
    fn inferencer(&self) -> Inferencer<'_> {
        Inferencer::new(&self.scope, &self.env.signatures)
    }

    fn declare(&mut self, ident: &Ident) -> Result<usize> {
        self.scope
            .declare(&ident.name)
            .map_err(|e| ident.span.wrap(e.into()))
    }

    fn resolve(&self, name: &Name) -> Result<Slot> {
        self.scope.resolve(name.as_str()).ok_or_else(|| {
            let error = Error::UndeclaredIdentifier(name.as_str().into());
            name.span().wrap(error)
        })
    }

    fn g_load(&mut self, slot: Slot) {
        self.em.emit(match slot.storage {
            Storage::Global => Instr::PushG(slot.index),
            Storage::Local => Instr::PushL(offset(slot.index)),
        });
    }

    fn g_store(&mut self, slot: Slot) {
        self.em.emit(match slot.storage {
            Storage::Global => Instr::StoreG(slot.index),
            Storage::Local => Instr::StoreL(offset(slot.index)),
        });
    }

    fn scalar_of(ident: &Ident, ty: &Type) -> Result<Scalar> {
        ty.scalar().ok_or_else(|| {
            ident.span.wrap(Error::UnsupportedType {
                name: ident.name.clone(),
                ty: ty.clone(),
            })
        })
    }

    fn scalar_default(ty: Scalar) -> Instr {
        match ty {
            Scalar::Integer | Scalar::Boolean => Instr::PushI(0),
            Scalar::String => Instr::PushS("".into()),
        }
    }

    /// The instructions initializing one variable of the group.
    fn default_value(group: &VarGroup) -> Result<Vec<Instr>> {
        let unsupported = |ty: &Type| {
            group.ty_span.wrap(Error::UnsupportedType {
                name: group.names[0].name.clone(),
                ty: ty.clone(),
            })
        };
        if let Some(ty) = group.ty.scalar() {
            return Ok(vec![Self::scalar_default(ty)]);
        }
        let Some(array) = group.ty.as_array() else {
            return Err(unsupported(&group.ty));
        };
        if array.elem.scalar().is_none() {
            return Err(unsupported(&array.elem));
        }
        let Some(len) = array.len() else {
            return Err(group.ty_span.wrap(Error::Unsupported("empty array range")));
        };
        Ok(vec![Instr::PushI(len), Instr::AllocN])
    }
}

/// Frame-relative offsets never get anywhere near `isize::MAX`.
#[allow(clippy::cast_possible_wrap)]
fn offset(n: usize) -> isize {
    n as isize
}
