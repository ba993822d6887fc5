//! Inline expansion of the built-in routines.

use crate::{
    ast::{Call, Expr, ExprKind},
    codegen::{emitter::Instr, Generator, Result},
    type_checker::Error,
    types::{builtins::Builtin, Scalar, Type},
};

impl Generator<'_> {
    /// Expands a built-in call. Only `length` yields a value, which is
    /// dropped when called as a statement.
    pub(super) fn g_builtin(&mut self, builtin: Builtin, call: &Call, as_stmt: bool) -> Result<()> {
        match builtin {
            Builtin::Length => {
                self.inferencer().check_args(
                    builtin.name(),
                    call.span,
                    &call.args,
                    &[Scalar::String],
                )?;
                self.g_coerced(&call.args[0], Scalar::String)?;
                self.em.emit(Instr::StrLen);
                if as_stmt {
                    self.em.emit(Instr::Pop(1));
                }
            }
            _ if !as_stmt => {
                let error = Error::NotAValue(builtin.name().into());
                return Err(call.span.wrap(error));
            }
            Builtin::Write | Builtin::WriteLn => {
                for arg in &call.args {
                    self.g_write_arg(builtin, arg)?;
                }
                if builtin == Builtin::WriteLn {
                    self.em.emit(Instr::WriteLn);
                }
            }
            Builtin::Read | Builtin::ReadLn => {
                for arg in &call.args {
                    self.g_read_arg(builtin, arg)?;
                }
                if builtin == Builtin::ReadLn {
                    self.em.emit(Instr::WriteLn);
                }
            }
        }
        Ok(())
    }

    /// Writes one argument, choosing the instruction from its static shape
    /// and type.
    fn g_write_arg(&mut self, builtin: Builtin, arg: &Expr) -> Result<()> {
        let unsupported = || arg.span.wrap(Error::UnsupportedArgument { routine: builtin });

        let shape = &arg.unparen().kind;
        match shape {
            ExprKind::Real(_) => return Err(unsupported()),
            ExprKind::Name(name)
                if self.scope.contains(name.as_str())
                    && matches!(name.declared_type, Some(Type::Array(_))) =>
            {
                return Err(unsupported());
            }
            _ if self.is_procedure_call(arg.unparen()) => return Err(unsupported()),
            _ => {}
        }

        let ty = self.inferencer().infer(arg)?;
        let instr = match shape {
            ExprKind::Char(_) => Instr::WriteChr,
            ExprKind::Index { target, .. } if target.declared_type == Some(Type::String) => {
                Instr::WriteChr
            }
            _ => match ty {
                Scalar::Integer | Scalar::Boolean => Instr::WriteI,
                Scalar::String => Instr::WriteS,
            },
        };
        self.g_expr(arg)?;
        self.em.emit(instr);
        Ok(())
    }

    /// Reads into one variable or array element.
    fn g_read_arg(&mut self, builtin: Builtin, arg: &Expr) -> Result<()> {
        let unsupported = || arg.span.wrap(Error::UnsupportedArgument { routine: builtin });

        match &arg.unparen().kind {
            ExprKind::Name(name) => {
                let slot = self.resolve(name)?;
                let convert = match name.declared_type {
                    Some(Type::Integer) => true,
                    Some(Type::String) => false,
                    _ => return Err(unsupported()),
                };
                self.em.emit(Instr::Read);
                if convert {
                    self.em.emit(Instr::Atoi);
                }
                self.g_store(slot);
            }
            ExprKind::Index { target, index } => {
                let slot = self.resolve(target)?;
                let Some(Type::Array(array)) = &target.declared_type else {
                    return Err(unsupported());
                };
                let convert = match array.elem {
                    Type::Integer => true,
                    Type::String => false,
                    _ => return Err(unsupported()),
                };
                self.inferencer().check(index, Scalar::Integer)?;
                self.g_element_address(slot, index, array.lo)?;
                self.em.emit(Instr::Read);
                if convert {
                    self.em.emit(Instr::Atoi);
                }
                self.em.emit(Instr::StoreN);
            }
            _ => return Err(unsupported()),
        }
        Ok(())
    }

    /// Whether `expr` calls something that yields no value.
    fn is_procedure_call(&self, expr: &Expr) -> bool {
        let name = match &expr.kind {
            ExprKind::Call(call) => call.callee.as_str(),
            ExprKind::Name(name) if !self.scope.contains(name.as_str()) => name.as_str(),
            _ => return false,
        };
        match crate::types::builtins::get(name) {
            Some(builtin) => builtin != Builtin::Length,
            None => self
                .env
                .signature(name)
                .is_some_and(|signature| !signature.is_function()),
        }
    }
}
