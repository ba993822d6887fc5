//! Indented plain-text dump of the syntax tree.

use std::io::Write;

use crate::{ast::*, types::Type};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, program).expect("writing to a vec is infallible");
    String::from_utf8(buf).expect("tree output is utf-8")
}

pub fn print_expr_string(expr: &Expr) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, 0, expr).expect("writing to a vec is infallible");
    String::from_utf8(buf).expect("tree output is utf-8")
}

pub fn print_program(w: &mut impl Write, program: &Program) -> std::io::Result<()> {
    writeln!(w, "program {}", program.name.name)?;
    print_block(w, 1, &program.block)
}

fn print_block(w: &mut impl Write, i: usize, block: &Block) -> std::io::Result<()> {
    for declaration in &block.declarations {
        match declaration {
            Declaration::Var(groups) => {
                sp(w, i)?;
                writeln!(w, "var")?;
                for group in groups {
                    sp(w, i + 1)?;
                    print_group(w, group)?;
                    writeln!(w)?;
                }
            }
            Declaration::Routine(routine) => print_routine(w, i, routine)?,
        }
    }
    print_compound(w, i, &block.body)
}

fn print_routine(w: &mut impl Write, i: usize, routine: &Routine) -> std::io::Result<()> {
    sp(w, i)?;
    let keyword = match routine.kind {
        RoutineKind::Procedure => "procedure",
        RoutineKind::Function => "function",
    };
    write!(w, "{keyword} {}(", routine.name.name)?;
    for (idx, group) in routine.params.iter().enumerate() {
        if idx > 0 {
            write!(w, "; ")?;
        }
        print_group(w, group)?;
    }
    write!(w, ")")?;
    if let Some(ty) = &routine.return_ty {
        write!(w, ": {ty}")?;
    }
    writeln!(w)?;
    print_block(w, i + 1, &routine.block)
}

fn print_group(w: &mut impl Write, group: &VarGroup) -> std::io::Result<()> {
    for (idx, name) in group.names.iter().enumerate() {
        if idx > 0 {
            write!(w, ", ")?;
        }
        write!(w, "{}", name.name)?;
    }
    write!(w, ": {}", group.ty)
}

fn print_compound(w: &mut impl Write, i: usize, compound: &Compound) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "begin")?;
    for stmt in &compound.body {
        print_stmt(w, i + 1, stmt)?;
    }
    Ok(())
}

fn print_stmt(w: &mut impl Write, i: usize, stmt: &Stmt) -> std::io::Result<()> {
    match &stmt.kind {
        StmtKind::Compound(compound) => return print_compound(w, i, compound),
        StmtKind::Assignment { target, value } => {
            sp(w, i)?;
            writeln!(w, "assign")?;
            match target {
                Target::Name(name) => print_name(w, i + 1, "name", name)?,
                Target::Index { target, index } => {
                    print_name(w, i + 1, "index", target)?;
                    print_expr(w, i + 2, index)?;
                }
            }
            print_expr(w, i + 1, value)?;
        }
        StmtKind::Call(call) => print_call(w, i, call)?,
        StmtKind::IfThen {
            predicate,
            then_arm,
        } => {
            sp(w, i)?;
            writeln!(w, "if-then")?;
            print_expr(w, i + 1, predicate)?;
            print_stmt(w, i + 1, then_arm)?;
        }
        StmtKind::IfThenElse {
            predicate,
            then_arm,
            else_arm,
        } => {
            sp(w, i)?;
            writeln!(w, "if-then-else")?;
            print_expr(w, i + 1, predicate)?;
            print_stmt(w, i + 1, then_arm)?;
            print_stmt(w, i + 1, else_arm)?;
        }
        StmtKind::While { predicate, body } => {
            sp(w, i)?;
            writeln!(w, "while")?;
            print_expr(w, i + 1, predicate)?;
            print_stmt(w, i + 1, body)?;
        }
        StmtKind::For {
            var,
            init,
            direction,
            limit,
            body,
        } => {
            sp(w, i)?;
            let direction = match direction {
                Direction::To => "to",
                Direction::Downto => "downto",
            };
            writeln!(
                w,
                "for {}: {} {direction}",
                var.ident.name,
                declared(var.declared_type.as_ref())
            )?;
            print_expr(w, i + 1, init)?;
            print_expr(w, i + 1, limit)?;
            print_stmt(w, i + 1, body)?;
        }
    }
    Ok(())
}

fn print_call(w: &mut impl Write, i: usize, call: &Call) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "call {}", call.callee.ident.name)?;
    for arg in &call.args {
        print_expr(w, i + 1, arg)?;
    }
    Ok(())
}

pub fn print_expr(w: &mut impl Write, i: usize, expr: &Expr) -> std::io::Result<()> {
    match &expr.kind {
        ExprKind::Binary { op, lhs, rhs } => {
            sp(w, i)?;
            writeln!(w, "binary {op:?}")?;
            print_expr(w, i + 1, lhs)?;
            print_expr(w, i + 1, rhs)?;
        }
        ExprKind::Unary {
            op,
            expr: inner_expr,
        } => {
            sp(w, i)?;
            writeln!(w, "unary {op:?}")?;
            print_expr(w, i + 1, inner_expr)?;
        }
        ExprKind::Paren(inner_expr) => {
            sp(w, i)?;
            writeln!(w, "paren")?;
            print_expr(w, i + 1, inner_expr)?;
        }
        ExprKind::Call(call) => print_call(w, i, call)?,
        ExprKind::Index { target, index } => {
            print_name(w, i, "index", target)?;
            print_expr(w, i + 1, index)?;
        }
        ExprKind::Name(name) => print_name(w, i, "name", name)?,
        ExprKind::Int(val) => {
            sp(w, i)?;
            writeln!(w, "int {val}")?;
        }
        ExprKind::Real(val) => {
            sp(w, i)?;
            writeln!(w, "real {val}")?;
        }
        ExprKind::String(val) => {
            sp(w, i)?;
            writeln!(w, "string {val:?}")?;
        }
        ExprKind::Char(val) => {
            sp(w, i)?;
            writeln!(w, "char {val:?}")?;
        }
        ExprKind::Bool(val) => {
            sp(w, i)?;
            writeln!(w, "bool {val}")?;
        }
    }
    Ok(())
}

fn print_name(w: &mut impl Write, i: usize, label: &str, name: &Name) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(
        w,
        "{label} {}: {}",
        name.ident.name,
        declared(name.declared_type.as_ref())
    )
}

fn declared(ty: Option<&Type>) -> String {
    ty.map_or_else(|| "unknown".to_owned(), Type::to_string)
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
