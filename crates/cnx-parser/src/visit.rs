//! AST walking helpers shared by the analyzers and the resolver.

use crate::ast::*;

/// Visit every function in the unit with its enclosing scope path.
pub fn for_each_function<'a>(
    unit: &'a SourceUnit,
    f: &mut impl FnMut(&[String], &'a FunctionDecl),
) {
    fn walk_items<'a>(
        items: &'a [Item],
        path: &mut Vec<String>,
        f: &mut impl FnMut(&[String], &'a FunctionDecl),
    ) {
        for item in items {
            match item {
                Item::Function(decl) => f(path, decl),
                Item::Scope(scope) => {
                    path.push(scope.name.name.clone());
                    walk_items(&scope.items, path, f);
                    path.pop();
                }
                _ => {}
            }
        }
    }
    let mut path = Vec::new();
    walk_items(&unit.items, &mut path, f);
}

/// Visit every item in the unit with its enclosing scope path.
pub fn for_each_item<'a>(unit: &'a SourceUnit, f: &mut impl FnMut(&[String], &'a Item)) {
    fn walk<'a>(items: &'a [Item], path: &mut Vec<String>, f: &mut impl FnMut(&[String], &'a Item)) {
        for item in items {
            f(path, item);
            if let Item::Scope(scope) = item {
                path.push(scope.name.name.clone());
                walk(&scope.items, path, f);
                path.pop();
            }
        }
    }
    let mut path = Vec::new();
    walk(&unit.items, &mut path, f);
}

/// Visit every statement in a block, recursing into nested control flow.
/// else-if chains are walked structurally; the nested `IfStmt` bodies are
/// visited even though the chain itself is not re-surfaced as a `Stmt`.
pub fn for_each_stmt<'a>(block: &'a Block, f: &mut impl FnMut(&'a Stmt)) {
    for stmt in &block.stmts {
        f(stmt);
        match stmt {
            Stmt::If(s) => walk_if_bodies(s, f),
            Stmt::While(s) => for_each_stmt(&s.body, f),
            Stmt::DoWhile(s) => for_each_stmt(&s.body, f),
            Stmt::For(s) => {
                f(&s.init);
                for_each_stmt(&s.body, f);
            }
            Stmt::Switch(s) => {
                for arm in &s.arms {
                    for_each_stmt(&arm.body, f);
                }
                if let Some(default) = &s.default {
                    for_each_stmt(&default.body, f);
                }
            }
            Stmt::Critical(b) | Stmt::Block(b) => for_each_stmt(b, f),
            _ => {}
        }
    }
}

fn walk_if_bodies<'a>(s: &'a IfStmt, f: &mut impl FnMut(&'a Stmt)) {
    for_each_stmt(&s.then_block, f);
    match &s.else_branch {
        Some(ElseBranch::ElseIf(nested)) => walk_if_bodies(nested, f),
        Some(ElseBranch::Else(block)) => for_each_stmt(block, f),
        None => {}
    }
}

/// The condition of every link in an if / else-if chain.
pub fn chain_conditions(s: &IfStmt) -> Vec<&Expr> {
    let mut conds = vec![&s.cond];
    let mut branch = s.else_branch.as_ref();
    while let Some(ElseBranch::ElseIf(nested)) = branch {
        conds.push(&nested.cond);
        branch = nested.else_branch.as_ref();
    }
    conds
}

/// Visit every expression directly under a statement (not recursing into
/// nested statements; combine with [`for_each_stmt`] for a full sweep).
pub fn exprs_of_stmt<'a>(stmt: &'a Stmt, f: &mut impl FnMut(&'a Expr)) {
    match stmt {
        Stmt::Var(decl) => {
            if let Some(init) = &decl.init {
                for_each_expr(init, f);
            }
        }
        Stmt::Assign(s) => {
            for_each_expr(&s.target, f);
            for_each_expr(&s.value, f);
        }
        Stmt::If(s) => {
            for cond in chain_conditions(s) {
                for_each_expr(cond, f);
            }
        }
        Stmt::While(s) => for_each_expr(&s.cond, f),
        Stmt::DoWhile(s) => for_each_expr(&s.cond, f),
        Stmt::For(s) => {
            for_each_expr(&s.cond, f);
            for_each_expr(&s.step.target, f);
            for_each_expr(&s.step.value, f);
        }
        Stmt::Switch(s) => {
            for_each_expr(&s.scrutinee, f);
            for arm in &s.arms {
                for value in &arm.values {
                    for_each_expr(value, f);
                }
            }
        }
        Stmt::Return(s) => {
            if let Some(value) = &s.value {
                for_each_expr(value, f);
            }
        }
        Stmt::Expr(s) => for_each_expr(&s.expr, f),
        Stmt::Critical(_) | Stmt::Block(_) | Stmt::Goto(_) => {}
    }
}

/// Visit an expression tree, parents before children.
pub fn for_each_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    match expr {
        Expr::Field { base, .. } => for_each_expr(base, f),
        Expr::Index { base, index, .. } => {
            for_each_expr(base, f);
            for_each_expr(index, f);
        }
        Expr::Slice {
            base,
            offset,
            length,
            ..
        } => {
            for_each_expr(base, f);
            for_each_expr(offset, f);
            for_each_expr(length, f);
        }
        Expr::Call { callee, args, .. } => {
            for_each_expr(callee, f);
            for arg in args {
                for_each_expr(arg, f);
            }
        }
        Expr::Unary { operand, .. } => for_each_expr(operand, f),
        Expr::Binary { lhs, rhs, .. } => {
            for_each_expr(lhs, f);
            for_each_expr(rhs, f);
        }
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
            ..
        } => {
            for_each_expr(cond, f);
            for_each_expr(then_expr, f);
            for_each_expr(else_expr, f);
        }
        Expr::Sizeof { arg, .. } => {
            if let SizeofArg::Expr(inner) = arg {
                for_each_expr(inner, f);
            }
        }
        Expr::Paren { inner, .. } => for_each_expr(inner, f),
        _ => {}
    }
}

/// Every expression in a whole function body.
pub fn for_each_expr_in_block<'a>(block: &'a Block, f: &mut impl FnMut(&'a Expr)) {
    for_each_stmt(block, &mut |stmt| exprs_of_stmt(stmt, f));
}
