//! Expression typing services
//!
//! Infers the type of an expression in a scope, checks operand compatibility,
//! coerces and folds literals, and records every computed type and constant
//! into the binding context. Calls go through the overload resolver.

use std::cell::Cell;
use std::collections::HashMap;

use crate::analysis::binding::BindingContext;
use crate::analysis::calls::{Call, CallResolution, CallResolver};
use crate::analysis::collector::resolve_type;
use crate::analysis::symbols::{ScopeId, ScopeKind, Symbol, SymbolKind};
use crate::error::{DiagnosticSink, Error, ErrorCode};
use crate::syntax::ast::*;
use crate::types::Type;
use crate::types::constant::ConstantValue;
use crate::types::ops::{OperatorTable, unary_result_type};

// ─── Flow info ────────────────────────────────────────────────────────────────

/// Flow-sensitive narrowing: variables known to hold a more precise type than declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowInfo {
    narrowed: HashMap<String, Type>,
}

impl FlowInfo {
    /// No narrowing at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn narrowed(&self, name: &str) -> Option<&Type> {
        self.narrowed.get(name)
    }

    pub fn with(&self, name: impl Into<String>, ty: Type) -> Self {
        let mut next = self.clone();
        next.narrowed.insert(name.into(), ty);
        next
    }

    pub fn is_empty(&self) -> bool {
        self.narrowed.is_empty()
    }
}

// ─── Service ──────────────────────────────────────────────────────────────────

pub trait ExpressionTyping {
    /// Type of `expr`, or `None` if it has errors. Types and folded constants are
    /// recorded in `ctx` as a side effect.
    fn type_check(
        &self,
        ctx: &mut BindingContext,
        scope: ScopeId,
        expr: &Expr,
        expected: Option<&Type>,
        flow: &FlowInfo,
    ) -> Option<Type>;
}

/// Result of inferring one expression: its type and the flow after it.
struct TypeInfo {
    ty: Type,
    flow: FlowInfo,
}

impl TypeInfo {
    fn new(ty: Type, flow: &FlowInfo) -> Self {
        Self { ty, flow: flow.clone() }
    }
}

/// Deepest expression nesting typed before `S006`.
pub const MAX_TYPING_DEPTH: usize = 128;

pub struct ExpressionTypingServices {
    operators: OperatorTable,
    depth: Cell<usize>,
}

impl ExpressionTypingServices {
    pub fn new() -> Self {
        Self { operators: OperatorTable::standard(), depth: Cell::new(0) }
    }

    fn infer(&self, ctx: &mut BindingContext, scope: ScopeId, expr: &Expr, expected: Option<&Type>, flow: &FlowInfo) -> TypeInfo {
        let depth = self.depth.get();
        if depth >= MAX_TYPING_DEPTH {
            ctx.report(Error::at(ErrorCode::S006, &expr.span,
                format!("expression nesting exceeds {MAX_TYPING_DEPTH} levels")));
            return TypeInfo::new(Type::error("nested too deeply"), flow);
        }
        self.depth.set(depth + 1);
        let info = self.infer_kind(ctx, scope, expr, expected, flow);
        self.depth.set(depth);
        info
    }

    fn infer_kind(&self, ctx: &mut BindingContext, scope: ScopeId, expr: &Expr, expected: Option<&Type>, flow: &FlowInfo) -> TypeInfo {
        let info = match &expr.kind {
            ExprKind::Constant(lit) => {
                let value = fold_literal(lit, expected);
                let ty = value.ty();
                ctx.compile_time_value.record(expr.id, value);
                TypeInfo::new(ty, flow)
            }

            ExprKind::StringTemplate(entries) => {
                let mut text = Some(String::new());
                for entry in entries {
                    match entry {
                        TemplateEntry::Text(s) => {
                            if let Some(t) = text.as_mut() { t.push_str(s); }
                        }
                        TemplateEntry::Expr(e) => {
                            self.infer(ctx, scope, e, None, flow);
                            match ctx.compile_time_value.get(e.id).map(ConstantValue::template_text) {
                                Some(v) => if let Some(t) = text.as_mut() { t.push_str(&v) },
                                None => text = None,
                            }
                        }
                    }
                }
                if let Some(folded) = text {
                    ctx.compile_time_value.record(expr.id, ConstantValue::String(folded));
                }
                TypeInfo::new(Type::String, flow)
            }

            ExprKind::Name(name) => TypeInfo::new(self.infer_name(ctx, scope, name, &expr.span, flow), flow),

            ExprKind::Paren(inner) => {
                let info = self.infer(ctx, scope, inner, expected, flow);
                if let Some(v) = ctx.compile_time_value.get(inner.id).cloned() {
                    ctx.compile_time_value.record(expr.id, v);
                }
                info
            }

            // Annotations do not change the type of what they annotate.
            ExprKind::Annotated { expr: inner, .. } => self.infer(ctx, scope, inner, expected, flow),

            ExprKind::Call { .. } => {
                let ty = match Call::from_expr(expr) {
                    Some(call) => CallResolver::new(self)
                        .resolve_call(ctx, scope, &call, expected, flow)
                        .result_type()
                        .clone(),
                    None => Type::error("not a call"),
                };
                TypeInfo::new(ty, flow)
            }

            ExprKind::Unary { op, operand } => {
                let operand_info = self.infer(ctx, scope, operand, None, flow);
                let ty = match unary_result_type(*op, &operand_info.ty) {
                    Some(ty) => ty,
                    None => {
                        let sym = if *op == UnOp::Neg { "-" } else { "!" };
                        ctx.report(Error::at(ErrorCode::S004, &expr.span,
                            format!("operator `{sym}` is not applicable to `{}`", operand_info.ty)));
                        Type::error("bad unary operand")
                    }
                };
                TypeInfo::new(ty, &operand_info.flow)
            }

            ExprKind::Binary { left, op, right } => {
                let l = self.infer(ctx, scope, left, None, flow);
                let r = self.infer(ctx, scope, right, None, &l.flow);
                let ty = match self.operators.result_type(*op, &l.ty, &r.ty) {
                    Some(ty) => ty,
                    None => {
                        ctx.report(Error::at(ErrorCode::S004, &expr.span,
                            format!("operator `{op}` is not applicable to `{}` and `{}`", l.ty, r.ty)));
                        Type::error("bad binary operands")
                    }
                };
                TypeInfo::new(ty, &r.flow)
            }

            ExprKind::If { condition, then_branch, else_branch } => {
                let cond = self.infer_condition(ctx, scope, condition, flow);
                let then_ty = self.infer_branch(ctx, scope, then_branch, expected, &cond);
                let ty = match else_branch {
                    Some(e) => then_ty.join(&self.infer_branch(ctx, scope, e, expected, &cond)),
                    None => Type::Unit,
                };
                TypeInfo::new(ty, &cond)
            }

            ExprKind::While { condition, body } => {
                let cond = self.infer_condition(ctx, scope, condition, flow);
                self.infer_branch(ctx, scope, body, None, &cond);
                TypeInfo::new(Type::Unit, &cond)
            }

            ExprKind::Block(stmts) => {
                let block = ctx.scopes.child(scope, ScopeKind::Block);
                let ty = self.infer_statements(ctx, block, stmts, expected, flow);
                TypeInfo::new(ty, flow)
            }

            ExprKind::Lambda { params, body } => {
                let lambda = ctx.scopes.child(scope, ScopeKind::Lambda);
                let mut param_types = Vec::with_capacity(params.len());
                for p in params {
                    let ty = self.resolve_written_type(ctx, scope, &p.ty);
                    self.declare(ctx, lambda, Symbol::variable(&p.name, Some(ty.clone()), false, p.span.clone()));
                    param_types.push(ty);
                }
                let ret = self.infer_statements(ctx, lambda, body, None, flow);
                TypeInfo::new(Type::Fn(param_types, Box::new(ret)), flow)
            }

            ExprKind::Return(value) => {
                if let Some(v) = value {
                    self.infer(ctx, scope, v, None, flow);
                }
                TypeInfo::new(Type::Nothing, flow)
            }

            ExprKind::Assign { target, value } => self.infer_assign(ctx, scope, target, value, &expr.span, flow),

            ExprKind::Declaration(decl) => {
                if let Declaration::Property(p) = &**decl {
                    self.declare_local(ctx, scope, p, flow);
                }
                // Local functions and classes are typed as their own units.
                TypeInfo::new(Type::Unit, flow)
            }
        };

        ctx.expression_type.record(expr.id, info.ty.clone());
        info
    }

    fn infer_name(&self, ctx: &mut BindingContext, scope: ScopeId, name: &str, span: &Span, flow: &FlowInfo) -> Type {
        if let Some(ty) = flow.narrowed(name) {
            return ty.clone();
        }
        let kind = ctx.scopes.lookup(scope, name).map(|s| s.kind.clone());
        match kind {
            Some(SymbolKind::Variable { ty: Some(ty), .. }) => ty,
            Some(SymbolKind::Variable { ty: None, .. }) => Type::error(format!("type of `{name}` is not inferred")),
            Some(SymbolKind::Class(desc)) if desc.is_object => desc.ty(),
            Some(SymbolKind::Functions(overloads)) => match overloads.first() {
                Some(f) => Type::Fn(f.param_types(), Box::new(f.return_type.clone())),
                None => Type::error("empty overload set"),
            },
            Some(SymbolKind::Class(_) | SymbolKind::BuiltinType(_)) => {
                ctx.report(Error::at(ErrorCode::S005, span, format!("`{name}` is a type and cannot be used as a value")));
                Type::error("type used as value")
            }
            None => {
                ctx.report(Error::at(ErrorCode::S001, span, format!("unresolved reference `{name}`")));
                Type::error(format!("unresolved `{name}`"))
            }
        }
    }

    /// Returns the flow after the condition.
    fn infer_condition(&self, ctx: &mut BindingContext, scope: ScopeId, condition: &Expr, flow: &FlowInfo) -> FlowInfo {
        let info = self.infer(ctx, scope, condition, Some(&Type::Boolean), flow);
        if !info.ty.is_subtype_of(&Type::Boolean) {
            ctx.report(Error::at(ErrorCode::S005, &condition.span,
                format!("condition must be `Boolean`, found `{}`", info.ty)));
        }
        info.flow
    }

    /// Branches get their own scope so a bare declaration stays local to them.
    fn infer_branch(&self, ctx: &mut BindingContext, scope: ScopeId, branch: &Expr, expected: Option<&Type>, flow: &FlowInfo) -> Type {
        let branch_scope = ctx.scopes.child(scope, ScopeKind::Block);
        self.infer(ctx, branch_scope, branch, expected, flow).ty
    }

    /// Statements in order, threading flow. Type of the last one, `Unit` if empty.
    fn infer_statements(&self, ctx: &mut BindingContext, scope: ScopeId, stmts: &[Expr], expected: Option<&Type>, flow: &FlowInfo) -> Type {
        let mut flow = flow.clone();
        let mut ty = Type::Unit;
        for (i, stmt) in stmts.iter().enumerate() {
            let expected = if i + 1 == stmts.len() { expected } else { None };
            let info = self.infer(ctx, scope, stmt, expected, &flow);
            ty = info.ty;
            flow = info.flow;
        }
        ty
    }

    fn infer_assign(&self, ctx: &mut BindingContext, scope: ScopeId, target: &str, value: &Expr, span: &Span, flow: &FlowInfo) -> TypeInfo {
        let kind = ctx.scopes.lookup(scope, target).map(|s| s.kind.clone());
        let declared = match kind {
            Some(SymbolKind::Variable { ty, mutable }) => {
                if !mutable {
                    ctx.report(Error::at(ErrorCode::S005, span, format!("`val` `{target}` cannot be reassigned")));
                }
                ty
            }
            Some(_) => {
                ctx.report(Error::at(ErrorCode::S005, span, format!("`{target}` is not a variable")));
                None
            }
            None => {
                ctx.report(Error::at(ErrorCode::S001, span, format!("unresolved reference `{target}`")));
                None
            }
        };

        let value_info = self.infer(ctx, scope, value, declared.as_ref(), flow);
        if let Some(declared) = &declared {
            if !value_info.ty.is_subtype_of(declared) {
                ctx.report(Error::at(ErrorCode::S005, &value.span,
                    format!("type mismatch: expected `{declared}`, found `{}`", value_info.ty)));
            }
        }

        // Smart cast: after `x = value`, `x` holds the value's type.
        let after = if value_info.ty.is_error() { value_info.flow } else { value_info.flow.with(target, value_info.ty) };
        TypeInfo { ty: Type::Unit, flow: after }
    }

    fn declare_local(&self, ctx: &mut BindingContext, scope: ScopeId, p: &PropertyDecl, flow: &FlowInfo) {
        let declared = p.ty.as_ref().map(|tr| self.resolve_written_type(ctx, scope, tr));
        let init = p.initializer.as_ref().map(|e| self.infer(ctx, scope, e, declared.as_ref(), flow).ty);

        if let (Some(declared), Some(init), Some(e)) = (&declared, &init, &p.initializer) {
            if !init.is_subtype_of(declared) {
                ctx.report(Error::at(ErrorCode::S005, &e.span,
                    format!("type mismatch: expected `{declared}`, found `{init}`")));
            }
        }

        let ty = declared.or(init);
        self.declare(ctx, scope, Symbol::variable(&p.name, ty, p.is_var, p.span.clone()));
    }

    fn declare(&self, ctx: &mut BindingContext, scope: ScopeId, sym: Symbol) {
        let (name, span) = (sym.name.clone(), sym.span.clone());
        if !ctx.scopes.declare(scope, sym) {
            ctx.report(Error::at(ErrorCode::D001, &span, format!("`{name}` is already declared in this scope")));
        }
    }

    fn resolve_written_type(&self, ctx: &mut BindingContext, scope: ScopeId, tr: &TypeRef) -> Type {
        let mut errors = Vec::new();
        let ty = resolve_type(&ctx.scopes, scope, tr, &mut errors);
        for e in errors {
            ctx.report(e);
        }
        ty
    }
}

impl Default for ExpressionTypingServices {
    fn default() -> Self { Self::new() }
}

impl ExpressionTyping for ExpressionTypingServices {
    fn type_check(
        &self,
        ctx: &mut BindingContext,
        scope: ScopeId,
        expr: &Expr,
        expected: Option<&Type>,
        flow: &FlowInfo,
    ) -> Option<Type> {
        let ty = self.infer(ctx, scope, expr, expected, flow).ty;
        (!ty.is_error()).then_some(ty)
    }
}

// ─── Literals ─────────────────────────────────────────────────────────────────

/// Fold a literal, coercing it to `expected` where the value fits.
pub fn fold_literal(lit: &Literal, expected: Option<&Type>) -> ConstantValue {
    match lit {
        Literal::Int { value, long: true } => ConstantValue::Long(*value),
        Literal::Int { value, long: false } => {
            let v = *value;
            match expected {
                Some(Type::Byte) if i8::try_from(v).is_ok() => ConstantValue::Byte(v as i8),
                Some(Type::Short) if i16::try_from(v).is_ok() => ConstantValue::Short(v as i16),
                Some(Type::Long) => ConstantValue::Long(v),
                _ => match i32::try_from(v) {
                    Ok(i) => ConstantValue::Int(i),
                    Err(_) => ConstantValue::Long(v),
                },
            }
        }
        Literal::Floating { value, float } => {
            if *float || expected == Some(&Type::Float) {
                ConstantValue::Float(*value as f32)
            } else {
                ConstantValue::Double(*value)
            }
        }
        Literal::Bool(b) => ConstantValue::Boolean(*b),
        Literal::Char(c) => ConstantValue::Char(*c),
        Literal::Null     => ConstantValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literal_coercion() {
        let lit = Literal::Int { value: 7, long: false };
        assert_eq!(fold_literal(&lit, None), ConstantValue::Int(7));
        assert_eq!(fold_literal(&lit, Some(&Type::Byte)), ConstantValue::Byte(7));
        assert_eq!(fold_literal(&lit, Some(&Type::Short)), ConstantValue::Short(7));
        assert_eq!(fold_literal(&lit, Some(&Type::Long)), ConstantValue::Long(7));
        assert_eq!(fold_literal(&lit, Some(&Type::String)), ConstantValue::Int(7));
    }

    #[test]
    fn out_of_range_literal_keeps_natural_type() {
        let lit = Literal::Int { value: 300, long: false };
        assert_eq!(fold_literal(&lit, Some(&Type::Byte)), ConstantValue::Int(300));
        let big = Literal::Int { value: 5_000_000_000, long: false };
        assert_eq!(fold_literal(&big, None), ConstantValue::Long(5_000_000_000));
    }

    #[test]
    fn long_and_float_suffixes() {
        assert_eq!(fold_literal(&Literal::Int { value: 1, long: true }, Some(&Type::Int)), ConstantValue::Long(1));
        assert_eq!(fold_literal(&Literal::Floating { value: 1.5, float: true }, None), ConstantValue::Float(1.5));
        assert_eq!(fold_literal(&Literal::Floating { value: 1.5, float: false }, None), ConstantValue::Double(1.5));
        assert_eq!(fold_literal(&Literal::Floating { value: 1.5, float: false }, Some(&Type::Float)), ConstantValue::Float(1.5));
    }

    #[test]
    fn flow_info_narrowing() {
        let flow = FlowInfo::empty();
        assert!(flow.is_empty());
        let narrowed = flow.with("x", Type::Int);
        assert_eq!(narrowed.narrowed("x"), Some(&Type::Int));
        assert!(flow.narrowed("x").is_none());
    }

    #[test]
    fn typing_stops_at_depth_limit() {
        use crate::analysis::symbols::Scopes;

        let span = Span::new(1, 1);
        let mut expr = Expr { id: NodeId(0), kind: ExprKind::Constant(Literal::Int { value: 1, long: false }), span: span.clone() };
        for i in 1..=(MAX_TYPING_DEPTH as u32 + 10) {
            expr = Expr { id: NodeId(i), kind: ExprKind::Paren(Box::new(expr)), span: span.clone() };
        }

        let mut ctx = BindingContext::new(Scopes::new());
        let scope = ctx.scopes.file();
        let typing = ExpressionTypingServices::new();
        assert_eq!(typing.type_check(&mut ctx, scope, &expr, None, &FlowInfo::empty()), None);
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].code, ErrorCode::S006);

        // the counter unwinds, so a shallow expression after a deep one is fine
        let shallow = Expr { id: NodeId(10_000), kind: ExprKind::Constant(Literal::Bool(true)), span };
        assert_eq!(typing.type_check(&mut ctx, scope, &shallow, None, &FlowInfo::empty()), Some(Type::Boolean));
    }
}
