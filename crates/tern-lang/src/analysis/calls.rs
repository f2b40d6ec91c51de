//! Overload resolution for calls and annotation entries.
//!
//! Candidates come from the callee name in scope: a class contributes its
//! primary constructor, a function name every overload, a function-typed
//! variable its invocation. Each candidate maps arguments to parameters, then
//! type-checks them; the outcome always carries a best candidate.

use std::collections::HashMap;

use tracing::trace;

use crate::analysis::binding::{BindingContext, ResolvedCallInfo};
use crate::analysis::checker::{ExpressionTyping, FlowInfo};
use crate::analysis::symbols::{Callable, CallableKind, ParamInfo, ScopeId, SymbolKind};
use crate::error::{DiagnosticSink, Error, ErrorCode};
use crate::syntax::ast::{AnnotationEntry, Expr, ExprKind, NodeId, Span, ValueArgument};
use crate::types::Type;

// ─── Call ─────────────────────────────────────────────────────────────────────

/// A call as the resolver sees it. Annotation entries become calls with no receiver.
#[derive(Debug, Clone)]
pub struct Call<'a> {
    pub callee: &'a str,
    /// Node the resolution is recorded under.
    pub callee_id: NodeId,
    pub receiver: Option<&'a Expr>,
    pub args: &'a [ValueArgument],
    pub span: &'a Span,
}

impl<'a> Call<'a> {
    pub fn from_entry(entry: &'a AnnotationEntry) -> Self {
        Self { callee: &entry.name, callee_id: entry.id, receiver: None, args: &entry.args, span: &entry.span }
    }

    pub fn from_expr(expr: &'a Expr) -> Option<Self> {
        match &expr.kind {
            ExprKind::Call { callee, args } => {
                Some(Self { callee, callee_id: expr.id, receiver: None, args, span: &expr.span })
            }
            _ => None,
        }
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    Success,
    NameNotFound,
    SingleCandidateArgumentMismatch,
    ManyFailedCandidates,
    Ambiguity,
}

impl ResolutionStatus {
    pub fn is_success(self) -> bool {
        self == ResolutionStatus::Success
    }
}

/// One parameter with the argument expressions bound to it.
#[derive(Debug, Clone)]
pub struct ParameterBinding<'a> {
    pub param: ParamInfo,
    pub args: Vec<&'a Expr>,
}

/// A candidate with its parameter-to-argument mapping, parameters in declaration order.
#[derive(Debug, Clone)]
pub struct ResolvedCall<'a> {
    pub candidate: Callable,
    pub bindings: Vec<ParameterBinding<'a>>,
}

impl<'a> ResolvedCall<'a> {
    fn unresolved(name: &str) -> Self {
        Self { candidate: Callable::error(name), bindings: Vec::new() }
    }

    /// Expression → type of the parameter it is bound to (element type for `vararg`).
    fn bound_types(&self) -> HashMap<NodeId, &Type> {
        self.bindings
            .iter()
            .flat_map(|b| b.args.iter().map(move |e| (e.id, &b.param.ty)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct OverloadResolutionResults<'a> {
    pub status: ResolutionStatus,
    /// The winner, or the best failed/ambiguous candidate. Always present.
    pub resolved: ResolvedCall<'a>,
}

impl<'a> OverloadResolutionResults<'a> {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn result_type(&self) -> &Type {
        &self.resolved.candidate.return_type
    }
}

// ─── Service ──────────────────────────────────────────────────────────────────

pub trait CallResolution {
    fn resolve_call<'e>(
        &self,
        ctx: &mut BindingContext,
        scope: ScopeId,
        call: &Call<'e>,
        expected: Option<&Type>,
        flow: &FlowInfo,
    ) -> OverloadResolutionResults<'e>;
}

pub struct CallResolver<'t> {
    typing: &'t dyn ExpressionTyping,
}

/// One candidate after argument mapping and checking.
struct Attempt<'e> {
    resolved: ResolvedCall<'e>,
    failure: Option<String>,
}

impl<'t> CallResolver<'t> {
    pub fn new(typing: &'t dyn ExpressionTyping) -> Self {
        Self { typing }
    }

    fn candidates(&self, ctx: &BindingContext, scope: ScopeId, name: &str) -> Vec<Callable> {
        match ctx.scopes.lookup(scope, name).map(|s| &s.kind) {
            Some(SymbolKind::Class(desc)) => desc.constructor.iter().cloned().collect(),
            Some(SymbolKind::Functions(overloads)) => overloads.clone(),
            Some(SymbolKind::Variable { ty: Some(Type::Fn(params, ret)), .. }) => vec![Callable {
                name: name.to_string(),
                kind: CallableKind::Invoke,
                params: params
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| ParamInfo { name: format!("p{i}"), ty: ty.clone(), is_vararg: false, has_default: false })
                    .collect(),
                return_type: (**ret).clone(),
            }],
            _ => Vec::new(),
        }
    }

    /// Map arguments onto `candidate`'s parameters, then type-check every bound argument.
    fn attempt<'e>(
        &self,
        ctx: &mut BindingContext,
        scope: ScopeId,
        call: &Call<'e>,
        candidate: Callable,
        flow: &FlowInfo,
    ) -> Attempt<'e> {
        fn fail(failure: &mut Option<String>, message: String) {
            if failure.is_none() {
                *failure = Some(message);
            }
        }

        let params = &candidate.params;
        let mut slots: Vec<Vec<&'e Expr>> = vec![Vec::new(); params.len()];
        let mut unbound: Vec<&'e Expr> = Vec::new();
        let mut failure = None;
        let mut next = 0;
        let mut named_seen = false;

        for arg in call.args {
            match &arg.name {
                Some(name) => {
                    named_seen = true;
                    match params.iter().position(|p| &p.name == name) {
                        Some(i) if !slots[i].is_empty() => {
                            fail(&mut failure, format!("argument for `{name}` passed twice"));
                            unbound.push(&arg.value);
                        }
                        Some(i) => slots[i].push(&arg.value),
                        None => {
                            fail(&mut failure, format!("`{}` has no parameter named `{name}`", candidate.name));
                            unbound.push(&arg.value);
                        }
                    }
                }
                None if named_seen => {
                    fail(&mut failure, "positional argument after named arguments".to_string());
                    unbound.push(&arg.value);
                }
                None if next >= params.len() => {
                    fail(&mut failure, format!("too many arguments for `{}`", candidate.name));
                    unbound.push(&arg.value);
                }
                None => {
                    slots[next].push(&arg.value);
                    // vararg absorbs every remaining positional argument
                    if !params[next].is_vararg {
                        next += 1;
                    }
                }
            }
        }

        for (param, slot) in params.iter().zip(&slots) {
            if slot.is_empty() && !param.has_default && !param.is_vararg {
                fail(&mut failure, format!("no value passed for parameter `{}`", param.name));
            }
        }

        for (param, slot) in params.iter().zip(&slots) {
            for expr in slot {
                let Some(actual) = self.typing.type_check(ctx, scope, expr, Some(&param.ty), flow) else { continue };
                if !actual.is_subtype_of(&param.ty) {
                    fail(&mut failure, format!("type mismatch: expected `{}`, found `{actual}`", param.ty));
                }
            }
        }
        for expr in unbound {
            self.typing.type_check(ctx, scope, expr, None, flow);
        }

        let bindings = params
            .iter()
            .cloned()
            .zip(slots)
            .map(|(param, args)| ParameterBinding { param, args })
            .collect();
        Attempt { resolved: ResolvedCall { candidate, bindings }, failure }
    }

    /// `a` is at least as specific as `b` for every argument both bind.
    fn at_least_as_specific(a: &ResolvedCall<'_>, b: &ResolvedCall<'_>) -> bool {
        let b_types = b.bound_types();
        a.bound_types()
            .iter()
            .all(|(id, a_ty)| b_types.get(id).is_none_or(|b_ty| a_ty.is_subtype_of(b_ty)))
    }

    fn most_specific(applicable: &[Attempt<'_>]) -> Option<usize> {
        (0..applicable.len()).find(|&i| {
            (0..applicable.len()).filter(|&j| j != i).all(|j| {
                let (a, b) = (&applicable[i].resolved, &applicable[j].resolved);
                Self::at_least_as_specific(a, b) && !Self::at_least_as_specific(b, a)
            })
        })
    }

    fn signature(c: &Callable) -> String {
        let params: Vec<String> = c.param_types().iter().map(ToString::to_string).collect();
        format!("{}({})", c.name, params.join(", "))
    }
}

impl CallResolution for CallResolver<'_> {
    fn resolve_call<'e>(
        &self,
        ctx: &mut BindingContext,
        scope: ScopeId,
        call: &Call<'e>,
        _expected: Option<&Type>,
        flow: &FlowInfo,
    ) -> OverloadResolutionResults<'e> {
        if let Some(receiver) = call.receiver {
            self.typing.type_check(ctx, scope, receiver, None, flow);
        }

        let candidates = self.candidates(ctx, scope, call.callee);
        let results = if candidates.is_empty() {
            for arg in call.args {
                self.typing.type_check(ctx, scope, &arg.value, None, flow);
            }
            let message = match ctx.scopes.lookup(scope, call.callee) {
                Some(_) => format!("`{}` is not callable", call.callee),
                None => format!("unresolved reference `{}`", call.callee),
            };
            ctx.report(Error::at(ErrorCode::S001, call.span, message));
            OverloadResolutionResults { status: ResolutionStatus::NameNotFound, resolved: ResolvedCall::unresolved(call.callee) }
        } else {
            let total = candidates.len();
            let (mut applicable, mut failed): (Vec<_>, Vec<_>) = candidates
                .into_iter()
                .map(|c| self.attempt(ctx, scope, call, c, flow))
                .partition(|a| a.failure.is_none());
            trace!(callee = call.callee, total, applicable = applicable.len(), "resolved candidates");

            match applicable.len() {
                1 => OverloadResolutionResults { status: ResolutionStatus::Success, resolved: applicable.remove(0).resolved },
                0 => {
                    let best = failed.remove(0);
                    let reason = best.failure.unwrap_or_default();
                    let (status, message) = if total == 1 {
                        (ResolutionStatus::SingleCandidateArgumentMismatch, reason)
                    } else {
                        (ResolutionStatus::ManyFailedCandidates,
                         format!("none of the {total} candidates of `{}` is applicable: {reason}", call.callee))
                    };
                    ctx.report(Error::at(ErrorCode::S002, call.span, message));
                    OverloadResolutionResults { status, resolved: best.resolved }
                }
                _ => match Self::most_specific(&applicable) {
                    Some(i) => OverloadResolutionResults { status: ResolutionStatus::Success, resolved: applicable.remove(i).resolved },
                    None => {
                        let names: Vec<String> = applicable.iter().map(|a| Self::signature(&a.resolved.candidate)).collect();
                        ctx.report(Error::at(
                            ErrorCode::S003,
                            call.span,
                            format!("overload resolution ambiguity: {}", names.join(", ")),
                        ));
                        OverloadResolutionResults { status: ResolutionStatus::Ambiguity, resolved: applicable.remove(0).resolved }
                    }
                },
            }
        };

        ctx.resolved_call.record(call.callee_id, ResolvedCallInfo {
            candidate: results.resolved.candidate.clone(),
            status: results.status,
        });
        results
    }
}
