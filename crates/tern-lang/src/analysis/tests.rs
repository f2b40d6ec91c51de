//! Semantic service tests: declaration collection, scopes, expression typing
//! and overload resolution, driven from source text.
//!
//! Every typing test declares a top-level `probe` property and type-checks its
//! initializer in the property's declaring scope.

use crate::analysis::binding::BindingContext;
use crate::analysis::calls::{Call, CallResolution, CallResolver, ResolutionStatus};
use crate::analysis::checker::{ExpressionTyping, ExpressionTypingServices, FlowInfo};
use crate::analysis::collector::{Collector, DeclarationTable};
use crate::analysis::symbols::SymbolKind;
use crate::error::{Error, ErrorCode};
use crate::syntax::ast::{Declaration, Expr, ExprKind, File, Member};
use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;
use crate::types::Type;
use crate::types::constant::ConstantValue;

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn parse(src: &str) -> File {
    let tokens = Lexer::new(src).tokenize().expect("lex failed");
    Parser::new(tokens).parse().expect("parse failed")
}

fn collect(file: &File) -> (DeclarationTable, BindingContext) {
    Collector::new().collect(file)
}

fn probe(file: &File) -> (&Declaration, &Expr) {
    let decl = file
        .declarations
        .iter()
        .find(|d| d.name() == "probe")
        .expect("no `probe` declaration");
    match decl {
        Declaration::Property(p) => (decl, p.initializer.as_ref().expect("`probe` has no initializer")),
        _ => panic!("`probe` is not a property"),
    }
}

/// Type of `probe`'s initializer and every diagnostic reported on the way.
fn type_of_probe(src: &str) -> (Option<Type>, Vec<Error>) {
    let file = parse(src);
    let (table, mut ctx) = collect(&file);
    let (decl, init) = probe(&file);
    let scope = table.declaring_scope(decl.id()).expect("probe not registered");
    let ty = ExpressionTypingServices::new().type_check(&mut ctx, scope, init, None, &FlowInfo::empty());
    (ty, ctx.take_diagnostics())
}

fn has_code(errors: &[Error], code: ErrorCode) -> bool {
    errors.iter().any(|e| e.code == code)
}

fn has_message(errors: &[Error], substr: &str) -> bool {
    errors.iter().any(|e| e.message.contains(substr))
}

// ─── Collector ───────────────────────────────────────────────────────────────

#[test]
fn registers_top_level_and_member_declarations() {
    let file = parse("class A(val x: Int) { fun m() {} val y = 2 }\nfun f() {}\nval z = 1");
    let (table, ctx) = collect(&file);
    assert_eq!(table.declarations().len(), 5);
    assert!(ctx.diagnostics().is_empty());

    let Declaration::Class(a) = &file.declarations[0] else { panic!("expected class") };
    assert!(table.class(a.id).is_some());
    assert_eq!(table.declaring_scope(a.id), Some(ctx.scopes.file()));
    for member in &a.members {
        let Member::Declaration(d) = member else { continue };
        assert!(table.declaring_scope(d.id()).is_some(), "member `{}` not registered", d.name());
    }
}

#[test]
fn member_property_resolves_in_initializer_scope() {
    let file = parse("class A(val x: Int, y: Int) { val z = 1 }");
    let (table, ctx) = collect(&file);
    let Declaration::Class(a) = &file.declarations[0] else { panic!("expected class") };
    let desc = table.class(a.id).unwrap();

    let Member::Declaration(z) = &a.members[0] else { panic!("expected property") };
    assert_eq!(table.declaring_scope(z.id()), Some(desc.scope_for_initializers));
    assert_eq!(table.property(z.id()).unwrap().ty, Some(Type::Int));

    // `val x` is a member, plain `y` only exists while initializing.
    assert!(ctx.scopes.get(desc.scope_for_members).get("x").is_some());
    assert!(ctx.scopes.get(desc.scope_for_members).get("y").is_none());
    assert!(ctx.scopes.lookup(desc.scope_for_initializers, "y").is_some());
    assert!(ctx.scopes.lookup(desc.scope_for_initializers, "z").is_some());
}

#[test]
fn local_functions_and_classes_registered() {
    let file = parse("fun outer() {\n fun inner() {}\n class L\n val v = { fun inLambda() {} }\n}");
    let (table, _) = collect(&file);
    // outer, inner, L, inLambda; the local `val` is not a registered declaration.
    assert_eq!(table.declarations().len(), 4);

    let Declaration::Function(outer) = &file.declarations[0] else { panic!("expected function") };
    let inner_scope = table.function(outer.id).unwrap().inner_scope();
    let body_decls: Vec<_> = table
        .declarations()
        .iter()
        .filter(|id| table.declaring_scope(**id) == Some(inner_scope))
        .collect();
    assert_eq!(body_decls.len(), 3);
}

#[test]
fn init_block_locals_registered_in_initializer_scope() {
    let file = parse("class A { init { fun helper() {} } }");
    let (table, _) = collect(&file);
    let Declaration::Class(a) = &file.declarations[0] else { panic!("expected class") };
    let init_scope = table.class(a.id).unwrap().scope_for_initializers;
    assert_eq!(table.declarations().len(), 2);
    assert!(table.declarations().iter().any(|id| table.declaring_scope(*id) == Some(init_scope)));
}

#[test]
fn constructor_signature_filled_in_after_all_classes_are_known() {
    let file = parse("annotation class Ann(val other: Later, vararg tags: String)\nclass Later");
    let (table, ctx) = collect(&file);
    assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());

    let Declaration::Class(ann) = &file.declarations[0] else { panic!("expected class") };
    let desc = table.class(ann.id).unwrap();
    assert!(desc.is_annotation);
    let ctor = desc.constructor.as_ref().unwrap();
    assert_eq!(ctor.return_type, Type::Class("Ann".into()));
    assert_eq!(ctor.params[0].ty, Type::Class("Later".into()));
    assert!(ctor.params[1].is_vararg);

    // The scope symbol sees the same constructor the table does.
    match &ctx.scopes.lookup(ctx.scopes.file(), "Ann").unwrap().kind {
        SymbolKind::Class(sym) => assert_eq!(sym.constructor.as_ref(), Some(ctor)),
        other => panic!("expected class symbol, got {other:?}"),
    }
}

#[test]
fn d001_redeclared_property() {
    let (_, ctx) = collect(&parse("val a = 1\nval a = 2"));
    assert!(has_code(ctx.diagnostics(), ErrorCode::D001));
}

#[test]
fn overloads_are_not_redeclarations() {
    let (_, ctx) = collect(&parse("fun f(a: Int) {}\nfun f(a: String) {}"));
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn d001_same_signature_twice() {
    let (_, ctx) = collect(&parse("fun f(a: Int) {}\nfun f(b: Int) {}"));
    assert!(has_code(ctx.diagnostics(), ErrorCode::D001));
}

#[test]
fn s001_unknown_parameter_type() {
    let (_, ctx) = collect(&parse("fun f(a: Nope) {}"));
    assert!(has_code(ctx.diagnostics(), ErrorCode::S001));
    assert!(has_message(ctx.diagnostics(), "Nope"));
}

#[test]
fn s005_array_without_element_type() {
    let (_, ctx) = collect(&parse("fun f(a: Array) {}"));
    assert!(has_code(ctx.diagnostics(), ErrorCode::S005));
}

#[test]
fn array_parameter_type() {
    let file = parse("fun f(a: Array<String>) {}");
    let (table, _) = collect(&file);
    let sig = &table.function(file.declarations[0].id()).unwrap().signature;
    assert_eq!(sig.params[0].ty, Type::Array(Box::new(Type::String)));
}

// ─── Overload resolution ─────────────────────────────────────────────────────

#[test]
fn overload_chosen_by_argument_type() {
    let (ty, errs) = type_of_probe("fun f(a: Int): Int = 1\nfun f(a: String): String = \"s\"\nval probe = f(\"x\")");
    assert!(errs.is_empty(), "{errs:?}");
    assert_eq!(ty, Some(Type::String));
}

#[test]
fn most_specific_overload_wins() {
    let (ty, errs) = type_of_probe("fun g(a: Any): Int = 1\nfun g(a: Int): String = \"s\"\nval probe = g(1)");
    assert!(errs.is_empty(), "{errs:?}");
    assert_eq!(ty, Some(Type::String));
}

#[test]
fn s003_ambiguous_overloads() {
    let (_, errs) = type_of_probe("fun h(a: Int, b: Any): Int = 1\nfun h(a: Any, b: Int): Int = 2\nval probe = h(1, 2)");
    assert!(has_code(&errs, ErrorCode::S003));
    assert!(has_message(&errs, "ambiguity"));
}

#[test]
fn s001_unresolved_callee() {
    let (ty, errs) = type_of_probe("val probe = nope(1)");
    assert!(has_code(&errs, ErrorCode::S001));
    assert!(has_message(&errs, "nope"));
    assert_eq!(ty, None);
}

#[test]
fn s001_value_is_not_callable() {
    let (_, errs) = type_of_probe("val x = 1\nval probe = x(1)");
    assert!(has_message(&errs, "not callable"));
}

#[test]
fn s002_single_candidate_mismatch() {
    let (_, errs) = type_of_probe("fun f(a: Int): Int = 1\nval probe = f(\"s\")");
    assert!(has_code(&errs, ErrorCode::S002));
    assert!(has_message(&errs, "type mismatch"));
}

#[test]
fn s002_many_failed_candidates() {
    let (_, errs) = type_of_probe("fun f(a: Int): Int = 1\nfun f(a: Long): Int = 1\nval probe = f(true)");
    assert!(has_message(&errs, "none of the 2 candidates"));
}

#[test]
fn named_arguments_in_any_order() {
    let (ty, errs) = type_of_probe("fun n(a: Int, b: String): Int = 0\nval probe = n(b = \"x\", a = 1)");
    assert!(errs.is_empty(), "{errs:?}");
    assert_eq!(ty, Some(Type::Int));
}

#[test]
fn argument_mapping_failures() {
    let base = "fun n(a: Int, b: String): Int = 0\n";
    let cases = [
        ("val probe = n(c = 1, b = \"x\")", "no parameter named `c`"),
        ("val probe = n(a = 1, \"x\")", "positional argument after named"),
        ("val probe = n(1, \"x\", 3)", "too many arguments"),
        ("val probe = n(1)", "no value passed for parameter `b`"),
        ("val probe = n(1, b = \"x\", b = \"y\")", "passed twice"),
    ];
    for (call, message) in cases {
        let (_, errs) = type_of_probe(&format!("{base}{call}"));
        assert!(has_code(&errs, ErrorCode::S002), "{call}: {errs:?}");
        assert!(has_message(&errs, message), "{call}: {errs:?}");
    }
}

#[test]
fn default_parameter_may_be_omitted() {
    let (_, errs) = type_of_probe("fun d(a: Int, b: Int = 2): Int = 0\nval probe = d(1)");
    assert!(errs.is_empty(), "{errs:?}");
}

#[test]
fn constructor_call_has_class_type() {
    let (ty, errs) = type_of_probe("class P(val x: Int, y: String)\nval probe = P(1, \"s\")");
    assert!(errs.is_empty(), "{errs:?}");
    assert_eq!(ty, Some(Type::Class("P".into())));
}

#[test]
fn vararg_absorbs_remaining_positionals() {
    let file = parse("fun v(first: String, vararg xs: Int): Int = 0\nval probe = v(\"a\", 1, 2, 3)");
    let (table, mut ctx) = collect(&file);
    let (decl, init) = probe(&file);
    let scope = table.declaring_scope(decl.id()).unwrap();

    let typing = ExpressionTypingServices::new();
    let call = Call::from_expr(init).unwrap();
    let results = CallResolver::new(&typing).resolve_call(&mut ctx, scope, &call, None, &FlowInfo::empty());

    assert!(results.is_success());
    assert_eq!(results.resolved.bindings.len(), 2);
    assert_eq!(results.resolved.bindings[0].args.len(), 1);
    let absorbed: Vec<_> = results.resolved.bindings[1].args.iter().map(|e| e.id).collect();
    let ExprKind::Call { args, .. } = &init.kind else { panic!("expected call") };
    let written: Vec<_> = args[1..].iter().map(|a| a.value.id).collect();
    assert_eq!(absorbed, written);
}

#[test]
fn empty_vararg_is_applicable() {
    let (_, errs) = type_of_probe("fun v(vararg xs: Int): Int = 0\nval probe = v()");
    assert!(errs.is_empty(), "{errs:?}");
}

#[test]
fn resolution_recorded_under_callee_node() {
    let file = parse("fun h(a: Int, b: Any): Int = 1\nfun h(a: Any, b: Int): Int = 2\nval probe = h(1, 2)");
    let (table, mut ctx) = collect(&file);
    let (decl, init) = probe(&file);
    let scope = table.declaring_scope(decl.id()).unwrap();
    ExpressionTypingServices::new().type_check(&mut ctx, scope, init, None, &FlowInfo::empty());

    let info = ctx.resolved_call.get(init.id).expect("call not recorded");
    assert_eq!(info.status, ResolutionStatus::Ambiguity);
    assert_eq!(info.candidate.name, "h");
}

// ─── Expression typing ───────────────────────────────────────────────────────

#[test]
fn literal_coerced_to_parameter_type() {
    let file = parse("fun b(x: Byte): Int = 0\nval probe = b(1)");
    let (table, mut ctx) = collect(&file);
    let (decl, init) = probe(&file);
    let scope = table.declaring_scope(decl.id()).unwrap();
    ExpressionTypingServices::new().type_check(&mut ctx, scope, init, None, &FlowInfo::empty());

    let ExprKind::Call { args, .. } = &init.kind else { panic!("expected call") };
    assert_eq!(ctx.compile_time_value.get(args[0].value.id), Some(&ConstantValue::Byte(1)));
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn constant_template_is_folded() {
    let file = parse("val probe = \"a${1}b${'c'}${2L}\"");
    let (table, mut ctx) = collect(&file);
    let (decl, init) = probe(&file);
    let scope = table.declaring_scope(decl.id()).unwrap();
    let ty = ExpressionTypingServices::new().type_check(&mut ctx, scope, init, None, &FlowInfo::empty());

    assert_eq!(ty, Some(Type::String));
    assert_eq!(ctx.compile_time_value.get(init.id), Some(&ConstantValue::String("a1bc2".into())));
}

#[test]
fn template_with_variable_is_not_folded() {
    let file = parse("val n = 1\nval probe = \"x$n\"");
    let (table, mut ctx) = collect(&file);
    let (decl, init) = probe(&file);
    let scope = table.declaring_scope(decl.id()).unwrap();
    ExpressionTypingServices::new().type_check(&mut ctx, scope, init, None, &FlowInfo::empty());

    assert!(ctx.compile_time_value.get(init.id).is_none());
    assert_eq!(ctx.expression_type.get(init.id), Some(&Type::String));
}

#[test]
fn flow_narrowing_takes_precedence_over_declared_type() {
    let file = parse("val a: Any = 1\nval probe = a");
    let (table, mut ctx) = collect(&file);
    let (decl, init) = probe(&file);
    let scope = table.declaring_scope(decl.id()).unwrap();
    let typing = ExpressionTypingServices::new();

    assert_eq!(typing.type_check(&mut ctx, scope, init, None, &FlowInfo::empty()), Some(Type::Any));
    let narrowed = FlowInfo::empty().with("a", Type::String);
    assert_eq!(typing.type_check(&mut ctx, scope, init, None, &narrowed), Some(Type::String));
}

#[test]
fn assignment_narrows_following_statements() {
    let src = "var a: Any = 1\nfun takes(s: String): Int = 0\nval probe = {\n a = \"s\"\n takes(a)\n}";
    let (ty, errs) = type_of_probe(src);
    assert!(errs.is_empty(), "{errs:?}");
    assert_eq!(ty, Some(Type::Fn(Vec::new(), Box::new(Type::Int))));
}

#[test]
fn without_assignment_no_narrowing() {
    let (_, errs) = type_of_probe("var a: Any = 1\nfun takes(s: String): Int = 0\nval probe = { takes(a) }");
    assert!(has_code(&errs, ErrorCode::S002));
}

#[test]
fn s005_val_reassignment() {
    let (_, errs) = type_of_probe("val a = 1\nval probe = { a = 2 }");
    assert!(has_code(&errs, ErrorCode::S005));
    assert!(has_message(&errs, "cannot be reassigned"));
}

#[test]
fn s004_operator_not_applicable() {
    let (ty, errs) = type_of_probe("val probe = 1 + true");
    assert!(has_code(&errs, ErrorCode::S004));
    assert_eq!(ty, None);
}

#[test]
fn s005_non_boolean_condition() {
    let (_, errs) = type_of_probe("val probe = if (1) 2 else 3");
    assert!(has_code(&errs, ErrorCode::S005));
}

#[test]
fn lambda_parameters_scoped_to_body() {
    let (ty, errs) = type_of_probe("val probe = { a: Int, b: String -> a }");
    assert!(errs.is_empty(), "{errs:?}");
    assert_eq!(ty, Some(Type::Fn(vec![Type::Int, Type::String], Box::new(Type::Int))));
}

#[test]
fn local_val_visible_to_later_statements() {
    let (ty, errs) = type_of_probe("val probe = {\n val x: Long = 1\n x\n}");
    assert!(errs.is_empty(), "{errs:?}");
    assert_eq!(ty, Some(Type::Fn(Vec::new(), Box::new(Type::Long))));
}

#[test]
fn type_used_as_value() {
    let (_, errs) = type_of_probe("val probe = Int");
    assert!(has_code(&errs, ErrorCode::S005));
}
