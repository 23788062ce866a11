//! Tests for classes, modules, reopening and method table mutation.
//!
//! Method bodies are written as closures standing in for compiled script
//! code.

extern crate nova;

use std::sync::Arc;

use nova::runner::api::Runtime;
use nova::runner::dispatch::context::CallContext;
use nova::runner::ds::class::ClassId;
use nova::runner::ds::error::RuntimeError;
use nova::runner::ds::method::MethodEntry;
use nova::runner::ds::value::Value;

fn int(n: i64) -> Value {
    Value::Integer(n)
}

fn returning(name: &str, value: Value) -> Arc<MethodEntry> {
    MethodEntry::closure(name, 0, move |_, _| Ok(value.clone()))
}

fn def(rt: &Runtime, class: ClassId, name: &str, value: Value) {
    rt.define_method(class, returning(name, value)).unwrap();
}

fn call(rt: &Runtime, receiver: &Value, name: &str) -> Result<Value, RuntimeError> {
    rt.send(receiver, name, vec![])
}

/// `begin { receiver.name } rescue * { nil }`
fn call_or_nil(rt: &Runtime, receiver: &Value, name: &str) -> Value {
    let receiver = receiver.clone();
    rt.rescue(|rt| rt.send(&receiver, name, vec![]))
}

fn new(rt: &Runtime, class: ClassId) -> Value {
    rt.instantiate(class, vec![]).unwrap()
}

// ============================================================================
// Definition and inheritance
// ============================================================================

mod definition_tests {
    use super::*;

    #[test]
    fn test_simple_class_definition() {
        let rt = Runtime::new();
        let class = rt.define_class("sv_string", None).unwrap();
        def(&rt, class, "print", Value::str("Hello world!"));
        let x = new(&rt, class);
        assert_eq!(call(&rt, &x, "print").unwrap(), Value::str("Hello world!"));
    }

    #[test]
    fn test_inherited_method() {
        let rt = Runtime::new();
        let sup = rt.define_class("sv_superclass", None).unwrap();
        def(&rt, sup, "print", Value::str("Hello world!"));
        let sub = rt.define_class("sv_subclass", Some(sup)).unwrap();
        let x = new(&rt, sub);
        assert_eq!(call(&rt, &x, "print").unwrap(), Value::str("Hello world!"));
    }

    #[test]
    fn test_override() {
        let rt = Runtime::new();
        let sup = rt.define_class("sv_superclass0", None).unwrap();
        def(&rt, sup, "print", Value::str("Hello world!"));
        let sub = rt.define_class("sv_subclass0", Some(sup)).unwrap();
        def(&rt, sub, "print", Value::str("Hello you!"));
        let x = new(&rt, sub);
        assert_eq!(call(&rt, &x, "print").unwrap(), Value::str("Hello you!"));
    }

    #[test]
    fn test_override_calls_super() {
        let rt = Runtime::new();
        let sup = rt.define_class("sv_superclass1", None).unwrap();
        def(&rt, sup, "print", Value::str("Hello me!"));
        let sub = rt.define_class("sv_subclass1", Some(sup)).unwrap();
        rt.define_method(
            sub,
            MethodEntry::closure("print", 0, |ctx, _| ctx.super_send("print", vec![])),
        )
        .unwrap();
        let x = new(&rt, sub);
        assert_eq!(call(&rt, &x, "print").unwrap(), Value::str("Hello me!"));
    }

    #[test]
    fn test_super_and_self_in_one_body() {
        let rt = Runtime::new();
        let sup = rt.define_class("sv_superclass2", None).unwrap();
        def(&rt, sup, "print0", Value::str("Hello"));
        def(&rt, sup, "print", Value::str("Goodbye"));
        let sub = rt.define_class("sv_subclass2", Some(sup)).unwrap();
        def(&rt, sub, "print0", Value::str(" world!"));
        rt.define_method(
            sub,
            MethodEntry::closure("print", 0, |ctx: &mut CallContext<'_>, _| {
                let rt = ctx.runtime();
                let x = Value::str("");
                rt.binary_op(&x, "<<", ctx.super_send("print0", vec![])?)?;
                rt.binary_op(&x, "<<", ctx.send_self("print0", vec![])?)?;
                Ok(x)
            }),
        )
        .unwrap();
        let x = new(&rt, sub);
        assert_eq!(call(&rt, &x, "print").unwrap(), Value::str("Hello world!"));
    }

    #[test]
    fn test_reopen_merges_members() {
        let rt = Runtime::new();
        let first = rt.define_class("Reopened", None).unwrap();
        def(&rt, first, "a", int(1));
        let second = rt.define_class("Reopened", None).unwrap();
        assert_eq!(first, second);
        def(&rt, second, "b", int(2));

        let x = new(&rt, first);
        assert_eq!(call(&rt, &x, "a").unwrap(), int(1));
        assert_eq!(call(&rt, &x, "b").unwrap(), int(2));
    }

    #[test]
    fn test_reopen_with_other_superclass_fails() {
        let rt = Runtime::new();
        let a = rt.define_class("A", None).unwrap();
        let b = rt.define_class("B", None).unwrap();
        rt.define_class("C", Some(a)).unwrap();
        assert!(rt.define_class("C", Some(a)).is_ok());
        assert!(matches!(
            rt.define_class("C", Some(b)),
            Err(RuntimeError::ClassConflictError { .. })
        ));
    }

    #[test]
    fn test_class_and_module_names_conflict() {
        let rt = Runtime::new();
        rt.define_module("Shared").unwrap();
        assert!(matches!(
            rt.define_class("Shared", None),
            Err(RuntimeError::ClassConflictError { .. })
        ));
        rt.define_class("Concrete", None).unwrap();
        assert!(matches!(
            rt.define_module("Concrete"),
            Err(RuntimeError::ClassConflictError { .. })
        ));
    }

    #[test]
    fn test_anonymous_class() {
        let rt = Runtime::new();
        let anon = rt.define_anonymous_class(None).unwrap();
        rt.define_method(
            anon,
            MethodEntry::closure("new", 0, |ctx, _| {
                ctx.set_ivar("@x", int(10))?;
                Ok(Value::Nil)
            }),
        )
        .unwrap();
        rt.define_method(
            anon,
            MethodEntry::closure("add", 1, |ctx, args| {
                let x = ctx.ivar("@x")?;
                ctx.runtime().binary_op(&x, "+", args[0].clone())
            }),
        )
        .unwrap();

        assert!(rt.class_name(anon).starts_with("#<Class:"));
        assert!(rt.resolve_path(&rt.class_name(anon), None).is_err());

        let x = rt.call_value(&Value::Class(anon), vec![]).unwrap();
        assert_eq!(rt.send(&x, "add", vec![int(20)]).unwrap(), int(30));
    }

    #[test]
    fn test_module_cannot_be_instantiated() {
        let rt = Runtime::new();
        let module = rt.define_module("Helpers").unwrap();
        assert!(matches!(
            rt.instantiate(module, vec![]),
            Err(RuntimeError::NoMethodError { .. })
        ));
    }

    #[test]
    fn test_constructor_super_chain() {
        let rt = Runtime::new();
        let base = rt.define_class("Shape", None).unwrap();
        rt.define_method(
            base,
            MethodEntry::closure("new", 1, |ctx, args| {
                ctx.set_ivar("sides", args[0].clone())?;
                Ok(Value::Nil)
            }),
        )
        .unwrap();
        let square = rt.define_class("Square", Some(base)).unwrap();
        rt.define_method(
            square,
            MethodEntry::closure("new", 0, |ctx, _| {
                ctx.call_super(vec![int(4)])?;
                ctx.set_ivar("name", Value::str("square"))?;
                Ok(Value::Nil)
            }),
        )
        .unwrap();

        let sq = new(&rt, square);
        assert_eq!(rt.ivar_get(&sq, "sides").unwrap(), int(4));
        assert_eq!(rt.ivar_get(&sq, "name").unwrap(), Value::str("square"));
        assert!(matches!(
            rt.instantiate(square, vec![int(1), int(2)]),
            Err(RuntimeError::NoMethodError { .. }) | Err(RuntimeError::ArityError { .. })
        ));
    }
}

// ============================================================================
// Modules and mixins
// ============================================================================

mod module_tests {
    use super::*;

    #[test]
    fn test_module_include() {
        let rt = Runtime::new();
        let module = rt.define_module("TestModule").unwrap();
        rt.define_method(
            module,
            MethodEntry::closure("testModuleFunc", 1, |ctx, args| {
                ctx.runtime().binary_op(&args[0], "*", int(2))
            }),
        )
        .unwrap();
        let class = rt.define_class("ModuleTestClass", None).unwrap();
        rt.include_module(class, module).unwrap();

        let x = new(&rt, class);
        assert_eq!(rt.send(&x, "testModuleFunc", vec![int(10)]).unwrap(), int(20));
    }

    #[test]
    fn test_later_mixin_wins() {
        let rt = Runtime::new();
        let first = rt.define_module("First").unwrap();
        let second = rt.define_module("Second").unwrap();
        def(&rt, first, "who", Value::str("first"));
        def(&rt, second, "who", Value::str("second"));
        let class = rt.define_class("Both", None).unwrap();
        rt.include_module(class, first).unwrap();
        rt.include_module(class, second).unwrap();
        rt.include_module(class, first).unwrap();

        let ancestors = rt.ancestors(class);
        assert_eq!(&ancestors[..3], &[class, second, first]);
        let x = new(&rt, class);
        assert_eq!(call(&rt, &x, "who").unwrap(), Value::str("second"));
    }

    #[test]
    fn test_include_cycle_is_rejected() {
        let rt = Runtime::new();
        let a = rt.define_module("CycleA").unwrap();
        let b = rt.define_module("CycleB").unwrap();
        rt.include_module(a, b).unwrap();
        assert!(matches!(
            rt.include_module(b, a),
            Err(RuntimeError::ModuleIncludeError { .. })
        ));
        assert!(matches!(
            rt.include_module(a, a),
            Err(RuntimeError::ModuleIncludeError { .. })
        ));
    }

    #[test]
    fn test_include_unknown_path() {
        let rt = Runtime::new();
        let class = rt.define_class("Lonely", None).unwrap();
        assert!(matches!(
            rt.include_path(class, "Nowhere::Thing"),
            Err(RuntimeError::ModuleIncludeError { .. })
        ));
    }

    #[test]
    fn test_sub_module_constants() {
        let rt = Runtime::new();
        let module = rt.define_module("TestModule2").unwrap();
        let class2 = rt.define_class_in(module, "ModuleClass2", None).unwrap();
        rt.define_method(
            class2,
            MethodEntry::closure("testFunc", 1, |ctx, args| {
                ctx.runtime().binary_op(&args[0], "*", int(5))
            }),
        )
        .unwrap();
        let class3 = rt.define_class_in(module, "ModuleClass3", None).unwrap();
        def(&rt, class3, "testFunc2", Value::Nil);

        let host = rt.define_class("ModuleTestClass2", None).unwrap();
        rt.include_path(host, "TestModule2::ModuleClass2").unwrap();
        rt.define_method(
            host,
            MethodEntry::closure("new", 0, move |ctx, _| {
                let rt = ctx.runtime();
                let tmp_class = rt.resolve_path("ModuleClass2", Some(host))?;
                let tmp = rt.instantiate(tmp_class, vec![])?;
                ctx.set_ivar("x", rt.send(&tmp, "testFunc", vec![int(5)])?)?;
                ctx.set_ivar("y", int(0))?;
                let y = rt.rescue(|rt| {
                    let class3 = rt.resolve_path("ModuleClass3", Some(host))?;
                    rt.instantiate(class3, vec![])
                });
                ctx.set_ivar("y", if y.is_nil() { int(10) } else { y })?;
                Ok(Value::Nil)
            }),
        )
        .unwrap();

        let x = new(&rt, host);
        let result = Value::array(vec![
            rt.get_member(&x, "x").unwrap(),
            rt.get_member(&x, "y").unwrap(),
        ]);
        assert_eq!(result, Value::array(vec![int(25), int(10)]));
    }
}

// ============================================================================
// undef_method / remove_method
// ============================================================================

mod undef_remove_tests {
    use super::*;

    #[test]
    fn test_undef_in_same_body() {
        let rt = Runtime::new();
        let class = rt.define_class("UndefMethodTest", None).unwrap();
        def(&rt, class, "test", int(25));
        rt.undef_method(class, "test").unwrap();
        let x = new(&rt, class);
        assert_eq!(call_or_nil(&rt, &x, "test"), Value::Nil);
        assert!(matches!(
            call(&rt, &x, "test"),
            Err(RuntimeError::NoMethodError { .. })
        ));
    }

    #[test]
    fn test_undef_after_reopen() {
        let rt = Runtime::new();
        let class = rt.define_class("UndefMethodTest2", None).unwrap();
        def(&rt, class, "test", int(25));
        let reopened = rt.define_class("UndefMethodTest2", None).unwrap();
        rt.undef_method(reopened, "test").unwrap();
        let x = new(&rt, class);
        assert_eq!(call_or_nil(&rt, &x, "test"), Value::Nil);
    }

    #[test]
    fn test_undef_blocks_inherited() {
        let rt = Runtime::new();
        let sup = rt.define_class("UndefMethodSuperTest", None).unwrap();
        def(&rt, sup, "test", int(25));
        let sub = rt.define_class("UndefMethodSubTest", Some(sup)).unwrap();
        def(&rt, sub, "test", int(50));
        rt.undef_method(sub, "test").unwrap();
        let x = new(&rt, sub);
        assert_eq!(call_or_nil(&rt, &x, "test"), Value::Nil);
        assert!(!rt.method_defined(sub, "test"));
        assert!(rt.method_defined(sup, "test"));
    }

    #[test]
    fn test_remove_exposes_inherited() {
        let rt = Runtime::new();
        let sup = rt.define_class("RemoveMethodSuperTest", None).unwrap();
        def(&rt, sup, "test", int(25));
        let sub = rt.define_class("RemoveMethodSubTest", Some(sup)).unwrap();
        def(&rt, sub, "test", int(50));
        rt.remove_method(sub, "test").unwrap();
        let x = new(&rt, sub);
        assert_eq!(call(&rt, &x, "test").unwrap(), int(25));
    }

    #[test]
    fn test_remove_without_inherited_definition() {
        let rt = Runtime::new();
        let class = rt.define_class("RemoveMethodTest", None).unwrap();
        def(&rt, class, "test", int(25));
        rt.remove_method(class, "test").unwrap();
        let x = new(&rt, class);
        assert_eq!(call_or_nil(&rt, &x, "test"), Value::Nil);

        let reopened = rt.define_class("RemoveMethodTest2", None).unwrap();
        def(&rt, reopened, "test", int(25));
        let reopened = rt.define_class("RemoveMethodTest2", None).unwrap();
        rt.remove_method(reopened, "test").unwrap();
        let y = new(&rt, reopened);
        assert_eq!(call_or_nil(&rt, &y, "test"), Value::Nil);
    }

    #[test]
    fn test_redefine_after_undef_or_remove() {
        let rt = Runtime::new();
        let undef = rt.define_class("UndefMethodRedefTest", None).unwrap();
        def(&rt, undef, "test", int(10));
        rt.undef_method(undef, "test").unwrap();
        def(&rt, undef, "test", int(25));
        assert_eq!(call(&rt, &new(&rt, undef), "test").unwrap(), int(25));

        let remove = rt.define_class("RemoveMethodRedefTest", None).unwrap();
        def(&rt, remove, "test", int(10));
        rt.remove_method(remove, "test").unwrap();
        def(&rt, remove, "test", int(25));
        assert_eq!(call(&rt, &new(&rt, remove), "test").unwrap(), int(25));
    }

    #[test]
    fn test_undef_redefine_then_remove() {
        let rt = Runtime::new();
        let sup = rt.define_class("UndefMethodRedefSuperTest", None).unwrap();
        def(&rt, sup, "test", int(25));
        let sub = rt.define_class("UndefMethodRedefSubTest", Some(sup)).unwrap();
        def(&rt, sub, "test", int(50));
        rt.undef_method(sub, "test").unwrap();
        def(&rt, sub, "test", int(10));
        rt.remove_method(sub, "test").unwrap();
        assert_eq!(call(&rt, &new(&rt, sub), "test").unwrap(), int(25));
    }

    #[test]
    fn test_undef_through_class_receiver() {
        let rt = Runtime::new();
        let class = rt.define_class("UndefSingletonTest", None).unwrap();
        def(&rt, class, "test", int(25));
        rt.send(&Value::Class(class), "undef_method", vec![Value::symbol(":test")])
            .unwrap();
        let x = new(&rt, class);
        assert_eq!(call_or_nil(&rt, &x, "test"), Value::Nil);
    }

    #[test]
    fn test_instance_remove_method_only_affects_that_instance() {
        let rt = Runtime::new();
        let sup = rt.define_class("RemoveMethodSingletonSuperTest", None).unwrap();
        def(&rt, sup, "test", Value::Nil);
        let sub = rt
            .define_class("RemoveMethodSingletonSubTest", Some(sup))
            .unwrap();
        def(&rt, sub, "test", int(25));

        let x = new(&rt, sub);
        let y = new(&rt, sub);
        rt.send(&y, "remove_method", vec![Value::symbol(":test")]).unwrap();

        let result = Value::array(vec![
            call(&rt, &x, "test").unwrap(),
            call(&rt, &y, "test").unwrap(),
        ]);
        assert_eq!(result, Value::array(vec![int(25), Value::Nil]));
    }

    #[test]
    fn test_instance_methods_listing_respects_undef() {
        let rt = Runtime::new();
        let sup = rt.define_class("Listed", None).unwrap();
        def(&rt, sup, "kept", int(1));
        def(&rt, sup, "dropped", int(2));
        let sub = rt.define_class("ListedSub", Some(sup)).unwrap();
        rt.undef_method(sub, "dropped").unwrap();

        let names = rt.instance_method_names(sub);
        assert!(names.contains(&"kept".to_string()));
        assert!(!names.contains(&"dropped".to_string()));
    }
}
