//! Tests for host interop: reflection, boxing, shadow classes and handles.

extern crate nova;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use nova::runner::api::Runtime;
use nova::runner::ds::error::RuntimeError;
use nova::runner::ds::method::MethodEntry;
use nova::runner::ds::scope::Scope;
use nova::runner::ds::value::Value;
use nova::runner::interop::host::{HostRef, HostTypeInfo, Reflect};

fn int(n: i64) -> Value {
    Value::Integer(n)
}

fn integer(value: &Value) -> Result<i64, RuntimeError> {
    value
        .as_integer()
        .ok_or_else(|| RuntimeError::TypeError(format!("expected an integer, got {}", value.type_name())))
}

struct NativeHelper {
    field_test: AtomicI64,
}

impl NativeHelper {
    fn new(value: i64) -> Self {
        NativeHelper {
            field_test: AtomicI64::new(value),
        }
    }
}

impl Reflect for NativeHelper {
    fn reflect() -> HostTypeInfo {
        HostTypeInfo::of::<NativeHelper>()
            .add_field(
                "_fieldTest",
                |h: &NativeHelper| int(h.field_test.load(Ordering::SeqCst)),
                |h: &NativeHelper, v| {
                    h.field_test.store(integer(&v)?, Ordering::SeqCst);
                    Ok(())
                },
            )
            .build()
    }
}

struct SVTestClass {
    a: AtomicI64,
    b: AtomicI64,
}

impl Reflect for SVTestClass {
    fn reflect() -> HostTypeInfo {
        HostTypeInfo::of::<SVTestClass>()
            .add_field(
                "a",
                |h: &SVTestClass| int(h.a.load(Ordering::SeqCst)),
                |h: &SVTestClass, v| {
                    h.a.store(integer(&v)?, Ordering::SeqCst);
                    Ok(())
                },
            )
            .add_readonly_field("b", |h: &SVTestClass| int(h.b.load(Ordering::SeqCst)))
            .add_method("add", 1, |h: &SVTestClass, args| {
                let c = integer(&args[0])?;
                Ok(int(h.a.load(Ordering::SeqCst) + h.b.load(Ordering::SeqCst) + c))
            })
            .add_method("mult", 0, |h: &SVTestClass, _| {
                Ok(int(h.a.load(Ordering::SeqCst) * h.b.load(Ordering::SeqCst)))
            })
            .with_constructor(2, |args| {
                Ok(SVTestClass {
                    a: AtomicI64::new(integer(&args[0])?),
                    b: AtomicI64::new(integer(&args[1])?),
                })
            })
            .build()
    }
}

struct ExportHelper;

impl Reflect for ExportHelper {
    fn reflect() -> HostTypeInfo {
        HostTypeInfo::of::<ExportHelper>()
            .with_name("Export")
            .add_method("TestMe", 1, |_, args| Ok(int(integer(&args[0])? + 27)))
            .export_as("test_me")
            .add_method("ShouldNotExport", 0, |_, _| Ok(int(1)))
            .do_not_export()
            .add_method("Internal", 0, |_, _| Ok(int(2)))
            .hidden()
            .add_method("Secret", 0, |_, _| Ok(int(3)))
            .hidden()
            .export_as("revealed")
            .build()
    }
}

struct TextBuffer {
    text: Mutex<String>,
}

impl Reflect for TextBuffer {
    fn reflect() -> HostTypeInfo {
        HostTypeInfo::of::<TextBuffer>()
            .add_method("Append", 1, |h: &TextBuffer, args| {
                h.text.lock().push_str(&args[0].to_string());
                Ok(Value::Nil)
            })
            .add_method("ToString", 0, |h: &TextBuffer, _| Ok(Value::str(&h.text.lock())))
            .with_constructor(1, |args| {
                Ok(TextBuffer {
                    text: Mutex::new(args[0].to_string()),
                })
            })
            .build()
    }
}

/// Has no constructor; instantiating its shadow class yields `nil`.
struct Shape;

impl Reflect for Shape {
    fn reflect() -> HostTypeInfo {
        HostTypeInfo::of::<Shape>()
            .add_method("sides", 0, |_, _| Ok(int(0)))
            .build()
    }
}

struct Internal;

impl Reflect for Internal {
    fn reflect() -> HostTypeInfo {
        HostTypeInfo::of::<Internal>().not_exported().build()
    }
}

// ============================================================================
// Box identity and host state
// ============================================================================

mod box_tests {
    use super::*;

    #[test]
    fn test_same_host_value_boxes_once() {
        let rt = Runtime::new();
        let helper = Arc::new(NativeHelper::new(1));
        let first = rt.box_value(HostRef::from_arc(helper.clone()), None).unwrap();
        let second = rt.box_value(HostRef::from_arc(helper), None).unwrap();
        assert_eq!(first, second);

        let other = rt.box_value(HostRef::new(NativeHelper::new(1)), None).unwrap();
        assert_ne!(first, other);
        assert_eq!(first.class().unwrap(), other.class().unwrap());
        assert_eq!(first.class().unwrap().name(), "NativeHelper");
    }

    #[test]
    fn test_boxes_of_one_host_value_share_state() {
        let rt = Runtime::new();
        let helper = Arc::new(NativeHelper::new(3));
        let first = rt.box_value(HostRef::from_arc(helper.clone()), None).unwrap();
        let second = rt.box_value(HostRef::from_arc(helper), None).unwrap();
        let stranger = rt.box_value(HostRef::new(NativeHelper::new(3)), None).unwrap();

        first.set("tag", Value::str("shared")).unwrap();
        first
            .set(
                "double",
                Value::Function(MethodEntry::closure("double", 0, |ctx, _| {
                    let rt = ctx.runtime();
                    let field = rt.get_member(ctx.receiver(), "_fieldTest")?;
                    rt.binary_op(&field, "*", int(2))
                })),
            )
            .unwrap();

        assert_eq!(second.get("tag").unwrap(), Value::str("shared"));
        assert_eq!(second.invoke("double", vec![]).unwrap(), int(6));
        assert_eq!(stranger.get("tag").unwrap(), Value::Nil);
        assert!(rt.instance_variables(stranger.value()).unwrap().is_empty());
        assert_eq!(rt.rescue(|_| stranger.invoke("double", vec![])), Value::Nil);
    }

    #[test]
    fn test_ivars_live_beside_host_fields() {
        let rt = Runtime::new();
        let shadow = rt.box_type::<NativeHelper>().unwrap();
        shadow
            .define_method(MethodEntry::closure("test", 0, |ctx, _| {
                let rt = ctx.runtime();
                let field = rt.get_member(ctx.receiver(), "_fieldTest")?;
                rt.binary_op(&field, "+", ctx.ivar("@x")?)
            }))
            .unwrap();

        let ft = rt.box_value(HostRef::new(NativeHelper::new(22)), None).unwrap();
        ft.set("x", int(15)).unwrap();
        assert_eq!(ft.invoke("test", vec![]).unwrap(), int(37));
        assert_eq!(rt.instance_variables(ft.value()).unwrap(), vec!["@x".to_string()]);
    }

    #[test]
    fn test_field_writes_reach_the_host() {
        let rt = Runtime::new();
        let helper = Arc::new(NativeHelper::new(0));
        let ft = rt.box_value(HostRef::from_arc(helper.clone()), None).unwrap();
        ft.set("_fieldTest", int(25)).unwrap();
        assert_eq!(helper.field_test.load(Ordering::SeqCst), 25);
        assert_eq!(ft.get("_fieldTest").unwrap(), int(25));
    }

    #[test]
    fn test_readonly_field_rejects_writes() {
        let rt = Runtime::new();
        let sv = rt
            .box_type::<SVTestClass>()
            .unwrap()
            .new_instance(vec![int(1), int(2)])
            .unwrap();
        assert!(matches!(
            sv.set("b", int(9)),
            Err(RuntimeError::HostError(_))
        ));
        sv.set("a", int(5)).unwrap();
        assert_eq!(sv.invoke("mult", vec![]).unwrap(), int(10));
    }

    #[test]
    fn test_foreign_values_are_boxed_on_send() {
        let rt = Runtime::new();
        let helper = Arc::new(NativeHelper::new(4));
        let foreign = Value::Foreign(HostRef::from_arc(helper.clone()));
        assert_eq!(rt.get_member(&foreign, "_fieldTest").unwrap(), int(4));

        let boxed = rt.box_value(HostRef::from_arc(helper), None).unwrap();
        assert_eq!(
            rt.host_of(boxed.value()).unwrap().identity(),
            rt.host_of(&foreign).unwrap().identity()
        );
    }

    #[test]
    fn test_opaque_values_cannot_be_boxed() {
        let rt = Runtime::new();
        assert!(matches!(
            rt.box_value(HostRef::opaque(42u8), None),
            Err(RuntimeError::UnboxableTypeError { .. })
        ));
        assert!(matches!(
            rt.box_value(HostRef::new(Internal), None),
            Err(RuntimeError::UnboxableTypeError { .. })
        ));
    }
}

// ============================================================================
// Extending boxed values
// ============================================================================

mod extension_tests {
    use super::*;

    #[test]
    fn test_extension_method_on_shadow_class() {
        let rt = Runtime::new();
        let shadow = rt.box_type::<NativeHelper>().unwrap();
        let plus_three = Value::Function(MethodEntry::closure("plus_three", 0, |ctx, _| {
            let rt = ctx.runtime();
            let field = rt.get_member(ctx.receiver(), "_fieldTest")?;
            rt.binary_op(&field, "+", int(3))
        }));
        shadow.set("plus_three", plus_three).unwrap();

        let ft = rt.box_value(HostRef::new(NativeHelper::new(22)), None).unwrap();
        assert_eq!(ft.invoke("plus_three", vec![]).unwrap(), int(25));
    }

    #[test]
    fn test_extension_reaches_existing_boxes() {
        let rt = Runtime::new();
        let early = rt.box_value(HostRef::new(NativeHelper::new(4)), None).unwrap();
        assert!(!rt.responds_to(early.value(), "plus_five").unwrap());

        early
            .class()
            .unwrap()
            .define_method(MethodEntry::closure("plus_five", 0, |ctx, _| {
                let rt = ctx.runtime();
                let field = rt.get_member(ctx.receiver(), "_fieldTest")?;
                rt.binary_op(&field, "+", int(5))
            }))
            .unwrap();

        let late = rt.box_value(HostRef::new(NativeHelper::new(1)), None).unwrap();
        assert_eq!(early.invoke("plus_five", vec![]).unwrap(), int(9));
        assert_eq!(late.invoke("plus_five", vec![]).unwrap(), int(6));
    }

    #[test]
    fn test_extension_calls_host_methods() {
        let rt = Runtime::new();
        let shadow = rt.box_type::<TextBuffer>().unwrap();
        shadow
            .define_method(MethodEntry::closure("AppendLine", 1, |ctx, args| {
                ctx.send_self("Append", args)?;
                ctx.send_self("Append", vec![Value::str("\n")])
            }))
            .unwrap();

        let sb = shadow.new_instance(vec![Value::str("a")]).unwrap();
        sb.invoke("AppendLine", vec![Value::str("b")]).unwrap();
        assert_eq!(sb.invoke("ToString", vec![]).unwrap(), Value::str("ab\n"));
    }

    #[test]
    fn test_singleton_on_boxed_value() {
        let rt = Runtime::new();
        let ft = rt.box_value(HostRef::new(NativeHelper::new(20)), None).unwrap();
        let other = rt.box_value(HostRef::new(NativeHelper::new(20)), None).unwrap();
        let add_five = Value::Function(MethodEntry::closure("add_five", 0, |ctx, _| {
            let rt = ctx.runtime();
            let field = rt.get_member(ctx.receiver(), "_fieldTest")?;
            rt.binary_op(&field, "+", int(5))
        }));
        ft.set("add_five", add_five).unwrap();

        assert_eq!(ft.invoke("add_five", vec![]).unwrap(), int(25));
        assert_eq!(rt.rescue(|_| other.invoke("add_five", vec![])), Value::Nil);
    }

    #[test]
    fn test_subclass_of_shadow_class_uses_host_constructor() {
        let rt = Runtime::new();
        let shadow = rt.box_type::<SVTestClass>().unwrap();
        let sub = rt.define_class("SVTestSub", Some(shadow.id())).unwrap();
        let x = rt.instantiate(sub, vec![int(15), int(10)]).unwrap();

        assert_eq!(rt.send(&x, "mult", vec![]).unwrap(), int(150));
        assert!(rt.is_a(&x, shadow.id()).unwrap());
        assert!(rt.host_of(&x).is_some());
    }
}

// ============================================================================
// Export policy and constructors
// ============================================================================

mod export_tests {
    use super::*;

    #[test]
    fn test_renamed_and_hidden_members() {
        let rt = Runtime::new();
        let export = rt.box_value(HostRef::new(ExportHelper), None).unwrap();
        assert_eq!(export.class().unwrap().name(), "Export");
        assert_eq!(export.invoke("test_me", vec![int(13)]).unwrap(), int(40));
        assert_eq!(export.invoke("revealed", vec![]).unwrap(), int(3));

        assert_eq!(rt.rescue(|_| export.invoke("ShouldNotExport", vec![])), Value::Nil);
        assert!(!rt.responds_to(export.value(), "TestMe").unwrap());
        assert!(!rt.responds_to(export.value(), "Internal").unwrap());
        assert!(rt.responds_to(export.value(), "test_me").unwrap());
    }

    #[test]
    fn test_host_constructor() {
        let rt = Runtime::new();
        let seed = TextBuffer {
            text: Mutex::new(String::new()),
        };
        let boxed = rt.box_value(HostRef::new(seed), Some(rt.globals())).unwrap();
        assert!(!boxed.value().is_nil());

        let class = rt.globals().get_variable("TextBuffer").unwrap();
        let sb = rt.call_value(&class, vec![Value::str("Hello")]).unwrap();
        rt.send(&sb, "Append", vec![Value::str(" from Nova!")]).unwrap();
        assert_eq!(
            rt.send(&sb, "ToString", vec![]).unwrap(),
            Value::str("Hello from Nova!")
        );
        assert!(matches!(
            rt.call_value(&class, vec![]),
            Err(RuntimeError::ArityError { .. })
        ));
    }

    #[test]
    fn test_type_without_constructor_instantiates_to_nil() {
        let rt = Runtime::new();
        let shape = rt.box_type::<Shape>().unwrap();
        assert_eq!(rt.instantiate(shape.id(), vec![]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_partial_from_host_method() {
        let rt = Runtime::new();
        let sv = rt
            .box_type::<SVTestClass>()
            .unwrap()
            .new_instance(vec![int(10), int(20)])
            .unwrap();
        let pinv = sv.invoke("add", vec![]).unwrap();
        assert!(matches!(pinv, Value::Partial(_)));
        assert_eq!(rt.call_value(&pinv, vec![int(10)]).unwrap(), int(40));
    }

    #[test]
    fn test_scope_binding() {
        let rt = Runtime::new();
        let scope = Scope::new();
        rt.box_value(HostRef::new(NativeHelper::new(0)), Some(&scope)).unwrap();
        assert!(matches!(scope.get_variable("NativeHelper"), Some(Value::Class(_))));
        assert!(rt.globals().get_variable("NativeHelper").is_none());
    }
}
