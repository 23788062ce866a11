//! # nova - object and class runtime
//!
//! The object model behind a dynamic, Ruby-flavoured scripting language:
//! - Single-inheritance classes, modules and mixins, reopenable at any time
//! - Arity-overloaded method tables with `undef_method` / `remove_method`
//! - Per-object singleton methods and `class << obj`
//! - Implicit partial application and user-definable operators
//! - Boxing of Rust host values into script objects through reflection
//!
//! Parsing and compiling source text is not part of this crate. A compiler
//! front end builds method bodies as closures over
//! [`runner::dispatch::context::CallContext`] and drives everything through
//! [`runner::api::Runtime`].
//!
//! ## Quick Start
//!
//! ```
//! use nova::runner::api::Runtime;
//! use nova::runner::ds::method::MethodEntry;
//! use nova::runner::ds::value::Value;
//!
//! let rt = Runtime::new();
//! let base = rt.define_class("Base", None).unwrap();
//! let sub = rt.define_class("Sub", Some(base)).unwrap();
//!
//! rt.define_method(base, MethodEntry::closure("test", 0, |_, _| Ok(Value::Integer(25))))
//!     .unwrap();
//! rt.define_method(sub, MethodEntry::closure("test", 0, |ctx, _| {
//!     let inherited = ctx.call_super(vec![])?;
//!     ctx.runtime().binary_op(&inherited, "+", Value::Integer(10))
//! }))
//! .unwrap();
//!
//! let obj = rt.instantiate(sub, vec![]).unwrap();
//! assert_eq!(rt.send(&obj, "test", vec![]).unwrap(), Value::Integer(35));
//! ```
//!
//! ### Partial application
//!
//! ```
//! use nova::runner::api::Runtime;
//! use nova::runner::ds::method::MethodEntry;
//! use nova::runner::ds::value::Value;
//!
//! let rt = Runtime::new();
//! let class = rt.define_class("Calc", None).unwrap();
//! rt.define_method(class, MethodEntry::closure("add", 2, |ctx, args| {
//!     ctx.runtime().binary_op(&args[0], "+", args[1].clone())
//! }))
//! .unwrap();
//!
//! let calc = rt.instantiate(class, vec![]).unwrap();
//! let add_twenty = rt.send(&calc, "add", vec![Value::Integer(20)]).unwrap();
//! assert_eq!(rt.pipe(Value::Integer(7), &add_twenty).unwrap(), Value::Integer(27));
//! ```
//!
//! ## Architecture
//!
//! - **[`runner::ds`]** - Values, class nodes, method tables, instances, heap
//! - **[`runner::dispatch`]** - Method resolution, partial application, operators
//! - **[`runner::interop`]** - Host reflection, boxing and dynamic handles
//! - **[`runner::std_lib`]** - Built-in classes
//! - **[`runner::api`]** - The [`Runtime`](runner::api::Runtime) façade

#[macro_use]
extern crate lazy_static;

pub mod runner;

pub use runner::api::Runtime;
pub use runner::config::RuntimeConfig;
pub use runner::ds::error::RuntimeError;
pub use runner::ds::value::Value;
