//! Built-in classes.
//!
//! The methods every runtime starts with: the root object protocol, the
//! reflective `Class` methods reached by class receivers, and the small
//! surface of the value classes (numbers, strings, symbols, arrays, procs)
//! used as method receivers.

pub mod array;
pub mod class;
pub mod core;
pub mod number;
pub mod object;
pub mod string;

pub use self::core::register_core_builtins;
