//! Data structures: values, classes, method tables, instances and the heap.

pub mod class;
pub mod error;
pub mod heap;
pub mod instance;
pub mod method;
pub mod method_table;
pub mod registry;
pub mod scope;
pub mod value;
