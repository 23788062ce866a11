//! The object runtime: class model, dispatch, host interop and built-ins.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod ds;
pub mod interop;
pub mod logging;
pub mod std_lib;
