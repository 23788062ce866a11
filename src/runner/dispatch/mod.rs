//! Message sends.
//!
//! A send carries a receiver, a method name, evaluated arguments and
//! call-site flags. The [`resolver`] finds the entry, the [`partial`] engine
//! handles short argument lists, and [`operator`] maps operator tokens to
//! method names. The `impl Runtime` blocks in [`send`] tie them together.

pub mod context;
pub mod operator;
pub mod partial;
pub mod resolver;
pub mod send;

/// Call-site flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// Bind a prefix when fewer arguments than declared are given.
    pub allow_partial: bool,
    /// Unary operator written after its operand.
    pub postfix: bool,
}

impl CallSite {
    /// An ordinary `recv.name(args)` call.
    pub fn plain(allow_partial: bool) -> Self {
        CallSite {
            allow_partial,
            postfix: false,
        }
    }

    /// An explicit partial call site, partial binding always allowed.
    pub fn partial() -> Self {
        CallSite {
            allow_partial: true,
            postfix: false,
        }
    }

    /// Exact arity only.
    pub fn strict() -> Self {
        CallSite {
            allow_partial: false,
            postfix: false,
        }
    }

    pub fn with_postfix(mut self, postfix: bool) -> Self {
        self.postfix = postfix;
        self
    }
}
