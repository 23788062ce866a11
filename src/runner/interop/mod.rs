//! Host interop: reflection, boxing and the handle surface.

pub mod boxing;
pub mod handle;
pub mod host;
