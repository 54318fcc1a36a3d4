//! Command-line driver around `ori_pcompile`.

pub mod demo_backend;
pub mod tracing_setup;

pub use demo_backend::DemoBackend;
