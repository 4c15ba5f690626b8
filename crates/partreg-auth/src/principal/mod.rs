//! Principal resolution.

pub mod resolver;

pub use resolver::PrincipalResolver;
