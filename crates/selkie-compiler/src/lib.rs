//! AST to bytecode compiler for the Selkie VM

pub mod emit;
pub mod error;
pub mod scope;

pub use emit::{Emitter, Label};
pub use error::{CompileError, CompileResult};
pub use scope::{Binding, BindingKind, BlockScope, Storage};
