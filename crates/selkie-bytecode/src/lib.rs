//! Bytecode format for the Selkie VM
//!
//! This crate defines the contract shared by the compiler and the
//! interpreter: the opcode set, code objects, the constant pool, and the
//! atom (interned string) table.

pub mod atom;
pub mod code;
pub mod constant;
pub mod error;
pub mod opcode;

pub use atom::{Atom, AtomTable};
pub use code::{CaptureSource, CodeObject, CodeObjectBuilder, FunctionFlags, LineEntry};
pub use constant::{Constant, ConstantKey};
pub use error::BytecodeError;
pub use opcode::{Opcode, Operands};
