//! Executable code objects
//!
//! A [`CodeObject`] is the in-memory contract between the compiler and the
//! VM: a byte stream plus the constant pool, referenced atoms, frame sizing
//! and flags. It is never persisted to disk.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::constant::Constant;

/// Function flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionFlags {
    /// Strict-mode code
    pub is_strict: bool,
    /// Async function
    pub is_async: bool,
    /// Generator function
    pub is_generator: bool,
    /// Arrow function (lexical `this`)
    pub is_arrow: bool,
    /// Derived class constructor (`this` starts uninitialized)
    pub is_derived_ctor: bool,
    /// Class constructor (not callable without `new`)
    pub is_ctor: bool,
    /// Module top-level code
    pub is_module: bool,
    /// Has a rest parameter
    pub has_rest: bool,
    /// Body references `arguments`
    pub uses_arguments: bool,
}

/// Where a closure capture is sourced from in the creating frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureSource {
    /// One of the creating frame's own cells
    Cell(u16),
    /// One of the creating frame's captured upvalues (transitive capture)
    Upvalue(u16),
}

/// A (pc, line, column) mapping entry. Entries are sorted by pc.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineEntry {
    /// First byte offset covered by this entry
    pub pc: u32,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

/// Compiled function body.
#[derive(Debug, Serialize, Deserialize)]
pub struct CodeObject {
    /// Function name (`None` for anonymous)
    pub name: Option<Box<str>>,
    /// Source file name
    pub filename: Arc<str>,
    /// Number of declared parameters (not counting rest)
    pub arity: u16,
    /// Number of local slots (parameters occupy a separate window)
    pub local_count: u16,
    /// Number of own closure cells
    pub cell_count: u16,
    /// Maximum operand-stack depth, computed statically by the emitter
    pub stack_size: u16,
    /// Rest-parameter slot comes after `arity` arguments
    pub flags: FunctionFlags,
    /// Capture descriptors, one per upvalue of closures made from this code
    pub captures: Vec<CaptureSource>,
    /// Instruction stream
    pub bytes: Vec<u8>,
    /// Constant pool
    pub constants: Vec<Constant>,
    /// Atoms referenced by the instruction stream (diagnostic aid)
    pub atoms: Vec<Atom>,
    /// Local slot names, for TDZ and const-assignment messages
    pub local_names: Vec<Box<str>>,
    /// Cell slot names
    pub cell_names: Vec<Box<str>>,
    /// pc -> source position table
    pub line_table: Vec<LineEntry>,
    /// Original source text of the function, for `toString`
    pub source: Option<Arc<str>>,
}

impl CodeObject {
    /// Function name or `<anonymous>`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Find the source position of a byte offset.
    pub fn position_for_pc(&self, pc: u32) -> Option<(u32, u32)> {
        let idx = match self.line_table.binary_search_by_key(&pc, |e| e.pc) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        self.line_table.get(idx).map(|e| (e.line, e.column))
    }

    /// Check if this code is a plain (non-async, non-generator) function.
    #[inline]
    pub fn is_plain(&self) -> bool {
        !self.flags.is_async && !self.flags.is_generator
    }
}

/// Builder for hand-assembling code objects in tests and bootstrap code.
#[derive(Debug, Default)]
pub struct CodeObjectBuilder {
    name: Option<Box<str>>,
    filename: Option<Arc<str>>,
    arity: u16,
    local_count: u16,
    cell_count: u16,
    stack_size: u16,
    flags: FunctionFlags,
    captures: Vec<CaptureSource>,
    bytes: Vec<u8>,
    constants: Vec<Constant>,
    atoms: Vec<Atom>,
    local_names: Vec<Box<str>>,
    cell_names: Vec<Box<str>>,
    line_table: Vec<LineEntry>,
    source: Option<Arc<str>>,
}

impl CodeObjectBuilder {
    /// Start a builder for the given file name.
    pub fn new(filename: impl Into<Arc<str>>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    /// Set the function name.
    pub fn name(mut self, name: impl Into<Box<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the declared parameter count.
    pub fn arity(mut self, arity: u16) -> Self {
        self.arity = arity;
        self
    }

    /// Set the local slot count.
    pub fn local_count(mut self, count: u16) -> Self {
        self.local_count = count;
        self
    }

    /// Set the maximum operand-stack depth.
    pub fn stack_size(mut self, size: u16) -> Self {
        self.stack_size = size;
        self
    }

    /// Set the function flags.
    pub fn flags(mut self, flags: FunctionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Append raw instruction bytes.
    pub fn bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = bytes;
        self
    }

    /// Append a constant, returning the builder.
    pub fn constant(mut self, constant: Constant) -> Self {
        self.constants.push(constant);
        self
    }

    /// Finish the code object.
    pub fn build(self) -> CodeObject {
        CodeObject {
            name: self.name,
            filename: self.filename.unwrap_or_else(|| Arc::from("<anonymous>")),
            arity: self.arity,
            local_count: self.local_count,
            cell_count: self.cell_count,
            stack_size: self.stack_size,
            flags: self.flags,
            captures: self.captures,
            bytes: self.bytes,
            constants: self.constants,
            atoms: self.atoms,
            local_names: self.local_names,
            cell_names: self.cell_names,
            line_table: self.line_table,
            source: self.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    #[test]
    fn test_builder() {
        let code = CodeObjectBuilder::new("test.js")
            .name("answer")
            .stack_size(1)
            .bytes(vec![Opcode::PushI8 as u8, 42, Opcode::Return as u8])
            .build();
        assert_eq!(code.display_name(), "answer");
        assert_eq!(code.bytes.len(), 3);
        assert!(code.is_plain());
    }

    #[test]
    fn test_position_lookup() {
        let mut code = CodeObjectBuilder::new("test.js").build();
        code.line_table = vec![
            LineEntry { pc: 0, line: 1, column: 1 },
            LineEntry { pc: 8, line: 2, column: 5 },
            LineEntry { pc: 20, line: 4, column: 1 },
        ];
        assert_eq!(code.position_for_pc(0), Some((1, 1)));
        assert_eq!(code.position_for_pc(12), Some((2, 5)));
        assert_eq!(code.position_for_pc(99), Some((4, 1)));
    }
}
