//! Bytecode errors

use thiserror::Error;

/// Malformed bytecode detected while decoding.
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Unknown opcode byte
    #[error("invalid opcode byte {0:#04x}")]
    InvalidOpcode(u8),

    /// Instruction stream ends inside an operand
    #[error("truncated operand at pc {0}")]
    TruncatedOperand(usize),

    /// Constant pool index out of range
    #[error("invalid constant index {0}")]
    InvalidConstant(u32),
}
