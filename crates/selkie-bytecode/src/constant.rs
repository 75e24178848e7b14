//! Constant pool entries

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::code::CodeObject;

/// A constant pool entry.
///
/// Numbers are compared by raw bits for pooling so `+0` and `-0` keep
/// distinct entries and NaN deduplicates against itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Constant {
    /// IEEE-754 double
    Number(f64),
    /// String literal
    String(Arc<str>),
    /// BigInt literal, decimal digits (parsed by the VM on first push)
    BigInt(Arc<str>),
    /// Nested function bytecode
    Function(Arc<CodeObject>),
    /// Regular expression literal (pattern + flags, compiled by the host)
    RegExp {
        /// Pattern source between the slashes
        source: Arc<str>,
        /// Flag letters
        flags: Arc<str>,
    },
}

impl Constant {
    /// Pooling identity key. Functions never deduplicate.
    pub fn dedup_key(&self) -> Option<ConstantKey> {
        match self {
            Constant::Number(n) => Some(ConstantKey::Number(n.to_bits())),
            Constant::String(s) => Some(ConstantKey::String(s.clone())),
            Constant::BigInt(s) => Some(ConstantKey::BigInt(s.clone())),
            Constant::Function(_) => None,
            Constant::RegExp { .. } => None,
        }
    }
}

/// Hashable identity of a poolable constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantKey {
    /// Raw f64 bits
    Number(u64),
    /// String contents
    String(Arc<str>),
    /// BigInt digits
    BigInt(Arc<str>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_key_distinguishes_zero_signs() {
        let pos = Constant::Number(0.0).dedup_key();
        let neg = Constant::Number(-0.0).dedup_key();
        assert_ne!(pos, neg);
    }

    #[test]
    fn test_nan_deduplicates() {
        let a = Constant::Number(f64::NAN).dedup_key();
        let b = Constant::Number(f64::NAN).dedup_key();
        assert_eq!(a, b);
    }
}
