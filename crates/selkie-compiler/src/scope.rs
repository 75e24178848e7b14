//! Scopes and variable resolution
//!
//! Bindings live in one of four storages: an argument slot, a frame local,
//! a frame-owned cell (when any nested closure captures the binding), or
//! an upvalue (a cell captured from an enclosing function). Block scoping
//! and the TDZ are properties of the binding, not of the storage.

use rustc_hash::FxHashMap;

/// Where a binding's value lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Argument slot of the current frame
    Arg(u16),
    /// Local slot of the current frame
    Local(u16),
    /// Cell owned by the current frame
    Cell(u16),
    /// Cell captured from an enclosing frame
    Upvalue(u16),
}

/// What kind of declaration introduced a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Param,
    CatchParam,
    Function,
    Class,
    /// Compiler-introduced slot (iterators, scratch values)
    Hidden,
}

impl BindingKind {
    /// Whether reads and writes before initialization must throw.
    pub fn has_tdz(self) -> bool {
        matches!(self, BindingKind::Let | BindingKind::Const | BindingKind::Class)
    }
}

/// A resolved binding.
#[derive(Debug, Clone)]
pub struct Binding {
    pub storage: Storage,
    pub kind: BindingKind,
    pub name: Box<str>,
}

impl Binding {
    /// Whether assignment through this binding is a TypeError.
    pub fn is_const(&self) -> bool {
        self.kind == BindingKind::Const
    }

    /// Whether checked (TDZ) opcodes are required.
    pub fn needs_check(&self) -> bool {
        self.kind.has_tdz()
    }
}

/// One block scope inside a function.
#[derive(Debug, Default)]
pub struct BlockScope {
    bindings: FxHashMap<Box<str>, Binding>,
    /// Cells that per-iteration semantics re-bind at the end of each loop
    /// iteration.
    pub loop_cells: Vec<u16>,
}

impl BlockScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding, shadowing any outer one with the same name.
    pub fn declare(&mut self, binding: Binding) {
        self.bindings.insert(binding.name.clone(), binding);
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Iterate over the bindings of this scope.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tdz_kinds() {
        assert!(BindingKind::Let.has_tdz());
        assert!(BindingKind::Const.has_tdz());
        assert!(BindingKind::Class.has_tdz());
        assert!(!BindingKind::Var.has_tdz());
        assert!(!BindingKind::Param.has_tdz());
    }

    #[test]
    fn test_shadowing() {
        let mut scope = BlockScope::new();
        scope.declare(Binding {
            storage: Storage::Local(0),
            kind: BindingKind::Var,
            name: "x".into(),
        });
        scope.declare(Binding {
            storage: Storage::Local(1),
            kind: BindingKind::Let,
            name: "x".into(),
        });
        assert_eq!(scope.lookup("x").unwrap().storage, Storage::Local(1));
    }
}
