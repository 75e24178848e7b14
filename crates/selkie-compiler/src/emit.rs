//! Bytecode emitter
//!
//! Append-only byte buffer with forward-jump patching, constant pooling and
//! static operand-stack depth tracking. The tracked depth is deterministic
//! at every pc; the maximum becomes the frame's pre-sized operand window
//! and the depth recorded at each `Catch` is what the unwinder restores.

use rustc_hash::FxHashMap;

use selkie_bytecode::constant::ConstantKey;
use selkie_bytecode::{Atom, Constant, LineEntry, Opcode};
use selkie_parser::ast::Span;

use crate::error::{CompileError, CompileResult};

/// A forward-referenceable jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug)]
struct LabelInfo {
    /// Resolved pc, once bound
    pc: Option<u32>,
    /// Operand-stack depth expected at the target
    depth: Option<i32>,
}

/// The byte emitter for one function body.
#[derive(Debug)]
pub struct Emitter {
    bytes: Vec<u8>,
    constants: Vec<Constant>,
    pooled: FxHashMap<ConstantKey, u32>,
    atoms: Vec<Atom>,
    labels: Vec<LabelInfo>,
    /// (patch position, label) pairs awaiting resolution
    patches: Vec<(usize, Label)>,
    depth: i32,
    max_depth: i32,
    line_table: Vec<LineEntry>,
    /// Code after an unconditional terminator until the next label bind
    unreachable: bool,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            constants: Vec::new(),
            pooled: FxHashMap::default(),
            atoms: Vec::new(),
            labels: Vec::new(),
            patches: Vec::new(),
            depth: 0,
            max_depth: 0,
            line_table: Vec::new(),
            unreachable: false,
        }
    }

    /// Current byte offset.
    pub fn pc(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Current tracked stack depth.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Record a source position for the next instruction.
    pub fn mark(&mut self, span: Span) {
        let pc = self.pc();
        if let Some(last) = self.line_table.last() {
            if last.line == span.line && last.column == span.column {
                return;
            }
            if last.pc == pc {
                self.line_table.pop();
            }
        }
        self.line_table.push(LineEntry {
            pc,
            line: span.line,
            column: span.column,
        });
    }

    fn adjust(&mut self, delta: i32) {
        if self.unreachable {
            return;
        }
        self.depth += delta;
        debug_assert!(self.depth >= 0, "operand stack underflow in emitter");
        if self.depth > self.max_depth {
            self.max_depth = self.depth;
        }
    }

    /// Emit an opcode with a fixed stack effect and no immediates.
    pub fn emit(&mut self, op: Opcode) {
        let delta = op
            .stack_delta()
            .expect("opcode has a variable stack effect; use a typed emitter");
        self.bytes.push(op as u8);
        self.adjust(delta);
        if matches!(
            op,
            Opcode::Return | Opcode::ReturnUndef | Opcode::ReturnAsync | Opcode::Throw
        ) {
            self.unreachable = true;
        }
    }

    /// Emit an opcode with a u8 immediate and a fixed stack effect.
    pub fn emit_u8(&mut self, op: Opcode, value: u8) {
        let delta = op.stack_delta().expect("variable stack effect");
        self.bytes.push(op as u8);
        self.bytes.push(value);
        self.adjust(delta);
    }

    /// Emit an opcode with a u8 immediate and an explicit stack effect.
    pub fn emit_u8_effect(&mut self, op: Opcode, value: u8, delta: i32) {
        self.bytes.push(op as u8);
        self.bytes.push(value);
        self.adjust(delta);
    }

    pub fn emit_i8(&mut self, op: Opcode, value: i8) {
        let delta = op.stack_delta().expect("variable stack effect");
        self.bytes.push(op as u8);
        self.bytes.push(value as u8);
        self.adjust(delta);
    }

    pub fn emit_i16(&mut self, op: Opcode, value: i16) {
        let delta = op.stack_delta().expect("variable stack effect");
        self.bytes.push(op as u8);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self.adjust(delta);
    }

    pub fn emit_i32(&mut self, op: Opcode, value: i32) {
        let delta = op.stack_delta().expect("variable stack effect");
        self.bytes.push(op as u8);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self.adjust(delta);
    }

    pub fn emit_u16(&mut self, op: Opcode, value: u16) {
        let delta = op.stack_delta().expect("variable stack effect");
        self.bytes.push(op as u8);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self.adjust(delta);
    }

    pub fn emit_u32(&mut self, op: Opcode, value: u32) {
        let delta = op.stack_delta().expect("variable stack effect");
        self.bytes.push(op as u8);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self.adjust(delta);
    }

    /// Emit an atom-operand opcode.
    pub fn emit_atom(&mut self, op: Opcode, atom: Atom) {
        let delta = op.stack_delta().expect("variable stack effect");
        self.bytes.push(op as u8);
        self.bytes.extend_from_slice(&atom.0.to_le_bytes());
        if !self.atoms.contains(&atom) {
            self.atoms.push(atom);
        }
        self.adjust(delta);
    }

    /// Emit an atom + flags opcode (DefineMethod).
    pub fn emit_atom_u8(&mut self, op: Opcode, atom: Atom, flags: u8, delta: i32) {
        self.bytes.push(op as u8);
        self.bytes.extend_from_slice(&atom.0.to_le_bytes());
        self.bytes.push(flags);
        if !self.atoms.contains(&atom) {
            self.atoms.push(atom);
        }
        self.adjust(delta);
    }

    /// Emit a u32 + flags opcode (DefineClass) with an explicit effect.
    pub fn emit_u32_u8(&mut self, op: Opcode, value: u32, flags: u8, delta: i32) {
        self.bytes.push(op as u8);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self.bytes.push(flags);
        self.adjust(delta);
    }

    /// Emit a call-family opcode: pops `pops`, pushes one result.
    pub fn emit_call(&mut self, op: Opcode, argc: u16, pops: i32) {
        self.bytes.push(op as u8);
        self.bytes.extend_from_slice(&argc.to_le_bytes());
        self.adjust(1 - pops);
    }

    /// Push a number through the constant pool, using the short encodings
    /// for small integers.
    pub fn emit_number(&mut self, value: f64) {
        if value == 0.0 && value.is_sign_positive() {
            self.emit(Opcode::PushZero);
        } else if value == 1.0 {
            self.emit(Opcode::PushOne);
        } else if value.fract() == 0.0
            && value >= i32::MIN as f64
            && value <= i32::MAX as f64
            && !(value == 0.0 && value.is_sign_negative())
        {
            let int = value as i32;
            if let Ok(small) = i8::try_from(int) {
                self.emit_i8(Opcode::PushI8, small);
            } else if let Ok(mid) = i16::try_from(int) {
                self.emit_i16(Opcode::PushI16, mid);
            } else {
                self.emit_i32(Opcode::PushI32, int);
            }
        } else {
            let idx = self.add_constant(Constant::Number(value));
            self.emit_const(idx);
        }
    }

    /// Push constants\[idx\].
    pub fn emit_const(&mut self, idx: u32) {
        if let Ok(small) = u8::try_from(idx) {
            self.emit_u8(Opcode::PushConst8, small);
        } else {
            self.emit_u32(Opcode::PushConst, idx);
        }
    }

    /// Intern a constant into the pool (deduplicating poolable kinds).
    pub fn add_constant(&mut self, constant: Constant) -> u32 {
        if let Some(key) = constant.dedup_key() {
            if let Some(&idx) = self.pooled.get(&key) {
                return idx;
            }
            let idx = self.constants.len() as u32;
            self.constants.push(constant);
            self.pooled.insert(key, idx);
            idx
        } else {
            let idx = self.constants.len() as u32;
            self.constants.push(constant);
            idx
        }
    }

    // ---------------------------------------------------------------
    // Labels and jumps
    // ---------------------------------------------------------------

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len());
        self.labels.push(LabelInfo {
            pc: None,
            depth: None,
        });
        label
    }

    /// Emit a jump (Goto / IfTrue / IfFalse) to a label.
    pub fn emit_jump(&mut self, op: Opcode, label: Label) {
        let delta = op.stack_delta().expect("variable stack effect");
        self.bytes.push(op as u8);
        self.adjust(delta);
        self.record_jump_target(label);
        if op == Opcode::Goto {
            self.unreachable = true;
        }
    }

    /// Emit a Catch handler registration; the depth recorded for the
    /// handler entry is the current depth plus the pushed exception.
    pub fn emit_catch(&mut self, label: Label) {
        self.bytes.push(Opcode::Catch as u8);
        let handler_depth = self.depth + 1;
        self.set_label_depth(label, handler_depth);
        let pos = self.bytes.len();
        self.bytes.extend_from_slice(&0u32.to_le_bytes());
        self.patches.push((pos, label));
    }

    fn record_jump_target(&mut self, label: Label) {
        self.set_label_depth(label, self.depth);
        let pos = self.bytes.len();
        self.bytes.extend_from_slice(&0u32.to_le_bytes());
        self.patches.push((pos, label));
    }

    fn set_label_depth(&mut self, label: Label, depth: i32) {
        if self.unreachable {
            return;
        }
        let info = &mut self.labels[label.0];
        match info.depth {
            None => info.depth = Some(depth),
            Some(existing) => {
                debug_assert_eq!(
                    existing, depth,
                    "inconsistent stack depth at jump target"
                );
            }
        }
    }

    /// Bind a label to the current pc.
    pub fn bind_label(&mut self, label: Label) {
        let pc = self.pc();
        let info = &mut self.labels[label.0];
        debug_assert!(info.pc.is_none(), "label bound twice");
        info.pc = Some(pc);
        if let Some(depth) = info.depth {
            self.depth = depth;
            if depth > self.max_depth {
                self.max_depth = depth;
            }
            self.unreachable = false;
        } else if self.unreachable {
            // Label only reachable from not-yet-emitted jumps; keep the
            // current depth and wait for a backward consumer.
            self.unreachable = false;
            info.depth = Some(self.depth);
        } else {
            info.depth = Some(self.depth);
        }
    }

    /// Resolve patches and produce the final pieces.
    #[allow(clippy::type_complexity)]
    pub fn finish(
        mut self,
    ) -> CompileResult<(Vec<u8>, Vec<Constant>, Vec<Atom>, Vec<LineEntry>, u16)> {
        for (pos, label) in std::mem::take(&mut self.patches) {
            let target = self.labels[label.0]
                .pc
                .ok_or_else(|| CompileError::internal("unbound label"))?;
            self.bytes[pos..pos + 4].copy_from_slice(&target.to_le_bytes());
        }
        let stack_size = u16::try_from(self.max_depth.max(0))
            .map_err(|_| CompileError::LimitExceeded("operand stack too deep"))?;
        Ok((
            self.bytes,
            self.constants,
            self.atoms,
            self.line_table,
            stack_size,
        ))
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_jump_patching() {
        let mut e = Emitter::new();
        e.emit(Opcode::PushTrue);
        let end = e.new_label();
        e.emit_jump(Opcode::IfFalse, end);
        e.emit(Opcode::PushZero);
        e.emit(Opcode::Drop);
        e.bind_label(end);
        e.emit(Opcode::ReturnUndef);
        let (bytes, ..) = e.finish().unwrap();
        // IfFalse operand points at the ReturnUndef.
        let target = u32::from_le_bytes(bytes[2..6].try_into().unwrap());
        assert_eq!(target, bytes.len() as u32 - 1);
    }

    #[test]
    fn test_depth_tracking() {
        let mut e = Emitter::new();
        e.emit(Opcode::PushZero);
        e.emit(Opcode::PushOne);
        e.emit(Opcode::Add);
        assert_eq!(e.depth(), 1);
        e.emit(Opcode::Drop);
        assert_eq!(e.depth(), 0);
        e.emit(Opcode::ReturnUndef);
        let (_, _, _, _, stack_size) = e.finish().unwrap();
        assert_eq!(stack_size, 2);
    }

    #[test]
    fn test_number_encodings() {
        let mut e = Emitter::new();
        e.emit_number(0.0);
        e.emit_number(1.0);
        e.emit_number(40.0);
        e.emit_number(1000.0);
        e.emit_number(1.5);
        assert_eq!(e.depth(), 5);
        let (bytes, constants, ..) = e.finish().unwrap();
        assert_eq!(bytes[0], Opcode::PushZero as u8);
        assert_eq!(bytes[1], Opcode::PushOne as u8);
        assert_eq!(bytes[2], Opcode::PushI8 as u8);
        // Only 1.5 needs the pool.
        assert_eq!(constants.len(), 1);
    }

    #[test]
    fn test_constant_dedup() {
        let mut e = Emitter::new();
        let a = e.add_constant(Constant::Number(3.25));
        let b = e.add_constant(Constant::Number(3.25));
        assert_eq!(a, b);
        let pos = e.add_constant(Constant::Number(0.0));
        let neg = e.add_constant(Constant::Number(-0.0));
        assert_ne!(pos, neg);
    }
}
