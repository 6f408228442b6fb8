// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Opt-in tracing of executed instructions
//!
//! See [Interpreter::start_trace] for an example.
use std::fmt::{self, Debug, Display};

use super::{Interpreter, OpCode, ParamMode};

#[derive(Clone, Copy)]
struct PackedModes(u8);
impl PackedModes {
    const fn pack(modes: [ParamMode; 3]) -> Self {
        Self(modes[0] as u8 | ((modes[1] as u8) << 1) | ((modes[2] as u8) << 2))
    }
    const fn unpack(self) -> [ParamMode; 3] {
        const fn unpack_bit(bit: u8) -> ParamMode {
            if bit == 0 {
                ParamMode::Positional
            } else {
                ParamMode::Immediate
            }
        }
        [
            unpack_bit(self.0 & 0b001),
            unpack_bit(self.0 & 0b010),
            unpack_bit(self.0 & 0b100),
        ]
    }
}

/// Each pair is `(raw parameter, resolved value)`. For destinations, the resolved value is the
/// value that was stored.
#[derive(Clone, Copy)]
enum TracedOp {
    Add((i64, i64), (i64, i64), (i64, i64)),
    Mul((i64, i64), (i64, i64), (i64, i64)),
    In((i64, i64)),
    Out((i64, i64)),
    Jnz((i64, i64), (i64, i64)),
    Jz((i64, i64), (i64, i64)),
    Lt((i64, i64), (i64, i64), (i64, i64)),
    Eq((i64, i64), (i64, i64), (i64, i64)),
    Halt,
}

#[derive(Clone)]
/// An opaque type containing information about what instruction was executed, which can be queried
/// with its various methods, or converted into a [String] using its [Display] impl.
pub struct TracedInstr {
    op: TracedOp,
    op_int: i64,
    instr_ptr: i64,
    packed_modes: PackedModes,
    opcode: OpCode,
}

impl TracedInstr {
    /// Return the instruction pointer's position when the traced instruction was executed
    pub fn instr_ptr(&self) -> i64 {
        self.instr_ptr
    }

    /// Return the actual integer of the traced instruction
    pub fn op_int(&self) -> i64 {
        self.op_int
    }

    /// Return the opcode of the traced instruction
    pub fn op_code(&self) -> OpCode {
        self.opcode
    }

    /// If the instruction stored a value, return that value
    pub fn stored_val(&self) -> Option<i64> {
        match self.op {
            TracedOp::Add(_, _, (_, v))
            | TracedOp::Mul(_, _, (_, v))
            | TracedOp::Lt(_, _, (_, v))
            | TracedOp::Eq(_, _, (_, v))
            | TracedOp::In((_, v)) => Some(v),
            _ => None,
        }
    }

    /// If the instruction was a conditional jump, return whether it jumped
    pub fn jumped(&self) -> Option<bool> {
        match self.op {
            TracedOp::Jnz((_, v), _) => Some(v != 0),
            TracedOp::Jz((_, v), _) => Some(v == 0),
            _ => None,
        }
    }

    /// Return an array of the parameter modes of the traced instruction
    pub fn param_modes(&self) -> [ParamMode; 3] {
        self.packed_modes.unpack()
    }

    /// Build a traced instruction from an already-decoded instruction word.
    ///
    /// Returns [None] if `op_int` can't be decoded or `resolved_params` has the wrong length for
    /// its opcode.
    pub(super) fn build(
        op_int: i64,
        instr_ptr: i64,
        resolved_params: &[(i64, i64)],
    ) -> Option<Self> {
        let (opcode, modes) = Interpreter::parse_op(op_int).ok()?;
        if resolved_params.len() != opcode.param_count() {
            return None;
        }
        let p = |n: usize| resolved_params[n];

        let op = match opcode {
            OpCode::Add => TracedOp::Add(p(0), p(1), p(2)),
            OpCode::Mul => TracedOp::Mul(p(0), p(1), p(2)),
            OpCode::In => TracedOp::In(p(0)),
            OpCode::Out => TracedOp::Out(p(0)),
            OpCode::Jnz => TracedOp::Jnz(p(0), p(1)),
            OpCode::Jz => TracedOp::Jz(p(0), p(1)),
            OpCode::Lt => TracedOp::Lt(p(0), p(1), p(2)),
            OpCode::Eq => TracedOp::Eq(p(0), p(1), p(2)),
            OpCode::Halt => TracedOp::Halt,
        };
        Some(Self {
            op_int,
            instr_ptr,
            op,
            packed_modes: PackedModes::pack(modes),
            opcode,
        })
    }
}

impl Interpreter {
    /// Begin a [Trace] of executed instructions. If a trace is already running, this replaces that
    /// trace and returns in a [`Some`], otherwise, it returns [`None`].
    ///
    /// # Example
    /// ```
    /// # use intcode_vm::prelude::*;
    /// let mut interp = Interpreter::new([1101, 90, 9, 4, 0]);
    /// assert!(interp.start_trace().is_none());
    /// interp.run_through_inputs(empty()).unwrap();
    ///
    /// let trace = interp.end_trace().unwrap();
    /// assert_eq!(trace.0.len(), 2);
    /// assert_eq!(trace.0[0].stored_val(), Some(99));
    /// assert_eq!(trace.0[1].instr_ptr(), 4);
    /// ```
    pub fn start_trace(&mut self) -> Option<Trace> {
        self.trace.replace(Trace::new())
    }

    /// Stop tracing executed instructions into a [Trace]. If no trace was active, returns [`None`]
    ///
    /// see [Interpreter::start_trace]
    pub fn end_trace(&mut self) -> Option<Trace> {
        self.trace.take()
    }

    /// Get a view of the current trace
    pub fn show_trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }
}

#[derive(Debug, Default, Clone)]
/// A log of instructions that an [Interpreter] has executed since a call to
/// [Interpreter::start_trace]
///
/// see [Interpreter::start_trace]
pub struct Trace(pub Vec<TracedInstr>);

impl Trace {
    pub(crate) fn push(&mut self, op_int: i64, instr_ptr: i64, resolved_params: &[(i64, i64)]) {
        if let Some(instr) = TracedInstr::build(op_int, instr_ptr, resolved_params) {
            self.0.push(instr);
        }
    }

    pub(crate) fn new() -> Self {
        Self(Vec::new())
    }
}

impl Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.0 {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}

impl Debug for TracedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        macro_rules! arg {
            ($arg: ident) => {
                format_args!("{} => {}", $arg.0, $arg.1)
            };
        }
        macro_rules! variant {
            ($name: literal, ($($arg: ident),*)) => {
                f.debug_tuple($name)
                $(.field(&arg!($arg) ))*
                .finish()
            }
        }
        match self {
            Self::Add(a0, a1, a2) => variant!("Add", (a0, a1, a2)),
            Self::Mul(a0, a1, a2) => variant!("Mul", (a0, a1, a2)),
            Self::In(a0) => variant!("In", (a0)),
            Self::Out(a0) => variant!("Out", (a0)),
            Self::Jnz(a0, a1) => variant!("Jnz", (a0, a1)),
            Self::Jz(a0, a1) => variant!("Jz", (a0, a1)),
            Self::Lt(a0, a1, a2) => variant!("Lt", (a0, a1, a2)),
            Self::Eq(a0, a1, a2) => variant!("Eq", (a0, a1, a2)),
            Self::Halt => write!(f, "Halt"),
        }
    }
}

impl Debug for TracedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedInstr")
            .field("op", &self.op)
            .field("op_int", &self.op_int)
            .field("instr_ptr", &self.instr_ptr)
            .field("modes", &self.packed_modes.unpack())
            .field("opcode", &self.opcode)
            .finish()
    }
}

impl Display for TracedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ran instruction at {:0>4}: op int {: <5} | ",
            self.instr_ptr, self.op_int
        )?;
        let modes = self.packed_modes.unpack();

        match self.op {
            TracedOp::Add((pa, va), (pb, vb), (dest, val))
            | TracedOp::Mul((pa, va), (pb, vb), (dest, val))
            | TracedOp::Lt((pa, va), (pb, vb), (dest, val))
            | TracedOp::Eq((pa, va), (pb, vb), (dest, val)) => {
                write!(
                    f,
                    "[{} {}{pa} (resolves to {va}), {}{pb} (resolves to {vb}), {dest} (stored {val})]",
                    self.opcode, modes[0], modes[1],
                )
            }
            TracedOp::Jnz((p_base, v_base), (p_dest, v_dest))
            | TracedOp::Jz((p_base, v_base), (p_dest, v_dest)) => {
                write!(
                    f,
                    "[{} {}{p_base} (resolves to {v_base}), {}{p_dest} ({} to {v_dest})]",
                    self.opcode,
                    modes[0],
                    modes[1],
                    if self.jumped() == Some(true) {
                        "jumped"
                    } else {
                        "didn't jump"
                    }
                )
            }
            TracedOp::In((dest, v)) => {
                write!(f, "[{} {dest} (stored {v})]", self.opcode)
            }
            TracedOp::Out((p, v)) => {
                write!(f, "[{} {}{p} (resolves to {v})]", self.opcode, modes[0])
            }
            TracedOp::Halt => {
                write!(f, "[HALT]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter::empty;

    #[test]
    fn param_mode_packing() {
        const MODES: [ParamMode; 2] = [ParamMode::Positional, ParamMode::Immediate];

        for a in MODES {
            for b in MODES {
                for c in MODES {
                    assert_eq!(PackedModes::pack([a, b, c]).unpack(), [a, b, c]);
                }
            }
        }
    }

    #[test]
    fn display_describes_each_instruction() {
        let mut interp = Interpreter::new([3, 11, 1007, 11, 5, 12, 1005, 12, 10, 4, 11, 0, 0]);
        interp.start_trace();
        // the jump goes to address 10, which is the parameter of OUT, so execution fails there
        let err = interp.run_through_inputs([3]).unwrap_err();
        assert_eq!(err, crate::InterpreterError::InvalidOpcode(11));
        let Trace(trace) = interp.end_trace().unwrap();
        let lines: Vec<String> = trace.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            [
                "ran instruction at 0000: op int 3     | [IN 11 (stored 3)]",
                "ran instruction at 0002: op int 1007  | [LT 11 (resolves to 3), #5 (resolves to 5), 12 (stored 1)]",
                "ran instruction at 0006: op int 1005  | [JNZ 12 (resolves to 1), #10 (jumped to 10)]",
            ]
        );
    }

    #[test]
    fn jumps_and_halts_are_recorded() {
        let mut interp = Interpreter::new([1106, 1, 0, 104, 5, 99]);
        interp.start_trace();
        assert_eq!(
            interp.run_through_inputs(empty()),
            Ok((vec![5], crate::State::Halted))
        );
        let trace = interp.show_trace().unwrap();
        let ops: Vec<OpCode> = trace.0.iter().map(TracedInstr::op_code).collect();
        assert_eq!(ops, [OpCode::Jz, OpCode::Out, OpCode::Halt]);
        assert_eq!(trace.0[0].jumped(), Some(false));
        assert_eq!(trace.0[1].stored_val(), None);
        assert_eq!(trace.0[2].to_string(), "ran instruction at 0005: op int 99    | [HALT]");
    }

    #[test]
    fn debug_shows_params_and_their_values() {
        let mut interp = Interpreter::new([1002, 4, 3, 4, 33]);
        interp.start_trace();
        interp.run_through_inputs(empty()).unwrap();
        let trace = interp.end_trace().unwrap();
        assert_eq!(
            format!("{:?}", trace.0[0]),
            "TracedInstr { op: Mul(4 => 33, 3 => 3, 4 => 99), op_int: 1002, instr_ptr: 0, \
             modes: [Positional, Immediate, Positional], opcode: Mul }"
        );
        assert_eq!(
            format!("{trace:?}"),
            "Trace([TracedInstr { op: Mul(4 => 33, 3 => 3, 4 => 99), op_int: 1002, instr_ptr: 0, \
             modes: [Positional, Immediate, Positional], opcode: Mul }, \
             TracedInstr { op: Halt, op_int: 99, instr_ptr: 4, \
             modes: [Positional, Positional, Positional], opcode: Halt }])"
        );
    }

    #[test]
    fn restarting_returns_old_trace() {
        let mut interp = Interpreter::new([99]);
        assert!(interp.start_trace().is_none());
        interp.run_through_inputs(empty()).unwrap();
        let old = interp.start_trace().unwrap();
        assert_eq!(old.0.len(), 1);
        assert!(interp.show_trace().unwrap().0.is_empty());
    }
}
