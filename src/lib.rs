// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD
#![warn(missing_docs)]

//! A strict Intcode virtual machine
//!
//! The machine executes a fixed-length array of integers that doubles as code and data. It
//! supports the [Opcodes] `ADD`, `MUL`, `IN`, `OUT`, `JNZ`, `JZ`, `LT`, `EQ` and `HALT`, and the
//! positional and immediate [Parameter Modes]. Memory never grows: touching any address outside
//! of the initial program is an error.
//!
//! # Example
//!
//! ```rust
//! use intcode_vm::prelude::*;
//! let mut interpreter = Interpreter::new(vec![3, 0, 4, 0, 99]);
//!
//! assert_eq!(
//!     interpreter.run_through_inputs([1024]).unwrap(),
//!     (vec![1024], State::Halted)
//! );
//! ```
//!
//! For one-shot runs where every input is known up front, [execute] returns the final memory:
//!
//! ```rust
//! use intcode_vm::execute;
//! let mut outputs = Vec::<i64>::new();
//! let memory = execute([1, 0, 0, 0, 99], [], &mut outputs).unwrap();
//! assert_eq!(memory, vec![2, 0, 0, 0, 99]);
//! assert!(outputs.is_empty());
//! ```
//!
//! [Opcodes]: https://esolangs.org/wiki/Intcode#Opcodes
//! [Parameter Modes]: https://esolangs.org/wiki/Intcode#Parameter_Modes

/// Fixed-length, bounds-checked memory
mod memory;

/// Instruction decoding and the helpers shared between instructions
mod internals;

pub mod trace;

use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::ops::{Index, IndexMut};
use std::sync::{Arc, Mutex};

use memory::Memory;
use trace::Trace;

/// A small module that re-exports items needed when working with the Intcode interpreter
pub mod prelude {
    pub use crate::{Interpreter, InterpreterError, State, StepOutcome, execute};
    pub use std::iter::empty;
}

/// The state of the intcode system, returned whenever the intcode system has stopped.
///
/// [Awaiting](State::Awaiting) means that there are more instructions to execute, but all input
/// has been consumed and the next instruction requires input.
///
/// [Halted](State::Halted) means that a `HALT` instruction has been executed. Once it's been
/// returned, no more instructions will be executed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    /// Execution is awaiting input
    Awaiting,
    /// Execution has halted
    Halted,
}

/// The result of executing a single instruction
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StepOutcome {
    /// The instruction ran, and the next one can be executed
    Running,
    /// Execution has stopped in the given [State]
    Stopped(State),
}

#[derive(Debug)]
/// An error occured when executing an intcode instruction
pub enum InterpreterError {
    /// An instruction word's low two digits were not a known opcode. Contains the whole word.
    InvalidOpcode(i64),
    /// An instruction word contained a parameter mode other than `0` or `1`
    UnknownMode(i64),
    /// An address outside of memory was read, written, or decoded
    OutOfBoundsAccess {
        /// The offending address
        address: i64,
        /// The fixed length of memory
        len: usize,
    },
    /// A `STORE` instruction needed input, but none was left
    InputExhausted,
    /// The interpreter previously failed, and will not execute any further instructions
    Poisoned,
    /// An error occured with the logger
    LoggerFailed(io::Error),
}

impl PartialEq for InterpreterError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidOpcode(lhs), Self::InvalidOpcode(rhs)) => lhs == rhs,
            (Self::UnknownMode(lhs), Self::UnknownMode(rhs)) => lhs == rhs,
            (
                Self::OutOfBoundsAccess { address, len },
                Self::OutOfBoundsAccess {
                    address: rhs_address,
                    len: rhs_len,
                },
            ) => address == rhs_address && len == rhs_len,
            (Self::InputExhausted, Self::InputExhausted) => true,
            (Self::Poisoned, Self::Poisoned) => true,
            (Self::LoggerFailed(lhs), Self::LoggerFailed(rhs)) => lhs.kind() == rhs.kind(),
            _ => false,
        }
    }
}

impl Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOpcode(n) => write!(f, "encountered unrecognized opcode {n}"),
            Self::UnknownMode(mode) => write!(f, "encountered unknown parameter mode {mode}"),
            Self::OutOfBoundsAccess { address, len } => {
                write!(f, "address {address} is out of bounds for memory of length {len}")
            }
            Self::InputExhausted => write!(f, "input required, but none was left"),
            Self::Poisoned => write!(f, "interpreter is poisoned by an earlier error"),
            Self::LoggerFailed(e) => write!(f, "logger encountered an error: {e}"),
        }
    }
}

impl Error for InterpreterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LoggerFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for InterpreterError {
    fn from(err: io::Error) -> Self {
        Self::LoggerFailed(err)
    }
}

type Logger = Arc<Mutex<Box<dyn io::Write + Send>>>;

#[derive(Clone)]
/// An intcode interpreter, which provides optional logging and tracing of instructions executed.
pub struct Interpreter {
    index: i64,
    code: Memory,
    halted: bool,
    poisoned: bool,
    trace: Option<Trace>,
    logger: Option<Logger>,
}

// ignore the logger and trace fields
impl PartialEq for Interpreter {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.code == other.code
            && self.halted == other.halted
            && self.poisoned == other.poisoned
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Interpreter")
            .field("code", &self.code)
            .field("ip", &self.index)
            .field("halted", &self.halted)
            .field("poisoned", &self.poisoned)
            .field("tracing", &self.trace.is_some())
            .field("logging", &self.logger.is_some())
            .finish()
    }
}

impl Index<i64> for Interpreter {
    type Output = i64;

    fn index(&self, i: i64) -> &Self::Output {
        self.code.index(i)
    }
}

impl IndexMut<i64> for Interpreter {
    fn index_mut(&mut self, i: i64) -> &mut Self::Output {
        self.code.index_mut(i)
    }
}

/// Parameter mode for Intcode instruction
///
/// Intcode instruction parameters each have a mode: [positional] or [immediate].
///
/// When executing an intcode instruction, the instruction's input parameters are interpreted in
/// accordance with their associated modes. Destination parameters are always addresses, whatever
/// their declared mode.
///
/// [positional]: ParamMode::Positional
/// [immediate]: ParamMode::Immediate
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ParamMode {
    /// Positional Mode
    ///
    /// A parameter in positional mode evaluates to the value at the address specified by the
    /// parameter.
    Positional = 0,
    /// Immediate Mode
    ///
    /// A parameter in immediate mode evaluates directly to the value specified.
    #[doc(alias = "#")]
    Immediate = 1,
}

impl Display for ParamMode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamMode::Positional => Ok(()),
            ParamMode::Immediate => write!(fmt, "#"),
        }
    }
}

impl TryFrom<i64> for ParamMode {
    type Error = InterpreterError;
    fn try_from(i: i64) -> Result<Self, Self::Error> {
        match i {
            0 => Ok(ParamMode::Positional),
            1 => Ok(ParamMode::Immediate),
            _ => Err(Self::Error::UnknownMode(i)),
        }
    }
}

impl ParamMode {
    /// Extract the modes of the three possible parameters of `opcode` from an instruction word.
    ///
    /// Missing digits are zeroes, so they default to [ParamMode::Positional]. Only the modes of
    /// parameters that are read as values are checked: destinations are always addresses, and
    /// digits past the opcode's parameters are ignored, so those slots are reported as
    /// [ParamMode::Positional] whatever their digit.
    pub fn extract(op: i64, opcode: OpCode) -> Result<[Self; 3], InterpreterError> {
        let digits = [
            (op / 100) % 10,   // C (hundreds place)
            (op / 1000) % 10,  // B (thousands place)
            (op / 10000) % 10, // A (ten thousands place)
        ];
        let mut modes = [ParamMode::Positional; 3];
        for (mode, digit) in modes.iter_mut().zip(digits).take(opcode.value_param_count()) {
            *mode = digit.try_into()?;
        }
        Ok(modes)
    }
}

/// An Intcode opcode, as stored in the lowest two decimal digits of an instruction word
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[allow(missing_docs, reason = "the names are the documentation")]
pub enum OpCode {
    Add = 1,
    Mul = 2,
    In = 3,
    Out = 4,
    Jnz = 5,
    Jz = 6,
    Lt = 7,
    Eq = 8,
    Halt = 99,
}

impl OpCode {
    /// The number of parameters following the instruction word
    pub const fn param_count(self) -> usize {
        match self {
            OpCode::Add | OpCode::Mul | OpCode::Lt | OpCode::Eq => 3,
            OpCode::Jnz | OpCode::Jz => 2,
            OpCode::In | OpCode::Out => 1,
            OpCode::Halt => 0,
        }
    }

    /// The number of leading parameters that are read as values, not written to
    pub const fn value_param_count(self) -> usize {
        if self.writes_memory() {
            self.param_count() - 1
        } else {
            self.param_count()
        }
    }

    /// Whether the instruction's last parameter is a destination address
    pub const fn writes_memory(self) -> bool {
        matches!(
            self,
            OpCode::Add | OpCode::Mul | OpCode::In | OpCode::Lt | OpCode::Eq
        )
    }
}

impl TryFrom<i64> for OpCode {
    type Error = InterpreterError;
    fn try_from(i: i64) -> Result<Self, Self::Error> {
        match i % 100 {
            1 => Ok(OpCode::Add),
            2 => Ok(OpCode::Mul),
            3 => Ok(OpCode::In),
            4 => Ok(OpCode::Out),
            5 => Ok(OpCode::Jnz),
            6 => Ok(OpCode::Jz),
            7 => Ok(OpCode::Lt),
            8 => Ok(OpCode::Eq),
            99 => Ok(OpCode::Halt),
            _ => Err(InterpreterError::InvalidOpcode(i)),
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpCode::Add => "ADD",
            OpCode::Mul => "MUL",
            OpCode::In => "IN",
            OpCode::Out => "OUT",
            OpCode::Jnz => "JNZ",
            OpCode::Jz => "JZ",
            OpCode::Lt => "LT",
            OpCode::Eq => "EQ",
            OpCode::Halt => "HALT",
        };
        f.write_str(name)
    }
}

impl Interpreter {
    /// Create a new interpreter. Collects `code` into the starting memory state, which keeps its
    /// length for the lifetime of the interpreter.
    pub fn new(code: impl IntoIterator<Item = i64>) -> Self {
        Self {
            index: 0,
            code: code.into_iter().collect(),
            halted: false,
            poisoned: false,
            trace: None,
            logger: None,
        }
    }

    /// Log every executed instruction to `logger`, one line per instruction.
    ///
    /// The logger is shared between clones of the interpreter.
    pub fn log_with(&mut self, logger: impl io::Write + Send + 'static) {
        self.logger = Some(Arc::new(Mutex::new(Box::new(logger))));
    }

    /// Get the memory at `address`
    #[doc(alias = "peek")]
    pub fn mem_get(&self, address: i64) -> Result<i64, InterpreterError> {
        self.code.get(address)
    }

    /// Manually set a memory location
    #[doc(alias("poke", "write"))]
    pub fn mem_override(&mut self, address: i64, value: i64) -> Result<(), InterpreterError> {
        self.code.set(address, value)
    }

    /// The address of the next instruction to execute
    pub fn instr_ptr(&self) -> i64 {
        self.index
    }

    /// A view of the current memory
    pub fn memory(&self) -> &[i64] {
        self.code.as_slice()
    }

    /// Consume the interpreter, returning its memory
    pub fn into_memory(self) -> Vec<i64> {
        self.code.into()
    }

    /// Whether a previous error has left the interpreter unable to continue
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Execute a single instruction, reading from `inputs` if it's an `IN` instruction, and
    /// pushing to `outputs` if it's an `OUT` instruction.
    ///
    /// If input is needed but `inputs` is empty, nothing is changed and
    /// `StepOutcome::Stopped(State::Awaiting)` is returned, so that the instruction can be retried
    /// once input is available.
    ///
    /// Any error poisons the interpreter: it will not execute further instructions, returning
    /// [InterpreterError::Poisoned] instead.
    pub fn exec_instruction(
        &mut self,
        inputs: &mut impl Iterator<Item = i64>,
        outputs: &mut impl Extend<i64>,
    ) -> Result<StepOutcome, InterpreterError> {
        if self.poisoned {
            return Err(InterpreterError::Poisoned);
        }
        if self.halted {
            return Ok(StepOutcome::Stopped(State::Halted));
        }
        let outcome = self.step(inputs, outputs);
        if outcome.is_err() {
            self.poisoned = true;
        }
        outcome
    }

    /// Execute until the program halts or needs input that `inputs` doesn't have, pushing each
    /// output to `outputs` as it's produced.
    pub fn run(
        &mut self,
        inputs: impl IntoIterator<Item = i64>,
        outputs: &mut impl Extend<i64>,
    ) -> Result<State, InterpreterError> {
        let mut inputs = inputs.into_iter();
        loop {
            if let StepOutcome::Stopped(state) = self.exec_instruction(&mut inputs, outputs)? {
                break Ok(state);
            }
        }
    }

    /// Execute until either the program halts, or it tries to read nonexistent input.
    /// Returns `Ok((v, s))`, where `v` is a [`Vec<i64>`] containing all outputs that it found, and
    /// `s` is the [`State`] at the time it stopped.
    ///
    /// On error, it will return an [`InterpreterError`] that reflects the error.
    pub fn run_through_inputs(
        &mut self,
        inputs: impl IntoIterator<Item = i64>,
    ) -> Result<(Vec<i64>, State), InterpreterError> {
        let mut outputs: Vec<i64> = Vec::new();
        let state = self.run(inputs, &mut outputs)?;
        Ok((outputs, state))
    }
}

/// Run `program` to completion, reading from `inputs` and pushing to `outputs`, and return the
/// final state of memory.
///
/// Unlike [Interpreter::run_through_inputs], running out of input is an error here.
///
/// # Example
///
/// ```rust
/// use intcode_vm::prelude::*;
/// let program = [3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];
///
/// let mut outputs: Vec<i64> = vec![];
/// execute(program, [8], &mut outputs).unwrap();
/// assert_eq!(outputs, vec![1]);
///
/// assert_eq!(
///     execute(program, [], &mut outputs),
///     Err(InterpreterError::InputExhausted)
/// );
/// ```
pub fn execute(
    program: impl IntoIterator<Item = i64>,
    inputs: impl IntoIterator<Item = i64>,
    outputs: &mut impl Extend<i64>,
) -> Result<Vec<i64>, InterpreterError> {
    let mut interpreter = Interpreter::new(program);
    match interpreter.run(inputs, outputs)? {
        State::Halted => Ok(interpreter.into_memory()),
        State::Awaiting => Err(InterpreterError::InputExhausted),
    }
}
