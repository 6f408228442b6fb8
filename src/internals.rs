// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use std::io::{self, Write};

use super::*;

impl Interpreter {
    // Given a 5 digit number, digits ABCDE are used as follows:
    // DE is the two-digit opcode
    // C is the 1st parameter's mode
    // B is the 2nd parameter's mode
    // A is the 3rd parameter's mode
    //
    // So 1002 would be parsed as follows:
    //
    // Opcode 02 is multiply
    // C=0: 1st parameter is in positional mode
    // B=1: 2nd parameter is in immediate mode
    // A=0: 3rd parameter is in positional mode
    //
    // The opcode is checked first, since it decides which of the modes are looked at.
    pub(crate) fn parse_op(op: i64) -> Result<(OpCode, [ParamMode; 3]), InterpreterError> {
        let opcode = OpCode::try_from(op)?;
        Ok((opcode, ParamMode::extract(op, opcode)?))
    }

    /// The raw int stored `offset` places after the current instruction word
    fn raw_param(&self, offset: i64) -> Result<i64, InterpreterError> {
        self.code.get(self.index + offset)
    }

    /// Processes the parameter `offset` places after the instruction word into a concrete value
    /// using the method appropriate for `mode`.
    pub(crate) fn resolve_param(
        &self,
        mode: ParamMode,
        offset: i64,
    ) -> Result<i64, InterpreterError> {
        let raw = self.raw_param(offset)?;
        match mode {
            ParamMode::Positional => self.code.get(raw),
            ParamMode::Immediate => Ok(raw),
        }
    }

    /// Destinations are always addresses, so their mode is not consulted.
    /// Bounds are checked when the destination is written.
    pub(crate) fn resolve_dest(&self, offset: i64) -> Result<i64, InterpreterError> {
        self.raw_param(offset)
    }

    /// Write one line describing the instruction about to be executed to the logger, if any
    fn report_op(
        &self,
        instruction: i64,
        opcode: OpCode,
        modes: [ParamMode; 3],
    ) -> Result<(), InterpreterError> {
        let Some(ref logger) = self.logger else {
            return Ok(());
        };
        let mut logger = logger
            .lock()
            .map_err(|_| io::Error::other("logger lock was poisoned"))?;
        write!(logger, "ip: {:>8} | {instruction:05} [{opcode}", self.index)?;
        if opcode.param_count() > 0 {
            write!(logger, "(")?;
            for (n, mode) in modes.iter().take(opcode.param_count()).enumerate() {
                if n > 0 {
                    write!(logger, ", ")?;
                }
                // a destination is written without its (ignored) mode
                let mode = if opcode.writes_memory() && n + 1 == opcode.param_count() {
                    &ParamMode::Positional
                } else {
                    mode
                };
                write!(logger, "{mode}{}", self.code.get(self.index + n as i64 + 1)?)?;
            }
            write!(logger, ")")?;
        }
        writeln!(logger, "]")?;
        Ok(())
    }

    fn trace(&mut self, instruction: i64, resolved_params: &[(i64, i64)]) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(instruction, self.index, resolved_params);
        }
    }

    /// Decode and execute the instruction at the instruction pointer
    pub(crate) fn step(
        &mut self,
        inputs: &mut impl Iterator<Item = i64>,
        outputs: &mut impl Extend<i64>,
    ) -> Result<StepOutcome, InterpreterError> {
        let instruction = self.code.get(self.index)?;
        let (opcode, modes) = Self::parse_op(instruction)?;

        match opcode {
            OpCode::Add => self.op3(instruction, opcode, modes, i64::wrapping_add),
            OpCode::Mul => self.op3(instruction, opcode, modes, i64::wrapping_mul),
            OpCode::Lt => self.op3(instruction, opcode, modes, |a, b| i64::from(a < b)),
            OpCode::Eq => self.op3(instruction, opcode, modes, |a, b| i64::from(a == b)),
            OpCode::In => {
                let dest = self.resolve_dest(1)?;
                if !self.code.contains(dest) {
                    return Err(InterpreterError::OutOfBoundsAccess {
                        address: dest,
                        len: self.code.len(),
                    });
                }
                let Some(input) = inputs.next() else {
                    return Ok(StepOutcome::Stopped(State::Awaiting));
                };
                self.report_op(instruction, opcode, modes)?;
                self.trace(instruction, &[(dest, input)]);
                self.code.set(dest, input)?;
                self.index += 2;
                Ok(StepOutcome::Running)
            }
            OpCode::Out => {
                let val = self.resolve_param(modes[0], 1)?;
                self.report_op(instruction, opcode, modes)?;
                self.trace(instruction, &[(self.raw_param(1)?, val)]);
                outputs.extend(std::iter::once(val));
                self.index += 2;
                Ok(StepOutcome::Running)
            }
            OpCode::Jnz => self.jump(instruction, opcode, modes, |v| v != 0),
            OpCode::Jz => self.jump(instruction, opcode, modes, |v| v == 0),
            OpCode::Halt => {
                self.report_op(instruction, opcode, modes)?;
                self.trace(instruction, &[]);
                self.halted = true;
                Ok(StepOutcome::Stopped(State::Halted))
            }
        }
    }

    /// common logic of all 4 instructions that take 3 parameters
    pub(crate) fn op3(
        &mut self,
        instruction: i64,
        opcode: OpCode,
        modes: [ParamMode; 3],
        operation: impl Fn(i64, i64) -> i64,
    ) -> Result<StepOutcome, InterpreterError> {
        let a = self.resolve_param(modes[0], 1)?;
        let b = self.resolve_param(modes[1], 2)?;
        let dest = self.resolve_dest(3)?;
        let val = operation(a, b);
        if !self.code.contains(dest) {
            return Err(InterpreterError::OutOfBoundsAccess {
                address: dest,
                len: self.code.len(),
            });
        }
        self.report_op(instruction, opcode, modes)?;
        self.trace(
            instruction,
            &[(self.raw_param(1)?, a), (self.raw_param(2)?, b), (dest, val)],
        );
        self.code.set(dest, val)?;
        self.index += 4;
        Ok(StepOutcome::Running)
    }

    /// common logic of both conditional jumps. The target is not checked here; an out of bounds
    /// target fails when the next instruction is decoded.
    pub(crate) fn jump(
        &mut self,
        instruction: i64,
        opcode: OpCode,
        modes: [ParamMode; 3],
        func: impl Fn(i64) -> bool,
    ) -> Result<StepOutcome, InterpreterError> {
        let expr = self.resolve_param(modes[0], 1)?;
        let dest = self.resolve_param(modes[1], 2)?;
        self.report_op(instruction, opcode, modes)?;
        self.trace(
            instruction,
            &[(self.raw_param(1)?, expr), (self.raw_param(2)?, dest)],
        );
        if func(expr) {
            self.index = dest;
        } else {
            self.index += 3;
        }
        Ok(StepOutcome::Running)
    }
}
