// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use itertools::Itertools;
use std::fmt;

use super::InterpreterError;

/// Fixed-length memory shared by code and data.
///
/// The length is set once when the memory is collected from the program, and every address must
/// fall within `0..len`.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Memory {
    cells: Box<[i64]>,
}

impl Memory {
    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    /// Convert `address` into a slice index, or report it as out of bounds
    fn slot(&self, address: i64) -> Result<usize, InterpreterError> {
        usize::try_from(address)
            .ok()
            .filter(|&i| i < self.cells.len())
            .ok_or(InterpreterError::OutOfBoundsAccess {
                address,
                len: self.cells.len(),
            })
    }

    pub(crate) fn contains(&self, address: i64) -> bool {
        self.slot(address).is_ok()
    }

    pub(crate) fn get(&self, address: i64) -> Result<i64, InterpreterError> {
        self.slot(address).map(|i| self.cells[i])
    }

    pub(crate) fn get_mut(&mut self, address: i64) -> Result<&mut i64, InterpreterError> {
        let i = self.slot(address)?;
        Ok(&mut self.cells[i])
    }

    pub(crate) fn set(&mut self, address: i64, value: i64) -> Result<(), InterpreterError> {
        *self.get_mut(address)? = value;
        Ok(())
    }

    pub(crate) fn as_slice(&self) -> &[i64] {
        &self.cells
    }
}

impl std::iter::FromIterator<i64> for Memory {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl From<Memory> for Vec<i64> {
    fn from(mem: Memory) -> Self {
        mem.cells.into_vec()
    }
}

impl std::ops::Index<i64> for Memory {
    type Output = i64;
    fn index(&self, i: i64) -> &i64 {
        match self.slot(i) {
            Ok(i) => &self.cells[i],
            Err(e) => panic!("{e}"),
        }
    }
}

impl std::ops::IndexMut<i64> for Memory {
    fn index_mut(&mut self, i: i64) -> &mut i64 {
        match self.get_mut(i) {
            Ok(cell) => cell,
            Err(e) => panic!("{e}"),
        }
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "[{}]", self.cells.iter().format(","))
    }
}
