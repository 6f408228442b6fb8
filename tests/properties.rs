//! Properties that must hold for every program, not just the published examples.
// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use intcode_vm::prelude::*;
use proptest::prelude::*;

/// Straight-line programs built from `ADD`/`MUL`/`LT`/`EQ` over the first `DATA` cells, followed
/// by `HALT` and the data itself.
fn straight_line_program() -> impl Strategy<Value = Vec<i64>> {
    const DATA: i64 = 8;
    let instr = (
        prop::sample::select(vec![1i64, 2, 7, 8]),
        0..=1i64,
        0..=1i64,
        0..DATA,
        0..DATA,
        0..DATA,
    );
    (
        prop::collection::vec(instr, 0..16),
        prop::collection::vec(-1000..1000i64, DATA as usize),
    )
        .prop_map(|(instrs, data)| {
            let data_start = instrs.len() as i64 * 4 + 1;
            let mut code = Vec::new();
            for (op, mode_a, mode_b, a, b, dest) in instrs {
                code.push(op + mode_a * 100 + mode_b * 1000);
                // immediate operands stay small literals, positional ones point into the data
                code.push(if mode_a == 1 { a } else { data_start + a });
                code.push(if mode_b == 1 { b } else { data_start + b });
                code.push(data_start + dest);
            }
            code.push(99);
            code.extend(data);
            code
        })
}

proptest! {
    #[test]
    fn execution_is_deterministic(program in straight_line_program()) {
        let mut first_out: Vec<i64> = vec![];
        let mut second_out: Vec<i64> = vec![];
        let first = execute(program.clone(), empty(), &mut first_out);
        let second = execute(program.clone(), empty(), &mut second_out);
        prop_assert!(first.is_ok());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first_out, second_out);
        prop_assert_eq!(first.unwrap().len(), program.len());
    }

    #[test]
    fn cloned_interpreters_agree(program in straight_line_program()) {
        let template = Interpreter::new(program);
        let mut a = template.clone();
        let mut b = template.clone();
        prop_assert_eq!(a.run_through_inputs(empty()), Ok((vec![], State::Halted)));
        prop_assert_eq!(b.run_through_inputs(empty()), Ok((vec![], State::Halted)));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn echo_any_value(value in any::<i64>()) {
        let mut outputs: Vec<i64> = vec![];
        let memory = execute([3, 0, 4, 0, 99], [value], &mut outputs).unwrap();
        prop_assert_eq!(outputs, vec![value]);
        prop_assert_eq!(memory, vec![value, 0, 4, 0, 99]);
    }

    #[test]
    fn unknown_opcodes_are_rejected(word in any::<i64>()) {
        let opcode = word % 100;
        prop_assume!(!matches!(opcode, 1..=8 | 99));
        let mut interp = Interpreter::new([word, 0, 0, 0]);
        prop_assert_eq!(
            interp.run_through_inputs(empty()),
            Err(InterpreterError::InvalidOpcode(word))
        );
        prop_assert_eq!(interp.memory(), &[word, 0, 0, 0]);
        prop_assert_eq!(interp.instr_ptr(), 0);
    }

    #[test]
    fn halt_ignores_its_mode_digits(modes in 0..i64::MAX / 100) {
        let word = modes * 100 + 99;
        prop_assert_eq!(execute([word], empty(), &mut Vec::<i64>::new()), Ok(vec![word]));
    }

    #[test]
    fn jump_targets_are_checked_on_decode(target in 4..i64::MAX) {
        let mut interp = Interpreter::new([1105, 1, target, 99]);
        let mut outputs: Vec<i64> = vec![];
        prop_assert_eq!(
            interp.exec_instruction(&mut empty(), &mut outputs),
            Ok(StepOutcome::Running)
        );
        prop_assert_eq!(
            interp.exec_instruction(&mut empty(), &mut outputs),
            Err(InterpreterError::OutOfBoundsAccess { address: target, len: 4 })
        );
    }
}
