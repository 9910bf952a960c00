//! End-to-end execution: tiny assembled images run through the machine.

use glulx_vm::prelude::*;
use glulx_vm::util::{ImageBuilder, RecordingGlk};

fn boot(image: Vec<u8>) -> Interpreter<RecordingGlk> {
    Interpreter::new(image, RecordingGlk::default(), VmParams::default())
        .expect("image should load")
}

const QUIT: [u8; 2] = [0x81, 0x20];

#[test]
fn add_constants_onto_the_stack() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x10, 0x11, 0x08, 0x05, 0x0A, // add 5 10 -> push
            0x81, 0x20, // quit
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().stkcount(), 1);
    assert_eq!(vm.stack().peek32(0), Ok(15));
}

#[test]
fn backward_jump_lands_two_short_of_the_offset() {
    let mut b = ImageBuilder::new();
    b.pad_to(0xF8);
    // five nops put the jump opcode exactly at 0x100
    let f = b.func_stack_args(&[], &[0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x01, 0xFB]);
    b.set_start(f);
    let mut vm = boot(b.finish());
    assert_eq!(vm.pc(), 0xFB);
    for _ in 0..5 {
        vm.step().unwrap();
    }
    assert_eq!(vm.pc(), 0x100);
    vm.step().unwrap();
    // operands end at 0x103; 0x103 + (-5) - 2
    assert_eq!(vm.pc(), 0xFC);
}

#[test]
fn jltu_compares_unsigned() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x2A, 0x33, 0x01, // jltu c c branch
            0x7F, 0xFF, 0xFF, 0xFF, 0x80, 0x00, 0x00, 0x00, 0x05, // taken: skip next
            0x40, 0x81, 0x63, // copy 99 -> push (skipped)
            0x40, 0x81, 0x01, // copy 1 -> push
            0x81, 0x20, // quit
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().stkcount(), 1);
    assert_eq!(vm.stack().peek32(0), Ok(1));
}

#[test]
fn jlt_compares_signed() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x26, 0x33, 0x01, // jlt c c branch: 0x7FFFFFFF < -2^31 is false
            0x7F, 0xFF, 0xFF, 0xFF, 0x80, 0x00, 0x00, 0x00, 0x05,
            0x40, 0x81, 0x63, // copy 99 -> push (executed)
            0x40, 0x81, 0x01, // copy 1 -> push
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().stkcount(), 2);
    assert_eq!(vm.stack().peek32(0), Ok(1));
    assert_eq!(vm.stack().peek32(1), Ok(99));
}

#[test]
fn stack_argument_functions_see_count_under_the_arguments() {
    let mut b = ImageBuilder::new();
    // callee: add pop pop -> push; return pop
    let callee = b.func_stack_args(&[], &[0x10, 0x88, 0x08, 0x31, 0x08]);
    let mut body = vec![
        0x40, 0x81, 0x63, // copy 99 -> push
        0x40, 0x81, 0x0A, // copy 10 -> push
        0x30, 0x13, 0x08, // call callee 2 -> push
    ];
    body.extend_from_slice(&callee.to_be_bytes());
    body.push(0x02);
    body.extend_from_slice(&QUIT);
    let main = b.func_stack_args(&[], &body);
    b.set_start(main);

    let mut vm = boot(b.finish());
    // step to just inside the callee: copy, copy, call
    for _ in 0..3 {
        vm.step().unwrap();
    }
    // value stack reads top to bottom: first arg, second arg, count
    assert_eq!(vm.stack().peek32(0), Ok(10));
    assert_eq!(vm.stack().peek32(1), Ok(99));
    assert_eq!(vm.stack().peek32(2), Ok(2));

    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(0), Ok(109));
}

#[test]
fn local_argument_functions_fill_locals_in_order() {
    let mut b = ImageBuilder::new();
    // callee: two 4-byte locals; add local0 local4 -> push; return pop
    let callee = b.func_local_args(&[(4, 2)], &[0x10, 0x99, 0x08, 0x00, 0x04, 0x31, 0x08]);
    let mut body = vec![0x81, 0x62, 0x13, 0x81]; // callfii c c -> push
    body.extend_from_slice(&callee.to_be_bytes());
    body.extend_from_slice(&[0x07, 0x09]);
    body.extend_from_slice(&QUIT);
    let main = b.func_stack_args(&[], &body);
    b.set_start(main);

    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(0), Ok(16));
}

#[test]
fn float_add_is_bit_exact() {
    let mut b = ImageBuilder::new();
    let mut body = vec![0x81, 0xA0, 0x33, 0x08]; // fadd c c -> push
    body.extend_from_slice(&0x3FC0_0000u32.to_be_bytes()); // 1.5
    body.extend_from_slice(&0x4020_0000u32.to_be_bytes()); // 2.5
    body.extend_from_slice(&QUIT);
    let f = b.func_stack_args(&[], &body);
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(0), Ok(0x4080_0000)); // 4.0
}

#[test]
fn double_add_pushes_high_word_first() {
    let mut b = ImageBuilder::new();
    let mut body = vec![0x82, 0x10, 0x33, 0x33, 0x88]; // dadd c c c c -> push push
    for word in [0x3FF8_0000u32, 0, 0x4002_0000, 0] {
        // 1.5 + 2.25
        body.extend_from_slice(&word.to_be_bytes());
    }
    body.extend_from_slice(&QUIT);
    let f = b.func_stack_args(&[], &body);
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    // 3.75 = 0x400E_0000_0000_0000, low word on top
    assert_eq!(vm.stack().peek32(0), Ok(0));
    assert_eq!(vm.stack().peek32(1), Ok(0x400E_0000));
}

#[test]
fn catch_and_throw_deliver_through_the_stub() {
    let mut b = ImageBuilder::new();
    let f = b.func_local_args(
        &[(4, 1)],
        &[
            0x32, 0x19, 0x00, 0x07, // catch -> local0, branch +7
            0x40, 0x89, 0x00, // copy local0 -> push (throw resumes here)
            0x81, 0x20, // quit
            0x33, 0x91, 0x07, 0x00, // throw 7 local0
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(0), Ok(7));
}

#[test]
fn tailcall_reuses_the_callers_stub() {
    let mut b = ImageBuilder::new();
    let leaf = b.func_stack_args(&[], &[0x31, 0x01, 0x05]); // return 5
    let mut middle_body = vec![0x34, 0x13]; // tailcall leaf 0
    middle_body.extend_from_slice(&leaf.to_be_bytes());
    middle_body.push(0x00);
    let middle = b.func_stack_args(&[], &middle_body);
    let mut body = vec![0x81, 0x60, 0x83]; // callf middle -> push
    body.extend_from_slice(&middle.to_be_bytes());
    body.extend_from_slice(&QUIT);
    let main = b.func_stack_args(&[], &body);
    b.set_start(main);

    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(0), Ok(5));
}

#[test]
fn ram_relative_modes_offset_from_ramstart() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x40, 0xD1, 0x05, 0x04, // copy 5 -> ram[4]
            0x40, 0x8D, 0x04, // copy ram[4] -> push
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(0), Ok(5));
    let ramstart = vm.header().ramstart();
    assert_eq!(vm.memory().read_word(ramstart + 4), Ok(5));
}

#[test]
fn copys_moves_sixteen_bits() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x41, 0xD3, 0x12, 0x34, 0x56, 0x78, 0x08, // copys 0x12345678 -> ram[8]
            0x40, 0x8D, 0x08, // copy ram[8] -> push (full word)
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    // the low 16 bits land in the two addressed bytes; the rest stay zero
    assert_eq!(vm.stack().peek32(0), Ok(0x5678_0000));
}

#[test]
fn gestalt_reports_capabilities() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x81, 0x00, 0x11, 0x08, 0x00, 0x00, // gestalt 0 0 -> push
            0x81, 0x00, 0x11, 0x08, 0x0B, 0x00, // gestalt 11 0 -> push
            0x81, 0x00, 0x11, 0x08, 0x63, 0x00, // gestalt 99 0 -> push
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(2), Ok(0x0003_0103));
    assert_eq!(vm.stack().peek32(1), Ok(1));
    assert_eq!(vm.stack().peek32(0), Ok(0));
}

#[test]
fn getiosys_reports_mode_and_rock() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x81, 0x49, 0x21, 0x01, 0x12, 0x34, // setiosys 1 0x1234 (filter)
            0x81, 0x48, 0x88, // getiosys -> push push
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(1), Ok(1)); // mode stored first
    assert_eq!(vm.stack().peek32(0), Ok(0x1234)); // rock on top
    assert_eq!(vm.iosys(), IoSys::Filter { func: 0x1234 });
}

#[test]
fn division_by_zero_is_fatal_with_context() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(&[], &[0x13, 0x11, 0x08, 0x01, 0x00]); // div 1 0 -> push
    b.set_start(f);
    let mut vm = boot(b.finish());
    let err = vm.run().unwrap_err();
    match err {
        InterpreterError::Fault {
            fault,
            pc,
            opcode,
            operands,
        } => {
            assert_eq!(fault, Fault::DivideByZero);
            assert_eq!(pc, f + 3);
            assert_eq!(opcode, 0x13);
            assert_eq!(operands, vec![1, 0]);
        }
        other => panic!("wrong error: {other}"),
    }
}

#[test]
fn min_divided_by_minus_one_is_fatal() {
    let mut b = ImageBuilder::new();
    let mut body = vec![0x13, 0x33, 0x08];
    body.extend_from_slice(&0x8000_0000u32.to_be_bytes());
    body.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
    let f = b.func_stack_args(&[], &body);
    b.set_start(f);
    let mut vm = boot(b.finish());
    let err = vm.run().unwrap_err();
    assert_eq!(err.fault(), Some(&Fault::InvalidDivision));
}

#[test]
fn reserved_addressing_modes_are_fatal() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(&[], &[0x10, 0x14, 0x08, 0x05, 0x0A]); // mode 4
    b.set_start(f);
    let mut vm = boot(b.finish());
    let err = vm.run().unwrap_err();
    assert_eq!(err.fault(), Some(&Fault::ReservedAddressingMode));
}

#[test]
fn unknown_opcodes_are_fatal() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(&[], &[0x05]);
    b.set_start(f);
    let mut vm = boot(b.finish());
    let err = vm.run().unwrap_err();
    assert_eq!(err.fault(), Some(&Fault::UnknownOpcode));
}

#[test]
fn rom_writes_are_fatal() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(&[], &[0x4E, 0x11, 0x01, 0x10, 0x00, 0x07]); // astoreb 0x10 0 7
    b.set_start(f);
    let mut vm = boot(b.finish());
    let err = vm.run().unwrap_err();
    assert_eq!(err.fault(), Some(&Fault::WriteToRom));
}

#[test]
fn debugtrap_carries_its_argument() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(&[], &[0x81, 0x01, 0x01, 0x2A]); // debugtrap 42
    b.set_start(f);
    let mut vm = boot(b.finish());
    let err = vm.run().unwrap_err();
    assert_eq!(err.fault(), Some(&Fault::UserDebugTrap(42)));
}

#[test]
fn returning_from_the_start_function_stops_the_machine() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(&[], &[0x31, 0x01, 0x00]); // return 0
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert!(!vm.is_running());
    assert_eq!(vm.stack().sp(), 0);
}
