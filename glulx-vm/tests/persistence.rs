//! Save, restore, undo, restart and heap state across the machine
//! lifecycle.

use glulx_vm::prelude::*;
use glulx_vm::util::{ImageBuilder, RecordingGlk};

fn boot(image: Vec<u8>) -> Interpreter<RecordingGlk> {
    Interpreter::new(image, RecordingGlk::default(), VmParams::default())
        .expect("image should load")
}

const QUIT: [u8; 2] = [0x81, 0x20];
const SET_GLK: [u8; 5] = [0x81, 0x49, 0x11, 0x02, 0x00];

#[test]
fn save_then_restore_resumes_at_the_save_point() {
    let mut b = ImageBuilder::new();
    let f = b.func_local_args(
        &[(4, 1)],
        &[
            0x81, 0x49, 0x11, 0x02, 0x00, // setiosys 2 0
            0x81, 0x23, 0x91, 0x05, 0x00, // save stream-5 -> local0
            0x23, 0x19, 0x00, 0x08, // jnz local0 +8 (to the 'R' print)
            0x81, 0x24, 0x81, 0x05, // restore stream-5 -> push (failure path)
            0x81, 0x20, // quit
            0x70, 0x01, b'R', // streamchar 'R'
            0x81, 0x20,
        ],
    );
    b.set_start(f);

    let mut vm = boot(b.finish());
    vm.run().unwrap();
    // first pass stores 0, the restore rewinds to the save with -1
    assert_eq!(vm.provider().output_string(), "R");
    let stream = vm.provider().streams.get(&5).expect("save stream written");
    assert!(!stream.0.is_empty());
    assert_eq!(&stream.0[0..4], b"FORM");
}

#[test]
fn restoring_garbage_stores_failure_and_continues() {
    let mut b = ImageBuilder::new();
    let f = b.func_local_args(
        &[(4, 1)],
        &[
            0x81, 0x24, 0x81, 0x07, // restore stream-7 -> push (stream is empty)
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(0), Ok(1));
}

#[test]
fn undo_snapshots_rewind_execution() {
    let mut b = ImageBuilder::new();
    let f = b.func_local_args(
        &[(4, 1)],
        &[
            0x81, 0x49, 0x11, 0x02, 0x00, // setiosys 2 0
            0x81, 0x25, 0x09, 0x00, // saveundo -> local0
            0x23, 0x19, 0x00, 0x07, // jnz local0 +7
            0x81, 0x26, 0x08, // restoreundo -> push (failure path)
            0x81, 0x20, // quit
            0x70, 0x01, b'U', // streamchar 'U'
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.provider().output_string(), "U");
}

#[test]
fn hasundo_and_discardundo_track_the_ring() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x81, 0x28, 0x08, // hasundo -> push (1: nothing saved)
            0x81, 0x25, 0x00, // saveundo -> discard
            0x81, 0x28, 0x08, // hasundo -> push (0)
            0x81, 0x29, // discardundo
            0x81, 0x28, 0x08, // hasundo -> push (1)
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(2), Ok(1));
    assert_eq!(vm.stack().peek32(1), Ok(0));
    assert_eq!(vm.stack().peek32(0), Ok(1));
}

#[test]
fn restart_preserves_only_the_protected_range() {
    let mut b = ImageBuilder::new();
    let mut body = SET_GLK.to_vec();
    // protect the counter word at ramstart
    body.extend_from_slice(&[0x81, 0x27, 0x12, 0x01, 0x00, 0x04]); // protect 0x100 4
    body.extend_from_slice(&[0x40, 0x8D, 0x00]); // copy ram[0] -> push
    body.extend_from_slice(&[0x10, 0x18, 0x0D, 0x01, 0x00]); // add pop 1 -> ram[0]
    body.extend_from_slice(&[0x24, 0x1D, 0x01, 0x00, 0x02, 0x04]); // jeq ram[0] 2 +4
    body.extend_from_slice(&[0x81, 0x22]); // restart
    body.extend_from_slice(&[0x70, 0x01, b'D']); // streamchar 'D'
    body.extend_from_slice(&QUIT);
    let f = b.func_stack_args(&[], &body);
    b.set_start(f);
    b.pad_to(0x100); // pin ramstart so the protect range is knowable
    b.extra_memory(256);

    let mut vm = boot(b.finish());
    assert_eq!(vm.header().ramstart(), 0x100);
    vm.run().unwrap();
    // the counter survives one restart, so the second pass prints
    assert_eq!(vm.provider().output_string(), "D");
    assert_eq!(vm.memory().read_word(0x100), Ok(2));
}

#[test]
fn malloc_grows_memory_from_the_heap_start() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x81, 0x78, 0x82, 0x01, 0x2C, // malloc 300 -> push
            0x81, 0x02, 0x08, // getmemsize -> push
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    let original = vm.header().endmem();
    vm.run().unwrap();
    let addr = vm.stack().peek32(1).unwrap();
    let memsize = vm.stack().peek32(0).unwrap();
    assert_eq!(addr, original);
    assert!(memsize >= addr + 300);
    assert_eq!(memsize % 256, 0);
}

#[test]
fn mfree_shrinks_memory_when_the_heap_empties() {
    let mut b = ImageBuilder::new();
    let f = b.func_local_args(
        &[(4, 1)],
        &[
            0x81, 0x78, 0x91, 0x40, 0x00, // malloc 64 -> local0
            0x81, 0x02, 0x08, // getmemsize -> push
            0x81, 0x79, 0x09, 0x00, // mfree local0
            0x81, 0x02, 0x08, // getmemsize -> push
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    let original = vm.header().endmem();
    vm.run().unwrap();
    let shrunk = vm.stack().peek32(0).unwrap();
    let grown = vm.stack().peek32(1).unwrap();
    assert!(grown > original);
    assert_eq!(shrunk, original);
}

#[test]
fn mfree_leaves_a_gap_that_malloc_reuses() {
    let mut b = ImageBuilder::new();
    let f = b.func_local_args(
        &[(4, 3)],
        &[
            0x81, 0x78, 0x91, 0x40, 0x00, // malloc 64 -> local0
            0x81, 0x78, 0x91, 0x40, 0x04, // malloc 64 -> local4
            0x81, 0x78, 0x91, 0x40, 0x08, // malloc 64 -> local8
            0x81, 0x79, 0x09, 0x04, // mfree local4
            0x81, 0x78, 0x81, 0x30, // malloc 48 -> push
            0x40, 0x89, 0x04, // copy local4 -> push
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    let original = vm.header().endmem();
    vm.run().unwrap();
    // the freed middle block is handed out again
    let freed = vm.stack().peek32(0).unwrap();
    let reused = vm.stack().peek32(1).unwrap();
    assert_eq!(freed, original + 64);
    assert_eq!(reused, freed);
}

#[test]
fn setmemsize_fails_while_the_heap_is_active() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(
        &[],
        &[
            0x81, 0x78, 0x81, 0x10, // malloc 16 -> push
            0x81, 0x03, 0x82, 0x10, 0x00, // setmemsize 0x1000 -> push
            0x81, 0x20,
        ],
    );
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(0), Ok(1));
}

#[test]
fn verify_accepts_an_intact_image() {
    let mut b = ImageBuilder::new();
    let f = b.func_stack_args(&[], &[0x81, 0x21, 0x08, 0x81, 0x20]); // verify -> push
    b.set_start(f);
    let mut vm = boot(b.finish());
    vm.run().unwrap();
    assert_eq!(vm.stack().peek32(0), Ok(0));
}

#[test]
fn saved_state_round_trips_ram_changes() {
    // write a marker into RAM, save, clobber it, restore: the marker is
    // back and execution resumes after the save
    let mut b = ImageBuilder::new();
    let f = b.func_local_args(
        &[(4, 1)],
        &[
            0x40, 0xD3, 0xDE, 0xAD, 0xBE, 0xEF, 0x00, // copy 0xDEADBEEF -> ram[0]
            0x81, 0x23, 0x91, 0x05, 0x00, // save stream-5 -> local0
            0x23, 0x19, 0x00, 0x0C, // jnz local0 +12 (to the final quit)
            0x40, 0xD1, 0x00, 0x00, // copy 0 -> ram[0] (clobber)
            0x81, 0x24, 0x81, 0x05, // restore stream-5 -> push
            0x81, 0x20, // quit (restore-failure path)
            0x81, 0x20, // quit (resumed path)
        ],
    );
    b.set_start(f);
    b.extra_memory(256);

    let mut vm = boot(b.finish());
    vm.run().unwrap();
    let ramstart = vm.header().ramstart();
    assert_eq!(vm.memory().read_word(ramstart), Ok(0xDEAD_BEEF));
}
