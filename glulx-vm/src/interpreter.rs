//! [`Interpreter`] implementation.

use glulx_isa::Fault;

use crate::error::{InterpreterError, SimpleResult};
use crate::glk::{GlkDispatch, GlkVm};
use crate::header::Header;
use crate::memory::MemoryMap;
use crate::params::VmParams;
use crate::save::UndoRing;
use crate::stack::Stack;
use crate::strings::StringTable;

mod accel;
mod alu;
mod decode;
mod double;
mod executor;
mod float;
mod flow;
mod heap;
mod misc;
mod search;
mod stream;

pub use stream::IoSys;

use accel::Accel;
use heap::Heap;
use misc::VmRng;

/// The virtual machine.
///
/// One instance owns every piece of mutable machine state: the memory
/// map, the stack, the program counter, the string-decoding cache, the
/// heap, and the undo ring. The presentation provider `G` is consulted
/// through the dispatch boundary and may touch machine memory and stack
/// only through the access handle passed to each call.
pub struct Interpreter<G> {
    mem: MemoryMap,
    stack: Stack,
    pc: u32,
    header: Header,
    /// The initial image, kept for `verify`, `restart` and save deltas.
    pristine: Vec<u8>,
    string_table: StringTable,
    iosys: IoSys,
    glk: G,
    rng: VmRng,
    accel: Accel,
    heap: Heap,
    undo: UndoRing,
    protect: Option<(u32, u32)>,
    running: bool,
    stop_requested: bool,
    /// Load operands of the instruction in flight, for fault diagnostics.
    trace_operands: Vec<u32>,
}

impl<G: GlkDispatch> Interpreter<G> {
    /// Load an image, validate it, and set the machine up at its start
    /// function.
    pub fn new(image: Vec<u8>, glk: G, params: VmParams) -> Result<Self, InterpreterError> {
        let header = Header::parse(&image)?;
        let pristine = image[..header.extstart() as usize].to_vec();

        let sum = Header::compute_checksum(&pristine);
        if sum != header.checksum() {
            tracing::warn!(
                stored = format_args!("{:#010x}", header.checksum()),
                computed = format_args!("{sum:#010x}"),
                "image checksum mismatch",
            );
        }

        let mem = MemoryMap::new(
            &pristine,
            header.ramstart(),
            header.extstart(),
            header.endmem(),
        );
        let stack_size = params.stack_size.unwrap_or_else(|| header.stack_size());

        let mut vm = Self {
            mem,
            stack: Stack::new(stack_size),
            pc: 0,
            header,
            pristine,
            string_table: StringTable::default(),
            iosys: IoSys::Null,
            glk,
            rng: VmRng::default(),
            accel: Accel::default(),
            heap: Heap::default(),
            undo: UndoRing::new(params.undo_depth),
            protect: None,
            running: false,
            stop_requested: false,
            trace_operands: Vec::new(),
        };
        vm.boot().map_err(|fault| vm.fault_error(fault, 0, 0))?;
        Ok(vm)
    }

    /// Reset transient state and enter the start function.
    fn boot(&mut self) -> SimpleResult<()> {
        self.string_table
            .select(&self.mem, self.header.string_table())?;
        self.stack.clear();
        self.enter_function(self.header.start_func(), &[])?;
        self.running = true;
        Ok(())
    }

    /// Execute instructions until the machine quits, is stopped, or
    /// faults.
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        while self.running && !self.stop_requested {
            self.step()?;
        }
        Ok(())
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> Result<(), InterpreterError> {
        let pc = self.pc;
        self.trace_operands.clear();
        let mut opcode_num = 0;
        self.step_inner(&mut opcode_num)
            .map_err(|fault| self.fault_error(fault, pc, opcode_num))
    }

    fn fault_error(&self, fault: Fault, pc: u32, opcode: u32) -> InterpreterError {
        InterpreterError::Fault {
            fault,
            pc,
            opcode,
            operands: self.trace_operands.clone(),
        }
    }

    /// Whether the machine still has work to do.
    pub fn is_running(&self) -> bool {
        self.running && !self.stop_requested
    }

    /// Ask the machine to stop between instructions.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Current program counter.
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// The memory map.
    pub const fn memory(&self) -> &MemoryMap {
        &self.mem
    }

    /// The stack.
    pub const fn stack(&self) -> &Stack {
        &self.stack
    }

    /// The parsed image header.
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// The selected I/O system.
    pub const fn iosys(&self) -> IoSys {
        self.iosys
    }

    /// The presentation provider.
    pub const fn provider(&self) -> &G {
        &self.glk
    }

    /// Mutable access to the presentation provider.
    pub fn provider_mut(&mut self) -> &mut G {
        &mut self.glk
    }

    /// Forward a call across the dispatch boundary.
    pub(crate) fn dispatch_glk(&mut self, selector: u32, args: &[u32]) -> u32 {
        let Self {
            mem,
            stack,
            glk,
            stop_requested,
            ..
        } = self;
        let mut vm = GlkVm::new(mem, stack, stop_requested);
        glk.dispatch(&mut vm, selector, args)
    }
}
