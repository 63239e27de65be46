//! Core virtual machine implementation.
//!
//! [`VM`] is a synchronous fetch/decode/execute core. It never blocks: when it
//! reaches an INP with no staged value it reports [`Step::NeedInput`] and leaves
//! the program counter on that instruction, so any driver (a plain loop, an async
//! task, a test) decides where the input comes from. All arithmetic uses wrapping
//! semantics to prevent overflow panics.

mod config;
#[cfg(test)]
mod tests;

pub use config::{TRACE_ENV, VmConfig, parse_flag};

use crate::trace;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, Opcode, Word, decode};
use crate::virtual_machine::operand::{Operand, RawParam, resolve};
use crate::virtual_machine::program::{Program, to_address};

/// Lifecycle of a machine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    /// Stalled on an INP until a value is provided or input ends.
    BlockedOnInput,
    Halted,
}

/// Observable result of executing one instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// An instruction without external effect ran.
    Continue,
    /// OUT emitted a value.
    Output(Word),
    /// INP needs a value; the instruction has not run yet.
    NeedInput,
    /// The machine is halted.
    Halted,
}

/// Control flow decided by an instruction handler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Flow {
    Next,
    Jump(usize),
    Output(Word),
    Block,
    Halt,
}

macro_rules! exec_vm {
    (
        vm = $vm:ident,
        instr = $instr:ident,
        { $( $variant:ident => $handler:ident ( $( $field:ident : $kind:ident ),* $(,)? ) ),* $(,)? }
    ) => {{
        match $instr.opcode {
            $(
                Opcode::$variant => {
                    $( let $field = exec_vm!(@read $vm, $instr, $kind)?; )*
                    $vm.$handler($( $field ),*)
                }
            ),*
        }
    }};

    // Source operand: resolved and dereferenced
    (@read $vm:ident, $instr:ident, Src) => {{
        $vm.source(&$instr)
    }};

    // Destination operand: resolved to a cell index
    (@read $vm:ident, $instr:ident, Dst) => {{
        $vm.destination(&$instr)
    }};
}

/// IntCode virtual machine.
///
/// Owns its program image and machine state exclusively.
#[derive(Clone, Debug)]
pub struct VM {
    /// Code and data.
    program: Program,
    /// Program counter.
    pc: usize,
    /// Base register for relative-mode parameters.
    relative_base: Word,
    status: Status,
    config: VmConfig,
    /// Value staged for the pending INP.
    staged_input: Option<Word>,
    /// Index of the next parameter of the instruction being executed.
    cursor: usize,
    /// Rendered parameters of the current instruction, filled only when tracing.
    trace_params: Vec<String>,
}

impl VM {
    /// Creates a machine at `pc = 0` with default configuration.
    pub fn new(program: Program) -> Self {
        Self::with_config(program, VmConfig::default())
    }

    pub fn with_config(program: Program, config: VmConfig) -> Self {
        Self {
            program,
            pc: 0,
            relative_base: 0,
            status: Status::Running,
            config,
            staged_input: None,
            cursor: 0,
            trace_params: Vec::new(),
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn relative_base(&self) -> Word {
        self.relative_base
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_halted(&self) -> bool {
        self.status == Status::Halted
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    /// Stages `value` for the INP the machine is blocked on.
    ///
    /// Returns [`VMError::NotWaitingForInput`] unless the status is
    /// [`Status::BlockedOnInput`].
    pub fn provide_input(&mut self, value: Word) -> Result<(), VMError> {
        if self.status != Status::BlockedOnInput {
            return Err(VMError::NotWaitingForInput { pc: self.pc });
        }
        self.staged_input = Some(value);
        self.status = Status::Running;
        Ok(())
    }

    /// Signals that no more input will arrive.
    ///
    /// A machine blocked on input halts; this is a normal end of transmission.
    pub fn end_of_input(&mut self) {
        if self.status == Status::BlockedOnInput {
            if self.config.trace {
                trace!("vm{:02} {:>6}: EOT", self.config.id, self.pc);
            }
            self.status = Status::Halted;
        }
    }

    /// Executes a single instruction.
    ///
    /// On error the machine halts and the error carries the faulting `pc`.
    pub fn step(&mut self) -> Result<Step, VMError> {
        if self.status == Status::Halted {
            return Ok(Step::Halted);
        }

        let pc = self.pc;
        let word = *self.program.cell(pc);
        let result = decode(word).and_then(|instr| {
            let flow = self.exec(instr)?;
            Ok((instr, flow))
        });

        match result {
            Ok((instr, flow)) => Ok(self.advance(instr, flow)),
            Err(err) => {
                self.status = Status::Halted;
                Err(Self::locate(err, word, pc))
            }
        }
    }

    /// Runs until the machine emits output, needs input, or halts.
    pub fn run_until_event(&mut self) -> Result<Step, VMError> {
        loop {
            match self.step()? {
                Step::Continue => continue,
                event => return Ok(event),
            }
        }
    }

    /// Runs the machine, feeding it `inputs` in order.
    ///
    /// Stops at HLT or when the machine needs more input than was supplied;
    /// the returned status tells which.
    pub fn run_with_inputs<I>(&mut self, inputs: I) -> Result<(Vec<Word>, Status), VMError>
    where
        I: IntoIterator<Item = Word>,
    {
        let mut inputs = inputs.into_iter();
        let mut outputs = Vec::new();

        loop {
            match self.run_until_event()? {
                Step::Output(v) => outputs.push(v),
                Step::NeedInput => match inputs.next() {
                    Some(v) => self.provide_input(v)?,
                    None => return Ok((outputs, self.status)),
                },
                Step::Halted => return Ok((outputs, Status::Halted)),
                Step::Continue => {}
            }
        }
    }

    /// Attaches the instruction word and pc to errors raised while executing it.
    fn locate(err: VMError, word: Word, pc: usize) -> VMError {
        match err {
            VMError::IllegalInstruction { reason, .. } => VMError::IllegalInstruction {
                word,
                pc,
                reason,
            },
            other => other,
        }
    }

    /// Applies the handler's control-flow decision to the machine state.
    fn advance(&mut self, instr: Instruction, flow: Flow) -> Step {
        match flow {
            Flow::Next => {
                self.pc += instr.width();
                Step::Continue
            }
            Flow::Jump(target) => {
                self.pc = target;
                Step::Continue
            }
            Flow::Output(v) => {
                self.pc += instr.width();
                Step::Output(v)
            }
            Flow::Block => {
                self.status = Status::BlockedOnInput;
                Step::NeedInput
            }
            Flow::Halt => {
                self.status = Status::Halted;
                Step::Halted
            }
        }
    }

    /// Executes a decoded instruction.
    fn exec(&mut self, instr: Instruction) -> Result<Flow, VMError> {
        self.cursor = 0;
        self.trace_params.clear();

        let flow = exec_vm! {
            vm = self,
            instr = instr,
            {
                Add => op_add(a: Src, b: Src, dst: Dst),
                Mul => op_mul(a: Src, b: Src, dst: Dst),
                Inp => op_inp(dst: Dst),
                Out => op_out(a: Src),
                Jit => op_jit(a: Src, target: Src),
                Jif => op_jif(a: Src, target: Src),
                Lt => op_lt(a: Src, b: Src, dst: Dst),
                Eq => op_eq(a: Src, b: Src, dst: Dst),
                Rbo => op_rbo(a: Src),
                Hlt => op_hlt(),
            }
        }?;

        if self.config.trace && flow != Flow::Block {
            self.trace_instruction(&instr, flow);
        }
        Ok(flow)
    }

    /// Resolves the next parameter of `instr`.
    fn next_param(&mut self, instr: &Instruction) -> Result<Operand, VMError> {
        let slot = self.cursor;
        self.cursor += 1;

        let mode = instr.modes[slot];
        let raw = *self.program.cell(self.pc + 1 + slot);
        if self.config.trace {
            self.trace_params.push(RawParam { mode, raw }.to_string());
        }
        resolve(mode, raw, self.relative_base)
    }

    fn source(&mut self, instr: &Instruction) -> Result<Word, VMError> {
        let operand = self.next_param(instr)?;
        let value = operand.value(&mut self.program);
        if self.config.trace
            && let Operand::Address(_) = operand
            && let Some(rendered) = self.trace_params.last_mut()
        {
            rendered.push_str(&format!("={}", value));
        }
        Ok(value)
    }

    fn destination(&mut self, instr: &Instruction) -> Result<usize, VMError> {
        self.next_param(instr)?.destination()
    }

    fn store(&mut self, dst: usize, value: Word) -> Result<Flow, VMError> {
        *self.program.cell(dst) = value;
        Ok(Flow::Next)
    }

    fn op_add(&mut self, a: Word, b: Word, dst: usize) -> Result<Flow, VMError> {
        self.store(dst, a.wrapping_add(b))
    }

    fn op_mul(&mut self, a: Word, b: Word, dst: usize) -> Result<Flow, VMError> {
        self.store(dst, a.wrapping_mul(b))
    }

    fn op_inp(&mut self, dst: usize) -> Result<Flow, VMError> {
        match self.staged_input.take() {
            Some(v) => self.store(dst, v),
            None => Ok(Flow::Block),
        }
    }

    fn op_out(&mut self, a: Word) -> Result<Flow, VMError> {
        Ok(Flow::Output(a))
    }

    fn op_jit(&mut self, a: Word, target: Word) -> Result<Flow, VMError> {
        if a != 0 {
            return Ok(Flow::Jump(to_address(target)?));
        }
        Ok(Flow::Next)
    }

    fn op_jif(&mut self, a: Word, target: Word) -> Result<Flow, VMError> {
        if a == 0 {
            return Ok(Flow::Jump(to_address(target)?));
        }
        Ok(Flow::Next)
    }

    fn op_lt(&mut self, a: Word, b: Word, dst: usize) -> Result<Flow, VMError> {
        self.store(dst, Word::from(a < b))
    }

    fn op_eq(&mut self, a: Word, b: Word, dst: usize) -> Result<Flow, VMError> {
        self.store(dst, Word::from(a == b))
    }

    fn op_rbo(&mut self, a: Word) -> Result<Flow, VMError> {
        self.relative_base = self.relative_base.wrapping_add(a);
        Ok(Flow::Next)
    }

    fn op_hlt(&mut self) -> Result<Flow, VMError> {
        Ok(Flow::Halt)
    }

    fn trace_instruction(&self, instr: &Instruction, flow: Flow) {
        let effect = match flow {
            Flow::Output(v) => format!(" -> out {}", v),
            Flow::Jump(target) => format!(" -> pc {}", target),
            Flow::Halt => String::new(),
            Flow::Next | Flow::Block => match instr.opcode {
                Opcode::Rbo => format!(" -> rb {}", self.relative_base),
                _ => String::new(),
            },
        };
        trace!(
            "vm{:02} {:>6}: {:<3} {}{}",
            self.config.id,
            self.pc,
            instr.opcode.mnemonic(),
            self.trace_params.join(" "),
            effect
        );
    }
}
