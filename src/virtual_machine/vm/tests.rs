use super::*;
use crate::utils::test_utils::utils::*;

fn vm(text: &str) -> VM {
    VM::new(program(text))
}

fn run(text: &str, inputs: &[Word]) -> (Vec<Word>, VM) {
    let mut vm = vm(text);
    let (outputs, status) = vm.run_with_inputs(inputs.iter().copied()).unwrap();
    assert_eq!(status, Status::Halted);
    (outputs, vm)
}

// ==================== Basic execution ====================

#[test]
fn add_then_halt() {
    let (outputs, vm) = run("1,0,0,0,99", &[]);
    assert!(outputs.is_empty());
    assert_eq!(vm.program().as_slice(), &[2, 0, 0, 0, 99]);
}

#[test]
fn multiply_into_later_cell() {
    let (_, vm) = run("2,4,4,5,99,0", &[]);
    assert_eq!(vm.program().as_slice(), &[2, 4, 4, 5, 99, 9801]);
}

#[test]
fn self_modifying_program() {
    let (_, vm) = run("1,1,1,4,99,5,6,0,99", &[]);
    assert_eq!(vm.program().as_slice(), &[30, 1, 1, 4, 2, 5, 6, 0, 99]);
}

#[test]
fn gravity_assist_example() {
    let (_, vm) = run(GRAVITY_ASSIST, &[]);
    assert_eq!(vm.program().as_slice()[0], 3500);
}

#[test]
fn patch_before_run() {
    let program = program("1,0,0,0,99,7,8").patched([(1, 5), (2, 6)]).unwrap();
    let mut vm = VM::new(program);
    vm.run_with_inputs([]).unwrap();
    assert_eq!(vm.program().as_slice()[0], 15);
}

#[test]
fn echo_input() {
    let (outputs, _) = run(ECHO, &[42]);
    assert_eq!(outputs, vec![42]);
}

#[test]
fn halt_performs_no_write() {
    let before = program("99,5,6,7");
    let mut vm = VM::new(before.clone());
    assert_eq!(vm.step().unwrap(), Step::Halted);
    assert_eq!(vm.status(), Status::Halted);
    assert_eq!(vm.program(), &before);
    assert_eq!(vm.step().unwrap(), Step::Halted);
}

#[test]
fn immediate_and_negative_parameters() {
    let (_, vm) = run("1101,100,-1,4,0", &[]);
    assert_eq!(vm.program().as_slice()[4], 99);
}

// ==================== Large numbers ====================

#[test]
fn large_product() {
    let (outputs, _) = run(LARGE_PRODUCT, &[]);
    assert_eq!(outputs, vec![1219070632396864]);
    assert_eq!(outputs[0].to_string().len(), 16);
}

#[test]
fn large_literal() {
    let (outputs, _) = run(LARGE_LITERAL, &[]);
    assert_eq!(outputs, vec![1125899906842624]);
}

#[test]
fn arithmetic_wraps() {
    let text = format!("1101,{},1,5,99,0", Word::MAX);
    let (_, vm) = run(&text, &[]);
    assert_eq!(vm.program().as_slice()[5], Word::MIN);
}

// ==================== Comparisons and jumps ====================

#[test]
fn equals_eight() {
    assert_eq!(run(EQUALS_EIGHT, &[8]).0, vec![1]);
    assert_eq!(run(EQUALS_EIGHT, &[7]).0, vec![0]);
}

#[test]
fn less_than_eight_immediate() {
    let text = "3,3,1107,-1,8,3,4,3,99";
    assert_eq!(run(text, &[5]).0, vec![1]);
    assert_eq!(run(text, &[8]).0, vec![0]);
}

#[test]
fn jumps_report_zero_input() {
    let position = "3,12,6,12,15,1,13,14,13,4,13,99,-1,0,1,9";
    let immediate = "3,3,1105,-1,9,1101,0,0,12,4,12,99,1";
    for text in [position, immediate] {
        assert_eq!(run(text, &[0]).0, vec![0]);
        assert_eq!(run(text, &[3]).0, vec![1]);
    }
}

#[test]
fn compare_eight() {
    assert_eq!(run(COMPARE_EIGHT, &[7]).0, vec![999]);
    assert_eq!(run(COMPARE_EIGHT, &[8]).0, vec![1000]);
    assert_eq!(run(COMPARE_EIGHT, &[9]).0, vec![1001]);
}

// ==================== Relative base and growth ====================

#[test]
fn quine_emits_itself() {
    let expected = program(QUINE);
    let (outputs, _) = run(QUINE, &[]);
    assert_eq!(outputs, expected.as_slice());
}

#[test]
fn relative_base_offset_accumulates() {
    let (outputs, vm) = run("109,19,109,-2,204,-17,99", &[]);
    assert_eq!(vm.relative_base(), 17);
    assert_eq!(outputs, vec![109]);
    assert_eq!(vm.program().len(), 7);
}

#[test]
fn relative_destination() {
    // rb = 10; INP .5 writes cell 15
    let (_, vm) = run("109,10,203,5,99", &[77]);
    assert_eq!(vm.program().len(), 16);
    assert_eq!(vm.program().as_slice()[15], 77);
}

#[test]
fn write_past_end_grows_to_exactly_addr_plus_one() {
    let (_, vm) = run("1101,1,2,20,99", &[]);
    assert_eq!(vm.program().len(), 21);
    assert_eq!(vm.program().as_slice()[20], 3);
    assert!(vm.program().as_slice()[5..20].iter().all(|&c| c == 0));
}

#[test]
fn running_off_the_end_hits_zero_opcode() {
    let mut vm = vm("1101,0,0,5");
    let err = vm.run_with_inputs([]).unwrap_err();
    assert_eq!(
        err,
        VMError::IllegalInstruction {
            word: 0,
            pc: 4,
            reason: "unknown opcode"
        }
    );
    assert!(vm.is_halted());
}

// ==================== Input protocol ====================

#[test]
fn need_input_leaves_pc_unchanged() {
    let mut vm = vm(ECHO);
    assert_eq!(vm.step().unwrap(), Step::NeedInput);
    assert_eq!(vm.status(), Status::BlockedOnInput);
    assert_eq!(vm.pc(), 0);
    assert_eq!(vm.step().unwrap(), Step::NeedInput);
    assert_eq!(vm.pc(), 0);

    vm.provide_input(5).unwrap();
    assert_eq!(vm.status(), Status::Running);
    assert_eq!(vm.step().unwrap(), Step::Continue);
    assert_eq!(vm.pc(), 2);
    assert_eq!(vm.step().unwrap(), Step::Output(5));
    assert_eq!(vm.step().unwrap(), Step::Halted);
}

#[test]
fn run_until_event_skips_plain_steps() {
    let mut vm = vm("1,0,0,0,3,0,4,0,99");
    assert_eq!(vm.run_until_event().unwrap(), Step::NeedInput);
    assert_eq!(vm.pc(), 4);

    vm.provide_input(5).unwrap();
    assert_eq!(vm.run_until_event().unwrap(), Step::Output(5));
    assert_eq!(vm.run_until_event().unwrap(), Step::Halted);
    assert_eq!(vm.run_until_event().unwrap(), Step::Halted);
}

#[test]
fn input_when_not_blocked_is_rejected() {
    let mut vm = vm(ECHO);
    assert_eq!(
        vm.provide_input(1),
        Err(VMError::NotWaitingForInput { pc: 0 })
    );
}

#[test]
fn end_of_input_halts_blocked_machine() {
    let mut vm = vm(ECHO_LOOP);
    let (outputs, status) = vm.run_with_inputs([1, 2, 3]).unwrap();
    assert_eq!(outputs, vec![1, 2, 3]);
    assert_eq!(status, Status::BlockedOnInput);

    vm.end_of_input();
    assert_eq!(vm.status(), Status::Halted);
    assert_eq!(vm.step().unwrap(), Step::Halted);
}

#[test]
fn end_of_input_ignored_while_running() {
    let mut vm = vm(ECHO);
    vm.end_of_input();
    assert_eq!(vm.status(), Status::Running);
}

// ==================== Faults ====================

#[test]
fn unknown_opcode_reports_pc() {
    let mut vm = vm("1101,1,1,0,42");
    assert!(matches!(
        vm.run_with_inputs([]),
        Err(VMError::IllegalInstruction {
            word: 42,
            pc: 4,
            ..
        })
    ));
    assert_eq!(vm.status(), Status::Halted);
    assert_eq!(vm.step().unwrap(), Step::Halted);
}

#[test]
fn immediate_destination_traps() {
    let mut vm = vm("11101,1,1,0,99");
    assert!(matches!(
        vm.step(),
        Err(VMError::IllegalInstruction {
            word: 11101,
            pc: 0,
            reason: "immediate-mode destination"
        })
    ));
}

#[test]
fn negative_address_is_out_of_range() {
    let mut vm = vm("4,-1,99");
    assert_eq!(vm.step(), Err(VMError::OutOfRange { addr: -1 }));
    assert!(vm.is_halted());
}

#[test]
fn negative_jump_target_is_out_of_range() {
    let mut vm = vm("1105,1,-7");
    assert_eq!(vm.step(), Err(VMError::OutOfRange { addr: -7 }));
}

#[test]
fn negative_instruction_word_is_illegal() {
    let mut vm = vm("-1");
    assert!(matches!(
        vm.step(),
        Err(VMError::IllegalInstruction { word: -1, pc: 0, .. })
    ));
}

// ==================== Tracing ====================

#[test]
fn tracing_does_not_change_results() {
    let config = VmConfig::new().with_id(3).with_trace(true);
    let mut traced = VM::with_config(program(QUINE), config);
    let (traced_out, _) = traced.run_with_inputs([]).unwrap();
    let (plain_out, plain) = run(QUINE, &[]);
    assert_eq!(traced_out, plain_out);
    assert_eq!(traced.program(), plain.program());
    assert_eq!(traced.config().id, 3);
}

#[test]
fn clones_run_independently() {
    let base = vm(ECHO_LOOP);
    let mut a = base.clone();
    let mut b = base.clone();
    assert_eq!(a.run_with_inputs([1]).unwrap().0, vec![1]);
    assert_eq!(b.run_with_inputs([2, 3]).unwrap().0, vec![2, 3]);
    assert_eq!(base.pc(), 0);
}
