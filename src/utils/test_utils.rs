//! Test utilities: well-known IntCode programs and helpers.

#[cfg(test)]
pub mod utils {
    use crate::virtual_machine::isa::Word;
    use crate::virtual_machine::program::Program;
    use std::future::Future;
    use std::time::Duration;

    /// Emits a copy of itself.
    pub const QUINE: &str = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";

    /// Outputs a 16-digit number.
    pub const LARGE_PRODUCT: &str = "1102,34915192,34915192,7,4,7,99,0";

    /// Outputs the large number in its middle.
    pub const LARGE_LITERAL: &str = "104,1125899906842624,99";

    /// Reads one value and echoes it.
    pub const ECHO: &str = "3,0,4,0,99";

    /// Echoes every input until its input is closed.
    pub const ECHO_LOOP: &str = "3,100,4,100,1105,1,0";

    /// Outputs 1 if the input equals 8, else 0 (position mode).
    pub const EQUALS_EIGHT: &str = "3,9,8,9,10,9,4,9,99,-1,8";

    /// Outputs 999, 1000 or 1001 for an input below, equal to, or above 8.
    pub const COMPARE_EIGHT: &str = "3,21,1008,21,8,20,1005,20,22,107,8,21,20,1006,20,31,\
        1106,0,36,98,0,0,1002,21,125,20,4,20,1105,1,46,104,999,1105,1,46,1101,1000,1,20,4,20,\
        1105,1,46,98,99";

    /// Leaves 3500 in cell 0.
    pub const GRAVITY_ASSIST: &str = "1,9,10,3,2,3,11,0,99,30,40,50";

    /// Amplifier: output = 10 * signal + phase. Phases 4,3,2,1,0 give 43210.
    pub const AMPLIFIER: &str = "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0";

    /// Feedback amplifier. Phases 9,8,7,6,5 give 139629729.
    pub const FEEDBACK_AMPLIFIER: &str = "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,\
        4,27,1001,28,-1,28,1005,28,6,99,0,0,5";

    /// Network node: sends (255, 7, 42) once, then polls forever.
    pub const NAT_SPAMMER: &[Word] = &[3, 100, 104, 255, 104, 7, 104, 42, 3, 101, 1105, 1, 8];

    /// Network node: node 0 sends (1, 5, 9); every node forwards what it
    /// receives to address 255.
    pub const NAT_FORWARDER: &[Word] = &[
        3, 100, 1005, 100, 11, 104, 1, 104, 5, 104, 9, 3, 101, 1008, 101, -1, 102, 1005, 102, 11,
        3, 103, 104, 255, 4, 101, 4, 103, 1105, 1, 11,
    ];

    /// Network node: reads its address then polls forever without sending.
    pub const SILENT_NODE: &[Word] = &[3, 100, 3, 101, 1105, 1, 2];

    /// Network node: node 0 behaves like [`NAT_SPAMMER`], other nodes fault.
    pub const FAULTY_PEER: &[Word] = &[
        3, 100, 1005, 100, 16, 104, 255, 104, 7, 104, 42, 3, 101, 1105, 1, 11, 77,
    ];

    /// Network node: node 0 behaves like [`NAT_SPAMMER`], other nodes emit
    /// one word of a packet and fault.
    pub const PARTIAL_FAULT: &[Word] = &[
        3, 100, 1005, 100, 16, 104, 255, 104, 7, 104, 42, 3, 101, 1105, 1, 11, 104, 1, 77,
    ];

    /// Network node: node 0 behaves like [`NAT_SPAMMER`], other nodes emit
    /// one word of a packet and halt.
    pub const PARTIAL_HALT: &[Word] = &[
        3, 100, 1005, 100, 16, 104, 255, 104, 7, 104, 42, 3, 101, 1105, 1, 11, 104, 1, 99,
    ];

    /// Parses a fixture.
    pub fn program(text: &str) -> Program {
        Program::parse(text).unwrap()
    }

    /// Awaits `future`, failing the test if it takes longer than five seconds.
    pub async fn within<F: Future>(future: F) -> F::Output {
        tokio::time::timeout(Duration::from_secs(5), future)
            .await
            .expect("timed out")
    }
}
