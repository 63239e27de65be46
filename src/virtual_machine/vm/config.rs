/// Environment variable that turns on instruction tracing in [`VmConfig::from_env`].
pub const TRACE_ENV: &str = "INTCODE_TRACE";

/// Per-machine configuration, passed in at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VmConfig {
    /// Identifier shown in traces and harness logs.
    pub id: usize,
    /// Log every executed instruction with its resolved operands.
    pub trace: bool,
}

impl VmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config whose trace flag comes from [`TRACE_ENV`].
    ///
    /// Unset or unparsable values leave tracing off.
    pub fn from_env() -> Self {
        let trace = std::env::var(TRACE_ENV)
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(false);
        Self { id: 0, trace }
    }

    pub fn with_id(mut self, id: usize) -> Self {
        self.id = id;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// Parses a boolean flag value (`1`, `t`, `true`, `yes`, `on` or `0`, `f`,
/// `false`, `no`, `off`, any case).
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
