//! Runtime-tunable VM knobs, in the spirit of the compiler's `CompilerConfig`:
//! a plain struct with a `Default` impl, overridable from the environment by
//! whatever embeds the VM (the `wisp-cli` binary, in this repo).

/// Default operand stack depth. 256 matches the fixed-size stack in
/// `original_source/vm.h` (`STACK_MAX`); unlike the C original this is a
/// `Vec` capacity hint, not a hard limit — see `Vm::push`.
pub const DEFAULT_STACK_MAX: usize = 256;

/// Environment variable read by `wisp-cli` to override `VmConfig::trace`.
/// Any non-empty value turns tracing on, matching the boolean-flag style of
/// the compiler's own env-var toggles.
pub const TRACE_ENV_VAR: &str = "WISP_TRACE";

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Initial operand-stack capacity.
    pub stack_max: usize,
    /// When true, the VM emits a `tracing::trace!` record of the opcode and
    /// stack contents before executing each instruction.
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_max: DEFAULT_STACK_MAX,
            trace: false,
        }
    }
}

impl VmConfig {
    /// Read `WISP_TRACE` from the environment, leaving everything else at
    /// its default.
    pub fn from_env() -> Self {
        let trace = std::env::var(TRACE_ENV_VAR).is_ok_and(|v| !v.is_empty());
        VmConfig {
            trace,
            ..Default::default()
        }
    }
}
