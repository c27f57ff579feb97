//! Crate-level error type covering every failure kind the engine can raise.

/// Everything that can go wrong while registering a peripheral or executing
/// a Thumb instruction.
///
/// Out-of-region memory access is deliberately *not* a variant here: per the
/// MMU contract, reads from unmapped space return 0 and writes are discarded
/// silently, so there is nothing to propagate.
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error(
        "peripheral \"{new}\" [{new_start:#010x}, {new_end:#010x}] conflicts with \
         already-registered peripheral \"{existing}\" [{existing_start:#010x}, {existing_end:#010x}]"
    )]
    PeripheralConflict {
        new: String,
        new_start: u32,
        new_end: u32,
        existing: String,
        existing_start: u32,
        existing_end: u32,
    },

    #[error(
        "BX/BLX target {target:#010x} has its low bit clear, which would enter ARM state; \
         ARM (32-bit) state is not supported"
    )]
    UnsupportedModeTransition { target: u32 },

    #[error("unimplemented instruction {opcode:#06x} ({mnemonic}) at pc={pc:#010x}")]
    UnimplementedInstruction {
        opcode: u16,
        mnemonic: &'static str,
        pc: u32,
    },

    #[error("illegal/undecoded opcode {opcode:#06x} at pc={pc:#010x}")]
    IllegalOpcode { opcode: u16, pc: u32 },
}

pub type Result<T> = std::result::Result<T, EmulatorError>;
