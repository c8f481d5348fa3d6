//! Shared enums used across the pipeline.

use serde::{Deserialize, Serialize};

/// Marker line placed in generated headers. The discovery stage uses it
/// to find companion CNX sources from a C/C++ entry point and to skip
/// generated headers during header symbol collection (breaking
/// migration-time include cycles).
pub const GENERATED_HEADER_MARKER: &str = "// Generated by C-Next Transpiler";

/// The language the job emits. Monotone per translation unit: once any
/// input requires C++, the whole job produces `.cpp`/`.hpp`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputLanguage {
    #[default]
    C,
    Cpp,
}

impl OutputLanguage {
    /// File extension for generated sources.
    pub const fn source_extension(self) -> &'static str {
        match self {
            OutputLanguage::C => "c",
            OutputLanguage::Cpp => "cpp",
        }
    }

    /// File extension for generated companion headers.
    pub const fn header_extension(self) -> &'static str {
        match self {
            OutputLanguage::C => "h",
            OutputLanguage::Cpp => "hpp",
        }
    }

    pub const fn is_cpp(self) -> bool {
        matches!(self, OutputLanguage::Cpp)
    }
}

/// Target chip for atomic/critical lowering.
///
/// Cortex-M3 and up have LDREX/STREX; everything else falls back to
/// PRIMASK masking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetChip {
    CortexM0,
    CortexM0Plus,
    CortexM3,
    CortexM4,
    CortexM7,
    Avr,
    #[default]
    Generic,
}

impl TargetChip {
    /// Parse a `--target` / config / `#pragma target` name.
    pub fn from_name(name: &str) -> Option<TargetChip> {
        match name.to_ascii_lowercase().as_str() {
            "cortex-m0" | "cortexm0" => Some(TargetChip::CortexM0),
            "cortex-m0plus" | "cortex-m0+" | "cortexm0plus" => Some(TargetChip::CortexM0Plus),
            "cortex-m3" | "cortexm3" => Some(TargetChip::CortexM3),
            "cortex-m4" | "cortexm4" => Some(TargetChip::CortexM4),
            "cortex-m7" | "cortexm7" => Some(TargetChip::CortexM7),
            "avr" => Some(TargetChip::Avr),
            "generic" => Some(TargetChip::Generic),
            _ => None,
        }
    }

    /// Infer a target from a PlatformIO board identifier.
    pub fn from_board(board: &str) -> Option<TargetChip> {
        let board = board.to_ascii_lowercase();
        if board.starts_with("teensy4") {
            Some(TargetChip::CortexM7)
        } else if board.starts_with("teensy3") {
            Some(TargetChip::CortexM4)
        } else if board.starts_with("teensylc") {
            Some(TargetChip::CortexM0Plus)
        } else if board.contains("stm32f1") || board.contains("bluepill") {
            Some(TargetChip::CortexM3)
        } else if board.contains("stm32f4") {
            Some(TargetChip::CortexM4)
        } else if board.starts_with("uno")
            || board.starts_with("mega")
            || board.starts_with("nano")
            || board.starts_with("atmega")
        {
            Some(TargetChip::Avr)
        } else {
            None
        }
    }

    /// Whether the chip supports LDREX/STREX exclusive access.
    pub const fn has_exclusives(self) -> bool {
        matches!(
            self,
            TargetChip::CortexM3 | TargetChip::CortexM4 | TargetChip::CortexM7
        )
    }

    /// Whether PRIMASK-style interrupt masking is available (any Cortex-M).
    pub const fn is_cortex_m(self) -> bool {
        !matches!(self, TargetChip::Avr)
    }
}

impl std::fmt::Display for TargetChip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TargetChip::CortexM0 => "cortex-m0",
            TargetChip::CortexM0Plus => "cortex-m0plus",
            TargetChip::CortexM3 => "cortex-m3",
            TargetChip::CortexM4 => "cortex-m4",
            TargetChip::CortexM7 => "cortex-m7",
            TargetChip::Avr => "avr",
            TargetChip::Generic => "generic",
        };
        write!(f, "{name}")
    }
}

/// Hardware access policy for register members.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

impl Access {
    pub const fn keyword(self) -> &'static str {
        match self {
            Access::ReadWrite => "rw",
            Access::ReadOnly => "ro",
            Access::WriteOnly => "wo",
        }
    }

    pub const fn readable(self) -> bool {
        !matches!(self, Access::WriteOnly)
    }

    pub const fn writable(self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_from_name() {
        assert_eq!(TargetChip::from_name("cortex-m7"), Some(TargetChip::CortexM7));
        assert_eq!(TargetChip::from_name("Cortex-M0+"), Some(TargetChip::CortexM0Plus));
        assert_eq!(TargetChip::from_name("riscv"), None);
    }

    #[test]
    fn target_exclusives() {
        assert!(TargetChip::CortexM3.has_exclusives());
        assert!(TargetChip::CortexM7.has_exclusives());
        assert!(!TargetChip::CortexM0.has_exclusives());
        assert!(!TargetChip::Avr.has_exclusives());
    }

    #[test]
    fn board_inference() {
        assert_eq!(TargetChip::from_board("teensy40"), Some(TargetChip::CortexM7));
        assert_eq!(TargetChip::from_board("uno"), Some(TargetChip::Avr));
        assert_eq!(TargetChip::from_board("esp32dev"), None);
    }

    #[test]
    fn output_extensions() {
        assert_eq!(OutputLanguage::C.source_extension(), "c");
        assert_eq!(OutputLanguage::Cpp.header_extension(), "hpp");
    }
}
