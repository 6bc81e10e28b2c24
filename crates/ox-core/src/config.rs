//! Project configuration
//!
//! A single TOML file drives a codegen run: output naming, register
//! promotion flags, manually described switch tables and mid-asm hooks.
//! Runtime tunables live in a separate `[runtime]` table consumed by the
//! kernel crate.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Log verbosity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// A manually configured `bctr` switch table.
#[derive(Debug, Clone, Deserialize)]
pub struct SwitchTable {
    /// Guest address of the `bctr` instruction.
    pub address: u32,
    /// GPR index holding the case selector.
    pub index_register: u32,
    /// Case target addresses, in case order.
    pub targets: Vec<u32>,
}

/// A host function injected before or after a specific guest instruction.
///
/// The registers listed in `registers` become reference parameters of the
/// emitted extern declaration, in order.
#[derive(Debug, Clone, Deserialize)]
pub struct MidAsmHook {
    pub address: u32,
    pub name: String,
    #[serde(default)]
    pub registers: Vec<String>,
    /// Unconditional return after the hook runs.
    #[serde(default)]
    pub ret: bool,
    #[serde(default)]
    pub return_on_true: bool,
    #[serde(default)]
    pub return_on_false: bool,
    /// Unconditional jump target after the hook runs (0 = none).
    #[serde(default)]
    pub jump_address: u32,
    #[serde(default)]
    pub jump_address_on_true: u32,
    #[serde(default)]
    pub jump_address_on_false: u32,
    /// Fire after the instruction instead of before it.
    #[serde(default)]
    pub after_instruction: bool,
}

impl MidAsmHook {
    /// Hooks with a boolean outcome are emitted as `extern bool`.
    pub fn returns_bool(&self) -> bool {
        self.return_on_true
            || self.return_on_false
            || self.jump_address_on_true != 0
            || self.jump_address_on_false != 0
    }
}

fn default_project_name() -> String {
    "ox".to_string()
}

/// Configuration consumed by the function emitter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    #[serde(rename = "project_name")]
    pub project_name: String,
    pub out_directory_path: String,

    /// Skip materialising LR on `bl`/`bctrl`.
    pub skip_lr: bool,
    pub skip_msr: bool,

    pub cr_registers_as_local_variables: bool,
    pub ctr_as_local_variable: bool,
    pub xer_as_local_variable: bool,
    pub reserved_register_as_local_variable: bool,
    pub non_argument_registers_as_local_variables: bool,
    pub non_volatile_registers_as_local_variables: bool,

    /// Emit SEH try/catch framing for functions with exception scopes.
    pub generate_exception_handlers: bool,

    /// Guest addresses of the CRT setjmp/longjmp thunks, lowered natively.
    pub set_jmp_address: u32,
    pub long_jmp_address: u32,

    #[serde(rename = "switch_table")]
    pub switch_tables_list: Vec<SwitchTable>,
    #[serde(rename = "mid_asm_hook")]
    pub mid_asm_hooks_list: Vec<MidAsmHook>,

    #[serde(skip)]
    pub switch_tables: HashMap<u32, SwitchTable>,
    #[serde(skip)]
    pub mid_asm_hooks: HashMap<u32, MidAsmHook>,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            out_directory_path: ".".to_string(),
            skip_lr: false,
            skip_msr: false,
            cr_registers_as_local_variables: false,
            ctr_as_local_variable: false,
            xer_as_local_variable: false,
            reserved_register_as_local_variable: false,
            non_argument_registers_as_local_variables: false,
            non_volatile_registers_as_local_variables: false,
            generate_exception_handlers: false,
            set_jmp_address: 0,
            long_jmp_address: 0,
            switch_tables_list: Vec::new(),
            mid_asm_hooks_list: Vec::new(),
            switch_tables: HashMap::new(),
            mid_asm_hooks: HashMap::new(),
        }
    }
}

impl CodegenConfig {
    /// Load from a TOML file and index the table/hook lists by address.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: CodegenConfig =
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.reindex();
        Ok(config)
    }

    /// Rebuild the by-address maps from the deserialized lists.
    pub fn reindex(&mut self) {
        self.switch_tables = self
            .switch_tables_list
            .iter()
            .cloned()
            .map(|t| (t.address, t))
            .collect();
        self.mid_asm_hooks = self
            .mid_asm_hooks_list
            .iter()
            .cloned()
            .map(|h| (h.address, h))
            .collect();
    }
}

/// Runtime tunables for the kernel and clock.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Ignore game-specified thread priorities.
    pub ignore_thread_priorities: bool,
    /// Ignore game-specified thread affinities.
    pub ignore_thread_affinities: bool,
    /// Disable guest clock scaling.
    pub clock_no_scaling: bool,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ignore_thread_priorities: true,
            ignore_thread_affinities: true,
            clock_no_scaling: false,
            log_level: LogLevel::Info,
            log_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodegenConfig::default();
        assert_eq!(config.project_name, "ox");
        assert!(!config.skip_lr);
        assert!(config.switch_tables.is_empty());
    }

    #[test]
    fn test_parse_and_reindex() {
        let text = r#"
            project_name = "halo"
            out_directory_path = "gen"
            skip_lr = true

            [[switch_table]]
            address = 0x8201_0000
            index_register = 11
            targets = [0x8201_0010, 0x8201_0020]

            [[mid_asm_hook]]
            address = 0x8201_0040
            name = "FrameHook"
            registers = ["r3", "f1"]
            return_on_true = true
        "#;
        let mut config: CodegenConfig = toml::from_str(text).unwrap();
        config.reindex();

        assert_eq!(config.project_name, "halo");
        assert!(config.skip_lr);
        let table = &config.switch_tables[&0x8201_0000];
        assert_eq!(table.index_register, 11);
        assert_eq!(table.targets.len(), 2);
        let hook = &config.mid_asm_hooks[&0x8201_0040];
        assert!(hook.returns_bool());
        assert_eq!(hook.registers, vec!["r3", "f1"]);
    }
}
