//! Per-instruction builder context
//!
//! One context is created for every dispatched instruction. It carries the
//! decoded instruction, the enclosing function, the promotion state for
//! register-to-local rewriting, the CSR mode, and the active switch-table
//! binding, and provides the shared emission helpers the builders use.

use ox_core::config::{CodegenConfig, SwitchTable};

use crate::graph::{FunctionGraph, FunctionNode};
use crate::insn::{Instruction, EIEIO_WORD};

/// CSR (FPSCR non-IEEE mode) dataflow state within a function body.
/// Reset to Unknown at every label and after any call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsrState {
    #[default]
    Unknown,
    Fpu,
    Vmx,
}

/// Which architectural registers have been promoted to function-local
/// variables for the current translation unit, plus the per-GPR MMIO-base
/// dataflow flags.
#[derive(Debug, Clone)]
pub struct LocalVariables {
    pub r: [bool; 32],
    pub f: [bool; 32],
    pub v: [bool; 128],
    pub cr: [bool; 8],
    pub ctr: bool,
    pub xer: bool,
    pub reserved: bool,
    pub temp: bool,
    pub v_temp: bool,
    pub env: bool,
    pub ea: bool,
    mmio_base: [bool; 32],
}

impl Default for LocalVariables {
    fn default() -> Self {
        Self {
            r: [false; 32],
            f: [false; 32],
            v: [false; 128],
            cr: [false; 8],
            ctr: false,
            xer: false,
            reserved: false,
            temp: false,
            v_temp: false,
            env: false,
            ea: false,
            mmio_base: [false; 32],
        }
    }
}

impl LocalVariables {
    pub fn is_mmio_base(&self, reg: u32) -> bool {
        self.mmio_base[(reg & 31) as usize]
    }

    pub fn set_mmio_base(&mut self, reg: u32) {
        self.mmio_base[(reg & 31) as usize] = true;
    }

    pub fn clear_mmio_base(&mut self, reg: u32) {
        self.mmio_base[(reg & 31) as usize] = false;
    }
}

/// Ephemeral scratchpad shared by all builders; lifetime = one instruction.
pub struct BuilderContext<'a> {
    pub out: &'a mut String,
    pub insn: &'a Instruction,
    /// Guest address of the current instruction.
    pub base: u32,
    /// Raw words from the current instruction to the end of its block.
    pub data: &'a [u32],
    pub fn_node: &'a FunctionNode,
    pub graph: &'a FunctionGraph,
    pub config: &'a CodegenConfig,
    pub entry_point: u32,
    pub locals: &'a mut LocalVariables,
    pub csr_state: &'a mut CsrState,
    /// Switch table bound to this address, if any.
    pub switch_table: Option<&'a SwitchTable>,
    pub validation_failed: &'a mut bool,
}

impl BuilderContext<'_> {
    pub fn print(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
    }

    pub fn println(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    //=========================================================================
    // Register formatting (with promotion to locals)
    //=========================================================================

    pub fn r(&mut self, index: u32) -> String {
        let index = (index & 31) as usize;
        if (self.config.non_argument_registers_as_local_variables
            && matches!(index, 0 | 2 | 11 | 12))
            || (self.config.non_volatile_registers_as_local_variables && index >= 14)
        {
            self.locals.r[index] = true;
            format!("r{index}")
        } else {
            format!("ctx.r{index}")
        }
    }

    pub fn f(&mut self, index: u32) -> String {
        let index = (index & 31) as usize;
        if (self.config.non_argument_registers_as_local_variables && index == 0)
            || (self.config.non_volatile_registers_as_local_variables && index >= 14)
        {
            self.locals.f[index] = true;
            format!("f{index}")
        } else {
            format!("ctx.f{index}")
        }
    }

    pub fn v(&mut self, index: u32) -> String {
        let index = (index & 127) as usize;
        if (self.config.non_argument_registers_as_local_variables && (32..=63).contains(&index))
            || (self.config.non_volatile_registers_as_local_variables
                && ((14..=31).contains(&index) || (64..=127).contains(&index)))
        {
            self.locals.v[index] = true;
            format!("v{index}")
        } else {
            format!("ctx.v{index}")
        }
    }

    pub fn cr(&mut self, index: u32) -> String {
        let index = (index & 7) as usize;
        if self.config.cr_registers_as_local_variables {
            self.locals.cr[index] = true;
            format!("cr{index}")
        } else {
            format!("ctx.cr{index}")
        }
    }

    pub fn ctr(&mut self) -> &'static str {
        if self.config.ctr_as_local_variable {
            self.locals.ctr = true;
            "ctr"
        } else {
            "ctx.ctr"
        }
    }

    pub fn xer(&mut self) -> &'static str {
        if self.config.xer_as_local_variable {
            self.locals.xer = true;
            "xer"
        } else {
            "ctx.xer"
        }
    }

    pub fn reserved(&mut self) -> &'static str {
        if self.config.reserved_register_as_local_variable {
            self.locals.reserved = true;
            "reserved"
        } else {
            "ctx.reserved"
        }
    }

    pub fn temp(&mut self) -> &'static str {
        self.locals.temp = true;
        "temp"
    }

    pub fn v_temp(&mut self) -> &'static str {
        self.locals.v_temp = true;
        "vTemp"
    }

    pub fn env(&mut self) -> &'static str {
        self.locals.env = true;
        "env"
    }

    pub fn ea(&mut self) -> &'static str {
        self.locals.ea = true;
        "ea"
    }

    //=========================================================================
    // MMIO detection
    //=========================================================================

    /// True when the next instruction in the block is an `eieio` barrier.
    fn next_is_eieio(&self) -> bool {
        if self.base + 4 >= self.fn_node.end() {
            return false;
        }
        self.data.get(1).copied() == Some(EIEIO_WORD)
    }

    /// D-form store routing: operands are [rS, disp, rA].
    pub fn mmio_check_d_form(&self) -> bool {
        self.locals.is_mmio_base(self.insn.operands[2]) || self.next_is_eieio()
    }

    /// X-form store routing: operands are [rS, rA, rB].
    pub fn mmio_check_x_form(&self) -> bool {
        self.locals.is_mmio_base(self.insn.operands[1]) || self.next_is_eieio()
    }

    //=========================================================================
    // Shared emission helpers
    //=========================================================================

    /// D-form load: rD = MACRO([rA.u32 +] disp), written through `field`.
    pub fn emit_load_d_form(&mut self, load_macro: &str, field: &str) {
        let d = self.r(self.insn.operands[0]);
        self.print(format!("\t{d}.{field} = {load_macro}("));
        if self.insn.operands[2] != 0 {
            let a = self.r(self.insn.operands[2]);
            self.print(format!("{a}.u32 + "));
        }
        self.println(format!("{});", self.insn.operands[1] as i32));
    }

    /// X-form load: rD = MACRO([rA.u32 +] rB.u32), written through `field`.
    pub fn emit_load_x_form(&mut self, load_macro: &str, field: &str) {
        let d = self.r(self.insn.operands[0]);
        self.print(format!("\t{d}.{field} = {load_macro}("));
        if self.insn.operands[1] != 0 {
            let a = self.r(self.insn.operands[1]);
            self.print(format!("{a}.u32 + "));
        }
        let b = self.r(self.insn.operands[2]);
        self.println(format!("{b}.u32);"));
    }

    /// D-form store: MACRO([rA.u32 +] disp, rS.field), with MMIO routing.
    pub fn emit_store_d_form(&mut self, store_macro: &str, field: &str, mmio: bool) {
        let chosen = if mmio && self.mmio_check_d_form() {
            store_macro.replace("PPC_STORE", "PPC_MM_STORE")
        } else {
            store_macro.to_string()
        };
        self.print(format!("\t{chosen}("));
        if self.insn.operands[2] != 0 {
            let a = self.r(self.insn.operands[2]);
            self.print(format!("{a}.u32 + "));
        }
        let disp = self.insn.operands[1] as i32;
        let s = self.r(self.insn.operands[0]);
        self.println(format!("{disp}, {s}.{field});"));
    }

    /// X-form store: MACRO([rA.u32 +] rB.u32, rS.field), with MMIO routing.
    pub fn emit_store_x_form(&mut self, store_macro: &str, field: &str, mmio: bool) {
        let chosen = if mmio && self.mmio_check_x_form() {
            store_macro.replace("PPC_STORE", "PPC_MM_STORE")
        } else {
            store_macro.to_string()
        };
        self.print(format!("\t{chosen}("));
        if self.insn.operands[1] != 0 {
            let a = self.r(self.insn.operands[1]);
            self.print(format!("{a}.u32 + "));
        }
        let b = self.r(self.insn.operands[2]);
        let s = self.r(self.insn.operands[0]);
        self.println(format!("{b}.u32, {s}.{field});"));
    }

    /// Switch the CSR (flush-to-zero) mode if the dataflow state differs
    /// from the required one. Entering from Unknown uses the Unconditional
    /// variant.
    pub fn emit_set_flush_mode(&mut self, enable: bool) {
        let new_state = if enable { CsrState::Vmx } else { CsrState::Fpu };
        if *self.csr_state != new_state {
            let prefix = if enable { "enable" } else { "disable" };
            let suffix = if *self.csr_state == CsrState::Unknown {
                "Unconditional"
            } else {
                ""
            };
            self.println(format!("\tctx.fpscr.{prefix}FlushMode{suffix}();"));
            *self.csr_state = new_state;
        }
    }

    /// Host symbol name of a function node, honouring entry-point naming.
    pub fn function_symbol(&self, node: &FunctionNode) -> String {
        if node.base() == self.entry_point {
            "xstart".to_string()
        } else if !node.name().is_empty() {
            node.name().to_string()
        } else {
            format!("sub_{:08X}", node.base())
        }
    }

    /// Emit a direct host call to a guest address, lowering setjmp/longjmp
    /// thunks natively and suppressing register save/restore helpers when
    /// non-volatile registers live in locals.
    pub fn emit_function_call(&mut self, address: u32) {
        if address != 0 && address == self.config.long_jmp_address {
            // Native longjmp: use guest buffer directly
            let r3 = self.r(3);
            let r4 = self.r(4);
            self.println(format!(
                "\tlongjmp(*reinterpret_cast<jmp_buf*>(base + {r3}.u32), {r4}.s32);"
            ));
        } else if address != 0 && address == self.config.set_jmp_address {
            // Native setjmp: save ctx and use guest buffer directly.
            // Returns 0 on first call, non-zero when longjmp returns here.
            let env = self.env();
            self.println(format!("\t{env} = ctx;"));
            let temp = self.temp();
            let r3 = self.r(3);
            self.println(format!(
                "\t{temp}.s64 = setjmp(*reinterpret_cast<jmp_buf*>(base + {r3}.u32));"
            ));
            self.println(format!("\tif ({temp}.s64 != 0) ctx = {env};"));
            let r3 = self.r(3);
            self.println(format!("\t{r3} = {temp};"));
        } else if let Some(target) = self.graph.get(address) {
            let name = self.function_symbol(target);
            if self.config.non_volatile_registers_as_local_variables
                && (name.starts_with("__rest") || name.starts_with("__save"))
            {
                // Handled by local variable tracking.
            } else {
                self.println(format!("\t{name}(ctx, base);"));
            }
        } else {
            tracing::error!(
                target: "codegen",
                "Unresolved function 0x{:08X} from 0x{:08X}",
                address,
                self.base
            );
            self.println(format!("\t// ERROR: unresolved function 0x{address:08X}"));
            *self.validation_failed = true;
        }
    }

    /// Conditional branch on one CR bit, with a call-and-return fallback
    /// for targets outside the function bounds.
    pub fn emit_conditional_branch(&mut self, negate: bool, cond: &str) {
        let target = self.insn.operands[1];
        let cr = self.cr(self.insn.operands[0]);
        let neg = if negate { "!" } else { "" };
        if target < self.fn_node.base() || target >= self.fn_node.end() {
            self.println(format!("\tif ({neg}{cr}.{cond}) {{"));
            self.print("\t");
            self.emit_function_call(target);
            self.println("\t\treturn;");
            self.println("\t}");
        } else {
            self.println(format!("\tif ({neg}{cr}.{cond}) goto loc_{target:X};"));
        }
    }
}
