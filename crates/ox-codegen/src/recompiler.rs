//! Per-function and per-project emission driver
//!
//! Walks discovered basic blocks, emits labels, invokes builders, promotes
//! registers to locals, frames the output with prologue/epilogue/SEH, and
//! batches the text into content-addressed translation units.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use sha1::{Digest, Sha1};
use thiserror::Error;

use ox_core::config::{CodegenConfig, MidAsmHook, SwitchTable};

use crate::binary::BinaryImage;
use crate::context::{BuilderContext, CsrState, LocalVariables};
use crate::dispatch::dispatch_instruction;
use crate::graph::{FunctionAuthority, FunctionGraph, FunctionNode};
use crate::insn::{
    b_displacement, bc_displacement, is_bl, ppc_op, Disassembler, Opcode, MTCTR_MASK,
    MTCTR_OPCODE, NOP_WORD, OP_B, OP_BC,
};

const FUNCTIONS_PER_OUTPUT_FILE: usize = 500;
const OUTPUT_BUFFER_RESERVE: usize = 32 * 1024 * 1024;

/// Errors surfaced by a codegen run
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("code generation blocked: validation errors detected (use --force to override)")]
    ValidationFailed,

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fallback jump-table detection invoked when a `bctr` arrives without a
/// binding from analysis. Supplied by the external analyzer.
pub trait JumpTableSweep {
    fn detect_jump_table(&self, image: &BinaryImage, bctr_addr: u32) -> Option<SwitchTable>;
}

/// The per-project emission driver.
pub struct Recompiler {
    pub config: CodegenConfig,
    pub graph: FunctionGraph,
    pub image: BinaryImage,
    pub entry_point: u32,
    disasm: Box<dyn Disassembler>,
    sweep: Option<Box<dyn JumpTableSweep>>,
    out: String,
    pending_writes: Vec<(String, String)>,
    cpp_file_index: usize,
    validation_failed: bool,
    /// Config switch tables plus anything late-detected at emission time.
    switch_tables: HashMap<u32, SwitchTable>,
}

impl Recompiler {
    pub fn new(
        config: CodegenConfig,
        graph: FunctionGraph,
        image: BinaryImage,
        entry_point: u32,
        disasm: Box<dyn Disassembler>,
    ) -> Self {
        let switch_tables = config.switch_tables.clone();
        Self {
            config,
            graph,
            image,
            entry_point,
            disasm,
            sweep: None,
            out: String::new(),
            pending_writes: Vec::new(),
            cpp_file_index: 0,
            validation_failed: false,
            switch_tables,
        }
    }

    pub fn set_jump_table_sweep(&mut self, sweep: Box<dyn JumpTableSweep>) {
        self.sweep = Some(sweep);
    }

    pub fn set_validation_failed(&mut self) {
        self.validation_failed = true;
    }

    pub fn validation_failed(&self) -> bool {
        self.validation_failed
    }

    /// Emitted text accumulated so far (primarily for tests).
    pub fn out(&self) -> &str {
        &self.out
    }

    fn print(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
    }

    fn println(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn function_name(&self, fn_node: &FunctionNode) -> String {
        if fn_node.base() == self.entry_point {
            // Entry point is always named xstart
            "xstart".to_string()
        } else if !fn_node.name().is_empty() {
            fn_node.name().to_string()
        } else {
            format!("sub_{:08X}", fn_node.base())
        }
    }

    //=========================================================================
    // Per-function emission
    //=========================================================================

    /// Recompile one function into the output buffer. Returns false when
    /// any instruction failed to translate.
    pub fn recompile_function(&mut self, fn_node: &FunctionNode) -> bool {
        if fn_node.blocks().is_empty() {
            // Stub for functions with no blocks (e.g. exception handler data)
            tracing::warn!(
                target: "codegen",
                "Function 0x{:08X} has no blocks - generating stub",
                fn_node.base()
            );
            let name = self.function_name(fn_node);
            self.println(format!(
                "// STUB: Function at 0x{:08X} has no discovered code blocks",
                fn_node.base()
            ));
            self.println(format!(
                "__attribute__((alias(\"__imp__{name}\"))) PPC_WEAK_FUNC({name});"
            ));
            self.println(format!("PPC_FUNC_IMPL(__imp__{name}) {{"));
            self.println("\tPPC_FUNC_PROLOGUE();");
            self.println("}\n");
            return true;
        }

        let seh_info = fn_node.seh_info().cloned();
        if let Some(info) = &seh_info {
            if !info.scopes.is_empty() {
                tracing::trace!(
                    target: "codegen",
                    "Function 0x{:08X} has {} SEH scopes",
                    fn_node.base(),
                    info.scopes.len()
                );
            }
        }

        // First pass: collect labels from all blocks
        let mut labels: BTreeSet<u32> = BTreeSet::new();
        for block in fn_node.blocks() {
            let mut addr = block.base;
            while addr < block.end() {
                if let Some(word) = self.image.read_word(addr) {
                    if !is_bl(word) {
                        let op = ppc_op(word);
                        if op == OP_B {
                            labels.insert(addr.wrapping_add(b_displacement(word) as u32));
                        } else if op == OP_BC {
                            labels.insert(addr.wrapping_add(bc_displacement(word) as u32));
                        }
                    }
                }

                if let Some(table) = self.switch_tables.get(&addr) {
                    labels.extend(table.targets.iter().copied());
                }

                if let Some(hook) = self.config.mid_asm_hooks.get(&addr).cloned() {
                    self.emit_hook_extern(&hook);
                    if hook.jump_address != 0 {
                        labels.insert(hook.jump_address);
                    }
                    if hook.jump_address_on_true != 0 {
                        labels.insert(hook.jump_address_on_true);
                    }
                    if hook.jump_address_on_false != 0 {
                        labels.insert(hook.jump_address_on_false);
                    }
                }

                addr += 4;
            }
        }

        // Labels from auto-detected jump tables
        for table in fn_node.jump_tables() {
            labels.extend(table.targets.iter().copied());
        }

        let name = self.function_name(fn_node);

        // Weak/alias pattern - allows functions to be overridden at link
        // time: overriding the weak symbol takes precedence over __imp__.
        self.println(format!(
            "__attribute__((alias(\"__imp__{name}\"))) PPC_WEAK_FUNC({name});"
        ));
        self.println(format!("PPC_FUNC_IMPL(__imp__{name}) {{"));
        self.println("\tPPC_FUNC_PROLOGUE();");

        let mut all_recompiled = true;
        let mut csr_state = CsrState::Unknown;
        let mut locals = LocalVariables::default();
        let mut emitted_labels: BTreeSet<u32> = BTreeSet::new();

        // Body goes to a fresh buffer so local declarations can be placed
        // ahead of it once the builders have flagged what they promote.
        let saved = std::mem::take(&mut self.out);

        for block in fn_node.blocks() {
            let words: Vec<u32> = match self.image.translate(block.base) {
                Some(_) => (0..block.size / 4)
                    .map_while(|i| self.image.read_word(block.base + i * 4))
                    .collect(),
                None => {
                    tracing::warn!(
                        target: "codegen",
                        "Block 0x{:08X} in function 0x{:08X} has no mapped data - skipping",
                        block.base,
                        fn_node.base()
                    );
                    continue;
                }
            };

            for (idx, &word) in words.iter().enumerate() {
                let addr = block.base + idx as u32 * 4;

                // Only emit each label once
                if labels.contains(&addr) && emitted_labels.insert(addr) {
                    self.println(format!("loc_{addr:X}:"));
                    // Anyone could jump here, so the CSR state is unknown.
                    csr_state = CsrState::Unknown;
                }

                let Some(mut insn) = self.disasm.disassemble(word, addr) else {
                    self.println(format!("\t// 0x{word:08X}"));
                    // Undecoded non-zero words are likely unimplemented opcodes
                    if word != 0 {
                        tracing::warn!(
                            target: "codegen",
                            "Unable to decode instruction {:X} at {:X}",
                            word,
                            addr
                        );
                    }
                    continue;
                };

                // Late jump-table sweep: a bctr with no binding from
                // analysis, preceded by mtctr separated only by nops.
                if insn.opcode == Opcode::Bctr
                    && !self.switch_tables.contains_key(&addr)
                    && !fn_node.jump_tables().iter().any(|t| t.address == addr)
                    && self.sweep.is_some()
                {
                    let mut is_switch_pattern = false;
                    for back in 1..=3usize {
                        if idx < back {
                            break;
                        }
                        let prev = words[idx - back];
                        if prev & MTCTR_MASK == MTCTR_OPCODE {
                            is_switch_pattern =
                                (1..back).all(|j| words[idx - j] == NOP_WORD);
                            break;
                        } else if prev != NOP_WORD {
                            break;
                        }
                    }

                    if is_switch_pattern {
                        let detected = self
                            .sweep
                            .as_ref()
                            .and_then(|s| s.detect_jump_table(&self.image, addr));
                        if let Some(mut table) = detected {
                            table.address = addr;
                            labels.extend(table.targets.iter().copied());
                            tracing::info!(
                                target: "codegen",
                                "Late-detected jump table at 0x{:08X} with {} entries",
                                addr,
                                table.targets.len()
                            );
                            self.switch_tables.insert(addr, table);
                        }
                    }
                }

                // A couple of VMX-128 unpacks disassemble to the byte form
                // with a halfword shift operand; re-alias them.
                if insn.opcode == Opcode::Vupkhsb128 && insn.operands[2] == 0x60 {
                    insn.opcode = Opcode::Vupkhsh128;
                } else if insn.opcode == Opcode::Vupklsb128 && insn.operands[2] == 0x60 {
                    insn.opcode = Opcode::Vupklsh128;
                }

                self.println(format!("\t// {} {}", insn.name, insn.op_str));

                let hook = self.config.mid_asm_hooks.get(&addr).cloned();
                let table = self.switch_tables.get(&addr);
                let mut ctx = BuilderContext {
                    out: &mut self.out,
                    insn: &insn,
                    base: addr,
                    data: &words[idx..],
                    fn_node,
                    graph: &self.graph,
                    config: &self.config,
                    entry_point: self.entry_point,
                    locals: &mut locals,
                    csr_state: &mut csr_state,
                    switch_table: table,
                    validation_failed: &mut self.validation_failed,
                };

                if let Some(hook) = hook.as_ref().filter(|h| !h.after_instruction) {
                    emit_mid_asm_hook(&mut ctx, hook);
                }

                if !dispatch_instruction(insn.opcode, &mut ctx) {
                    // Trap stub so generated tests fail at runtime instead
                    // of silently missing the translation.
                    tracing::warn!(
                        target: "codegen",
                        "Unimplemented: {} at 0x{:08X}",
                        insn.name,
                        addr
                    );
                    ctx.println(format!("\t// UNIMPLEMENTED: {}", insn.name));
                    ctx.println(format!(
                        "\tPPC_UNIMPLEMENTED(0x{addr:X}, \"{}\");",
                        insn.name
                    ));
                    all_recompiled = false;
                }

                if let Some(hook) = hook.as_ref().filter(|h| h.after_instruction) {
                    emit_mid_asm_hook(&mut ctx, hook);
                }

                // Record-form instructions must have produced a CR update
                // (mulhd./mulhdu. are documented out of this rule).
                if insn.name.contains('.') && !insn.name.starts_with("mulhd") {
                    let trimmed = &self.out[..self.out.len().saturating_sub(1)];
                    let last_line = match trimmed.rfind('\n') {
                        Some(pos) => &self.out[pos + 1..],
                        None => &self.out[..],
                    };
                    if !last_line.contains("cr0") && !last_line.contains("cr6") {
                        tracing::warn!(
                            target: "codegen",
                            "{} at {:X} has RC bit enabled but no comparison was generated",
                            insn.name,
                            addr
                        );
                    }
                }
            }
        }

        // Close the function body (or SEH try block)
        let generate_seh = seh_info
            .as_ref()
            .map(|info| !info.scopes.is_empty() && self.config.generate_exception_handlers)
            .unwrap_or(false);
        if generate_seh {
            let info = seh_info.as_ref().unwrap();
            self.println("\t\t} SEH_CATCH_ALL {");
            self.println(format!(
                "\t\t\tREXLOG_WARN(\"SEH exception caught in sub_{:08X}\");",
                fn_node.base()
            ));

            // The finally handler computes its frame from the establisher
            // frame pointer.
            if info.frame_size > 0 {
                self.println(format!(
                    "\t\t\tctx.r12.s64 = ctx.r31.s64 + {};  // Establisher frame pointer",
                    info.frame_size
                ));
            }

            // Run finally handlers in reverse order
            for scope in info.scopes.iter().rev() {
                if scope.filter == 0 && scope.handler != 0 {
                    self.println(format!(
                        "\t\t\tsub_{:08X}(ctx, base);  // __finally handler",
                        scope.handler
                    ));
                }
            }

            // Restore caller registers before propagating
            if info.restore_helper != 0 {
                if let Some(restore) = self.graph.get(info.restore_helper) {
                    if !restore.name().is_empty() {
                        let restore_name = restore.name().to_string();
                        self.println(format!(
                            "\t\t\t{restore_name}(ctx, base);  // Restore caller registers"
                        ));
                    }
                }
            }

            self.println("\t\t\tSEH_RETHROW;");
            self.println("\t\t} SEH_END");
            self.println("\t}\n");
        } else {
            self.println("}\n");
        }

        // Swap back and write the promoted-local declarations ahead of the
        // captured body.
        let body = std::mem::replace(&mut self.out, saved);

        if locals.ctr {
            self.println("\tPPCRegister ctr{};");
        }
        if locals.xer {
            self.println("\tPPCXERRegister xer{};");
        }
        if locals.reserved {
            self.println("\tPPCRegister reserved{};");
        }
        for i in 0..8 {
            if locals.cr[i] {
                self.println(format!("\tPPCCRRegister cr{i}{{}};"));
            }
        }
        for i in 0..32 {
            if locals.r[i] {
                self.println(format!("\tPPCRegister r{i}{{}};"));
            }
        }
        for i in 0..32 {
            if locals.f[i] {
                self.println(format!("\tPPCRegister f{i}{{}};"));
            }
        }
        for i in 0..128 {
            if locals.v[i] {
                self.println(format!("\tPPCVRegister v{i}{{}};"));
            }
        }
        if locals.env {
            self.println("\tPPCContext env{};");
        }
        if locals.temp {
            self.println("\tPPCRegister temp{};");
        }
        if locals.v_temp {
            self.println("\tPPCVRegister vTemp{};");
        }
        if locals.ea {
            self.println("\tuint32_t ea{};");
        }

        if generate_seh {
            self.println("\tSEH_TRY {");
            // Indent body content one extra level inside the try block.
            let mut indented = String::with_capacity(body.len() + body.len() / 20);
            let mut chars = body.chars().peekable();
            while let Some(c) = chars.next() {
                indented.push(c);
                if c == '\n' && chars.peek() == Some(&'\t') {
                    indented.push('\t');
                }
            }
            self.out.push_str(&indented);
        } else {
            self.out.push_str(&body);
        }

        all_recompiled
    }

    /// Emit the extern declaration for a mid-asm hook with a parameter list
    /// derived from its declared register dependencies.
    fn emit_hook_extern(&mut self, hook: &MidAsmHook) {
        if hook.returns_bool() {
            self.print("extern bool ");
        } else {
            self.print("extern void ");
        }
        self.print(format!("{}(", hook.name));
        let mut first = true;
        for reg in &hook.registers {
            if !first {
                self.print(", ");
            }
            first = false;
            let param = match reg.chars().next() {
                Some('c') if reg == "ctr" => "PPCRegister& ctr".to_string(),
                Some('c') => format!("PPCCRRegister& {reg}"),
                Some('x') => "PPCXERRegister& xer".to_string(),
                Some('r') if reg == "reserved" => "PPCRegister& reserved".to_string(),
                Some('r') => format!("PPCRegister& {reg}"),
                Some('f') if reg == "fpscr" => "PPCFPSCRRegister& fpscr".to_string(),
                Some('f') => format!("PPCRegister& {reg}"),
                Some('v') => format!("PPCVRegister& {reg}"),
                _ => continue,
            };
            self.print(param);
        }
        self.println(");\n");
    }

    //=========================================================================
    // Project-level emission
    //=========================================================================

    /// Recompile every local function and emit the project support files.
    pub fn recompile_all(&mut self, force: bool) -> Result<(), CodegenError> {
        // Block code generation if validation failed (unless --force)
        if self.validation_failed && !force {
            return Err(CodegenError::ValidationFailed);
        }

        tracing::trace!(target: "codegen", "Recompile: starting");
        self.out.reserve(OUTPUT_BUFFER_RESERVE);

        let project_name = self.config.project_name.clone();
        let functions: Vec<FunctionNode> = self.graph.functions().cloned().collect();

        tracing::trace!(target: "codegen", "Recompile: generating {}_config.h", project_name);
        {
            self.println("#pragma once");
            self.println("#ifndef PPC_CONFIG_H_INCLUDED");
            self.println("#define PPC_CONFIG_H_INCLUDED\n");

            if self.config.skip_lr {
                self.println("#define PPC_CONFIG_SKIP_LR");
            }
            if self.config.ctr_as_local_variable {
                self.println("#define PPC_CONFIG_CTR_AS_LOCAL");
            }
            if self.config.xer_as_local_variable {
                self.println("#define PPC_CONFIG_XER_AS_LOCAL");
            }
            if self.config.reserved_register_as_local_variable {
                self.println("#define PPC_CONFIG_RESERVED_AS_LOCAL");
            }
            if self.config.skip_msr {
                self.println("#define PPC_CONFIG_SKIP_MSR");
            }
            if self.config.cr_registers_as_local_variables {
                self.println("#define PPC_CONFIG_CR_AS_LOCAL");
            }
            if self.config.non_argument_registers_as_local_variables {
                self.println("#define PPC_CONFIG_NON_ARGUMENT_AS_LOCAL");
            }
            if self.config.non_volatile_registers_as_local_variables {
                self.println("#define PPC_CONFIG_NON_VOLATILE_AS_LOCAL");
            }
            self.println("");

            self.println(format!(
                "#define PPC_IMAGE_BASE 0x{:X}ull",
                self.image.base_address
            ));
            self.println(format!(
                "#define PPC_IMAGE_SIZE 0x{:X}ull",
                self.image.image_size()
            ));

            let (code_min, code_max) = self.image.code_bounds();
            self.println(format!("#define PPC_CODE_BASE 0x{code_min:X}ull"));
            self.println(format!("#define PPC_CODE_SIZE 0x{:X}ull", code_max - code_min));
            self.println("");
            self.println("\n#endif");

            self.save_current_out(Some(&format!("{project_name}_config.h")));
        }

        tracing::trace!(target: "codegen", "Recompile: generating {}_init.h", project_name);
        {
            self.println("#pragma once\n");
            self.println(format!("#include \"{project_name}_config.h\""));
            self.println("#include <rex/runtime/guest.h>");
            self.println("#include <rex/logging.h>  // For REX_FATAL on unresolved calls");
            self.println("\nusing namespace rex::runtime::guest;\n");

            for fn_node in &functions {
                if fn_node.authority() == FunctionAuthority::Import {
                    continue;
                }
                let func_name = self.function_name(fn_node);
                self.println(format!("PPC_EXTERN_IMPORT({func_name});"));
            }

            self.println("\n// Import function declarations");
            for fn_node in &functions {
                if fn_node.authority() != FunctionAuthority::Import {
                    continue;
                }
                self.println(format!("PPC_EXTERN_IMPORT({});", fn_node.name()));
            }

            self.println("\n// Function mapping table - iterate to register functions with processor");
            self.save_current_out(Some(&format!("{project_name}_init.h")));
        }

        tracing::trace!(
            target: "codegen",
            "Recompile: generating {}_init.cpp (function mapping table)",
            project_name
        );
        {
            self.println("//=============================================================================");
            self.println(format!(
                "// Generated - {project_name} Function Mapping Table"
            ));
            self.println("//=============================================================================\n");
            self.println(format!("#include \"{project_name}_init.h\"\n"));

            let (code_min, _) = self.image.code_bounds();

            self.println("PPCFuncMapping PPCFuncMappings[] = {");
            for fn_node in &functions {
                if fn_node.authority() == FunctionAuthority::Import {
                    continue;
                }
                if fn_node.base() < code_min {
                    continue;
                }
                let func_name = self.function_name(fn_node);
                self.println(format!("\t{{ 0x{:X}, {func_name} }},", fn_node.base()));
            }

            // Import thunks join the table for indirect call support
            for fn_node in &functions {
                if fn_node.authority() != FunctionAuthority::Import {
                    continue;
                }
                self.println(format!(
                    "\t{{ 0x{:X}, {} }},",
                    fn_node.base(),
                    fn_node.name()
                ));
            }

            self.println("\t{ 0, nullptr }");
            self.println("};");
            self.save_current_out(Some(&format!("{project_name}_init.cpp")));
        }

        let locals: Vec<&FunctionNode> = functions
            .iter()
            .filter(|f| f.authority() != FunctionAuthority::Import)
            .collect();

        tracing::info!(target: "codegen", "Recompiling {} functions...", locals.len());
        for (i, fn_node) in locals.iter().copied().enumerate() {
            if i % FUNCTIONS_PER_OUTPUT_FILE == 0 {
                self.save_current_out(None);
                self.println(format!("#include \"{project_name}_init.h\"\n"));
            }
            self.recompile_function(fn_node);
        }

        self.save_current_out(None);
        tracing::info!(target: "codegen", "Recompilation complete.");

        // sources.cmake for inclusion by parent projects; the parent owns
        // library creation.
        tracing::trace!(target: "codegen", "Recompile: generating sources.cmake");
        {
            self.println("# Auto-generated - DO NOT EDIT");
            self.println("#");
            self.println("# IMPORTANT: For SEH (Structured Exception Handling) support on Windows,");
            self.println("# add /EHa to your compile options:");
            self.println("#   target_compile_options(your_target PRIVATE $<$<CXX_COMPILER_ID:MSVC>:/EHa>)");
            self.println("#");
            self.println("set(GENERATED_SOURCES");
            self.println(format!(
                "    ${{CMAKE_CURRENT_LIST_DIR}}/{project_name}_init.cpp"
            ));
            for i in 0..self.cpp_file_index {
                self.println(format!(
                    "    ${{CMAKE_CURRENT_LIST_DIR}}/{project_name}_recomp.{i}.cpp"
                ));
            }
            self.println(")");
            self.save_current_out(Some("sources.cmake"));
        }

        self.flush_pending_writes()
    }

    /// Queue the current output buffer under a filename; unnamed saves are
    /// numbered `<project>_recomp.<k>.cpp` translation units.
    pub fn save_current_out(&mut self, name: Option<&str>) {
        if self.out.is_empty() {
            return;
        }
        let filename = match name {
            Some(name) => name.to_string(),
            None => {
                let filename =
                    format!("{}_recomp.{}.cpp", self.config.project_name, self.cpp_file_index);
                self.cpp_file_index += 1;
                filename
            }
        };
        let content = std::mem::take(&mut self.out);
        self.pending_writes.push((filename, content));
    }

    /// Write all buffered files, skipping any whose on-disk content hashes
    /// identically. Keeps incremental rebuilds stable.
    pub fn flush_pending_writes(&mut self) -> Result<(), CodegenError> {
        let out_dir = PathBuf::from(&self.config.out_directory_path);
        std::fs::create_dir_all(&out_dir).map_err(|source| CodegenError::Io {
            path: out_dir.display().to_string(),
            source,
        })?;

        for (filename, content) in self.pending_writes.drain(..) {
            let path = out_dir.join(&filename);
            tracing::trace!(target: "codegen", "flush_pending_writes: {}", path.display());

            let mut should_write = true;
            if let Ok(existing) = std::fs::read(&path) {
                if existing.len() == content.len() {
                    let existing_digest = Sha1::digest(&existing);
                    let pending_digest = Sha1::digest(content.as_bytes());
                    should_write = existing_digest != pending_digest;
                }
            }

            if should_write {
                std::fs::write(&path, content.as_bytes()).map_err(|source| CodegenError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                tracing::trace!(target: "codegen", "Wrote {}", path.display());
            }
        }
        Ok(())
    }
}

/// Emit a mid-asm hook invocation, including its branch-on-result forms.
fn emit_mid_asm_hook(ctx: &mut BuilderContext, hook: &MidAsmHook) {
    let returns_bool = hook.returns_bool();

    ctx.print("\t");
    if returns_bool {
        ctx.print("if (");
    }
    ctx.print(format!("{}(", hook.name));
    let mut first = true;
    for reg in &hook.registers {
        if !first {
            ctx.print(", ");
        }
        first = false;
        let expr = match reg.chars().next() {
            Some('c') if reg == "ctr" => ctx.ctr().to_string(),
            Some('c') => {
                let index: u32 = reg[2..].parse().unwrap_or(0);
                ctx.cr(index)
            }
            Some('x') => ctx.xer().to_string(),
            Some('r') if reg == "reserved" => ctx.reserved().to_string(),
            Some('r') => {
                let index: u32 = reg[1..].parse().unwrap_or(0);
                ctx.r(index)
            }
            Some('f') if reg == "fpscr" => "ctx.fpscr".to_string(),
            Some('f') => {
                let index: u32 = reg[1..].parse().unwrap_or(0);
                ctx.f(index)
            }
            Some('v') => {
                let index: u32 = reg[1..].parse().unwrap_or(0);
                ctx.v(index)
            }
            _ => continue,
        };
        ctx.print(expr);
    }

    if returns_bool {
        ctx.println(")) {");
        if hook.return_on_true {
            ctx.println("\t\treturn;");
        } else if hook.jump_address_on_true != 0 {
            ctx.println(format!("\t\tgoto loc_{:X};", hook.jump_address_on_true));
        }
        ctx.println("\t}");
        ctx.println("\telse {");
        if hook.return_on_false {
            ctx.println("\t\treturn;");
        } else if hook.jump_address_on_false != 0 {
            ctx.println(format!("\t\tgoto loc_{:X};", hook.jump_address_on_false));
        }
        ctx.println("\t}");
    } else {
        ctx.println(");");
        if hook.ret {
            ctx.println("\treturn;");
        } else if hook.jump_address != 0 {
            ctx.println(format!("\tgoto loc_{:X};", hook.jump_address));
        }
    }
}
