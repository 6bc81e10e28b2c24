//! End-to-end emission scenarios for the instruction builders and the
//! function emitter.

use ox_codegen::builders::helpers::compute_mask;
use ox_codegen::dispatch::dispatch_instruction;
use ox_codegen::{
    BinaryImage, BuilderContext, CsrState, Disassembler, FunctionGraph, FunctionNode, Instruction,
    LocalVariables, Opcode, Recompiler, Section,
};
use ox_core::config::{CodegenConfig, SwitchTable};

struct Harness {
    out: String,
    fn_node: FunctionNode,
    graph: FunctionGraph,
    config: CodegenConfig,
    locals: LocalVariables,
    csr_state: CsrState,
    validation_failed: bool,
    switch_table: Option<SwitchTable>,
    data: Vec<u32>,
}

impl Harness {
    fn new() -> Self {
        let fn_node = FunctionNode::new(0x8200_0000, 0x100).with_blocks(vec![
            ox_codegen::graph::Block {
                base: 0x8200_0000,
                size: 0x100,
            },
        ]);
        Self {
            out: String::new(),
            fn_node,
            graph: FunctionGraph::new(),
            config: CodegenConfig::default(),
            locals: LocalVariables::default(),
            csr_state: CsrState::Unknown,
            validation_failed: false,
            switch_table: None,
            data: vec![0],
        }
    }

    fn emit(&mut self, insn: &Instruction) -> String {
        let start = self.out.len();
        let mut ctx = BuilderContext {
            out: &mut self.out,
            insn,
            base: 0x8200_0010,
            data: &self.data,
            fn_node: &self.fn_node,
            graph: &self.graph,
            config: &self.config,
            entry_point: 0,
            locals: &mut self.locals,
            csr_state: &mut self.csr_state,
            switch_table: self.switch_table.as_ref(),
            validation_failed: &mut self.validation_failed,
        };
        assert!(dispatch_instruction(insn.opcode, &mut ctx));
        self.out[start..].to_string()
    }
}

#[test]
fn test_li_emits_signed_assignment() {
    let mut harness = Harness::new();
    let insn = Instruction::new(Opcode::Li, [3, -1i32 as u32, 0, 0, 0]);
    let text = harness.emit(&insn);
    assert_eq!(text, "\tctx.r3.s64 = -1;\n");
}

#[test]
fn test_lis_marks_mmio_base_and_stw_routes_through_mm() {
    let mut harness = Harness::new();

    let lis = Instruction::new(Opcode::Lis, [4, 0x7FC8, 0, 0, 0]);
    let text = harness.emit(&lis);
    assert_eq!(text, format!("\tctx.r4.s64 = {};\n", 0x7FC8_0000u32 as i32));
    assert!(harness.locals.is_mmio_base(4));

    // stw r5, 0(r4) must use the MMIO store variant
    let stw = Instruction::new(Opcode::Stw, [5, 0, 4, 0, 0]);
    let text = harness.emit(&stw);
    assert_eq!(text, "\tPPC_MM_STORE_U32(ctx.r4.u32 + 0, ctx.r5.u32);\n");
}

#[test]
fn test_lis_non_mmio_base_uses_plain_store() {
    let mut harness = Harness::new();
    harness.emit(&Instruction::new(Opcode::Lis, [4, 0x1000, 0, 0, 0]));
    assert!(!harness.locals.is_mmio_base(4));
    let text = harness.emit(&Instruction::new(Opcode::Stw, [5, 8, 4, 0, 0]));
    assert_eq!(text, "\tPPC_STORE_U32(ctx.r4.u32 + 8, ctx.r5.u32);\n");
}

#[test]
fn test_mmio_flag_survives_ori_but_not_xori() {
    let mut harness = Harness::new();
    harness.emit(&Instruction::new(Opcode::Lis, [4, 0x7FEA, 0, 0, 0]));
    assert!(harness.locals.is_mmio_base(4));

    harness.emit(&Instruction::new(Opcode::Ori, [6, 4, 0x10, 0, 0]));
    assert!(harness.locals.is_mmio_base(6));

    harness.emit(&Instruction::new(Opcode::Xori, [6, 4, 0x10, 0, 0]));
    assert!(!harness.locals.is_mmio_base(6));
}

#[test]
fn test_cmpwi_emits_signed_compare() {
    let mut harness = Harness::new();
    let insn = Instruction::new(Opcode::Cmpwi, [0, 3, 5, 0, 0]);
    let text = harness.emit(&insn);
    assert_eq!(
        text,
        "\tctx.cr0.compare<int32_t>(ctx.r3.s32, 5, ctx.xer);\n"
    );
}

#[test]
fn test_rlwinm_mask_and_semantics() {
    let mut harness = Harness::new();
    // rlwinm r3, r4, 8, 16, 23
    let insn = Instruction::new(Opcode::Rlwinm, [3, 4, 8, 16, 23]);
    let text = harness.emit(&insn);

    let mask = compute_mask(16 + 32, 23 + 32);
    assert_eq!(mask, 0xFF00);
    assert!(text.contains("__builtin_rotateleft64"));
    assert!(text.contains(&format!("0x{mask:X}")));

    // The emitted expression computes rotl32 masked by the word mask.
    let rotated = 0xAABBCCDDu32.rotate_left(8) as u64;
    assert_eq!(rotated & mask, 0xDD00);
}

#[test]
fn test_record_form_add_compares_cr0() {
    let mut harness = Harness::new();
    let insn = Instruction::new(Opcode::Add, [3, 4, 5, 0, 0]).with_name("add.");
    let text = harness.emit(&insn);
    assert!(text.contains("ctx.r3.u64 = ctx.r4.u64 + ctx.r5.u64;"));
    assert!(text.contains("ctx.cr0.compare<int32_t>(ctx.r3.s32, 0, ctx.xer);"));
}

#[test]
fn test_plain_add_does_not_compare() {
    let mut harness = Harness::new();
    let insn = Instruction::new(Opcode::Add, [3, 4, 5, 0, 0]);
    let text = harness.emit(&insn);
    assert!(!text.contains("compare"));
}

#[test]
fn test_stwcx_sets_cr0_from_cas() {
    let mut harness = Harness::new();
    let insn = Instruction::new(Opcode::Stwcx, [5, 0, 6, 0, 0]);
    let text = harness.emit(&insn);
    assert!(text.contains("ctx.cr0.lt = 0;"));
    assert!(text.contains("ctx.cr0.gt = 0;"));
    assert!(text.contains("__sync_bool_compare_and_swap"));
    assert!(text.contains("ctx.cr0.so = ctx.xer.so;"));
}

#[test]
fn test_bctr_with_switch_table() {
    let mut harness = Harness::new();
    harness.switch_table = Some(SwitchTable {
        address: 0x8200_0010,
        index_register: 3,
        targets: vec![0x8200_0020, 0x8200_0030, 0x8200_0040],
    });
    let insn = Instruction::new(Opcode::Bctr, [0; 5]);
    let text = harness.emit(&insn);

    assert!(text.contains("switch (ctx.r3.u32) {"));
    assert!(text.contains("\tcase 0:\n\t\tgoto loc_82000020;"));
    assert!(text.contains("\tcase 1:\n\t\tgoto loc_82000030;"));
    assert!(text.contains("\tcase 2:\n\t\tgoto loc_82000040;"));
    assert!(text.contains("__builtin_trap(); // Switch case out of range"));
}

#[test]
fn test_bctr_without_table_is_indirect_tail_call() {
    let mut harness = Harness::new();
    let insn = Instruction::new(Opcode::Bctr, [0; 5]);
    let text = harness.emit(&insn);
    assert_eq!(text, "\tPPC_CALL_INDIRECT_FUNC(ctx.ctr.u32);\n\treturn;\n");
}

#[test]
fn test_branch_inside_function_is_goto_outside_is_call() {
    let mut harness = Harness::new();
    harness.graph.insert(FunctionNode::new(0x8200_0000, 0x100));
    harness.graph.insert(FunctionNode::new(0x8300_0000, 0x20));

    let inside = Instruction::new(Opcode::B, [0x8200_0040, 0, 0, 0, 0]);
    let text = harness.emit(&inside);
    assert_eq!(text, "\tgoto loc_82000040;\n");

    let outside = Instruction::new(Opcode::B, [0x8300_0000, 0, 0, 0, 0]);
    let text = harness.emit(&outside);
    assert!(text.contains("sub_83000000(ctx, base);"));
    assert!(text.ends_with("\treturn;\n"));
}

#[test]
fn test_bl_sets_lr_and_invalidates_csr() {
    let mut harness = Harness::new();
    harness.graph.insert(FunctionNode::new(0x8300_0000, 0x20));
    harness.csr_state = CsrState::Fpu;

    let insn = Instruction::new(Opcode::Bl, [0x8300_0000, 0, 0, 0, 0]);
    let text = harness.emit(&insn);
    assert!(text.starts_with("\tctx.lr = 0x82000014;\n"));
    assert!(text.contains("sub_83000000(ctx, base);"));
    assert_eq!(harness.csr_state, CsrState::Unknown);
}

#[test]
fn test_flush_mode_elision() {
    let mut harness = Harness::new();

    // First FP op from Unknown: unconditional switch
    let fadd = Instruction::new(Opcode::Fadd, [1, 2, 3, 0, 0]);
    let text = harness.emit(&fadd);
    assert!(text.contains("ctx.fpscr.disableFlushModeUnconditional();"));

    // Second FP op in FPU state: no switch at all
    let text = harness.emit(&fadd);
    assert!(!text.contains("FlushMode"));

    // Vector op flips to VMX with the plain form
    let vaddfp = Instruction::new(Opcode::Vaddfp, [0, 1, 2, 0, 0]);
    let text = harness.emit(&vaddfp);
    assert!(text.contains("ctx.fpscr.enableFlushMode();"));
}

#[test]
fn test_trap_unconditional_and_selective() {
    let mut harness = Harness::new();
    // tw 31, r3, r4 (TO=0x1F): unconditional
    harness.data = vec![0x7FE3_2008];
    let insn = Instruction::new(Opcode::Tw, [31, 3, 4, 0, 0]);
    let text = harness.emit(&insn);
    assert_eq!(text, "\tppc_trap(ctx, base, 0);\n");

    // tweq r3, r4 (TO=4): equality only
    harness.data = vec![0x7C83_2008];
    let insn = Instruction::new(Opcode::Tweq, [3, 4, 0, 0, 0]);
    let text = harness.emit(&insn);
    assert_eq!(text, "\tif (ctx.r3.s32 == ctx.r4.s32) ppc_trap(ctx, base, 0);\n");

    // TO=0 is a no-op
    harness.data = vec![0x7C03_2008];
    let insn = Instruction::new(Opcode::Tw, [0, 3, 4, 0, 0]);
    let text = harness.emit(&insn);
    assert!(text.is_empty());
}

#[test]
fn test_cr_bit_op_maps_field_and_bit() {
    let mut harness = Harness::new();
    // crandc 2, 8, 13: crD = cr0.eq, crA = cr2.lt, crB = cr3.gt
    let insn = Instruction::new(Opcode::Crandc, [2, 8, 13, 0, 0]);
    let text = harness.emit(&insn);
    assert_eq!(text, "\tctx.cr0.eq = ctx.cr2.lt & !(ctx.cr3.gt);\n");
}

//=============================================================================
// Function emitter scenarios
//=============================================================================

struct TestDisassembler;

impl Disassembler for TestDisassembler {
    fn disassemble(&self, word: u32, _addr: u32) -> Option<Instruction> {
        // Only the handful of encodings the emitter tests use.
        match ppc_primary(word) {
            14 => {
                let rt = (word >> 21) & 31;
                let ra = (word >> 16) & 31;
                let imm = (word & 0xFFFF) as i16 as i32 as u32;
                if ra == 0 {
                    Some(Instruction::new(Opcode::Li, [rt, imm, 0, 0, 0]))
                } else {
                    Some(Instruction::new(Opcode::Addi, [rt, ra, imm, 0, 0]))
                }
            }
            _ => match word {
                0x4E80_0020 => Some(Instruction::new(Opcode::Blr, [0; 5])),
                _ => None,
            },
        }
    }
}

fn ppc_primary(word: u32) -> u32 {
    word >> 26
}

/// Branches need the displacement resolved against the address, so wrap the
/// simple matcher with an address-aware decode.
struct BranchAwareDisassembler;

impl Disassembler for BranchAwareDisassembler {
    fn disassemble(&self, word: u32, addr: u32) -> Option<Instruction> {
        if ppc_primary(word) == 18 && (word & 3) == 0 {
            let target = addr.wrapping_add(ox_codegen::insn::b_displacement(word) as u32);
            return Some(Instruction::new(Opcode::B, [target, 0, 0, 0, 0]));
        }
        TestDisassembler.disassemble(word, addr)
    }
}

fn make_image(base: u32, words: &[u32]) -> BinaryImage {
    let mut data = Vec::with_capacity(words.len() * 4);
    for word in words {
        data.extend_from_slice(&word.to_be_bytes());
    }
    BinaryImage {
        base_address: base,
        data,
        sections: vec![Section {
            base_address: base,
            size: words.len() as u32 * 4,
            executable: true,
        }],
    }
}

#[test]
fn test_function_emit_labels_once_and_goto_targets_declared() {
    let base = 0x8200_0000;
    // li r3, 1; b +8; li r3, 2; blr
    let words = [0x3860_0001, 0x4800_0008, 0x3860_0002, 0x4E80_0020];
    let image = make_image(base, &words);

    let mut graph = FunctionGraph::new();
    graph.insert(
        FunctionNode::new(base, 16).with_blocks(vec![ox_codegen::graph::Block {
            base,
            size: 16,
        }]),
    );

    let mut recompiler = Recompiler::new(
        CodegenConfig::default(),
        graph,
        image,
        0,
        Box::new(BranchAwareDisassembler),
    );

    let fn_node = recompiler.graph.get(base).unwrap().clone();
    assert!(recompiler.recompile_function(&fn_node));
    let text = recompiler.out().to_string();

    // The branch target is declared exactly once and referenced by a goto.
    assert_eq!(text.matches("loc_8200000C:").count(), 1);
    assert!(text.contains("\tgoto loc_8200000C;"));
    // Weak/alias framing around the body.
    assert!(text.contains("PPC_WEAK_FUNC(sub_82000000);"));
    assert!(text.contains("PPC_FUNC_IMPL(__imp__sub_82000000) {"));
    assert!(text.contains("\tPPC_FUNC_PROLOGUE();"));
    assert!(text.contains("\treturn;"));
}

#[test]
fn test_empty_function_emits_stub() {
    let base = 0x8200_0000;
    let image = make_image(base, &[0x4E80_0020]);
    let mut graph = FunctionGraph::new();
    graph.insert(FunctionNode::new(base, 4));

    let mut recompiler = Recompiler::new(
        CodegenConfig::default(),
        graph,
        image,
        0,
        Box::new(TestDisassembler),
    );
    let fn_node = recompiler.graph.get(base).unwrap().clone();
    assert!(recompiler.recompile_function(&fn_node));
    let text = recompiler.out();
    assert!(text.contains("// STUB: Function at 0x82000000 has no discovered code blocks"));
    assert!(text.contains("PPC_FUNC_PROLOGUE();"));
}

#[test]
fn test_entry_point_is_named_xstart() {
    let base = 0x8200_0000;
    let image = make_image(base, &[0x4E80_0020]);
    let mut graph = FunctionGraph::new();
    graph.insert(
        FunctionNode::new(base, 4).with_blocks(vec![ox_codegen::graph::Block { base, size: 4 }]),
    );

    let mut recompiler = Recompiler::new(
        CodegenConfig::default(),
        graph,
        image,
        base,
        Box::new(TestDisassembler),
    );
    let fn_node = recompiler.graph.get(base).unwrap().clone();
    recompiler.recompile_function(&fn_node);
    assert!(recompiler.out().contains("PPC_WEAK_FUNC(xstart);"));
}

#[test]
fn test_content_addressed_output_is_idempotent() {
    let dir = std::env::temp_dir().join(format!("ox-codegen-test-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let base = 0x8200_0000;
    let image = make_image(base, &[0x3860_0001, 0x4E80_0020]);
    let mut graph = FunctionGraph::new();
    graph.insert(
        FunctionNode::new(base, 8).with_blocks(vec![ox_codegen::graph::Block { base, size: 8 }]),
    );

    let mut config = CodegenConfig::default();
    config.out_directory_path = dir.display().to_string();

    let mut recompiler = Recompiler::new(config, graph, image, 0, Box::new(TestDisassembler));
    recompiler.recompile_all(false).unwrap();

    let target = dir.join("ox_recomp.0.cpp");
    let first_mtime = std::fs::metadata(&target).unwrap().modified().unwrap();
    let first_content = std::fs::read_to_string(&target).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(20));

    // Re-running over unchanged input must not rewrite any file.
    let image = make_image(base, &[0x3860_0001, 0x4E80_0020]);
    let mut graph = FunctionGraph::new();
    graph.insert(
        FunctionNode::new(base, 8).with_blocks(vec![ox_codegen::graph::Block { base, size: 8 }]),
    );
    let mut config = CodegenConfig::default();
    config.out_directory_path = dir.display().to_string();
    let mut recompiler = Recompiler::new(config, graph, image, 0, Box::new(TestDisassembler));
    recompiler.recompile_all(false).unwrap();

    let second_mtime = std::fs::metadata(&target).unwrap().modified().unwrap();
    assert_eq!(first_mtime, second_mtime);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), first_content);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_project_outputs_are_generated() {
    let dir = std::env::temp_dir().join(format!("ox-codegen-proj-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let base = 0x8200_0000;
    let image = make_image(base, &[0x3860_0001, 0x4E80_0020]);
    let mut graph = FunctionGraph::new();
    graph.insert(
        FunctionNode::new(base, 8).with_blocks(vec![ox_codegen::graph::Block { base, size: 8 }]),
    );
    graph.insert(FunctionNode::import(0x8100_0000, "__imp__NtClose"));

    let mut config = CodegenConfig::default();
    config.project_name = "demo".to_string();
    config.out_directory_path = dir.display().to_string();

    let mut recompiler = Recompiler::new(config, graph, image, base, Box::new(TestDisassembler));
    recompiler.recompile_all(false).unwrap();

    let config_h = std::fs::read_to_string(dir.join("demo_config.h")).unwrap();
    assert!(config_h.contains("#define PPC_IMAGE_BASE 0x82000000ull"));
    assert!(config_h.contains("#define PPC_CODE_BASE 0x82000000ull"));

    let init_h = std::fs::read_to_string(dir.join("demo_init.h")).unwrap();
    assert!(init_h.contains("PPC_EXTERN_IMPORT(xstart);"));
    assert!(init_h.contains("PPC_EXTERN_IMPORT(__imp__NtClose);"));

    let init_cpp = std::fs::read_to_string(dir.join("demo_init.cpp")).unwrap();
    assert!(init_cpp.contains("PPCFuncMapping PPCFuncMappings[] = {"));
    assert!(init_cpp.contains("{ 0x82000000, xstart },"));
    assert!(init_cpp.contains("{ 0, nullptr }"));

    let cmake = std::fs::read_to_string(dir.join("sources.cmake")).unwrap();
    assert!(cmake.contains("demo_init.cpp"));
    assert!(cmake.contains("demo_recomp.0.cpp"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_validation_failure_blocks_without_force() {
    let base = 0x8200_0000;
    let image = make_image(base, &[0x4E80_0020]);
    let graph = FunctionGraph::new();
    let mut config = CodegenConfig::default();
    config.out_directory_path = std::env::temp_dir()
        .join("ox-codegen-blocked")
        .display()
        .to_string();

    let mut recompiler = Recompiler::new(config, graph, image, 0, Box::new(TestDisassembler));
    recompiler.set_validation_failed();
    assert!(recompiler.recompile_all(false).is_err());
    assert!(recompiler.recompile_all(true).is_ok());
}
