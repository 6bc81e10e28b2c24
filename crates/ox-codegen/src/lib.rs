//! PPC to host-source static recompilation
//!
//! Given a function graph produced by external analysis plus a disassembler
//! for individual instruction words, this crate emits portable host C++
//! text implementing the architectural effect of every instruction, one
//! instruction at a time, and batches the output into content-addressed
//! translation units.

pub mod binary;
pub mod builders;
pub mod context;
pub mod dispatch;
pub mod graph;
pub mod insn;
pub mod recompiler;

pub use binary::{BinaryImage, Section};
pub use context::{BuilderContext, CsrState, LocalVariables};
pub use graph::{FunctionAuthority, FunctionGraph, FunctionNode, TargetKind};
pub use insn::{Disassembler, Instruction, Opcode};
pub use recompiler::{JumpTableSweep, Recompiler};
