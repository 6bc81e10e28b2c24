//! Instruction builders
//!
//! One pure function per PPC opcode (or one shared per family), each
//! emitting host text implementing the architectural effect of that
//! instruction. Builders never abort: they return false only when the
//! instruction truly has no mapping.

pub mod arithmetic;
pub mod compare;
pub mod control_flow;
pub mod fp;
pub mod helpers;
pub mod logical;
pub mod memory;
pub mod system;
pub mod vector;
