//! Analysis listing loader
//!
//! The external analyzer records discovered functions, blocks, imports and
//! image layout alongside the project config. This module turns that
//! listing into the graph and image the emitter consumes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use ox_codegen::graph::{Block, FunctionGraph, FunctionNode, SehInfo, SehScope};
use ox_codegen::{BinaryImage, Section};

#[derive(Debug, Deserialize)]
pub struct SectionEntry {
    pub base: u32,
    pub size: u32,
    #[serde(default)]
    pub executable: bool,
}

#[derive(Debug, Deserialize)]
pub struct BlockEntry {
    pub base: u32,
    pub size: u32,
}

#[derive(Debug, Deserialize, Default)]
pub struct SehScopeEntry {
    pub filter: u32,
    pub handler: u32,
    pub try_start: u32,
    pub try_end: u32,
}

#[derive(Debug, Deserialize)]
pub struct SehEntry {
    #[serde(default)]
    pub scopes: Vec<SehScopeEntry>,
    #[serde(default)]
    pub restore_helper: u32,
    #[serde(default)]
    pub frame_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct FunctionEntry {
    pub base: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub import: bool,
    #[serde(default)]
    pub blocks: Vec<BlockEntry>,
    pub seh: Option<SehEntry>,
}

/// The analyzer's output, read from the same TOML file as the project
/// config (unknown keys on either side are ignored by the other).
#[derive(Debug, Deserialize)]
pub struct AnalysisListing {
    pub image_path: String,
    pub image_base: u32,
    #[serde(default)]
    pub entry_point: u32,
    #[serde(default, rename = "section")]
    pub sections: Vec<SectionEntry>,
    #[serde(default, rename = "function")]
    pub functions: Vec<FunctionEntry>,
}

impl AnalysisListing {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn load_image(&self, base_dir: &Path) -> Result<BinaryImage> {
        let path = base_dir.join(&self.image_path);
        let data = std::fs::read(&path)
            .with_context(|| format!("reading image {}", path.display()))?;
        Ok(BinaryImage {
            base_address: self.image_base,
            data,
            sections: self
                .sections
                .iter()
                .map(|s| Section {
                    base_address: s.base,
                    size: s.size,
                    executable: s.executable,
                })
                .collect(),
        })
    }

    pub fn build_graph(&self) -> FunctionGraph {
        let mut graph = FunctionGraph::new();
        for entry in &self.functions {
            let node = if entry.import {
                FunctionNode::import(entry.base, entry.name.clone())
            } else {
                let blocks = entry
                    .blocks
                    .iter()
                    .map(|b| Block {
                        base: b.base,
                        size: b.size,
                    })
                    .collect();
                let mut node = FunctionNode::new(entry.base, entry.size)
                    .with_name(entry.name.clone())
                    .with_blocks(blocks);
                if let Some(seh) = &entry.seh {
                    node = node.with_seh_info(SehInfo {
                        scopes: seh
                            .scopes
                            .iter()
                            .map(|s| SehScope {
                                filter: s.filter,
                                handler: s.handler,
                                try_start: s.try_start,
                                try_end: s.try_end,
                            })
                            .collect(),
                        restore_helper: seh.restore_helper,
                        frame_size: seh.frame_size,
                    });
                }
                node
            };
            graph.insert(node);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing() {
        let text = r#"
            project_name = "demo"
            image_path = "demo.bin"
            image_base = 0x82000000
            entry_point = 0x82000000

            [[section]]
            base = 0x82000000
            size = 0x100
            executable = true

            [[function]]
            base = 0x82000000
            size = 0x20
            blocks = [{ base = 0x82000000, size = 0x20 }]

            [[function]]
            base = 0x81000000
            name = "__imp__NtClose"
            import = true
        "#;
        let listing: AnalysisListing = toml::from_str(text).unwrap();
        assert_eq!(listing.image_base, 0x8200_0000);
        assert_eq!(listing.functions.len(), 2);

        let graph = listing.build_graph();
        assert_eq!(graph.function_count(), 2);
        assert_eq!(graph.get(0x8100_0000).unwrap().name(), "__imp__NtClose");
        assert_eq!(graph.get(0x8200_0000).unwrap().blocks().len(), 1);
    }
}
