//! Integration Tests Module
//!
//! End-to-end flows across the provider gateway, selector, codec and
//! assembler, driven by in-process mock providers.

pub mod build_pipeline;
pub mod cli_smoke_test;
pub mod provider_chain;
