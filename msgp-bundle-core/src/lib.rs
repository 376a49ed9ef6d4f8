#![doc = "msgp-bundle-core: core logic library for msgp-bundle."]

//! This crate contains the whole source aggregation pipeline used by the
//! `msgp-bundle` binary: locate Go files carrying a `//go:generate msgp`
//! directive, strip their package and import declarations, merge them into a
//! single synthetic unit, and run the generator against it.
//!
//! # Usage
//! Most callers only need [`pipeline::run`] together with a
//! [`config::PipelineConfig`] and a [`contract::Generator`] implementation
//! (usually [`generate::ProcessGenerator`]).

pub mod config;
pub mod contract;
pub mod diagnostics;
pub mod error;
pub mod generate;
pub mod merge;
pub mod pipeline;
pub mod scan;
pub mod split;
