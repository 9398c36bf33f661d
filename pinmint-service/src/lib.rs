// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command-line plumbing of the `pinmint` binary.

pub mod options;
pub mod tracing;

#[cfg(test)]
#[path = "unit_tests/options_tests.rs"]
mod options_tests;
