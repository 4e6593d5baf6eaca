// Copyright 2026 Leasehawk Contributors
// SPDX-License-Identifier: Apache-2.0

//! Leasehawk library — unattended used-aircraft lease acquisition.
//!
//! This library crate exposes the core modules for integration testing.

pub mod collect;
pub mod config;
pub mod counters;
pub mod error;
pub mod extract;
pub mod feed;
pub mod renderer;
pub mod scheduler;
pub mod session;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testkit;
