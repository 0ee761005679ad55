// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Podium integration tests.
//!
//! # Components
//!
//! - [`MockPaymentProcessor`] - Mock payment processor with scripted verdicts
//! - [`TestHarness`] - Full engine on a temp database

pub mod harness;
pub mod mock_processor;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_processor::MockPaymentProcessor;
