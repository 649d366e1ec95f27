// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Delta test selection for Salesforce deployments.
//!
//! Given the components a deployment adds, changes, or destroys, determine
//! which Apex test classes have to run to validate it. Changes are matched
//! against the source text of every class in the project. Each class that
//! depends on a change pulls in its test class, and is searched for in turn,
//! until no new dependency turns up or a depth limit is hit.
//!
//! # Test Strategies
//!
//! Each metadata type is configured with a test strategy in the project
//! definition. Changes to a `full` type run every local test, changes to a
//! `delta` type run only the tests of dependent classes, and changes to a
//! `skip` type never select tests at all.
//!
//! # Result
//!
//! The outcome is a [`TestDirective`], i.e., a test level plus a list of test
//! classes that deployment tooling understands directly.

pub mod config;
pub mod directive;
pub mod logging;
pub mod manifest;
pub mod path;
pub mod pipeline;
pub mod resolver;
pub mod source;
pub mod wizard;

pub use directive::{TestDirective, TestLevel};
pub use resolver::{Resolution, Resolver, ResolverSettings};
