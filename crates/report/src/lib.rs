// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Reports over the tables built from the loaded snapshots.
//!
//! Every report opens the database read-only. Each section is an isolated
//! unit: a failing query prints a skip line and the rest still run, which
//! keeps the reports usable before the transformation layer has produced
//! every table.

pub mod commands;
pub mod common;

pub use common::ReportContext;
