// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Universal account client: one handle per (project, owner), with the
//! derived smart accounts and balances read through it.

pub mod client;
pub mod handle;

pub use client::{SyncOutcome, UniversalAccountClient};
pub use handle::UniversalAccountHandle;
