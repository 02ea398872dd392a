// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::models::{OwnerAddress, TradeConfig};

/// One initialization of the universal account client.
///
/// Immutable. A different owner or project means a new handle with a new
/// generation; results fetched under an older generation are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversalAccountHandle {
    generation: u64,
    project_id: String,
    owner: OwnerAddress,
    trade_config: TradeConfig,
}

impl UniversalAccountHandle {
    pub(crate) fn new(
        generation: u64,
        project_id: String,
        owner: OwnerAddress,
        trade_config: TradeConfig,
    ) -> Self {
        Self {
            generation,
            project_id,
            owner,
            trade_config,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn owner(&self) -> &OwnerAddress {
        &self.owner
    }

    pub fn trade_config(&self) -> &TradeConfig {
        &self.trade_config
    }
}
