// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Supported chains and token types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UaError;

/// Virtual machine family of a chain. Decides which smart account applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainVm {
    Evm,
    Solana,
}

/// Static network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID as used by the relayer
    pub chain_id: u64,
    /// VM family
    pub vm: ChainVm,
    /// Token used for network fees
    pub native_token: TokenType,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Chain identifiers accepted by the relayer.
///
/// Solana has no EVM chain id; `101` is the identifier the relayer uses for
/// Solana mainnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum ChainId {
    EthereumMainnet,
    OptimismMainnet,
    BscMainnet,
    PolygonMainnet,
    BaseMainnet,
    ArbitrumMainnet,
    AvalancheMainnet,
    LineaMainnet,
    SolanaMainnet,
}

/// Every supported chain, in display order.
pub const SUPPORTED_CHAINS: [ChainId; 9] = [
    ChainId::EthereumMainnet,
    ChainId::OptimismMainnet,
    ChainId::BscMainnet,
    ChainId::PolygonMainnet,
    ChainId::BaseMainnet,
    ChainId::ArbitrumMainnet,
    ChainId::AvalancheMainnet,
    ChainId::LineaMainnet,
    ChainId::SolanaMainnet,
];

const ETHEREUM: NetworkConfig = NetworkConfig {
    name: "Ethereum",
    chain_id: 1,
    vm: ChainVm::Evm,
    native_token: TokenType::Eth,
    explorer_url: "https://etherscan.io",
};

const OPTIMISM: NetworkConfig = NetworkConfig {
    name: "Optimism",
    chain_id: 10,
    vm: ChainVm::Evm,
    native_token: TokenType::Eth,
    explorer_url: "https://optimistic.etherscan.io",
};

const BSC: NetworkConfig = NetworkConfig {
    name: "BNB Chain",
    chain_id: 56,
    vm: ChainVm::Evm,
    native_token: TokenType::Bnb,
    explorer_url: "https://bscscan.com",
};

const POLYGON: NetworkConfig = NetworkConfig {
    name: "Polygon",
    chain_id: 137,
    vm: ChainVm::Evm,
    native_token: TokenType::Pol,
    explorer_url: "https://polygonscan.com",
};

const BASE: NetworkConfig = NetworkConfig {
    name: "Base",
    chain_id: 8453,
    vm: ChainVm::Evm,
    native_token: TokenType::Eth,
    explorer_url: "https://basescan.org",
};

const ARBITRUM: NetworkConfig = NetworkConfig {
    name: "Arbitrum One",
    chain_id: 42161,
    vm: ChainVm::Evm,
    native_token: TokenType::Eth,
    explorer_url: "https://arbiscan.io",
};

const AVALANCHE: NetworkConfig = NetworkConfig {
    name: "Avalanche C-Chain",
    chain_id: 43114,
    vm: ChainVm::Evm,
    native_token: TokenType::Avax,
    explorer_url: "https://snowtrace.io",
};

const LINEA: NetworkConfig = NetworkConfig {
    name: "Linea",
    chain_id: 59144,
    vm: ChainVm::Evm,
    native_token: TokenType::Eth,
    explorer_url: "https://lineascan.build",
};

const SOLANA: NetworkConfig = NetworkConfig {
    name: "Solana",
    chain_id: 101,
    vm: ChainVm::Solana,
    native_token: TokenType::Sol,
    explorer_url: "https://solscan.io",
};

impl ChainId {
    pub fn network(&self) -> &'static NetworkConfig {
        match self {
            ChainId::EthereumMainnet => &ETHEREUM,
            ChainId::OptimismMainnet => &OPTIMISM,
            ChainId::BscMainnet => &BSC,
            ChainId::PolygonMainnet => &POLYGON,
            ChainId::BaseMainnet => &BASE,
            ChainId::ArbitrumMainnet => &ARBITRUM,
            ChainId::AvalancheMainnet => &AVALANCHE,
            ChainId::LineaMainnet => &LINEA,
            ChainId::SolanaMainnet => &SOLANA,
        }
    }

    pub fn id(&self) -> u64 {
        self.network().chain_id
    }

    pub fn vm(&self) -> ChainVm {
        self.network().vm
    }

    pub fn native_token(&self) -> TokenType {
        self.network().native_token
    }
}

impl TryFrom<u64> for ChainId {
    type Error = UaError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        SUPPORTED_CHAINS
            .iter()
            .copied()
            .find(|chain| chain.id() == value)
            .ok_or_else(|| UaError::UnsupportedChain(value.to_string()))
    }
}

impl From<ChainId> for u64 {
    fn from(value: ChainId) -> Self {
        value.id()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.network().name, self.id())
    }
}

/// Token types the relayer can deliver and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    Eth,
    Usdc,
    Usdt,
    Sol,
    Bnb,
    Avax,
    Pol,
}

impl TokenType {
    pub fn symbol(&self) -> &'static str {
        match self {
            TokenType::Eth => "ETH",
            TokenType::Usdc => "USDC",
            TokenType::Usdt => "USDT",
            TokenType::Sol => "SOL",
            TokenType::Bnb => "BNB",
            TokenType::Avax => "AVAX",
            TokenType::Pol => "POL",
        }
    }

    /// Decimals used for human-readable amounts of this token type.
    pub fn decimals(&self) -> u8 {
        match self {
            TokenType::Usdc | TokenType::Usdt => 6,
            TokenType::Sol => 9,
            TokenType::Eth | TokenType::Bnb | TokenType::Avax | TokenType::Pol => 18,
        }
    }
}

impl FromStr for TokenType {
    type Err = UaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ETH" => Ok(TokenType::Eth),
            "USDC" => Ok(TokenType::Usdc),
            "USDT" => Ok(TokenType::Usdt),
            "SOL" => Ok(TokenType::Sol),
            "BNB" => Ok(TokenType::Bnb),
            "AVAX" => Ok(TokenType::Avax),
            "POL" => Ok(TokenType::Pol),
            other => Err(UaError::UnsupportedToken(other.to_string())),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
