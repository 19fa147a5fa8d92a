// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Selection Value Objects
//
// Caller-supplied constraints and the ephemeral results of a selection call.
// Nothing here holds state across calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::catalog::ModelInfo;
use super::llm::ExecutionRequest;

/// Tri-state vision constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisionRequirement {
    Required,
    Forbidden,
    #[default]
    DontCare,
}

impl VisionRequirement {
    pub fn admits(self, supports_vision: bool) -> bool {
        match self {
            Self::Required => supports_vision,
            Self::Forbidden => !supports_vision,
            Self::DontCare => true,
        }
    }
}

impl FromStr for VisionRequirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "required" | "true" | "yes" => Ok(Self::Required),
            "forbidden" | "false" | "no" => Ok(Self::Forbidden),
            "dont-care" | "dont_care" | "any" => Ok(Self::DontCare),
            other => Err(format!("invalid vision requirement '{}'", other)),
        }
    }
}

/// Which dimension dominates the score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityMode {
    Cost,
    Performance,
    #[default]
    Balanced,
}

impl FromStr for PriorityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cost" => Ok(Self::Cost),
            "performance" => Ok(Self::Performance),
            "balanced" => Ok(Self::Balanced),
            other => Err(format!("invalid priority mode '{}'", other)),
        }
    }
}

impl fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cost => "cost",
            Self::Performance => "performance",
            Self::Balanced => "balanced",
        })
    }
}

/// Caller-supplied selection constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRequirements {
    /// Maximum cost per 1K tokens
    pub max_cost_per_1k: Option<f64>,

    /// Minimum context window
    pub min_tokens: Option<u32>,

    pub vision: VisionRequirement,

    /// Allow-list; also earns a score bonus
    pub preferred_providers: Vec<String>,

    pub excluded_providers: Vec<String>,

    pub priority: PriorityMode,
}

impl ModelRequirements {
    /// Requirements inferred from a request: vision is required when any
    /// message carries an image
    pub fn for_request(request: &ExecutionRequest) -> Self {
        Self {
            vision: if request.has_images() {
                VisionRequirement::Required
            } else {
                VisionRequirement::DontCare
            },
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: PriorityMode) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_cost(mut self, max_cost_per_1k: f64) -> Self {
        self.max_cost_per_1k = Some(max_cost_per_1k);
        self
    }

    pub fn with_min_tokens(mut self, min_tokens: u32) -> Self {
        self.min_tokens = Some(min_tokens);
        self
    }

    pub fn with_vision(mut self, vision: VisionRequirement) -> Self {
        self.vision = vision;
        self
    }

    pub fn prefer(mut self, provider: &str) -> Self {
        self.preferred_providers.push(provider.to_string());
        self
    }

    pub fn exclude(mut self, provider: &str) -> Self {
        self.excluded_providers.push(provider.to_string());
        self
    }

    pub fn is_preferred(&self, provider: &str) -> bool {
        self.preferred_providers.iter().any(|p| p == provider)
    }

    pub fn is_excluded(&self, provider: &str) -> bool {
        self.excluded_providers.iter().any(|p| p == provider)
    }

    /// Reject contradictory or nonsensical constraints
    pub fn validate(&self) -> Result<(), String> {
        if let Some(cost) = self.max_cost_per_1k {
            if !cost.is_finite() || cost < 0.0 {
                return Err(format!("max cost per 1k tokens must be >= 0, got {}", cost));
            }
        }
        if self.min_tokens == Some(0) {
            return Err("min tokens must be > 0 when set".to_string());
        }
        if let Some(both) = self.preferred_providers.iter().find(|p| self.is_excluded(p)) {
            return Err(format!("provider '{}' is both preferred and excluded", both));
        }
        Ok(())
    }

    /// The requirements filter applied to every candidate pair
    pub fn admits(&self, provider: &str, info: &ModelInfo) -> bool {
        if let Some(ceiling) = self.max_cost_per_1k {
            if info.cost_per_1k_tokens > ceiling {
                return false;
            }
        }
        if let Some(min_tokens) = self.min_tokens {
            if info.max_tokens < min_tokens {
                return false;
            }
        }
        if !self.vision.admits(info.supports_vision) {
            return false;
        }
        if !self.preferred_providers.is_empty() && !self.is_preferred(provider) {
            return false;
        }
        true
    }
}

/// One scored (provider, model) pair
#[derive(Debug, Clone, Serialize)]
pub struct ModelCandidate {
    pub provider: String,
    pub model: String,
    pub info: ModelInfo,
    pub score: f64,
    pub reason: String,
}

/// How the chosen pair was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionKind {
    Explicit,
    Scored,
    Fallback,
    LastResort,
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "explicit",
            Self::Scored => "scored",
            Self::Fallback => "fallback",
            Self::LastResort => "last-resort",
        })
    }
}

/// Result surface handed back to the RPC layer
#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    pub provider: String,
    pub model: String,
    pub reason: String,
    pub kind: SelectionKind,

    /// Present when the pair was scored
    pub score: Option<f64>,

    /// Number of candidates that survived the requirements filter
    pub candidates: usize,
}

/// Structured verdict for one named pair
#[derive(Debug, Clone, Serialize)]
pub struct SuitabilityReport {
    pub provider: String,
    pub model: String,
    pub suitable: bool,

    /// Catalog validation failure, if any
    pub validation_error: Option<String>,

    pub score: f64,
    pub reason: String,
    pub details: Option<SuitabilityDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuitabilityDetails {
    pub cost_per_1k_tokens: f64,
    pub max_tokens: u32,
    pub supports_vision: bool,
    pub performance_score: f64,
    pub description: String,
}
