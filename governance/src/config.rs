//! Governance configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use agora_types::{Address, Amount};

use crate::error::GovernanceError;
use crate::params::{Deployment, ProposalPolicy, VotingRules};

/// Which governance variant to deploy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Equal-weight membership.
    #[default]
    Congress,
    /// Token-weighted shareholders.
    Association,
}

impl Variant {
    /// The proposal policy used when the configuration does not override it.
    pub fn default_policy(&self) -> ProposalPolicy {
        match self {
            Self::Congress => ProposalPolicy::MembersOnly,
            Self::Association => ProposalPolicy::Open,
        }
    }
}

/// Construction-time configuration for one governance instance.
///
/// Can be loaded from a TOML file via [`GovernanceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every value is fixed once the
/// instance is deployed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub variant: Variant,

    /// Length of every proposal's voting window.
    #[serde(default = "default_voting_period_secs")]
    pub voting_period_secs: u64,

    /// Minimum yes-minus-no weight for a proposal to pass.
    #[serde(default = "default_min_pass_margin")]
    pub min_pass_margin: i64,

    /// Congress only: minimum number of votes cast.
    #[serde(default = "default_min_pass_votes")]
    pub min_pass_votes: u64,

    /// Association only: minimum cumulative weight cast.
    #[serde(default = "default_min_quorum")]
    pub min_quorum: u64,

    /// Overrides the variant's default proposal policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_policy: Option<ProposalPolicy>,

    /// Initial administrator and funder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Address>,

    /// Deposited into the treasury at deployment.
    #[serde(default)]
    pub initial_funding: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_voting_period_secs() -> u64 {
    60
}

fn default_min_pass_margin() -> i64 {
    1
}

fn default_min_pass_votes() -> u64 {
    2
}

fn default_min_quorum() -> u64 {
    2
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GovernanceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GovernanceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GovernanceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GovernanceError> {
        toml::from_str(s).map_err(|e| GovernanceError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, GovernanceError> {
        toml::to_string_pretty(self).map_err(|e| GovernanceError::Config(e.to_string()))
    }

    /// Validated voting rules for the configured variant.
    pub fn voting_rules(&self) -> Result<VotingRules, GovernanceError> {
        let margin = i128::from(self.min_pass_margin);
        let rules = match self.variant {
            Variant::Congress => {
                VotingRules::congress(self.min_pass_votes, self.voting_period_secs, margin)
            }
            Variant::Association => VotingRules::association(
                u128::from(self.min_quorum),
                self.voting_period_secs,
                margin,
            ),
        };
        rules.map_err(|e| GovernanceError::Config(e.to_string()))
    }

    pub fn proposal_policy(&self) -> ProposalPolicy {
        self.proposal_policy
            .unwrap_or_else(|| self.variant.default_policy())
    }

    /// Everything needed to deploy an instance. Requires `admin` to be set.
    pub fn deployment(&self) -> Result<Deployment, GovernanceError> {
        let admin = self
            .admin
            .ok_or_else(|| GovernanceError::Config("admin address is not configured".into()))?;
        Ok(Deployment::new(admin, self.voting_rules()?)
            .with_funding(Amount::from(self.initial_funding))
            .with_policy(self.proposal_policy()))
    }

    /// Check the whole configuration without deploying anything.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        self.voting_rules()?;
        if !matches!(
            self.log_format.to_ascii_lowercase().as_str(),
            "human" | "json"
        ) {
            return Err(GovernanceError::Config(format!(
                "unknown log format {:?}",
                self.log_format
            )));
        }
        Ok(())
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            voting_period_secs: default_voting_period_secs(),
            min_pass_margin: default_min_pass_margin(),
            min_pass_votes: default_min_pass_votes(),
            min_quorum: default_min_quorum(),
            proposal_policy: None,
            admin: None,
            initial_funding: 0,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
