//! Scripted governance sessions.
//!
//! A script is a TOML file holding an ordered list of `[[step]]` tables, each
//! tagged with an `action`. Replaying a script deploys one governance
//! instance from a [`GovernanceConfig`], applies every step in order and
//! writes one JSON line per emitted event and per step result.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use agora_governance::{
    Association, Clock, Congress, GovernanceConfig, GovernanceError, GovernanceEvent,
    InMemoryShareLedger, InMemoryTreasury, ProposalRequest, Treasury, Variant,
};
use agora_types::{Address, Amount, ProposalId, Timestamp};
use agora_utils::format_std_duration;
use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Name under which the admin joins a congress.
    #[serde(default = "default_founder_name")]
    pub founder_name: String,

    /// Starting time in Unix seconds. Defaults to the wall clock.
    #[serde(default)]
    pub start_time: Option<u64>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

fn default_founder_name() -> String {
    "founder".to_string()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    AddMember {
        caller: Address,
        principal: Address,
        name: String,
    },
    RemoveMember {
        caller: Address,
        principal: Address,
    },
    TransferOwnership {
        caller: Address,
        new_admin: Address,
    },
    /// Association only: set a holder's token balance.
    SetBalance {
        holder: Address,
        balance: u64,
    },
    Fund {
        from: Address,
        amount: u64,
    },
    Propose {
        caller: Address,
        beneficiary: Address,
        payout: u64,
        description: String,
        /// Hex-encoded execution payload.
        #[serde(default)]
        payload: String,
    },
    Vote {
        caller: Address,
        proposal_id: ProposalId,
        in_favor: bool,
        #[serde(default)]
        justification: String,
    },
    Advance {
        secs: u64,
    },
    TimeLeft {
        proposal_id: ProposalId,
    },
    Execute {
        proposal_id: ProposalId,
        #[serde(default)]
        payload: String,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Self::AddMember { .. } => "add_member",
            Self::RemoveMember { .. } => "remove_member",
            Self::TransferOwnership { .. } => "transfer_ownership",
            Self::SetBalance { .. } => "set_balance",
            Self::Fund { .. } => "fund",
            Self::Propose { .. } => "propose",
            Self::Vote { .. } => "vote",
            Self::Advance { .. } => "advance",
            Self::TimeLeft { .. } => "time_left",
            Self::Execute { .. } => "execute",
        }
    }
}

impl Script {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("invalid scenario script")
    }

    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

/// Manually advanced time, starting from a fixed instant.
#[derive(Debug)]
struct ScriptClock(AtomicU64);

impl ScriptClock {
    fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ScriptClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.0.load(Ordering::SeqCst))
    }
}

enum Instance {
    Congress(Congress),
    Association {
        association: Association,
        ledger: Arc<InMemoryShareLedger>,
    },
}

/// Step counts from a finished replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub steps: usize,
    pub failures: usize,
}

/// One deployed instance plus the collaborators driving it.
pub struct Session {
    instance: Instance,
    clock: Arc<ScriptClock>,
    treasury: Arc<InMemoryTreasury>,
    pending: Arc<Mutex<Vec<GovernanceEvent>>>,
}

impl Session {
    pub fn deploy(config: &GovernanceConfig, script: &Script) -> anyhow::Result<Self> {
        let deployment = config.deployment()?;
        let start = script
            .start_time
            .map(Timestamp::new)
            .unwrap_or_else(Timestamp::now);
        let clock = Arc::new(ScriptClock(AtomicU64::new(start.as_secs())));
        let treasury = Arc::new(InMemoryTreasury::new());
        let pending = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&pending);
        let listener = Box::new(move |event: &GovernanceEvent| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        });

        let instance = match config.variant {
            Variant::Congress => {
                let congress = Congress::deploy(
                    deployment,
                    script.founder_name.clone(),
                    clock.clone(),
                    treasury.clone(),
                )?;
                congress.subscribe(listener);
                Instance::Congress(congress)
            }
            Variant::Association => {
                let ledger = Arc::new(InMemoryShareLedger::new());
                let association =
                    Association::deploy(deployment, ledger.clone(), clock.clone(), treasury.clone())?;
                association.subscribe(listener);
                Instance::Association {
                    association,
                    ledger,
                }
            }
        };
        info!(variant = ?config.variant, start = %start, "session deployed");
        Ok(Self {
            instance,
            clock,
            treasury,
            pending,
        })
    }

    /// Apply every step, writing events and results as JSON lines. A failing
    /// step is reported and the replay continues unless `fail_fast` is set.
    pub fn replay(
        &self,
        steps: &[Step],
        fail_fast: bool,
        out: &mut impl Write,
    ) -> anyhow::Result<Summary> {
        let mut summary = Summary::default();
        for (index, step) in steps.iter().enumerate() {
            summary.steps += 1;
            let result = self.apply(step);
            for event in self.take_events() {
                writeln!(out, "{}", serde_json::to_string(&event)?)?;
            }
            match result {
                Ok(value) => {
                    let line = json!({ "step": index, "action": step.action(), "result": value });
                    writeln!(out, "{line}")?;
                }
                Err(e) => {
                    summary.failures += 1;
                    warn!(step = index, action = step.action(), error = %e, "step failed");
                    let line = json!({ "step": index, "action": step.action(), "error": e.to_string() });
                    writeln!(out, "{line}")?;
                    if fail_fast {
                        bail!("step {index} ({}) failed: {e}", step.action());
                    }
                }
            }
        }
        Ok(summary)
    }

    fn take_events(&self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn apply(&self, step: &Step) -> anyhow::Result<Value> {
        match step {
            Step::AddMember {
                caller,
                principal,
                name,
            } => {
                self.congress()?
                    .add_member(*caller, *principal, name.clone())?;
                Ok(Value::Null)
            }
            Step::RemoveMember { caller, principal } => {
                self.congress()?.remove_member(*caller, *principal)?;
                Ok(Value::Null)
            }
            Step::TransferOwnership { caller, new_admin } => {
                self.congress()?.transfer_ownership(*caller, *new_admin)?;
                Ok(Value::Null)
            }
            Step::SetBalance { holder, balance } => match &self.instance {
                Instance::Association { ledger, .. } => {
                    ledger.update_balance(*holder, u128::from(*balance));
                    Ok(json!({ "total_supply": ledger.total_supply().to_string() }))
                }
                Instance::Congress(_) => bail!("set_balance requires an association"),
            },
            Step::Fund { from, amount } => {
                let amount = Amount::from(*amount);
                match &self.instance {
                    Instance::Congress(congress) => congress.fund(*from, amount)?,
                    Instance::Association { .. } => {
                        bail!("fund is only available on a congress; use initial_funding")
                    }
                }
                Ok(json!({ "balance": self.treasury_balance().to_string() }))
            }
            Step::Propose {
                caller,
                beneficiary,
                payout,
                description,
                payload,
            } => {
                let request =
                    ProposalRequest::new(*beneficiary, Amount::from(*payout), description.clone())
                        .with_payload(decode_payload(payload)?);
                let id = match &self.instance {
                    Instance::Congress(c) => c.new_proposal(*caller, request)?,
                    Instance::Association { association, .. } => {
                        association.new_proposal(*caller, request)?
                    }
                };
                Ok(json!({ "proposal_id": id }))
            }
            Step::Vote {
                caller,
                proposal_id,
                in_favor,
                justification,
            } => {
                let weight = match &self.instance {
                    Instance::Congress(c) => {
                        c.vote(*caller, *proposal_id, *in_favor, justification.clone())?
                    }
                    Instance::Association { association, .. } => association.vote(
                        *caller,
                        *proposal_id,
                        *in_favor,
                        justification.clone(),
                    )?,
                };
                Ok(json!({ "weight": weight.to_string() }))
            }
            Step::Advance { secs } => {
                self.clock.advance(*secs);
                Ok(json!({ "now": self.clock.now().as_secs() }))
            }
            Step::TimeLeft { proposal_id } => {
                let left = match &self.instance {
                    Instance::Congress(c) => c.voting_time_left(*proposal_id)?,
                    Instance::Association { association, .. } => {
                        association.voting_time_left(*proposal_id)?
                    }
                };
                Ok(json!({
                    "secs": left.as_secs(),
                    "human": format_std_duration(left),
                }))
            }
            Step::Execute {
                proposal_id,
                payload,
            } => {
                let payload = decode_payload(payload)?;
                let outcome = match &self.instance {
                    Instance::Congress(c) => c.execute_proposal(*proposal_id, &payload),
                    Instance::Association { association, .. } => {
                        association.execute_proposal(*proposal_id, &payload)
                    }
                };
                match outcome {
                    Ok(outcome) => Ok(serde_json::to_value(outcome)?),
                    // A settled-but-rejected proposal is a normal outcome of a
                    // session, reported as a result rather than a failure.
                    Err(GovernanceError::ProposalRejected {
                        proposal_id,
                        current_result,
                        vote_count,
                    }) => Ok(json!({
                        "proposal_id": proposal_id,
                        "passed": false,
                        "current_result": current_result.to_string(),
                        "vote_count": vote_count.to_string(),
                    })),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    fn congress(&self) -> anyhow::Result<&Congress> {
        match &self.instance {
            Instance::Congress(c) => Ok(c),
            Instance::Association { .. } => bail!("membership actions require a congress"),
        }
    }

    pub fn treasury_balance(&self) -> Amount {
        self.treasury.balance()
    }

    #[cfg(test)]
    fn paid_to(&self, recipient: &Address) -> Amount {
        self.treasury.paid_to(recipient)
    }
}

fn decode_payload(payload: &str) -> anyhow::Result<Vec<u8>> {
    let digits = payload.strip_prefix("0x").unwrap_or(payload);
    hex::decode(digits).with_context(|| format!("payload {payload:?} is not valid hex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONGRESS_CONFIG: &str = include_str!("../../demos/congress.toml");
    const CONGRESS_SCRIPT: &str = include_str!("../../demos/congress_session.toml");
    const ASSOCIATION_CONFIG: &str = include_str!("../../demos/association.toml");
    const ASSOCIATION_SCRIPT: &str = include_str!("../../demos/association_session.toml");

    fn run(config: &str, script: &str) -> (Session, Summary, Vec<Value>) {
        let config = GovernanceConfig::from_toml_str(config).unwrap();
        let script = Script::from_toml_str(script).unwrap();
        let session = Session::deploy(&config, &script).unwrap();
        let mut out = Vec::new();
        let summary = session.replay(&script.steps, false, &mut out).unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (session, summary, lines)
    }

    fn events_named<'a>(lines: &'a [Value], name: &str) -> Vec<&'a Value> {
        lines.iter().filter(|l| l["event"] == name).collect()
    }

    #[test]
    fn congress_demo_session_pays_the_beneficiary() {
        let (session, summary, lines) = run(CONGRESS_CONFIG, CONGRESS_SCRIPT);
        assert_eq!(summary.failures, 0);
        assert_eq!(events_named(&lines, "member_added").len(), 3);
        assert_eq!(events_named(&lines, "vote_cast").len(), 4);

        let executed = events_named(&lines, "proposal_executed");
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0]["vote_count"], 4);
        assert_eq!(executed[0]["current_result"], 2);

        let bob = Address::from_hex("0x0202020202020202020202020202020202020202").unwrap();
        assert_eq!(session.paid_to(&bob), Amount::new(1_000));
        assert_eq!(session.treasury_balance(), Amount::new(2_000));
    }

    #[test]
    fn association_demo_session_settles_both_proposals() {
        let (_session, summary, lines) = run(ASSOCIATION_CONFIG, ASSOCIATION_SCRIPT);
        assert_eq!(summary.failures, 0);
        assert_eq!(events_named(&lines, "proposal_created").len(), 2);
        assert_eq!(events_named(&lines, "proposal_executed").len(), 1);
        let rejected: Vec<_> = lines.iter().filter(|l| l["result"]["passed"] == false).collect();
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn failing_steps_are_reported_and_skipped() {
        let script = r#"
            start_time = 1000

            [[step]]
            action = "add_member"
            caller = "0x0909090909090909090909090909090909090909"
            principal = "0x0202020202020202020202020202020202020202"
            name = "Bob"

            [[step]]
            action = "advance"
            secs = 5
        "#;
        let (_session, summary, lines) = run(CONGRESS_CONFIG, script);
        assert_eq!(summary, Summary { steps: 2, failures: 1 });
        assert!(lines[0]["error"].as_str().unwrap().contains("not authorized"));
        assert_eq!(lines[1]["result"]["now"], 1005);
    }

    #[test]
    fn fail_fast_stops_at_first_error() {
        let config = GovernanceConfig::from_toml_str(CONGRESS_CONFIG).unwrap();
        let script = Script::from_toml_str(
            r#"
            [[step]]
            action = "set_balance"
            holder = "0x0202020202020202020202020202020202020202"
            balance = 3
            "#,
        )
        .unwrap();
        let session = Session::deploy(&config, &script).unwrap();
        let mut out = Vec::new();
        assert!(session.replay(&script.steps, true, &mut out).is_err());
    }

    #[test]
    fn payload_must_be_hex() {
        assert_eq!(decode_payload("0xdead").unwrap(), vec![0xde, 0xad]);
        assert!(decode_payload("").unwrap().is_empty());
        assert!(decode_payload("zz").is_err());
    }

    #[test]
    fn script_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, CONGRESS_SCRIPT).unwrap();
        let script = Script::from_toml_file(&path).unwrap();
        assert_eq!(script.founder_name, "Alice");
        assert!(!script.steps.is_empty());
    }
}
