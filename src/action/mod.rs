//! Action scanner: the runtime evaluator behind `decide(envelope)`.
//!
//! One evaluation is a sequential transaction: registry lookup, the
//! sensitive-path short-circuit, detector dispatch, Web3 intel combination,
//! then the decision combinator and the initiating-skill overlay. The
//! scanner never raises; every path terminates in a [`PolicyDecision`].

use std::sync::Arc;

use crate::intel::{SimulationRequest, ThreatIntel};
use crate::patterns::{sensitive_path_hit, RiskLevel};
use crate::registry::{CapabilitySet, CapabilityView, TrustRegistry};

mod decision;
mod envelope;
mod exec;
mod file;
mod network;
mod secret;
mod web3;

pub use decision::{tags, Decision, Evidence, PolicyDecision};
pub use envelope::{ActionContext, ActionData, ActionEnvelope, ActionType, Actor, EnvKind};

use decision::{build_explanation, DetectorOutcome};
use file::FileOp;

/// Dispatches envelopes to detectors and combines the results.
pub struct ActionScanner {
    registry: Arc<TrustRegistry>,
    intel: Arc<dyn ThreatIntel>,
}

impl ActionScanner {
    pub fn new(registry: Arc<TrustRegistry>, intel: Arc<dyn ThreatIntel>) -> Self {
        Self { registry, intel }
    }

    /// Evaluate one action envelope. Never raises: internal failures come
    /// back as an `ENGINE_ERROR` deny.
    pub async fn decide(&self, envelope: &ActionEnvelope) -> PolicyDecision {
        match self.evaluate(envelope).await {
            Ok(decision) => decision,
            Err(error) => {
                tracing::error!(%error, "action evaluation failed");
                let risk_tags = vec![tags::ENGINE_ERROR.to_string()];
                let explanation = build_explanation(
                    "denied: internal evaluation error",
                    &risk_tags,
                    envelope.context.initiating_skill.as_deref(),
                );
                PolicyDecision {
                    decision: Decision::Deny,
                    risk_level: RiskLevel::High,
                    risk_tags,
                    evidence: Vec::new(),
                    explanation,
                    effective_capabilities: None,
                }
            }
        }
    }

    async fn evaluate(&self, envelope: &ActionEnvelope) -> anyhow::Result<PolicyDecision> {
        if let Some(problem) = validate_envelope(&envelope.action) {
            let risk_tags = vec![tags::INVALID_INPUT.to_string()];
            let explanation = build_explanation(
                &format!("denied: malformed envelope ({problem})"),
                &risk_tags,
                envelope.context.initiating_skill.as_deref(),
            );
            return Ok(PolicyDecision {
                decision: Decision::Deny,
                risk_level: RiskLevel::High,
                risk_tags,
                evidence: vec![Evidence::new("input", problem)],
                explanation,
                effective_capabilities: None,
            });
        }

        let lookup = self.registry.lookup(&envelope.actor.skill).await;
        let caps = &lookup.effective_capabilities;

        // Writes to credential material are blocked before capabilities or
        // detectors get a say, so a misconfigured allowlist cannot expose
        // `.env` and friends.
        if let ActionData::WriteFile { path } = &envelope.action
            && let Some(entry) = sensitive_path_hit(path)
        {
            let risk_tags = vec![tags::SENSITIVE_PATH.to_string()];
            let explanation = build_explanation(
                &format!("denied: write to sensitive path '{path}'"),
                &risk_tags,
                envelope.context.initiating_skill.as_deref(),
            );
            return Ok(PolicyDecision {
                decision: Decision::Deny,
                risk_level: RiskLevel::Critical,
                risk_tags,
                evidence: vec![
                    Evidence::new("pattern", format!("path matches sensitive entry '{entry}'"))
                        .field("path")
                        .matched(entry),
                ],
                explanation,
                effective_capabilities: Some(caps.clone()),
            });
        }

        let outcome = self.dispatch(envelope, caps).await;
        let mut decision = self.combine(envelope, outcome, caps);
        self.apply_overlay(envelope, &mut decision).await;
        Ok(decision)
    }

    async fn dispatch(&self, envelope: &ActionEnvelope, caps: &CapabilitySet) -> DetectorOutcome {
        match &envelope.action {
            ActionData::ExecCommand { command, args, env, .. } => {
                exec::analyze_exec(command, args, env, caps)
            }
            ActionData::NetworkRequest {
                method,
                url,
                body_preview,
                ..
            } => network::analyze_network(method, url, body_preview.as_deref(), caps),
            ActionData::ReadFile { path } => file::analyze_file(path, FileOp::Read, caps),
            ActionData::WriteFile { path } => file::analyze_file(path, FileOp::Write, caps),
            ActionData::SecretAccess {
                secret_name,
                access_type,
            } => secret::analyze_secret(secret_name, access_type, caps),
            ActionData::Web3Tx {
                chain_id,
                from,
                to,
                value,
                data,
                origin,
            } => {
                let outcome = web3::analyze_web3_tx(*chain_id, caps);
                let request = SimulationRequest {
                    chain_id: *chain_id,
                    from: from.clone(),
                    to: to.clone(),
                    value: value.clone(),
                    data: data.clone(),
                };
                web3::combine_with_intel(
                    outcome,
                    *chain_id,
                    origin.as_deref(),
                    Some(to),
                    Some(request),
                    caps,
                    self.intel.as_ref(),
                    true,
                )
                .await
            }
            ActionData::Web3Sign {
                chain_id,
                message,
                typed_data,
                origin,
            } => {
                let outcome =
                    web3::analyze_web3_sign(*chain_id, message, typed_data.as_deref(), caps);
                web3::combine_with_intel(
                    outcome,
                    *chain_id,
                    origin.as_deref(),
                    None,
                    None,
                    caps,
                    self.intel.as_ref(),
                    false,
                )
                .await
            }
        }
    }

    fn combine(
        &self,
        envelope: &ActionEnvelope,
        mut outcome: DetectorOutcome,
        caps: &CapabilitySet,
    ) -> PolicyDecision {
        let action_type = envelope.action.action_type();
        let external = matches!(
            action_type,
            ActionType::NetworkRequest | ActionType::Web3Tx | ActionType::Web3Sign
        );

        let mut verdict = if let Some(forced) = outcome.forced {
            forced
        } else if outcome.should_block && outcome.risk == RiskLevel::Critical {
            Decision::Deny
        } else if outcome.should_block {
            Decision::Confirm
        } else if outcome.risk >= RiskLevel::High && external {
            Decision::Confirm
        } else {
            Decision::Allow
        };

        // Unattended sessions cannot answer a Web3 confirmation.
        let web3 = matches!(action_type, ActionType::Web3Tx | ActionType::Web3Sign);
        if web3 && verdict == Decision::Confirm && !envelope.context.user_present {
            verdict = Decision::Deny;
            outcome.tag(tags::USER_NOT_PRESENT);
            outcome
                .evidence
                .push(Evidence::new("input", "user not present to confirm"));
        }

        let explanation = if verdict == Decision::Allow {
            String::new()
        } else {
            let driver = outcome
                .block_reason
                .clone()
                .or_else(|| outcome.evidence.first().map(|e| e.description.clone()))
                .unwrap_or_else(|| format!("{action_type} flagged by policy"));
            build_explanation(
                &format!("{verdict}: {driver}"),
                &outcome.tags,
                envelope.context.initiating_skill.as_deref(),
            )
        };

        PolicyDecision {
            decision: verdict,
            risk_level: outcome.risk,
            risk_tags: outcome.tags,
            evidence: outcome.evidence,
            explanation,
            effective_capabilities: Some(caps.clone()),
        }
    }

    /// Initiating-skill overlay: unattested skills get the synthetic
    /// read-only view and a confirm, attested skills whose capabilities
    /// forbid the action type get a deny.
    async fn apply_overlay(&self, envelope: &ActionEnvelope, decision: &mut PolicyDecision) {
        let Some(initiating) = envelope.context.initiating_skill.as_deref() else {
            return;
        };
        if decision.decision == Decision::Deny {
            return;
        }
        let action_type = envelope.action.action_type();

        match self.registry.lookup_by_skill_id(initiating).await {
            None => {
                let view = CapabilityView::untrusted();
                if !view_allows(view, action_type) {
                    decision.decision = Decision::Confirm;
                    decision.risk_level = decision.risk_level.max(RiskLevel::High);
                    push_tag(decision, tags::UNTRUSTED_SKILL);
                    decision.evidence.push(Evidence::new(
                        "capability",
                        format!("initiating skill '{initiating}' has no active trust record"),
                    ));
                    decision.explanation = build_explanation(
                        &format!("confirm: unattested skill requested {action_type}"),
                        &decision.risk_tags,
                        Some(initiating),
                    );
                }
            }
            Some(record) => {
                if !capabilities_allow(&record.capabilities, action_type) {
                    decision.decision = Decision::Deny;
                    decision.risk_level = decision.risk_level.max(RiskLevel::High);
                    push_tag(decision, tags::CAPABILITY_EXCEEDED);
                    decision.evidence.push(Evidence::new(
                        "capability",
                        format!(
                            "initiating skill '{initiating}' is not attested for {action_type}"
                        ),
                    ));
                    decision.explanation = build_explanation(
                        &format!("deny: skill capabilities do not cover {action_type}"),
                        &decision.risk_tags,
                        Some(initiating),
                    );
                }
            }
        }
    }
}

fn push_tag(decision: &mut PolicyDecision, tag: &str) {
    if !decision.has_tag(tag) {
        decision.risk_tags.push(tag.to_string());
    }
}

fn view_allows(view: CapabilityView, action_type: ActionType) -> bool {
    match action_type {
        ActionType::ExecCommand => view.can_exec,
        ActionType::NetworkRequest => view.can_network,
        ActionType::ReadFile => view.can_read,
        ActionType::WriteFile => view.can_write,
        // The synthetic untrusted view never covers secret access.
        ActionType::SecretAccess => false,
        ActionType::Web3Tx | ActionType::Web3Sign => view.can_web3,
    }
}

/// Action-type gate for an attested record: the boolean view covers
/// everything except secrets, which have no view bit and are checked on
/// the structured record.
fn capabilities_allow(caps: &CapabilitySet, action_type: ActionType) -> bool {
    match action_type {
        ActionType::SecretAccess => !caps.secrets.is_empty(),
        _ => view_allows(caps.view(), action_type),
    }
}

fn validate_envelope(action: &ActionData) -> Option<&'static str> {
    match action {
        ActionData::ExecCommand { command, .. } if command.trim().is_empty() => {
            Some("empty command")
        }
        ActionData::NetworkRequest { url, .. } if url.trim().is_empty() => Some("empty url"),
        ActionData::NetworkRequest { method, .. } if method.trim().is_empty() => {
            Some("empty method")
        }
        ActionData::ReadFile { path } | ActionData::WriteFile { path }
            if path.trim().is_empty() =>
        {
            Some("empty path")
        }
        ActionData::SecretAccess { secret_name, .. } if secret_name.trim().is_empty() => {
            Some("empty secret name")
        }
        ActionData::Web3Tx { to, .. } if to.trim().is_empty() => Some("empty target address"),
        _ => None,
    }
}
