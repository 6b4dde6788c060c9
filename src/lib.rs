#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

//! `AgentGuard`: a security policy engine that sits between an AI coding
//! agent and its tool calls.
//!
//! Runtime actions (shell execution, network requests, file operations,
//! secret access, Web3 transactions and signatures) are classified as
//! allow, deny, or confirm by the [`action::ActionScanner`]; source trees
//! are graded against a catalog of risky code patterns by the
//! [`scanner::StaticScanner`]. Both are parameterised by the
//! [`registry::TrustRegistry`] and the [`arbiter::ProtectionLevel`].
//!
//! The typical hook flow:
//!
//! ```no_run
//! use std::sync::Arc;
//! use agentguard::{
//!     arbiter::{arbitrate_decision, ProtectionLevel},
//!     intel::GoPlusClient,
//!     ActionScanner, TrustRegistry,
//! };
//!
//! # async fn run(envelope: agentguard::ActionEnvelope) -> anyhow::Result<()> {
//! let home = agentguard::config::state_home()?;
//! let registry = TrustRegistry::open(&agentguard::config::registry_path(&home)).await?;
//! let scanner = ActionScanner::new(Arc::new(registry), Arc::new(GoPlusClient::from_env()));
//!
//! let decision = scanner.decide(&envelope).await;
//! let _verdict = arbitrate_decision(
//!     &decision,
//!     ProtectionLevel::Balanced,
//!     envelope.context.initiating_skill.as_deref(),
//! );
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod arbiter;
pub mod audit;
pub mod config;
pub mod error;
pub mod hooks;
pub mod intel;
pub mod patterns;
pub mod registry;
pub mod scanner;

pub use action::{
    ActionContext, ActionData, ActionEnvelope, ActionScanner, ActionType, Actor, Decision,
    PolicyDecision,
};
pub use arbiter::{arbitrate, arbitrate_decision, ProtectionLevel, Verdict};
pub use error::GuardError;
pub use patterns::RiskLevel;
pub use registry::{CapabilitySet, SkillIdentity, TrustLevel, TrustRegistry};
pub use scanner::{ScanReport, StaticScanner};
