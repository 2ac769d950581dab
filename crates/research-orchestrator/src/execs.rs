// crates/research-orchestrator/src/execs.rs
// ============================================================================
// Module: Executive Pipeline
// Description: Dual-engine discovery, compare, merge, and promotion.
// Purpose: Resolve executive identities and promote canonicals to the ATS.
// Dependencies: research-core
// ============================================================================

//! ## Overview
//! Executives arrive from two engines; the review gate admits only payloads
//! whose company prospects are accepted with executive search enabled, and
//! an ineligible reference rejects the whole payload before any write. The
//! identity forest is rebuilt from the decision log per operation, so merge
//! decisions compose deterministically: `mark_same` unions, `keep_separate`
//! is never overridden, promotion always resolves to the component canonical,
//! and every member shares the canonical's ATS identity. Verification moves
//! only forward, at member and component level alike.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use research_core::DecisionType;
use research_core::DiscoveredBy;
use research_core::EngineError;
use research_core::EngineSide;
use research_core::ExecutiveRecord;
use research_core::IdentityError;
use research_core::IdentityForest;
use research_core::MergeDecisionRecord;
use research_core::NewExecutive;
use research_core::PromotionOutcome;
use research_core::ReviewStatus;
use research_core::VerificationStatus;
use research_core::identifiers::ExecutiveId;
use research_core::identifiers::ProspectId;
use research_core::identifiers::RunId;
use research_core::identifiers::SourceId;
use research_core::identifiers::TenantId;
use research_core::interfaces::Clock;
use research_core::interfaces::ContentFetcher;
use research_core::interfaces::NewEvidence;
use research_core::interfaces::NewMergeDecision;
use research_core::interfaces::ResearchStore;
use research_core::normalize_person_name;
use serde::Deserialize;
use serde::Serialize;

use crate::service::Orchestrator;

// ============================================================================
// SECTION: Payload Types
// ============================================================================

/// Which engine lists a discovery payload applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecDiscoveryMode {
    /// Apply only internal lists.
    Internal,
    /// Apply only external lists.
    External,
    /// Apply both lists.
    Both,
}

/// One executive entry in a discovery payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecInput {
    /// Person name.
    pub name: String,
    /// Job title.
    #[serde(default)]
    pub title: Option<String>,
    /// Profile URL.
    #[serde(default)]
    pub profile_url: Option<String>,
    /// LinkedIn URL; preferred.
    #[serde(default)]
    pub linkedin_url: Option<String>,
    /// Email.
    #[serde(default)]
    pub email: Option<String>,
    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Human-readable source label.
    #[serde(default)]
    pub source_label: Option<String>,
    /// Source document reference.
    #[serde(default)]
    pub source_document_id: Option<SourceId>,
    /// Evidence snippet.
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Per-company executive lists from both engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecCompanyPayload {
    /// Company prospect the executives belong to.
    pub prospect_id: ProspectId,
    /// Internal-engine executives.
    #[serde(default)]
    pub internal: Vec<ExecInput>,
    /// External-engine executives.
    #[serde(default)]
    pub external: Vec<ExecInput>,
}

/// Full executive-discovery payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecDiscoveryPayload {
    /// Per-company lists.
    #[serde(default)]
    pub companies: Vec<ExecCompanyPayload>,
}

/// Result of applying an executive-discovery payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecDiscoveryReport {
    /// Executives added by the internal engine.
    pub internal_added: u32,
    /// Executives added by the external engine.
    pub external_added: u32,
    /// Executives observed by both engines.
    pub overlap: u32,
    /// Companies processed.
    pub companies_processed: u32,
}

/// Compare view over one company's executives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareReport {
    /// Components seen by both engines (or marked same across them).
    pub matched_or_both: u32,
    /// Components seen only internally.
    pub internal_only: u32,
    /// Components seen only externally.
    pub external_only: u32,
    /// Same-name cross-engine pairs not yet decided.
    pub candidate_matches: Vec<CandidateMatch>,
}

/// One undecided cross-engine name match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMatch {
    /// Internal-side executive.
    pub internal_id: ExecutiveId,
    /// External-side executive.
    pub external_id: ExecutiveId,
    /// Shared normalized name.
    pub name_normalized: String,
}

/// Result of promoting one executive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionReport {
    /// Count of newly created ATS identities.
    pub promoted_count: u32,
    /// Count of reused ATS identities.
    pub reused_count: u32,
    /// Per-request outcomes.
    pub results: Vec<PromotionOutcome>,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

impl<S, F, C> Orchestrator<S, F, C>
where
    S: ResearchStore,
    F: ContentFetcher,
    C: Clock,
{
    /// Applies an executive-discovery payload under the review gate.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when any referenced prospect is
    /// not accepted with executive search enabled; nothing is written in
    /// that case.
    pub fn run_executive_discovery(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        payload: &ExecDiscoveryPayload,
        mode: ExecDiscoveryMode,
    ) -> Result<ExecDiscoveryReport, EngineError> {
        self.store.get_run(tenant, run_id)?;

        // Validate the gate across the whole payload before any write.
        for company in &payload.companies {
            let prospect = self.store.get_prospect(tenant, company.prospect_id)?;
            if prospect.run_id != run_id {
                return Err(EngineError::Validation(format!(
                    "prospect {} does not belong to run {run_id}",
                    company.prospect_id
                )));
            }
            if prospect.review_status != ReviewStatus::Accepted || !prospect.exec_search_enabled {
                return Err(EngineError::Validation(format!(
                    "prospect {} is not eligible for executive search",
                    company.prospect_id
                )));
            }
        }

        let mut report = ExecDiscoveryReport::default();
        for company in &payload.companies {
            if matches!(mode, ExecDiscoveryMode::Internal | ExecDiscoveryMode::Both) {
                for input in &company.internal {
                    self.apply_exec_input(
                        tenant,
                        run_id,
                        company.prospect_id,
                        input,
                        EngineSide::Internal,
                        &mut report,
                    )?;
                }
            }
            if matches!(mode, ExecDiscoveryMode::External | ExecDiscoveryMode::Both) {
                for input in &company.external {
                    self.apply_exec_input(
                        tenant,
                        run_id,
                        company.prospect_id,
                        input,
                        EngineSide::External,
                        &mut report,
                    )?;
                }
            }
            report.companies_processed += 1;
        }
        Ok(report)
    }

    /// Applies one executive entry from one engine.
    fn apply_exec_input(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        prospect_id: ProspectId,
        input: &ExecInput,
        engine: EngineSide,
        report: &mut ExecDiscoveryReport,
    ) -> Result<(), EngineError> {
        let name_normalized = normalize_person_name(&input.name);
        if name_normalized.is_empty() {
            return Ok(());
        }
        let now = self.clock.now();

        let executive = if let Some(existing) =
            self.store.find_executive_by_name(tenant, prospect_id, &name_normalized)?
        {
            let combined = existing.discovered_by.combined_with(engine.attribution());
            if combined != existing.discovered_by {
                self.store.set_executive_discovered_by(tenant, existing.id, combined)?;
                report.overlap += 1;
            }
            existing
        } else {
            let created = self.store.create_executive(
                tenant,
                run_id,
                &NewExecutive {
                    prospect_id,
                    name_raw: input.name.clone(),
                    name_normalized,
                    title: input.title.clone(),
                    profile_url: input.profile_url.clone(),
                    linkedin_url: input.linkedin_url.clone(),
                    email: input.email.clone(),
                    confidence: input.confidence.unwrap_or(0.5),
                    engine,
                    source_label: input.source_label.clone(),
                    source_document_id: input.source_document_id,
                },
                now,
            )?;
            match engine {
                EngineSide::Internal => report.internal_added += 1,
                EngineSide::External => report.external_added += 1,
            }
            created
        };

        self.store.add_executive_evidence(
            tenant,
            executive.id,
            &NewEvidence {
                source_type: engine.as_str().to_string(),
                source_name: input
                    .source_label
                    .clone()
                    .unwrap_or_else(|| format!("{} engine", engine.as_str())),
                source_url: input.linkedin_url.clone().or_else(|| input.profile_url.clone()),
                source_document_id: input.source_document_id,
                source_content_hash: None,
                raw_snippet: input.snippet.clone(),
                evidence_weight: input.confidence.unwrap_or(0.5),
            },
            now,
        )?;
        Ok(())
    }

    /// Builds the compare view for one company prospect.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when the prospect is absent.
    pub fn compare_executives(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        prospect_id: ProspectId,
    ) -> Result<CompareReport, EngineError> {
        let prospect = self.store.get_prospect(tenant, prospect_id)?;
        if prospect.run_id != run_id {
            return Err(EngineError::NotFound(format!(
                "prospect {prospect_id} in run {run_id}"
            )));
        }
        let executives = self.store.list_executives_for_prospect(tenant, prospect_id)?;
        let decisions = self.store.list_merge_decisions(tenant, run_id)?;
        let mut forest = build_forest(&executives, &decisions)?;

        // Group members by component canonical.
        let mut components: BTreeMap<ExecutiveId, Vec<&ExecutiveRecord>> = BTreeMap::new();
        for executive in &executives {
            let canonical = forest
                .canonical_of(executive.id)
                .map_err(|err| EngineError::Store(err.to_string()))?;
            components.entry(canonical).or_default().push(executive);
        }

        let mut matched_or_both = 0u32;
        let mut internal_only = 0u32;
        let mut external_only = 0u32;
        for members in components.values() {
            let has_internal = members.iter().any(|m| {
                matches!(m.discovered_by, DiscoveredBy::Internal | DiscoveredBy::Both)
            });
            let has_external = members.iter().any(|m| {
                matches!(m.discovered_by, DiscoveredBy::External | DiscoveredBy::Both)
            });
            if has_internal && has_external {
                matched_or_both += 1;
            } else if has_internal {
                internal_only += 1;
            } else {
                external_only += 1;
            }
        }

        // Same-name cross-engine pairs in different components, undecided.
        let mut candidate_matches = Vec::new();
        for left in &executives {
            for right in &executives {
                if left.id >= right.id || left.name_normalized != right.name_normalized {
                    continue;
                }
                let cross_engine = matches!(
                    (left.discovered_by, right.discovered_by),
                    (DiscoveredBy::Internal, DiscoveredBy::External)
                        | (DiscoveredBy::External, DiscoveredBy::Internal)
                );
                if !cross_engine {
                    continue;
                }
                let left_canonical = forest
                    .canonical_of(left.id)
                    .map_err(|err| EngineError::Store(err.to_string()))?;
                let right_canonical = forest
                    .canonical_of(right.id)
                    .map_err(|err| EngineError::Store(err.to_string()))?;
                if left_canonical == right_canonical {
                    continue;
                }
                if !forest.is_separated(left.id, right.id) {
                    candidate_matches.push(CandidateMatch {
                        internal_id: if left.discovered_by == DiscoveredBy::Internal {
                            left.id
                        } else {
                            right.id
                        },
                        external_id: if left.discovered_by == DiscoveredBy::Internal {
                            right.id
                        } else {
                            left.id
                        },
                        name_normalized: left.name_normalized.clone(),
                    });
                }
            }
        }

        Ok(CompareReport {
            matched_or_both,
            internal_only,
            external_only,
            candidate_matches,
        })
    }

    /// Records a merge decision and applies its effects.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] when the decision violates an
    /// existing keep-separate edge, and [`EngineError::Validation`] for
    /// mismatched executives.
    pub fn record_merge_decision(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        decision: &NewMergeDecision,
    ) -> Result<MergeDecisionRecord, EngineError> {
        let left = self.store.get_executive(tenant, decision.left_executive_id)?;
        let right = self.store.get_executive(tenant, decision.right_executive_id)?;
        if left.id == right.id {
            return Err(EngineError::Validation(
                "a merge decision needs two distinct executives".to_string(),
            ));
        }
        if left.prospect_id != decision.prospect_id || right.prospect_id != decision.prospect_id {
            return Err(EngineError::Validation(
                "both executives must belong to the decision's prospect".to_string(),
            ));
        }
        if left.run_id != run_id || right.run_id != run_id {
            return Err(EngineError::Validation(
                "both executives must belong to the run".to_string(),
            ));
        }

        // Replay the decision log plus the new decision before persisting.
        let executives = self.store.list_executives(tenant, run_id)?;
        let decisions = self.store.list_merge_decisions(tenant, run_id)?;
        let mut forest = build_forest(&executives, &decisions)?;
        let applied = match decision.decision_type {
            DecisionType::MarkSame => forest.mark_same(left.id, right.id),
            DecisionType::KeepSeparate => forest.keep_separate(left.id, right.id),
        };
        applied.map_err(|err| match err {
            IdentityError::SeparationViolated { left, right } => EngineError::Conflict(format!(
                "executives {left} and {right} are marked keep-separate"
            )),
            IdentityError::UnknownExecutive(id) => {
                EngineError::NotFound(format!("executive {id}"))
            }
        })?;

        let record = self.store.record_merge_decision(tenant, run_id, decision, self.clock.now())?;

        if decision.decision_type == DecisionType::MarkSame {
            // Component verification presents the member maximum.
            self.propagate_component_state(tenant, &mut forest, &executives, left.id)?;
        }
        Ok(record)
    }

    /// Promotes the component verification maximum onto every member.
    fn propagate_component_state(
        &self,
        tenant: &TenantId,
        forest: &mut IdentityForest,
        executives: &[ExecutiveRecord],
        member: ExecutiveId,
    ) -> Result<(), EngineError> {
        let component = forest
            .component_of(member)
            .map_err(|err| EngineError::Store(err.to_string()))?;
        let maximum = component
            .iter()
            .filter_map(|id| executives.iter().find(|e| e.id == *id))
            .map(|e| e.verification_status)
            .max()
            .unwrap_or(VerificationStatus::Unverified);
        for id in component {
            if let Some(executive) = executives.iter().find(|e| e.id == id)
                && executive.verification_status < maximum
            {
                self.store.set_executive_verification(tenant, id, maximum)?;
            }
        }
        Ok(())
    }

    /// Updates an executive's verification status, forward only.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] on any downgrade; no state changes.
    pub fn update_executive_verification(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        status: VerificationStatus,
    ) -> Result<(), EngineError> {
        let executive = self.store.get_executive(tenant, executive_id)?;
        if executive.verification_status.is_downgrade_to(status) {
            return Err(EngineError::Conflict(format!(
                "verification cannot move from {} to {status}",
                executive.verification_status
            )));
        }
        self.store.set_executive_verification(tenant, executive_id, status)?;

        // Promote the component to its new maximum.
        let executives = self.store.list_executives(tenant, executive.run_id)?;
        let decisions = self.store.list_merge_decisions(tenant, executive.run_id)?;
        let mut forest = build_forest(&executives, &decisions)?;
        self.propagate_component_state(tenant, &mut forest, &executives, executive_id)?;
        Ok(())
    }

    /// Promotes an executive to the ATS through its canonical identity.
    ///
    /// Repeat calls, from any member of the component, reuse the same
    /// candidate/contact/assignment triple.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] when the company prospect is not
    /// accepted.
    pub fn promote_executive(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        status: &str,
    ) -> Result<PromotionReport, EngineError> {
        let executive = self.store.get_executive(tenant, executive_id)?;
        let prospect = self.store.get_prospect(tenant, executive.prospect_id)?;
        if prospect.review_status != ReviewStatus::Accepted {
            return Err(EngineError::Conflict(format!(
                "prospect {} is not accepted; promotion refused",
                prospect.id
            )));
        }
        if status.trim().is_empty() {
            return Err(EngineError::Validation("promotion status is required".to_string()));
        }

        let executives = self.store.list_executives(tenant, executive.run_id)?;
        let decisions = self.store.list_merge_decisions(tenant, executive.run_id)?;
        let mut forest = build_forest(&executives, &decisions)?;
        let canonical = forest
            .canonical_of(executive_id)
            .map_err(|err| EngineError::Store(err.to_string()))?;
        let component = forest
            .component_of(executive_id)
            .map_err(|err| EngineError::Store(err.to_string()))?;

        let now = self.clock.now();
        let (ids, created) = self.store.upsert_promotion(tenant, canonical, now)?;
        for member in &component {
            self.store.set_executive_ats_ids(tenant, *member, &ids)?;
        }

        Ok(PromotionReport {
            promoted_count: u32::from(created),
            reused_count: u32::from(!created),
            results: vec![PromotionOutcome {
                requested_id: executive_id,
                resolved_to_canonical: canonical,
                ids,
                reused: !created,
                reuse_reason: (!created).then(|| "existing_promotion".to_string()),
            }],
        })
    }
}

// ============================================================================
// SECTION: Forest Construction
// ============================================================================

/// Rebuilds the identity forest from the decision log.
pub(crate) fn build_forest(
    executives: &[ExecutiveRecord],
    decisions: &[MergeDecisionRecord],
) -> Result<IdentityForest, EngineError> {
    let mut forest = IdentityForest::new();
    for executive in executives {
        forest.insert(executive.id, executive.created_at);
    }
    for decision in decisions {
        let applied = match decision.decision_type {
            DecisionType::MarkSame => {
                forest.mark_same(decision.left_executive_id, decision.right_executive_id)
            }
            DecisionType::KeepSeparate => {
                forest.keep_separate(decision.left_executive_id, decision.right_executive_id)
            }
        };
        // The log was validated when written; replay tolerates decisions
        // about executives merged away since.
        if let Err(IdentityError::UnknownExecutive(_)) = applied {
            continue;
        }
        applied.map_err(|err| EngineError::Store(err.to_string()))?;
    }
    Ok(forest)
}
