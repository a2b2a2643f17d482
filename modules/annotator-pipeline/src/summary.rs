use annotator_common::{squash_whitespace, truncate_chars, ContentBundle, SummaryOutput, SUMMARY_MAX_CHARS};
use anyhow::{anyhow, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info};

use crate::judge::Judge;
use crate::llm::Llm;
use crate::pipeline::GenerationSettings;
use crate::prompts;
use crate::race::{race, CancelFlag, CandidateOutcome, RaceOutcome};

/// What the writer model returns for a summary.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SummaryDraft {
    /// One-line summary, 50-100 characters.
    pub summary: String,
}

/// Round-based summary generation: K judged candidates race per round, with
/// rejection feedback carried forward. The final round is unjudged and takes
/// whichever draft completes first.
pub struct SummaryGenerator {
    writer: Llm,
    judge: Judge,
    settings: GenerationSettings,
}

impl SummaryGenerator {
    pub fn new(writer: Llm, judge: Judge, settings: GenerationSettings) -> Self {
        Self {
            writer,
            judge,
            settings,
        }
    }

    pub async fn generate(&self, bundle: &ContentBundle) -> Result<SummaryOutput> {
        // One flag for the whole generator: at most one summary is ever accepted.
        let flag = CancelFlag::new();
        let mut feedback = String::new();
        let last = self.settings.max_rounds.max(1) - 1;

        for round in 0..last {
            match self.round(bundle, &feedback, true, &flag, round).await {
                RaceOutcome::Won(summary) => return Ok(self.accepted(bundle, round, &summary)),
                RaceOutcome::Lost { feedback: next } => {
                    info!(round, "summary: every candidate rejected");
                    feedback = next;
                }
                RaceOutcome::Failed(e) => {
                    return Err(e.context(format!("summary generation failed in round {round}")));
                }
            }
        }

        // Unjudged: the first draft to complete wins.
        match self.round(bundle, &feedback, false, &flag, last).await {
            RaceOutcome::Won(summary) => Ok(self.accepted(bundle, last, &summary)),
            RaceOutcome::Lost { .. } => Err(anyhow!("summary: final round produced no draft")),
            RaceOutcome::Failed(e) => {
                Err(e.context(format!("summary generation failed in round {last}")))
            }
        }
    }

    async fn round(
        &self,
        bundle: &ContentBundle,
        feedback: &str,
        judged: bool,
        flag: &CancelFlag,
        round: usize,
    ) -> RaceOutcome<String> {
        let prompt = prompts::summary_prompt(bundle, feedback);
        info!(round, judged, candidates = self.settings.candidates_per_round, "summary: starting round");

        let candidates = (0..self.settings.candidates_per_round)
            .map(|index| self.candidate(bundle, &prompt, judged, flag, round, index))
            .collect();
        race(candidates, flag).await
    }

    fn accepted(&self, bundle: &ContentBundle, round: usize, summary: &str) -> SummaryOutput {
        info!(round, chars = summary.chars().count(), "summary: accepted");
        finish(bundle, summary)
    }

    async fn candidate(
        &self,
        bundle: &ContentBundle,
        prompt: &str,
        judged: bool,
        flag: &CancelFlag,
        round: usize,
        index: usize,
    ) -> Result<CandidateOutcome<String>> {
        if flag.is_cancelled() {
            return Ok(CandidateOutcome::Cancelled);
        }

        let draft: SummaryDraft = self.writer.extract(prompts::SUMMARY_SYSTEM, prompt).await?;
        let summary = squash_whitespace(&draft.summary);
        if flag.is_cancelled() {
            return Ok(CandidateOutcome::Cancelled);
        }
        if !judged {
            return Ok(CandidateOutcome::Accepted(summary));
        }

        let verdict = self.judge.summary(bundle, &summary).await?;
        if flag.is_cancelled() {
            return Ok(CandidateOutcome::Cancelled);
        }
        debug!(round, index, passed = verdict.passed, "summary: candidate judged");

        Ok(if verdict.passed {
            CandidateOutcome::Accepted(summary)
        } else {
            CandidateOutcome::Rejected(verdict.reason)
        })
    }
}

/// Hard length cap plus pass-through fields. Idempotent on the summary.
fn finish(bundle: &ContentBundle, summary: &str) -> SummaryOutput {
    SummaryOutput {
        summary: truncate_summary(summary),
        web_context: bundle.web_context.clone(),
        canonical_url: bundle.metadata.canonical_url.clone(),
    }
}

pub fn truncate_summary(summary: &str) -> String {
    truncate_chars(summary.trim(), SUMMARY_MAX_CHARS).trim_end().to_string()
}
