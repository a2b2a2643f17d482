use std::collections::HashSet;

use annotator_common::{
    char_len, squash_whitespace, strip_forbidden_tag_chars, ContentBundle, JudgeVerdict,
    MAX_TAGS, TAG_MAX_CHARS,
};
use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::judge::{tags_violation, Judge};
use crate::llm::Llm;
use crate::pipeline::GenerationSettings;
use crate::prompts;
use crate::race::{race, CancelFlag, CandidateOutcome, RaceOutcome};

/// What the writer model returns for tags.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TagsDraft {
    /// 3-10 short tags.
    pub tags: Vec<String>,
}

/// Clean a raw model tag list: strip forbidden characters, drop empty or
/// over-long tags and the reserved sentinel, de-duplicate case-insensitively,
/// and keep at most [`MAX_TAGS`]. Order is preserved.
pub fn sanitize_tags(raw: &[String], sentinel: &str) -> Vec<String> {
    let sentinel = sentinel.to_lowercase();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for tag in raw {
        // Tags are space-separated on the bookmarking service.
        let cleaned = squash_whitespace(&strip_forbidden_tag_chars(tag)).replace(' ', "-");
        if cleaned.is_empty() || char_len(&cleaned) > TAG_MAX_CHARS {
            continue;
        }
        let key = cleaned.to_lowercase();
        if key == sentinel || !seen.insert(key) {
            continue;
        }
        out.push(cleaned);
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

/// Round-based tag generation. Each round gets its own cancel flag; the final
/// round skips the judge model but still enforces the local tag rules.
pub struct TagsGenerator {
    writer: Llm,
    judge: Judge,
    settings: GenerationSettings,
}

impl TagsGenerator {
    pub fn new(writer: Llm, judge: Judge, settings: GenerationSettings) -> Self {
        Self {
            writer,
            judge,
            settings,
        }
    }

    /// Always returns the sentinel first. Exhaustion leaves the sentinel alone.
    pub async fn generate(&self, bundle: &ContentBundle) -> Result<Vec<String>> {
        let sentinel = self.settings.sentinel_tag.as_str();
        let mut feedback = String::new();
        let rounds = self.settings.max_rounds;

        for round in 0..rounds {
            let flag = CancelFlag::new();
            let judged = round + 1 < rounds;
            let prompt = prompts::tags_prompt(bundle, &feedback, sentinel);
            info!(round, judged, candidates = self.settings.candidates_per_round, "tags: starting round");

            let candidates = (0..self.settings.candidates_per_round)
                .map(|index| self.candidate(bundle, &prompt, judged, &flag, round, index))
                .collect();

            match race(candidates, &flag).await {
                RaceOutcome::Won(tags) => {
                    info!(round, count = tags.len(), "tags: accepted");
                    return Ok(with_sentinel(sentinel, tags));
                }
                RaceOutcome::Lost { feedback: next } => {
                    info!(round, "tags: every candidate rejected");
                    feedback = next;
                }
                RaceOutcome::Failed(e) => {
                    return Err(e.context(format!("tag generation failed in round {round}")));
                }
            }
        }

        warn!(url = bundle.url.as_str(), "tags: rounds exhausted, falling back to sentinel only");
        Ok(with_sentinel(sentinel, Vec::new()))
    }

    async fn candidate(
        &self,
        bundle: &ContentBundle,
        prompt: &str,
        judged: bool,
        flag: &CancelFlag,
        round: usize,
        index: usize,
    ) -> Result<CandidateOutcome<Vec<String>>> {
        if flag.is_cancelled() {
            return Ok(CandidateOutcome::Cancelled);
        }

        let draft: TagsDraft = self.writer.extract(prompts::TAGS_SYSTEM, prompt).await?;
        let tags = sanitize_tags(&draft.tags, &self.settings.sentinel_tag);
        debug!(round, index, raw = draft.tags.len(), kept = tags.len(), "tags: sanitized draft");
        if flag.is_cancelled() {
            return Ok(CandidateOutcome::Cancelled);
        }

        let verdict = if judged {
            self.judge.tags(bundle, &tags).await?
        } else {
            match tags_violation(&tags) {
                Some(reason) => JudgeVerdict::fail(reason),
                None => JudgeVerdict::pass("Meets the local tag rules."),
            }
        };
        if flag.is_cancelled() {
            return Ok(CandidateOutcome::Cancelled);
        }

        Ok(if verdict.passed {
            CandidateOutcome::Accepted(tags)
        } else {
            CandidateOutcome::Rejected(verdict.reason)
        })
    }
}

fn with_sentinel(sentinel: &str, tags: Vec<String>) -> Vec<String> {
    std::iter::once(sentinel.to_string()).chain(tags).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use annotator_common::contains_forbidden_tag_char;

    use crate::testing::{verdict, MockGenerator};

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            max_rounds: 3,
            candidates_per_round: 3,
            sentinel_tag: "ai-tagged".into(),
        }
    }

    fn generator(writer: Arc<MockGenerator>, judge: Arc<MockGenerator>) -> TagsGenerator {
        TagsGenerator::new(
            Llm::new(writer, Duration::from_secs(5)),
            Judge::new(Llm::new(judge, Duration::from_secs(5))),
            settings(),
        )
    }

    #[test]
    fn sanitize_strips_drops_and_dedups() {
        let raw = strings(&[
            "rust",
            "c++/rust",
            "what?",
            "[tokio]",
            "concurrency",
            "",
            "  ",
            "AI-Tagged",
            "Rust",
            "web dev",
            "https://x",
        ]);
        let clean = sanitize_tags(&raw, "ai-tagged");
        assert_eq!(
            clean,
            strings(&["rust", "c++rust", "what", "tokio", "web-dev", "httpsx"])
        );
    }

    #[test]
    fn sanitize_invariants_hold_for_hostile_input() {
        let raw: Vec<String> = (0..40)
            .map(|i| format!("t{i}?/%[]:{}", "x".repeat(i % 12)))
            .chain(strings(&["ai-tagged", "AI-TAGGED"]))
            .collect();
        let clean = sanitize_tags(&raw, "ai-tagged");

        assert!(clean.len() <= MAX_TAGS);
        for tag in &clean {
            assert!(!contains_forbidden_tag_char(tag), "{tag}");
            assert!(tag.chars().count() <= TAG_MAX_CHARS, "{tag}");
            assert_ne!(tag.to_lowercase(), "ai-tagged");
        }
    }

    #[tokio::test]
    async fn winner_gets_sentinel_prepended() {
        let writer = Arc::new(MockGenerator::drafts("", &["rust", "tokio", "futures", "ai-tagged"]));
        let judge = Arc::new(MockGenerator::judge_passing());

        let tags = generator(writer, judge).generate(&ContentBundle::default()).await.unwrap();
        assert_eq!(tags, strings(&["ai-tagged", "rust", "tokio", "futures"]));
    }

    #[tokio::test]
    async fn final_round_skips_model_judge() {
        let writer = Arc::new(MockGenerator::drafts("", &["rust", "tokio", "futures"]));
        let judge = Arc::new(MockGenerator::judge_rejecting("Too generic."));

        let tags = generator(writer, judge.clone()).generate(&ContentBundle::default()).await.unwrap();

        assert_eq!(tags, strings(&["ai-tagged", "rust", "tokio", "futures"]));
        // Two judged rounds of three candidates each.
        assert_eq!(judge.calls(), 6);
    }

    #[tokio::test]
    async fn exhaustion_falls_back_to_sentinel_only() {
        let writer = Arc::new(MockGenerator::drafts("", &["averyverylongtag", "x?y"]));
        let judge = Arc::new(MockGenerator::judge_passing());

        let tags = generator(writer, judge.clone()).generate(&ContentBundle::default()).await.unwrap();

        assert_eq!(tags, strings(&["ai-tagged"]));
        assert_eq!(judge.calls(), 0);
    }

    #[tokio::test]
    async fn judge_failure_without_verdicts_is_an_error() {
        let writer = Arc::new(MockGenerator::drafts("", &["rust", "tokio", "futures"]));
        let judge = Arc::new(MockGenerator::failing("judge unavailable"));

        let err = generator(writer, judge).generate(&ContentBundle::default()).await.unwrap_err();
        assert!(format!("{err:#}").contains("judge unavailable"));
    }

    #[tokio::test]
    async fn round_feedback_names_the_problem() {
        let writer = Arc::new(MockGenerator::drafts("", &["rust", "tokio", "futures"]));
        let judge = Arc::new(MockGenerator::from_fn(|n, _| {
            Ok(if n < 3 {
                verdict(false, "\"rust\" is too broad.")
            } else {
                verdict(true, "ok")
            })
        }));

        generator(writer.clone(), judge).generate(&ContentBundle::default()).await.unwrap();

        let drafts = writer.calls_for("TagsDraft");
        assert!(drafts.last().unwrap().prompt.contains("\"rust\" is too broad."));
    }
}
