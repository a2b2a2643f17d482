use std::collections::HashSet;

use annotator_common::{
    char_len, contains_forbidden_tag_char, ContentBundle, JudgeVerdict, MAX_TAGS, MIN_TAGS,
    SUMMARY_MAX_CHARS, SUMMARY_MIN_CHARS, TAG_MAX_CHARS,
};
use anyhow::Result;
use tracing::debug;

use crate::llm::Llm;
use crate::prompts;

/// Stateless evaluator. Deterministic rules are checked locally; only a
/// candidate that passes them costs a judge-model call.
#[derive(Clone)]
pub struct Judge {
    llm: Llm,
}

impl Judge {
    pub fn new(llm: Llm) -> Self {
        Self { llm }
    }

    pub async fn summary(&self, bundle: &ContentBundle, summary: &str) -> Result<JudgeVerdict> {
        if let Some(reason) = summary_violation(summary) {
            debug!(reason = reason.as_str(), "judge: summary failed local checks");
            return Ok(JudgeVerdict::fail(reason));
        }

        let prompt = prompts::summary_judge_prompt(bundle, summary, char_len(summary));
        self.llm.extract(prompts::SUMMARY_JUDGE_SYSTEM, &prompt).await
    }

    pub async fn tags(&self, bundle: &ContentBundle, tags: &[String]) -> Result<JudgeVerdict> {
        if let Some(reason) = tags_violation(tags) {
            debug!(reason = reason.as_str(), "judge: tags failed local checks");
            return Ok(JudgeVerdict::fail(reason));
        }

        let lengths: Vec<usize> = tags.iter().map(|t| char_len(t)).collect();
        let prompt = prompts::tags_judge_prompt(bundle, tags, &lengths);
        self.llm.extract(prompts::TAGS_JUDGE_SYSTEM, &prompt).await
    }
}

/// Length rule for summaries, as feedback text when violated.
pub fn summary_violation(summary: &str) -> Option<String> {
    let chars = char_len(summary);
    if chars < SUMMARY_MIN_CHARS {
        return Some(format!(
            "Summary is {chars} characters; it must be at least {SUMMARY_MIN_CHARS}. Add a concrete detail."
        ));
    }
    if chars > SUMMARY_MAX_CHARS {
        return Some(format!(
            "Summary is {chars} characters; it must be at most {SUMMARY_MAX_CHARS}. Cut {} characters.",
            chars - SUMMARY_MAX_CHARS
        ));
    }
    None
}

/// Count, length, character-set and duplicate rules for a tag list.
pub fn tags_violation(tags: &[String]) -> Option<String> {
    if tags.len() < MIN_TAGS || tags.len() > MAX_TAGS {
        return Some(format!(
            "Got {} usable tags; need between {MIN_TAGS} and {MAX_TAGS}.",
            tags.len()
        ));
    }

    let too_long: Vec<&str> = tags
        .iter()
        .filter(|t| char_len(t) > TAG_MAX_CHARS)
        .map(String::as_str)
        .collect();
    if !too_long.is_empty() {
        return Some(format!(
            "Tags longer than {TAG_MAX_CHARS} characters: {}.",
            too_long.join(", ")
        ));
    }

    if let Some(bad) = tags.iter().find(|t| contains_forbidden_tag_char(t)) {
        return Some(format!("Tag \"{bad}\" contains a forbidden character (? / % [ ] :)."));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = tags.iter().find(|t| !seen.insert(t.to_lowercase())) {
        return Some(format!("Tag \"{dup}\" is duplicated."));
    }

    None
}
