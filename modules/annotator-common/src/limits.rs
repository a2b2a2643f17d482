/// Hard upper bound on a summary, counted in characters.
pub const SUMMARY_MAX_CHARS: usize = 100;

/// Shortest summary the judge accepts. Unjudged final-round drafts may be shorter.
pub const SUMMARY_MIN_CHARS: usize = 50;

/// Longest machine tag, counted in characters.
pub const TAG_MAX_CHARS: usize = 10;

/// Machine tags per suggestion, excluding the sentinel.
pub const MIN_TAGS: usize = 3;
pub const MAX_TAGS: usize = 10;

/// Characters the bookmarking service rejects inside a tag.
pub const FORBIDDEN_TAG_CHARS: [char; 6] = ['?', '/', '%', '[', ']', ':'];

/// Default marker tag prepended to every machine-generated tag list.
pub const DEFAULT_SENTINEL_TAG: &str = "ai-tagged";

/// Generic page rendering is cut off at this many characters.
pub const MARKDOWN_CHAR_CAP: usize = 20_000;

/// Only this much user context is sent to the safety classifier.
pub const MODERATION_CHAR_CAP: usize = 5_000;

/// Supplementary web context is cut off at this many characters.
pub const WEB_CONTEXT_CHAR_CAP: usize = 1_000;

/// Aggregated judge feedback carried into the next round.
pub const FEEDBACK_CHAR_CAP: usize = 600;

/// How many rejection reasons make it into the aggregated feedback.
pub const FEEDBACK_MAX_REASONS: usize = 3;

/// Generation rounds per generator, and candidates raced per round.
pub const DEFAULT_MAX_ROUNDS: usize = 3;
pub const DEFAULT_CANDIDATES_PER_ROUND: usize = 3;

/// Per-call bound on generation and judge calls.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 60;
