use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub tags: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagEntry {
    pub tag: String,
}

impl TagsResponse {
    /// Trimmed, non-empty tag names in the order the service returned them.
    pub(crate) fn into_names(self) -> Vec<String> {
        self.tags
            .into_iter()
            .map(|t| t.tag.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}
