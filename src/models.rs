use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// A user story to be estimated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStory {
    pub id: i64,
    pub story: String,
}

/// Response from the AI model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated text response
    pub content: String,
    /// Wall-clock latency of the request in seconds
    pub response_time: f64,
    /// Metadata about the response (tokens used, etc.)
    pub metadata: HashMap<String, serde_json::Value>,
}

/// One attempt to estimate one story.
///
/// Records are never mutated after construction; a missing `estimate` is
/// recovered from `raw_output` at aggregation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub story_id: i64,
    #[serde(rename = "trial")]
    pub trial_index: u32,
    /// Story text, kept for display only
    #[serde(default)]
    pub story: String,
    pub raw_output: String,
    pub response_time: f64,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub estimate: Option<f64>,
}

/// Per-story statistics over the usable estimates of that story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryStatistics {
    /// Number of trials, including those without a usable estimate
    pub n_trials: usize,
    pub mean: Option<f64>,
    /// Population standard deviation
    pub std: Option<f64>,
    /// Coefficient of variation (std / mean)
    pub cv: Option<f64>,
    /// Fraction of estimates within 1 point of the story mean
    #[serde(rename = "consistency_within_±1")]
    pub consistency_within_1: Option<f64>,
}

/// Statistics over every usable estimate of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStatistics {
    pub mean: f64,
    pub std: f64,
    pub p50: f64,
    pub p90: f64,
}

/// The persisted benchmark summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    /// Keyed by story id; serialized with stringified ids in ascending order
    pub stories: BTreeMap<i64, StoryStatistics>,
    /// Absent when no estimate was usable; persisted as `{}`
    #[serde(
        serialize_with = "serialize_global",
        deserialize_with = "deserialize_global",
        default
    )]
    pub global: Option<GlobalStatistics>,
}

fn serialize_global<S>(global: &Option<GlobalStatistics>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::SerializeMap;

    match global {
        Some(stats) => stats.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

fn deserialize_global<'de, D>(deserializer: D) -> Result<Option<GlobalStatistics>, D::Error>
where
    D: Deserializer<'de>,
{
    /// Only a literal `{}` means "no estimates"
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct EmptyBlock {}

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum GlobalBlock {
        Stats(GlobalStatistics),
        Empty(EmptyBlock),
    }

    Ok(match Option::<GlobalBlock>::deserialize(deserializer)? {
        Some(GlobalBlock::Stats(stats)) => Some(stats),
        Some(GlobalBlock::Empty(_)) | None => None,
    })
}
