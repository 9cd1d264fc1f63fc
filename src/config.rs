use crate::dataset;
use crate::models::UserStory;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Connection and sampling settings for the model under test
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// OpenAI-compatible API endpoint
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    /// Environment variable name containing the API key
    #[serde(default = "default_env_var_api_key")]
    pub env_var_api_key: String,
    /// Static bearer token used when the environment variable is unset
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model to query for estimates
    #[serde(default = "default_model")]
    pub model: String,
    /// Temperature for response generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens for response generation
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            env_var_api_key: default_env_var_api_key(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Settings for one benchmark run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Number of queries per story
    #[serde(default = "default_trials")]
    pub trials: u32,
    /// Optional CSV file of stories with `id` and `story` columns
    #[serde(default)]
    pub stories_csv: Option<PathBuf>,
    /// Per-trial table
    #[serde(default = "default_output_csv")]
    pub output_csv: PathBuf,
    /// Benchmark summary JSON
    #[serde(default = "default_summary_path")]
    pub summary_path: PathBuf,
    /// Directory for rendered charts
    #[serde(default = "default_charts_dir")]
    pub charts_dir: PathBuf,
    /// Skip trials whose request fails instead of aborting the run
    #[serde(default)]
    pub skip_failed_trials: bool,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// User prompt; `{story}` is replaced with the story text
    #[serde(default = "default_user_prompt_template")]
    pub user_prompt_template: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            stories_csv: None,
            output_csv: default_output_csv(),
            summary_path: default_summary_path(),
            charts_dir: default_charts_dir(),
            skip_failed_trials: false,
            system_prompt: default_system_prompt(),
            user_prompt_template: default_user_prompt_template(),
        }
    }
}

fn default_api_endpoint() -> String {
    "http://127.0.0.1:1234/v1".to_string()
}

fn default_env_var_api_key() -> String {
    "LMSTUDIO_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-oss-7b-instruct".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    300
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_trials() -> u32 {
    5
}

fn default_output_csv() -> PathBuf {
    PathBuf::from("results/model_outputs.csv")
}

fn default_summary_path() -> PathBuf {
    PathBuf::from("results/benchmark_summary.json")
}

fn default_charts_dir() -> PathBuf {
    PathBuf::from("charts")
}

fn default_system_prompt() -> String {
    "You are an experienced Agile coach. Give a concise, structured JSON output.".to_string()
}

fn default_user_prompt_template() -> String {
    concat!(
        "Estimate story points (integer 1-10) for the user story below. ",
        "Return valid JSON only with keys: estimate (int), reasons (list of short strings), ",
        "similar_examples (short string), confidence (low|med|high).\n\n",
        "User story: \"{story}\"\n",
        "Be concise."
    )
    .to_string()
}

/// Root configuration of a run file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub run: RunConfig,
    /// Stories declared inline in the run file
    #[serde(default)]
    pub stories: Vec<UserStory>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check settings that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if self.run.trials == 0 {
            anyhow::bail!("run.trials must be at least 1");
        }
        if self.model.max_tokens == 0 || self.model.max_tokens > u32::from(u16::MAX) {
            anyhow::bail!("model.max_tokens must be between 1 and {}", u16::MAX);
        }
        if !self.run.user_prompt_template.contains("{story}") {
            anyhow::bail!("run.user_prompt_template must contain the {{story}} placeholder");
        }
        Ok(())
    }

    /// Inline stories followed by those from `run.stories_csv`
    pub fn load_stories(&self) -> Result<Vec<UserStory>> {
        let mut stories = self.stories.clone();

        if let Some(path) = &self.run.stories_csv {
            stories.extend(dataset::load_stories(path)?);
        }

        if stories.is_empty() {
            anyhow::bail!("No user stories configured: add [[stories]] or set run.stories_csv");
        }

        Ok(stories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parsing() {
        let toml_content = r#"
[model]
api_endpoint = "http://localhost:8080/v1"
env_var_api_key = "BENCH_KEY"
api_key = "static-token"
model = "qwen2.5-7b-instruct"
temperature = 0.5
max_tokens = 200
timeout_secs = 30

[run]
trials = 3
output_csv = "out/trials.csv"
summary_path = "out/summary.json"
charts_dir = "out/charts"
skip_failed_trials = true
system_prompt = "Be brief."
user_prompt_template = "Estimate: {story}"

[[stories]]
id = 1
story = "As a user, I want to log in"

[[stories]]
id = 2
story = "As an admin, I want to export reports"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.model.api_endpoint, "http://localhost:8080/v1");
        assert_eq!(config.model.api_key.as_deref(), Some("static-token"));
        assert_eq!(config.model.model, "qwen2.5-7b-instruct");
        assert_eq!(config.model.temperature, 0.5);
        assert_eq!(config.model.max_tokens, 200);
        assert_eq!(config.model.timeout_secs, 30);
        assert_eq!(config.run.trials, 3);
        assert_eq!(config.run.output_csv, PathBuf::from("out/trials.csv"));
        assert!(config.run.skip_failed_trials);
        assert_eq!(config.stories.len(), 2);
        assert_eq!(config.stories[1].id, 2);
    }

    #[test]
    fn test_config_defaults() {
        let toml_content = r#"
[[stories]]
id = 1
story = "As a user, I want to view my orders"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.model.api_endpoint, "http://127.0.0.1:1234/v1");
        assert_eq!(config.model.env_var_api_key, "LMSTUDIO_API_KEY");
        assert_eq!(config.model.api_key, None);
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.max_tokens, 300);
        assert_eq!(config.model.timeout_secs, 60);
        assert_eq!(config.run.trials, 5);
        assert_eq!(config.run.stories_csv, None);
        assert_eq!(
            config.run.summary_path,
            PathBuf::from("results/benchmark_summary.json")
        );
        assert!(!config.run.skip_failed_trials);
        assert!(config.run.user_prompt_template.contains("{story}"));
    }

    #[test]
    fn test_config_rejects_zero_trials() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[run]\ntrials = 0\n").unwrap();

        let result = Config::from_file(temp_file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("trials"));
    }

    #[test]
    fn test_config_rejects_out_of_range_max_tokens() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[model]\nmax_tokens = 70000\n").unwrap();

        let result = Config::from_file(temp_file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("max_tokens"));

        let mut config = Config::default();
        config.model.max_tokens = u32::from(u16::MAX);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_template_without_placeholder() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[run]\nuser_prompt_template = \"Estimate it\"\n").unwrap();

        let result = Config::from_file(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[run\ntrials = ").unwrap();

        let result = Config::from_file(temp_file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_load_stories_inline_then_csv() {
        let mut csv_file = NamedTempFile::new().unwrap();
        write!(csv_file, "id,story\n5,\"As a buyer, I want to pay online\"\n").unwrap();

        let mut config = Config::default();
        config.stories.push(UserStory {
            id: 1,
            story: "As a user, I want to browse products".to_string(),
        });
        config.run.stories_csv = Some(csv_file.path().to_path_buf());

        let stories = config.load_stories().unwrap();
        let ids: Vec<i64> = stories.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn test_bundled_run_file() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let mut config = Config::from_file(&root.join("bench.toml")).unwrap();
        config.run.stories_csv = config.run.stories_csv.map(|p| root.join(p));

        let stories = config.load_stories().unwrap();
        assert_eq!(stories.len(), 8);
        assert_eq!(config.model.api_key.as_deref(), Some("lm-studio"));
    }

    #[test]
    fn test_load_stories_none_configured() {
        let config = Config::default();
        assert!(config.load_stories().is_err());
    }
}
