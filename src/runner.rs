use crate::config::Config;
use crate::dataset;
use crate::evaluation;
use crate::extraction::extract_estimate;
use crate::inference::{ModelClient, render_prompt};
use crate::models::{SummaryReport, TrialRecord, UserStory};
use anyhow::Result;
use tracing::{debug, info, warn};

/// Main runner that orchestrates the benchmark
pub struct Runner {
    config: Config,
    client: ModelClient,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let client = ModelClient::new(&config.model)?;
        Ok(Self { config, client })
    }

    /// Query every story, persist the trial table and the summary
    pub async fn run(&self) -> Result<SummaryReport> {
        let stories = self.config.load_stories()?;
        info!(
            stories = stories.len(),
            trials = self.config.run.trials,
            model = %self.config.model.model,
            "running story point estimation benchmark"
        );

        let records = self.collect_trials(&stories).await?;

        let output_csv = &self.config.run.output_csv;
        dataset::write_trial_records(output_csv, &records)?;
        info!(path = %output_csv.display(), records = records.len(), "trial results saved");

        let summary = evaluation::assemble_summary(&records);
        let summary_path = &self.config.run.summary_path;
        evaluation::write_summary(summary_path, &summary)?;
        info!(path = %summary_path.display(), "benchmark summary saved");

        Ok(summary)
    }

    /// Run all trials for all stories, strictly one request at a time
    async fn collect_trials(&self, stories: &[UserStory]) -> Result<Vec<TrialRecord>> {
        let mut records = Vec::new();
        let total_stories = stories.len();

        for (story_index, story) in stories.iter().enumerate() {
            info!(
                "Processing story {} ({}/{}): {}",
                story.id,
                story_index + 1,
                total_stories,
                preview(&story.story)
            );

            for trial_index in 0..self.config.run.trials {
                match self.run_trial(story, trial_index).await {
                    Ok(record) => records.push(record),
                    Err(e) if self.config.run.skip_failed_trials => {
                        warn!(
                            story_id = story.id,
                            trial = trial_index,
                            error = %format!("{:#}", e),
                            "skipping failed trial"
                        );
                    }
                    Err(e) => {
                        return Err(e.context(format!(
                            "Trial {} of story {} failed",
                            trial_index, story.id
                        )));
                    }
                }
            }
        }

        Ok(records)
    }

    /// Query the model once for a story and record the outcome
    async fn run_trial(&self, story: &UserStory, trial_index: u32) -> Result<TrialRecord> {
        debug!(
            "  → Querying story {}, trial {}/{}",
            story.id,
            trial_index + 1,
            self.config.run.trials
        );

        let user_prompt = render_prompt(&self.config.run.user_prompt_template, &story.story);
        let response = self
            .client
            .query(&self.config.run.system_prompt, &user_prompt)
            .await?;

        let estimate = extract_estimate(&response.content);
        debug!(
            story_id = story.id,
            trial = trial_index,
            response_time = response.response_time,
            total_tokens = ?response.metadata.get("total_tokens"),
            ?estimate,
            "trial complete"
        );

        Ok(TrialRecord {
            story_id: story.id,
            trial_index,
            story: story.story.clone(),
            raw_output: response.content,
            response_time: response.response_time,
            estimate,
        })
    }
}

/// First 50 characters of a story for progress output
fn preview(story: &str) -> String {
    let mut short: String = story.chars().take(50).collect();
    if story.chars().count() > 50 {
        short.push_str("...");
    }
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, RunConfig};
    use std::path::Path;
    use tempfile::tempdir;

    fn create_test_config(api_endpoint: &str, output_dir: &Path) -> Config {
        Config {
            model: ModelConfig {
                api_endpoint: api_endpoint.to_string(),
                env_var_api_key: "STORY_POINT_BENCH_TEST_UNSET_KEY".to_string(),
                api_key: Some("test-token".to_string()),
                model: "test-model".to_string(),
                temperature: 0.2,
                max_tokens: 300,
                timeout_secs: 5,
            },
            run: RunConfig {
                trials: 3,
                output_csv: output_dir.join("model_outputs.csv"),
                summary_path: output_dir.join("benchmark_summary.json"),
                charts_dir: output_dir.join("charts"),
                ..RunConfig::default()
            },
            stories: vec![
                UserStory {
                    id: 2,
                    story: "As a user, I want to view my order history".to_string(),
                },
                UserStory {
                    id: 1,
                    story: "As an admin, I want to export analytics to CSV".to_string(),
                },
            ],
        }
    }

    fn completion_body(content: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000u32,
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(60);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(50)));
    }

    #[tokio::test]
    async fn test_run_full_pipeline() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(
                "```json\n{\"estimate\": 5, \"reasons\": [\"simple\"], \"confidence\": \"high\"}\n```",
            ))
            .expect(6)
            .create_async()
            .await;

        let temp_dir = tempdir().unwrap();
        let config = create_test_config(&format!("{}/v1", server.url()), temp_dir.path());
        let runner = Runner::new(config.clone()).unwrap();

        let summary = runner.run().await.unwrap();
        mock.assert_async().await;

        assert_eq!(summary.stories.len(), 2);
        let story = &summary.stories[&1];
        assert_eq!(story.n_trials, 3);
        assert_eq!(story.mean, Some(5.0));
        assert_eq!(story.std, Some(0.0));
        assert_eq!(story.consistency_within_1, Some(1.0));
        assert_eq!(summary.global.as_ref().unwrap().p90, 5.0);

        let records = dataset::read_trial_records(&config.run.output_csv).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].story_id, 2);
        assert_eq!(records[2].trial_index, 2);
        assert!(records.iter().all(|r| r.estimate == Some(5.0)));

        let stored = evaluation::read_summary(&config.run.summary_path).unwrap();
        assert_eq!(stored, summary);
    }

    #[tokio::test]
    async fn test_run_with_unparsable_responses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body("I would say roughly five points."))
            .create_async()
            .await;

        let temp_dir = tempdir().unwrap();
        let config = create_test_config(&format!("{}/v1", server.url()), temp_dir.path());
        let runner = Runner::new(config.clone()).unwrap();

        let summary = runner.run().await.unwrap();
        assert_eq!(summary.global, None);
        assert!(summary.stories.values().all(|s| s.n_trials == 3 && s.mean.is_none()));

        let content = std::fs::read_to_string(&config.run.summary_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["global"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_run_aborts_on_failed_request() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let temp_dir = tempdir().unwrap();
        let config = create_test_config(&format!("{}/v1", server.url()), temp_dir.path());
        let runner = Runner::new(config.clone()).unwrap();

        let result = runner.run().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Trial 0 of story 2 failed"));
        assert!(!config.run.summary_path.exists());
    }

    #[tokio::test]
    async fn test_run_skips_failed_requests_when_configured() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let temp_dir = tempdir().unwrap();
        let mut config = create_test_config(&format!("{}/v1", server.url()), temp_dir.path());
        config.run.skip_failed_trials = true;
        let runner = Runner::new(config.clone()).unwrap();

        let summary = runner.run().await.unwrap();
        assert!(summary.stories.is_empty());
        assert_eq!(summary.global, None);
        assert!(config.run.summary_path.exists());
    }
}
