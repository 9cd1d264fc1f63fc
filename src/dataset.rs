use crate::models::{TrialRecord, UserStory};
use anyhow::{Context, Result};
use std::path::Path;

/// Load user stories from a CSV file with `id` and `story` columns
pub fn load_stories(path: &Path) -> Result<Vec<UserStory>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open stories file: {}", path.display()))?;

    let stories = reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| {
            row.with_context(|| {
                format!("Failed to parse story row {} in {}", index + 1, path.display())
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(stories)
}

/// Write the per-trial table, replacing any previous file
pub fn write_trial_records(path: &Path, records: &[TrialRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create trial table: {}", path.display()))?;

    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write trial record to: {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush trial table: {}", path.display()))
}

/// Read a per-trial table written by [`write_trial_records`]
pub fn read_trial_records(path: &Path) -> Result<Vec<TrialRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open trial table: {}", path.display()))?;

    let records = reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| {
            row.with_context(|| {
                format!("Failed to parse trial row {} in {}", index + 1, path.display())
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn test_load_stories() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            "id,story,notes\n1,\"As a user, I want to reset my password\",x\n2,As an admin I want to export reports,\n"
        )
        .unwrap();

        let stories = load_stories(temp_file.path()).unwrap();
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].id, 1);
        assert_eq!(stories[0].story, "As a user, I want to reset my password");
        assert_eq!(stories[1].story, "As an admin I want to export reports");
    }

    #[test]
    fn test_load_stories_bad_id() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "id,story\nabc,Something\n").unwrap();

        let result = load_stories(temp_file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("story row 1"));
    }

    #[test]
    fn test_load_stories_missing_file() {
        let temp_dir = tempdir().unwrap();
        let result = load_stories(&temp_dir.path().join("missing.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_trial_table_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("results").join("model_outputs.csv");

        let records = vec![
            TrialRecord {
                story_id: 4,
                trial_index: 0,
                story: "Export, with commas".to_string(),
                raw_output: "```json\n{\"estimate\": 6, \"reasons\": [\"a\", \"b\"]}\n```".to_string(),
                response_time: 1.25,
                estimate: Some(6.0),
            },
            TrialRecord {
                story_id: 4,
                trial_index: 1,
                story: "Export, with commas".to_string(),
                raw_output: "I think it's about five".to_string(),
                response_time: 0.75,
                estimate: None,
            },
        ];

        write_trial_records(&path, &records).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("story_id,trial,story,raw_output,response_time,estimate"));

        let loaded = read_trial_records(&path).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_read_trial_records_unparsable_estimate() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            "story_id,trial,story,raw_output,response_time,estimate\n1,0,s,\"{{\"\"estimate\"\": 2}}\",0.5,large\n"
        )
        .unwrap();

        let records = read_trial_records(temp_file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].estimate, None);
        assert_eq!(records[0].raw_output, "{\"estimate\": 2}");
    }
}
