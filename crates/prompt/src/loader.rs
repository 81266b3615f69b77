//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use regwise_core::config::STATE_DIR;
use regwise_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// Searches for `<id>.yml` in `.regwise/prompts/`.
///
/// # Example
/// ```no_run
/// use regwise_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "retrieve-then-read.vision")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    find_prompt(workspace_path, prompt_id)?.ok_or_else(|| {
        AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompts_dir(workspace_path).join(format!("{}.yml", prompt_id))
        ))
    })
}

/// Load a prompt definition if its file exists.
///
/// A missing file is `Ok(None)`; an unreadable or invalid one is an error.
pub fn find_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<Option<PromptDefinition>> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Looking for prompt at: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(Some(definition))
}

/// List all prompt definitions in the workspace, sorted by id.
///
/// Files that fail to parse are skipped with a warning.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<PromptDefinition>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompts = Vec::new();

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("yml") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        match find_prompt(workspace_path, stem) {
            Ok(Some(definition)) => prompts.push(definition),
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping prompt {:?}: {}", path, e),
        }
    }

    prompts.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(prompts)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, content: &str) -> PathBuf {
        let prompts_dir = prompts_dir(dir);
        fs::create_dir_all(&prompts_dir).unwrap();
        let file_path = prompts_dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn valid_prompt(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Test Prompt"
apiVersion: "1.0"
createdBy: test
template: "{{{{default_prompt}}}} Keep it short."
"#,
            id
        )
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "test.prompt", &valid_prompt("test.prompt"));

        let prompt = load_prompt(temp_dir.path(), "test.prompt").unwrap();
        assert_eq!(prompt.id, "test.prompt");
        assert_eq!(prompt.template, "{{default_prompt}} Keep it short.");
    }

    #[test]
    fn test_missing_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
        assert!(find_prompt(temp_dir.path(), "nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", "invalid: yaml: content:");

        assert!(find_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_bad_api_version() {
        let temp_dir = TempDir::new().unwrap();
        let content = valid_prompt("v").replace("\"1.0\"", "\"1\"");
        write_prompt(temp_dir.path(), "v", &content);

        let err = load_prompt(temp_dir.path(), "v").unwrap_err();
        assert!(err.to_string().contains("Invalid apiVersion"));
    }

    #[test]
    fn test_list_prompts_sorted_and_skips_invalid() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "zeta", &valid_prompt("zeta"));
        write_prompt(temp_dir.path(), "alpha", &valid_prompt("alpha"));
        write_prompt(temp_dir.path(), "broken", "invalid: yaml: content:");

        let prompts = list_prompts(temp_dir.path()).unwrap();
        let ids: Vec<&str> = prompts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_list_prompts_without_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_prompts(temp_dir.path()).unwrap().is_empty());
    }
}
