/*!
 * Common test utilities for the doctrans test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use doctrans::app_config::{Config, TranslationProvider};
use doctrans::providers::mock::MockProvider;
use doctrans::tool::DocumentTranslatorTool;

/// Route `log` output to the test harness; set RUST_LOG to see it
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A document of `count` paragraphs, each exactly `len` ASCII characters long
/// (separators excluded). Paragraphs read "P<n> word word ...", about one
/// cl100k token per five characters.
pub fn paragraphs(count: usize, len: usize) -> String {
    (0..count)
        .map(|i| {
            let mut paragraph = format!("P{}", i + 1);
            while paragraph.len() < len {
                paragraph.push_str(" word");
            }
            paragraph.truncate(len);
            paragraph
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Configuration for tests: local provider, no API key needed
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.source_language = "en".to_string();
    config.target_language = "zh".to_string();
    config
}

/// Tool backed by `provider` with the test configuration
pub fn mock_tool(provider: MockProvider) -> DocumentTranslatorTool {
    DocumentTranslatorTool::new(test_config(), Arc::new(provider))
}
