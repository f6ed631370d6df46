//! Structured output for reports and configuration.

use std::{fs::File, io::Write};

use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// YAML format (default).
    #[default]
    Yaml,
    /// JSON format.
    Json,
}

/// Output configuration.
pub struct Output {
    pub format: OutputFormat,
    pub file: Option<String>,
}

impl Output {
    pub fn new(format: OutputFormat, file: Option<String>) -> Self {
        Self { format, file }
    }

    /// Renders `value` and writes it to the file, or stdout when unset.
    pub fn write<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let output = self.render(value)?;
        self.write_text(&output)
    }

    /// Writes pre-formatted text to the same destination as [`write`](Self::write).
    pub fn write_text(&self, text: &str) -> anyhow::Result<()> {
        match &self.file {
            Some(path) => {
                let mut file = File::create(path)?;
                file.write_all(text.as_bytes())?;
                if !text.ends_with('\n') {
                    file.write_all(b"\n")?;
                }
            }
            None => {
                println!("{}", text.trim_end_matches('\n'));
            }
        }

        Ok(())
    }

    fn render<T: Serialize>(&self, value: &T) -> anyhow::Result<String> {
        Ok(match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        })
    }
}
