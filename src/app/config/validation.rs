use super::{Config, ConfigError};

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate block size
        if self.sync_interval == 0 {
            return Err(ConfigError::InvalidConfig(
                "Sync interval must be greater than 0".to_string(),
            ));
        }

        // Ingest mode needs somewhere to write
        if !self.dump && self.output.is_none() {
            return Err(ConfigError::InvalidConfig(
                "An output path is required unless --dump is given (use \"-\" for stdout)"
                    .to_string(),
            ));
        }

        if let Some(input) = &self.input
            && !input.is_file()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Input file does not exist: {}",
                input.display()
            )));
        }

        // Validate output parent directory
        if let Some(output) = &self.output
            && !self.writes_to_stdout()
            && let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Output directory does not exist: {}",
                parent.display()
            )));
        }

        Ok(())
    }
}
