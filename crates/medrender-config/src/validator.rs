//! Configuration validation.

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_browser(config, &mut result);
        Self::validate_render(config, &mut result);
        Self::validate_retry(config, &mut result);
        Self::validate_toc(config, &mut result);

        result
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        if config.browser.debug_port == 0 {
            result.add_error(ValidationError::new(
                "browser.debug_port",
                "Port cannot be 0",
            ));
        }

        if config.browser.launch_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "browser.launch_timeout_secs",
                "launch_timeout_secs must be greater than 0",
            ));
        }

        if let Some(ref path) = config.browser.chrome_path {
            if !path.exists() {
                result.add_warning(ValidationWarning::new(
                    "browser.chrome_path",
                    format!("Chrome binary does not exist: {:?}", path),
                ));
            }
        }

        if !config.browser.headless {
            result.add_warning(ValidationWarning::new(
                "browser.headless",
                "Running headed; print layout may differ from production",
            ));
        }
    }

    fn validate_render(config: &Config, result: &mut ValidationResult) {
        let render = &config.render;

        if render.viewport_width == 0 || render.viewport_height == 0 {
            result.add_error(ValidationError::new(
                "render.viewport",
                "viewport dimensions must be greater than 0",
            ));
        }

        if render.readiness_poll_ms == 0 {
            result.add_error(ValidationError::new(
                "render.readiness_poll_ms",
                "readiness_poll_ms must be greater than 0",
            ));
        }

        if render.readiness_poll_ms > render.readiness_timeout_ms {
            result.add_warning(ValidationWarning::new(
                "render.readiness_poll_ms",
                "poll interval exceeds the readiness timeout; readiness is checked once",
            ));
        }

        if render.load_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "render.load_timeout_secs",
                "load_timeout_secs must be greater than 0",
            ));
        }

        if render.default_filename.trim().is_empty() {
            result.add_error(ValidationError::new(
                "render.default_filename",
                "default_filename cannot be empty",
            ));
        }
    }

    fn validate_retry(config: &Config, result: &mut ValidationResult) {
        if config.retry.max_attempts == 0 {
            result.add_error(ValidationError::new(
                "retry.max_attempts",
                "max_attempts must be at least 1",
            ));
        }

        if config.retry.max_attempts > 10 {
            result.add_warning(ValidationWarning::new(
                "retry.max_attempts",
                "max_attempts is very high (>10); failing renders will hold requests for a long time",
            ));
        }
    }

    fn validate_toc(config: &Config, result: &mut ValidationResult) {
        let toc = &config.toc;
        let required = [
            ("toc.page_selector", &toc.page_selector),
            ("toc.anchor_selector", &toc.anchor_selector),
            ("toc.entry_selector", &toc.entry_selector),
            ("toc.target_attribute", &toc.target_attribute),
            ("toc.label_selector", &toc.label_selector),
        ];
        for (path, value) in required {
            if value.trim().is_empty() {
                result.add_error(ValidationError::new(path, "selector cannot be empty"));
            }
        }

        if toc.missing_label.is_empty() {
            result.add_warning(ValidationWarning::new(
                "toc.missing_label",
                "empty missing_label makes unresolved TOC entries invisible",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
