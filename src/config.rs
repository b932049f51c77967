//! Dispatch core configuration.

/// The options this core recognizes. Loading these from an external source
/// (files, env vars, CLI flags) is out of scope; this is the in-memory
/// representation the dispatcher and error chain consult.
#[derive(Clone, Debug)]
pub struct Configuration {
  max_error_recovery_attempts: usize,
  implement_missing_options: bool,
  ignore_rejected_informational: bool,
}

impl Default for Configuration {
  fn default() -> Self {
    Configuration { max_error_recovery_attempts: 16, implement_missing_options: false, ignore_rejected_informational: false }
  }
}

impl Configuration {
  /// Starts a builder with the crate's defaults.
  pub fn builder() -> ConfigurationBuilder {
    ConfigurationBuilder(Configuration::default())
  }

  /// Cap on per-exchange rethrows through the error chain.
  pub fn max_error_recovery_attempts(&self) -> usize {
    self.max_error_recovery_attempts
  }

  /// Whether an unmatched `OPTIONS` request should synthesize a 204 rather
  /// than a 405.
  pub fn implement_missing_options(&self) -> bool {
    self.implement_missing_options
  }

  /// Whether 1xx responses should be suppressed for clients whose protocol
  /// support is known not to include them.
  pub fn ignore_rejected_informational(&self) -> bool {
    self.ignore_rejected_informational
  }
}

/// Staged builder for `Configuration`, in the style of the crate's
/// `ServerBuilder`/`RouterBuilder`: a single mutable value consumed by
/// value, `with_*` methods returning `Self`, and a terminal `build()`.
pub struct ConfigurationBuilder(Configuration);

impl ConfigurationBuilder {
  /// Sets the per-exchange error-recovery rethrow cap.
  pub fn with_max_error_recovery_attempts(mut self, max: usize) -> Self {
    self.0.max_error_recovery_attempts = max;
    self
  }

  /// Sets whether unmatched `OPTIONS` requests synthesize a 204.
  pub fn with_implement_missing_options(mut self, value: bool) -> Self {
    self.0.implement_missing_options = value;
    self
  }

  /// Sets whether 1xx responses are suppressed for pre-HTTP/1.1 clients.
  pub fn with_ignore_rejected_informational(mut self, value: bool) -> Self {
    self.0.ignore_rejected_informational = value;
    self
  }

  /// Finishes the builder.
  pub fn build(self) -> Configuration {
    self.0
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn defaults_match_spec() {
    let config = Configuration::default();
    assert_eq!(config.max_error_recovery_attempts(), 16);
    assert!(!config.implement_missing_options());
    assert!(!config.ignore_rejected_informational());
  }

  #[test]
  fn builder_overrides_defaults() {
    let config = Configuration::builder().with_max_error_recovery_attempts(4).with_implement_missing_options(true).build();
    assert_eq!(config.max_error_recovery_attempts(), 4);
    assert!(config.implement_missing_options());
  }
}
