//! Configuration for Ruby code generation.

use crate::descriptor::FileDescriptor;
use crate::error::Error;

/// Configuration for Ruby code generation.
///
/// The defaults produce code that loads the stock `protogem` runtime for
/// well-known types. Both knobs exist for vendored or renamed runtimes.
#[derive(Debug, Clone)]
pub struct Config {
    /// `require` path emitted when a well-known type is referenced.
    pub(crate) runtime_require: String,
    /// Ruby module the well-known wrapper classes live under.
    pub(crate) runtime_module: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime_require: "protogem/well_known".to_string(),
            runtime_module: "ProtoGem".to_string(),
        }
    }
}

impl Config {
    /// Create a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `require` path declared when generated code references a
    /// well-known type wrapper.
    pub fn runtime_require(&mut self, path: impl Into<String>) -> &mut Self {
        self.runtime_require = path.into();
        self
    }

    /// Set the Ruby module well-known wrapper classes are resolved under.
    pub fn runtime_module(&mut self, module: impl Into<String>) -> &mut Self {
        self.runtime_module = module.into();
        self
    }

    /// Generate the Ruby source for a single file descriptor.
    pub fn generate(&self, file: &FileDescriptor) -> Result<String, Error> {
        crate::codegen::generate_file(self, file)
    }
}
