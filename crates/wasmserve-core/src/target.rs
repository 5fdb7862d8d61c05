//! Build target specification.

use std::fmt;

/// The package or module to build.
///
/// Either a path relative to the working directory (`.`, `./cmd/app`), built
/// in place using the module found there, or a remote module path such as
/// `github.com/user/app@v1.2.3`, built inside a throwaway module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetSpec(String);

impl TargetSpec {
    /// Create a target from its textual form.
    pub fn new(spec: impl Into<String>) -> Self {
        Self(spec.into())
    }

    /// The target exactly as given, including any `@version` suffix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the target is a path relative to the working directory.
    pub fn is_local(&self) -> bool {
        self.0 == "." || self.0.starts_with("./") || self.0.starts_with(".\\")
    }

    /// The target without its `@version` suffix.
    ///
    /// `go get` accepts a version but `go build` does not.
    pub fn without_version(&self) -> &str {
        match self.0.rfind('@') {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self::new(".")
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetSpec {
    fn from(spec: &str) -> Self {
        Self::new(spec)
    }
}
