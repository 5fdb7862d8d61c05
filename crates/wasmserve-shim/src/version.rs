//! Go version tokens.
//!
//! Turns tokens like `go1.23.4` into the archive location of the matching
//! `wasm_exec.js`.

use std::sync::LazyLock;

use regex::Regex;

use wasmserve_common::ServeError;

/// Default root of the Go source archive.
pub const DEFAULT_ARCHIVE_URL: &str = "https://go.googlesource.com/go/+/refs/tags";

static GO_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^go(\d+)\.(\d+)(\.(\d+))?").expect("valid regex"));

/// A parsed Go version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version, if the token had one.
    pub patch: Option<u32>,
    token: String,
}

impl GoVersion {
    /// Parse a token of the form `go<major>.<minor>[.<patch>]`.
    ///
    /// Only the prefix has to match; anything after it (such as `rc1`) is
    /// kept in the tag.
    pub fn parse(token: &str) -> Result<Self, ServeError> {
        let caps = GO_VERSION
            .captures(token)
            .ok_or_else(|| ServeError::invalid_version(token))?;

        let number = |i: usize| -> Result<Option<u32>, ServeError> {
            caps.get(i)
                .map(|m| m.as_str().parse().map_err(|_| ServeError::invalid_version(token)))
                .transpose()
        };

        Ok(Self {
            major: number(1)?.ok_or_else(|| ServeError::invalid_version(token))?,
            minor: number(2)?.ok_or_else(|| ServeError::invalid_version(token))?,
            patch: number(4)?,
            token: token.to_string(),
        })
    }

    /// The release tag in the archive.
    ///
    /// `go.mod` may say `go1.22`, but from 1.22 on the first release is
    /// tagged `go1.22.0`.
    pub fn tag(&self) -> String {
        if self.minor >= 22 && self.patch.is_none() {
            format!("{}.0", self.token)
        } else {
            self.token.clone()
        }
    }

    /// The top-level directory holding `wasm/wasm_exec.js` for this release.
    ///
    /// The file moved from `misc/wasm` to `lib/wasm` in Go 1.24.
    pub fn wasm_dir(&self) -> &'static str {
        if (self.major, self.minor) <= (1, 23) { "misc" } else { "lib" }
    }

    /// Location of `wasm_exec.js` below an archive root.
    pub fn shim_url(&self, base: &str) -> String {
        format!(
            "{}/{}/{}/wasm/wasm_exec.js?format=TEXT",
            base.trim_end_matches('/'),
            self.tag(),
            self.wasm_dir()
        )
    }
}

/// URL of `wasm_exec.js` in the public Go source archive for `version`.
pub fn wasm_exec_js_url(version: &str) -> Result<String, ServeError> {
    wasm_exec_js_url_with_base(DEFAULT_ARCHIVE_URL, version)
}

/// URL of `wasm_exec.js` below an alternate archive root.
pub fn wasm_exec_js_url_with_base(base: &str, version: &str) -> Result<String, ServeError> {
    GoVersion::parse(version).map(|v| v.shim_url(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASES: &[(&str, &str)] = &[
        ("go1.16", "go1.16/misc"),
        ("go1.21", "go1.21/misc"),
        ("go1.22", "go1.22.0/misc"),
        ("go1.22.0", "go1.22.0/misc"),
        ("go1.22.1", "go1.22.1/misc"),
        ("go1.23", "go1.23.0/misc"),
        ("go1.23.0", "go1.23.0/misc"),
        ("go1.23.1", "go1.23.1/misc"),
        ("go1.24", "go1.24.0/lib"),
        ("go1.24.0", "go1.24.0/lib"),
        ("go1.24.1", "go1.24.1/lib"),
        ("go2.23", "go2.23.0/lib"),
        ("go2.23.0", "go2.23.0/lib"),
        ("go2.23.1", "go2.23.1/lib"),
        ("go2.24", "go2.24.0/lib"),
        ("go2.24.0", "go2.24.0/lib"),
        ("go2.24.1", "go2.24.1/lib"),
    ];

    fn expected(path: &str) -> String {
        format!("https://go.googlesource.com/go/+/refs/tags/{path}/wasm/wasm_exec.js?format=TEXT")
    }

    #[test]
    fn test_wasm_exec_js_url() {
        for (version, path) in CASES {
            assert_eq!(
                wasm_exec_js_url(version).unwrap(),
                expected(path),
                "version {version}"
            );
        }
    }

    #[test]
    fn test_invalid_version() {
        let err = wasm_exec_js_url("invalid").unwrap_err();
        assert!(matches!(err, ServeError::InvalidVersion { ref version } if version == "invalid"));

        assert!(GoVersion::parse("").is_err());
        assert!(GoVersion::parse("go").is_err());
        assert!(GoVersion::parse("go1").is_err());
        assert!(GoVersion::parse("1.22").is_err());
    }

    #[test]
    fn test_directory_boundary() {
        assert_eq!(GoVersion::parse("go1.21").unwrap().wasm_dir(), "misc");
        assert_eq!(GoVersion::parse("go1.23").unwrap().wasm_dir(), "misc");
        assert_eq!(GoVersion::parse("go1.23.9").unwrap().wasm_dir(), "misc");
        assert_eq!(GoVersion::parse("go1.24").unwrap().wasm_dir(), "lib");
        assert_eq!(GoVersion::parse("go2.0").unwrap().wasm_dir(), "lib");
        assert_eq!(GoVersion::parse("go2.23").unwrap().wasm_dir(), "lib");
    }

    #[test]
    fn test_missing_patch_normalized() {
        let short = wasm_exec_js_url("go1.22").unwrap();
        let full = wasm_exec_js_url("go1.22.0").unwrap();
        let next = wasm_exec_js_url("go1.22.1").unwrap();

        assert_eq!(short, full);
        assert_eq!(next, full.replace("go1.22.0", "go1.22.1"));

        // Before 1.22 the first release had no `.0` tag.
        assert_eq!(GoVersion::parse("go1.21").unwrap().tag(), "go1.21");
    }

    #[test]
    fn test_parse_components() {
        let v = GoVersion::parse("go1.23.4").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 23, Some(4)));

        let v = GoVersion::parse("go1.22").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 22, None));
    }

    #[test]
    fn test_deterministic() {
        for (version, _) in CASES {
            assert_eq!(
                wasm_exec_js_url(version).unwrap(),
                wasm_exec_js_url(version).unwrap()
            );
        }
    }

    #[test]
    fn test_alternate_base() {
        let url = wasm_exec_js_url_with_base("http://127.0.0.1:9000/tags/", "go1.24.2").unwrap();
        assert_eq!(
            url,
            "http://127.0.0.1:9000/tags/go1.24.2/lib/wasm/wasm_exec.js?format=TEXT"
        );
    }
}
