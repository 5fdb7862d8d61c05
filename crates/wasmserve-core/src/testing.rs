//! A scripted stand-in for the `go` program.
//!
//! [`FakeToolchain`] writes a small POSIX shell script that understands the
//! handful of subcommands wasmserve issues (`env GOROOT`, `list`, `mod init`,
//! `get`, `build`) and records every invocation, so builder, resolver and
//! end-to-end tests run without a Go installation.
//!
//! Builds of any target whose name contains `broken` fail with a compiler
//! style diagnostic on standard error.

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Bytes written by a successful fake build: the wasm magic and version.
pub const FAKE_WASM: &[u8] = b"\0asm\x01\0\0\0";

const SCRIPT: &str = r#"#!/bin/sh
root='@ROOT@'
printf '%s|%s|%s|%s\n' "$GOOS" "$GOARCH" "$(pwd -P)" "$*" >> "$root/calls.log"
case "$1" in
env)
    echo "$root/goroot"
    ;;
list)
    cat "$root/version"
    ;;
mod)
    echo "go: creating new go.mod: module $3" >&2
    echo "module $3" > go.mod
    ;;
get)
    echo "go: added $2" >&2
    ;;
build)
    out=""
    last=""
    while [ $# -gt 0 ]; do
        if [ "$1" = "-o" ]; then
            out="$2"
            shift
        fi
        last="$1"
        shift
    done
    case "$last" in
    *broken*)
        echo "$last/main.go:3:5: undefined: missingSymbol" >&2
        exit 1
        ;;
    esac
    printf '\000asm\001\000\000\000' > "$out"
    ;;
esac
exit 0
"#;

/// One recorded invocation of the fake toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainCall {
    /// `GOOS` seen by the process.
    pub goos: String,
    /// `GOARCH` seen by the process.
    pub goarch: String,
    /// Working directory of the process.
    pub cwd: PathBuf,
    /// Arguments joined by single spaces.
    pub args: String,
}

/// A temporary directory holding a fake `go` program, its GOROOT and a
/// module directory to build in.
pub struct FakeToolchain {
    dir: TempDir,
    program: PathBuf,
    workdir: PathBuf,
}

impl FakeToolchain {
    /// Create the script, an empty GOROOT, and a work directory.
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("fake-go-").tempdir()?;
        let root = dir.path();

        fs::create_dir_all(root.join("goroot"))?;
        fs::create_dir_all(root.join("work"))?;
        fs::write(root.join("work").join("go.mod"), "module example.com/app\n")?;
        fs::write(root.join("version"), "go1.22\n")?;
        fs::write(root.join("calls.log"), "")?;

        let program = root.join("go");
        let script = SCRIPT.replace("@ROOT@", &root.display().to_string());
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o755)
            .open(&program)?;
        file.write_all(script.as_bytes())?;
        file.sync_all()?;
        drop(file);

        let workdir = root.join("work");
        Ok(Self {
            dir,
            program,
            workdir,
        })
    }

    /// Path of the fake `go` program.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// What the fake reports for `go env GOROOT`.
    pub fn goroot(&self) -> PathBuf {
        self.dir.path().join("goroot")
    }

    /// A directory containing a `go.mod`, suitable as the working root.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Change what `go list` reports as the module's Go version.
    pub fn set_module_version(&self, version: &str) -> io::Result<()> {
        fs::write(self.dir.path().join("version"), format!("{version}\n"))
    }

    /// Place a runtime shim under GOROOT at `relative` (e.g. `misc/wasm/wasm_exec.js`).
    pub fn install_shim(&self, relative: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.goroot().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Every invocation so far, in order.
    pub fn calls(&self) -> Vec<ToolchainCall> {
        let log = fs::read_to_string(self.dir.path().join("calls.log")).unwrap_or_default();
        log.lines()
            .filter_map(|line| {
                let mut parts = line.splitn(4, '|');
                Some(ToolchainCall {
                    goos: parts.next()?.to_string(),
                    goarch: parts.next()?.to_string(),
                    cwd: PathBuf::from(parts.next()?),
                    args: parts.next()?.to_string(),
                })
            })
            .collect()
    }

    /// Number of `go build` invocations so far.
    pub fn build_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.args.starts_with("build"))
            .count()
    }
}
