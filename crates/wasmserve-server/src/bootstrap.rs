//! The synthesized page served when no `index.html` exists.
//!
//! The page loads `wasm_exec.js`, fetches and starts the artifact with the
//! configured argument vector and environment, then long-polls `_wait` and
//! reloads itself when that returns. A failed artifact fetch shows the
//! response body (the compiler diagnostics) instead.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<script src="wasm_exec.js"></script>
<script>
(async () => {
  const resp = await fetch(@ARTIFACT@);
  if (!resp.ok) {
    const pre = document.createElement('pre');
    pre.innerText = await resp.text();
    document.body.appendChild(pre);
  } else {
    const src = await resp.arrayBuffer();
    const go = new Go();
    const result = await WebAssembly.instantiate(src, go.importObject);
    go.argv = @ARGV@;
    go.env = @ENV@;
    go.run(result.instance);
  }
  const reload = await fetch('_wait');
  // '_wait' returns once '_notify' has been requested.
  if (reload.ok) {
    location.reload();
  }
})();
</script>
"#;

/// Inputs to one rendering of the page.
#[derive(Debug, Clone)]
pub struct BootstrapPage<'a> {
    /// URL the page fetches the artifact from, relative to the page.
    pub artifact_url: &'a str,
    /// Argument vector handed to the program.
    pub argv: &'a [String],
    /// Environment handed to the program.
    pub env: &'a BTreeMap<String, String>,
}

impl BootstrapPage<'_> {
    /// Render the HTML.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        let artifact = js_json(self.artifact_url)?;
        let argv = js_json(self.argv)?;
        let env = js_json(self.env)?;

        // Placeholders sit between `@` pairs; values are never rescanned.
        let mut html = String::with_capacity(TEMPLATE.len() + argv.len() + env.len());
        for (i, piece) in TEMPLATE.split('@').enumerate() {
            let value = match piece {
                _ if i % 2 == 0 => piece,
                "ARTIFACT" => artifact.as_str(),
                "ARGV" => argv.as_str(),
                "ENV" => env.as_str(),
                other => other,
            };
            html.push_str(value);
        }
        Ok(html)
    }
}

/// Serialize `value` as JSON that is safe to embed in an inline script.
///
/// Characters that could close the script element, start an HTML entity,
/// or end a JavaScript line inside a string literal are replaced with
/// `\u` escapes. They can only occur inside JSON strings, where the
/// escapes decode back to the same characters.
pub fn js_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\'' => out.push_str("\\u0027"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// The argument vector a program sees.
///
/// The first element is the artifact's path; the rest are the
/// command-line arguments after the target.
pub fn program_argv(args: &[String], artifact: &Path) -> Vec<String> {
    let mut argv = Vec::with_capacity(args.len().max(1));
    argv.push(artifact.display().to_string());
    argv.extend(args.iter().skip(1).cloned());
    argv
}

/// A snapshot of this process's environment, lossily converted to UTF-8.
pub fn process_env() -> BTreeMap<String, String> {
    std::env::vars_os()
        .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
        .collect()
}
