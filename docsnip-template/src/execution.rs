//! Rewrites single-call snippets so they return their request instead of sending it.

use docsnip_core::{LanguageVariant, Result, SnippetError};
use regex::Regex;

/// Textual shape of the one client call an executable snippet is expected to make.
#[derive(Debug, Clone)]
pub struct ExecutionShape {
    language: LanguageVariant,
    /// Matches the first top-level `x = await client...` assignment; group 1 is `x`.
    call_pattern: Regex,
    await_from: &'static str,
    await_to: &'static str,
    dispatch_from: &'static str,
    dispatch_to: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenSnippet {
    pub code: String,
    pub request_variable: String,
}

impl ExecutionShape {
    pub fn for_language(language: LanguageVariant) -> Result<Self> {
        let shape = match language {
            LanguageVariant::CSharp => Self {
                language,
                call_pattern: compile(r"(?m)^var\s+(\w+)\s*=\s*await\s+graphClient\b")?,
                await_from: "await graphClient",
                await_to: "graphClient",
                dispatch_from: ".GetAsync(",
                dispatch_to: ".ToGetRequestInformation(",
            },
            LanguageVariant::JavaScript => Self {
                language,
                call_pattern: compile(r"(?m)^(?:const|let|var)\s+(\w+)\s*=\s*await\s+client\b")?,
                await_from: "await client",
                await_to: "client",
                dispatch_from: ".get()",
                dispatch_to: ".describe(\"GET\")",
            },
            other => {
                return Err(SnippetError::format(format!(
                    "{} snippets cannot be executed",
                    other
                )));
            }
        };
        Ok(shape)
    }

    pub fn language(&self) -> LanguageVariant {
        self.language
    }

    /// Identifier bound by the first top-level awaited client call.
    pub fn request_variable(&self, code: &str) -> Result<String> {
        self.call_pattern
            .captures(code)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                SnippetError::format(format!(
                    "no top-level awaited client call assignment in {} snippet",
                    self.language
                ))
            })
    }

    /// Turns the dispatching call into its request-building counterpart and returns
    /// the bound variable. Code before and after the call is left untouched.
    ///
    /// # Errors
    ///
    /// [`SnippetError::Format`] when the bound statement does not itself end in the
    /// read-only call, for example an awaited write followed by a separate read.
    pub fn rewrite(&self, code: &str) -> Result<RewrittenSnippet> {
        let found = self.call_pattern.captures(code).ok_or_else(|| {
            SnippetError::format(format!(
                "no top-level awaited client call assignment in {} snippet",
                self.language
            ))
        })?;
        let whole = found.get(0).map_or(0..0, |m| m.range());
        let request_variable = found[1].to_string();

        let statement = &code[whole.start..statement_end(code, whole.end)];
        let dispatch_at = statement.find(self.dispatch_from).ok_or_else(|| {
            SnippetError::format(format!(
                "call assigned to '{}' is not a read-only '{}' request",
                request_variable, self.dispatch_from
            ))
        })?;

        let call_end = whole.start + dispatch_at + self.dispatch_from.len();
        let rewritten_call = code[whole.start..call_end]
            .replacen(self.await_from, self.await_to, 1)
            .replacen(self.dispatch_from, self.dispatch_to, 1);

        let mut out = String::with_capacity(code.len() + 32);
        out.push_str(&code[..whole.start]);
        out.push_str(&rewritten_call);
        out.push_str(&code[call_end..]);
        out.push('\n');
        out.push_str(&format!("return {};", request_variable));

        Ok(RewrittenSnippet { code: out, request_variable })
    }
}

/// Byte offset just past the `;` closing the statement that continues at `from`.
/// Semicolons inside brackets (lambda bodies) or string literals do not count.
fn statement_end(code: &str, from: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in code[from..].char_indices() {
        if let Some(q) = quote {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if ch == q => quote = None,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => return from + offset + 1,
            _ => {}
        }
    }
    code.len()
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SnippetError::format(format!("invalid call pattern: {}", e)))
}
