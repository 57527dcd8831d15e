//! Per-language host programs that snippets are embedded into.
//!
//! Every scaffold has exactly one auth marker line and one code marker line. The
//! marker's leading whitespace is the indentation unit the inserted text receives.

use crate::execution::ExecutionShape;
use crate::extract::{extract_code_block, indent_lines, normalize_code, numbered_listing};
use docsnip_core::{Diagnostic, LanguageVariant, Result, SnippetError, TestKind};
use tracing::debug;

/// Environment variable selecting `dry` (describe the request) or `live` mode.
pub const MODE_ENV_VAR: &str = "SNIPPET_MODE";

/// Environment variable carrying the bearer token for live runs.
pub const ACCESS_TOKEN_ENV_VAR: &str = "SNIPPET_ACCESS_TOKEN";

const CSHARP_COMPILE: &str = r#"using System;
using System.Collections.Generic;
using System.IO;
using System.Threading.Tasks;
using Microsoft.Graph;
using Microsoft.Graph.Models;
using Microsoft.Kiota.Abstractions;

public class GraphSdkSnippet
{
    public static async Task Main(string[] args)
    {
        //insert-auth-here
        //insert-code-here
    }
}
"#;

const CSHARP_EXECUTE: &str = r#"using System;
using System.Collections.Generic;
using System.IO;
using System.Text.Json;
using System.Threading.Tasks;
using Microsoft.Graph;
using Microsoft.Graph.Models;
using Microsoft.Kiota.Abstractions;

public class GraphSdkSnippet
{
    private static async Task<RequestInformation> GetRequestAsync(GraphServiceClient graphClient)
    {
        //insert-code-here
    }

    public static async Task<int> Main(string[] args)
    {
        //insert-auth-here
        var request = await GetRequestAsync(graphClient);
        if (Environment.GetEnvironmentVariable("SNIPPET_MODE") == "dry")
        {
            Console.WriteLine(JsonSerializer.Serialize(new { method = request.HttpMethod.ToString(), url = request.URI.ToString() }));
            return 0;
        }
        await graphClient.RequestAdapter.SendPrimitiveAsync<Stream>(request);
        return 0;
    }
}
"#;

const CSHARP_COMPILE_AUTH: &str =
    "var graphClient = new GraphServiceClient(new AnonymousAuthenticationProvider());";

const CSHARP_EXECUTE_AUTH: &str = r#"var token = Environment.GetEnvironmentVariable("SNIPPET_ACCESS_TOKEN") ?? string.Empty;
var graphClient = new GraphServiceClient(new BaseBearerTokenAuthenticationProvider(new StaticTokenProvider(token)));"#;

const JAVA_COMPILE: &str = r#"import com.microsoft.graph.models.*;
import com.microsoft.graph.serviceclient.GraphServiceClient;
import com.microsoft.kiota.authentication.AnonymousAuthenticationProvider;
import java.util.*;

public class GraphSdkSnippet {
    public static void main(String[] args) throws Exception {
        //insert-auth-here
        //insert-code-here
    }
}
"#;

const JAVA_COMPILE_AUTH: &str =
    "GraphServiceClient graphClient = new GraphServiceClient(new AnonymousAuthenticationProvider());";

const JAVASCRIPT_COMPILE: &str = r#"const { Client } = require("@microsoft/microsoft-graph-client");

async function main() {
    //insert-auth-here
    //insert-code-here
}

main();
"#;

const JAVASCRIPT_EXECUTE: &str = r#"const { Client } = require("@microsoft/microsoft-graph-client");
const { RequestRecorder } = require("./request-recorder");

async function getRequest(client) {
    //insert-code-here
}

async function main() {
    //insert-auth-here
    const request = await getRequest(client);
    if (process.env.SNIPPET_MODE === "dry") {
        console.log(JSON.stringify({ method: request.method, url: request.url }));
        return;
    }
    await request.send();
}

main().catch((e) => { console.error(e); process.exit(1); });
"#;

/// Module the JavaScript execution scaffold loads as `./request-recorder`.
///
/// Wraps a graph client so request chains stay chainable and `.describe(method)`
/// yields `{ method, url, send() }` instead of dispatching.
pub const JAVASCRIPT_REQUEST_RECORDER: &str = r#"class RequestRecorder {
    constructor(client) {
        this.client = client;
    }

    api(path) {
        const request = this.client.api(path);
        const recorder = new Proxy(request, {
            get(target, prop, receiver) {
                if (prop === "describe") {
                    return (method) => ({
                        method,
                        url: target.buildFullUrl(),
                        send: () => target[method.toLowerCase()](),
                    });
                }
                const value = Reflect.get(target, prop, receiver);
                if (typeof value !== "function") {
                    return value;
                }
                return (...args) => {
                    const result = value.apply(target, args);
                    return result === target ? recorder : result;
                };
            },
        });
        return recorder;
    }
}

module.exports = { RequestRecorder };
"#;

/// Files a project needs next to the program source, as `(file name, content)`.
pub fn support_files(language: LanguageVariant) -> &'static [(&'static str, &'static str)] {
    match language {
        LanguageVariant::JavaScript => &[("request-recorder.js", JAVASCRIPT_REQUEST_RECORDER)],
        _ => &[],
    }
}

const JAVASCRIPT_COMPILE_AUTH: &str =
    "const client = Client.init({ authProvider: (done) => done(null, \"\") });";

const JAVASCRIPT_EXECUTE_AUTH: &str = r#"const token = process.env.SNIPPET_ACCESS_TOKEN || "";
const client = new RequestRecorder(Client.init({ authProvider: (done) => done(null, token) }));"#;

const POWERSHELL_COMPILE: &str = r#"Set-StrictMode -Version Latest
$ErrorActionPreference = "Stop"

function Invoke-Snippet {
    #insert-auth-here
    #insert-code-here
}
"#;

const POWERSHELL_COMPILE_AUTH: &str = "Import-Module Microsoft.Graph.Authentication";

const GO_COMPILE: &str = r#"package main

import (
	"context"

	msgraphsdk "github.com/microsoftgraph/msgraph-sdk-go"
	graphmodels "github.com/microsoftgraph/msgraph-sdk-go/models"
)

var _ = context.Background
var _ graphmodels.Userable

func main() {
	//insert-auth-here
	//insert-code-here
}
"#;

const GO_COMPILE_AUTH: &str =
    "graphClient, _ := msgraphsdk.NewGraphServiceClientWithCredentials(nil, nil)";

/// A fixed host program for one language variant and test kind.
#[derive(Debug, Clone, Copy)]
pub struct Scaffold {
    pub language: LanguageVariant,
    pub kind: TestKind,
    template: &'static str,
    auth: &'static str,
    auth_marker: &'static str,
    code_marker: &'static str,
}

impl Scaffold {
    /// Looks up the scaffold for a language variant and test kind.
    ///
    /// # Errors
    ///
    /// Execution scaffolds only exist for variants with an [`ExecutionShape`].
    pub fn for_language(language: LanguageVariant, kind: TestKind) -> Result<Self> {
        let (template, auth) = match (language, kind) {
            (LanguageVariant::CSharp, TestKind::Compilation) => (CSHARP_COMPILE, CSHARP_COMPILE_AUTH),
            (LanguageVariant::CSharp, TestKind::Execution) => (CSHARP_EXECUTE, CSHARP_EXECUTE_AUTH),
            (LanguageVariant::Java, TestKind::Compilation) => (JAVA_COMPILE, JAVA_COMPILE_AUTH),
            (LanguageVariant::JavaScript, TestKind::Compilation) => {
                (JAVASCRIPT_COMPILE, JAVASCRIPT_COMPILE_AUTH)
            }
            (LanguageVariant::JavaScript, TestKind::Execution) => {
                (JAVASCRIPT_EXECUTE, JAVASCRIPT_EXECUTE_AUTH)
            }
            (LanguageVariant::PowerShell, TestKind::Compilation) => {
                (POWERSHELL_COMPILE, POWERSHELL_COMPILE_AUTH)
            }
            (LanguageVariant::Go, TestKind::Compilation) => (GO_COMPILE, GO_COMPILE_AUTH),
            (language, TestKind::Execution) => {
                return Err(SnippetError::format(format!(
                    "no execution scaffold for {} snippets",
                    language
                )));
            }
        };

        let (auth_marker, code_marker) = match language {
            LanguageVariant::PowerShell => ("#insert-auth-here", "#insert-code-here"),
            _ => ("//insert-auth-here", "//insert-code-here"),
        };

        Ok(Self { language, kind, template, auth, auth_marker, code_marker })
    }

    /// Inserts normalized code into the scaffold.
    pub fn render(&self, code: &str) -> Result<ScaffoldedSnippet> {
        let mut lines: Vec<String> = Vec::new();
        let mut first_code_line = None;
        let mut code_indent = 0;
        let mut auth_seen = false;

        for line in self.template.lines() {
            let trimmed = line.trim_start();
            let indent = &line[..line.len() - trimmed.len()];
            if trimmed == self.auth_marker {
                lines.extend(indent_lines(self.auth, indent).lines().map(str::to_string));
                auth_seen = true;
            } else if trimmed == self.code_marker {
                first_code_line = Some(lines.len() + 1);
                code_indent = indent.len();
                lines.extend(indent_lines(code, indent).split('\n').map(str::to_string));
            } else {
                lines.push(line.to_string());
            }
        }

        let first_code_line = match (first_code_line, auth_seen) {
            (Some(line), true) => line,
            _ => {
                return Err(SnippetError::format(format!(
                    "{} scaffold is missing an injection marker",
                    self.language
                )));
            }
        };

        let mut source = lines.join("\n");
        source.push('\n');
        Ok(ScaffoldedSnippet {
            source,
            code: code.to_string(),
            first_code_line,
            code_line_count: code.lines().count().max(1),
            code_indent,
        })
    }
}

/// Host program with the snippet embedded, plus what is needed to map compiler
/// positions back to the snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldedSnippet {
    pub source: String,
    /// Normalized snippet code without host indentation.
    pub code: String,
    /// 1-based line of `source` holding the first snippet line.
    pub first_code_line: usize,
    pub code_line_count: usize,
    /// Width of the host indentation prefixed to every snippet line.
    pub code_indent: usize,
}

impl ScaffoldedSnippet {
    pub fn listing(&self) -> String {
        numbered_listing(&self.code)
    }

    /// Moves a compiler position in `source` onto the snippet's own lines and columns.
    pub fn remap(&self, diagnostic: &Diagnostic) -> Diagnostic {
        diagnostic.remapped(self.first_code_line, self.code_line_count, self.code_indent)
    }
}

/// Builds the compilable (or runnable) program for one documentation snippet.
///
/// Compilation mode embeds the snippet as-is. Execution mode first resolves the
/// request URL via `resolve_identifiers`, then rewrites the single client call so
/// the program returns the request instead of dispatching it.
pub fn generate_program(
    doc_text: &str,
    language: LanguageVariant,
    kind: TestKind,
    resolve_identifiers: impl FnOnce(&str) -> Result<String>,
) -> Result<ScaffoldedSnippet> {
    let scaffold = Scaffold::for_language(language, kind)?;
    let code = normalize_code(&extract_code_block(doc_text, language)?);

    let code = match kind {
        TestKind::Compilation => code,
        TestKind::Execution => {
            let shape = ExecutionShape::for_language(language)?;
            let resolved = resolve_identifiers(&code)?;
            let rewritten = shape.rewrite(&resolved)?;
            debug!(language = %language, request_var = %rewritten.request_variable, "rewrote snippet to return its request");
            rewritten.code
        }
    };

    scaffold.render(&code)
}
