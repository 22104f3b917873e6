//! Rhino.Compute tools

use crate::client::{ComputeClient, IO_TIMEOUT, QUERY_TIMEOUT, SOLVE_TIMEOUT};
use crate::grasshopper::{decode_output, output_file_path, resolve_path, SolveRequest, FIRST_BRANCH};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use server::{parse_arguments, ToolHandler};
use shared::{CallToolResult, McpError, Result, Tool};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn failure(message: String) -> CallToolResult {
    CallToolResult::json(json!({ "error": message })).into_error()
}

fn contact_failure(e: McpError) -> CallToolResult {
    let detail = match e {
        McpError::Upstream(m) => m,
        other => other.to_string(),
    };
    failure(format!("Failed to contact Rhino.Compute: {}", detail))
}

fn no_arguments() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Existing definition file, or the not-found result
fn locate_definition(pointer: &str) -> std::result::Result<PathBuf, CallToolResult> {
    let path = resolve_path(pointer).map_err(|e| failure(e.to_string()))?;
    if path.exists() {
        Ok(path)
    } else {
        Err(failure(format!("Grasshopper file not found: '{}'", path.display())))
    }
}

/// Tools that wrap a single GET and return `{status, <key>: body}`
pub struct ComputeQueryTool {
    client: Arc<ComputeClient>,
    name: &'static str,
    description: &'static str,
    endpoint: &'static str,
    key: &'static str,
}

impl ComputeQueryTool {
    pub fn version(client: Arc<ComputeClient>) -> Self {
        Self {
            client,
            name: "get_rhinocompute_version_details",
            description: "Retrieves version information from the connected Rhino.Compute server. \
                          Use it to verify that Rhino.Compute is running or to confirm the build \
                          before running Grasshopper definitions.",
            endpoint: "version",
            key: "version_info",
        }
    }

    pub fn rhino_plugins(client: Arc<ComputeClient>) -> Self {
        Self {
            client,
            name: "get_installed_rhino_plugins",
            description: "Returns a list of Rhino plugins installed on the Rhino.Compute server.",
            endpoint: "plugins/rhino/installed",
            key: "plugins",
        }
    }

    pub fn grasshopper_plugins(client: Arc<ComputeClient>) -> Self {
        Self {
            client,
            name: "get_installed_grasshopper_plugins",
            description: "Returns a list of Grasshopper plugins installed on the Rhino.Compute server.",
            endpoint: "plugins/gh/installed",
            key: "plugins",
        }
    }
}

#[async_trait]
impl ToolHandler for ComputeQueryTool {
    fn definition(&self) -> Tool {
        Tool::new(self.name)
            .with_description(self.description)
            .with_schema(no_arguments())
    }

    async fn call(&self, _arguments: Value) -> Result<CallToolResult> {
        Ok(match self.client.get(self.endpoint, QUERY_TIMEOUT).await {
            Ok(body) => CallToolResult::json(json!({ "status": "success", (self.key): body })),
            Err(e) => contact_failure(e),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PointerArgs {
    pointer: String,
}

pub struct ReadDefinitionTool {
    client: Arc<ComputeClient>,
}

impl ReadDefinitionTool {
    pub fn new(client: Arc<ComputeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for ReadDefinitionTool {
    fn definition(&self) -> Tool {
        Tool::new("read_grasshopper_inputs_outputs")
            .with_description(
                "Reads the inputs and outputs of a Grasshopper definition using Rhino.Compute's /io \
                 endpoint. Use it to learn which parameters a .gh/.ghx file expects before running it.",
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "pointer": {
                        "type": "string",
                        "description": "Absolute or relative path to a .gh or .ghx Grasshopper file"
                    }
                },
                "required": ["pointer"]
            }))
    }

    async fn call(&self, arguments: Value) -> Result<CallToolResult> {
        let args: PointerArgs = parse_arguments(arguments)?;
        let path = match locate_definition(&args.pointer) {
            Ok(p) => p,
            Err(result) => return Ok(result),
        };
        let pointer = path.display().to_string();

        let data = match self
            .client
            .post("io", &json!({ "algo": null, "pointer": pointer }), IO_TIMEOUT)
            .await
        {
            Ok(d) => d,
            Err(e) => return Ok(contact_failure(e)),
        };

        Ok(CallToolResult::json(json!({
            "status": "success",
            "path": pointer,
            "description": data.get("Description").cloned().unwrap_or_else(|| json!("Grasshopper definition")),
            "inputs": data.get("Inputs").cloned().unwrap_or_else(|| json!([])),
            "outputs": data.get("Outputs").cloned().unwrap_or_else(|| json!([])),
            "icon": data.get("Icon").cloned().unwrap_or(Value::Null),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct RunArgs {
    pointer: String,
    #[serde(default)]
    inputs: Map<String, Value>,
}

pub struct RunDefinitionTool {
    client: Arc<ComputeClient>,
    output_dir: PathBuf,
}

impl RunDefinitionTool {
    pub fn new(client: Arc<ComputeClient>, output_dir: PathBuf) -> Self {
        Self { client, output_dir }
    }

    async fn run(&self, path: PathBuf, inputs: &Map<String, Value>) -> Result<Value> {
        let definition = tokio::fs::read(&path).await?;
        let request = SolveRequest::new(&definition, inputs);

        let output = self.client.post("grasshopper", &request, SOLVE_TIMEOUT).await?;
        let values = decode_output(&output, FIRST_BRANCH)?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_file = output_file_path(&self.output_dir, &path, chrono::Local::now());
        let pointer = path.display().to_string();
        let document = json!({ "definition": pointer, "values": values });
        tokio::fs::write(&output_file, serde_json::to_vec_pretty(&document)?).await?;

        info!(definition = %pointer, output = %output_file.display(), "Grasshopper solve saved");
        Ok(json!({
            "status": "success",
            "pointer": pointer,
            "output_file": output_file.display().to_string(),
            "values": values,
        }))
    }
}

#[async_trait]
impl ToolHandler for RunDefinitionTool {
    fn definition(&self) -> Tool {
        Tool::new("run_grasshopper_tool")
            .with_description(
                "Runs a Grasshopper definition via Rhino.Compute. Each input is passed as a single-item \
                 data tree; the decoded outputs are saved to a JSON file.",
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "pointer": {
                        "type": "string",
                        "description": "Path to the .gh or .ghx definition file"
                    },
                    "inputs": {
                        "type": "object",
                        "description": "Input parameter names and their values"
                    }
                },
                "required": ["pointer", "inputs"]
            }))
    }

    async fn call(&self, arguments: Value) -> Result<CallToolResult> {
        let args: RunArgs = parse_arguments(arguments)?;
        let path = match locate_definition(&args.pointer) {
            Ok(p) => p,
            Err(result) => return Ok(result),
        };

        Ok(match self.run(path, &args.inputs).await {
            Ok(body) => CallToolResult::json(body),
            Err(e) => {
                let detail = match e {
                    McpError::Upstream(m) => m,
                    other => other.to_string(),
                };
                failure(format!("Failed to run Grasshopper definition: {}", detail))
            }
        })
    }
}
