//! Tool types for MCP

use crate::resource::ResourceContents;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between server name and tool name in prefixed names
pub const PREFIX_SEPARATOR: &str = "__";

/// MCP Tool definition (matches the `tools/list` wire shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Tool name
    pub name: String,

    /// Tool description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for input parameters
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {}
    })
}

impl Tool {
    /// Create a new tool
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: empty_object_schema(),
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: set input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Tool discovered on a remote server, with source tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Original tool definition
    pub tool: Tool,

    /// Source server name
    pub source_server: String,

    /// Prefixed tool name (serverName__toolName)
    pub prefixed_name: String,
}

impl ToolInfo {
    /// Create tool info from a tool and server name
    pub fn new(tool: Tool, source_server: impl Into<String>) -> Self {
        let source_server = source_server.into();
        let prefixed_name = Self::make_prefixed_name(&source_server, &tool.name);
        Self {
            tool,
            source_server,
            prefixed_name,
        }
    }

    /// Create the prefixed name from server and tool name
    pub fn make_prefixed_name(server: &str, tool: &str) -> String {
        format!("{}{}{}", server, PREFIX_SEPARATOR, tool)
    }

    /// Parse a prefixed name into (server, tool)
    pub fn parse_prefixed_name(prefixed: &str) -> Option<(&str, &str)> {
        prefixed.split_once(PREFIX_SEPARATOR)
    }
}

/// Content block carried by tool results and prompt messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        data: String,
        mime_type: String,
    },
    #[serde(rename_all = "camelCase")]
    Audio {
        data: String,
        mime_type: String,
    },
    Resource {
        resource: ResourceContents,
    },
    #[serde(rename_all = "camelCase")]
    ResourceLink {
        uri: String,
        #[serde(default)]
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    /// Block types newer than this crate
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Text as-is; binary and linked content as a one-line placeholder
    pub fn render(&self) -> String {
        match self {
            ContentBlock::Text { text } => text.clone(),
            ContentBlock::Image { mime_type, data } => format!("[image {}, {} bytes base64]", mime_type, data.len()),
            ContentBlock::Audio { mime_type, data } => format!("[audio {}, {} bytes base64]", mime_type, data.len()),
            ContentBlock::Resource { resource } => match &resource.text {
                Some(text) => text.clone(),
                None => format!("[resource {}]", resource.uri),
            },
            ContentBlock::ResourceLink { uri, .. } => format!("[resource link {}]", uri),
            ContentBlock::Unsupported => "[unsupported content]".to_string(),
        }
    }
}

/// Result of `tools/list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Parameters of `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,

    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Result of `tools/call`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ContentBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,

    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Plain text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: None,
            is_error: false,
        }
    }

    /// Structured JSON result, mirrored as pretty text for older clients
    pub fn json(value: Value) -> Self {
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: Some(value),
            is_error: false,
        }
    }

    /// Tool-level failure the model should see
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: None,
            is_error: true,
        }
    }

    /// Mark this result as an error, keeping its content
    pub fn into_error(mut self) -> Self {
        self.is_error = true;
        self
    }

    /// Every block rendered and joined by newlines
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(ContentBlock::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ============== Tool Tests ==============

    #[test]
    fn test_tool_new() {
        let tool = Tool::new("get_forecast");
        assert_eq!(tool.name, "get_forecast");
        assert!(tool.description.is_none());
    }

    #[test]
    fn test_tool_builder_chain() {
        let tool = Tool::new("get_forecast")
            .with_description("Get weather forecast")
            .with_schema(json!({"type": "object", "required": ["latitude"]}));

        assert_eq!(tool.description.as_deref(), Some("Get weather forecast"));
        assert_eq!(tool.input_schema["required"][0], "latitude");
    }

    #[test]
    fn test_tool_default_schema() {
        let tool = Tool::new("test");
        assert!(tool.input_schema.is_object());
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn test_tool_wire_shape() {
        let tool = Tool::new("ping").with_description("Ping");
        let value = serde_json::to_value(&tool).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn test_tool_missing_schema_defaults() {
        let tool: Tool = serde_json::from_value(json!({"name": "bare"})).unwrap();
        assert_eq!(tool.input_schema["type"], "object");
    }

    // ============== ToolInfo Tests ==============

    #[test]
    fn test_prefixed_name() {
        let info = ToolInfo::new(Tool::new("get_forecast"), "weather");
        assert_eq!(info.prefixed_name, "weather__get_forecast");
    }

    #[test]
    fn test_parse_prefixed_name() {
        assert_eq!(
            ToolInfo::parse_prefixed_name("weather__get_forecast"),
            Some(("weather", "get_forecast"))
        );
        assert_eq!(ToolInfo::parse_prefixed_name("no_prefix"), None);
    }

    #[test]
    fn test_parse_prefixed_name_splits_at_first_separator() {
        assert_eq!(
            ToolInfo::parse_prefixed_name("compute__run__twice"),
            Some(("compute", "run__twice"))
        );
    }

    // ============== CallToolResult Tests ==============

    #[test]
    fn test_text_result_shape() {
        let result = CallToolResult::text("sunny");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"content": [{"type": "text", "text": "sunny"}], "isError": false}));
    }

    #[test]
    fn test_json_result_mirrors_text() {
        let result = CallToolResult::json(json!({"status": "success"}));
        assert_eq!(result.structured_content, Some(json!({"status": "success"})));
        assert!(result.joined_text().contains("\"status\": \"success\""));
    }

    #[test]
    fn test_error_result() {
        let result = CallToolResult::error("boom");
        assert!(result.is_error);
        assert_eq!(result.joined_text(), "boom");

        let converted = CallToolResult::json(json!({"error": "x"})).into_error();
        assert!(converted.is_error);
        assert!(converted.structured_content.is_some());
    }

    #[test]
    fn test_result_without_is_error_field() {
        let result: CallToolResult =
            serde_json::from_value(json!({"content": [{"type": "text", "text": "a"}]})).unwrap();
        assert!(!result.is_error);
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_mixed_content_result_parses() {
            let result: CallToolResult = serde_json::from_value(json!({"content": [
                {"type": "text", "text": "Rendered preview:"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "audio", "data": "UklG", "mimeType": "audio/wav"},
                {"type": "resource", "resource": {"uri": "file:///out.3dm", "blob": "AAEC"}},
                {"type": "resource_link", "uri": "file:///log.txt", "name": "log"},
                {"type": "hologram", "frames": 3}
            ]}))
            .unwrap();

            assert_eq!(result.content.len(), 6);
            assert_eq!(result.content[0].as_text(), Some("Rendered preview:"));
            assert_eq!(result.content[1].as_text(), None);
            assert_eq!(result.content[5], ContentBlock::Unsupported);
            assert_eq!(
                result.joined_text(),
                "Rendered preview:\n\
                 [image image/png, 4 bytes base64]\n\
                 [audio audio/wav, 4 bytes base64]\n\
                 [resource file:///out.3dm]\n\
                 [resource link file:///log.txt]\n\
                 [unsupported content]"
            );
        }

        #[test]
        fn test_image_block_wire_shape() {
            let block = ContentBlock::Image {
                data: "AAAA".into(),
                mime_type: "image/png".into(),
            };
            assert_eq!(
                serde_json::to_value(&block).unwrap(),
                json!({"type": "image", "data": "AAAA", "mimeType": "image/png"})
            );
        }

        #[test]
        fn test_embedded_text_resource_renders_its_text() {
            let block: ContentBlock = serde_json::from_value(json!({
                "type": "resource",
                "resource": {"uri": "weather://reference/coverage", "text": "{}"}
            }))
            .unwrap();
            assert_eq!(block.render(), "{}");
        }
    }
}
