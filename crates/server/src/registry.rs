//! Tool, resource and prompt registrations

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{CallToolResult, GetPromptResult, McpError, Prompt, Resource, ResourceContents, Result, Tool};
use std::collections::HashMap;

/// A callable tool exposed through `tools/call`
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Definition advertised by `tools/list`
    fn definition(&self) -> Tool;

    /// Run the tool. `McpError::InvalidParams` becomes a protocol error;
    /// any other error is reported to the model as an error result.
    async fn call(&self, arguments: Value) -> Result<CallToolResult>;
}

/// A prompt template exposed through `prompts/get`
pub trait PromptHandler: Send + Sync {
    fn definition(&self) -> Prompt;

    fn render(&self, arguments: &HashMap<String, String>) -> Result<GetPromptResult>;
}

/// Read-only JSON resource
#[derive(Debug, Clone)]
pub struct StaticResource {
    pub resource: Resource,
    pub body: Value,
}

impl StaticResource {
    pub fn new(resource: Resource, body: Value) -> Self {
        Self { resource, body }
    }

    pub fn contents(&self) -> ResourceContents {
        ResourceContents::text(
            self.resource.uri.clone(),
            Some(
                self.resource
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "application/json".to_string()),
            ),
            serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| self.body.to_string()),
        )
    }
}

/// Deserialize tool arguments, reporting failures as invalid params
pub fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| McpError::InvalidParams(e.to_string()))
}

/// Look up a required prompt argument
pub fn required_argument<'a>(arguments: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    arguments
        .get(name)
        .map(|s| s.as_str())
        .ok_or_else(|| McpError::InvalidParams(format!("missing required argument '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Coordinates {
        latitude: f64,
        longitude: f64,
    }

    #[test]
    fn test_parse_arguments_success() {
        let coords: Coordinates = parse_arguments(json!({"latitude": 40.7, "longitude": -74.0})).unwrap();
        assert_eq!(coords.latitude, 40.7);
        assert_eq!(coords.longitude, -74.0);
    }

    #[test]
    fn test_parse_arguments_missing_field() {
        let err = parse_arguments::<Coordinates>(json!({"latitude": 40.7})).unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn test_parse_arguments_null_is_empty_object() {
        #[derive(Deserialize)]
        struct NoArgs {}
        assert!(parse_arguments::<NoArgs>(Value::Null).is_ok());
    }

    #[test]
    fn test_required_argument() {
        let mut args = HashMap::new();
        args.insert("location".to_string(), "Chicago".to_string());
        assert_eq!(required_argument(&args, "location").unwrap(), "Chicago");
        assert!(required_argument(&args, "report_type").is_err());
    }

    #[test]
    fn test_static_resource_contents() {
        let res = StaticResource::new(
            Resource::new("weather://reference/coverage", "api_coverage"),
            json!({"geographic_coverage": "United States only"}),
        );
        let contents = res.contents();
        assert_eq!(contents.mime_type.as_deref(), Some("application/json"));
        let parsed: Value = serde_json::from_str(contents.text.as_deref().unwrap()).unwrap();
        assert_eq!(parsed["geographic_coverage"], "United States only");
    }
}
