use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

/// Kind of a tool or tool call. Providers only define functions today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToolType {
    #[default]
    Function,
}

/// A tool descriptor advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    pub r#type: ToolType,
    pub function: ToolFunction,
}

/// Name, description and argument schema of a callable function.
///
/// The schema is advisory: it is sent to the provider but arguments are
/// never validated against it locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Builder)]
pub struct ToolFunction {
    #[builder(into)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl ToolFunction {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters: None,
            strict: None,
        }
    }

    pub fn with_parameters(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            parameters: Some(parameters),
            ..Self::new(name, description)
        }
    }

    /// Builds a function whose parameter schema is given as JSON text.
    pub fn from_json_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        json_schema: &str,
    ) -> Result<Self, serde_json::Error> {
        let parameters = serde_json::from_str(json_schema)?;
        Ok(Self::with_parameters(name, description, parameters))
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

impl Tool {
    pub fn function(function: ToolFunction) -> Self {
        Self {
            r#type: ToolType::Function,
            function,
        }
    }

    pub fn function_with_params(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self::function(ToolFunction::with_parameters(name, description, parameters))
    }

    /// Name of the underlying function.
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Builds a tool whose parameter schema is derived from `T`.
    #[cfg(feature = "schema")]
    pub fn from_schema<T: schemars::JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::function_with_params(name, description, schema_for_type::<T>()?))
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.function.strict = Some(strict);
        self
    }
}

impl From<ToolFunction> for Tool {
    fn from(function: ToolFunction) -> Self {
        Self::function(function)
    }
}

/// Generates an inlined JSON schema for `T`, suitable as tool parameters.
#[cfg(feature = "schema")]
pub fn schema_for_type<T: schemars::JsonSchema>() -> Result<Value, serde_json::Error> {
    use schemars::generate::SchemaSettings;

    let settings = SchemaSettings::openapi3().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let generator = schemars::generate::SchemaGenerator::new(settings);
    let mut schema = serde_json::to_value(generator.into_root_schema_for::<T>())?;
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("title");
    }
    Ok(schema)
}

/// A tool call requested by the model.
///
/// `arguments` is the raw JSON text produced by the model; it is handed to
/// the handler untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ToolCall {
    pub id: String,
    #[serde(default)]
    pub r#type: ToolType,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            r#type: ToolType::Function,
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn arguments(&self) -> &str {
        &self.function.arguments
    }
}

/// Whether and how the model may pick tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    None,
    Auto,
    Required,
    #[serde(untagged)]
    Function { r#type: ToolType, function: ToolChoiceFunction },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolChoiceFunction {
    pub name: String,
}

impl ToolChoice {
    /// Forces the model to call the named function.
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function {
            r#type: ToolType::Function,
            function: ToolChoiceFunction { name: name.into() },
        }
    }

    /// Name of the forced function, if any.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::Function { function, .. } => Some(&function.name),
            _ => None,
        }
    }
}
