use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;

use crate::error::{BoxedError, ToolError};

/// Uniform signature of every registered tool: raw JSON arguments in, text out.
pub type ToolHandler = Arc<dyn Fn(String) -> ToolFuture + Send + Sync>;

/// Future returned by a [`ToolHandler`].
pub type ToolFuture = BoxFuture<'static, Result<String, ToolError>>;

/// Maps tool names to the local handlers that execute them.
///
/// Handlers receive the model's argument text verbatim and decide themselves
/// how to parse it. Registering a name twice replaces the earlier handler.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: BTreeMap<String, ToolHandler>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asynchronous handler.
    pub fn register<F, Fut, E>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, E>> + Send + 'static,
        E: Into<BoxedError>,
    {
        let name = name.into();
        let tool_name = name.clone();
        self.handlers.insert(
            name,
            Arc::new(move |arguments: String| -> ToolFuture {
                let tool_name = tool_name.clone();
                let fut = handler(arguments);
                Box::pin(async move {
                    fut.await.map_err(|err| ToolError::execution(tool_name, err))
                })
            }),
        );
    }

    /// Registers a synchronous handler working on the raw argument text.
    pub fn register_fn<F, R, E>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&str) -> Result<R, E> + Send + Sync + 'static,
        R: Into<String>,
        E: Into<BoxedError>,
    {
        let name = name.into();
        let tool_name = name.clone();
        self.handlers.insert(
            name,
            Arc::new(move |arguments: String| -> ToolFuture {
                let result = handler(&arguments)
                    .map(Into::into)
                    .map_err(|err| ToolError::execution(tool_name.clone(), err));
                Box::pin(std::future::ready(result))
            }),
        );
    }

    /// Registers a synchronous handler whose arguments are deserialized into `T`.
    ///
    /// Arguments that do not parse as `T` fail with
    /// [`ToolError::InvalidArguments`] without reaching the handler.
    pub fn register_typed<T, F, R, E>(&mut self, name: impl Into<String>, handler: F)
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
        R: Into<String>,
        E: Into<BoxedError>,
    {
        let name = name.into();
        let tool_name = name.clone();
        self.handlers.insert(
            name,
            Arc::new(move |arguments: String| -> ToolFuture {
                let result = serde_json::from_str::<T>(&arguments)
                    .map_err(|err| ToolError::invalid_arguments(tool_name.clone(), err))
                    .and_then(|args| {
                        handler(args)
                            .map(Into::into)
                            .map_err(|err| ToolError::execution(tool_name.clone(), err))
                    });
                Box::pin(std::future::ready(result))
            }),
        );
    }

    /// Registers a handler using a builder pattern.
    pub fn with_fn<F, R, E>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str) -> Result<R, E> + Send + Sync + 'static,
        R: Into<String>,
        E: Into<BoxedError>,
    {
        self.register_fn(name, handler);
        self
    }

    /// Registers a typed handler using a builder pattern.
    pub fn with_typed<T, F, R, E>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
        R: Into<String>,
        E: Into<BoxedError>,
    {
        self.register_typed(name, handler);
        self
    }

    /// Removes a handler, returning whether one was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handler registered under `name`.
    ///
    /// The returned future does not borrow the registry.
    pub fn invoke(&self, name: &str, arguments: impl Into<String>) -> ToolFuture {
        match self.handlers.get(name) {
            Some(handler) => handler(arguments.into()),
            None => Box::pin(std::future::ready(Err(ToolError::not_found(name)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Location {
        location: String,
    }

    #[tokio::test]
    async fn test_sync_handler() {
        let registry = ToolRegistry::new().with_fn("echo", |args: &str| {
            Ok::<_, std::convert::Infallible>(args.to_uppercase())
        });
        assert_eq!(registry.invoke("echo", "abc").await.unwrap(), "ABC");
    }

    #[tokio::test]
    async fn test_async_handler() {
        let mut registry = ToolRegistry::new();
        registry.register("slow", |args: String| async move {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            Ok::<_, BoxedError>(format!("got {args}"))
        });
        assert_eq!(registry.invoke("slow", "x").await.unwrap(), "got x");
    }

    #[tokio::test]
    async fn test_typed_handler_parses_arguments() {
        let registry = ToolRegistry::new().with_typed("weather", |args: Location| {
            Ok::<_, BoxedError>(format!("sunny in {}", args.location))
        });

        let ok = registry.invoke("weather", r#"{"location":"Paris"}"#).await;
        assert_eq!(ok.unwrap(), "sunny in Paris");

        let bad = registry.invoke("weather", r#"{"city":"Paris"}"#).await;
        assert!(matches!(bad, Err(ToolError::InvalidArguments { name, .. }) if name == "weather"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("missing", "{}").await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound { name } if name == "missing"));
    }

    #[tokio::test]
    async fn test_handler_failure_is_execution_error() {
        let registry = ToolRegistry::new().with_fn("fail", |_: &str| Err::<String, _>("boom"));
        let err = registry.invoke("fail", "{}").await.unwrap_err();
        assert_eq!(err.to_string(), "Tool execution failed for tool 'fail': boom");
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = ToolRegistry::new()
            .with_fn("b", |_: &str| Ok::<_, BoxedError>("b"))
            .with_fn("a", |_: &str| Ok::<_, BoxedError>("a"));
        assert_eq!(registry.names().collect::<Vec<_>>(), ["a", "b"]);
        assert!(registry.unregister("a"));
        assert!(!registry.contains("a"));
        assert_eq!(registry.len(), 1);
    }
}
