use std::time::Duration;

use chat_ox::{
    BoxedError, ChatOptions, ChatResponse, Conversation, ConversationError, Message, Resolution,
    ResolveError, Role, Tool, ToolCall, ToolCallResolver, ToolError, ToolExecution,
    ToolFailurePolicy, ToolRegistry,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    location: String,
    unit: Option<String>,
}

fn weather_tool() -> Tool {
    Tool::function_with_params(
        "getCurrentWeather",
        "Get the weather in location",
        json!({
            "type": "object",
            "properties": {
                "location": {"type": "string", "description": "The city and state e.g. San Francisco, CA"},
                "unit": {"type": "string", "enum": ["c", "f"]}
            },
            "required": ["location"]
        }),
    )
}

fn fake_weather(args: WeatherArgs) -> Result<String, BoxedError> {
    let temperature = match args.location.as_str() {
        l if l.contains("Paris") => 15,
        l if l.contains("Tokyo") => 10,
        l if l.contains("San Francisco") => 30,
        _ => return Err(format!("no weather station in {}", args.location).into()),
    };
    Ok(format!("{temperature}{}", args.unit.unwrap_or_else(|| "c".to_string())))
}

fn weather_resolver() -> ToolCallResolver {
    ToolCallResolver::new(ToolRegistry::new().with_typed("getCurrentWeather", fake_weather))
}

fn options() -> ChatOptions {
    ChatOptions::builder()
        .model("gpt-4-1106-preview")
        .temperature(0.7)
        .tools(vec![weather_tool()])
        .build()
}

fn history() -> Conversation {
    Conversation::from_messages([
        Message::system("You are a weather assistant"),
        Message::user("What's the weather like in Paris?"),
    ])
    .unwrap()
}

fn tool_response(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse::from_message(
        "gpt-4-1106-preview",
        Message::assistant_with_tool_calls(None, calls),
    )
}

#[tokio::test]
async fn test_final_response_leaves_conversation_unchanged() {
    let response = ChatResponse::from_message(
        "gpt-4-1106-preview",
        Message::assistant("It is 15 degrees in Paris."),
    );

    let resolution = weather_resolver()
        .resolve(&history(), &response, &options())
        .await
        .unwrap();

    assert!(resolution.is_complete());
    assert!(resolution.follow_up().is_none());
    assert_eq!(resolution.conversation(), &history());
    match resolution {
        Resolution::Complete { message, .. } => {
            assert_eq!(message.text(), Some("It is 15 degrees in Paris."));
        }
        Resolution::FollowUp { .. } => panic!("expected a final response"),
    }
}

#[tokio::test]
async fn test_empty_tool_call_list_is_final() {
    let response = tool_response(Vec::new());
    let resolution = weather_resolver()
        .resolve(&history(), &response, &options())
        .await
        .unwrap();
    assert!(resolution.is_complete());
}

#[tokio::test]
async fn test_weather_round_trip() {
    let call = ToolCall::new(
        "call_1",
        "getCurrentWeather",
        r#"{"location":"Paris","unit":"c"}"#,
    );
    let response = tool_response(vec![call.clone()]);

    let resolution = weather_resolver()
        .resolve(&history(), &response, &options())
        .await
        .unwrap();

    let Resolution::FollowUp {
        conversation,
        request,
    } = resolution
    else {
        panic!("expected a follow-up request");
    };

    let messages = conversation.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].role, Role::Assistant);
    assert_eq!(messages[2].requested_tool_calls(), &[call][..]);
    assert_eq!(messages[3].role, Role::Tool);
    assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(messages[3].text(), Some("15c"));

    assert_eq!(request.messages(), messages);
    assert_eq!(request.model(), "gpt-4-1106-preview");
    assert_eq!(request.options().temperature, Some(0.7));
    assert_eq!(request.tools().len(), 1);
}

#[tokio::test]
async fn test_each_call_gets_one_tool_message_in_order() {
    let calls = vec![
        ToolCall::new("call_a", "getCurrentWeather", r#"{"location":"San Francisco"}"#),
        ToolCall::new("call_b", "getCurrentWeather", r#"{"location":"Tokyo"}"#),
        ToolCall::new("call_c", "getCurrentWeather", r#"{"location":"Paris"}"#),
    ];
    let response = tool_response(calls);

    let resolution = weather_resolver()
        .resolve(&history(), &response, &options())
        .await
        .unwrap();
    let conversation = resolution.into_conversation();

    let appended = &conversation.messages()[2..];
    assert_eq!(appended.len(), 4);
    let answered: Vec<_> = appended[1..]
        .iter()
        .map(|m| (m.tool_call_id.as_deref().unwrap(), m.text().unwrap()))
        .collect();
    assert_eq!(
        answered,
        [("call_a", "30c"), ("call_b", "10c"), ("call_c", "15c")]
    );
    assert!(conversation.pending_tool_calls().is_empty());
}

#[tokio::test]
async fn test_unknown_tool_is_answered_with_error() {
    let response = tool_response(vec![
        ToolCall::new("call_1", "getStockPrice", r#"{"ticker":"ACME"}"#),
        ToolCall::new("call_2", "getCurrentWeather", r#"{"location":"Paris"}"#),
    ]);

    let resolution = weather_resolver()
        .resolve(&history(), &response, &options())
        .await
        .unwrap();
    let request = resolution.follow_up().unwrap();

    let tool_messages: Vec<_> = request
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(tool_messages.len(), 2);
    assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(
        tool_messages[0].text(),
        Some("Error: Tool not found: getStockPrice")
    );
    assert_eq!(tool_messages[1].text(), Some("15c"));
}

#[tokio::test]
async fn test_malformed_arguments_are_answered_with_error() {
    let response = tool_response(vec![ToolCall::new(
        "call_1",
        "getCurrentWeather",
        r#"{"location": "Paris""#,
    )]);

    let resolution = weather_resolver()
        .resolve(&history(), &response, &options())
        .await
        .unwrap();
    let last = resolution.conversation().last().unwrap();

    assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
    assert!(
        last.text()
            .unwrap()
            .starts_with("Error: Invalid arguments for tool 'getCurrentWeather'")
    );
}

#[tokio::test]
async fn test_handler_failure_is_answered_with_error() {
    let response = tool_response(vec![ToolCall::new(
        "call_1",
        "getCurrentWeather",
        r#"{"location":"Atlantis"}"#,
    )]);

    let resolution = weather_resolver()
        .resolve(&history(), &response, &options())
        .await
        .unwrap();

    assert_eq!(
        resolution.conversation().last().and_then(Message::text),
        Some("Error: Tool execution failed for tool 'getCurrentWeather': no weather station in Atlantis")
    );
}

#[tokio::test]
async fn test_abort_policy_returns_tool_error() {
    let resolver = ToolCallResolver::builder()
        .registry(ToolRegistry::new().with_typed("getCurrentWeather", fake_weather))
        .failure_policy(ToolFailurePolicy::Abort)
        .build();
    let response = tool_response(vec![ToolCall::new("call_1", "getStockPrice", "{}")]);

    let err = resolver
        .resolve(&history(), &response, &options())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::Tool(ToolError::NotFound { ref name }) if name == "getStockPrice"
    ));
}

#[tokio::test]
async fn test_failed_resolution_keeps_callers_conversation() {
    let resolver = ToolCallResolver::builder()
        .registry(ToolRegistry::new().with_typed("getCurrentWeather", fake_weather))
        .failure_policy(ToolFailurePolicy::Abort)
        .build();
    let response = tool_response(vec![
        ToolCall::new("call_1", "getCurrentWeather", r#"{"location":"Paris"}"#),
        ToolCall::new("call_2", "getCurrentWeather", r#"{"location":"Atlantis"}"#),
    ]);
    let conversation = history();

    let err = resolver
        .resolve(&conversation, &response, &options())
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Tool(ToolError::Execution { .. })));

    assert_eq!(conversation, history());
    assert!(conversation.pending_tool_calls().is_empty());

    let retry = weather_resolver()
        .resolve(&conversation, &response, &options())
        .await
        .unwrap();
    assert_eq!(retry.conversation().len(), conversation.len() + 3);
}

#[tokio::test]
async fn test_resolving_twice_is_deterministic() {
    let response = tool_response(vec![
        ToolCall::new("call_1", "getCurrentWeather", r#"{"location":"Paris"}"#),
        ToolCall::new("call_2", "getStockPrice", "{}"),
    ]);
    let resolver = weather_resolver();
    let snapshot = history();

    let first = resolver
        .resolve(&snapshot, &response, &options())
        .await
        .unwrap();
    let second = resolver
        .resolve(&snapshot, &response, &options())
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_follow_up_overrides_replace_previous_options() {
    let response = tool_response(vec![ToolCall::new(
        "call_1",
        "getCurrentWeather",
        r#"{"location":"Paris"}"#,
    )]);
    let overrides = ChatOptions::builder().model("gpt-4").max_tokens(50).build();

    let resolution = weather_resolver()
        .resolve_with(&history(), &response, &options(), &overrides)
        .await
        .unwrap();
    let request = resolution.follow_up().unwrap();

    assert_eq!(request.model(), "gpt-4");
    assert_eq!(request.options().max_tokens, Some(50));
    assert_eq!(request.options().temperature, Some(0.7));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_results_keep_request_order() {
    let mut registry = ToolRegistry::new();
    registry.register("sleepy", |arguments: String| async move {
        let millis: u64 = serde_json::from_str(&arguments)?;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok::<_, BoxedError>(format!("slept {millis}ms"))
    });
    let resolver = ToolCallResolver::builder()
        .registry(registry)
        .execution(ToolExecution::Concurrent)
        .build();

    let response = tool_response(vec![
        ToolCall::new("call_1", "sleepy", "30"),
        ToolCall::new("call_2", "sleepy", "10"),
        ToolCall::new("call_3", "sleepy", "20"),
    ]);

    let started = tokio::time::Instant::now();
    let resolution = resolver
        .resolve(&history(), &response, &options())
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(60));

    let answered: Vec<_> = resolution
        .conversation()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| (m.tool_call_id.clone().unwrap(), m.text().unwrap().to_string()))
        .collect();
    assert_eq!(
        answered,
        [
            ("call_1".to_string(), "slept 30ms".to_string()),
            ("call_2".to_string(), "slept 10ms".to_string()),
            ("call_3".to_string(), "slept 20ms".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_duplicate_call_ids_are_rejected() {
    let response = tool_response(vec![
        ToolCall::new("call_1", "getCurrentWeather", r#"{"location":"Paris"}"#),
        ToolCall::new("call_1", "getCurrentWeather", r#"{"location":"Tokyo"}"#),
    ]);

    let err = weather_resolver()
        .resolve(&history(), &response, &options())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::Conversation(ConversationError::DuplicateToolCallId { ref id }) if id == "call_1"
    ));
}

#[tokio::test]
async fn test_response_without_choices_is_rejected() {
    let response: ChatResponse = serde_json::from_value(json!({
        "id": "chatcmpl-empty",
        "object": "chat.completion",
        "model": "gpt-4-1106-preview",
        "choices": []
    }))
    .unwrap();

    let err = weather_resolver()
        .resolve(&history(), &response, &options())
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::EmptyResponse));
}

#[tokio::test]
async fn test_unanswered_history_is_rejected() {
    let mut conversation = history();
    conversation
        .push(Message::assistant_with_tool_calls(
            None,
            vec![ToolCall::new("call_0", "getCurrentWeather", "{}")],
        ))
        .unwrap();
    let response = tool_response(vec![ToolCall::new(
        "call_1",
        "getCurrentWeather",
        r#"{"location":"Paris"}"#,
    )]);

    let err = weather_resolver()
        .resolve(&conversation, &response, &options())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Conversation(ConversationError::UnansweredToolCalls { .. })
    ));
}
