//! Asks about the weather in three cities and answers the model's tool calls
//! from a fake weather service until it produces a final reply.
//!
//! Run with `OPENAI_API_KEY` set (a `.env` file works too):
//!
//! ```sh
//! RUST_LOG=chat_ox=debug,openai_ox=debug cargo run -p openai-ox --example weather_function
//! ```

use chat_ox::{ChatOptions, Message, Tool, ToolCallResolver, ToolLoop, ToolRegistry};
use openai_ox::{OpenAI, OpenAiSettings};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum Unit {
    C,
    F,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct WeatherRequest {
    /// The city and state e.g. San Francisco, CA
    location: String,
    /// The city latitude
    lat: f64,
    /// The city longitude
    lon: f64,
    unit: Unit,
}

fn current_weather(request: WeatherRequest) -> String {
    let celsius = if request.location.contains("Paris") {
        15.0
    } else if request.location.contains("Tokyo") {
        10.0
    } else if request.location.contains("San Francisco") {
        30.0
    } else {
        20.0
    };
    tracing::info!(location = %request.location, lat = request.lat, lon = request.lon, "weather lookup");

    match request.unit {
        Unit::C => format!("{celsius}c"),
        Unit::F => format!("{}f", celsius * 9.0 / 5.0 + 32.0),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = OpenAiSettings::new()?;
    let client = OpenAI::from_settings(&settings)?;

    let weather = Tool::from_schema::<WeatherRequest>("getCurrentWeather", "Get the weather in location")?;
    let registry = ToolRegistry::new().with_typed("getCurrentWeather", |request: WeatherRequest| {
        Ok::<_, std::convert::Infallible>(current_weather(request))
    });

    let tool_loop = ToolLoop::builder()
        .transport(client)
        .resolver(ToolCallResolver::new(registry))
        .options(
            ChatOptions::builder()
                .model("gpt-4-1106-preview")
                .tools(vec![weather])
                .build(),
        )
        .follow_up_options(ChatOptions::builder().temperature(0.8).build())
        .build();

    let outcome = tool_loop
        .run_messages([Message::user(
            "What's the weather like in San Francisco, Tokyo, and Paris?",
        )])
        .await?;

    for message in outcome.conversation.messages() {
        println!("{message}");
    }
    println!();
    println!(
        "{} requests, {} tokens",
        outcome.iterations,
        outcome.usage.total_tokens()
    );

    Ok(())
}
