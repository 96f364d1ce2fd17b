//! Basic CDP example - connecting, calling, and listening for events

use cdp::{CDPClient, CDPError, ConnectionEvent};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cdp_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:9222/devtools/browser".to_string());
    println!("Connecting to Chrome at: {}", cdp_url);

    let client = CDPClient::connect(&cdp_url).await?;
    println!("Connected!");

    let mut lifecycle = client.lifecycle();
    tokio::spawn(async move {
        while let Ok(event) = lifecycle.recv().await {
            if let ConnectionEvent::Closed { reason } = event {
                println!("Connection closed ({:?})", reason);
            }
        }
    });

    client.on("Target.targetCreated", |event| {
        println!("Target created: {}", event.params["targetInfo"]["url"]);
    });
    client
        .call("Target.setDiscoverTargets", json!({ "discover": true }), None)
        .await?;

    let version = client.call("Browser.getVersion", json!({}), None).await?;
    println!("Browser version: {}", version["product"]);

    // Error replies carry the request that caused them
    match client.call("Nope.doesNotExist", json!({}), None).await {
        Err(CDPError::RequestFailed { request, error }) => {
            println!("{} rejected: {}", request.method, error);
        }
        other => println!("Unexpected: {:?}", other),
    }

    // Keep alive for a bit to see events
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    client.close().await?;
    println!("Disconnected");

    Ok(())
}
