//! Quick client for a framestate server: enters the frame and clicks a few times.

use framestate_client::FrameClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9000".to_string());
    let clicks: usize = match std::env::args().nth(2) {
        Some(n) => n.parse()?,
        None => 3,
    };

    println!("Connecting to framestate server at {}...", addr);
    let mut client = FrameClient::connect(&addr).await?;

    let result = client.start().await?;
    println!("Initial: {}", serde_json::to_string(&result)?);

    for _ in 0..clicks {
        let result = client.interact().await?;
        println!("Image: {:?}", result.get("image"));
    }

    println!("State text: {}", client.state_text().unwrap_or_default());
    println!("Decoded state: {:?}", client.decoded_state()?);

    Ok(())
}
