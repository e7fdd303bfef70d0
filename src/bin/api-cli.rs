use std::time::Duration;

use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Command-line tester for the API testbed", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET /api/http/get?param=<PARAM>
    Get { param: String },
    /// POST /api/http/post with {"value": <VALUE>}
    Post { value: String },
    /// PUT /api/http/put with {"value": <VALUE>}
    Put { value: String },
    /// PATCH /api/http/patch with {"value": <VALUE>}
    Patch { value: String },
    /// DELETE /api/http/delete?id=<ID>
    Delete { id: String },
    /// Print events from /sse
    Sse {
        /// Stop after this many events.
        #[arg(short, long, default_value_t = 5)]
        count: usize,
    },
    /// Send each message over /ws and print the replies
    Ws {
        #[arg(required = true)]
        messages: Vec<String>,
    },
    /// Check server liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = Url::parse(&cli.url)?;
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()?;

    match cli.command {
        Commands::Get { param } => {
            let res = client
                .get(base.join("/api/http/get")?)
                .query(&[("param", param)])
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Post { value } => {
            let res = client
                .post(base.join("/api/http/post")?)
                .json(&json!({ "value": value }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Put { value } => {
            let res = client
                .put(base.join("/api/http/put")?)
                .json(&json!({ "value": value }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Patch { value } => {
            let res = client
                .patch(base.join("/api/http/patch")?)
                .json(&json!({ "value": value }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete { id } => {
            let res = client
                .delete(base.join("/api/http/delete")?)
                .query(&[("id", id)])
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Sse { count } => stream_events(&client, &base, count).await?,
        Commands::Ws { messages } => echo(&base, messages).await?,
        Commands::Health => {
            let res = client.get(base.join("/health")?).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}

async fn stream_events(
    client: &reqwest::Client,
    base: &Url,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let res = client.get(base.join("/sse")?).send().await?;
    if !res.status().is_success() {
        eprintln!("Error: server returned status {}", res.status());
        return Ok(());
    }

    let mut body = res.bytes_stream();
    let mut buffer = String::new();
    let mut seen = 0;
    while let Some(chunk) = body.next().await {
        buffer.push_str(&String::from_utf8_lossy(&chunk?));
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            for data in frame.lines().filter_map(|l| l.strip_prefix("data:")) {
                println!("{}", data.trim_start());
                seen += 1;
            }
            if seen >= count {
                return Ok(());
            }
        }
    }
    Ok(())
}

async fn echo(base: &Url, messages: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws_url = base.join("/ws")?;
    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    ws_url
        .set_scheme(scheme)
        .map_err(|_| format!("cannot derive WebSocket URL from {}", base))?;

    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url.as_str()).await?;
    for message in messages {
        socket.send(Message::text(message)).await?;
        match socket.next().await {
            Some(Ok(Message::Text(reply))) => println!("{}", reply.as_str()),
            Some(Ok(other)) => println!("{:?}", other),
            Some(Err(e)) => return Err(e.into()),
            None => break,
        }
    }
    socket.close(None).await?;
    Ok(())
}
