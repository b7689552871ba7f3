//! Thin HTTP client for the relay's own API, backing the `register`,
//! `send`, and `status` subcommands.

use anyhow::{Context, Result, bail};
use serde_json::json;

use crate::handlers::Ack;
use crate::registry::RegisterRequest;

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

async fn read_ack(resp: reqwest::Response) -> Result<Ack> {
    resp.json().await.context("unexpected response from relay")
}

pub async fn register_command(base_url: &str, req: &RegisterRequest) -> Result<()> {
    let resp = client()
        .post(format!("{base_url}/register"))
        .json(req)
        .send()
        .await
        .with_context(|| format!("could not reach relay at {base_url} - is it running?"))?;

    let ack = read_ack(resp).await?;
    if !ack.success {
        bail!("{}", ack.message);
    }
    println!("{}", ack.message);
    Ok(())
}

pub async fn send_command(
    base_url: &str,
    from: &str,
    to: &str,
    content: &str,
    completion: bool,
) -> Result<()> {
    let body = json!({
        "from": from,
        "to": to,
        "content": content,
        "type": if completion { "completion" } else { "message" },
    });

    let resp = client()
        .post(format!("{base_url}/message"))
        .json(&body)
        .send()
        .await
        .with_context(|| format!("could not reach relay at {base_url} - is it running?"))?;

    let ack = read_ack(resp).await?;
    if !ack.success {
        bail!("{}", ack.message);
    }
    println!("{}", ack.message);
    Ok(())
}

pub async fn status_command(base_url: &str) -> Result<()> {
    let resp = client()
        .get(format!("{base_url}/status"))
        .send()
        .await
        .with_context(|| format!("could not reach relay at {base_url} - is it running?"))?;

    let status: serde_json::Value = resp.json().await.context("unexpected status response")?;

    let instances = status["instances"].as_array().cloned().unwrap_or_default();
    println!("Instances ({}):", instances.len());
    for inst in &instances {
        let id = inst["id"].as_str().unwrap_or("?");
        let name = inst["name"].as_str().unwrap_or(id);
        let role = inst["role"].as_str().unwrap_or("?");
        let target = inst["tmuxSession"]
            .as_str()
            .or_else(|| inst["tmuxWindow"].as_str())
            .or_else(|| inst["tmuxPane"].as_str())
            .unwrap_or("none");
        println!("  {name} ({role}) - target: {target}");
    }

    let total = status["totalMessages"].as_u64().unwrap_or(0);
    println!("Messages: {total}");
    for msg in status["recentMessages"].as_array().cloned().unwrap_or_default() {
        let from = msg["fromDisplayName"].as_str().unwrap_or("?");
        let to = msg["toDisplayName"].as_str().unwrap_or("?");
        let content = msg["content"].as_str().unwrap_or("");
        let mark = if msg["delivered"].as_bool().unwrap_or(false) {
            ""
        } else {
            " [failed]"
        };
        println!("  {from} -> {to}: {content}{mark}");
    }
    Ok(())
}
