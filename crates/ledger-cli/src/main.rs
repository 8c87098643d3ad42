use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::crypto::{address_of, generate_keypair, sign};
use ledger_core::NewTransaction;
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the social ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, env = "LEDGER_NODE", default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an Ed25519 key pair; the public key is the address
    Keygen,
    /// Sign and submit a post or comment
    Post {
        /// Hex secret key (32-byte seed or 64-byte seed+public key)
        #[arg(long, env = "LEDGER_SECRET")]
        secret: String,
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Message body
        #[arg(long)]
        message: String,
    },
    /// Sign and submit a like of an existing post
    Like {
        #[arg(long, env = "LEDGER_SECRET")]
        secret: String,
        #[arg(long)]
        to: String,
        /// Id of the post being liked
        #[arg(long)]
        post: String,
    },
    /// Print the node's chain
    Chain,
    /// Register a peer with the node
    Register {
        /// Peer URL, e.g. http://127.0.0.1:8081
        #[arg(long)]
        peer: String,
    },
}

fn build_submission(secret: &str, to: String, is_like: bool, body: String) -> Result<NewTransaction> {
    let sender = address_of(secret).context("invalid secret key")?;
    let (message, target_post_id) = if is_like {
        (String::new(), body)
    } else {
        (body, String::new())
    };
    let payload = if is_like { &target_post_id } else { &message };
    let signature = sign(secret, payload.as_bytes())?;
    Ok(NewTransaction {
        sender,
        receiver: to,
        message,
        signature,
        is_like,
        target_post_id,
    })
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<Value>(&body) {
        Ok(v) => println!("{}", serde_json::to_string_pretty(&v)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    match cli.cmd {
        Command::Keygen => {
            let (secret, address) = generate_keypair();
            println!("secret:  {secret}");
            println!("address: {address}");
        }
        Command::Post {
            secret,
            to,
            message,
        } => {
            let tx = build_submission(&secret, to, false, message)?;
            debug!("submitting {:?}", tx);
            let res = client
                .post(format!("{}/transactions/new", cli.node))
                .json(&tx)
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Like { secret, to, post } => {
            let tx = build_submission(&secret, to, true, post)?;
            let res = client
                .post(format!("{}/transactions/new", cli.node))
                .json(&tx)
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Chain => {
            let res = client.get(format!("{}/chain", cli.node)).send().await?;
            print_response(res).await?;
        }
        Command::Register { peer } => {
            let res = client
                .post(format!("{}/nodes/register", cli.node))
                .json(&json!({ "node": peer }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }
    Ok(())
}
