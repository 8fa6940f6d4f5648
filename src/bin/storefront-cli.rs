use clap::{Parser, Subcommand};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "storefront-cli")]
#[command(about = "Management CLI for the storefront API", long_about = None)]
struct Cli {
    #[arg(short, long, global = true, env = "STOREFRONT_URL", default_value = "http://localhost:8001")]
    url: String,

    /// Bearer token of an administrator; obtain one with `login`.
    #[arg(short, long, global = true, env = "STOREFRONT_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the issued token
    Login {
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD")]
        password: String,
    },
    /// Show the identity behind the token
    Me,
    /// List block-listed clients
    Blocked,
    /// Remove a client from the block list
    Unblock { client: String },
    /// Grant the administrator flag
    Promote { email: String },
    /// Disable an account
    Disable { email: String },
    /// Re-enable an account
    Enable { email: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/').to_string();

    let request = |method: Method, path: String| -> RequestBuilder {
        let builder = client.request(method, format!("{}{}", base, path));
        match &cli.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    };

    let res = match &cli.command {
        Commands::Login { email, password } => {
            request(Method::POST, "/api/auth/login".into())
                .form(&[("username", email.as_str()), ("password", password.as_str())])
                .send()
                .await?
        }
        Commands::Me => request(Method::GET, "/api/auth/me".into()).send().await?,
        Commands::Blocked => {
            request(Method::GET, "/api/admin/security/blocked".into())
                .send()
                .await?
        }
        Commands::Unblock { client } => {
            request(Method::DELETE, format!("/api/admin/security/blocked/{}", client))
                .send()
                .await?
        }
        Commands::Promote { email } => {
            request(Method::POST, format!("/api/admin/users/{}/promote", email))
                .send()
                .await?
        }
        Commands::Disable { email } => {
            request(Method::POST, format!("/api/admin/users/{}/disable", email))
                .send()
                .await?
        }
        Commands::Enable { email } => {
            request(Method::POST, format!("/api/admin/users/{}/enable", email))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
