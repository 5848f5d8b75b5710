//! inspectctl - command-line client for the rider inspection API.
//!
//! Credentials live in a JSON session file between runs; an expired access
//! token is renewed through the stored refresh cookie.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Method;
use rider_inspection::{
    client::{
        api::{AuthClient, LoginRedirect},
        request::MultipartPart,
        session_store::FileSessionStore,
    },
    config::client::ClientConfig,
    dto::request::{AssignRequest, ConfirmRequest, LocationRequest, MatchKeyRequest},
};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "inspectctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// API base url, overrides API_BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    /// Session file, overrides SESSION_FILE
    #[arg(long)]
    session: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "INSPECTCTL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Revoke the session and forget local credentials
    Logout,

    /// Show the logged-in user
    Me,

    /// List riders
    Riders,

    /// List inspections, optionally filtered
    Inspections {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },

    /// Submit an inspection
    Inspect {
        #[arg(long)]
        rider_id: Option<i32>,
        #[arg(long)]
        id_number: Option<String>,
        /// Checklist or text field as name=value, repeatable
        #[arg(short, long = "field", value_parser = parse_pair)]
        fields: Vec<(String, String)>,
        /// Photo to attach
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// List inspection rules
    Rules,

    /// List action-center matches
    Matches {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        field: Option<String>,
    },

    /// Mark a match as done
    Confirm {
        inspection_id: i32,
        rule_id: i32,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Put a confirmed match back to pending
    Unconfirm { inspection_id: i32, rule_id: i32 },

    /// Set the assignees of a match
    Assign {
        inspection_id: i32,
        rule_id: i32,
        #[arg(long)]
        assignee: Option<i32>,
        #[arg(long)]
        assignee2: Option<i32>,
    },

    /// Record a location ping for the logged-in supervisor
    Ping {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },

    /// Show the location history
    Locations {
        #[arg(long)]
        username: Option<String>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))
}

struct PromptLogin;

impl LoginRedirect for PromptLogin {
    fn redirect(&self, _login_path: &str) {
        eprintln!("Session expired. Run `inspectctl login` to sign in again.");
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn query<'a>(pairs: &'a [(&'a str, &'a Option<String>)]) -> Vec<(&'a str, &'a str)> {
    pairs
        .iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::new(&cli.log_level))
        .init();

    let mut config = ClientConfig::default();
    config.init_from_env().map_err(anyhow::Error::msg)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(session) = cli.session {
        config.session_file = session;
    }

    let store = FileSessionStore::open(&config.session_file)
        .with_context(|| format!("opening session {}", config.session_file.display()))?;
    let client = AuthClient::new(&config, Arc::new(store))
        .context("building API client")?
        .with_redirect(Arc::new(PromptLogin));

    match cli.command {
        Commands::Login { username, password } => {
            let me = client.login(&username, &password).await.context("login failed")?;
            println!("Logged in as {} ({})", me.username, me.role.as_str());
        }
        Commands::Logout => {
            client.logout().await.context("logout failed")?;
            println!("Logged out");
        }
        Commands::Me => print_json(&serde_json::to_value(client.me().await?)?)?,
        Commands::Riders => print_json(&client.get_json("/riders", &[]).await?)?,
        Commands::Inspections { city, location } => {
            let value: Value = if city.is_some() || location.is_some() {
                let pairs = [("city", &city), ("location", &location)];
                client.get_json("/inspections/search", &query(&pairs)).await?
            } else {
                client.get_json("/inspections", &[]).await?
            };
            print_json(&value)?;
        }
        Commands::Inspect {
            rider_id,
            id_number,
            fields,
            image,
        } => {
            let mut parts: Vec<MultipartPart> = fields
                .into_iter()
                .map(|(name, value)| MultipartPart::text(name, value))
                .collect();
            if let Some(rider_id) = rider_id {
                parts.push(MultipartPart::text("rider_id", rider_id.to_string()));
            }
            if let Some(id_number) = id_number {
                parts.push(MultipartPart::text("id_number", id_number));
            }
            if let Some(path) = image {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "image".to_string());
                parts.push(MultipartPart::file("image", file_name, bytes));
            }
            let created: Value = client
                .send_multipart(Method::POST, "/inspections", parts)
                .await?;
            print_json(&created)?;
        }
        Commands::Rules => print_json(&client.get_json("/rules", &[]).await?)?,
        Commands::Matches {
            city,
            status,
            field,
        } => {
            let pairs = [("city", &city), ("status", &status), ("field", &field)];
            print_json(&client.get_json("/actions/matches", &query(&pairs)).await?)?;
        }
        Commands::Confirm {
            inspection_id,
            rule_id,
            notes,
        } => {
            let body = ConfirmRequest {
                inspection_id,
                rule_id,
                notes,
            };
            let state: Value = client
                .send_json(Method::POST, "/actions/confirm", &body)
                .await?;
            print_json(&state)?;
        }
        Commands::Unconfirm {
            inspection_id,
            rule_id,
        } => {
            let body = MatchKeyRequest {
                inspection_id,
                rule_id,
            };
            let state: Value = client
                .send_json(Method::POST, "/actions/unconfirm", &body)
                .await?;
            print_json(&state)?;
        }
        Commands::Assign {
            inspection_id,
            rule_id,
            assignee,
            assignee2,
        } => {
            let body = AssignRequest {
                inspection_id,
                rule_id,
                assignee_user_id: assignee,
                assignee2_user_id: assignee2,
            };
            let state: Value = client
                .send_json(Method::POST, "/actions/assign", &body)
                .await?;
            print_json(&state)?;
        }
        Commands::Ping {
            latitude,
            longitude,
        } => {
            let body = LocationRequest {
                latitude,
                longitude,
            };
            let saved: Value = client.send_json(Method::POST, "/api/locations", &body).await?;
            print_json(&saved)?;
        }
        Commands::Locations { username } => {
            let pairs = [("username", &username)];
            print_json(&client.get_json("/api/locations", &query(&pairs)).await?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_pairs_split_on_the_first_equals() {
        assert_eq!(
            parse_pair("comments=a=b").unwrap(),
            ("comments".to_string(), "a=b".to_string())
        );
        assert!(parse_pair("helmet").is_err());
        assert!(parse_pair("=ok").is_err());
    }

    #[test]
    fn negative_coordinates_parse_as_values() {
        let cli = Cli::try_parse_from(["inspectctl", "ping", "33.5", "-7.6"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ping { latitude, longitude } if latitude == 33.5 && longitude == -7.6
        ));
    }

    #[test]
    fn unset_query_values_are_skipped() {
        let city = Some("Bogota".to_string());
        let status = None;
        let pairs = [("city", &city), ("status", &status)];
        assert_eq!(query(&pairs), vec![("city", "Bogota")]);
    }
}
