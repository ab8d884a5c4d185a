use anyhow::{Context, Result};
use bullhorn::config::{REST_URL_ENV, TOKEN_ENV};
use bullhorn::{BullhornClient, ClientConfig, QueryParams, SearchParams};
use clap::Parser;
use serde_json::Value;

/// bullhorn - Bullhorn REST API client
///
/// Talks to the REST URL of an existing session. The session token and REST
/// URL are read from BULLHORN_SESSION_TOKEN and BULLHORN_REST_URL unless given
/// on the command line.
///
/// Examples:
///   bullhorn ping
///   bullhorn search Candidate "isDeleted:0" --fields id,firstName --all
#[derive(Parser, Debug)]
#[command(author, version = bullhorn::client::VERSION, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// REST session token
    #[arg(long, env = TOKEN_ENV, hide_env_values = true, global = true)]
    token: Option<String>,

    /// REST base URL of the session
    #[arg(long = "rest-url", env = REST_URL_ENV, value_name = "URL", global = true)]
    rest_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Check the session and print its expiry
    Ping,

    /// Fetch one entity by id
    Get(GetArgs),

    /// Lucene search over an entity type
    Search(SearchArgs),

    /// JPQL-style query over an entity type
    Query(QueryArgs),

    /// Print field metadata for an entity type
    Meta(MetaArgs),

    /// Print system settings
    Settings(SettingsArgs),
}

#[derive(clap::Args, Debug)]
struct GetArgs {
    /// Entity type, e.g. Candidate
    entity_type: String,

    id: i64,

    /// Comma-separated fields to return
    #[arg(long)]
    fields: Option<String>,
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    entity_type: String,

    /// Lucene query, e.g. "isDeleted:0"
    query: String,

    #[arg(long)]
    fields: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    sort: Option<String>,

    #[arg(long)]
    count: Option<u64>,

    #[arg(long)]
    start: Option<u64>,

    /// Follow pages until every match is fetched
    #[arg(long)]
    all: bool,
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    entity_type: String,

    /// Where clause, e.g. "isOpen=true"
    #[arg(value_name = "WHERE")]
    where_clause: String,

    #[arg(long)]
    fields: Option<String>,

    #[arg(long = "order-by", allow_hyphen_values = true)]
    order_by: Option<String>,

    #[arg(long)]
    count: Option<u64>,

    #[arg(long)]
    start: Option<u64>,

    /// Follow pages until every match is fetched
    #[arg(long)]
    all: bool,
}

#[derive(clap::Args, Debug)]
struct MetaArgs {
    entity_type: String,

    #[arg(long)]
    fields: Option<String>,
}

#[derive(clap::Args, Debug)]
struct SettingsArgs {
    /// Comma-separated setting names
    names: String,
}

impl From<SearchArgs> for SearchParams {
    fn from(args: SearchArgs) -> Self {
        SearchParams {
            entity_type: args.entity_type,
            query: args.query,
            fields: args.fields,
            sort: args.sort,
            count: args.count,
            start: args.start,
        }
    }
}

impl From<QueryArgs> for QueryParams {
    fn from(args: QueryArgs) -> Self {
        QueryParams {
            entity_type: args.entity_type,
            where_clause: args.where_clause,
            fields: args.fields,
            order_by: args.order_by,
            count: args.count,
            start: args.start,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let rest_url = cli
        .rest_url
        .with_context(|| format!("--rest-url or {} is required", REST_URL_ENV))?;
    let client = BullhornClient::from_config(ClientConfig::new(cli.token, rest_url));

    let output: Value = match cli.command {
        Commands::Ping => serde_json::to_value(client.login().await?)?,
        Commands::Get(args) => {
            client
                .get_entity(&args.entity_type, args.id, args.fields.as_deref())
                .await?
        }
        Commands::Search(args) => {
            let all = args.all;
            let params = SearchParams::from(args);
            let records: Vec<Value> = if all {
                client.search_all(&params).await?
            } else {
                client.search(&params).await?
            };
            Value::Array(records)
        }
        Commands::Query(args) => {
            let all = args.all;
            let params = QueryParams::from(args);
            let records: Vec<Value> = if all {
                client.query_all(&params).await?
            } else {
                client.query(&params).await?
            };
            Value::Array(records)
        }
        Commands::Meta(args) => {
            client
                .get_meta(&args.entity_type, args.fields.as_deref())
                .await?
        }
        Commands::Settings(args) => client.get_settings(&args.names).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_ping_parsing() {
        let cli = Cli::try_parse_from(["bullhorn", "--rest-url", "https://x/", "ping"]).unwrap();
        assert!(matches!(cli.command, Commands::Ping));
        assert_eq!(cli.rest_url.as_deref(), Some("https://x/"));
    }

    #[test]
    fn test_cli_search_parsing() {
        let cli = Cli::try_parse_from([
            "bullhorn",
            "search",
            "Candidate",
            "isDeleted:0",
            "--fields",
            "id,firstName",
            "--count",
            "50",
            "--all",
        ])
        .unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.entity_type, "Candidate");
                assert_eq!(args.query, "isDeleted:0");
                assert_eq!(args.count, Some(50));
                assert!(args.all);
                let params = SearchParams::from(args);
                assert_eq!(params.fields.as_deref(), Some("id,firstName"));
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_query_parsing() {
        let cli = Cli::try_parse_from([
            "bullhorn",
            "query",
            "JobOrder",
            "isOpen=true",
            "--order-by=-dateAdded",
        ])
        .unwrap();
        match cli.command {
            Commands::Query(args) => {
                let params = QueryParams::from(args);
                assert_eq!(params.where_clause, "isOpen=true");
                assert_eq!(params.order_by.as_deref(), Some("-dateAdded"));
                assert!(params.start.is_none());
            }
            _ => panic!("Expected Query command"),
        }
    }

    #[test]
    fn test_cli_get_requires_numeric_id() {
        let result = Cli::try_parse_from(["bullhorn", "get", "Candidate", "abc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        let result = Cli::try_parse_from(["bullhorn"]);
        assert!(result.is_err());
    }
}
