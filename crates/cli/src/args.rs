//! Command line surface.

use std::path::PathBuf;
use std::str::FromStr;

use abstractions::{HttpMethod, PrimitiveType};
use clap::Parser;

/// Send one request through the generated-client runtime and print the
/// decoded response as JSON.
#[derive(Debug, Parser)]
#[command(name = "apicall", version)]
pub struct Cli {
    /// Base URL every request path is resolved against.
    #[arg(long, env = "APICALL_BASE_URL")]
    pub base_url: String,

    /// Request path below the base URL, e.g. `/users/{id}`.
    pub path: String,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
    pub method: HttpMethod,

    /// How to decode the response: `object`, `collection`, `primitive:<type>`,
    /// `primitives:<type>` or `none`.
    #[arg(long, default_value = "object")]
    pub shape: Shape,

    /// Path template parameter, `name=value`. Repeatable.
    #[arg(short = 'p', long = "param", value_parser = parse_pair::<'='>)]
    pub params: Vec<(String, String)>,

    /// Query parameter, `name=value`. Repeatable.
    #[arg(short = 'q', long = "query", value_parser = parse_pair::<'='>)]
    pub query: Vec<(String, String)>,

    /// Request header, `name:value`. Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_pair::<':'>)]
    pub headers: Vec<(String, String)>,

    /// JSON request body.
    #[arg(short = 'd', long)]
    pub body: Option<String>,

    /// Bearer token attached to requests for allowed hosts.
    #[arg(long, env = "APICALL_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Hosts the bearer token may be sent to. Defaults to the base URL's host.
    #[arg(long = "allowed-host")]
    pub allowed_hosts: Vec<String>,

    /// JSON file with HTTP client settings (timeouts, user agent, default headers).
    #[arg(long)]
    pub client_config: Option<PathBuf>,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long)]
    pub log_json: bool,
}

/// The response shape requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Object,
    Collection,
    Primitive(PrimitiveType),
    Primitives(PrimitiveType),
    None,
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primitive = |name: &str| {
            PrimitiveType::from_name(name).ok_or_else(|| format!("unknown primitive type '{name}'"))
        };

        match s.split_once(':') {
            Some(("primitive", name)) => primitive(name).map(Shape::Primitive),
            Some(("primitives", name)) => primitive(name).map(Shape::Primitives),
            Some(_) => Err(format!("unknown shape '{s}'")),
            None => match s {
                "object" => Ok(Shape::Object),
                "collection" => Ok(Shape::Collection),
                "none" => Ok(Shape::None),
                "primitive" | "primitives" => Err(format!("'{s}' needs a type, e.g. '{s}:string'")),
                _ => Err(format!("unknown shape '{s}'")),
            },
        }
    }
}

fn parse_method(s: &str) -> Result<HttpMethod, String> {
    s.parse().map_err(|e: abstractions::RequestError| e.to_string())
}

fn parse_pair<const SEP: char>(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(SEP)
        .ok_or_else(|| format!("expected 'name{SEP}value', got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing name in '{s}'"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_parse() {
        assert_eq!("object".parse::<Shape>(), Ok(Shape::Object));
        assert_eq!("collection".parse::<Shape>(), Ok(Shape::Collection));
        assert_eq!("none".parse::<Shape>(), Ok(Shape::None));
        assert_eq!(
            "primitive:int64".parse::<Shape>(),
            Ok(Shape::Primitive(PrimitiveType::Int64))
        );
        assert_eq!(
            "primitives:UUID".parse::<Shape>(),
            Ok(Shape::Primitives(PrimitiveType::Uuid))
        );
    }

    #[test]
    fn bad_shapes_are_rejected() {
        assert!("primitive".parse::<Shape>().unwrap_err().contains("needs a type"));
        assert!("primitive:decimal".parse::<Shape>().unwrap_err().contains("decimal"));
        assert!("table".parse::<Shape>().is_err());
        assert!("table:string".parse::<Shape>().is_err());
    }

    #[test]
    fn pairs_split_on_the_first_separator() {
        assert_eq!(
            parse_pair::<':'>("Accept: application/json"),
            Ok(("Accept".to_owned(), "application/json".to_owned()))
        );
        assert_eq!(
            parse_pair::<'='>("filter=a=b"),
            Ok(("filter".to_owned(), "a=b".to_owned()))
        );
        assert!(parse_pair::<'='>("=x").is_err());
        assert!(parse_pair::<':'>("no-separator").is_err());
    }

    #[test]
    fn command_line_parses() {
        let cli = Cli::try_parse_from([
            "apicall",
            "--base-url",
            "https://api.example.com",
            "/users/{id}",
            "-X",
            "delete",
            "-p",
            "id=7",
            "--shape",
            "none",
        ])
        .unwrap();

        assert_eq!(cli.method, HttpMethod::Delete);
        assert_eq!(cli.shape, Shape::None);
        assert_eq!(cli.params, vec![("id".to_owned(), "7".to_owned())]);
        assert!(cli.bearer_token.is_none());
    }
}
