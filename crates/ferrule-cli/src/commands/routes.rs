// crates/ferrule-cli/src/commands/routes.rs
//
// `ferrule routes`: list the endpoints a daemon exposes.

use ferrule_core::{EndpointKind, Meta};
use serde::Deserialize;
use serde_json::Value;
use tabled::Tabled;

use crate::output::{format_json, format_table, OutputFormat};
use crate::rpc_client::{rpc_call, Identity};

const DESCRIBE_METHOD: &str = "rpc.describe";

/// One endpoint as reported by the daemon.
#[derive(Debug, Clone, Deserialize)]
struct Route {
    path: String,
    kind: EndpointKind,
    #[serde(default)]
    meta: Meta,
    #[serde(default)]
    middlewares: Vec<String>,
}

/// A row in the routes table.
#[derive(Debug, Tabled)]
struct RouteRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Chain")]
    chain: String,
    #[tabled(rename = "Deprecated")]
    deprecated: String,
}

impl From<&Route> for RouteRow {
    fn from(route: &Route) -> Self {
        let deprecated = match route.meta.get("deprecated") {
            Some(Value::Bool(true)) => "yes".to_string(),
            Some(Value::String(reason)) => reason.clone(),
            _ => "--".to_string(),
        };
        RouteRow {
            path: route.path.clone(),
            kind: route.kind.to_string(),
            chain: route.middlewares.join(" > "),
            deprecated,
        }
    }
}

/// Run the routes command.
pub async fn run(
    endpoint: &str,
    identity: &Identity,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = rpc_call(endpoint, DESCRIBE_METHOD, Value::Null, identity)
        .await?
        .into_result()?;

    if format == OutputFormat::Json {
        println!("{}", format_json(&result));
        return Ok(());
    }

    let routes: Vec<Route> = serde_json::from_value(result)?;
    let rows: Vec<RouteRow> = routes.iter().map(RouteRow::from).collect();
    println!("{}", format_table(&rows));
    println!("{} endpoint(s)", rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route(meta: Value) -> Route {
        serde_json::from_value(json!({
            "path": "users.getById",
            "kind": "query",
            "meta": meta,
            "middlewares": ["logging", "auth", "rate_limit"]
        }))
        .unwrap()
    }

    #[test]
    fn test_row_from_route() {
        let row = RouteRow::from(&route(json!({})));
        assert_eq!(row.path, "users.getById");
        assert_eq!(row.kind, "query");
        assert_eq!(row.chain, "logging > auth > rate_limit");
        assert_eq!(row.deprecated, "--");
    }

    #[test]
    fn test_row_shows_deprecation() {
        assert_eq!(RouteRow::from(&route(json!({ "deprecated": true }))).deprecated, "yes");
        assert_eq!(
            RouteRow::from(&route(json!({ "deprecated": "use getByEmail" }))).deprecated,
            "use getByEmail"
        );
    }

    #[test]
    fn test_table_renders_headers() {
        let rows = vec![RouteRow::from(&route(json!({})))];
        let table = format_table(&rows);
        assert!(table.contains("Path"));
        assert!(table.contains("users.getById"));
    }
}
