//! Proxy routes and their outbound targets.
//!
//! Each route names an inbound dialect and an outbound target that is
//! either a concrete provider or another route (chained, cycle-checked).

use crate::mapping::ModelMapping;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An upstream provider's credentials and endpoint, the terminal case of
/// a route's outbound target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTarget {
    pub base_url: String,
    pub api_key: String,
    pub chat_path: String,
}

/// A route's outbound target: terminates at a provider, or chains to
/// another route by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Provider {
        #[serde(flatten)]
        target: ProviderTarget,
        /// The dialect the upstream speaks, selecting which adapter's
        /// `build_request`/`parse_response`/`parse_stream` to use.
        adapter: String,
    },
    Proxy {
        route_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRoute {
    pub id: String,
    pub proxy_path: String,
    /// The dialect the inbound client speaks, selecting which adapter's
    /// `parse_request`/`build_response`/`create_stream_builder` to use.
    pub inbound_adapter: String,
    pub outbound: Outbound,
    #[serde(default)]
    pub model_mappings: Vec<ModelMapping>,
    pub enabled: bool,
}

/// The maximum proxy-chain depth before resolution fails with
/// `validation (circular_or_deep)`.
pub const DEFAULT_MAX_PROXY_DEPTH: usize = 4;

/// A snapshot of every known route, published atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTable {
    pub routes: Vec<ProxyRoute>,
}

impl RouteTable {
    /// Finds the unique enabled route whose `proxy_path` matches.
    pub fn find_by_path(&self, proxy_path: &str) -> Option<&ProxyRoute> {
        self.routes.iter().find(|r| r.enabled && r.proxy_path == proxy_path)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&ProxyRoute> {
        self.routes.iter().find(|r| r.id == id)
    }

    /// Walks a chain of `proxy` outbounds down to its terminal `provider`,
    /// tracking visited route ids to reject cycles and bounding depth to
    /// `max_depth`. Returns the terminal provider target plus the adapter
    /// name it speaks.
    pub fn resolve_outbound(
        &self,
        start: &ProxyRoute,
        max_depth: usize,
    ) -> Result<(&ProviderTarget, &str), ResolveError> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(start.id.as_str());
        let mut current = start;
        let mut depth = 0usize;
        loop {
            match &current.outbound {
                Outbound::Provider { target, adapter } => return Ok((target, adapter.as_str())),
                Outbound::Proxy { route_id } => {
                    depth += 1;
                    if depth > max_depth {
                        return Err(ResolveError::TooDeep);
                    }
                    if !visited.insert(route_id.as_str()) {
                        return Err(ResolveError::Cycle);
                    }
                    current = self
                        .find_by_id(route_id)
                        .ok_or_else(|| ResolveError::DanglingRef(route_id.clone()))?;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    Cycle,
    TooDeep,
    DanglingRef(String),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Cycle => write!(f, "circular proxy chain detected"),
            ResolveError::TooDeep => write!(f, "proxy chain exceeds maximum depth"),
            ResolveError::DanglingRef(id) => write!(f, "proxy chain references unknown route {id:?}"),
        }
    }
}

impl From<ResolveError> for crate::ir::LLMErrorIR {
    fn from(e: ResolveError) -> Self {
        crate::ir::LLMErrorIR::circular_or_deep(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_route(id: &str, proxy_path: &str) -> ProxyRoute {
        ProxyRoute {
            id: id.to_string(),
            proxy_path: proxy_path.to_string(),
            inbound_adapter: "openai".to_string(),
            outbound: Outbound::Provider {
                target: ProviderTarget {
                    base_url: "https://api.anthropic.com".to_string(),
                    api_key: "key".to_string(),
                    chat_path: "/v1/messages".to_string(),
                },
                adapter: "anthropic".to_string(),
            },
            model_mappings: vec![],
            enabled: true,
        }
    }

    fn proxy_route(id: &str, proxy_path: &str, target: &str) -> ProxyRoute {
        ProxyRoute {
            id: id.to_string(),
            proxy_path: proxy_path.to_string(),
            inbound_adapter: "openai".to_string(),
            outbound: Outbound::Proxy { route_id: target.to_string() },
            model_mappings: vec![],
            enabled: true,
        }
    }

    #[test]
    fn resolves_through_a_chain() {
        let table = RouteTable { routes: vec![proxy_route("a", "a", "b"), provider_route("b", "b")] };
        let start = table.find_by_id("a").unwrap();
        let (target, adapter) = table.resolve_outbound(start, DEFAULT_MAX_PROXY_DEPTH).unwrap();
        assert_eq!(adapter, "anthropic");
        assert_eq!(target.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn rejects_a_two_node_cycle() {
        let table = RouteTable { routes: vec![proxy_route("a", "a", "b"), proxy_route("b", "b", "a")] };
        let start = table.find_by_id("a").unwrap();
        assert_eq!(table.resolve_outbound(start, DEFAULT_MAX_PROXY_DEPTH), Err(ResolveError::Cycle));
    }

    #[test]
    fn rejects_depth_beyond_the_limit() {
        let routes = vec![
            proxy_route("a", "a", "b"),
            proxy_route("b", "b", "c"),
            proxy_route("c", "c", "d"),
            proxy_route("d", "d", "e"),
            proxy_route("e", "e", "f"),
            provider_route("f", "f"),
        ];
        let table = RouteTable { routes };
        let start = table.find_by_id("a").unwrap();
        assert_eq!(table.resolve_outbound(start, DEFAULT_MAX_PROXY_DEPTH), Err(ResolveError::TooDeep));
    }

    #[test]
    fn finds_unique_enabled_route_by_path() {
        let mut r = provider_route("a", "my-proxy");
        r.enabled = false;
        let table = RouteTable { routes: vec![r] };
        assert!(table.find_by_path("my-proxy").is_none());
    }
}
