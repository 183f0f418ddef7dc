//! Route resolution and model-mapping behavior exercised through the public
//! crate surface rather than `src/route.rs`'s own unit tests.

use merco_gateway::route::{Outbound, ProviderTarget, ProxyRoute, RouteTable};

fn openai_route(id: &str, path: &str) -> ProxyRoute {
    ProxyRoute {
        id: id.to_string(),
        proxy_path: path.to_string(),
        inbound_adapter: "openai".to_string(),
        outbound: Outbound::Provider {
            target: ProviderTarget {
                base_url: "https://api.openai.com".to_string(),
                api_key: "sk-test".to_string(),
                chat_path: "/v1/chat/completions".to_string(),
            },
            adapter: "openai".to_string(),
        },
        model_mappings: vec![],
        enabled: true,
    }
}

#[test]
fn disabled_routes_are_invisible_to_lookup() {
    let mut route = openai_route("r1", "my-proxy");
    route.enabled = false;
    let table = RouteTable { routes: vec![route] };
    assert!(table.find_by_path("my-proxy").is_none());
}

#[test]
fn enabled_route_resolves_to_its_provider_target() {
    let table = RouteTable { routes: vec![openai_route("r1", "my-proxy")] };
    let route = table.find_by_path("my-proxy").expect("route present");
    let (target, adapter) = table.resolve_outbound(route, 4).expect("resolves");
    assert_eq!(adapter, "openai");
    assert_eq!(target.base_url, "https://api.openai.com");
}
