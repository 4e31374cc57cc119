// src/lib.rs
// Entry point for the WASM VPN & Geo Forbid Spin app

#[cfg(test)]
mod test_support;

use spin_sdk::http::{Request, Response};
#[cfg(target_arch = "wasm32")]
use spin_sdk::http_component;
#[cfg(target_arch = "wasm32")]
use spin_sdk::key_value::Store;
use std::env;

mod block_page; // Forbidden pages and redirects
mod config;     // Config loading and defaults
mod geo;        // Geolocation seam (edge headers, injected lookups)
mod location;   // Location gate (permit/forbid by country/continent)
mod policy;     // Access rules and permit/forbid evaluation
mod session;    // Per-client session state in KV
mod timezone;   // Timezone challenge state machine

pub use config::Config;
pub use geo::{EdgeGeo, GeoLookup, GeoOutcome, Location};
pub use policy::{AccessPolicy, AccessRule, Action, RuleField};
pub use session::{DeferredResponse, KeyValueStore, Session};
pub use timezone::Variant;

/// The wrapped application: whatever produces the real response once
/// the gate lets a request through.
pub trait Handler {
    fn handle(&self, req: &Request) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Response,
{
    fn handle(&self, req: &Request) -> Response {
        self(req)
    }
}

struct DetectLayer<'a, S, H> {
    store: &'a S,
    cfg: &'a Config,
    next: &'a H,
}

impl<S: KeyValueStore, H: Handler> Handler for DetectLayer<'_, S, H> {
    fn handle(&self, req: &Request) -> Response {
        timezone::intercept(self.store, self.cfg, req, Variant::Detect, self.next)
    }
}

struct NetworkLayer<'a, S, H> {
    store: &'a S,
    cfg: &'a Config,
    next: &'a H,
}

impl<S: KeyValueStore, H: Handler> Handler for NetworkLayer<'_, S, H> {
    fn handle(&self, req: &Request) -> Response {
        timezone::intercept(self.store, self.cfg, req, Variant::Network, self.next)
    }
}

/// Returns true if forwarded IP headers should be trusted for this request.
/// If FORWARDED_IP_SECRET is set, require a matching X-Gate-Forwarded-Secret header.
fn forwarded_ip_trusted(req: &Request) -> bool {
    match env::var("FORWARDED_IP_SECRET") {
        Ok(secret) => req
            .header("x-gate-forwarded-secret")
            .and_then(|v| v.as_str())
            .map(|v| v == secret)
            .unwrap_or(false),
        Err(_) => true,
    }
}

/// Extract the best available client IP from the request.
pub(crate) fn extract_client_ip(req: &Request) -> String {
    // Prefer X-Forwarded-For (may be a comma-separated list) when trusted
    if forwarded_ip_trusted(req) {
        if let Some(h) = req.header("x-forwarded-for") {
            let val = h.as_str().unwrap_or("");
            // Take the first IP in the list
            if let Some(ip) = val.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() && ip != "unknown" {
                    return ip.to_string();
                }
            }
        }
        // Fallback: X-Real-IP
        if let Some(h) = req.header("x-real-ip") {
            let val = h.as_str().unwrap_or("");
            if !val.is_empty() && val != "unknown" {
                return val.to_string();
            }
        }
    }
    "unknown".to_string()
}

/// Full gate pipeline, testable as a plain Rust function: location gate
/// first (records the session timezone and denies by location), then the
/// detect and network timezone challenges, then the wrapped application.
pub fn handle_gate_impl<S, G, H>(
    store: &S,
    geo: &G,
    cfg: &Config,
    req: &Request,
    app: &H,
) -> Response
where
    S: KeyValueStore,
    G: GeoLookup,
    H: Handler,
{
    let network = NetworkLayer { store, cfg, next: app };
    let detect = DetectLayer { store, cfg, next: &network };
    location::enforce(store, geo, cfg, req, &detect)
}

#[cfg(target_arch = "wasm32")]
struct Upstream;

#[cfg(target_arch = "wasm32")]
impl Handler for Upstream {
    fn handle(&self, _req: &Request) -> Response {
        Response::new(200, "OK (passed geo gate)")
    }
}

#[cfg(target_arch = "wasm32")]
#[http_component]
pub fn spin_entrypoint(req: Request) -> Response {
    let store = match Store::open_default() {
        Ok(s) => s,
        Err(_) => {
            // Fail open: a KV outage must not take the site down.
            println!("[KV OUTAGE] Key-value store unavailable; gate bypassed");
            return Upstream.handle(&req);
        }
    };
    let cfg = Config::load(&store, "default");
    let geo = EdgeGeo::from_request(&req);
    handle_gate_impl(&store, &geo, &cfg, &req, &Upstream)
}
