// tests/gate.rs
// Integration tests for the full VPN & geo gate pipeline

use std::collections::HashMap;
use std::sync::Mutex;

use spin_sdk::http::{Method, Request, Response};
use wasm_geo_gate::{
    handle_gate_impl, Action, Config, GeoLookup, GeoOutcome, Handler, KeyValueStore, Location,
};

#[derive(Default)]
struct TestStore {
    map: Mutex<HashMap<String, Vec<u8>>>,
}

impl KeyValueStore for TestStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ()> {
        let map = self.map.lock().unwrap();
        Ok(map.get(key).cloned())
    }
    fn set(&self, key: &str, value: &[u8]) -> Result<(), ()> {
        let mut map = self.map.lock().unwrap();
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }
    fn delete(&self, key: &str) -> Result<(), ()> {
        let mut map = self.map.lock().unwrap();
        map.remove(key);
        Ok(())
    }
}

struct TestGeo(GeoOutcome);

impl GeoLookup for TestGeo {
    fn resolve(&self, _ip: &str) -> GeoOutcome {
        self.0.clone()
    }
}

struct App;

impl Handler for App {
    fn handle(&self, _req: &Request) -> Response {
        Response::builder()
            .status(200)
            .header("Content-Type", "text/html; charset=utf-8")
            .body("welcome")
            .build()
    }
}

fn geo_us() -> TestGeo {
    TestGeo(GeoOutcome::Resolved(Location {
        country_code: Some("US".to_string()),
        continent_code: Some("NA".to_string()),
        time_zone: Some("America/New_York".to_string()),
    }))
}

fn html_get(ip: &str) -> Request {
    let mut builder = Request::builder();
    builder
        .method(Method::Get)
        .uri("/")
        .header("x-forwarded-for", ip)
        .header("accept", "text/html");
    builder.build()
}

fn timezone_post(ip: &str, timezone: &str) -> Request {
    let mut builder = Request::builder();
    builder
        .method(Method::Post)
        .uri("/")
        .header("x-forwarded-for", ip)
        .header("accept", "text/html")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(format!("timezone={}", timezone));
    builder.build()
}

#[test]
fn location_gate_denies_by_country_before_any_challenge() {
    let store = TestStore::default();
    let cfg = Config {
        action: Action::Permit,
        countries: vec!["US".to_string()],
        forbid_vpn: true,
        ..Config::default()
    };
    let geo = TestGeo(GeoOutcome::Resolved(Location {
        country_code: Some("CA".to_string()),
        continent_code: Some("NA".to_string()),
        time_zone: Some("America/Toronto".to_string()),
    }));
    let resp = handle_gate_impl(&store, &geo, &cfg, &html_get("198.51.100.1"), &App);
    assert_eq!(*resp.status(), 403u16);
}

#[test]
fn challenge_then_matching_resubmit_releases_the_real_response() {
    let store = TestStore::default();
    let cfg = Config {
        forbid_vpn: true,
        ..Config::default()
    };
    let geo = geo_us();

    // Round one: the real response is deferred behind the challenge page.
    let resp = handle_gate_impl(&store, &geo, &cfg, &html_get("203.0.113.9"), &App);
    assert_eq!(*resp.status(), 302u16);
    let body = String::from_utf8_lossy(resp.body()).to_string();
    assert!(body.contains("name=\"timezone\""));

    // Round two: the browser resubmits its timezone and gets the original.
    let resp = handle_gate_impl(
        &store,
        &geo,
        &cfg,
        &timezone_post("203.0.113.9", "America%2FNew_York"),
        &App,
    );
    assert_eq!(*resp.status(), 200u16);
    assert_eq!(resp.body(), b"welcome");
}

#[test]
fn mismatching_resubmit_is_blocked() {
    let store = TestStore::default();
    let cfg = Config {
        forbid_vpn: true,
        ..Config::default()
    };
    let geo = geo_us();

    let resp = handle_gate_impl(&store, &geo, &cfg, &html_get("203.0.113.9"), &App);
    assert_eq!(*resp.status(), 302u16);

    let resp = handle_gate_impl(
        &store,
        &geo,
        &cfg,
        &timezone_post("203.0.113.9", "Europe%2FParis"),
        &App,
    );
    assert_eq!(*resp.status(), 403u16);
}

#[test]
fn api_clients_are_never_challenged() {
    let store = TestStore::default();
    let cfg = Config {
        forbid_vpn: true,
        vpn: true,
        ..Config::default()
    };
    let mut builder = Request::builder();
    builder
        .method(Method::Get)
        .uri("/api/data")
        .header("x-forwarded-for", "203.0.113.9")
        .header("accept", "application/json");
    let resp = handle_gate_impl(&store, &geo_us(), &cfg, &builder.build(), &App);
    assert_eq!(*resp.status(), 200u16);
    assert_eq!(resp.body(), b"welcome");
}

#[test]
fn network_variant_cooldown_allows_repeat_visits() {
    let store = TestStore::default();
    let cfg = Config {
        vpn: true,
        period: Some(300.0),
        ..Config::default()
    };
    let geo = geo_us();

    let resp = handle_gate_impl(&store, &geo, &cfg, &html_get("203.0.113.9"), &App);
    assert_eq!(*resp.status(), 302u16);

    let resp = handle_gate_impl(
        &store,
        &geo,
        &cfg,
        &timezone_post("203.0.113.9", "America%2FNew_York"),
        &App,
    );
    assert_eq!(*resp.status(), 200u16);

    // Verified moments ago: no new challenge within the period.
    let resp = handle_gate_impl(&store, &geo, &cfg, &html_get("203.0.113.9"), &App);
    assert_eq!(*resp.status(), 200u16);
    assert_eq!(resp.body(), b"welcome");
}

#[test]
fn gate_disabled_passes_requests_untouched() {
    let store = TestStore::default();
    let resp = handle_gate_impl(
        &store,
        &geo_us(),
        &Config::default(),
        &html_get("203.0.113.9"),
        &App,
    );
    assert_eq!(*resp.status(), 200u16);
    assert_eq!(resp.body(), b"welcome");
}
