// src/location.rs
// Location gate: resolves the client IP to a location, records the
// timezone in the session for later mismatch comparison, and denies
// requests that fail the configured access policy.

use spin_sdk::http::{Request, Response};

use crate::block_page::{self, BlockReason};
use crate::config::Config;
use crate::geo::{GeoLookup, GeoOutcome};
use crate::policy::AccessPolicy;
use crate::session::{KeyValueStore, Session, TZ_UNKNOWN};
use crate::Handler;

pub fn enforce<S, G, H>(store: &S, geo: &G, cfg: &Config, req: &Request, next: &H) -> Response
where
    S: KeyValueStore,
    G: GeoLookup,
    H: Handler,
{
    let ip = crate::extract_client_ip(req);

    let (granted, time_zone) = match geo.resolve(&ip) {
        GeoOutcome::Resolved(location) => {
            let granted = AccessPolicy::from_config(cfg).grants(&location);
            (granted, location.time_zone)
        }
        // Local and private addresses land here. Without configured
        // rules, or in debug mode, they are not blocked outright.
        GeoOutcome::Unresolved => {
            let granted =
                (cfg.countries.is_empty() && cfg.territories.is_empty()) || cfg.debug;
            (granted, None)
        }
    };

    // Recorded on both paths: the timezone challenge compares against
    // this value on a later request.
    let mut session = Session::load(store, &ip);
    session.tz = Some(time_zone.unwrap_or_else(|| TZ_UNKNOWN.to_string()));
    session.save(store, &ip);

    if granted {
        return next.handle(req);
    }

    println!("[GEO DENY] ip={}", ip);
    if let Some(url) = &cfg.forbidden_loc_url {
        return block_page::redirect_to(url);
    }
    block_page::forbidden(BlockReason::LocationPolicy)
}
