// src/geo.rs
// Geolocation seam for the VPN/geo gate.
// Resolves a client IP to country/continent/timezone attributes. The
// production implementation reads edge-resolved geo headers; tests and
// embedded databases plug in through the GeoLookup trait.

use spin_sdk::http::Request;

/// Location attributes for a resolved IP. Any field may be missing
/// when the database record is incomplete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub country_code: Option<String>,
    pub continent_code: Option<String>,
    pub time_zone: Option<String>,
}

/// Outcome of a geolocation lookup. Every failure mode (address not in
/// the database, malformed IP, provider error) collapses to Unresolved;
/// callers must not distinguish causes.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoOutcome {
    Resolved(Location),
    Unresolved,
}

pub trait GeoLookup {
    fn resolve(&self, ip: &str) -> GeoOutcome;
}

/// Geo attributes captured from trusted edge headers (the edge proxy
/// has already resolved the connecting IP). Unresolved when no country
/// header was supplied.
#[derive(Debug, Clone, Default)]
pub struct EdgeGeo {
    country: Option<String>,
    continent: Option<String>,
    timezone: Option<String>,
}

impl EdgeGeo {
    pub fn from_request(req: &Request) -> Self {
        EdgeGeo {
            country: header_value(req, "x-geo-country"),
            continent: header_value(req, "x-geo-continent"),
            timezone: header_value(req, "x-geo-timezone"),
        }
    }
}

impl GeoLookup for EdgeGeo {
    fn resolve(&self, _ip: &str) -> GeoOutcome {
        match &self.country {
            Some(country) => GeoOutcome::Resolved(Location {
                country_code: Some(country.clone()),
                continent_code: self.continent.clone(),
                time_zone: self.timezone.clone(),
            }),
            None => GeoOutcome::Unresolved,
        }
    }
}

fn header_value(req: &Request, name: &str) -> Option<String> {
    req.header(name)
        .and_then(|header| header.as_str())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
