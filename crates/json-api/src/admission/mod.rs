//! Admission control middleware.

pub(crate) mod rate_limit;
pub(crate) mod throttle;

use std::sync::Arc;

use salvo::{Depot, Request};

use crate::state::State;

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Works out which address a request came from.
///
/// `x-forwarded-for` is written by whoever sent the request, so it is only
/// read when `trusted_proxy_hops` proxies of our own sit in front of the
/// server. Each of them appends the address it saw, which makes the entry
/// `trusted_proxy_hops` places from the right the first one a client could
/// not have forged.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClientIpResolver {
    trusted_proxy_hops: usize,
}

impl ClientIpResolver {
    pub(crate) fn new(trusted_proxy_hops: usize) -> Self {
        Self { trusted_proxy_hops }
    }

    pub(crate) fn resolve(&self, req: &Request) -> String {
        self.forwarded_for(req).unwrap_or_else(|| peer_ip(req))
    }

    fn forwarded_for(&self, req: &Request) -> Option<String> {
        if self.trusted_proxy_hops == 0 {
            return None;
        }

        let hops: Vec<&str> = req
            .headers()
            .get_all(FORWARDED_FOR_HEADER)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .collect();

        let index = hops.len().checked_sub(self.trusted_proxy_hops)?;

        hops.get(index)
            .filter(|hop| !hop.is_empty())
            .map(|hop| (*hop).to_string())
    }
}

/// Client address for `req`, using the resolver configured on the injected
/// state, or the peer address when there is none.
pub(crate) fn client_ip(req: &Request, depot: &Depot) -> String {
    depot
        .obtain::<Arc<State>>()
        .map_or_else(|_| ClientIpResolver::default(), |state| state.client_ip)
        .resolve(req)
}

fn peer_ip(req: &Request) -> String {
    let addr = req.remote_addr();

    if let Some(v4) = addr.as_ipv4() {
        return v4.ip().to_string();
    }

    if let Some(v6) = addr.as_ipv6() {
        return v6.ip().to_string();
    }

    "unknown".to_string()
}
