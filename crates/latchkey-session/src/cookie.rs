//! Reading the session token out of a request.
//!
//! The authenticator never sees a framework request type. It only needs
//! "give me the cookie called X", which is what [`CookieSource`] offers.
//! Implementations are provided for a plain map and, with the `http`
//! feature (on by default), for `http::HeaderMap` and `http::Request`.

use std::collections::HashMap;

/// Anything that can look up a request cookie by name.
pub trait CookieSource {
    /// The value of the cookie called `name`, if the request carries one.
    fn cookie(&self, name: &str) -> Option<String>;
}

impl CookieSource for HashMap<String, String> {
    fn cookie(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Pulls the session token out of `request`.
///
/// Returns `None` when there is no request, when the cookie is missing,
/// and when it is present but empty. Nothing is validated beyond that;
/// deciding whether the value is a well-formed token is the
/// authenticator's job.
pub fn extract_token<R>(request: Option<&R>, cookie_name: &str) -> Option<String>
where
    R: CookieSource + ?Sized,
{
    request?
        .cookie(cookie_name)
        .filter(|value| !value.is_empty())
}

#[cfg(feature = "http")]
mod http_impls {
    use biscotti::{Processor, ProcessorConfig, RequestCookies};
    use http::header::COOKIE;
    use http::{HeaderMap, Request};

    use super::CookieSource;

    impl CookieSource for HeaderMap {
        fn cookie(&self, name: &str) -> Option<String> {
            let processor: Processor = ProcessorConfig::default().into();
            let mut cookies = RequestCookies::new();
            for header in self.get_all(COOKIE) {
                let Ok(raw) = header.to_str() else {
                    tracing::warn!("ignoring non-ASCII Cookie header");
                    continue;
                };
                // Pairs are parsed one at a time: biscotti rejects a whole
                // header on its first bad pair, which would hide the rest.
                for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                    if let Err(error) = cookies.extend_from_header(pair, &processor) {
                        tracing::warn!(%error, "ignoring malformed cookie pair");
                    }
                }
            }
            cookies.get(name).map(|cookie| cookie.value().to_owned())
        }
    }

    impl<B> CookieSource for Request<B> {
        fn cookie(&self, name: &str) -> Option<String> {
            self.headers().cookie(name)
        }
    }
}
