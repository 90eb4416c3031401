// File: ./src/client/redirect.rs
//! Tower layer that follows HTTP redirects.
//!
//! Spreadsheet web apps answer every request with a redirect to a content
//! host. 301/302/303 turn the follow-up into a body-less GET, as browsers do;
//! 307/308 replay the original method and body.
use http::{Method, Request, Response, StatusCode, Uri};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

#[derive(Clone, Debug)]
pub struct FollowRedirectLayer {
    max_redirects: usize,
}

impl FollowRedirectLayer {
    pub fn new(max_redirects: usize) -> Self {
        Self { max_redirects }
    }
}

impl<S> Layer<S> for FollowRedirectLayer {
    type Service = FollowRedirectService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FollowRedirectService {
            inner,
            max_redirects: self.max_redirects,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FollowRedirectService<S> {
    inner: S,
    max_redirects: usize,
}

/// Resolves a `Location` value against the URI of the request that produced it.
pub fn resolve_location(base: &Uri, location: &str) -> Option<Uri> {
    let parsed = location.parse::<Uri>().ok()?;
    let parts = parsed.into_parts();
    let mut builder = Uri::builder();

    // Inherit scheme and authority when the location is relative
    match parts.scheme {
        Some(scheme) => builder = builder.scheme(scheme),
        None => builder = builder.scheme(base.scheme()?.clone()),
    }
    match parts.authority {
        Some(authority) => builder = builder.authority(authority),
        None => builder = builder.authority(base.authority()?.clone()),
    }
    if let Some(pq) = parts.path_and_query {
        builder = builder.path_and_query(pq);
    } else {
        builder = builder.path_and_query("/");
    }
    builder.build().ok()
}

fn switches_to_get(status: StatusCode, method: &Method) -> bool {
    match status {
        StatusCode::SEE_OTHER => *method != Method::HEAD,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => *method == Method::POST,
        _ => false,
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for FollowRedirectService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    ReqBody: Clone + Default + Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut inner = self.inner.clone();
        let max_redirects = self.max_redirects;

        Box::pin(async move {
            let mut current_req = req;
            let mut attempts = 0;

            loop {
                // Keep a copy so the request can be replayed against the new location.
                let req_clone = current_req.clone();

                let response = inner.call(current_req).await?;

                if attempts >= max_redirects {
                    return Ok(response);
                }

                let status = response.status();
                if status.is_redirection()
                    && let Some(location) = response.headers().get(http::header::LOCATION)
                    && let Ok(loc_str) = location.to_str()
                    && let Some(new_uri) = resolve_location(req_clone.uri(), loc_str)
                {
                    log::debug!("Following {} redirect to {}", status.as_u16(), new_uri);
                    let to_get = switches_to_get(status, req_clone.method());
                    current_req = req_clone;
                    *current_req.uri_mut() = new_uri;
                    if to_get {
                        *current_req.method_mut() = Method::GET;
                        *current_req.body_mut() = ReqBody::default();
                        current_req.headers_mut().remove(http::header::CONTENT_TYPE);
                        current_req.headers_mut().remove(http::header::CONTENT_LENGTH);
                    }
                    attempts += 1;
                    continue;
                }

                return Ok(response);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_location() {
        let base: Uri = "https://script.google.com/macros/s/abc/exec".parse().unwrap();
        let next = resolve_location(
            &base,
            "https://script.googleusercontent.com/macros/echo?user_content_key=xyz",
        )
        .unwrap();
        assert_eq!(next.host(), Some("script.googleusercontent.com"));
        assert_eq!(next.query(), Some("user_content_key=xyz"));
    }

    #[test]
    fn test_resolve_relative_location() {
        let base: Uri = "http://127.0.0.1:8080/exec".parse().unwrap();
        let next = resolve_location(&base, "/echo?k=1").unwrap();
        assert_eq!(next.to_string(), "http://127.0.0.1:8080/echo?k=1");
    }

    #[test]
    fn test_post_becomes_get_on_found() {
        assert!(switches_to_get(StatusCode::FOUND, &Method::POST));
        assert!(switches_to_get(StatusCode::SEE_OTHER, &Method::POST));
        assert!(!switches_to_get(StatusCode::TEMPORARY_REDIRECT, &Method::POST));
        assert!(!switches_to_get(StatusCode::FOUND, &Method::GET));
    }
}
