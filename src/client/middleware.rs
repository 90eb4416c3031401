// File: ./src/client/middleware.rs
//! Tower middleware that stamps default headers on every outgoing request.
use http::{HeaderMap, HeaderValue, Request, header};
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Adds `User-Agent` and `Accept: application/json` unless the request
/// already carries them.
#[derive(Clone, Debug)]
pub struct DefaultHeadersLayer {
    headers: HeaderMap,
}

impl DefaultHeadersLayer {
    pub fn new(user_agent: &str) -> Self {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(user_agent) {
            Ok(val) => {
                headers.insert(header::USER_AGENT, val);
            }
            Err(_) => log::warn!("Ignoring invalid user agent {:?}", user_agent),
        }
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self { headers }
    }
}

impl<S> Layer<S> for DefaultHeadersLayer {
    type Service = DefaultHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultHeadersService {
            inner,
            headers: self.headers.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DefaultHeadersService<S> {
    inner: S,
    headers: HeaderMap,
}

impl<S, ReqBody> Service<Request<ReqBody>> for DefaultHeadersService<S>
where
    S: Service<Request<ReqBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        for (name, value) in &self.headers {
            if !req.headers().contains_key(name) {
                req.headers_mut().insert(name.clone(), value.clone());
            }
        }
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::ServiceExt;

    fn echo_header(
        name: header::HeaderName,
    ) -> impl Service<Request<String>, Response = String, Error = Infallible, Future: Send> + Clone
    {
        tower::service_fn(move |req: Request<String>| {
            let value = req
                .headers()
                .get(&name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            async move { Ok::<_, Infallible>(value) }
        })
    }

    #[tokio::test]
    async fn test_user_agent_is_inserted() {
        let svc = DefaultHeadersLayer::new("invahelp/test").layer(echo_header(header::USER_AGENT));
        let req = Request::get("http://localhost/").body(String::new()).unwrap();
        assert_eq!(svc.oneshot(req).await.unwrap(), "invahelp/test");
    }

    #[tokio::test]
    async fn test_existing_header_is_kept() {
        let svc = DefaultHeadersLayer::new("invahelp/test").layer(echo_header(header::ACCEPT));
        let req = Request::get("http://localhost/")
            .header(header::ACCEPT, "text/plain")
            .body(String::new())
            .unwrap();
        assert_eq!(svc.oneshot(req).await.unwrap(), "text/plain");
    }
}
