// Executor that talks to `volshrink agent` on each target over HTTP

use super::{Credentials, RemoteExecutor};
use crate::agent::USER_HEADER;
use crate::error::TargetError;
use crate::models::{ErrorBody, ResizeRequest, ResourceConstraint, ResourceId, VolumeInfo};
use crate::version::USER_AGENT;
use futures_util::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use std::net::Ipv6Addr;
use std::time::Duration;
use tracing::instrument;

pub struct HttpExecutor {
    client: Client,
    /// `<scheme>://localhost/`; host and port are replaced per target.
    template: Url,
    default_port: u16,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(scheme: &str, default_port: u16, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create HTTP client: {}", e))?;
        let template = Url::parse(&format!("{}://localhost/", scheme))
            .map_err(|e| anyhow::anyhow!("invalid agent scheme {:?}: {}", scheme, e))?;
        Ok(Self {
            client,
            template,
            default_port,
            timeout,
        })
    }

    /// Agent root for `host`, `host:port`, `[v6]`, `[v6]:port` or a bare IPv6 address.
    pub fn base_url(&self, target: &str) -> Result<Url, TargetError> {
        let invalid = |reason: String| {
            TargetError::Unreachable(format!("invalid target address {:?}: {}", target, reason))
        };
        let (host, port) = split_host_port(target).map_err(invalid)?;
        let mut url = self.template.clone();
        url.set_host(Some(host.as_str())).map_err(|e| invalid(e.to_string()))?;
        url.set_port(Some(port.unwrap_or(self.default_port)))
            .map_err(|()| invalid("scheme does not take a port".into()))?;
        Ok(url)
    }

    fn endpoint(&self, target: &str, path: &str) -> Result<Url, TargetError> {
        self.base_url(target)?
            .join(path)
            .map_err(|e| TargetError::Unreachable(format!("invalid agent path {}: {}", path, e)))
    }

    fn authorized(&self, builder: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        builder
            .header(USER_HEADER, &credentials.username)
            .bearer_auth(&credentials.password)
    }

    fn transport_error(&self, e: reqwest::Error) -> TargetError {
        if e.is_timeout() {
            TargetError::TimedOut(self.timeout)
        } else {
            TargetError::Unreachable(e.to_string())
        }
    }

    #[instrument(skip(self, credentials), fields(executor = "http", operation = "query"))]
    async fn query_volume(
        &self,
        target: &str,
        credentials: &Credentials,
        resource: &ResourceId,
    ) -> Result<ResourceConstraint, TargetError> {
        let url = self.endpoint(target, "api/volume")?;
        let response = self
            .authorized(self.client.get(url), credentials)
            .query(&[("resource", resource.as_str())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = check_status(response).await.map_err(|f| {
            f.into_target_error(resource, |status, message| {
                TargetError::Unreachable(format!("agent answered {}: {}", status, message))
            })
        })?;
        let info: VolumeInfo = response
            .json()
            .await
            .map_err(|e| TargetError::Unreachable(format!("invalid agent response: {}", e)))?;
        let minimum = info.minimum_size.ok_or_else(|| {
            TargetError::Unreachable("agent response is missing minimumSize".into())
        })?;
        ResourceConstraint::new(info.current_size, minimum).ok_or_else(|| {
            TargetError::Unreachable(format!(
                "agent reported minimum {} above current {}",
                minimum, info.current_size
            ))
        })
    }

    #[instrument(skip(self, credentials), fields(executor = "http", operation = "resize"))]
    async fn resize_volume(
        &self,
        target: &str,
        credentials: &Credentials,
        resource: &ResourceId,
        new_size: u64,
    ) -> Result<u64, TargetError> {
        let url = self.endpoint(target, "api/volume/resize")?;
        let body = ResizeRequest {
            resource: resource.clone(),
            new_size,
        };
        let response = self
            .authorized(self.client.post(url), credentials)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = check_status(response).await.map_err(|f| {
            f.into_target_error(resource, |_, message| TargetError::MutationFailed(message))
        })?;
        let info: VolumeInfo = response.json().await.map_err(|e| {
            TargetError::MutationFailed(format!("resize sent but reply unreadable: {}", e))
        })?;
        Ok(info.current_size)
    }
}

/// Splits a target name into a host usable by `Url::set_host` and an optional port.
fn split_host_port(target: &str) -> Result<(String, Option<u16>), String> {
    let parse_port = |p: &str| {
        p.parse::<u16>()
            .map_err(|_| format!("{:?} is not a port number", p))
    };
    if target.parse::<Ipv6Addr>().is_ok() {
        return Ok((format!("[{}]", target), None));
    }
    if target.starts_with('[') {
        let end = target.find(']').ok_or("missing closing ']'")?;
        let (host, rest) = target.split_at(end + 1);
        return match rest {
            "" => Ok((host.to_string(), None)),
            _ => match rest.strip_prefix(':') {
                Some(p) => Ok((host.to_string(), Some(parse_port(p)?))),
                None => Err(format!("unexpected {:?} after the address", rest)),
            },
        };
    }
    let (host, port) = match target.split_once(':') {
        Some((host, p)) => (host, Some(parse_port(p)?)),
        None => (target, None),
    };
    if host.is_empty() {
        return Err("empty host".into());
    }
    Ok((host.to_string(), port))
}

enum StatusFailure {
    Auth(String),
    NotFound,
    Other(StatusCode, String),
}

impl StatusFailure {
    /// Auth and not-found statuses have their own kinds; `other` classifies the rest.
    fn into_target_error(
        self,
        resource: &ResourceId,
        other: impl FnOnce(StatusCode, String) -> TargetError,
    ) -> TargetError {
        match self {
            StatusFailure::Auth(message) => TargetError::AuthenticationFailed(message),
            StatusFailure::NotFound => TargetError::ResourceNotFound(resource.to_string()),
            StatusFailure::Other(status, message) => other(status, message),
        }
    }
}

async fn check_status(response: Response) -> Result<Response, StatusFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StatusFailure::Auth(message),
        StatusCode::NOT_FOUND => StatusFailure::NotFound,
        _ => StatusFailure::Other(status, message),
    })
}

impl RemoteExecutor for HttpExecutor {
    fn query<'a>(
        &'a self,
        target: &'a str,
        credentials: &'a Credentials,
        resource: &'a ResourceId,
    ) -> BoxFuture<'a, Result<ResourceConstraint, TargetError>> {
        Box::pin(self.query_volume(target, credentials, resource))
    }

    fn resize<'a>(
        &'a self,
        target: &'a str,
        credentials: &'a Credentials,
        resource: &'a ResourceId,
        new_size: u64,
    ) -> BoxFuture<'a, Result<u64, TargetError>> {
        Box::pin(self.resize_volume(target, credentials, resource, new_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> HttpExecutor {
        HttpExecutor::new("http", 7070, Duration::from_secs(1)).unwrap()
    }

    fn url(e: &HttpExecutor, target: &str) -> String {
        e.base_url(target).unwrap().to_string()
    }

    #[test]
    fn base_url_adds_default_port() {
        let e = executor();
        assert_eq!(url(&e, "web01"), "http://web01:7070/");
        assert_eq!(url(&e, "10.0.0.5"), "http://10.0.0.5:7070/");
    }

    #[test]
    fn base_url_keeps_explicit_port() {
        let e = executor();
        assert_eq!(url(&e, "web01:9000"), "http://web01:9000/");
        assert_eq!(url(&e, "[::1]:9000"), "http://[::1]:9000/");
    }

    #[test]
    fn base_url_brackets_ipv6() {
        let e = executor();
        assert_eq!(url(&e, "fe80::1"), "http://[fe80::1]:7070/");
        assert_eq!(url(&e, "[::1]"), "http://[::1]:7070/");
    }

    #[test]
    fn malformed_targets_are_unreachable() {
        let e = executor();
        for bad in ["[::1", "host:abc", "[::1]x", ":7070", "a:b:c", "bad host"] {
            let err = e.base_url(bad).unwrap_err();
            let TargetError::Unreachable(message) = err else {
                panic!("{} gave {:?}", bad, err);
            };
            assert!(message.contains("invalid target address"), "{}", message);
        }
    }

    #[test]
    fn endpoints_join_under_the_root() {
        let e = executor();
        assert_eq!(
            e.endpoint("web01", "api/volume/resize").unwrap().as_str(),
            "http://web01:7070/api/volume/resize"
        );
    }

    #[test]
    fn unknown_scheme_is_rejected_up_front() {
        assert!(HttpExecutor::new("not a scheme", 7070, Duration::from_secs(1)).is_err());
    }
}
