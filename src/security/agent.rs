//! Agent request identification.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{request::Parts, HeaderName};

use crate::config::AgentConfig;

/// Header names used to recognise agent traffic.
#[derive(Debug, Clone)]
pub struct AgentHeaders {
    pub flag: HeaderName,
    pub name: HeaderName,
}

impl Default for AgentHeaders {
    fn default() -> Self {
        Self {
            flag: HeaderName::from_static("x-ai-agent"),
            name: HeaderName::from_static("x-ai-agent-name"),
        }
    }
}

impl AgentHeaders {
    /// Header names from config; invalid names fall back to the defaults.
    pub fn from_config(config: &AgentConfig) -> Self {
        let defaults = Self::default();
        Self {
            flag: HeaderName::try_from(config.flag_header.as_str()).unwrap_or(defaults.flag),
            name: HeaderName::try_from(config.name_header.as_str()).unwrap_or(defaults.name),
        }
    }
}

/// Who sent a request, as far as the gateway can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    /// True when the request is flagged as machine-originated.
    pub is_agent: bool,
    /// Rate-limit key: agent name, else peer IP, else `unknown`.
    pub client_id: String,
    pub agent_name: Option<String>,
    pub peer_addr: Option<SocketAddr>,
}

impl AgentIdentity {
    pub fn from_parts(parts: &Parts, headers: &AgentHeaders) -> Self {
        let is_agent = parts
            .headers
            .get(&headers.flag)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        let agent_name = parts
            .headers
            .get(&headers.name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let peer_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let client_id = agent_name
            .clone()
            .or_else(|| peer_addr.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            is_agent,
            client_id,
            agent_name,
            peer_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_agent_flag_and_name() {
        let (parts, _) = Request::builder()
            .header("X-AI-Agent", "true")
            .header("X-AI-Agent-Name", "ShopBot")
            .body(())
            .unwrap()
            .into_parts();

        let identity = AgentIdentity::from_parts(&parts, &AgentHeaders::default());
        assert!(identity.is_agent);
        assert_eq!(identity.client_id, "ShopBot");
    }

    #[test]
    fn test_falls_back_to_peer_ip() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let addr: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        parts.extensions.insert(ConnectInfo(addr));

        let identity = AgentIdentity::from_parts(&parts, &AgentHeaders::default());
        assert!(!identity.is_agent);
        assert_eq!(identity.client_id, "10.1.2.3");
        assert_eq!(identity.peer_addr, Some(addr));
    }

    #[test]
    fn test_unknown_without_name_or_peer() {
        let (parts, _) = Request::builder()
            .header("X-AI-Agent", "yes")
            .body(())
            .unwrap()
            .into_parts();

        let identity = AgentIdentity::from_parts(&parts, &AgentHeaders::default());
        assert!(!identity.is_agent);
        assert_eq!(identity.client_id, "unknown");
    }

    #[test]
    fn test_custom_header_names() {
        let config = AgentConfig {
            flag_header: "X-Bot".to_string(),
            name_header: "not a header".to_string(),
        };
        let headers = AgentHeaders::from_config(&config);
        assert_eq!(headers.flag.as_str(), "x-bot");
        assert_eq!(headers.name.as_str(), "x-ai-agent-name");
    }
}
