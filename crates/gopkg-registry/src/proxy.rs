//! HTTP module proxy backend.

use std::time::Duration;

use gopkg_core::VersionSpec;

use crate::client::{parse_info, parse_list, ArchiveStream, RegistryBackend, ResolvedMetadata};
use crate::error::{FetchError, RegistryError};

/// A registry reached over HTTP, such as `https://proxy.golang.org`.
pub struct ProxyRegistry {
    base: String,
    agent: ureq::Agent,
}

impl ProxyRegistry {
    /// `timeout` bounds both connecting and every read.
    pub fn new(base: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        ProxyRegistry {
            base: base.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn url(&self, module: &str, tail: &str) -> String {
        format!("{}/{}/{}", self.base, module, tail)
    }

    fn get_text(&self, module: &str, spec: &str, url: &str) -> Result<String, RegistryError> {
        tracing::debug!(url, "GET");
        let resp = match self.agent.get(url).call() {
            Ok(r) => r,
            Err(ureq::Error::Status(code, _)) => {
                return Err(RegistryError::NotFound {
                    module: module.to_string(),
                    spec: spec.to_string(),
                    detail: format!("status {code}"),
                })
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(RegistryError::Transport {
                    module: module.to_string(),
                    detail: t.to_string(),
                })
            }
        };
        resp.into_string().map_err(|e| RegistryError::Transport {
            module: module.to_string(),
            detail: format!("reading response body: {e}"),
        })
    }
}

impl RegistryBackend for ProxyRegistry {
    fn resolve_version(
        &self,
        module: &str,
        spec: &VersionSpec,
    ) -> Result<ResolvedMetadata, RegistryError> {
        let url = match spec {
            VersionSpec::Latest => self.url(module, "@latest"),
            VersionSpec::Exact(v) => self.url(module, &format!("@v/{v}.info")),
        };
        let body = self.get_text(module, spec.as_str(), &url)?;
        parse_info(module, &body)
    }

    fn list_versions(&self, module: &str) -> Result<Vec<String>, RegistryError> {
        let body = self.get_text(module, "list", &self.url(module, "@v/list"))?;
        Ok(parse_list(&body))
    }

    fn open_archive(&self, module: &str, version: &str) -> Result<ArchiveStream, FetchError> {
        let url = self.url(module, &format!("@v/{version}.zip"));
        tracing::debug!(url = %url, "GET");
        let resp = match self.agent.get(&url).call() {
            Ok(r) => r,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::BadStatus {
                    module: module.to_string(),
                    version: version.to_string(),
                    status,
                })
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(FetchError::Transport {
                    module: module.to_string(),
                    version: version.to_string(),
                    detail: t.to_string(),
                })
            }
        };
        let length = resp
            .header("Content-Length")
            .and_then(|v| v.trim().parse::<u64>().ok());
        Ok(ArchiveStream {
            reader: resp.into_reader(),
            length,
        })
    }

    fn origin(&self) -> &str {
        &self.base
    }
}
