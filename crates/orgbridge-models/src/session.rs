//! Bearer sessions obtained from an org's token endpoint.

use serde::{Deserialize, Serialize};

/// The result of a successful bearer-assertion token exchange.
///
/// One instance exists per org (source, target). A session is immutable
/// once obtained: the bridge performs no refresh, so an expiry mid-run
/// surfaces as request failures on whichever component holds the session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BearerSession {
    /// Opaque access token issued by the org.
    pub access_token: String,
    /// Base URL of the org instance the token is valid against.
    pub instance_url: String,
}

impl BearerSession {
    /// Bayeux streaming endpoint for this org, e.g.
    /// `https://org.example.com/cometd/v65.0`.
    pub fn cometd_endpoint(&self, api_version: &str) -> String {
        format!("{}/cometd/{api_version}", self.base_url())
    }

    /// Record-creation endpoint for the given sObject, e.g.
    /// `https://org.example.com/services/data/v65.0/sobjects/Integration_Log__c`.
    pub fn sobject_endpoint(&self, api_version: &str, object_name: &str) -> String {
        format!(
            "{}/services/data/{api_version}/sobjects/{object_name}",
            self.base_url()
        )
    }

    fn base_url(&self) -> &str {
        self.instance_url.trim_end_matches('/')
    }
}
