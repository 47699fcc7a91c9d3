//! # Issuer Gateway
//!
//! The Trusted Agent never signs a holder's credential itself: it asks the
//! issuer for the issue profile and the holder's claims, assembles an
//! [`IssueVcParam`], and has the issuer sign it. Revocation is likewise
//! delegated.
//!
//! ## Failure classification
//!
//! Unreachable issuers (connect errors, timeouts, 5xx) become
//! [`IssuerError::Communication`]; anything the issuer answered but the
//! Trusted Agent cannot use (4xx, undecodable bodies) becomes
//! [`IssuerError::UnknownResponse`]. The engine never retries either.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use tas_core::{Did, DidKeyUrl, Timestamp};
use tas_crypto::SigningKeyPair;
use tas_vc::proof::sign;
use tas_vc::{
    Claim, DidDocument, Evidence, IssueProfile, IssueVcParam, ProofPurpose, VerifiableCredential,
};

use crate::error::IssuerError;
use crate::http::HttpClient;

/// Claims and evidence an issuer holds for a holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSet {
    /// Claims to embed in the credential subject.
    pub claims: Vec<Claim>,
    /// Supporting evidence.
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

/// Issuer operations used by the issue and revoke workflows.
pub trait IssuerGateway: Send + Sync {
    /// Issue profile for `vc_plan_id`, unsigned.
    fn issue_profile(&self, issuer: &Did, vc_plan_id: &str) -> Result<IssueProfile, IssuerError>;

    /// Claims the issuer holds about `holder` for `vc_plan_id`.
    fn retrieve_claims(&self, issuer: &Did, holder: &Did, vc_plan_id: &str) -> Result<ClaimSet, IssuerError>;

    /// Have the issuer build and sign the credential.
    fn sign_vc(&self, param: &IssueVcParam) -> Result<VerifiableCredential, IssuerError>;

    /// Tell the issuer a credential is revoked.
    fn revoke_vc(&self, issuer: &Did, vc_id: &str) -> Result<(), IssuerError>;
}

// ─── In-memory issuer ────────────────────────────────────────────────

struct IssuerAccount {
    name: String,
    key: SigningKeyPair,
    key_id: String,
}

/// An issuer plan as the in-memory issuer serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanProfile {
    /// Profile title.
    pub title: String,
    /// Credential schema id.
    pub credential_schema: String,
    /// Profile lifetime from the moment it is fetched.
    pub validity_secs: i64,
}

/// [`IssuerGateway`] that signs locally with in-process keys.
#[derive(Default)]
pub struct MemoryIssuer {
    accounts: RwLock<HashMap<Did, IssuerAccount>>,
    plans: RwLock<HashMap<String, PlanProfile>>,
    claims: RwLock<HashMap<(Did, String), ClaimSet>>,
    revoked: RwLock<Vec<String>>,
    unreachable: AtomicBool,
}

impl MemoryIssuer {
    /// No issuers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issuer signing with `key` under `key_id`.
    pub fn add_issuer(&self, did: Did, name: impl Into<String>, key: SigningKeyPair, key_id: impl Into<String>) {
        self.accounts.write().insert(
            did,
            IssuerAccount {
                name: name.into(),
                key,
                key_id: key_id.into(),
            },
        );
    }

    /// Serve `plan` under `vc_plan_id`.
    pub fn add_plan(&self, vc_plan_id: impl Into<String>, plan: PlanProfile) {
        self.plans.write().insert(vc_plan_id.into(), plan);
    }

    /// Claims returned for (`holder`, `vc_plan_id`).
    pub fn set_claims(&self, holder: Did, vc_plan_id: impl Into<String>, claims: ClaimSet) {
        self.claims.write().insert((holder, vc_plan_id.into()), claims);
    }

    /// Simulate an outage.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Ids revoked so far.
    pub fn revoked(&self) -> Vec<String> {
        self.revoked.read().clone()
    }

    /// DID document publishing the issuer's assertion key.
    pub fn did_document(&self, did: &Did) -> Option<DidDocument> {
        let accounts = self.accounts.read();
        let account = accounts.get(did)?;
        Some(DidDocument::new(did.clone()).with_key(
            &account.key_id,
            &account.key.public_key(),
            &[ProofPurpose::AssertionMethod],
        ))
    }

    fn reachable(&self, operation: &'static str) -> Result<(), IssuerError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(IssuerError::Communication {
                operation,
                reason: "issuer unreachable".into(),
            });
        }
        Ok(())
    }

    fn unknown(issuer: &Did) -> IssuerError {
        IssuerError::UnknownIssuer(issuer.to_string())
    }
}

impl IssuerGateway for MemoryIssuer {
    fn issue_profile(&self, issuer: &Did, vc_plan_id: &str) -> Result<IssueProfile, IssuerError> {
        const OP: &str = "issue_profile";
        self.reachable(OP)?;
        let accounts = self.accounts.read();
        let account = accounts.get(issuer).ok_or_else(|| Self::unknown(issuer))?;
        let plans = self.plans.read();
        let plan = plans.get(vc_plan_id).ok_or_else(|| IssuerError::UnknownResponse {
            operation: OP,
            reason: format!("issuer does not serve plan {vc_plan_id}"),
        })?;
        Ok(IssueProfile {
            id: format!("profile-{vc_plan_id}"),
            title: plan.title.clone(),
            vc_plan_id: vc_plan_id.to_string(),
            issuer: issuer.clone(),
            issuer_name: account.name.clone(),
            credential_schema: plan.credential_schema.clone(),
            valid_until: Timestamp::now().plus_seconds(plan.validity_secs),
            proof: None,
        })
    }

    fn retrieve_claims(&self, issuer: &Did, holder: &Did, vc_plan_id: &str) -> Result<ClaimSet, IssuerError> {
        self.reachable("retrieve_claims")?;
        if !self.accounts.read().contains_key(issuer) {
            return Err(Self::unknown(issuer));
        }
        let key = (holder.clone(), vc_plan_id.to_string());
        Ok(self.claims.read().get(&key).cloned().unwrap_or_else(|| ClaimSet {
            claims: vec![Claim {
                code: "subject".into(),
                caption: "Subject".into(),
                value: holder.to_string(),
                format: None,
            }],
            evidence: Vec::new(),
        }))
    }

    fn sign_vc(&self, param: &IssueVcParam) -> Result<VerifiableCredential, IssuerError> {
        const OP: &str = "sign_vc";
        self.reachable(OP)?;
        let accounts = self.accounts.read();
        let account = accounts.get(&param.issuer).ok_or_else(|| Self::unknown(&param.issuer))?;
        let vm = DidKeyUrl::from_parts(&param.issuer, &account.key_id).map_err(|e| IssuerError::UnknownResponse {
            operation: OP,
            reason: e.to_string(),
        })?;
        let mut vc = VerifiableCredential::from_param(param);
        sign(&mut vc, &account.key, vm, ProofPurpose::AssertionMethod).map_err(|e| {
            IssuerError::UnknownResponse {
                operation: OP,
                reason: e.to_string(),
            }
        })?;
        Ok(vc)
    }

    fn revoke_vc(&self, issuer: &Did, vc_id: &str) -> Result<(), IssuerError> {
        self.reachable("revoke_vc")?;
        if !self.accounts.read().contains_key(issuer) {
            return Err(Self::unknown(issuer));
        }
        self.revoked.write().push(vc_id.to_string());
        Ok(())
    }
}

// ─── HTTP issuer ─────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRequest<'a> {
    issuer: &'a Did,
    vc_plan_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimsRequest<'a> {
    issuer: &'a Did,
    holder: &'a Did,
    vc_plan_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RevokeRequest<'a> {
    issuer: &'a Did,
    vc_id: &'a str,
}

/// [`IssuerGateway`] over HTTP, one base URL per issuer DID.
///
/// | Operation       | Path                |
/// |-----------------|---------------------|
/// | issue_profile   | POST `/issue-profile` |
/// | retrieve_claims | POST `/claims`        |
/// | sign_vc         | POST `/sign-vc`       |
/// | revoke_vc       | POST `/revoke-vc`     |
#[derive(Debug, Clone, Default)]
pub struct HttpIssuerGateway {
    routes: HashMap<Did, HttpClient>,
}

impl HttpIssuerGateway {
    /// No routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route calls for `issuer` to `base_url`.
    pub fn with_issuer(mut self, issuer: Did, base_url: &str, timeout_secs: u64) -> Result<Self, IssuerError> {
        let client = HttpClient::new(base_url, timeout_secs).map_err(|e| IssuerError::from_http("configure", e))?;
        self.routes.insert(issuer, client);
        Ok(self)
    }

    fn client(&self, issuer: &Did) -> Result<&HttpClient, IssuerError> {
        self.routes.get(issuer).ok_or_else(|| IssuerError::UnknownIssuer(issuer.to_string()))
    }

    fn post<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        issuer: &Did,
        path: &str,
        body: &B,
        operation: &'static str,
    ) -> Result<T, IssuerError> {
        let client = self.client(issuer)?;
        let url = client.endpoint(&[path]).map_err(|e| IssuerError::from_http(operation, e))?;
        tracing::debug!(%issuer, operation, "calling issuer");
        client
            .block_on(operation, client.post_json(url, body, operation))
            .and_then(|r| r)
            .map_err(|e| IssuerError::from_http(operation, e))
    }
}

impl IssuerGateway for HttpIssuerGateway {
    fn issue_profile(&self, issuer: &Did, vc_plan_id: &str) -> Result<IssueProfile, IssuerError> {
        self.post(issuer, "issue-profile", &ProfileRequest { issuer, vc_plan_id }, "issue_profile")
    }

    fn retrieve_claims(&self, issuer: &Did, holder: &Did, vc_plan_id: &str) -> Result<ClaimSet, IssuerError> {
        self.post(
            issuer,
            "claims",
            &ClaimsRequest {
                issuer,
                holder,
                vc_plan_id,
            },
            "retrieve_claims",
        )
    }

    fn sign_vc(&self, param: &IssueVcParam) -> Result<VerifiableCredential, IssuerError> {
        self.post(&param.issuer, "sign-vc", param, "sign_vc")
    }

    fn revoke_vc(&self, issuer: &Did, vc_id: &str) -> Result<(), IssuerError> {
        const OP: &str = "revoke_vc";
        let client = self.client(issuer)?;
        let url = client.endpoint(&["revoke-vc"]).map_err(|e| IssuerError::from_http(OP, e))?;
        client
            .block_on(OP, client.post_unit(url, &RevokeRequest { issuer, vc_id }, OP))
            .and_then(|r| r)
            .map_err(|e| IssuerError::from_http(OP, e))
    }
}
