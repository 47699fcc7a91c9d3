//! DID-Auth: a holder's signed answer to a Transaction's challenge nonce.

use serde::{Deserialize, Serialize};

use tas_core::{Did, Nonce};

use crate::proof::{Proof, Signed};

/// `{did, authNonce, proof}` signed with an `authentication` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidAuth {
    /// DID being authenticated.
    pub did: Did,
    /// Challenge the server handed out.
    pub auth_nonce: Nonce,
    /// Holder's proof.
    pub proof: Proof,
}

impl Signed for DidAuth {
    fn proof(&self) -> Option<&Proof> {
        Some(&self.proof)
    }

    fn set_proof(&mut self, proof: Proof) {
        self.proof = proof;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{signing_digest, ProofPurpose, ProofType};
    use tas_core::{DidKeyUrl, Timestamp};

    #[test]
    fn signing_input_matches_fixed_vector() {
        let auth = DidAuth {
            did: Did::new("did:omn:holder").unwrap(),
            auth_nonce: Nonce::decode("z3yMApqCuCjXDWPrbjfR5mjCPTHqFG8Pux1TxQrEM35jj").unwrap(),
            proof: Proof {
                proof_type: ProofType::Secp256r1Signature2018,
                created: Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
                verification_method: DidKeyUrl::parse("did:omn:holder?versionId=1#pin").unwrap(),
                proof_purpose: ProofPurpose::Authentication,
                proof_value: Some("z4fXp9".into()),
            },
        };
        assert_eq!(
            signing_digest(&auth).unwrap().to_hex(),
            "c46680718c4e7b993186fcead3691862e3cb6c3d42405d1b0fb3d5b3385802ff"
        );
    }
}
