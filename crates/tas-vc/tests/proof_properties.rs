//! Property tests for proof signing over arbitrary message bodies.

use proptest::prelude::*;
use serde::Serialize;

use tas_core::DidKeyUrl;
use tas_crypto::{EccCurve, SigningKeyPair};
use tas_vc::proof::{self, signing_digest};
use tas_vc::{Proof, ProofPurpose, Signed};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    subject: String,
    count: i64,
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proof: Option<Proof>,
}

impl Signed for Envelope {
    fn proof(&self) -> Option<&Proof> {
        self.proof.as_ref()
    }
    fn set_proof(&mut self, proof: Proof) {
        self.proof = Some(proof);
    }
}

fn vm() -> DidKeyUrl {
    DidKeyUrl::parse("did:omn:signer#assert").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn signed_envelopes_verify(
        subject in "\\PC{0,40}",
        count in any::<i64>(),
        tags in prop::collection::vec("[a-z]{1,8}", 0..4),
        k1 in any::<bool>(),
    ) {
        let curve = if k1 { EccCurve::Secp256k1 } else { EccCurve::Secp256r1 };
        let key = SigningKeyPair::generate(curve);
        let mut env = Envelope { subject, count, tags, proof: None };
        proof::sign(&mut env, &key, vm(), ProofPurpose::AssertionMethod).unwrap();
        prop_assert!(proof::verify(&env, &key.public_key()).is_ok());
    }

    #[test]
    fn changing_the_body_breaks_the_proof(subject in "[a-z]{1,20}", delta in 1i64..1000) {
        let key = SigningKeyPair::generate(EccCurve::Secp256r1);
        let mut env = Envelope { subject, count: 0, tags: vec![], proof: None };
        proof::sign(&mut env, &key, vm(), ProofPurpose::AssertionMethod).unwrap();
        let before = signing_digest(&env).unwrap();
        env.count += delta;
        prop_assert_ne!(signing_digest(&env).unwrap(), before);
        prop_assert!(proof::verify(&env, &key.public_key()).is_err());
    }
}
