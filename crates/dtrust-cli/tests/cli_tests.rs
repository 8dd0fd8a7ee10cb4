//! Key files written by `keygen` feed `did` and sign tokens that `verify`
//! accepts.

use dtrust_cli::credential::{run_inspect, run_verify, verify_decoded, TokenArgs};
use dtrust_cli::keys::{did_for_seed, read_seed_file, run_did, run_keygen, DidArgs, KeygenArgs};
use dtrust_core::{Did, Timestamp};
use dtrust_crypto::Ed25519KeyPair;
use dtrust_vc::{jwt, CredentialClaims, VerifiableCredential};

#[test]
fn keygen_did_and_verify_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issuer.key");
    run_keygen(&KeygenArgs {
        out: Some(path.clone()),
        force: false,
    })
    .unwrap();

    let seed = read_seed_file(&path).unwrap();
    let did = did_for_seed(&seed).unwrap();
    assert_eq!(
        run_did(&DidArgs {
            key_hex: None,
            key_file: Some(path),
        })
        .unwrap(),
        0
    );

    let key = Ed25519KeyPair::from_seed_hex(&seed).unwrap();
    let now = Timestamp::now();
    let credential = VerifiableCredential::build(CredentialClaims {
        credential_type: "DeveloperCredential".into(),
        issuer: did.clone(),
        subject: Did::new("did:dtrust:developer").unwrap(),
        data: serde_json::Map::new(),
        issuance_date: now.plus_secs(-5),
        expiration_date: now.add_months(12),
    })
    .unwrap();
    let token = jwt::encode(&credential, &key, None).unwrap();

    let decoded = jwt::decode(&token).unwrap();
    let verdict = verify_decoded(&decoded, &now);
    assert!(verdict.verified());
    assert_eq!(verdict.issuer, did.as_str());

    let args = TokenArgs { token };
    assert_eq!(run_inspect(&args).unwrap(), 0);
    assert_eq!(run_verify(&args).unwrap(), 0);
}
