//! Integration tests for the certificate store and revocation gateway.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tokendb_core::models::certificate::{CertificateStatus, CreateTokenCertificate};
use tokendb_core::models::token::RevocationReason;
use tokendb_core::repository::{RevocationGateway, TokenCertificateRepository};
use tokendb_db::repository::SurrealCertificateRepository;

async fn setup() -> SurrealCertificateRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tokendb_db::run_migrations(&db).await.unwrap();
    SurrealCertificateRepository::new(db)
}

async fn enroll(repo: &SurrealCertificateRepository<Db>, token_id: &str, serials: &[&str]) {
    for serial in serials {
        repo.create(CreateTokenCertificate {
            token_id: token_id.into(),
            serial_number: (*serial).into(),
            subject: format!("CN=jdoe,serialNumber={serial}"),
        })
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn create_certificate_starts_active() {
    let repo = setup().await;

    let cert = repo
        .create(CreateTokenCertificate {
            token_id: "cuid-1".into(),
            serial_number: "0x0a".into(),
            subject: "CN=jdoe".into(),
        })
        .await
        .unwrap();

    assert_eq!(cert.status, CertificateStatus::Active);
    assert_eq!(cert.revocation_reason, None);
    assert_eq!(cert.revoked_at, None);

    let listed = repo.list_by_token("cuid-1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, cert.id);
}

#[tokio::test]
async fn revoke_is_idempotent_and_scoped_to_token() {
    let repo = setup().await;
    enroll(&repo, "cuid-1", &["0x01", "0x02"]).await;
    enroll(&repo, "cuid-2", &["0x03"]).await;

    let revoked = repo
        .revoke_certificates("cuid-1", RevocationReason::KeyCompromise)
        .await
        .unwrap();
    assert_eq!(revoked, 2);

    let again = repo
        .revoke_certificates("cuid-1", RevocationReason::KeyCompromise)
        .await
        .unwrap();
    assert_eq!(again, 0);

    let other = repo.list_by_token("cuid-2").await.unwrap();
    assert_eq!(other[0].status, CertificateStatus::Active);

    let revoked = repo.list_by_token("cuid-1").await.unwrap();
    assert!(revoked.iter().all(|c| {
        c.status == CertificateStatus::Revoked
            && c.revocation_reason == Some(RevocationReason::KeyCompromise)
            && c.revoked_at.is_some()
    }));
}

#[tokio::test]
async fn hold_then_release() {
    let repo = setup().await;
    enroll(&repo, "cuid-1", &["0x01", "0x02"]).await;

    let held = repo
        .revoke_certificates("cuid-1", RevocationReason::OnHold)
        .await
        .unwrap();
    assert_eq!(held, 2);
    assert!(
        repo.list_by_token("cuid-1")
            .await
            .unwrap()
            .iter()
            .all(|c| c.is_on_hold())
    );

    let restored = repo.unrevoke_certificates("cuid-1").await.unwrap();
    assert_eq!(restored, 2);
    let certs = repo.list_by_token("cuid-1").await.unwrap();
    assert!(certs.iter().all(|c| {
        c.status == CertificateStatus::Active
            && c.revocation_reason.is_none()
            && c.revoked_at.is_none()
    }));

    assert_eq!(repo.unrevoke_certificates("cuid-1").await.unwrap(), 0);
}

#[tokio::test]
async fn unrevoke_leaves_permanent_revocations() {
    let repo = setup().await;
    enroll(&repo, "cuid-1", &["0x01"]).await;
    repo.revoke_certificates("cuid-1", RevocationReason::Destroyed)
        .await
        .unwrap();

    let restored = repo.unrevoke_certificates("cuid-1").await.unwrap();
    assert_eq!(restored, 0);

    let certs = repo.list_by_token("cuid-1").await.unwrap();
    assert_eq!(certs[0].status, CertificateStatus::Revoked);
    assert_eq!(certs[0].revocation_reason, Some(RevocationReason::Destroyed));
}

#[tokio::test]
async fn hold_does_not_downgrade_permanent_revocation() {
    let repo = setup().await;
    enroll(&repo, "cuid-1", &["0x01"]).await;
    repo.revoke_certificates("cuid-1", RevocationReason::KeyCompromise)
        .await
        .unwrap();

    let held = repo
        .revoke_certificates("cuid-1", RevocationReason::OnHold)
        .await
        .unwrap();
    assert_eq!(held, 0);

    let certs = repo.list_by_token("cuid-1").await.unwrap();
    assert_eq!(
        certs[0].revocation_reason,
        Some(RevocationReason::KeyCompromise)
    );
}

#[tokio::test]
async fn permanent_revocation_upgrades_hold() {
    let repo = setup().await;
    enroll(&repo, "cuid-1", &["0x01", "0x02"]).await;
    repo.revoke_certificates("cuid-1", RevocationReason::OnHold)
        .await
        .unwrap();

    let upgraded = repo
        .revoke_certificates("cuid-1", RevocationReason::KeyCompromise)
        .await
        .unwrap();
    assert_eq!(upgraded, 2);

    let certs = repo.list_by_token("cuid-1").await.unwrap();
    assert!(certs.iter().all(|c| !c.is_on_hold()));
}

#[tokio::test]
async fn remove_certificates_deletes_only_token_rows() {
    let repo = setup().await;
    enroll(&repo, "cuid-1", &["0x01", "0x02"]).await;
    enroll(&repo, "cuid-2", &["0x03"]).await;

    assert_eq!(repo.remove_certificates("cuid-1").await.unwrap(), 2);
    assert!(repo.list_by_token("cuid-1").await.unwrap().is_empty());
    assert_eq!(repo.list_by_token("cuid-2").await.unwrap().len(), 1);

    assert_eq!(repo.remove_certificates("cuid-1").await.unwrap(), 0);
}
