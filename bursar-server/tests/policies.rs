//! Policy-level tests against the in-memory store

use axum::body::Bytes;
use bursar_server::auth::{Identity, TokenService};
use bursar_server::models::{ApplicationStatus, BursaryStatus, Role, ValidationError};
use bursar_server::policy::{
    AccountPolicy, ApplicationPolicy, BursaryInput, BursaryPolicy, PolicyError, ProfileInput,
    ProfilePolicy, SocialPolicy,
};
use bursar_server::uploads::{DocumentStore, IncomingFile, UploadError};
use bursar_server::{MemoryStore, Store};
use std::time::Duration;
use uuid::Uuid;

fn tokens() -> TokenService {
    TokenService::new(b"policy-tests", Duration::from_secs(600))
}

async fn account(store: &MemoryStore, name: &str, role: &str) -> Identity {
    let tokens = tokens();
    let session = AccountPolicy::new(store, &tokens)
        .register(
            Some(name.into()),
            Some(format!("{}@example.test", name.to_lowercase())),
            Some("password123".into()),
            Some(role.into()),
        )
        .await
        .unwrap();
    Identity {
        subject: session.user.id,
        role: session.user.role,
    }
}

fn bursary_input(title: &str) -> BursaryInput {
    BursaryInput {
        title: Some(title.into()),
        description: Some("Tuition support".into()),
        amount: Some(2500.0),
        deadline: Some("2030-03-01".into()),
        status: None,
    }
}

fn pdf() -> IncomingFile {
    IncomingFile {
        original_name: "cv.pdf".into(),
        mime_type: "application/pdf".into(),
        bytes: Bytes::from_static(b"%PDF-1.4"),
    }
}

#[tokio::test]
async fn registration_verifies_and_logs_in() {
    let store = MemoryStore::new();
    let tokens = tokens();
    let policy = AccountPolicy::new(&store, &tokens);

    let registered = policy
        .register(
            Some("  Naledi  ".into()),
            Some("Naledi@Example.test".into()),
            Some("password123".into()),
            Some("provider".into()),
        )
        .await
        .unwrap();
    assert_eq!(registered.user.full_name, "Naledi");
    assert_eq!(registered.user.email, "naledi@example.test");

    let session = policy
        .login(Some("naledi@example.test".into()), Some("password123".into()))
        .await
        .unwrap();
    let identity = tokens.verify(&session.token).unwrap();
    assert_eq!(identity.subject, registered.user.id);
    assert_eq!(identity.role, Role::Provider);

    let err = policy
        .login(Some("naledi@example.test".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PolicyError::Validation(ValidationError::Required { field: "password" })
    ));
}

#[tokio::test]
async fn bursary_update_may_reopen_but_not_for_strangers() {
    let store = MemoryStore::new();
    let owner = account(&store, "Owner", "provider").await;
    let other = account(&store, "Other", "provider").await;
    let policy = BursaryPolicy::new(&store);

    let bursary = policy.create(owner, bursary_input("Reopenable")).await.unwrap();
    assert_eq!(bursary.status, BursaryStatus::Open);
    policy.close(owner, bursary.id).await.unwrap();

    let reopen = BursaryInput {
        status: Some("open".into()),
        ..BursaryInput::default()
    };
    let err = policy.update(other, bursary.id, reopen.clone()).await.unwrap_err();
    assert!(matches!(err, PolicyError::NotFound { resource: "Bursary" }));

    let reopened = policy.update(owner, bursary.id, reopen).await.unwrap();
    assert_eq!(reopened.status, BursaryStatus::Open);
    assert_eq!(reopened.title, "Reopenable");
    assert!(reopened.updated_at >= bursary.updated_at);
}

#[tokio::test]
async fn invalid_update_is_rejected_before_lookup() {
    let store = MemoryStore::new();
    let owner = account(&store, "Owner", "provider").await;

    let bad = BursaryInput {
        amount: Some(0.0),
        ..BursaryInput::default()
    };
    let err = BursaryPolicy::new(&store)
        .update(owner, Uuid::new_v4(), bad)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PolicyError::Validation(ValidationError::NotPositive { field: "amount" })
    ));
}

#[tokio::test]
async fn amounts_outside_the_stored_precision_are_validation_errors() {
    let store = MemoryStore::new();
    let owner = account(&store, "Owner", "provider").await;
    let policy = BursaryPolicy::new(&store);

    let dust = BursaryInput {
        amount: Some(0.001),
        ..bursary_input("Dust")
    };
    let err = policy.create(owner, dust).await.unwrap_err();
    assert!(matches!(
        err,
        PolicyError::Validation(ValidationError::NotPositive { field: "amount" })
    ));

    let huge = BursaryInput {
        amount: Some(1e12),
        ..bursary_input("Huge")
    };
    let err = policy.create(owner, huge).await.unwrap_err();
    assert!(matches!(
        err,
        PolicyError::Validation(ValidationError::OutOfRange { field: "amount", .. })
    ));

    assert!(store.list_open_bursaries().await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_validates_before_ownership_and_writes_nothing_on_failure() {
    let store = MemoryStore::new();
    let provider = account(&store, "Owner", "provider").await;
    let learner = account(&store, "Learner", "learner").await;
    let stranger = account(&store, "Stranger", "learner").await;
    let bursary = BursaryPolicy::new(&store)
        .create(provider, bursary_input("Docs"))
        .await
        .unwrap();
    let application = ApplicationPolicy::new(&store)
        .apply(learner, Some(bursary.id), Some("Please".into()))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let documents = DocumentStore::new(dir.path(), 1024);
    let policy = ApplicationPolicy::new(&store);

    let err = policy
        .upload_document(stranger, application.id, None, &documents)
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyError::Upload(UploadError::Missing)));

    let err = policy
        .upload_document(stranger, application.id, Some(pdf()), &documents)
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyError::NotFound { resource: "Application" }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    let document = policy
        .upload_document(learner, application.id, Some(pdf()), &documents)
        .await
        .unwrap();
    assert!(dir.path().join(&document.storage_file_name).exists());
    assert_eq!(document.size_bytes, 8);
}

#[tokio::test]
async fn documents_list_newest_first() {
    let store = MemoryStore::new();
    let provider = account(&store, "Owner", "provider").await;
    let learner = account(&store, "Learner", "learner").await;
    let bursary = BursaryPolicy::new(&store)
        .create(provider, bursary_input("Docs"))
        .await
        .unwrap();
    let policy = ApplicationPolicy::new(&store);
    let application = policy
        .apply(learner, Some(bursary.id), Some("Please".into()))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let documents = DocumentStore::new(dir.path(), 1024);
    let first = policy
        .upload_document(learner, application.id, Some(pdf()), &documents)
        .await
        .unwrap();
    let second = policy
        .upload_document(learner, application.id, Some(pdf()), &documents)
        .await
        .unwrap();

    let listed = policy.list_documents(provider, application.id).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|d| d.id).collect();
    assert_eq!(ids, [second.id, first.id]);
}

#[tokio::test]
async fn any_status_can_follow_any_other() {
    let store = MemoryStore::new();
    let provider = account(&store, "Owner", "provider").await;
    let learner = account(&store, "Learner", "learner").await;
    let bursary = BursaryPolicy::new(&store)
        .create(provider, bursary_input("Flat"))
        .await
        .unwrap();
    let policy = ApplicationPolicy::new(&store);
    let application = policy
        .apply(learner, Some(bursary.id), Some("Please".into()))
        .await
        .unwrap();

    for status in ["approved", "submitted", "rejected", "under_review"] {
        let updated = policy
            .update_status(provider, application.id, Some(status.into()))
            .await
            .unwrap();
        assert_eq!(updated.status, status.parse::<ApplicationStatus>().unwrap());
    }
}

#[tokio::test]
async fn profile_update_keeps_omitted_fields() {
    let store = MemoryStore::new();
    let me = account(&store, "Me", "learner").await;
    let policy = ProfilePolicy::new(&store);

    policy
        .update_mine(
            me,
            ProfileInput {
                bio: Some("First".into()),
                field_of_study: Some("Law".into()),
                ..ProfileInput::default()
            },
        )
        .await
        .unwrap();
    let updated = policy
        .update_mine(
            me,
            ProfileInput {
                bio: Some(String::new()),
                ..ProfileInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.bio.as_deref(), Some(""));
    assert_eq!(updated.field_of_study.as_deref(), Some("Law"));
    assert_eq!(updated.full_name, "Me");
}

#[tokio::test]
async fn public_profile_counts() {
    let store = MemoryStore::new();
    let me = account(&store, "Me", "learner").await;
    let a = account(&store, "A", "learner").await;
    let b = account(&store, "B", "provider").await;
    let social = SocialPolicy::new(&store);

    social.follow(a, me.subject).await.unwrap();
    social.follow(b, me.subject).await.unwrap();
    social.follow(me, a.subject).await.unwrap();
    social.create_post(me, Some("hello".into())).await.unwrap();

    let profile = ProfilePolicy::new(&store).get_public(me.subject).await.unwrap();
    assert_eq!(profile.stats.followers_count, 2);
    assert_eq!(profile.stats.following_count, 1);
    assert_eq!(profile.stats.posts_count, 1);

    let err = ProfilePolicy::new(&store)
        .get_public(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyError::NotFound { resource: "User" }));
}

#[tokio::test]
async fn unfollow_and_unlike_are_idempotent() {
    let store = MemoryStore::new();
    let me = account(&store, "Me", "learner").await;
    let social = SocialPolicy::new(&store);

    social.unfollow(me, Uuid::new_v4()).await.unwrap();
    social.unlike_post(me, Uuid::new_v4()).await.unwrap();
    assert!(store.list_following(me.subject).await.unwrap().is_empty());
}
