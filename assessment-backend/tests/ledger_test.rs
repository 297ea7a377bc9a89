mod common;

use std::sync::Arc;

use assessment_backend::dto::company_dto::PublishJobRequest;
use assessment_backend::error::Error;
use assessment_backend::models::candidate::ProfileType;
use assessment_backend::models::company::Plan;
use common::{app, seed_company, ScriptedBackend, MODEL_REPORT};

fn job(title: &str) -> PublishJobRequest {
    PublishJobRequest {
        title: title.into(),
        location: "Monterrey".into(),
        profile_type: ProfileType::Field,
        description: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemptions_of_one_code_credit_once() {
    let (state, storage) = app(Arc::new(ScriptedBackend::replying(MODEL_REPORT)));
    seed_company(&storage, "ACM-1001", 0).await;
    seed_company(&storage, "BET-2002", 0).await;
    let code = state.ledger.issue_code(10).await.unwrap();

    let mut handles = Vec::new();
    for company in ["ACM-1001", "BET-2002", "ACM-1001", "BET-2002"] {
        let ledger = state.ledger.clone();
        let code = code.code.clone();
        handles.push(tokio::spawn(async move { ledger.redeem(company, &code).await }));
    }

    let mut granted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(response) => {
                assert_eq!(response.amount, 10);
                granted += 1;
            }
            Err(Error::AlreadyRedeemed) => refused += 1,
            Err(other) => panic!("unexpected redeem error: {other}"),
        }
    }
    assert_eq!(granted, 1);
    assert_eq!(refused, 3);

    let a = storage.ledger.company("ACM-1001").await.unwrap().unwrap();
    let b = storage.ledger.company("BET-2002").await.unwrap().unwrap();
    assert_eq!(a.credits + b.credits, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_debits_never_overdraw() {
    let (state, storage) = app(Arc::new(ScriptedBackend::replying(MODEL_REPORT)));
    seed_company(&storage, "ACM-1001", 5).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let ledger = state.ledger.clone();
        handles.push(tokio::spawn(async move { ledger.debit("ACM-1001", 1).await }));
    }

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(Error::InsufficientCredits) => {}
            Err(other) => panic!("unexpected debit error: {other}"),
        }
    }
    assert_eq!(applied, 5);
    let company = storage.ledger.company("ACM-1001").await.unwrap().unwrap();
    assert_eq!(company.credits, 0);
}

#[tokio::test]
async fn large_grant_upgrades_and_features_active_jobs() {
    let (state, storage) = app(Arc::new(ScriptedBackend::replying(MODEL_REPORT)));
    seed_company(&storage, "ACM-1001", 0).await;
    state.companies.verify("acm-1001").await.unwrap();

    let open = state.jobs.publish("ACM-1001", job("Night guard")).await.unwrap();
    let closed = state.jobs.publish("ACM-1001", job("Driver")).await.unwrap();
    assert!(!open.is_featured);
    state.jobs.set_active("ACM-1001", closed.id, false).await.unwrap();

    let outcome = state.ledger.credit("ACM-1001", 50).await.unwrap();
    assert_eq!(outcome.plan, Plan::Premium);
    assert!(outcome.upgraded);
    assert_eq!(outcome.balance, 50);

    let jobs = state.jobs.list_for_company("ACM-1001").await.unwrap();
    let open = jobs.iter().find(|j| j.id == open.id).unwrap();
    let closed = jobs.iter().find(|j| j.id == closed.id).unwrap();
    assert!(open.is_featured);
    assert!(!closed.is_featured);

    let later = state.jobs.publish("ACM-1001", job("Supervisor")).await.unwrap();
    assert!(later.is_featured);
}

#[tokio::test]
async fn small_grants_keep_free_and_premium_is_never_lost() {
    let (state, storage) = app(Arc::new(ScriptedBackend::replying(MODEL_REPORT)));
    seed_company(&storage, "ACM-1001", 0).await;

    let outcome = state.ledger.credit("ACM-1001", 10).await.unwrap();
    assert_eq!(outcome.plan, Plan::Free);
    assert!(!outcome.upgraded);

    state.ledger.credit("ACM-1001", 60).await.unwrap();
    let outcome = state.ledger.credit("ACM-1001", 1).await.unwrap();
    assert_eq!(outcome.plan, Plan::Premium);
    assert!(!outcome.upgraded);
    assert_eq!(outcome.balance, 71);
}

#[tokio::test]
async fn bootstrap_code_is_single_use_per_company() {
    let (state, storage) = app(Arc::new(ScriptedBackend::replying(MODEL_REPORT)));
    seed_company(&storage, "ACM-1001", 0).await;
    seed_company(&storage, "BET-2002", 0).await;

    let first = state.ledger.redeem("ACM-1001", " start ").await.unwrap();
    assert_eq!(first.amount, 3);
    assert_eq!(first.new_balance, 3);
    assert!(matches!(
        state.ledger.redeem("ACM-1001", "START").await,
        Err(Error::AlreadyRedeemed)
    ));

    let other = state.ledger.redeem("BET-2002", "START").await.unwrap();
    assert_eq!(other.new_balance, 3);
}

#[tokio::test]
async fn unpublished_companies_cannot_post_jobs() {
    let (state, storage) = app(Arc::new(ScriptedBackend::replying(MODEL_REPORT)));
    seed_company(&storage, "ACM-1001", 0).await;

    assert!(matches!(
        state.jobs.publish("ACM-1001", job("Night guard")).await,
        Err(Error::Validation(_))
    ));
    assert!(state.jobs.list_active().await.unwrap().is_empty());
}
