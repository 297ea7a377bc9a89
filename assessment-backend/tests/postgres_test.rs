//! Runs the ledger and claim paths against a real Postgres.
//! Every test returns early when DATABASE_URL is not set.

mod common;

use std::env;
use std::sync::Arc;

use assessment_backend::database::pool::{create_pool, run_migrations};
use assessment_backend::database::Storage;
use assessment_backend::dto::company_dto::PublishJobRequest;
use assessment_backend::error::Error;
use assessment_backend::models::assessment::AssessmentStatus;
use assessment_backend::models::candidate::ProfileType;
use assessment_backend::models::company::Plan;
use assessment_backend::AppState;
use common::{app_with, seed_company, submission, ScriptedBackend, MODEL_REPORT};
use uuid::Uuid;

async fn pg_app() -> Option<(AppState, Storage)> {
    dotenvy::dotenv().ok();
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };
    let pool = create_pool(&url).await.expect("Failed to connect to Postgres");
    run_migrations(&pool).await.expect("Failed to run migrations");

    let storage = Storage::postgres(pool);
    let state = app_with(
        storage.clone(),
        Arc::new(ScriptedBackend::replying(MODEL_REPORT)),
    );
    Some((state, storage))
}

/// Company codes and candidate emails are global keys, so each test
/// works on its own.
fn unique_code() -> String {
    format!("PG-{}", &Uuid::new_v4().simple().to_string()[..10]).to_uppercase()
}

fn email_for(code: &str) -> String {
    format!("{}@example.com", code.to_lowercase())
}

fn job(title: &str) -> PublishJobRequest {
    PublishJobRequest {
        title: title.into(),
        location: "Monterrey".into(),
        profile_type: ProfileType::Field,
        description: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pg_concurrent_debits_never_overdraw() {
    let Some((state, storage)) = pg_app().await else { return };
    let code = unique_code();
    seed_company(&storage, &code, 5).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let ledger = state.ledger.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move { ledger.debit(&code, 1).await }));
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
    let company = storage.ledger.company(&code).await.unwrap().unwrap();
    assert_eq!(company.credits, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pg_concurrent_redemptions_of_one_code_credit_once() {
    let Some((state, storage)) = pg_app().await else { return };
    let first = unique_code();
    let second = unique_code();
    seed_company(&storage, &first, 0).await;
    seed_company(&storage, &second, 0).await;
    let voucher = state.ledger.issue_code(10).await.unwrap();

    let mut handles = Vec::new();
    for company in [&first, &second, &first, &second, &first, &second] {
        let ledger = state.ledger.clone();
        let company = company.clone();
        let voucher = voucher.code.clone();
        handles.push(tokio::spawn(async move { ledger.redeem(&company, &voucher).await }));
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
    assert_eq!(refused, 5);

    let a = storage.ledger.company(&first).await.unwrap().unwrap();
    let b = storage.ledger.company(&second).await.unwrap().unwrap();
    assert_eq!(a.credits + b.credits, 10);
}

#[tokio::test]
async fn pg_bootstrap_code_second_use_leaves_balance_alone() {
    let Some((state, storage)) = pg_app().await else { return };
    let code = unique_code();
    seed_company(&storage, &code, 0).await;

    let first = state.ledger.redeem(&code, "start").await.unwrap();
    assert_eq!(first.new_balance, 3);
    assert!(matches!(
        state.ledger.redeem(&code, "START").await,
        Err(Error::AlreadyRedeemed)
    ));
    let company = storage.ledger.company(&code).await.unwrap().unwrap();
    assert_eq!(company.credits, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pg_last_credit_goes_to_one_of_two_unlocks() {
    let Some((state, storage)) = pg_app().await else { return };
    let code = unique_code();
    seed_company(&storage, &code, 1).await;
    let a1 = state
        .assessments
        .create(submission(&code, &format!("a1.{}", email_for(&code))))
        .await
        .unwrap();
    let a2 = state
        .assessments
        .create(submission(&code, &format!("a2.{}", email_for(&code))))
        .await
        .unwrap();

    let (left, right) = tokio::join!(
        {
            let unlock = state.unlock.clone();
            let code = code.clone();
            tokio::spawn(async move { unlock.unlock(&code, a1).await })
        },
        {
            let unlock = state.unlock.clone();
            let code = code.clone();
            tokio::spawn(async move { unlock.unlock(&code, a2).await })
        }
    );
    let results = [left.unwrap(), right.unwrap()];
    let unlocked = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(Error::InsufficientCredits)))
        .count();
    assert_eq!((unlocked, refused), (1, 1));

    let company = storage.ledger.company(&code).await.unwrap().unwrap();
    assert_eq!(company.credits, 0);
    let views = state.assessments.list_for_company(&code).await.unwrap();
    assert_eq!(views.iter().filter(|v| v.is_unlocked).count(), 1);

    let winner = if results[0].is_ok() { a1 } else { a2 };
    let again = state.unlock.unlock(&code, winner).await.unwrap();
    assert!(again.already_unlocked);
    assert_eq!(again.new_balance, 0);
}

#[tokio::test]
async fn pg_premium_grant_features_only_active_jobs() {
    let Some((state, storage)) = pg_app().await else { return };
    let code = unique_code();
    seed_company(&storage, &code, 0).await;
    state.companies.verify(&code).await.unwrap();

    let open = state.jobs.publish(&code, job("Night guard")).await.unwrap();
    let closed = state.jobs.publish(&code, job("Driver")).await.unwrap();
    state.jobs.set_active(&code, closed.id, false).await.unwrap();

    let outcome = state.ledger.credit(&code, 50).await.unwrap();
    assert_eq!(outcome.plan, Plan::Premium);
    assert!(outcome.upgraded);

    let jobs = state.jobs.list_for_company(&code).await.unwrap();
    assert!(jobs.iter().find(|j| j.id == open.id).unwrap().is_featured);
    assert!(!jobs.iter().find(|j| j.id == closed.id).unwrap().is_featured);

    let small = state.ledger.credit(&code, 1).await.unwrap();
    assert_eq!(small.plan, Plan::Premium);
    assert!(!small.upgraded);
}

#[tokio::test]
async fn pg_claim_returns_candidate_and_flips_status_once() {
    let Some((state, storage)) = pg_app().await else { return };
    let code = unique_code();
    seed_company(&storage, &code, 0).await;
    let email = email_for(&code);
    let id = state
        .assessments
        .create(submission(&code, &email))
        .await
        .unwrap();

    let claimed = state.assessments.claim(id).await.unwrap().unwrap();
    assert_eq!(claimed.assessment.id, id);
    assert_eq!(claimed.assessment.status, AssessmentStatus::Analyzing);
    assert_eq!(claimed.candidate.email, email);
    assert_eq!(claimed.candidate.name, "Ana Torres");
    assert_eq!(claimed.candidate.company_code, code);

    assert!(state.assessments.claim(id).await.unwrap().is_none());
    assert_eq!(
        state.assessments.get(id).await.unwrap().status,
        AssessmentStatus::Analyzing
    );
}
