//! Integration tests for drift detection and healing.

#![allow(clippy::uninlined_format_args)]

mod common;

use bukubesar_core::audit::EntityType;
use bukubesar_core::ledger::{InvalidAccountReason, LedgerError};
use bukubesar_core::subsidiary::SubsidiaryKind;
use bukubesar_db::NewSubsidiary;
use bukubesar_db::entities::{accounts, subsidiary_ledgers};
use bukubesar_shared::types::{AccountId, PageRequest, SubsidiaryId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use common::{Fixture, id, transfer};

/// Overwrites a cached balance behind the engine's back.
async fn corrupt(fx: &Fixture, account: &accounts::Model, balance: Decimal) {
    accounts::Entity::update_many()
        .col_expr(accounts::Column::Balance, Expr::value(balance))
        .filter(accounts::Column::Id.eq(account.id))
        .exec(&fx.db)
        .await
        .unwrap();
}

async fn linked_petty_cash(fx: &Fixture, account: &accounts::Model) -> subsidiary_ledgers::Model {
    let petty = fx
        .engine
        .subsidiaries()
        .create(NewSubsidiary {
            code: fx.code("KAS-KECIL"),
            name: "Kas Kecil".to_string(),
            kind: SubsidiaryKind::CashBank,
        })
        .await
        .unwrap();
    fx.engine
        .link_subsidiary(SubsidiaryId::from_uuid(petty.id), id(account))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_consistent_ledger_has_no_discrepancies() {
    let fx = Fixture::new().await;
    let (cash, revenue) = fx.cash_and_revenue().await;

    let sale = fx.engine.post(&transfer(&cash, &revenue, dec!(1000))).await.unwrap();
    fx.engine.post(&transfer(&cash, &revenue, dec!(250))).await.unwrap();
    fx.engine.reverse(sale.id(), "Cancelled").await.unwrap();
    fx.engine
        .posting()
        .create_draft(&transfer(&cash, &revenue, dec!(9999)))
        .await
        .unwrap();

    assert!(fx.engine.reconcile(Some(id(&cash))).await.unwrap().is_empty());
    assert!(fx.engine.reconcile(Some(id(&revenue))).await.unwrap().is_empty());
    assert_eq!(fx.balance(&cash).await, dec!(250));
}

#[tokio::test]
async fn test_drift_is_detected_without_writing() {
    let fx = Fixture::new().await;
    let (cash, revenue) = fx.cash_and_revenue().await;
    fx.engine.post(&transfer(&cash, &revenue, dec!(1000))).await.unwrap();

    corrupt(&fx, &cash, dec!(1200)).await;

    let found = fx.engine.reconcile(Some(id(&cash))).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].account_id, id(&cash));
    assert_eq!(found[0].cached, dec!(1200));
    assert_eq!(found[0].calculated, dec!(1000));
    assert_eq!(found[0].delta, dec!(-200));

    // Detection leaves the cached value alone
    assert_eq!(fx.balance(&cash).await, dec!(1200));

    let all = fx.engine.reconcile(None).await.unwrap();
    assert!(all.iter().any(|d| d.account_id == id(&cash)));
    assert!(!all.iter().any(|d| d.account_id == id(&revenue)));
}

#[tokio::test]
async fn test_heal_sets_calculated_balance() {
    let fx = Fixture::new().await;
    let (cash, revenue) = fx.cash_and_revenue().await;
    fx.engine.post(&transfer(&cash, &revenue, dec!(1000))).await.unwrap();
    corrupt(&fx, &revenue, dec!(10)).await;

    let healed = fx.engine.heal(id(&revenue)).await.unwrap().unwrap();
    assert_eq!(healed.cached, dec!(10));
    assert_eq!(healed.calculated, dec!(1000));

    assert_eq!(fx.balance(&revenue).await, dec!(1000));
    assert!(fx.engine.reconcile(Some(id(&revenue))).await.unwrap().is_empty());

    // Nothing left to heal
    assert!(fx.engine.heal(id(&revenue)).await.unwrap().is_none());

    let history = fx
        .engine
        .events()
        .history(EntityType::Account, revenue.id, &PageRequest::default())
        .await
        .unwrap();
    let heal = &history.items[0];
    assert_eq!(heal.action, "reconcile");
    assert_eq!(heal.reason.as_deref(), Some("balance healed from journal lines"));
}

#[tokio::test]
async fn test_heal_remirrors_linked_subsidiary() {
    let fx = Fixture::new().await;
    let (cash, revenue) = fx.cash_and_revenue().await;
    let petty = linked_petty_cash(&fx, &cash).await;
    fx.engine.post(&transfer(&cash, &revenue, dec!(400))).await.unwrap();

    corrupt(&fx, &cash, dec!(0)).await;
    fx.engine.heal(id(&cash)).await.unwrap().unwrap();

    let mirrored = fx
        .engine
        .subsidiaries()
        .get(SubsidiaryId::from_uuid(petty.id))
        .await
        .unwrap();
    assert_eq!(mirrored.balance, dec!(400));
    assert_eq!(fx.balance(&cash).await, dec!(400));
}

#[tokio::test]
async fn test_unknown_account() {
    let fx = Fixture::new().await;
    let missing = AccountId::new();

    assert!(matches!(
        fx.engine.reconcile(Some(missing)).await,
        Err(LedgerError::InvalidAccount { reason: InvalidAccountReason::Missing, .. })
    ));
    assert!(matches!(
        fx.engine.heal(missing).await,
        Err(LedgerError::InvalidAccount { reason: InvalidAccountReason::Missing, .. })
    ));
}

#[tokio::test]
async fn test_subsidiary_drift_and_heal() {
    let fx = Fixture::new().await;
    let (cash, revenue) = fx.cash_and_revenue().await;
    let petty = linked_petty_cash(&fx, &cash).await;
    let petty_id = SubsidiaryId::from_uuid(petty.id);
    fx.engine.post(&transfer(&cash, &revenue, dec!(300))).await.unwrap();

    subsidiary_ledgers::Entity::update_many()
        .col_expr(subsidiary_ledgers::Column::Balance, Expr::value(dec!(50)))
        .filter(subsidiary_ledgers::Column::Id.eq(petty.id))
        .exec(&fx.db)
        .await
        .unwrap();

    let found = fx.engine.reconcile_subsidiaries().await.unwrap();
    let ours = found.iter().find(|d| d.subsidiary_id == petty_id).unwrap();
    assert_eq!(ours.subsidiary_balance, dec!(50));
    assert_eq!(ours.account_balance, dec!(300));

    let healed = fx
        .engine
        .reconciler()
        .heal_subsidiary(petty_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(healed.account_balance, dec!(300));

    let after = fx.engine.subsidiaries().get(petty_id).await.unwrap();
    assert_eq!(after.balance, dec!(300));
    assert!(
        !fx.engine
            .reconcile_subsidiaries()
            .await
            .unwrap()
            .iter()
            .any(|d| d.subsidiary_id == petty_id)
    );
    assert!(fx.engine.reconciler().heal_subsidiary(petty_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_heal_unlinked_subsidiary() {
    let fx = Fixture::new().await;
    let petty = fx
        .engine
        .subsidiaries()
        .create(NewSubsidiary {
            code: fx.code("KAS-KECIL"),
            name: "Kas Kecil".to_string(),
            kind: SubsidiaryKind::CashBank,
        })
        .await
        .unwrap();

    let err = fx
        .engine
        .reconciler()
        .heal_subsidiary(SubsidiaryId::from_uuid(petty.id))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotLinked(_)));
}
