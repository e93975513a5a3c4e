//! Integration tests for subsidiary ledgers and their account links.

#![allow(clippy::uninlined_format_args)]

mod common;

use bukubesar_core::audit::EntityType;
use bukubesar_core::ledger::{AccountType, InvalidAccountReason, LedgerError};
use bukubesar_core::subsidiary::SubsidiaryKind;
use bukubesar_db::NewSubsidiary;
use bukubesar_db::entities::subsidiary_ledgers;
use bukubesar_shared::types::{PageRequest, SubsidiaryId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{Fixture, id, transfer};

async fn subsidiary(fx: &Fixture, base: &str, kind: SubsidiaryKind) -> subsidiary_ledgers::Model {
    fx.engine
        .subsidiaries()
        .create(NewSubsidiary {
            code: fx.code(base),
            name: base.to_string(),
            kind,
        })
        .await
        .unwrap()
}

fn sid(subsidiary: &subsidiary_ledgers::Model) -> SubsidiaryId {
    SubsidiaryId::from_uuid(subsidiary.id)
}

#[tokio::test]
async fn test_link_copies_account_balance() {
    let fx = Fixture::new().await;
    let (cash, revenue) = fx.cash_and_revenue().await;
    fx.engine.post(&transfer(&cash, &revenue, dec!(1500))).await.unwrap();

    let petty = subsidiary(&fx, "KAS-KECIL", SubsidiaryKind::CashBank).await;
    assert_eq!(petty.balance, Decimal::ZERO);
    assert!(petty.linked_account_id.is_none());

    let linked = fx.engine.link_subsidiary(sid(&petty), id(&cash)).await.unwrap();
    assert_eq!(linked.linked_account_id, Some(cash.id));
    assert_eq!(linked.balance, dec!(1500));

    // Relinking to the same account changes nothing
    let again = fx.engine.link_subsidiary(sid(&petty), id(&cash)).await.unwrap();
    assert_eq!(again.linked_account_id, Some(cash.id));
    assert_eq!(again.balance, dec!(1500));
}

#[tokio::test]
async fn test_posting_mirrors_into_linked_subsidiary() {
    let fx = Fixture::new().await;
    let (cash, revenue) = fx.cash_and_revenue().await;
    let petty = subsidiary(&fx, "KAS-KECIL", SubsidiaryKind::CashBank).await;
    fx.engine.link_subsidiary(sid(&petty), id(&cash)).await.unwrap();

    let sale = fx.engine.post(&transfer(&cash, &revenue, dec!(700))).await.unwrap();
    let mirrored = fx.engine.subsidiaries().get(sid(&petty)).await.unwrap();
    assert_eq!(mirrored.balance, dec!(700));

    fx.engine.reverse(sale.id(), "Void").await.unwrap();
    let mirrored = fx.engine.subsidiaries().get(sid(&petty)).await.unwrap();
    assert_eq!(mirrored.balance, Decimal::ZERO);
}

#[tokio::test]
async fn test_one_subsidiary_per_account() {
    let fx = Fixture::new().await;
    let (cash, _) = fx.cash_and_revenue().await;
    let bank = fx.account("1102", "Bank Mandiri", AccountType::Asset).await;

    let petty = subsidiary(&fx, "KAS-KECIL", SubsidiaryKind::CashBank).await;
    let vault = subsidiary(&fx, "BRANKAS", SubsidiaryKind::CashBank).await;
    fx.engine.link_subsidiary(sid(&petty), id(&cash)).await.unwrap();

    // Account already taken
    let err = fx.engine.link_subsidiary(sid(&vault), id(&cash)).await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyLinked { .. }));

    // Subsidiary already linked elsewhere
    let err = fx.engine.link_subsidiary(sid(&petty), id(&bank)).await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyLinked { .. }));

    let vault = fx.engine.subsidiaries().get(sid(&vault)).await.unwrap();
    assert!(vault.linked_account_id.is_none());
}

#[tokio::test]
async fn test_link_rejects_wrong_account_type() {
    let fx = Fixture::new().await;
    let (_, revenue) = fx.cash_and_revenue().await;
    let payables = subsidiary(&fx, "UTANG-VENDOR", SubsidiaryKind::Payable).await;

    let err = fx
        .engine
        .link_subsidiary(sid(&payables), id(&revenue))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidAccount {
            reason: InvalidAccountReason::TypeNotAllowed(AccountType::Revenue),
            ..
        }
    ));
}

#[tokio::test]
async fn test_link_unknown_subsidiary() {
    let fx = Fixture::new().await;
    let (cash, _) = fx.cash_and_revenue().await;
    let missing = SubsidiaryId::new();

    let err = fx.engine.link_subsidiary(missing, id(&cash)).await.unwrap_err();
    assert!(matches!(err, LedgerError::SubsidiaryNotFound(id) if id == missing));
}

#[tokio::test]
async fn test_duplicate_subsidiary_code() {
    let fx = Fixture::new().await;
    subsidiary(&fx, "KAS-KECIL", SubsidiaryKind::CashBank).await;

    let err = fx
        .engine
        .subsidiaries()
        .create(NewSubsidiary {
            code: fx.code("KAS-KECIL"),
            name: "Another".to_string(),
            kind: SubsidiaryKind::CashBank,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateSubsidiaryCode(_)));
}

#[tokio::test]
async fn test_unlink_stops_mirroring() {
    let fx = Fixture::new().await;
    let (cash, revenue) = fx.cash_and_revenue().await;
    let petty = subsidiary(&fx, "KAS-KECIL", SubsidiaryKind::CashBank).await;
    fx.engine.link_subsidiary(sid(&petty), id(&cash)).await.unwrap();
    fx.engine.post(&transfer(&cash, &revenue, dec!(100))).await.unwrap();

    let unlinked = fx.engine.subsidiaries().unlink(sid(&petty)).await.unwrap();
    assert!(unlinked.linked_account_id.is_none());
    assert_eq!(unlinked.balance, dec!(100));

    fx.engine.post(&transfer(&cash, &revenue, dec!(50))).await.unwrap();
    let after = fx.engine.subsidiaries().get(sid(&petty)).await.unwrap();
    assert_eq!(after.balance, dec!(100));
    assert_eq!(fx.balance(&cash).await, dec!(150));

    let err = fx.engine.subsidiaries().unlink(sid(&petty)).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotLinked(_)));

    // The account is free again
    let vault = subsidiary(&fx, "BRANKAS", SubsidiaryKind::CashBank).await;
    let relinked = fx.engine.link_subsidiary(sid(&vault), id(&cash)).await.unwrap();
    assert_eq!(relinked.balance, dec!(150));
}

#[tokio::test]
async fn test_subsidiary_history() {
    let fx = Fixture::new().await;
    let (cash, revenue) = fx.cash_and_revenue().await;
    let petty = subsidiary(&fx, "KAS-KECIL", SubsidiaryKind::CashBank).await;
    fx.engine.link_subsidiary(sid(&petty), id(&cash)).await.unwrap();
    fx.engine.post(&transfer(&cash, &revenue, dec!(100))).await.unwrap();
    fx.engine.subsidiaries().unlink(sid(&petty)).await.unwrap();

    let history = fx
        .engine
        .events()
        .history(EntityType::Subsidiary, petty.id, &PageRequest::default())
        .await
        .unwrap();

    let actions: Vec<&str> = history.items.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["unlink", "post", "link", "create"]);
}

#[tokio::test]
async fn test_lookup_by_code() {
    let fx = Fixture::new().await;
    let petty = subsidiary(&fx, "KAS-KECIL", SubsidiaryKind::CashBank).await;

    let found = fx
        .engine
        .subsidiaries()
        .find_by_code(&petty.code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, petty.id);

    let listed = fx.engine.subsidiaries().list().await.unwrap();
    assert!(listed.iter().any(|s| s.id == petty.id));
}
