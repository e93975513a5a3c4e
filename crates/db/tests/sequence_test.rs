//! Property tests over random sequences of posting, reversal, draft posting and
//! healing. Cached balances must always match the journal, and reversing
//! everything must bring every balance back to where it started.

#![allow(clippy::uninlined_format_args)]

mod common;

use bukubesar_core::ledger::AccountType;
use bukubesar_core::subsidiary::SubsidiaryKind;
use bukubesar_db::NewSubsidiary;
use bukubesar_db::entities::accounts;
use bukubesar_shared::types::{JournalEntryId, SubsidiaryId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use common::{Fixture, id, transfer};

const ACCOUNTS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Post { debit: usize, credit: usize, units: i64 },
    DraftThenPost { debit: usize, credit: usize, units: i64 },
    Reverse { pick: usize },
    Heal { account: usize },
}

/// An entry still open for reversal and what it moved.
struct Open {
    entry: JournalEntryId,
    debit: usize,
    credit: usize,
    amount: Decimal,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Up to 1,000,000.0000 with four decimal places
    let units = 1i64..10_000_000_000i64;
    prop_oneof![
        3 => (0..ACCOUNTS, 0..ACCOUNTS, units.clone())
            .prop_map(|(debit, credit, units)| Op::Post { debit, credit, units }),
        2 => (0..ACCOUNTS, 0..ACCOUNTS, units)
            .prop_map(|(debit, credit, units)| Op::DraftThenPost { debit, credit, units }),
        2 => any::<usize>().prop_map(|pick| Op::Reverse { pick }),
        1 => (0..ACCOUNTS).prop_map(|account| Op::Heal { account }),
    ]
}

/// Two distinct account slots.
fn pair(debit: usize, credit: usize) -> (usize, usize) {
    if debit == credit {
        (debit, (credit + 1) % ACCOUNTS)
    } else {
        (debit, credit)
    }
}

/// Slots 0 and 1 are assets (debit-normal), 2 and 3 credit-normal.
fn debit_sign(slot: usize) -> Decimal {
    if slot < 2 { Decimal::ONE } else { Decimal::NEGATIVE_ONE }
}

fn apply(expected: &mut [Decimal; ACCOUNTS], debit: usize, credit: usize, amount: Decimal) {
    expected[debit] += debit_sign(debit) * amount;
    expected[credit] -= debit_sign(credit) * amount;
}

async fn chart(fx: &Fixture) -> [accounts::Model; ACCOUNTS] {
    let (cash, revenue) = fx.cash_and_revenue().await;
    let bank = fx.account("1102", "Bank Mandiri", AccountType::Asset).await;
    let payable = fx.account("2101", "Utang Usaha", AccountType::Liability).await;
    [cash, bank, revenue, payable]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any sequence keeps cached balances equal to the journal, and reversing
    /// every open entry restores the opening balances.
    #[test]
    fn prop_random_sequences_stay_reconciled(
        ops in prop::collection::vec(op_strategy(), 1..25),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let fx = Fixture::new().await;
            let accounts = chart(&fx).await;
            let ours: Vec<_> = accounts.iter().map(id).collect();

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
            let petty_id = SubsidiaryId::from_uuid(petty.id);
            fx.engine.link_subsidiary(petty_id, id(&accounts[0])).await.unwrap();

            let mut opening = [Decimal::ZERO; ACCOUNTS];
            for (slot, account) in accounts.iter().enumerate() {
                opening[slot] = fx.balance(account).await;
            }
            let mut expected = opening;
            let mut open: Vec<Open> = Vec::new();

            for op in &ops {
                match *op {
                    Op::Post { debit, credit, units } => {
                        let (debit, credit) = pair(debit, credit);
                        let amount = Decimal::new(units, 4);
                        let posted = fx
                            .engine
                            .post(&transfer(&accounts[debit], &accounts[credit], amount))
                            .await
                            .unwrap();
                        apply(&mut expected, debit, credit, amount);
                        open.push(Open { entry: posted.id(), debit, credit, amount });
                    }
                    Op::DraftThenPost { debit, credit, units } => {
                        let (debit, credit) = pair(debit, credit);
                        let amount = Decimal::new(units, 4);
                        let draft = fx
                            .engine
                            .posting()
                            .create_draft(&transfer(&accounts[debit], &accounts[credit], amount))
                            .await
                            .unwrap();
                        // Drafts leave balances alone
                        prop_assert_eq!(fx.balance(&accounts[debit]).await, expected[debit]);

                        let posted = fx.engine.posting().post_draft(draft.id()).await.unwrap();
                        apply(&mut expected, debit, credit, amount);
                        open.push(Open { entry: posted.id(), debit, credit, amount });
                    }
                    Op::Reverse { pick } => {
                        if open.is_empty() {
                            continue;
                        }
                        let target = open.swap_remove(pick % open.len());
                        fx.engine.reverse(target.entry, "Sequence correction").await.unwrap();
                        apply(&mut expected, target.credit, target.debit, target.amount);
                    }
                    Op::Heal { account } => {
                        let healed = fx.engine.heal(id(&accounts[account])).await.unwrap();
                        prop_assert!(healed.is_none(), "healed a consistent account: {:?}", healed);
                    }
                }
            }

            for (slot, account) in accounts.iter().enumerate() {
                prop_assert_eq!(fx.balance(account).await, expected[slot]);
            }

            let drift = fx.engine.reconcile(None).await.unwrap();
            prop_assert!(
                !drift.iter().any(|d| ours.contains(&d.account_id)),
                "unexpected drift: {:?}",
                drift
            );
            let mirror_drift = fx.engine.reconcile_subsidiaries().await.unwrap();
            prop_assert!(!mirror_drift.iter().any(|d| d.subsidiary_id == petty_id));
            let mirrored = fx.engine.subsidiaries().get(petty_id).await.unwrap();
            prop_assert_eq!(mirrored.balance.amount(), expected[0]);

            for target in open.drain(..) {
                fx.engine.reverse(target.entry, "Sequence teardown").await.unwrap();
            }

            for (slot, account) in accounts.iter().enumerate() {
                prop_assert_eq!(fx.balance(account).await, opening[slot]);
            }
            let mirrored = fx.engine.subsidiaries().get(petty_id).await.unwrap();
            prop_assert_eq!(mirrored.balance.amount(), opening[0]);
            prop_assert!(fx.engine.reconcile(Some(ours[0])).await.unwrap().is_empty());
            prop_assert!(
                !fx.engine
                    .reconcile_subsidiaries()
                    .await
                    .unwrap()
                    .iter()
                    .any(|d| d.subsidiary_id == petty_id)
            );

            Ok(())
        })?;
    }
}
