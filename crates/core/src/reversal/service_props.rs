//! Property-based tests for ReversalService.
//!
//! An entry plus its reversal nets every account back to where it started.

use bukubesar_shared::types::{AccountId, JournalEntryId};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::service::{OriginalLine, ReversalInput, ReversalService};
use crate::ledger::balance::{net_deltas, NormalBalance};
use crate::ledger::validation::validate_lines;

/// Strategy for generating account ids from a small pool so lines collide.
fn arb_account() -> impl Strategy<Value = AccountId> {
    (1u128..6).prop_map(|n| AccountId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for generating random positive Decimal amounts.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for generating a balanced pair of lines (one debit, one credit).
fn arb_balanced_pair() -> impl Strategy<Value = Vec<OriginalLine>> {
    (
        arb_account(),
        arb_account(),
        arb_amount(),
        prop::option::of("[a-zA-Z ]{0,20}"),
    )
        .prop_map(|(debit_account, credit_account, amount, memo)| {
            vec![
                OriginalLine {
                    account_id: debit_account,
                    debit: amount,
                    credit: Decimal::ZERO,
                    description: memo.clone(),
                },
                OriginalLine {
                    account_id: credit_account,
                    debit: Decimal::ZERO,
                    credit: amount,
                    description: memo,
                },
            ]
        })
}

/// Strategy for generating balanced multi-line sets (2-6 lines).
fn arb_balanced_lines() -> impl Strategy<Value = Vec<OriginalLine>> {
    prop::collection::vec(arb_balanced_pair(), 1..4)
        .prop_map(|pairs| pairs.into_iter().flatten().collect())
}

fn input(lines: &[OriginalLine]) -> ReversalInput<'_> {
    ReversalInput {
        original_id: JournalEntryId::new(),
        original_number: "JE-202401-000001",
        reversal_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        reason: "Test reversal",
        lines,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Reversal lines swap sides and preserve accounts and amounts.
    #[test]
    fn prop_reversal_swaps_sides(lines in arb_balanced_lines()) {
        let draft = ReversalService::build(&input(&lines)).unwrap();

        prop_assert_eq!(draft.lines.len(), lines.len());
        for (original, reversed) in lines.iter().zip(draft.lines.iter()) {
            prop_assert_eq!(original.account_id, reversed.account_id);
            prop_assert_eq!(original.debit, reversed.credit);
            prop_assert_eq!(original.credit, reversed.debit);
        }
    }

    /// Balanced originals produce reversals that pass line validation.
    #[test]
    fn prop_reversal_is_valid_entry(lines in arb_balanced_lines()) {
        prop_assert!(ReversalService::validate_reversal(&lines));

        let draft = ReversalService::build(&input(&lines)).unwrap();
        prop_assert!(validate_lines(&draft.lines).is_ok());
    }

    /// Original deltas plus reversal deltas are zero for every account.
    #[test]
    fn prop_reversal_cancels_deltas(
        lines in arb_balanced_lines(),
        credit_normal in any::<bool>(),
    ) {
        let normal = if credit_normal { NormalBalance::Credit } else { NormalBalance::Debit };
        let draft = ReversalService::build(&input(&lines)).unwrap();

        let combined = lines
            .iter()
            .map(|l| (l.account_id, normal, l.debit, l.credit))
            .chain(draft.lines.iter().map(|l| (l.account_id, normal, l.debit, l.credit)));

        for delta in net_deltas(combined) {
            prop_assert_eq!(delta.amount, Decimal::ZERO);
        }
    }

    /// Memo is prefixed with "Reversal: ".
    #[test]
    fn prop_memo_prefixed_with_reversal(lines in arb_balanced_pair()) {
        let draft = ReversalService::build(&input(&lines)).unwrap();
        for (original, reversed) in lines.iter().zip(draft.lines.iter()) {
            let expected = format!("Reversal: {}", original.description.clone().unwrap_or_default());
            prop_assert_eq!(reversed.description.as_deref(), Some(expected.as_str()));
        }
    }
}
