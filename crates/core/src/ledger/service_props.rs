//! Property-based tests for PostingService.
//!
//! - Balance invariant: for a balanced entry, the signed deltas of debit-normal
//!   accounts minus those of credit-normal accounts sum to zero
//! - Lock order: planned accounts are strictly ascending
//! - Determinism: planning is independent of line order

use bukubesar_shared::types::AccountId;
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::balance::NormalBalance;
use super::error::LedgerError;
use super::service::{AccountInfo, PostingService};
use super::types::{AccountType, DraftEntry, DraftLine};

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate account types.
fn account_type_strategy() -> impl Strategy<Value = AccountType> {
    prop_oneof![
        Just(AccountType::Asset),
        Just(AccountType::Liability),
        Just(AccountType::Equity),
        Just(AccountType::Revenue),
        Just(AccountType::Expense),
    ]
}

/// A small chart of accounts with deterministic ids.
fn chart_strategy() -> impl Strategy<Value = Vec<AccountInfo>> {
    prop::collection::vec(account_type_strategy(), 2..6).prop_map(|types| {
        types
            .into_iter()
            .enumerate()
            .map(|(i, account_type)| AccountInfo {
                id: AccountId::from_uuid(Uuid::from_u128(i as u128 + 1)),
                code: format!("{}", 1000 + i),
                account_type,
                is_active: true,
                is_header: false,
            })
            .collect()
    })
}

/// Builds a balanced entry: each debit goes to a chart account, one credit closes it.
fn balanced_draft(chart: &[AccountInfo], picks: &[(usize, Decimal)], closer: usize) -> DraftEntry {
    let mut draft = DraftEntry::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), "prop");
    let mut total = Decimal::ZERO;
    for (pick, amount) in picks {
        draft.lines.push(DraftLine::debit(chart[pick % chart.len()].id, *amount));
        total += *amount;
    }
    draft.lines.push(DraftLine::credit(chart[closer % chart.len()].id, total));
    draft
}

fn lookup(chart: &[AccountInfo]) -> impl Fn(AccountId) -> Result<AccountInfo, LedgerError> + '_ {
    move |id| PostingService::find_account(chart, id)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Signed deltas respect double entry: debit-normal growth equals credit-normal growth.
    #[test]
    fn prop_deltas_preserve_accounting_equation(
        chart in chart_strategy(),
        picks in prop::collection::vec((0usize..6, positive_amount()), 1..8),
        closer in 0usize..6,
    ) {
        let draft = balanced_draft(&chart, &picks, closer);
        let plan = PostingService::plan(&draft, lookup(&chart));
        prop_assert!(plan.is_ok(), "balanced draft should plan: {:?}", plan.as_ref().err());
        let plan = plan.unwrap();

        let mut debit_side = Decimal::ZERO;
        let mut credit_side = Decimal::ZERO;
        for delta in &plan.deltas {
            let info = PostingService::find_account(&chart, delta.account_id).unwrap();
            match info.account_type.normal_balance() {
                NormalBalance::Debit => debit_side += delta.amount,
                NormalBalance::Credit => credit_side += delta.amount,
            }
        }
        prop_assert_eq!(debit_side, credit_side);
    }

    /// Planned accounts are strictly ascending and cover every line's account.
    #[test]
    fn prop_plan_accounts_in_lock_order(
        chart in chart_strategy(),
        picks in prop::collection::vec((0usize..6, positive_amount()), 1..8),
        closer in 0usize..6,
    ) {
        let draft = balanced_draft(&chart, &picks, closer);
        let plan = PostingService::plan(&draft, lookup(&chart)).unwrap();

        let ids = plan.account_ids();
        for pair in ids.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for line in &draft.lines {
            prop_assert!(ids.contains(&line.account_id));
        }
    }

    /// Reordering lines changes neither totals nor deltas.
    #[test]
    fn prop_plan_independent_of_line_order(
        chart in chart_strategy(),
        picks in prop::collection::vec((0usize..6, positive_amount()), 1..8),
        closer in 0usize..6,
    ) {
        let draft = balanced_draft(&chart, &picks, closer);
        let mut reversed = draft.clone();
        reversed.lines.reverse();

        let a = PostingService::plan(&draft, lookup(&chart)).unwrap();
        let b = PostingService::plan(&reversed, lookup(&chart)).unwrap();
        prop_assert_eq!(a.deltas, b.deltas);
        prop_assert_eq!(a.totals, b.totals);
    }

    /// Unbalanced drafts never produce a plan.
    #[test]
    fn prop_unbalanced_never_planned(
        chart in chart_strategy(),
        debit in positive_amount(),
        credit in positive_amount(),
    ) {
        prop_assume!(debit != credit);
        let draft = DraftEntry::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), "prop")
            .line(DraftLine::debit(chart[0].id, debit))
            .line(DraftLine::credit(chart[1].id, credit));

        let result = PostingService::plan(&draft, lookup(&chart));
        prop_assert!(
            matches!(result, Err(LedgerError::Unbalanced { .. })),
            "Unbalanced entry should be rejected"
        );
    }
}
