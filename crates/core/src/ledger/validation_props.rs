//! Property-based tests for journal line validation rules.

use bukubesar_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::DraftLine;
use super::validation::validate_lines;

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a negative amount.
fn negative_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

/// Builds a line on the requested side.
fn make_line(is_debit: bool, amount: Decimal) -> DraftLine {
    if is_debit {
        DraftLine::debit(AccountId::new(), amount)
    } else {
        DraftLine::credit(AccountId::new(), amount)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Zero-amount lines are rejected with their position.
    #[test]
    fn prop_zero_amount_rejected(
        is_debit in any::<bool>(),
        other_amount in positive_amount(),
    ) {
        let lines = vec![
            make_line(!is_debit, other_amount),
            make_line(is_debit, Decimal::ZERO),
        ];

        let result = validate_lines(&lines);
        prop_assert!(
            matches!(result, Err(LedgerError::ZeroAmount { line: 2 })),
            "Zero amount should be rejected, got: {:?}",
            result
        );
    }

    /// Negative amounts are rejected regardless of side.
    #[test]
    fn prop_negative_amount_rejected(
        is_debit in any::<bool>(),
        amount in negative_amount(),
    ) {
        let lines = vec![make_line(is_debit, amount), make_line(!is_debit, amount)];

        let result = validate_lines(&lines);
        prop_assert!(
            matches!(result, Err(LedgerError::NegativeAmount { line: 1 })),
            "Negative amount should be rejected, got: {:?}",
            result
        );
    }

    /// Two-sided lines are rejected even when the entry would balance.
    #[test]
    fn prop_two_sided_line_rejected(amount in positive_amount()) {
        let mut line = DraftLine::debit(AccountId::new(), amount);
        line.credit = amount;

        let result = validate_lines(&[line]);
        prop_assert!(matches!(result, Err(LedgerError::InvalidEntryType { line: 1 })), "unexpected result: {:?}", result);
    }

    /// Any split of debits against a single matching credit is accepted.
    #[test]
    fn prop_split_debits_accepted(
        amounts in prop::collection::vec(positive_amount(), 1..12),
    ) {
        let total: Decimal = amounts.iter().copied().sum();
        let mut lines: Vec<DraftLine> = amounts.iter().map(|a| make_line(true, *a)).collect();
        lines.push(make_line(false, total));

        let totals = validate_lines(&lines);
        prop_assert!(totals.is_ok());
        let totals = totals.unwrap();
        prop_assert_eq!(totals.total_debit, total);
        prop_assert_eq!(totals.total_credit, total);
    }

    /// Any off-by-one-cent entry is rejected as unbalanced.
    #[test]
    fn prop_off_by_one_cent_rejected(amount in positive_amount()) {
        let lines = vec![
            make_line(true, amount),
            make_line(false, amount + Decimal::new(1, 2)),
        ];

        let result = validate_lines(&lines);
        prop_assert!(matches!(result, Err(LedgerError::Unbalanced { .. })), "unexpected result: {:?}", result);
    }
}
