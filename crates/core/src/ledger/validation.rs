//! Business rule validation for journal lines.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{DraftLine, EntryTotals};

/// Decimal places a stored amount may carry.
pub const AMOUNT_SCALE: u32 = 4;

/// Integer digits a stored amount may carry.
pub const AMOUNT_INTEGER_DIGITS: u32 = 16;

/// Whether `amount` fits a money column without rounding or overflow.
pub fn amount_fits(amount: Decimal) -> bool {
    amount.normalize().scale() <= AMOUNT_SCALE
        && amount.abs().trunc() < Decimal::from(10_u64.pow(AMOUNT_INTEGER_DIGITS))
}

/// Validates the shape of a set of journal lines.
///
/// - At least one line
/// - Amounts are non-negative
/// - Exactly one of debit/credit is non-zero per line
/// - Amounts and entry totals fit 16 integer digits and 4 decimal places
/// - Total debits equal total credits exactly
///
/// # Errors
///
/// Returns the first rule violated. Line numbers in errors are 1-based.
pub fn validate_lines(lines: &[DraftLine]) -> Result<EntryTotals, LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::EmptyEntry);
    }

    let mut debit = Decimal::ZERO;
    let mut credit = Decimal::ZERO;
    for (index, line) in lines.iter().enumerate() {
        let line_number = index + 1;
        validate_line(line_number, line)?;

        debit += line.debit;
        credit += line.credit;
        for total in [debit, credit] {
            if !amount_fits(total) {
                return Err(LedgerError::AmountOutOfRange {
                    line: line_number,
                    amount: total,
                });
            }
        }
    }

    let totals = EntryTotals::of(lines);
    if !totals.is_balanced {
        return Err(LedgerError::Unbalanced {
            debit: totals.total_debit,
            credit: totals.total_credit,
        });
    }

    Ok(totals)
}

fn validate_line(line_number: usize, line: &DraftLine) -> Result<(), LedgerError> {
    if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount { line: line_number });
    }

    let amount = match (line.debit.is_zero(), line.credit.is_zero()) {
        (true, true) => return Err(LedgerError::ZeroAmount { line: line_number }),
        (false, false) => return Err(LedgerError::InvalidEntryType { line: line_number }),
        (false, true) => line.debit,
        (true, false) => line.credit,
    };

    if !amount_fits(amount) {
        return Err(LedgerError::AmountOutOfRange {
            line: line_number,
            amount,
        });
    }
    Ok(())
}
