//! Chart of accounts hierarchy rules.
//!
//! Header accounts group children of the same type. They never receive lines, so
//! their balance is always derived from their posting descendants on read.

use std::collections::{HashMap, HashSet};

use bukubesar_shared::types::AccountId;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::AccountType;

/// Minimal view of an account for hierarchy walks.
#[derive(Debug, Clone)]
pub struct AccountNode {
    /// The account ID.
    pub id: AccountId,
    /// Parent header, if any.
    pub parent_id: Option<AccountId>,
    /// Account classification.
    pub account_type: AccountType,
    /// Whether the account is a header.
    pub is_header: bool,
    /// Cached balance (always zero for headers).
    pub balance: Decimal,
}

/// Stateless hierarchy rules.
pub struct HierarchyService;

impl HierarchyService {
    /// Checks that `parent` may hold a child of `child_type`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParent` when the parent is not an active header of the same type.
    pub fn validate_parent(
        parent_code: &str,
        parent: &AccountNode,
        parent_is_active: bool,
        child_type: AccountType,
    ) -> Result<(), LedgerError> {
        let reject = |reason: String| LedgerError::InvalidParent {
            code: parent_code.to_string(),
            reason,
        };

        if !parent.is_header {
            return Err(reject("parent must be a header account".to_string()));
        }
        if !parent_is_active {
            return Err(reject("parent is inactive".to_string()));
        }
        if parent.account_type != child_type {
            return Err(reject(format!(
                "parent type {} does not match child type {child_type}",
                parent.account_type
            )));
        }
        Ok(())
    }

    /// Balance of `root` as reported to readers.
    ///
    /// A posting account reports its own cached balance. A header reports the sum
    /// of every non-header account below it. Cycles are ignored rather than looped on.
    #[must_use]
    pub fn rollup(root: AccountId, nodes: &[AccountNode]) -> Decimal {
        let by_id: HashMap<AccountId, &AccountNode> = nodes.iter().map(|n| (n.id, n)).collect();
        let Some(root_node) = by_id.get(&root) else {
            return Decimal::ZERO;
        };
        if !root_node.is_header {
            return root_node.balance;
        }

        let mut children: HashMap<AccountId, Vec<&AccountNode>> = HashMap::new();
        for node in nodes {
            if let Some(parent) = node.parent_id {
                children.entry(parent).or_default().push(node);
            }
        }

        let mut total = Decimal::ZERO;
        let mut visited = HashSet::from([root]);
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            for child in children.get(&current).into_iter().flatten() {
                if !visited.insert(child.id) {
                    continue;
                }
                if child.is_header {
                    stack.push(child.id);
                } else {
                    total += child.balance;
                }
            }
        }
        total
    }
}
