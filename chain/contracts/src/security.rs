//! Shared security primitives for the exchange
//!
//! Role registry, pause controller and reentrancy guard. The exchange
//! composes these as explicit guard calls at the top of each operation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use ledger_types::ids::Address;

use crate::errors::ExchangeError;

/// Reentrancy guard preventing nested calls into protected functions.
///
/// An operation that calls external code acquires the guard before doing
/// so and releases it on every exit path. A nested attempt fails.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self { locked: false }
    }

    /// Acquire the guard, failing with `Reentrancy` if already held.
    pub fn acquire(&mut self) -> Result<(), ExchangeError> {
        if self.locked {
            return Err(ExchangeError::Reentrancy);
        }
        self.locked = true;
        Ok(())
    }

    pub fn release(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Operator role registry.
///
/// Membership is only ever changed by existing operators, except that an
/// operator may always renounce its own membership. Adds and removes that
/// would be no-ops fail instead of succeeding silently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorRoles {
    operators: BTreeSet<Address>,
}

impl OperatorRoles {
    /// Create a registry whose only operator is `deployer`.
    pub fn new(deployer: Address) -> Self {
        let mut operators = BTreeSet::new();
        operators.insert(deployer);
        Self { operators }
    }

    pub fn is_operator(&self, account: &Address) -> bool {
        self.operators.contains(account)
    }

    /// Fail with `Unauthorized` unless `caller` holds the role.
    pub fn ensure_operator(&self, caller: &Address) -> Result<(), ExchangeError> {
        if !self.is_operator(caller) {
            return Err(ExchangeError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    /// Grant the role to `account`. Operator-only.
    pub fn add(&mut self, caller: &Address, account: Address) -> Result<(), ExchangeError> {
        self.ensure_operator(caller)?;
        if account.is_zero() {
            return Err(ExchangeError::ZeroAddress);
        }
        if !self.operators.insert(account) {
            return Err(ExchangeError::AlreadyOperator { account });
        }
        Ok(())
    }

    /// Revoke the role from `account`. Operator-only.
    pub fn remove(&mut self, caller: &Address, account: Address) -> Result<(), ExchangeError> {
        self.ensure_operator(caller)?;
        if account.is_zero() {
            return Err(ExchangeError::ZeroAddress);
        }
        if !self.operators.remove(&account) {
            return Err(ExchangeError::NotOperator { account });
        }
        Ok(())
    }

    /// Drop the caller's own membership.
    pub fn renounce(&mut self, caller: &Address) -> Result<(), ExchangeError> {
        if !self.operators.remove(caller) {
            return Err(ExchangeError::NotOperator { account: *caller });
        }
        Ok(())
    }

    /// Current operators in address order.
    pub fn operators(&self) -> impl Iterator<Item = &Address> {
        self.operators.iter()
    }

    pub fn count(&self) -> usize {
        self.operators.len()
    }
}

/// Pause controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PauseState {
    #[default]
    Running,
    Paused,
}

/// Composable pause modifier with strictly alternating transitions.
///
/// Authorization is checked by the caller; this type only enforces that
/// `pause` happens while running and `unpause` while paused.
#[derive(Debug, Clone, Default)]
pub struct PauseGuard {
    state: PauseState,
}

impl PauseGuard {
    pub fn new() -> Self {
        Self {
            state: PauseState::Running,
        }
    }

    /// Running → Paused
    pub fn pause(&mut self) -> Result<(), ExchangeError> {
        if self.state == PauseState::Paused {
            return Err(ExchangeError::AlreadyPaused);
        }
        self.state = PauseState::Paused;
        Ok(())
    }

    /// Paused → Running
    pub fn unpause(&mut self) -> Result<(), ExchangeError> {
        if self.state == PauseState::Running {
            return Err(ExchangeError::NotPaused);
        }
        self.state = PauseState::Running;
        Ok(())
    }

    /// Fail with `Paused` unless running.
    pub fn ensure_running(&self) -> Result<(), ExchangeError> {
        if self.state == PauseState::Paused {
            return Err(ExchangeError::Paused);
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.state == PauseState::Paused
    }

    pub fn state(&self) -> PauseState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    // --- ReentrancyGuard tests ---

    #[test]
    fn test_reentrancy_guard_acquire_release() {
        let mut guard = ReentrancyGuard::new();
        assert!(!guard.is_locked());
        guard.acquire().unwrap();
        assert!(guard.is_locked());
        guard.release();
        assert!(!guard.is_locked());
    }

    #[test]
    fn test_reentrancy_guard_double_acquire_fails() {
        let mut guard = ReentrancyGuard::new();
        guard.acquire().unwrap();
        assert_eq!(guard.acquire(), Err(ExchangeError::Reentrancy));
    }

    // --- OperatorRoles tests ---

    #[test]
    fn test_deployer_is_operator() {
        let roles = OperatorRoles::new(addr(1));
        assert!(roles.is_operator(&addr(1)));
        assert!(!roles.is_operator(&addr(2)));
        assert_eq!(roles.count(), 1);
    }

    #[test]
    fn test_add_and_remove_operator() {
        let mut roles = OperatorRoles::new(addr(1));
        roles.add(&addr(1), addr(2)).unwrap();
        assert!(roles.is_operator(&addr(2)));
        roles.remove(&addr(2), addr(1)).unwrap();
        assert!(!roles.is_operator(&addr(1)));
    }

    #[test]
    fn test_non_operator_cannot_add() {
        let mut roles = OperatorRoles::new(addr(1));
        assert_eq!(
            roles.add(&addr(9), addr(9)),
            Err(ExchangeError::Unauthorized { caller: addr(9) })
        );
    }

    #[test]
    fn test_double_add_and_double_remove_fail() {
        let mut roles = OperatorRoles::new(addr(1));
        assert_eq!(
            roles.add(&addr(1), addr(1)),
            Err(ExchangeError::AlreadyOperator { account: addr(1) })
        );
        assert_eq!(
            roles.remove(&addr(1), addr(5)),
            Err(ExchangeError::NotOperator { account: addr(5) })
        );
    }

    #[test]
    fn test_zero_address_rejected() {
        let mut roles = OperatorRoles::new(addr(1));
        assert_eq!(roles.add(&addr(1), Address::ZERO), Err(ExchangeError::ZeroAddress));
        assert_eq!(
            roles.remove(&addr(1), Address::ZERO),
            Err(ExchangeError::ZeroAddress)
        );
    }

    #[test]
    fn test_renounce() {
        let mut roles = OperatorRoles::new(addr(1));
        roles.renounce(&addr(1)).unwrap();
        assert_eq!(roles.count(), 0);
        assert_eq!(
            roles.renounce(&addr(1)),
            Err(ExchangeError::NotOperator { account: addr(1) })
        );
    }

    // --- PauseGuard tests ---

    #[test]
    fn test_pause_guard_alternates() {
        let mut pg = PauseGuard::new();
        assert_eq!(pg.state(), PauseState::Running);
        assert_eq!(pg.unpause(), Err(ExchangeError::NotPaused));
        pg.pause().unwrap();
        assert!(pg.is_paused());
        assert_eq!(pg.pause(), Err(ExchangeError::AlreadyPaused));
        assert_eq!(pg.ensure_running(), Err(ExchangeError::Paused));
        pg.unpause().unwrap();
        assert!(pg.ensure_running().is_ok());
    }

    proptest! {
        /// Membership equals the net effect of the successful calls.
        #[test]
        fn fuzz_operator_net_effect(
            ops in prop::collection::vec((any::<bool>(), 1u64..6u64), 0..40),
        ) {
            let root = addr(100);
            let mut roles = OperatorRoles::new(root);
            let mut model = std::collections::BTreeSet::from([root]);

            for (add, n) in ops {
                let target = addr(n);
                if add {
                    let res = roles.add(&root, target);
                    prop_assert_eq!(res.is_ok(), model.insert(target));
                } else {
                    let res = roles.remove(&root, target);
                    prop_assert_eq!(res.is_ok(), model.remove(&target));
                }
            }

            for n in 1u64..6 {
                prop_assert_eq!(roles.is_operator(&addr(n)), model.contains(&addr(n)));
            }
            prop_assert!(roles.is_operator(&root));
        }

        /// pause/unpause succeed exactly when they change the state.
        #[test]
        fn fuzz_pause_alternation(calls in prop::collection::vec(any::<bool>(), 0..30)) {
            let mut pg = PauseGuard::new();
            for pause in calls {
                let was_paused = pg.is_paused();
                let res = if pause { pg.pause() } else { pg.unpause() };
                prop_assert_eq!(res.is_ok(), pause != was_paused);
                if res.is_ok() {
                    prop_assert_eq!(pg.is_paused(), pause);
                } else {
                    prop_assert_eq!(pg.is_paused(), was_paused);
                }
            }
        }
    }
}
