//! Integration tests for the stake vault.
//!
//! These walk the vault through the user-visible flows end to end: explicit
//! stakes, bare transfers, rejected withdrawals and payouts, checking the
//! ledger, the delegate pool and the emitted events after each step.

use std::sync::Arc;

use stakevault_contracts::entry::{dispatch, Call, Message};
use stakevault_contracts::error::VaultError;
use stakevault_contracts::events::VaultEvent;
use stakevault_contracts::ledger::RecordStatus;
use stakevault_contracts::{AvailabilityCalculator, StakeVault};
use stakevault_protocol::delegate::{DelegateVault, InMemoryStakingPool};
use stakevault_protocol::setup::VaultSetup;
use stakevault_protocol::types::{ether, Address};

fn vault_address() -> Address {
    Address::repeat_byte(0xee)
}

fn user1() -> Address {
    Address::repeat_byte(0x01)
}

fn user2() -> Address {
    Address::repeat_byte(0x02)
}

/// Helper: an initialised principal-policy vault over a fresh pool.
fn deployed() -> (Arc<InMemoryStakingPool>, StakeVault) {
    let pool = Arc::new(InMemoryStakingPool::new());
    let mut vault = StakeVault::new(
        vault_address(),
        pool.clone(),
        AvailabilityCalculator::principal(),
    );
    vault
        .initialize(VaultSetup {
            deposit_contract: Address::repeat_byte(0xdc),
            oracle: Address::repeat_byte(0x0c),
            operator_registry: Address::repeat_byte(0x06),
            admin: Address::repeat_byte(0xad),
        })
        .unwrap();
    (pool, vault)
}

// ---------------------------------------------------------------------------
// Scenario walk-through
// ---------------------------------------------------------------------------

#[test]
fn full_user_journey() {
    let (pool, mut vault) = deployed();

    // 1. Explicit stake.
    vault.stake(user1(), ether(3)).unwrap();
    assert_eq!(vault.balance_of(&user1()), ether(3));
    let events = vault.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].event,
        VaultEvent::Staked {
            user: user1(),
            amount: ether(3)
        }
    );

    // 2. Bare transfer is a stake.
    dispatch(&mut vault, Message::transfer(user1(), ether(1))).unwrap();
    assert_eq!(vault.balance_of(&user1()), ether(4));
    assert_eq!(vault.available_amount(&user1()), ether(4));
    vault.drain_events();

    // 3. Zero stake.
    let err = vault.stake(user1(), 0).unwrap_err();
    assert_eq!(err, VaultError::ZeroStakeAmount);
    assert!(err.to_string().contains("more than 0"));
    assert_eq!(vault.balance_of(&user1()), ether(4));

    // 4. Over-withdrawal.
    let err = vault.withdraw(user1(), ether(50)).unwrap_err();
    assert_eq!(
        err,
        VaultError::InsufficientBalance {
            requested: ether(50),
            available: ether(4)
        }
    );
    assert!(err.to_string().contains("more than withdrawable amount"));
    assert_eq!(vault.balance_of(&user1()), ether(4));

    // 5. Partial withdrawal pays the user.
    let before = pool.balance_of(&user1());
    vault.withdraw(user1(), ether(1)).unwrap();
    assert_eq!(vault.balance_of(&user1()), ether(3));
    assert_eq!(pool.balance_of(&user1()), before + ether(1));
    let events = vault.drain_events();
    assert_eq!(
        events.iter().map(|r| r.event.clone()).collect::<Vec<_>>(),
        vec![VaultEvent::Withdrawn {
            user: user1(),
            amount: ether(1)
        }]
    );

    // 6. Never-staked user.
    let err = vault.withdraw(user2(), ether(30)).unwrap_err();
    assert_eq!(err, VaultError::UnknownDepositor(user2()));
    assert!(err.to_string().contains("no verifiable balance"));
    assert!(vault.events().is_empty());
}

#[test]
fn explicit_selectors_dispatch() {
    let (_pool, mut vault) = deployed();

    let stake = Message {
        sender: user1(),
        value: ether(2),
        call: Some(Call::Stake),
    };
    dispatch(&mut vault, stake).unwrap();

    let withdraw = Message {
        sender: user1(),
        value: 0,
        call: Some(Call::Withdraw { amount: ether(2) }),
    };
    dispatch(&mut vault, withdraw).unwrap();
    assert_eq!(vault.balance_of(&user1()), 0);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn stake_moves_balance_and_holding_by_exact_amount() {
    let (_pool, mut vault) = deployed();
    for (i, amount) in [1, 7, 1_000, ether(2), 123_456_789].into_iter().enumerate() {
        let owner = Address::repeat_byte(0x10 + i as u8);
        let balance_before = vault.balance_of(&owner);
        let holding_before = vault.pool_holding();

        vault.stake(owner, amount).unwrap();

        assert_eq!(vault.balance_of(&owner), balance_before + amount);
        assert_eq!(vault.pool_holding(), holding_before + amount);
    }
}

#[test]
fn zero_stake_never_changes_balance() {
    let (_pool, mut vault) = deployed();
    vault.stake(user1(), 5).unwrap();
    for _ in 0..3 {
        assert_eq!(vault.stake(user1(), 0), Err(VaultError::ZeroStakeAmount));
        assert_eq!(vault.stake(user2(), 0), Err(VaultError::ZeroStakeAmount));
    }
    assert_eq!(vault.balance_of(&user1()), 5);
    assert_eq!(vault.balance_of(&user2()), 0);
    assert_eq!(vault.ledger().status(&user2()), RecordStatus::Uninitialized);
}

#[test]
fn over_withdrawal_leaves_state_unchanged() {
    let (pool, mut vault) = deployed();
    vault.stake(user1(), 100).unwrap();
    vault.drain_events();

    for amount in [101, 1_000, u64::MAX] {
        assert!(matches!(
            vault.withdraw(user1(), amount),
            Err(VaultError::InsufficientBalance { available: 100, .. })
        ));
    }
    assert_eq!(vault.balance_of(&user1()), 100);
    assert_eq!(vault.pool_holding(), 100);
    assert_eq!(pool.balance_of(&user1()), 0);
    assert!(vault.events().is_empty());
}

#[test]
fn unknown_depositor_wins_over_zero_amount() {
    let (_pool, mut vault) = deployed();
    assert_eq!(
        vault.withdraw(user2(), 0),
        Err(VaultError::UnknownDepositor(user2()))
    );
    assert_eq!(
        vault.withdraw(user2(), 1),
        Err(VaultError::UnknownDepositor(user2()))
    );
}

#[test]
fn known_depositor_zero_withdrawal_is_insufficient() {
    let (_pool, mut vault) = deployed();
    vault.stake(user1(), 10).unwrap();
    assert!(matches!(
        vault.withdraw(user1(), 0),
        Err(VaultError::InsufficientBalance { requested: 0, .. })
    ));
}

#[test]
fn drained_depositor_is_not_unknown() {
    let (_pool, mut vault) = deployed();
    vault.stake(user1(), 10).unwrap();
    vault.withdraw(user1(), 10).unwrap();
    assert_eq!(vault.balance_of(&user1()), 0);
    assert_eq!(vault.ledger().status(&user1()), RecordStatus::Drained);

    assert_eq!(
        vault.withdraw(user1(), 1),
        Err(VaultError::InsufficientBalance {
            requested: 1,
            available: 0
        })
    );

    // Redeposit reactivates the record.
    vault.stake(user1(), 4).unwrap();
    assert_eq!(vault.ledger().status(&user1()), RecordStatus::Active);
}

#[test]
fn stake_then_withdraw_round_trips() {
    let (pool, mut vault) = deployed();
    vault.stake(user1(), ether(1)).unwrap();
    let before = vault.balance_of(&user1());

    vault.stake(user1(), ether(5)).unwrap();
    vault.withdraw(user1(), ether(5)).unwrap();

    assert_eq!(vault.balance_of(&user1()), before);
    assert_eq!(pool.balance_of(&user1()), ether(5));
    assert_eq!(vault.pool_holding(), ether(1));
}

#[test]
fn reads_are_idempotent() {
    let (_pool, mut vault) = deployed();
    vault.stake(user1(), 42).unwrap();
    let balance = vault.balance_of(&user1());
    let available = vault.available_amount(&user1());
    for _ in 0..5 {
        assert_eq!(vault.balance_of(&user1()), balance);
        assert_eq!(vault.available_amount(&user1()), available);
    }
    assert_eq!(vault.events().len(), 1);
}

#[test]
fn one_event_per_successful_operation() {
    let (_pool, mut vault) = deployed();
    vault.stake(user1(), 10).unwrap();
    let _ = vault.stake(user1(), 0);
    let _ = vault.withdraw(user1(), 11);
    let _ = vault.withdraw(user2(), 1);
    vault.withdraw(user1(), 4).unwrap();

    let events = vault.drain_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.name(), "staked");
    assert_eq!(events[1].event.name(), "withdrawn");
    assert_eq!(events[1].event.amount(), 4);
    assert!(events[0].sequence < events[1].sequence);
}

#[test]
fn ledger_never_exceeds_pool_holding() {
    let (_pool, mut vault) = deployed();
    let users: Vec<Address> = (1..=5).map(Address::repeat_byte).collect();
    for (i, user) in users.iter().enumerate() {
        vault.stake(*user, (i as u64 + 1) * 1_000).unwrap();
    }
    vault.withdraw(users[2], 1_500).unwrap();
    vault.withdraw(users[4], 5_000).unwrap();

    let sum: u64 = users.iter().map(|u| vault.balance_of(u)).sum();
    assert_eq!(sum, vault.total_recorded());
    assert!(vault.total_recorded() <= vault.pool_holding());
    assert!(vault.solvency().solvent);
}
