//! Boundary dispatch from raw messages to vault operations.
//!
//! A message that carries value but names no operation is a plain transfer
//! into the vault and is rewritten into an explicit `stake` of that value
//! before it reaches the core.

use serde::{Deserialize, Serialize};
use tracing::debug;

use stakevault_protocol::types::{Address, Amount};

use crate::error::VaultError;
use crate::events::EventRecord;
use crate::vault::StakeVault;

/// An explicit operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Call {
    /// Stake the attached value.
    Stake,
    /// Withdraw `amount` of available balance.
    Withdraw { amount: Amount },
}

/// A message sent to the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Address,
    /// Base asset attached to the message.
    #[serde(default)]
    pub value: Amount,
    /// `None` for a bare transfer.
    #[serde(default)]
    pub call: Option<Call>,
}

impl Message {
    /// A bare value transfer with no selector.
    pub fn transfer(sender: Address, value: Amount) -> Self {
        Self {
            sender,
            value,
            call: None,
        }
    }

    /// The operation this message resolves to.
    pub fn resolved_call(&self) -> Call {
        self.call.unwrap_or(Call::Stake)
    }
}

/// Routes `message` to the matching vault operation.
pub fn dispatch(vault: &mut StakeVault, message: Message) -> Result<EventRecord, VaultError> {
    let call = message.resolved_call();
    debug!(sender = %message.sender, value = message.value, ?call, "dispatch");
    match call {
        Call::Stake => vault.stake(message.sender, message.value),
        Call::Withdraw { amount } => {
            if message.value != 0 {
                return Err(VaultError::UnexpectedValue(message.value));
            }
            vault.withdraw(message.sender, amount)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use stakevault_protocol::delegate::InMemoryStakingPool;
    use stakevault_protocol::setup::VaultSetup;

    use crate::availability::AvailabilityCalculator;
    use crate::events::VaultEvent;

    fn vault() -> StakeVault {
        let mut vault = StakeVault::new(
            Address::repeat_byte(0xee),
            Arc::new(InMemoryStakingPool::new()),
            AvailabilityCalculator::principal(),
        );
        vault
            .initialize(VaultSetup {
                deposit_contract: Address::repeat_byte(1),
                oracle: Address::repeat_byte(2),
                operator_registry: Address::repeat_byte(3),
                admin: Address::repeat_byte(4),
            })
            .unwrap();
        vault
    }

    #[test]
    fn bare_transfer_stakes() {
        let mut vault = vault();
        let user = Address::repeat_byte(7);
        let record = dispatch(&mut vault, Message::transfer(user, 4)).unwrap();
        assert_eq!(record.event, VaultEvent::Staked { user, amount: 4 });
        assert_eq!(vault.balance_of(&user), 4);
    }

    #[test]
    fn bare_transfer_of_zero_is_a_zero_stake() {
        let mut vault = vault();
        let err = dispatch(&mut vault, Message::transfer(Address::repeat_byte(7), 0)).unwrap_err();
        assert_eq!(err, VaultError::ZeroStakeAmount);
    }

    #[test]
    fn withdraw_rejects_attached_value() {
        let mut vault = vault();
        let user = Address::repeat_byte(7);
        dispatch(&mut vault, Message::transfer(user, 4)).unwrap();
        let message = Message {
            sender: user,
            value: 1,
            call: Some(Call::Withdraw { amount: 1 }),
        };
        assert_eq!(
            dispatch(&mut vault, message),
            Err(VaultError::UnexpectedValue(1))
        );
        assert_eq!(vault.balance_of(&user), 4);
    }

    #[test]
    fn message_json_without_call_is_transfer() {
        let json = format!(r#"{{"sender":"{}","value":9}}"#, Address::repeat_byte(7));
        let message: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message.call, None);
        assert_eq!(message.resolved_call(), Call::Stake);

        let json = format!(
            r#"{{"sender":"{}","call":{{"method":"withdraw","amount":2}}}}"#,
            Address::repeat_byte(7)
        );
        let message: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message.call, Some(Call::Withdraw { amount: 2 }));
        assert_eq!(message.value, 0);
    }
}
