//! # Mock Token
//!
//! A minimal fungible token: balances, allowances, an open `mint`, and a
//! switch that makes transfers fail. The failure switch covers both ways a
//! real token can signal failure: returning `false` or reverting.

use parking_lot::RwLock;
use std::collections::HashMap;

use custodia_protocol::{Address, Amount, Token, TokenError};

/// How transfers behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// Transfers succeed when balances and allowances allow.
    #[default]
    Normal,
    /// Transfers do nothing and return `Ok(false)`.
    ReturnFalse,
    /// Transfers return `Err(TokenError::Reverted)`.
    Revert,
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

/// A settable fungible token.
#[derive(Debug)]
pub struct MockToken {
    symbol: String,
    decimals: u8,
    ledger: RwLock<Ledger>,
    mode: RwLock<TransferMode>,
}

impl MockToken {
    /// Creates a token with no supply.
    pub fn new(symbol: &str, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            ledger: RwLock::new(Ledger::default()),
            mode: RwLock::new(TransferMode::Normal),
        }
    }

    /// Creates `amount` new tokens for `to`.
    pub fn mint(&self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let mut ledger = self.ledger.write();
        ledger.total_supply = ledger
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = ledger.balances.entry(*to).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }

    /// Lets `spender` move up to `amount` of `owner`'s tokens.
    pub fn approve(&self, owner: &Address, spender: &Address, amount: Amount) {
        self.ledger
            .write()
            .allowances
            .insert((*owner, *spender), amount);
    }

    /// Remaining allowance of `spender` over `owner`'s tokens.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.ledger
            .read()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Total minted supply.
    pub fn total_supply(&self) -> Amount {
        self.ledger.read().total_supply
    }

    /// Changes how subsequent transfers behave.
    pub fn set_mode(&self, mode: TransferMode) {
        *self.mode.write() = mode;
    }

    fn check_mode(&self) -> Option<Result<bool, TokenError>> {
        match *self.mode.read() {
            TransferMode::Normal => None,
            TransferMode::ReturnFalse => Some(Ok(false)),
            TransferMode::Revert => Some(Err(TokenError::Reverted("transfers disabled".into()))),
        }
    }

    fn move_balance(
        ledger: &mut Ledger,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let from_balance = ledger.balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                balance: from_balance,
                needed: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = ledger.balances.get(to).copied().unwrap_or(0);
        let new_to = to_balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        ledger.balances.insert(*from, from_balance - amount);
        ledger.balances.insert(*to, new_to);
        Ok(())
    }
}

impl Token for MockToken {
    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn symbol(&self) -> String {
        self.symbol.clone()
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.ledger
            .read()
            .balances
            .get(holder)
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&self, sender: &Address, to: &Address, amount: Amount) -> Result<bool, TokenError> {
        if let Some(result) = self.check_mode() {
            return result;
        }
        let mut ledger = self.ledger.write();
        Self::move_balance(&mut ledger, sender, to, amount)?;
        Ok(true)
    }

    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        if let Some(result) = self.check_mode() {
            return result;
        }
        let mut ledger = self.ledger.write();
        let allowance = ledger
            .allowances
            .get(&(*from, *spender))
            .copied()
            .unwrap_or(0);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                allowance,
                needed: amount,
            });
        }
        Self::move_balance(&mut ledger, from, to, amount)?;
        ledger
            .allowances
            .insert((*from, *spender), allowance - amount);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn vault() -> Address {
        Address::derive("vault")
    }

    #[test]
    fn mint_and_transfer() {
        let token = MockToken::new("USDC", 6);
        token.mint(&alice(), 1_000).unwrap();
        assert_eq!(token.total_supply(), 1_000);

        assert!(token.transfer(&alice(), &vault(), 400).unwrap());
        assert_eq!(token.balance_of(&alice()), 600);
        assert_eq!(token.balance_of(&vault()), 400);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let token = MockToken::new("USDC", 6);
        token.mint(&alice(), 1_000).unwrap();
        token.approve(&alice(), &vault(), 500);

        assert!(token.transfer_from(&vault(), &alice(), &vault(), 300).unwrap());
        assert_eq!(token.allowance(&alice(), &vault()), 200);

        let err = token
            .transfer_from(&vault(), &alice(), &vault(), 300)
            .unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientAllowance {
                allowance: 200,
                needed: 300
            }
        );
    }

    #[test]
    fn failure_modes() {
        let token = MockToken::new("BAD", 18);
        token.mint(&alice(), 10).unwrap();

        token.set_mode(TransferMode::ReturnFalse);
        assert!(!token.transfer(&alice(), &vault(), 5).unwrap());
        assert_eq!(token.balance_of(&alice()), 10);

        token.set_mode(TransferMode::Revert);
        assert!(token.transfer(&alice(), &vault(), 5).is_err());

        token.set_mode(TransferMode::Normal);
        assert!(token.transfer(&alice(), &vault(), 5).unwrap());
    }
}
