//! The shop's till float and bank balance, as one figure.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashAccount {
    balance: f64,
}

impl CashAccount {
    pub fn new(opening_balance: f64) -> Self {
        Self { balance: opening_balance }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Pay out `amount`. Fails without touching the balance if short.
    pub fn spend(&mut self, amount: f64) -> SimResult<()> {
        if amount > self.balance {
            return Err(SimError::InsufficientFunds {
                needed:    amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    pub fn deposit(&mut self, amount: f64) {
        self.balance += amount;
    }
}
