//! Asset registry and fund ledger interfaces.
//!
//! The auction core treats asset ownership and fund movement as external
//! collaborators behind capability interfaces, injected at construction
//! time. This crate defines those interfaces plus in-memory implementations
//! used by the mock chain, the relay watcher's local domain, and tests.

use std::collections::HashMap;

use gavel_types::{Address, AssetRef};
use thiserror::Error;

/// Errors surfaced by an asset registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown asset: token {0}")]
    UnknownAsset(u64),

    #[error("asset belongs to a different registry")]
    WrongRegistry,

    #[error("caller is not the current holder")]
    NotHolder,
}

/// Ownership and transfer primitives of a non-fungible asset registry.
///
/// `transfer` fails unless `from` is the current authorized holder.
pub trait AssetRegistry {
    /// Identity of this registry instance.
    fn address(&self) -> Address;

    /// Current holder of the asset.
    fn owner_of(&self, asset: &AssetRef) -> Result<Address, RegistryError>;

    /// Move the asset from its current holder to `to`.
    fn transfer(&mut self, from: Address, to: Address, asset: &AssetRef)
        -> Result<(), RegistryError>;
}

/// In-memory asset registry.
#[derive(Debug, Clone)]
pub struct InMemoryAssetRegistry {
    address: Address,
    owners: HashMap<u64, Address>,
}

impl InMemoryAssetRegistry {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            owners: HashMap::new(),
        }
    }

    /// Assign a token to an owner, returning its asset reference.
    pub fn mint(&mut self, token_id: u64, owner: Address) -> AssetRef {
        self.owners.insert(token_id, owner);
        AssetRef {
            registry: self.address,
            token_id,
        }
    }
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn address(&self) -> Address {
        self.address
    }

    fn owner_of(&self, asset: &AssetRef) -> Result<Address, RegistryError> {
        if asset.registry != self.address {
            return Err(RegistryError::WrongRegistry);
        }
        self.owners
            .get(&asset.token_id)
            .copied()
            .ok_or(RegistryError::UnknownAsset(asset.token_id))
    }

    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        asset: &AssetRef,
    ) -> Result<(), RegistryError> {
        let holder = self.owner_of(asset)?;
        if holder != from {
            return Err(RegistryError::NotHolder);
        }
        self.owners.insert(asset.token_id, to);
        Ok(())
    }
}

/// Fund balance table keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: HashMap<Address, u64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance for an identity.
    pub fn balance(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Add to an identity's balance.
    pub fn credit(&mut self, address: Address, amount: u64) {
        *self.balances.entry(address).or_insert(0) += amount;
    }

    /// Subtract from an identity's balance. Returns false (and leaves the
    /// balance untouched) when the balance does not cover the amount.
    pub fn debit(&mut self, address: &Address, amount: u64) -> bool {
        if let Some(balance) = self.balances.get_mut(address) {
            if *balance >= amount {
                *balance -= amount;
                return true;
            }
        }
        false
    }

    /// Remove and return an identity's entire balance.
    pub fn drain(&mut self, address: &Address) -> u64 {
        self.balances.remove(address).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_operations() {
        let mut ledger = Ledger::new();
        let addr = [1u8; 32];

        assert_eq!(ledger.balance(&addr), 0);

        ledger.credit(addr, 100);
        assert_eq!(ledger.balance(&addr), 100);

        ledger.credit(addr, 50);
        assert_eq!(ledger.balance(&addr), 150);

        assert!(ledger.debit(&addr, 75));
        assert_eq!(ledger.balance(&addr), 75);

        assert!(!ledger.debit(&addr, 100));
        assert_eq!(ledger.balance(&addr), 75);

        assert_eq!(ledger.drain(&addr), 75);
        assert_eq!(ledger.balance(&addr), 0);
    }

    #[test]
    fn test_registry_transfer_requires_holder() {
        let mut registry = InMemoryAssetRegistry::new([9u8; 32]);
        let alice = [1u8; 32];
        let bob = [2u8; 32];

        let asset = registry.mint(1, alice);
        assert_eq!(registry.owner_of(&asset).unwrap(), alice);

        assert_eq!(
            registry.transfer(bob, bob, &asset),
            Err(RegistryError::NotHolder)
        );

        registry.transfer(alice, bob, &asset).unwrap();
        assert_eq!(registry.owner_of(&asset).unwrap(), bob);
    }

    #[test]
    fn test_registry_rejects_foreign_asset() {
        let mut registry = InMemoryAssetRegistry::new([9u8; 32]);
        registry.mint(1, [1u8; 32]);

        let foreign = AssetRef {
            registry: [8u8; 32],
            token_id: 1,
        };
        assert_eq!(
            registry.owner_of(&foreign),
            Err(RegistryError::WrongRegistry)
        );
    }

    #[test]
    fn test_registry_unknown_token() {
        let registry = InMemoryAssetRegistry::new([9u8; 32]);
        let asset = AssetRef {
            registry: [9u8; 32],
            token_id: 5,
        };
        assert_eq!(
            registry.owner_of(&asset),
            Err(RegistryError::UnknownAsset(5))
        );
    }
}
