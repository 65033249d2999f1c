//! Per-connection Client Characteristic Configuration tables.
//!
//! Tables come from a fixed pool. A [`CccdTable`] lease hands its table
//! back when dropped, so a registration that fails half way leaves the
//! pool exactly as it found it.

use core::cell::Cell;

use crate::config::{CCCD_POOL_TABLES, MAX_CONNECTIONS};
use crate::error::Error;

/// Connection handle marking a free slot.
pub const INVALID_CONN_HANDLE: u16 = 0xFFFF;

/// CCCD notification enable bit.
pub const CCCD_NOTIFY: u16 = 0x0001;

/// One slot: which connection and what it configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharConfig {
    pub conn: u16,
    pub value: u16,
}

impl CharConfig {
    pub const FREE: Self = Self {
        conn: INVALID_CONN_HANDLE,
        value: 0,
    };
}

type Slots = [Cell<CharConfig>; MAX_CONNECTIONS];

/// Fixed pool of CCCD tables.
pub struct CccdPool {
    tables: [Slots; CCCD_POOL_TABLES],
    in_use: Cell<u8>,
    limit: usize,
}

impl Default for CccdPool {
    fn default() -> Self {
        Self::new()
    }
}

impl CccdPool {
    pub fn new() -> Self {
        Self::with_capacity(CCCD_POOL_TABLES)
    }

    /// Pool that hands out at most `limit` tables.
    pub fn with_capacity(limit: usize) -> Self {
        Self {
            tables: core::array::from_fn(|_| core::array::from_fn(|_| Cell::new(CharConfig::FREE))),
            in_use: Cell::new(0),
            limit: limit.min(CCCD_POOL_TABLES),
        }
    }

    /// Lease a free table, reset to all slots free.
    pub fn alloc(&self) -> Option<CccdTable<'_>> {
        let used = self.in_use.get();
        let index = (0..self.limit).find(|i| used & (1 << i) == 0)?;
        self.in_use.set(used | (1 << index));
        let table = CccdTable { pool: self, index };
        table.reset();
        Some(table)
    }

    /// Tables not currently leased.
    pub fn available(&self) -> usize {
        let used = self.in_use.get();
        (0..self.limit).filter(|i| used & (1 << i) == 0).count()
    }
}

/// A leased CCCD table, one slot per connection.
pub struct CccdTable<'a> {
    pool: &'a CccdPool,
    index: usize,
}

impl CccdTable<'_> {
    fn slots(&self) -> &Slots {
        &self.pool.tables[self.index]
    }

    /// Free every slot.
    pub fn reset(&self) {
        for slot in self.slots() {
            slot.set(CharConfig::FREE);
        }
    }

    /// Configuration `conn` wrote, 0 when it never did.
    pub fn get(&self, conn: u16) -> u16 {
        self.slots()
            .iter()
            .map(Cell::get)
            .find(|cfg| cfg.conn == conn)
            .map_or(0, |cfg| cfg.value)
    }

    /// Record the configuration written by `conn`. Writing 0 frees the slot.
    pub fn set(&self, conn: u16, value: u16) -> Result<(), Error> {
        if let Some(slot) = self.slots().iter().find(|s| s.get().conn == conn) {
            slot.set(if value == 0 {
                CharConfig::FREE
            } else {
                CharConfig { conn, value }
            });
            return Ok(());
        }
        if value == 0 {
            return Ok(());
        }
        let slot = self
            .slots()
            .iter()
            .find(|s| s.get().conn == INVALID_CONN_HANDLE)
            .ok_or(Error::InsufficientResources)?;
        slot.set(CharConfig { conn, value });
        Ok(())
    }

    /// Forget `conn`, typically on disconnect.
    pub fn release(&self, conn: u16) {
        for slot in self.slots() {
            if slot.get().conn == conn {
                slot.set(CharConfig::FREE);
            }
        }
    }

    /// Connections that enabled notifications.
    pub fn subscribers(&self) -> impl Iterator<Item = u16> + '_ {
        self.slots()
            .iter()
            .map(Cell::get)
            .filter(|cfg| cfg.conn != INVALID_CONN_HANDLE && cfg.value & CCCD_NOTIFY != 0)
            .map(|cfg| cfg.conn)
    }
}

impl Drop for CccdTable<'_> {
    fn drop(&mut self) {
        self.reset();
        let used = self.pool.in_use.get();
        self.pool.in_use.set(used & !(1 << self.index));
    }
}
