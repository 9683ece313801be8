// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors

//! Runtime dispatch over the type-combo catalog.
//!
//! Every (data kind, container kind) pair in the cross-product has one
//! [`DispatchRecord`] of function pointers that create, clear, copy, compare,
//! write, and read a dynamically typed value of that combo. Records live in a
//! fixed-size open-addressing table keyed by the combo's wire codes; the
//! table is built once on first use and is read-only afterwards.

use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::reader::EntityReader;
use crate::types::TypeCombo;
use crate::varying::VarData;
use crate::writer::EntityWriter;

/// Per-combo operations on a dynamically typed value.
///
/// Each function checks that the payload it is handed actually carries its
/// combo and fails with `TypeMismatch` otherwise.
pub struct DispatchRecord {
    pub combo: TypeCombo,
    pub new: fn() -> VarData,
    pub clear: fn(&mut VarData) -> Result<()>,
    pub copy: fn(&mut VarData, &VarData) -> Result<()>,
    pub equals: fn(&VarData, &VarData) -> bool,
    pub write: fn(&VarData, &mut EntityWriter, &str) -> Result<()>,
    pub read: fn(&mut VarData, &mut EntityReader<'_>, &str) -> Result<()>,
}

impl core::fmt::Debug for DispatchRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatchRecord")
            .field("combo", &self.combo)
            .finish_non_exhaustive()
    }
}

// Table sizing: prime bucket count well above the combo count keeps probe
// chains short; the multipliers spread the two code axes apart.
const TABLE_SIZE: usize = 577;
const DATA_MULT: usize = 109;
const CONTAINER_MULT: usize = 991;

fn bucket(data: u8, container: u8) -> usize {
    (data as usize * DATA_MULT + container as usize * CONTAINER_MULT) % TABLE_SIZE
}

struct Table {
    slots: [Option<&'static DispatchRecord>; TABLE_SIZE],
}

impl Table {
    fn build() -> Self {
        let mut slots = [None; TABLE_SIZE];
        for record in crate::varying::RECORDS {
            let mut at = bucket(record.combo.data.code(), record.combo.container.code());
            while slots[at].is_some() {
                at = (at + 1) % TABLE_SIZE;
            }
            slots[at] = Some(record);
        }
        Self { slots }
    }

    fn find(&self, combo: TypeCombo) -> Option<&'static DispatchRecord> {
        let mut at = bucket(combo.data.code(), combo.container.code());
        while let Some(record) = self.slots[at] {
            if record.combo == combo {
                return Some(record);
            }
            at = (at + 1) % TABLE_SIZE;
        }
        None
    }
}

fn table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(Table::build)
}

/// Look up the dispatch record for a registered combo.
pub fn lookup(combo: TypeCombo) -> Result<&'static DispatchRecord> {
    table().find(combo).ok_or_else(|| {
        log::error!("[registry] no record for combo {combo}");
        Error::UnknownTypeCombo {
            data_kind: combo.data.code(),
            container: combo.container.code(),
        }
    })
}

/// Look up by raw wire codes, rejecting codes outside the catalog.
pub fn lookup_codes(data: u8, container: u8) -> Result<&'static DispatchRecord> {
    lookup(TypeCombo::from_codes(data, container)?)
}

/// All registered combos, in registration order.
pub fn combos() -> impl Iterator<Item = TypeCombo> {
    crate::varying::RECORDS.iter().map(|record| record.combo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContainerKind, DataKind};

    #[test]
    fn test_every_catalog_combo_resolves() {
        let mut seen = 0;
        for &data in DataKind::ALL {
            for &container in ContainerKind::ALL {
                let combo = TypeCombo::new(data, container);
                let record = lookup(combo).expect("registered combo");
                assert_eq!(record.combo, combo);
                seen += 1;
            }
        }
        assert_eq!(seen, 34 * 6);
        assert_eq!(combos().count(), 34 * 6);
    }

    #[test]
    fn test_out_of_catalog_codes_fail_cleanly() {
        assert_eq!(
            lookup_codes(0xEE, 3).unwrap_err(),
            Error::UnknownTypeCombo {
                data_kind: 0xEE,
                container: 3
            }
        );
        assert_eq!(
            lookup_codes(4, 0).unwrap_err(),
            Error::UnknownTypeCombo {
                data_kind: 4,
                container: 0
            }
        );
        assert_eq!(
            lookup_codes(0, 0).unwrap_err(),
            Error::UnknownTypeCombo {
                data_kind: 0,
                container: 0
            }
        );
    }

    #[test]
    fn test_new_produces_value_of_the_requested_combo() {
        for combo in combos() {
            let record = lookup(combo).expect("registered combo");
            let value = (record.new)();
            assert_eq!(value.combo(), combo);
        }
    }

    #[test]
    fn test_probe_chains_stay_bounded() {
        // With 204 records in 577 slots, every probe chain should stay well
        // below the table size.
        for combo in combos() {
            let start = bucket(combo.data.code(), combo.container.code());
            let mut at = start;
            let mut steps = 0;
            loop {
                match table().slots[at] {
                    Some(record) if record.combo == combo => break,
                    Some(_) => {
                        at = (at + 1) % TABLE_SIZE;
                        steps += 1;
                        assert!(steps < TABLE_SIZE, "unbounded probe for {combo}");
                    }
                    None => panic!("combo {combo} missing from table"),
                }
            }
        }
    }
}
