//! Indexed hosts file store
//!
//! The `Store` owns the ordered list of records plus two indexes:
//! - addresses → positions of the records carrying that address
//! - names → positions of the records listing that name
//!
//! After every public call, each data record is reachable through both
//! indexes and no index points past the end of the list. Appends patch the
//! indexes in place; anything that moves or deletes records rebuilds the
//! list from a snapshot and then reindexes once.
//!
//! ## Concurrency
//!
//! Every method takes `&self`. The record list has its own lock, taken for
//! the whole of each mutation, and each index has its own. `add` and
//! `add_raw` are safe to call from many threads at once. Lookups that only
//! consult the indexes (`has*`, `check_all`) can observe the brief window
//! between a structural rebuild of the list and its reindex; serialize
//! structural edits externally if that matters.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open()?; // HOSTS_PATH or the platform default
//!
//! store.add("127.0.0.1", &["myapp.test"])?;
//! assert!(store.has("127.0.0.1", "myapp.test"));
//!
//! store.normalize();
//! store.flush()?;
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::mem;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{HostsError, HostsResult};
use crate::index::Index;
use crate::record::Record;
use crate::storage;
use crate::validate::{is_valid_address, is_valid_name};

/// In-memory hosts file with address and name indexes
#[derive(Debug)]
pub struct Store {
    config: Config,
    records: Mutex<Vec<Record>>,
    addresses: Index,
    names: Index,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create an empty store with the default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty store; nothing is read until `load`
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            records: Mutex::new(Vec::new()),
            addresses: Index::new(),
            names: Index::new(),
        }
    }

    /// Open the hosts file named by the loaded configuration
    pub fn open() -> anyhow::Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let path = config.path.clone();
        Self::open_with_config(config)
            .with_context(|| format!("Failed to load hosts file {:?}", path))
    }

    /// Open the hosts file at `config.path`
    pub fn open_with_config(config: Config) -> HostsResult<Self> {
        let store = Self::with_config(config);
        store.load()?;
        Ok(store)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// The record list is only ever swapped or appended to as a whole, so a
    /// panic elsewhere cannot leave it half-built.
    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current records, in file order
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// True if the hosts file can be opened for writing
    pub fn is_writable(&self) -> bool {
        storage::is_writable(&self.config.path)
    }

    // ==================== Loading & Writing ====================

    /// Replace the contents with the hosts file on disk
    ///
    /// The store is cleared first; if the file cannot be read it stays
    /// empty. Malformed lines are kept and flagged, never rejected.
    pub fn load(&self) -> HostsResult<()> {
        let mut records = self.lock();
        self.load_locked(&mut records)
    }

    /// Replace the contents with the lines of `content`
    pub fn load_str(&self, content: &str) {
        self.load_lines(storage::split_lines(content));
    }

    /// Replace the contents with already split lines
    pub fn load_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut records = self.lock();
        self.clear_locked(&mut records);
        for line in lines {
            self.push_parsed(&mut records, line.as_ref());
        }
    }

    /// Write every record to the hosts file, then reload it
    ///
    /// The configured names-per-line cap is applied first. If the file
    /// cannot be opened the in-memory records are left as they were.
    pub fn flush(&self) -> HostsResult<()> {
        let mut records = self.lock();
        if let Some(cap) = self.config.names_per_line {
            self.split_locked(&mut records, cap);
        }

        let lines: Vec<String> = records.iter().map(Record::to_line).collect();
        storage::write_lines(&self.config.path, &lines, self.config.line_ending)?;
        debug!("Wrote {} lines to {:?}", lines.len(), self.config.path);

        self.load_locked(&mut records)
    }

    fn load_locked(&self, records: &mut Vec<Record>) -> HostsResult<()> {
        self.clear_locked(records);
        let lines = storage::read_lines(&self.config.path)?;
        for line in &lines {
            self.push_parsed(records, line);
        }
        debug!("Loaded {} lines from {:?}", lines.len(), self.config.path);
        Ok(())
    }

    fn push_parsed(&self, records: &mut Vec<Record>, line: &str) {
        let record = Record::parse(line);
        if let Some(err) = record.error() {
            warn!("Line {}: {}", records.len() + 1, err);
        }
        self.push_locked(records, record);
    }

    /// Copy the hosts file on disk to `<path>.bak`
    pub fn backup(&self) -> HostsResult<PathBuf> {
        let dest = self.backup_path();
        self.backup_to(&dest)?;
        Ok(dest)
    }

    /// Copy the hosts file on disk to `dest`
    ///
    /// Works on the file itself; unflushed changes are not included.
    pub fn backup_to(&self, dest: impl AsRef<Path>) -> HostsResult<()> {
        let dest = dest.as_ref();
        storage::copy_file(&self.config.path, dest)?;
        info!("Backed up {:?} to {:?}", self.config.path, dest);
        Ok(())
    }

    pub fn backup_path(&self) -> PathBuf {
        self.config.backup_path()
    }

    // ==================== Adding ====================

    /// Parse and append raw lines
    ///
    /// Data lines must carry a valid address and valid names. Processing
    /// stops at the first invalid line; lines before it stay appended.
    pub fn add_raw(&self, lines: &[&str]) -> HostsResult<()> {
        let mut records = self.lock();
        for line in lines {
            let record = Record::parse(line);
            if let Some(address) = record.address() {
                if !is_valid_address(address) {
                    return Err(HostsError::InvalidAddress(address.to_string()));
                }
                if let Some(bad) = record.names().iter().find(|n| !is_valid_name(n)) {
                    return Err(HostsError::InvalidName(bad.clone()));
                }
            }
            self.push_locked(&mut records, record);
        }
        Ok(())
    }

    /// Map `names` to `address`
    ///
    /// A name belongs to one address at a time: if another address already
    /// lists it, it is removed there first (dropping that record if it ends
    /// up with no names). New names are merged into the first record for
    /// `address`, or a new record is appended when there is none.
    ///
    /// For an address not yet present, every name is validated up front and
    /// an invalid one fails the call before anything changes, so a line with
    /// a bad name is never appended. When merging, an invalid name aborts the
    /// call but names merged before it are kept.
    pub fn add(&self, address: &str, names: &[&str]) -> HostsResult<()> {
        if !is_valid_address(address) {
            return Err(HostsError::InvalidAddress(address.to_string()));
        }

        let mut records = self.lock();
        let is_new = !self.addresses.contains(address);
        if is_new {
            if let Some(bad) = names.iter().find(|n| !is_valid_name(n)) {
                return Err(HostsError::InvalidName(bad.to_string()));
            }
        }

        for name in names {
            let mut owners: Vec<String> = Vec::new();
            for pos in self.names.get(name) {
                if let Some(owner) = records.get(pos).and_then(Record::address) {
                    if owner != address && !owners.iter().any(|o| o == owner) {
                        owners.push(owner.to_string());
                    }
                }
            }
            for owner in owners {
                debug!("Moving {} from {} to {}", name, owner, address);
                self.remove_locked(&mut records, &owner, &[*name]);
            }
        }

        let Some(&first) = self.addresses.get(address).first() else {
            let mut unique: Vec<String> = Vec::with_capacity(names.len());
            for name in names {
                if !unique.iter().any(|u| u == name) {
                    unique.push(name.to_string());
                }
            }
            self.push_locked(&mut records, Record::new(address, unique));
            return Ok(());
        };

        for name in names {
            if self.has(address, name) {
                continue;
            }
            if !is_valid_name(name) {
                return Err(HostsError::InvalidName(name.to_string()));
            }
            records[first].push_name(*name);
            self.names.add(name, first);
        }
        Ok(())
    }

    // ==================== Lookups ====================

    /// True if one record carries both `address` and `name`
    pub fn has(&self, address: &str, name: &str) -> bool {
        let at_address = self.addresses.get(address);
        if at_address.is_empty() {
            return false;
        }
        let with_name = self.names.get(name);
        at_address.iter().any(|pos| with_name.contains(pos))
    }

    pub fn has_address(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// True if `address` exists and carries every one of `names`
    pub fn has_all(&self, address: &str, names: &[&str]) -> bool {
        self.has_address(address) && names.iter().all(|name| self.has(address, name))
    }

    /// True if `address` exists and carries at least one of `names`
    ///
    /// With no names this only checks that the address exists.
    pub fn has_any(&self, address: &str, names: &[&str]) -> bool {
        self.has_address(address)
            && (names.is_empty() || names.iter().any(|name| self.has(address, name)))
    }

    /// Per-name result of `has(address, name)`
    pub fn check_all(&self, address: &str, names: &[&str]) -> HashMap<String, bool> {
        let exists = self.has_address(address);
        names
            .iter()
            .map(|name| (name.to_string(), exists && self.has(address, name)))
            .collect()
    }

    // ==================== Removing ====================

    /// Remove `names` from every record carrying `address`
    ///
    /// Records left without names are dropped. With no names this does
    /// nothing.
    pub fn remove(&self, address: &str, names: &[&str]) -> HostsResult<()> {
        if !is_valid_address(address) {
            return Err(HostsError::InvalidAddress(address.to_string()));
        }
        if names.is_empty() {
            return Ok(());
        }

        let mut records = self.lock();
        self.remove_locked(&mut records, address, names);
        Ok(())
    }

    fn remove_locked(&self, records: &mut Vec<Record>, address: &str, names: &[&str]) {
        let snapshot = mem::take(records);
        for mut record in snapshot {
            if record.address() != Some(address) {
                records.push(record);
                continue;
            }

            record.retain_names(|name| !names.contains(&name));
            if !record.names().is_empty() {
                records.push(record);
            }
        }
        self.reindex(records);
    }

    /// Remove `name` wherever it appears, whatever the address
    ///
    /// Records left without names are dropped.
    pub fn remove_by_name(&self, name: &str) {
        let mut records = self.lock();
        let targets = self.names.get(name);
        if targets.is_empty() {
            return;
        }

        let mut emptied = Vec::new();
        for pos in targets {
            if let Some(record) = records.get_mut(pos) {
                record.retain_names(|n| n != name);
                if record.names().is_empty() {
                    emptied.push(pos);
                }
            }
        }

        if !emptied.is_empty() {
            let snapshot = mem::take(&mut *records);
            records.extend(
                snapshot
                    .into_iter()
                    .enumerate()
                    .filter(|(pos, _)| !emptied.contains(pos))
                    .map(|(_, record)| record),
            );
        }
        self.reindex(&records);
    }

    /// Drop every record carrying `address`
    pub fn remove_by_address(&self, address: &str) {
        let mut records = self.lock();
        if !self.addresses.contains(address) {
            return;
        }
        records.retain(|record| record.address() != Some(address));
        self.reindex(&records);
    }

    /// Drop every record
    pub fn clear(&self) {
        let mut records = self.lock();
        self.clear_locked(&mut records);
    }

    fn clear_locked(&self, records: &mut Vec<Record>) {
        records.clear();
        self.addresses.reset();
        self.names.reset();
    }

    // ==================== Normalization ====================

    /// Merge all records sharing an address into one
    ///
    /// The merged record is appended after the remaining records, in order
    /// of each address's first appearance. Names are not deduplicated.
    pub fn combine_duplicate_addresses(&self) {
        let mut records = self.lock();
        self.combine_locked(&mut records);
    }

    fn combine_locked(&self, records: &mut Vec<Record>) {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for address in records.iter().filter_map(Record::address) {
            let count = counts.entry(address).or_insert(0);
            if *count == 0 {
                order.push(address.to_string());
            }
            *count += 1;
        }
        let duplicated: Vec<String> = order
            .into_iter()
            .filter(|address| counts.get(address.as_str()).copied().unwrap_or(0) > 1)
            .collect();
        if duplicated.is_empty() {
            return;
        }

        let wanted: HashSet<&str> = duplicated.iter().map(String::as_str).collect();
        let mut merged: HashMap<String, Record> = HashMap::new();
        let snapshot = mem::take(records);
        for record in snapshot {
            let key = match record.address() {
                Some(address) if wanted.contains(address) => address.to_string(),
                _ => {
                    records.push(record);
                    continue;
                }
            };
            match merged.get_mut(&key) {
                Some(base) => base.combine(&record),
                None => {
                    merged.insert(key, record);
                }
            }
        }

        for address in &duplicated {
            if let Some(record) = merged.remove(address) {
                records.push(record);
            }
        }
        debug!("Combined {} duplicated addresses", duplicated.len());
        self.reindex(records);
    }

    /// Collapse repeated names within each record
    pub fn remove_duplicate_names(&self) {
        let mut records = self.lock();
        self.dedup_locked(&mut records);
    }

    fn dedup_locked(&self, records: &mut [Record]) {
        for record in records.iter_mut().filter(|r| r.is_valid()) {
            record.remove_duplicate_names();
        }
        self.reindex(records);
    }

    /// Sort the names inside each record; record order is unchanged
    pub fn sort_names(&self) {
        let mut records = self.lock();
        for record in records.iter_mut() {
            record.sort_names();
        }
    }

    /// Order records by address
    ///
    /// Lines without an address keep their relative order and move to the
    /// top. Data lines follow in byte order of the 16-byte address (IPv4 as
    /// IPv4-mapped IPv6); unparsable addresses sort first. Records sharing
    /// an address keep their relative order.
    pub fn sort_by_address(&self) {
        let mut records = self.lock();
        self.sort_locked(&mut records);
    }

    fn sort_locked(&self, records: &mut Vec<Record>) {
        let snapshot = mem::take(records);
        let (front, mut data): (Vec<Record>, Vec<Record>) =
            snapshot.into_iter().partition(|record| !record.is_valid());
        data.sort_by_cached_key(|record| address_key(record.address()));

        records.extend(front);
        records.extend(data);
        self.reindex(records);
    }

    /// Cap the number of names per line
    ///
    /// A record with more than `count` names keeps the first `count`; the
    /// rest move to the following record of the same address if there is
    /// one, otherwise into new records right after it. Reapplying with the
    /// same count changes nothing. `0` is a no-op.
    pub fn set_names_per_line(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut records = self.lock();
        self.split_locked(&mut records, count);
    }

    fn split_locked(&self, records: &mut Vec<Record>, count: usize) {
        if count == 0 || records.iter().all(|r| r.names().len() <= count) {
            return;
        }

        let snapshot = mem::take(records);
        let mut carry: Option<(String, Vec<String>)> = None;
        for mut record in snapshot {
            if let Some((address, names)) = carry.take() {
                if record.address() == Some(address.as_str()) {
                    record.extend_names(names);
                } else {
                    push_chunks(records, &address, names, count);
                }
            }

            if record.names().len() > count {
                let tail = record.split_names_off(count);
                if let Some(address) = record.address() {
                    carry = Some((address.to_string(), tail));
                }
            }
            records.push(record);
        }
        if let Some((address, names)) = carry {
            push_chunks(records, &address, names, count);
        }

        self.reindex(records);
    }

    /// Canonical form: one record per address, unique sorted names,
    /// records sorted by address, configured per-line cap applied
    pub fn normalize(&self) {
        let mut records = self.lock();
        self.combine_locked(&mut records);
        self.dedup_locked(&mut records);
        for record in records.iter_mut() {
            record.sort_names();
        }
        self.sort_locked(&mut records);
        if let Some(cap) = self.config.names_per_line {
            self.split_locked(&mut records, cap);
        }
    }

    // ==================== Indexing ====================

    /// Append a record and index it in place
    fn push_locked(&self, records: &mut Vec<Record>, record: Record) {
        let pos = records.len();
        if let Some(address) = record.address() {
            self.addresses.add(address, pos);
            for name in unique_names(&record) {
                self.names.add(name, pos);
            }
        }
        records.push(record);
    }

    /// Rebuild both indexes from scratch
    fn reindex(&self, records: &[Record]) {
        let mut addresses: HashMap<String, Vec<usize>> = HashMap::new();
        let mut names: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, record) in records.iter().enumerate() {
            let Some(address) = record.address() else {
                continue;
            };
            addresses.entry(address.to_string()).or_default().push(pos);
            for name in unique_names(record) {
                names.entry(name.to_string()).or_default().push(pos);
            }
        }
        self.addresses.replace(addresses);
        self.names.replace(names);
    }
}

impl fmt::Display for Store {
    /// The file content `flush` would write, before any per-line cap
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ending = self.config.line_ending.as_str();
        for record in self.lock().iter() {
            f.write_str(&record.to_line())?;
            f.write_str(ending)?;
        }
        Ok(())
    }
}

/// Names of a record, first occurrence only
fn unique_names(record: &Record) -> impl Iterator<Item = &str> {
    let names = record.names();
    names
        .iter()
        .enumerate()
        .filter(move |(i, name)| !names[..*i].contains(name))
        .map(|(_, name)| name.as_str())
}

fn address_key(address: Option<&str>) -> Option<[u8; 16]> {
    match address?.parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => Some(v4.to_ipv6_mapped().octets()),
        IpAddr::V6(v6) => Some(v6.octets()),
    }
}

fn push_chunks(records: &mut Vec<Record>, address: &str, names: Vec<String>, count: usize) {
    for chunk in names.chunks(count) {
        records.push(Record::new(address, chunk.to_vec()));
    }
}
