use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Context, Result};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::model::Record;

fn table<T: Record>() -> TableDefinition<'static, &'static str, &'static [u8]> {
    TableDefinition::new(T::TABLE)
}

/// Ordered records of one resource type, keyed by id.
///
/// Records come back in insertion order. Every mutation is visible to the
/// next read on any clone of the same collection.
pub struct Collection<T> {
    backend: Backend<T>,
}

enum Backend<T> {
    Memory(Arc<RwLock<Vec<T>>>),
    Redb(Arc<Database>),
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        let backend = match &self.backend {
            Backend::Memory(records) => Backend::Memory(records.clone()),
            Backend::Redb(db) => Backend::Redb(db.clone()),
        };
        Self { backend }
    }
}

impl<T: Record> Collection<T> {
    /// Process-lifetime storage; discarded on exit.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(Vec::new()))),
        }
    }

    /// Durable storage in a table of `db`, created if absent.
    pub fn redb(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        {
            write_txn
                .open_table(table::<T>())
                .with_context(|| format!("open table {}", T::TABLE))?;
        }
        write_txn.commit()?;
        Ok(Self {
            backend: Backend::Redb(db),
        })
    }

    pub fn insert(&self, record: T) -> Result<()> {
        match &self.backend {
            Backend::Memory(records) => {
                write(records)?.push(record);
                Ok(())
            }
            Backend::Redb(db) => {
                let bytes = encode(&record)?;
                let write_txn = db.begin_write()?;
                {
                    let mut table = write_txn.open_table(table::<T>())?;
                    table.insert(record.id(), bytes.as_slice())?;
                }
                write_txn.commit()?;
                Ok(())
            }
        }
    }

    pub fn all(&self) -> Result<Vec<T>> {
        match &self.backend {
            Backend::Memory(records) => Ok(read(records)?.clone()),
            Backend::Redb(db) => {
                let read_txn = db.begin_read()?;
                let table = read_txn.open_table(table::<T>())?;
                let mut records = Vec::new();
                for item in table.iter()? {
                    let (_k, v) = item?;
                    records.push(decode(v.value())?);
                }
                // Keys are decimal millis; order numerically, not lexically.
                records.sort_by_key(|r: &T| id_order(r.id()));
                Ok(records)
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<T>> {
        match &self.backend {
            Backend::Memory(records) => Ok(read(records)?.iter().find(|r| r.id() == id).cloned()),
            Backend::Redb(db) => {
                let read_txn = db.begin_read()?;
                let table = read_txn.open_table(table::<T>())?;
                let found = table.get(id)?;
                found.map(|guard| decode(guard.value())).transpose()
            }
        }
    }

    /// First record, in insertion order, matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Result<Option<T>> {
        Ok(self.all()?.into_iter().find(|r| pred(r)))
    }

    /// Applies `change` to the record with `id` and returns the stored result,
    /// or `None` if there is no such record.
    pub fn update(&self, id: &str, change: impl FnOnce(&mut T)) -> Result<Option<T>> {
        match &self.backend {
            Backend::Memory(records) => {
                let mut records = write(records)?;
                Ok(records.iter_mut().find(|r| r.id() == id).map(|r| {
                    change(r);
                    r.clone()
                }))
            }
            Backend::Redb(db) => {
                let write_txn = db.begin_write()?;
                let updated = {
                    let mut table = write_txn.open_table(table::<T>())?;
                    let current: Option<T> = match table.get(id)? {
                        Some(guard) => Some(decode(guard.value())?),
                        None => None,
                    };
                    match current {
                        Some(mut record) => {
                            change(&mut record);
                            let bytes = encode(&record)?;
                            table.insert(id, bytes.as_slice())?;
                            Some(record)
                        }
                        None => None,
                    }
                };
                write_txn.commit()?;
                Ok(updated)
            }
        }
    }

    /// Removes the record with `id`. Returns true if it existed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        match &self.backend {
            Backend::Memory(records) => {
                let mut records = write(records)?;
                let before = records.len();
                records.retain(|r| r.id() != id);
                Ok(records.len() != before)
            }
            Backend::Redb(db) => {
                let write_txn = db.begin_write()?;
                let existed = {
                    let mut table = write_txn.open_table(table::<T>())?;
                    let existed = table.remove(id)?.is_some();
                    existed
                };
                write_txn.commit()?;
                Ok(existed)
            }
        }
    }

    pub fn len(&self) -> Result<usize> {
        match &self.backend {
            Backend::Memory(records) => Ok(read(records)?.len()),
            Backend::Redb(db) => {
                let read_txn = db.begin_read()?;
                let table = read_txn.open_table(table::<T>())?;
                Ok(table.len()? as usize)
            }
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Largest numeric id held, if any.
    pub fn max_numeric_id(&self) -> Result<Option<i64>> {
        Ok(self
            .all()?
            .iter()
            .filter_map(|r| r.id().parse::<i64>().ok())
            .max())
    }
}

fn id_order(id: &str) -> (i64, String) {
    (id.parse().unwrap_or(i64::MAX), id.to_string())
}

fn read<T>(lock: &RwLock<Vec<T>>) -> Result<std::sync::RwLockReadGuard<'_, Vec<T>>> {
    lock.read().map_err(|_| anyhow!("record lock poisoned"))
}

fn write<T>(lock: &RwLock<Vec<T>>) -> Result<std::sync::RwLockWriteGuard<'_, Vec<T>>> {
    lock.write().map_err(|_| anyhow!("record lock poisoned"))
}

fn encode<T: Record>(record: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(record, bincode::config::standard())
        .with_context(|| format!("bincode encode {}", T::TABLE))
}

fn decode<T: Record>(bytes: &[u8]) -> Result<T> {
    let (record, _): (T, _) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .with_context(|| format!("bincode decode {}", T::TABLE))?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl Record for Note {
        const TABLE: &'static str = "notes";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.into(),
            body: body.into(),
        }
    }

    fn exercise(notes: Collection<Note>) {
        assert!(notes.is_empty().unwrap());
        notes.insert(note("9", "nine")).unwrap();
        notes.insert(note("10", "ten")).unwrap();
        notes.insert(note("11", "eleven")).unwrap();

        let ids: Vec<_> = notes.all().unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, ["9", "10", "11"]);
        assert_eq!(notes.get("10").unwrap(), Some(note("10", "ten")));
        assert_eq!(notes.get("12").unwrap(), None);

        let updated = notes.update("10", |n| n.body = "TEN".into()).unwrap();
        assert_eq!(updated, Some(note("10", "TEN")));
        assert_eq!(notes.get("10").unwrap().unwrap().body, "TEN");
        assert_eq!(notes.update("12", |n| n.body.clear()).unwrap(), None);

        assert_eq!(
            notes.find(|n| n.body.starts_with('e')).unwrap(),
            Some(note("11", "eleven"))
        );
        assert_eq!(notes.max_numeric_id().unwrap(), Some(11));

        assert!(notes.remove("9").unwrap());
        assert!(!notes.remove("9").unwrap());
        assert_eq!(notes.len().unwrap(), 2);
    }

    #[test]
    fn memory_backend_contract() {
        exercise(Collection::in_memory());
    }

    #[test]
    fn redb_backend_contract() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::create(dir.path().join("test.db")).unwrap());
        exercise(Collection::redb(db).unwrap());
    }

    #[test]
    fn clones_share_records() {
        let a: Collection<Note> = Collection::in_memory();
        let b = a.clone();
        a.insert(note("1", "one")).unwrap();
        assert_eq!(b.get("1").unwrap(), Some(note("1", "one")));
    }

    #[test]
    fn redb_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let db = Arc::new(Database::create(&path).unwrap());
            let notes: Collection<Note> = Collection::redb(db).unwrap();
            notes.insert(note("1", "kept")).unwrap();
        }
        let db = Arc::new(Database::create(&path).unwrap());
        let notes: Collection<Note> = Collection::redb(db).unwrap();
        assert_eq!(notes.get("1").unwrap(), Some(note("1", "kept")));
    }
}
