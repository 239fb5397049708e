//! Account persistence.
//!
//! [`AccountStore`] is the seam between the account service and storage. Two implementations
//! are provided:
//!
//! - [`FileAccountStore`]: one pretty-printed JSON document per account, in a sharded tree
//!   under the configured data directory.
//! - [`InMemoryAccountStore`]: a locked map, for tests and throwaway runs.
//!
//! ## Storage Layout
//!
//! ```text
//! accounts/
//!   <s1>/
//!     <s2>/
//!       <id>/
//!         account.json
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the account id.
//!
//! Uniqueness of username and email is enforced by the store itself: `insert` and `save`
//! check and write under one lock, so two concurrent registrations for the same username
//! cannot both succeed. Beyond that, each save is a read-modify-write with no version check;
//! concurrent writers of one account race and the last write wins.

use crate::account::Account;
use crate::config::CoreConfig;
use crate::constants::{ACCOUNTS_DIR_NAME, ACCOUNT_FILENAME};
use crate::{AccountError, AccountId, AccountResult};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tempfile::NamedTempFile;
use telehealth_types::EmailAddress;

/// Storage for account documents.
pub trait AccountStore: Send + Sync {
    /// Stores a new account.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if an account with the same id, username or email is already stored.
    fn insert(&self, account: &Account) -> AccountResult<()>;

    fn get(&self, id: &AccountId) -> AccountResult<Option<Account>>;

    /// Overwrites an existing account.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no account with that id is stored.
    /// - `AlreadyExists` if another account holds the same username or email.
    fn save(&self, account: &Account) -> AccountResult<()>;

    /// Removes an account.
    ///
    /// # Errors
    ///
    /// `NotFound` if no account with that id is stored.
    fn delete(&self, id: &AccountId) -> AccountResult<()>;

    /// All stored accounts, oldest first.
    fn list(&self) -> AccountResult<Vec<Account>>;

    fn find_by_username(&self, username: &str) -> AccountResult<Option<Account>>;

    fn find_by_email(&self, email: &EmailAddress) -> AccountResult<Option<Account>>;
}

/// Fails with `AlreadyExists` if any of `others` (other than `account` itself) shares its
/// username or email.
fn ensure_unique<'a>(
    others: impl IntoIterator<Item = &'a Account>,
    account: &Account,
) -> AccountResult<()> {
    for other in others.into_iter().filter(|other| other.id != account.id) {
        if other.username == account.username {
            return Err(AccountError::AlreadyExists(
                "username is already taken".into(),
            ));
        }
        if other.email == account.email {
            return Err(AccountError::AlreadyExists(
                "email is already registered".into(),
            ));
        }
    }
    Ok(())
}

/// Username and email lookups to account ids.
#[derive(Debug, Default)]
struct AccountIndex {
    by_username: HashMap<String, AccountId>,
    by_email: HashMap<EmailAddress, AccountId>,
}

impl AccountIndex {
    /// Builds an index from accounts sorted oldest first; the oldest holder of a key wins.
    fn from_accounts(accounts: &[Account]) -> Self {
        let mut index = Self::default();
        for account in accounts {
            index
                .by_username
                .entry(account.username.as_str().to_string())
                .or_insert_with(|| account.id.clone());
            index
                .by_email
                .entry(account.email.clone())
                .or_insert_with(|| account.id.clone());
        }
        index
    }

    fn record(&mut self, account: &Account) {
        self.forget(&account.id);
        self.by_username
            .insert(account.username.as_str().to_string(), account.id.clone());
        self.by_email
            .insert(account.email.clone(), account.id.clone());
    }

    fn forget(&mut self, id: &AccountId) {
        self.by_username.retain(|_, held| held != id);
        self.by_email.retain(|_, held| held != id);
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// File-backed account store rooted at `<data_dir>/accounts`.
///
/// Writes from this process are serialised; each write goes to its own temp file that is
/// then renamed over the document. Lookups by username or email go through an in-process
/// index whose hits are checked against the document on disk, and a miss rescans the tree,
/// so accounts written by another process are still found.
#[derive(Debug)]
pub struct FileAccountStore {
    accounts_dir: PathBuf,
    write_lock: Mutex<()>,
    index: RwLock<Option<AccountIndex>>,
}

impl FileAccountStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::at(cfg.accounts_dir())
    }

    /// Opens the store under `data_dir` without a full [`CoreConfig`].
    pub fn open(data_dir: &Path) -> Self {
        Self::at(data_dir.join(ACCOUNTS_DIR_NAME))
    }

    fn at(accounts_dir: PathBuf) -> Self {
        Self {
            accounts_dir,
            write_lock: Mutex::new(()),
            index: RwLock::new(None),
        }
    }

    pub fn accounts_dir(&self) -> &Path {
        &self.accounts_dir
    }

    fn account_path(&self, id: &AccountId) -> PathBuf {
        id.sharded_dir(&self.accounts_dir).join(ACCOUNT_FILENAME)
    }

    fn read_account(path: &Path) -> AccountResult<Account> {
        let contents = fs::read_to_string(path).map_err(AccountError::FileRead)?;
        serde_json::from_str(&contents).map_err(AccountError::Deserialization)
    }

    /// Writes to a uniquely named sibling temp file, then renames it over the document.
    fn write_account(&self, account: &Account) -> AccountResult<()> {
        let dir = account.id.sharded_dir(&self.accounts_dir);
        fs::create_dir_all(&dir).map_err(AccountError::StorageDirCreation)?;

        let contents =
            serde_json::to_string_pretty(account).map_err(AccountError::Serialization)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(AccountError::FileWrite)?;
        tmp.write_all(contents.as_bytes())
            .map_err(AccountError::FileWrite)?;
        tmp.persist(dir.join(ACCOUNT_FILENAME))
            .map_err(|e| AccountError::FileWrite(e.error))?;
        Ok(())
    }

    fn update_index(&self, apply: impl FnOnce(&mut AccountIndex)) -> AccountResult<()> {
        let mut index = self
            .index
            .write()
            .map_err(|_| AccountError::StorePoisoned)?;
        if let Some(index) = index.as_mut() {
            apply(index);
        }
        Ok(())
    }

    /// Index hit verified against disk, else a full rescan (which rebuilds the index).
    fn lookup(
        &self,
        cached: impl FnOnce(&AccountIndex) -> Option<AccountId>,
        matches: impl Fn(&Account) -> bool,
    ) -> AccountResult<Option<Account>> {
        let hit = self
            .index
            .read()
            .map_err(|_| AccountError::StorePoisoned)?
            .as_ref()
            .and_then(cached);

        if let Some(id) = hit {
            if let Ok(Some(account)) = self.get(&id) {
                if matches(&account) {
                    return Ok(Some(account));
                }
            }
        }

        Ok(self.list()?.into_iter().find(|account| matches(account)))
    }

    fn lock_writes(&self) -> AccountResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| AccountError::StorePoisoned)
    }

    /// Accounts other than `account` that share its username or email.
    fn holders_of(&self, account: &Account) -> AccountResult<Vec<Account>> {
        let by_username = self.find_by_username(account.username.as_str())?;
        let by_email = self.find_by_email(&account.email)?;
        Ok(by_username.into_iter().chain(by_email).collect())
    }
}

impl AccountStore for FileAccountStore {
    fn insert(&self, account: &Account) -> AccountResult<()> {
        let _guard = self.lock_writes()?;
        if self.account_path(&account.id).is_file() {
            return Err(AccountError::AlreadyExists(format!(
                "account {}",
                account.id
            )));
        }
        ensure_unique(&self.holders_of(account)?, account)?;

        self.write_account(account)?;
        self.update_index(|index| index.record(account))
    }

    fn get(&self, id: &AccountId) -> AccountResult<Option<Account>> {
        let path = self.account_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_account(&path).map(Some)
    }

    fn save(&self, account: &Account) -> AccountResult<()> {
        let _guard = self.lock_writes()?;
        if !self.account_path(&account.id).is_file() {
            return Err(AccountError::NotFound);
        }
        ensure_unique(&self.holders_of(account)?, account)?;

        self.write_account(account)?;
        self.update_index(|index| index.record(account))
    }

    fn delete(&self, id: &AccountId) -> AccountResult<()> {
        let _guard = self.lock_writes()?;
        let dir = id.sharded_dir(&self.accounts_dir);
        if !dir.join(ACCOUNT_FILENAME).is_file() {
            return Err(AccountError::NotFound);
        }
        fs::remove_dir_all(&dir).map_err(AccountError::FileDelete)?;
        self.update_index(|index| index.forget(id))
    }

    fn list(&self) -> AccountResult<Vec<Account>> {
        let mut accounts = Vec::new();

        if let Ok(s1_iter) = fs::read_dir(&self.accounts_dir) {
            for s1 in s1_iter.flatten() {
                let s1_path = s1.path();
                if !s1_path.is_dir() {
                    continue;
                }

                let s2_iter = match fs::read_dir(&s1_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };

                for s2 in s2_iter.flatten() {
                    let s2_path = s2.path();
                    if !s2_path.is_dir() {
                        continue;
                    }

                    let id_iter = match fs::read_dir(&s2_path) {
                        Ok(it) => it,
                        Err(_) => continue,
                    };

                    for id_ent in id_iter.flatten() {
                        let account_path = id_ent.path().join(ACCOUNT_FILENAME);
                        if !account_path.is_file() {
                            continue;
                        }

                        match Self::read_account(&account_path) {
                            Ok(account) => accounts.push(account),
                            Err(e) => {
                                tracing::warn!(
                                    path = %account_path.display(),
                                    "skipping unreadable account document: {e}"
                                );
                            }
                        }
                    }
                }
            }
        }

        accounts.sort_by_key(|account| account.created_at);
        let index = AccountIndex::from_accounts(&accounts);
        *self
            .index
            .write()
            .map_err(|_| AccountError::StorePoisoned)? = Some(index);
        Ok(accounts)
    }

    fn find_by_username(&self, username: &str) -> AccountResult<Option<Account>> {
        self.lookup(
            |index| index.by_username.get(username).cloned(),
            |account| account.username.as_str() == username,
        )
    }

    fn find_by_email(&self, email: &EmailAddress) -> AccountResult<Option<Account>> {
        self.lookup(
            |index| index.by_email.get(email).cloned(),
            |account| &account.email == email,
        )
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest stored account matching `predicate`.
    fn find(&self, predicate: impl Fn(&Account) -> bool) -> AccountResult<Option<Account>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AccountError::StorePoisoned)?;
        Ok(accounts
            .values()
            .filter(|account| predicate(account))
            .min_by_key(|account| account.created_at)
            .cloned())
    }
}

impl AccountStore for InMemoryAccountStore {
    fn insert(&self, account: &Account) -> AccountResult<()> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AccountError::StorePoisoned)?;
        if accounts.contains_key(&account.id) {
            return Err(AccountError::AlreadyExists(format!(
                "account {}",
                account.id
            )));
        }
        ensure_unique(accounts.values(), account)?;
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    fn get(&self, id: &AccountId) -> AccountResult<Option<Account>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AccountError::StorePoisoned)?;
        Ok(accounts.get(id).cloned())
    }

    fn save(&self, account: &Account) -> AccountResult<()> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AccountError::StorePoisoned)?;
        if !accounts.contains_key(&account.id) {
            return Err(AccountError::NotFound);
        }
        ensure_unique(accounts.values(), account)?;
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    fn delete(&self, id: &AccountId) -> AccountResult<()> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AccountError::StorePoisoned)?;
        accounts
            .remove(id)
            .map(|_| ())
            .ok_or(AccountError::NotFound)
    }

    fn list(&self) -> AccountResult<Vec<Account>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AccountError::StorePoisoned)?;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by_key(|account| account.created_at);
        Ok(all)
    }

    fn find_by_username(&self, username: &str) -> AccountResult<Option<Account>> {
        self.find(|account| account.username.as_str() == username)
    }

    fn find_by_email(&self, email: &EmailAddress) -> AccountResult<Option<Account>> {
        self.find(|account| &account.email == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Role;
    use crate::password::PasswordHash;
    use chrono::Duration;
    use telehealth_types::NonEmptyText;
    use tempfile::TempDir;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn account(username: &str) -> Account {
        account_with_email(username, &format!("{username}@example.com"))
    }

    fn account_with_email(username: &str, email: &str) -> Account {
        Account::new(
            NonEmptyText::new(username).unwrap(),
            NonEmptyText::new("Test User").unwrap(),
            EmailAddress::parse(email).unwrap(),
            Role::Patient,
            PasswordHash::generate("secret1", 1).unwrap(),
        )
    }

    /// Inserts `threads` accounts named "jdoe" at once; returns how many inserts succeeded.
    fn race_same_username(store: &dyn AccountStore, threads: usize) -> usize {
        let candidates: Vec<Account> = (0..threads)
            .map(|i| account_with_email("jdoe", &format!("jdoe{i}@example.com")))
            .collect();
        let barrier = std::sync::Barrier::new(threads);

        std::thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .iter()
                .map(|candidate| {
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        store.insert(candidate)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("insert thread panicked"))
                .filter(|result| {
                    if let Err(e) = result {
                        assert!(matches!(e, AccountError::AlreadyExists(_)), "{e:?}");
                    }
                    result.is_ok()
                })
                .count()
        })
    }

    fn file_store(temp_dir: &TempDir) -> FileAccountStore {
        let cfg = CoreConfig::new(
            temp_dir.path().to_path_buf(),
            SECRET,
            Duration::hours(1),
            1,
        )
        .expect("config should be valid");
        FileAccountStore::new(&cfg)
    }

    fn exercise_store(store: &dyn AccountStore) {
        let alice = account("alice");
        let bob = account("bob");
        store.insert(&alice).expect("insert alice");
        store.insert(&bob).expect("insert bob");

        assert!(matches!(
            store.insert(&alice),
            Err(AccountError::AlreadyExists(_))
        ));

        let fetched = store.get(&alice.id).unwrap().expect("alice stored");
        assert_eq!(fetched.view(), alice.view());

        let by_name = store.find_by_username("bob").unwrap().expect("bob by name");
        assert_eq!(by_name.id, bob.id);
        let by_email = store
            .find_by_email(&EmailAddress::parse("ALICE@example.com").unwrap())
            .unwrap()
            .expect("alice by email");
        assert_eq!(by_email.id, alice.id);
        assert!(store.find_by_username("carol").unwrap().is_none());

        let same_name = account_with_email("bob", "bobby@example.com");
        assert!(matches!(
            store.insert(&same_name),
            Err(AccountError::AlreadyExists(_))
        ));
        let same_email = account_with_email("robert", "BOB@example.com");
        assert!(matches!(
            store.insert(&same_email),
            Err(AccountError::AlreadyExists(_))
        ));

        let mut taking_email = bob.clone();
        taking_email.email = alice.email.clone();
        assert!(matches!(
            store.save(&taking_email),
            Err(AccountError::AlreadyExists(_))
        ));
        assert_eq!(store.get(&bob.id).unwrap().unwrap().email, bob.email);

        let mut renamed = alice.clone();
        renamed.name = NonEmptyText::new("Alice Liddell").unwrap();
        store.save(&renamed).expect("save alice");
        assert_eq!(
            store.get(&alice.id).unwrap().unwrap().name.as_str(),
            "Alice Liddell"
        );

        assert_eq!(store.list().unwrap().len(), 2);

        store.delete(&alice.id).expect("delete alice");
        assert!(store.get(&alice.id).unwrap().is_none());
        assert!(matches!(
            store.delete(&alice.id),
            Err(AccountError::NotFound)
        ));
        assert!(matches!(store.save(&renamed), Err(AccountError::NotFound)));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_in_memory_store_contract() {
        exercise_store(&InMemoryAccountStore::new());
    }

    #[test]
    fn test_file_store_contract() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        exercise_store(&file_store(&temp_dir));
    }

    #[test]
    fn test_file_store_uses_sharded_layout() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = file_store(&temp_dir);
        let account = account("alice");
        store.insert(&account).unwrap();

        let id = account.id.to_string();
        let expected = temp_dir
            .path()
            .join("accounts")
            .join(&id[0..2])
            .join(&id[2..4])
            .join(&id)
            .join("account.json");
        assert!(expected.is_file(), "missing {}", expected.display());
        let entries: Vec<_> = fs::read_dir(expected.parent().unwrap())
            .unwrap()
            .flatten()
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("account.json")]);

        let raw = fs::read_to_string(&expected).unwrap();
        assert!(raw.contains("\"passwordHash\""));
        assert!(raw.contains("\"privacySettings\""));
    }

    #[test]
    fn test_file_store_list_skips_corrupt_documents() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = file_store(&temp_dir);
        store.insert(&account("alice")).unwrap();

        let broken = AccountId::new();
        let dir = broken.sharded_dir(store.accounts_dir());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(ACCOUNT_FILENAME), "{not json").unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
        assert!(matches!(
            store.get(&broken),
            Err(AccountError::Deserialization(_))
        ));
    }

    #[test]
    fn test_file_store_list_on_missing_dir_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        assert!(file_store(&temp_dir).list().unwrap().is_empty());
    }

    #[test]
    fn test_open_uses_same_layout_as_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = file_store(&temp_dir);
        let account = account("alice");
        store.insert(&account).unwrap();

        let reopened = FileAccountStore::open(temp_dir.path());
        assert_eq!(reopened.accounts_dir(), store.accounts_dir());
        assert_eq!(reopened.list().unwrap().len(), 1);
    }

    #[test]
    fn test_in_memory_concurrent_inserts_keep_username_unique() {
        let store = InMemoryAccountStore::new();
        assert_eq!(race_same_username(&store, 8), 1);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_file_concurrent_inserts_keep_username_unique() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = file_store(&temp_dir);
        assert_eq!(race_same_username(&store, 8), 1);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_file_concurrent_saves_leave_a_readable_document() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = file_store(&temp_dir);
        let original = account("alice");
        store.insert(&original).unwrap();

        let addresses: Vec<String> = (0..16).map(|i| "x".repeat(1 + i * 37)).collect();
        std::thread::scope(|scope| {
            for address in &addresses {
                let store = &store;
                let original = &original;
                scope.spawn(move || {
                    for _ in 0..10 {
                        let mut updated = original.clone();
                        updated.address = Some(address.clone());
                        store.save(&updated).expect("concurrent save should succeed");
                    }
                });
            }
        });

        let stored = store.get(&original.id).unwrap().expect("alice stored");
        let address = stored.address.expect("address written");
        assert!(addresses.contains(&address));

        let dir = original.id.sharded_dir(store.accounts_dir());
        assert_eq!(fs::read_dir(dir).unwrap().count(), 1);
    }

    #[test]
    fn test_file_lookups_see_writes_from_another_instance() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let server = file_store(&temp_dir);
        let operator = file_store(&temp_dir);

        let alice = account("alice");
        server.insert(&alice).unwrap();
        assert!(server.find_by_username("alice").unwrap().is_some());

        let carol = account("carol");
        operator.insert(&carol).unwrap();
        let found = server.find_by_username("carol").unwrap().expect("carol found");
        assert_eq!(found.id, carol.id);

        assert!(matches!(
            server.insert(&account_with_email("carol", "other@example.com")),
            Err(AccountError::AlreadyExists(_))
        ));

        operator.delete(&alice.id).unwrap();
        assert!(server.find_by_username("alice").unwrap().is_none());
    }
}
