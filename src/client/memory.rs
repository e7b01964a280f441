//! In-memory FTP server for tests. Outside this crate's own unit tests it
//! is only built with the `test-util` feature.
//!
//! A [`MemoryServer`] holds the directory tree and is cheap to clone; every
//! clone and every [`MemorySession`] opened from it see the same files.
//! Commands can be made to fail with a transport error to simulate a dropped
//! connection.

use super::{not_connected, FtpSession, RemoteEntry, Timeouts};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Login,
    Store,
    Retrieve,
    Rename,
    Delete,
    List,
    NameList,
    MakeDirectory,
    RemoveDirectory,
    ChangeDirectory,
}

#[derive(Debug, Default)]
struct State {
    username: String,
    password: String,
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    read_only: bool,
    failures: HashMap<Command, u32>,
    connects: u32,
}

impl State {
    fn take_failure(&mut self, command: Command) -> io::Result<()> {
        match self.failures.get_mut(&command) {
            Some(n) if *n > 0 => {
                *n -= 1;
                Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    format!("simulated connection loss during {:?}", command),
                ))
            }
            _ => Ok(()),
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains(path)
    }

    fn children(&self, dir: &str) -> Vec<RemoteEntry> {
        let dirs = self
            .dirs
            .iter()
            .filter(|d| d.as_str() != dir && parent(d) == dir)
            .map(|d| RemoteEntry::directory(base_name(d)));
        let files = self
            .files
            .iter()
            .filter(|(f, _)| parent(f) == dir)
            .map(|(f, data)| RemoteEntry::file(base_name(f), data.len() as u64));
        dirs.chain(files).collect()
    }
}

/// Shared in-memory file tree with a single user account.
#[derive(Debug, Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<State>>,
}

impl MemoryServer {
    pub fn new(username: &str, password: &str) -> Self {
        let mut state = State {
            username: username.to_string(),
            password: password.to_string(),
            ..State::default()
        };
        state.dirs.insert("/".to_string());

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> MemorySession {
        MemorySession {
            server: self.clone(),
            connected: false,
        }
    }

    /// Makes the next `times` executions of `command` fail with a transport error.
    pub fn fail_next(&self, command: Command, times: u32) {
        self.state().failures.insert(command, times);
    }

    /// Refuses every command that would modify the tree.
    pub fn set_read_only(&self, read_only: bool) {
        self.state().read_only = read_only;
    }

    /// Number of successful transport connects so far.
    pub fn connect_count(&self) -> u32 {
        self.state().connects
    }

    /// Creates `path` and all missing parents.
    pub fn create_dir_all(&self, path: &str) {
        let mut state = self.state();
        let mut current = normalize(path);
        while current != "/" {
            state.dirs.insert(current.clone());
            current = parent(&current).to_string();
        }
    }

    /// Writes a file, creating parent folders.
    pub fn put_file(&self, path: &str, data: &[u8]) {
        let path = normalize(path);
        self.create_dir_all(parent(&path));
        self.state().files.insert(path, data.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(&normalize(path)).cloned()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.state().is_dir(&normalize(path))
    }

    /// All file paths, sorted.
    pub fn file_paths(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }
}

/// One client connection to a [`MemoryServer`].
#[derive(Debug)]
pub struct MemorySession {
    server: MemoryServer,
    connected: bool,
}

impl MemorySession {
    /// Locks the server state, failing if closed or if a failure is queued.
    fn open(&self, command: Command) -> io::Result<MutexGuard<'_, State>> {
        if !self.connected {
            return Err(not_connected());
        }
        let mut state = self.server.state();
        state.take_failure(command)?;
        Ok(state)
    }
}

impl FtpSession for MemorySession {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self, _host: &str, _port: u16, _timeouts: &Timeouts) -> io::Result<()> {
        let mut state = self.server.state();
        state.take_failure(Command::Connect)?;
        state.connects += 1;
        self.connected = true;
        Ok(())
    }

    fn login(&mut self, username: &str, password: &str) -> io::Result<bool> {
        let state = self.open(Command::Login)?;
        Ok(state.username == username && state.password == password)
    }

    fn enter_passive_mode(&mut self) -> io::Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(not_connected())
        }
    }

    fn set_binary_mode(&mut self) -> io::Result<bool> {
        Ok(self.connected)
    }

    fn store(&mut self, path: &str, local: &Path) -> io::Result<bool> {
        let mut state = self.open(Command::Store)?;
        let path = normalize(path);
        if state.read_only || !state.is_dir(parent(&path)) || state.is_dir(&path) {
            return Ok(false);
        }
        let data = fs::read(local)?;
        state.files.insert(path, data);
        Ok(true)
    }

    fn retrieve(&mut self, path: &str, local: &Path) -> io::Result<bool> {
        let state = self.open(Command::Retrieve)?;
        match state.files.get(&normalize(path)) {
            Some(data) => {
                fs::write(local, data)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<bool> {
        let mut state = self.open(Command::Rename)?;
        let (from, to) = (normalize(from), normalize(to));
        if state.read_only || !state.is_dir(parent(&to)) || state.is_dir(&to) {
            return Ok(false);
        }
        match state.files.remove(&from) {
            Some(data) => {
                state.files.insert(to, data);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&mut self, path: &str) -> io::Result<bool> {
        let mut state = self.open(Command::Delete)?;
        if state.read_only {
            return Ok(false);
        }
        Ok(state.files.remove(&normalize(path)).is_some())
    }

    fn list(&mut self, path: &str) -> io::Result<Option<Vec<RemoteEntry>>> {
        let state = self.open(Command::List)?;
        let path = normalize(path);
        if state.is_dir(&path) {
            return Ok(Some(state.children(&path)));
        }
        Ok(state
            .files
            .get(&path)
            .map(|data| vec![RemoteEntry::file(base_name(&path), data.len() as u64)]))
    }

    fn name_list(&mut self, path: &str) -> io::Result<Option<Vec<String>>> {
        let state = self.open(Command::NameList)?;
        let path = normalize(path);
        if state.files.contains_key(&path) {
            return Ok(Some(vec![path]));
        }
        if state.is_dir(&path) {
            return Ok(Some(
                state.children(&path).into_iter().map(|e| e.name).collect(),
            ));
        }
        // An empty listing for a missing entry; refused only without a parent.
        if state.is_dir(parent(&path)) {
            return Ok(Some(Vec::new()));
        }
        Ok(None)
    }

    fn make_directory(&mut self, path: &str) -> io::Result<bool> {
        let mut state = self.open(Command::MakeDirectory)?;
        let path = normalize(path);
        if state.read_only
            || !state.is_dir(parent(&path))
            || state.is_dir(&path)
            || state.files.contains_key(&path)
        {
            return Ok(false);
        }
        state.dirs.insert(path);
        Ok(true)
    }

    fn remove_directory(&mut self, path: &str) -> io::Result<bool> {
        let mut state = self.open(Command::RemoveDirectory)?;
        let path = normalize(path);
        if state.read_only || path == "/" || !state.is_dir(&path) || !state.children(&path).is_empty() {
            return Ok(false);
        }
        state.dirs.remove(&path);
        Ok(true)
    }

    fn change_directory(&mut self, path: &str) -> io::Result<bool> {
        let state = self.open(Command::ChangeDirectory)?;
        Ok(state.is_dir(&normalize(path)))
    }

    fn disconnect(&mut self) -> io::Result<()> {
        self.connected = false;
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
