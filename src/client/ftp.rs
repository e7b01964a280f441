use super::{not_connected, EntryKind, FtpSession, RemoteEntry, Timeouts};
use std::fs::File;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use suppaftp::list::File as ListedFile;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpResult, FtpStream, Mode};
use tracing::{debug, warn};

/// [`FtpSession`] speaking FTP over a `suppaftp` control connection.
///
/// The connect and default timeouts bound the control socket; the data
/// timeout bounds every passive data socket.
pub struct SuppaFtpSession {
    stream: Option<FtpStream>,
}

impl Default for SuppaFtpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SuppaFtpSession {
    pub fn new() -> Self {
        Self { stream: None }
    }

    fn stream(&mut self) -> io::Result<&mut FtpStream> {
        self.stream.as_mut().ok_or_else(not_connected)
    }

    /// Parses one LIST line, POSIX or DOS style.
    fn parse_list_line(line: &str) -> Option<RemoteEntry> {
        if let Ok(file) = ListedFile::from_str(line) {
            let kind = if file.is_directory() {
                EntryKind::Directory
            } else if file.is_symlink() {
                EntryKind::Symlink
            } else {
                EntryKind::File
            };
            return Self::entry(file.name().to_string(), file.size() as u64, kind);
        }

        // Fallback for servers whose dates the list parser does not know.
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 9 {
            return None;
        }

        let kind = match parts[0].chars().next() {
            Some('d') => EntryKind::Directory,
            Some('l') => EntryKind::Symlink,
            Some('-') => EntryKind::File,
            _ => return None,
        };
        let size = parts[4].parse::<u64>().unwrap_or(0);
        let name = parts[8..].join(" ");

        Self::entry(name, size, kind)
    }

    fn entry(name: String, size: u64, kind: EntryKind) -> Option<RemoteEntry> {
        if name == "." || name == ".." {
            return None;
        }
        Some(RemoteEntry { name, size, kind })
    }
}

/// Whether a negative reply refuses the request on a healthy connection.
///
/// Permanent replies (5xx) and 450 (file unavailable) do. Every other code,
/// such as 421 (closing connection), 425/426 (data connection failed) or
/// 451 (local error), leaves the session unusable.
fn is_refusal(code: u32) -> bool {
    code == 450 || (500..600).contains(&code)
}

/// RETR only treats 550 as a missing file.
fn is_missing_file(code: u32) -> bool {
    code == 550
}

/// Splits a refusal (`Ok(None)`) from a transport failure.
fn answered<T>(command: &str, path: &str, result: FtpResult<T>) -> io::Result<Option<T>> {
    classified(command, path, result, is_refusal)
}

fn classified<T>(
    command: &str,
    path: &str,
    result: FtpResult<T>,
    refusal: fn(u32) -> bool,
) -> io::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(FtpError::UnexpectedResponse(response)) => {
            let code = response.status.code();
            let reply = String::from_utf8_lossy(&response.body).trim().to_string();
            if refusal(code) {
                debug!(command, path, code, reply = %reply, "FTP server refused command");
                Ok(None)
            } else {
                warn!(command, path, code, reply = %reply, "FTP server failed command");
                Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    format!("{} {}: server replied {}: {}", command, path, code, reply),
                ))
            }
        }
        Err(err) => Err(into_io(err)),
    }
}

fn into_io(err: FtpError) -> io::Error {
    match err {
        FtpError::ConnectionError(e) => e,
        other => io::Error::other(other),
    }
}

/// Opens a passive data connection bounded by `timeout`.
fn data_socket(addr: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    let socket = TcpStream::connect_timeout(&addr, timeout)?;
    socket.set_read_timeout(Some(timeout))?;
    socket.set_write_timeout(Some(timeout))?;
    Ok(socket)
}

impl FtpSession for SuppaFtpSession {
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self, host: &str, port: u16, timeouts: &Timeouts) -> io::Result<()> {
        if let Some(mut stale) = self.stream.take() {
            let _ = stale.quit();
        }

        let addr = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("cannot resolve {}:{}", host, port),
            )
        })?;

        let data_timeout = timeouts.data;
        let stream = FtpStream::connect_timeout(addr, timeouts.connect)
            .map_err(into_io)?
            .passive_stream_builder(move |addr| {
                data_socket(addr, data_timeout).map_err(FtpError::ConnectionError)
            });
        stream.get_ref().set_read_timeout(Some(timeouts.default))?;
        stream.get_ref().set_write_timeout(Some(timeouts.default))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn login(&mut self, username: &str, password: &str) -> io::Result<bool> {
        let result = self.stream()?.login(username, password);
        Ok(answered("USER/PASS", username, result)?.is_some())
    }

    fn enter_passive_mode(&mut self) -> io::Result<()> {
        self.stream()?.set_mode(Mode::Passive);
        Ok(())
    }

    fn set_binary_mode(&mut self) -> io::Result<bool> {
        let result = self.stream()?.transfer_type(FileType::Binary);
        Ok(answered("TYPE", "I", result)?.is_some())
    }

    fn store(&mut self, path: &str, local: &Path) -> io::Result<bool> {
        let stream = self.stream()?;
        let mut file = File::open(local)?;
        let result = stream.put_file(path, &mut file);
        Ok(answered("STOR", path, result)?.is_some())
    }

    fn retrieve(&mut self, path: &str, local: &Path) -> io::Result<bool> {
        let stream = self.stream()?;
        let mut file = File::create(local)?;
        let result = stream.retr(path, |reader| {
            io::copy(reader, &mut file).map_err(FtpError::ConnectionError)
        });
        Ok(classified("RETR", path, result, is_missing_file)?.is_some())
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<bool> {
        let result = self.stream()?.rename(from, to);
        Ok(answered("RNFR/RNTO", from, result)?.is_some())
    }

    fn delete(&mut self, path: &str) -> io::Result<bool> {
        let result = self.stream()?.rm(path);
        Ok(answered("DELE", path, result)?.is_some())
    }

    fn list(&mut self, path: &str) -> io::Result<Option<Vec<RemoteEntry>>> {
        let result = self.stream()?.list(Some(path));
        Ok(answered("LIST", path, result)?.map(|lines| {
            lines
                .iter()
                .filter_map(|line| Self::parse_list_line(line))
                .collect()
        }))
    }

    fn name_list(&mut self, path: &str) -> io::Result<Option<Vec<String>>> {
        let result = self.stream()?.nlst(Some(path));
        answered("NLST", path, result)
    }

    fn make_directory(&mut self, path: &str) -> io::Result<bool> {
        let result = self.stream()?.mkdir(path);
        Ok(answered("MKD", path, result)?.is_some())
    }

    fn remove_directory(&mut self, path: &str) -> io::Result<bool> {
        let result = self.stream()?.rmdir(path);
        Ok(answered("RMD", path, result)?.is_some())
    }

    fn change_directory(&mut self, path: &str) -> io::Result<bool> {
        let result = self.stream()?.cwd(path);
        Ok(answered("CWD", path, result)?.is_some())
    }

    fn disconnect(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(mut stream) => stream.quit().map_err(into_io),
            None => Ok(()),
        }
    }
}
