//! FTP-backed transfer session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use suppaftp::types::{FileType, FormatControl};
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, info, warn};

use crate::domain::entities::{Secret, TransferMode};
use crate::domain::errors::TransferError;
use crate::domain::ports::TransferSession;

/// Where and as whom to log in.
#[derive(Debug, Clone)]
pub struct FtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret,
    /// Socket read/write timeout. `None` blocks indefinitely.
    pub timeout: Option<Duration>,
}

impl FtpSettings {
    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// State of the control connection.
enum Control {
    Open(FtpStream),
    /// Dropped or never re-established; the next command dials again.
    Lost,
    /// Ended with `quit`.
    Closed,
}

/// One logged-in control connection, driven on the blocking pool.
pub struct FtpTransferSession {
    settings: Arc<FtpSettings>,
    control: Arc<Mutex<Control>>,
}

impl FtpTransferSession {
    /// Connects and logs in.
    ///
    /// # Errors
    /// Returns `TransferError::Connect` or `TransferError::Login`.
    pub async fn connect(settings: FtpSettings) -> Result<Self, TransferError> {
        let settings = Arc::new(settings);
        let job = Arc::clone(&settings);
        let stream = tokio::task::spawn_blocking(move || open(&job))
            .await
            .map_err(|e| TransferError::Io(std::io::Error::other(e)))??;

        info!(host = %settings.host, port = settings.port, user = %settings.user, "FTP session established");
        Ok(Self {
            settings,
            control: Arc::new(Mutex::new(Control::Open(stream))),
        })
    }

    async fn with_stream<T, F>(&self, op: F) -> Result<T, TransferError>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpStream) -> Result<T, TransferError> + Send + 'static,
    {
        let control = Arc::clone(&self.control);
        let settings = Arc::clone(&self.settings);
        tokio::task::spawn_blocking(move || {
            let mut guard = control.lock();
            if matches!(*guard, Control::Lost) {
                warn!(host = %settings.host, "FTP connection lost, dialing again");
                *guard = Control::Open(open(&settings)?);
            }
            match &mut *guard {
                Control::Open(ftp) => op(ftp),
                Control::Lost | Control::Closed => Err(TransferError::NotConnected),
            }
        })
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e)))?
    }
}

fn open(settings: &FtpSettings) -> Result<FtpStream, TransferError> {
    let mut ftp = FtpStream::connect(settings.address()).map_err(|e| TransferError::Connect {
        host: settings.address(),
        message: e.to_string(),
    })?;

    if let Some(timeout) = settings.timeout {
        let socket = ftp.get_ref();
        socket.set_read_timeout(Some(timeout))?;
        socket.set_write_timeout(Some(timeout))?;
    }

    ftp.login(settings.user.as_str(), settings.password.expose())
        .map_err(|e| TransferError::Login {
            user: settings.user.clone(),
            message: e.to_string(),
        })?;
    Ok(ftp)
}

fn failed(command: impl Into<String>) -> impl FnOnce(FtpError) -> TransferError {
    let command = command.into();
    move |e| match e {
        FtpError::ConnectionError(io) => TransferError::Io(io),
        other => TransferError::command(command, other.to_string()),
    }
}

#[async_trait]
impl TransferSession for FtpTransferSession {
    async fn set_mode(&mut self, mode: TransferMode) -> Result<(), TransferError> {
        let file_type = match mode {
            TransferMode::Ascii => FileType::Ascii(FormatControl::Default),
            TransferMode::Binary => FileType::Binary,
        };
        self.with_stream(move |ftp| {
            ftp.transfer_type(file_type)
                .map_err(failed(format!("TYPE {mode}")))
        })
        .await?;
        debug!(mode = %mode, "Transfer mode set");
        Ok(())
    }

    async fn cwd(&mut self, path: &str) -> Result<(), TransferError> {
        let path = path.to_string();
        self.with_stream(move |ftp| ftp.cwd(&path).map_err(failed(format!("CWD {path}"))))
            .await
    }

    async fn cdup(&mut self) -> Result<(), TransferError> {
        self.with_stream(|ftp| ftp.cdup().map_err(failed("CDUP"))).await
    }

    async fn pwd(&mut self) -> Result<String, TransferError> {
        self.with_stream(|ftp| ftp.pwd().map_err(failed("PWD"))).await
    }

    async fn list(&mut self) -> Result<Vec<String>, TransferError> {
        self.with_stream(|ftp| ftp.list(None).map_err(failed("LIST")))
            .await
    }

    async fn put(&mut self, local: &Path, remote_name: &str) -> Result<u64, TransferError> {
        let local = PathBuf::from(local);
        let name = remote_name.to_string();
        let bytes = self
            .with_stream(move |ftp| {
                let mut file = std::fs::File::open(&local)?;
                ftp.put_file(&name, &mut file)
                    .map_err(failed(format!("STOR {name}")))
            })
            .await?;
        debug!(remote_name, bytes, "Stored file");
        Ok(bytes)
    }

    async fn reset(&mut self) -> Result<(), TransferError> {
        warn!(host = %self.settings.host, "Re-establishing FTP session");
        let settings = Arc::clone(&self.settings);
        let control = Arc::clone(&self.control);
        tokio::task::spawn_blocking(move || {
            let mut guard = control.lock();
            if let Control::Open(mut old) = std::mem::replace(&mut *guard, Control::Lost) {
                let _ = old.quit();
            }
            *guard = Control::Open(open(&settings)?);
            Ok(())
        })
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e)))?
    }

    async fn quit(&mut self) -> Result<(), TransferError> {
        let control = Arc::clone(&self.control);
        let result = tokio::task::spawn_blocking(move || {
            match std::mem::replace(&mut *control.lock(), Control::Closed) {
                Control::Open(mut ftp) => ftp.quit().map_err(failed("QUIT")),
                Control::Lost | Control::Closed => Ok(()),
            }
        })
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e)))?;
        info!("FTP session closed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};

    #[derive(Default)]
    struct FakeState {
        dirs: HashSet<String>,
        files: BTreeMap<String, Vec<u8>>,
        commands: Vec<String>,
        logins: usize,
        reject_logins: bool,
    }

    /// Minimal passive-mode FTP server on a background thread.
    fn fake_server(dirs: &[&str]) -> (u16, Arc<Mutex<FakeState>>) {
        let mut state = FakeState::default();
        for dir in dirs {
            let mut path = String::new();
            for segment in dir.split('/') {
                path = format!("{path}/{segment}");
                state.dirs.insert(path.clone());
            }
        }
        let state = Arc::new(Mutex::new(state));
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let shared = Arc::clone(&state);
        std::thread::spawn(move || {
            for control in listener.incoming() {
                let Ok(control) = control else { return };
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || serve_control(control, &shared));
            }
        });
        (port, state)
    }

    fn serve_control(control: TcpStream, state: &Mutex<FakeState>) {
        let mut out = control.try_clone().unwrap();
        let mut reply = |line: &str| {
            let _ = out.write_all(format!("{line}\r\n").as_bytes());
        };
        reply("220 fake ready");

        let mut cwd: Vec<String> = Vec::new();
        let mut data: Option<TcpListener> = None;
        let mut lines = BufReader::new(control).lines();

        while let Some(Ok(line)) = lines.next() {
            let (verb, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            state.lock().commands.push(line.clone());
            let here = format!("/{}", cwd.join("/"));

            match verb {
                "USER" => reply("331 password please"),
                "PASS" if arg == "hunter2" && !state.lock().reject_logins => {
                    state.lock().logins += 1;
                    reply("230 logged in");
                }
                "PASS" => reply("530 login incorrect"),
                "TYPE" => reply("200 type set"),
                "PWD" => reply(&format!("257 \"{here}\" is current directory")),
                "CWD" => {
                    let mut next = if arg.starts_with('/') { Vec::new() } else { cwd.clone() };
                    next.extend(arg.split('/').filter(|s| !s.is_empty()).map(String::from));
                    let target = format!("/{}", next.join("/"));
                    if target == "/" || state.lock().dirs.contains(&target) {
                        cwd = next;
                        reply("250 directory changed");
                    } else {
                        reply("550 no such directory");
                    }
                }
                "CDUP" => {
                    cwd.pop();
                    reply("250 directory changed");
                }
                "PASV" => {
                    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
                    let port = listener.local_addr().unwrap().port();
                    data = Some(listener);
                    reply(&format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{})",
                        port / 256,
                        port % 256
                    ));
                }
                "LIST" => {
                    reply("150 listing");
                    if let Some(listener) = data.take() {
                        let (mut conn, _) = listener.accept().unwrap();
                        let prefix = if here == "/" { "/".to_string() } else { format!("{here}/") };
                        let names: Vec<String> = state
                            .lock()
                            .files
                            .keys()
                            .filter_map(|k| k.strip_prefix(&prefix).map(String::from))
                            .collect();
                        for name in names {
                            let _ = conn.write_all(
                                format!("-rw-r--r-- 1 ftp ftp 3 Jan 01 00:00 {name}\r\n").as_bytes(),
                            );
                        }
                    }
                    reply("226 done");
                }
                "STOR" => {
                    reply("150 ready");
                    if let Some(listener) = data.take() {
                        let (mut conn, _) = listener.accept().unwrap();
                        let mut body = Vec::new();
                        conn.read_to_end(&mut body).unwrap();
                        let key = if here == "/" { format!("/{arg}") } else { format!("{here}/{arg}") };
                        state.lock().files.insert(key, body);
                    }
                    reply("226 stored");
                }
                "QUIT" => {
                    reply("221 bye");
                    return;
                }
                _ => reply("502 not implemented"),
            }
        }
    }

    fn settings(port: u16, password: &str) -> FtpSettings {
        FtpSettings {
            host: "127.0.0.1".to_string(),
            port,
            user: "sinon".to_string(),
            password: Secret::new(password),
            timeout: Some(Duration::from_secs(5)),
        }
    }

    #[tokio::test]
    async fn test_navigation_and_upload() {
        let (port, state) = fake_server(&["subdomain-sinon/images/gallery"]);
        let mut session = FtpTransferSession::connect(settings(port, "hunter2")).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("cat.png");
        std::fs::write(&local, b"png").unwrap();

        assert_eq!(session.pwd().await.unwrap(), "/");
        session.set_mode(TransferMode::Binary).await.unwrap();
        session.cwd("subdomain-sinon/images/gallery").await.unwrap();
        assert_eq!(session.pwd().await.unwrap(), "/subdomain-sinon/images/gallery");

        assert_eq!(session.put(&local, "cat.png").await.unwrap(), 3);
        let listing = session.list().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing[0].contains("cat.png"));

        session.cdup().await.unwrap();
        assert_eq!(session.pwd().await.unwrap(), "/subdomain-sinon/images");
        session.quit().await.unwrap();

        let state = state.lock();
        assert_eq!(
            state.files.get("/subdomain-sinon/images/gallery/cat.png").map(Vec::as_slice),
            Some(&b"png"[..])
        );
        assert!(state.commands.contains(&"TYPE I".to_string()));
        assert_eq!(state.commands.last().map(String::as_str), Some("QUIT"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_command_error() {
        let (port, _state) = fake_server(&[]);
        let mut session = FtpTransferSession::connect(settings(port, "hunter2")).await.unwrap();

        let err = session.cwd("nowhere").await.unwrap_err();

        assert!(matches!(err, TransferError::Command { .. }));
        assert!(!err.needs_reset());
        assert!(err.to_string().contains("CWD nowhere"));
    }

    #[tokio::test]
    async fn test_bad_password_is_login_error() {
        let (port, _state) = fake_server(&[]);
        let err = FtpTransferSession::connect(settings(port, "wrong"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TransferError::Login { .. }));
    }

    #[tokio::test]
    async fn test_reset_lands_at_root_with_fresh_login() {
        let (port, state) = fake_server(&["subdomain-sinon"]);
        let mut session = FtpTransferSession::connect(settings(port, "hunter2")).await.unwrap();
        session.cwd("subdomain-sinon").await.unwrap();

        session.reset().await.unwrap();

        assert_eq!(session.pwd().await.unwrap(), "/");
        assert_eq!(state.lock().logins, 2);
    }

    #[tokio::test]
    async fn test_failed_reset_redials_on_next_command() {
        let (port, state) = fake_server(&["subdomain-sinon"]);
        let mut session = FtpTransferSession::connect(settings(port, "hunter2")).await.unwrap();

        state.lock().reject_logins = true;
        let err = session.reset().await.unwrap_err();
        assert!(matches!(err, TransferError::Login { .. }));

        state.lock().reject_logins = false;
        assert_eq!(session.pwd().await.unwrap(), "/");
        session.cwd("subdomain-sinon").await.unwrap();
        assert_eq!(state.lock().logins, 2);
    }

    #[tokio::test]
    async fn test_commands_after_quit_are_refused() {
        let (port, _state) = fake_server(&[]);
        let mut session = FtpTransferSession::connect(settings(port, "hunter2")).await.unwrap();
        session.quit().await.unwrap();

        assert!(matches!(session.pwd().await, Err(TransferError::NotConnected)));
        assert!(session.quit().await.is_ok());
    }
}
