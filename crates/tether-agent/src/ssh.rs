use std::{
    io::{ErrorKind, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use regex::Regex;
use ssh2::{Channel, Session};
use tether_control::{Error, Result, ShellChannel};

use crate::config::SshSettings;

const DRAIN_TIMEOUT: Duration = Duration::from_millis(300);
const READ_CHUNK: usize = 4096;

/// A [`ShellChannel`] over one authenticated SSH session.
///
/// One-shot commands get their own exec channel; the interactive shell used
/// for `sudo` dialogues is opened on first use and kept for the session.
pub(crate) struct SshChannel {
    session: Session,
    shell: Option<Channel>,
    timeout: Duration,
}

fn map_ssh_error(err: ssh2::Error) -> Error {
    let io_err: std::io::Error = err.into();
    match io_err.kind() {
        ErrorKind::TimedOut => Error::Channel("SSH operation timed out".to_string()),
        _ => Error::Channel(format!("SSH error: {io_err}")),
    }
}

fn is_drained(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

impl SshChannel {
    pub(crate) fn connect(settings: &SshSettings) -> Result<Self> {
        let addr = (settings.host.as_str(), settings.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Channel(format!("cannot resolve {}", settings.host)))?;
        let tcp = TcpStream::connect_timeout(&addr, settings.timeout)?;
        tcp.set_read_timeout(Some(settings.timeout)).ok();
        tcp.set_write_timeout(Some(settings.timeout)).ok();

        let mut session = Session::new().map_err(map_ssh_error)?;
        session.set_tcp_stream(tcp);
        session.set_timeout(timeout_ms(settings.timeout));
        session.handshake().map_err(map_ssh_error)?;

        if let Some(key) = settings.key_path.as_deref() {
            session
                .userauth_pubkey_file(&settings.user, None, key, settings.password.as_deref())
                .map_err(map_ssh_error)?;
        } else if let Some(password) = settings.password.as_deref() {
            session
                .userauth_password(&settings.user, password)
                .map_err(map_ssh_error)?;
        } else {
            session.userauth_agent(&settings.user).map_err(map_ssh_error)?;
        }

        if !session.authenticated() {
            return Err(Error::Channel("SSH authentication failed".to_string()));
        }
        tracing::debug!(host = %settings.host, port = settings.port, user = %settings.user, "ssh session ready");

        Ok(Self {
            session,
            shell: None,
            timeout: settings.timeout,
        })
    }

    fn shell(&mut self) -> Result<&mut Channel> {
        if self.shell.is_none() {
            let mut channel = self.session.channel_session().map_err(map_ssh_error)?;
            channel
                .request_pty("xterm", None, None)
                .map_err(map_ssh_error)?;
            channel.shell().map_err(map_ssh_error)?;
            self.shell = Some(channel);
        }
        self.shell
            .as_mut()
            .ok_or_else(|| Error::Channel("interactive shell unavailable".to_string()))
    }
}

/// Remote output as text. Bytes that are not UTF-8 (e.g. Latin-1 argv in
/// `ps` listings) become U+FFFD instead of failing the whole read.
fn decode_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn timeout_ms(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

impl ShellChannel for SshChannel {
    fn is_connected(&self) -> bool {
        self.session.authenticated()
    }

    fn exec(&mut self, command: &str) -> Result<Option<String>> {
        let mut channel = self.session.channel_session().map_err(map_ssh_error)?;
        if let Err(err) = channel.exec(command) {
            tracing::debug!(error = %err, "exec request refused");
            return Ok(None);
        }

        let mut out = Vec::new();
        channel.read_to_end(&mut out)?;
        channel.wait_close().map_err(map_ssh_error)?;
        Ok(Some(decode_output(&out)))
    }

    fn write(&mut self, data: &str) -> Result<()> {
        let shell = self.shell()?;
        shell.write_all(data.as_bytes())?;
        shell.flush()?;
        Ok(())
    }

    fn read_until(&mut self, pattern: &Regex) -> Result<String> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        let shell = self.shell()?;

        loop {
            let n = match shell.read(&mut chunk) {
                Ok(0) => return Err(Error::NoAnswer),
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::TimedOut => return Err(Error::NoAnswer),
                Err(err) => return Err(err.into()),
            };
            buf.extend_from_slice(&chunk[..n]);

            let text = decode_output(&buf);
            if pattern.is_match(&text) {
                return Ok(text);
            }
        }
    }

    fn read(&mut self) -> Result<String> {
        let timeout = self.timeout;
        self.shell()?;
        self.session.set_timeout(timeout_ms(DRAIN_TIMEOUT));

        let mut buf = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        let result = loop {
            let Some(shell) = self.shell.as_mut() else {
                break Ok(());
            };
            match shell.read(&mut chunk) {
                Ok(0) => break Ok(()),
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(err) if is_drained(&err) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        self.session.set_timeout(timeout_ms(timeout));
        result?;
        Ok(decode_output(&buf))
    }
}

impl Drop for SshChannel {
    fn drop(&mut self) {
        if let Some(mut shell) = self.shell.take() {
            let _ = shell.send_eof();
            let _ = shell.close();
        }
        let _ = self.session.disconnect(None, "tether-agent done", None);
    }
}
