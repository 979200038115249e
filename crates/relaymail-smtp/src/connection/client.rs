//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream, TlsOptions};
use crate::command::{Command, encode_data};
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::sasl;
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Upper bound on lines in one reply, so a misbehaving peer cannot make us
/// buffer forever.
const MAX_REPLY_LINES: usize = 512;

/// Type-state marker: banner received, no greeting sent yet.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: EHLO/HELO accepted.
#[derive(Debug)]
pub struct Greeted;

/// Type-state marker: authenticated.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker: mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker: at least one recipient accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker: data mode.
#[derive(Debug)]
pub struct Data;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Greeted {}
    impl Sealed for super::Authenticated {}
}

/// States from which a mail transaction may be started.
pub trait Ready: sealed::Sealed {}
impl Ready for Greeted {}
impl Ready for Authenticated {}

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    client_hostname: String,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;

    /// Returns true once STARTTLS has completed.
    fn is_encrypted(&self) -> bool;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn is_encrypted(&self) -> bool {
        self.stream.is_encrypted()
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(greeting.into_error());
        }

        // Server hostname is the first word of the banner
        let hostname = greeting
            .first_line()
            .split_whitespace()
            .next()
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %hostname, "SMTP banner received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            client_hostname: String::new(),
            _state: PhantomData,
        })
    }

    /// Greets the server with EHLO, falling back to HELO if EHLO is refused.
    ///
    /// # Errors
    ///
    /// Returns an error if both greetings are rejected.
    pub async fn hello(mut self, client_hostname: &str) -> Result<Client<Greeted>> {
        self.client_hostname = client_hostname.to_string();

        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        if reply.is_success() {
            self.server_info.extensions = parse_extensions(&reply);
        } else {
            debug!(code = %reply.code, "EHLO refused, falling back to HELO");
            let reply = self
                .send_command(Command::Helo {
                    hostname: client_hostname.to_string(),
                })
                .await?;
            if !reply.is_success() {
                return Err(reply.into_error());
            }
            self.server_info.extensions.clear();
        }

        Ok(self.transition())
    }
}

impl Client<Greeted> {
    /// Upgrades the connection to TLS using STARTTLS and greets again.
    ///
    /// `server_name` is the name the certificate is checked against.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised, refused, or the
    /// handshake fails.
    pub async fn starttls(mut self, server_name: &str, options: TlsOptions) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.send_command(Command::StartTls).await?;
        if reply.code != ReplyCode::SERVICE_READY {
            return Err(reply.into_error());
        }

        self.stream = self.stream.upgrade_to_tls(server_name, options).await?;
        debug!(server = %server_name, "TLS established");

        // Capabilities must be discovered again over the secure channel
        let reply = self
            .send_command(Command::Ehlo {
                hostname: self.client_hostname.clone(),
            })
            .await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        self.server_info.extensions = parse_extensions(&reply);

        Ok(self)
    }

    /// Authenticates using the PLAIN mechanism with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    pub async fn auth_plain(
        mut self,
        identity: &str,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(sasl::plain_response(identity, username, password)),
        };

        let reply = self.send_command(cmd).await?;
        if reply.code != ReplyCode::AUTH_SUCCESS {
            return Err(reply.into_error());
        }

        Ok(self.transition())
    }

    /// Authenticates using the CRAM-MD5 challenge-response mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server sends no usable challenge or rejects
    /// the response.
    pub async fn auth_cram_md5(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::CramMd5,
            initial_response: None,
        };

        let challenge = self.send_command(cmd).await?;
        if challenge.code != ReplyCode::AUTH_CONTINUE {
            return Err(challenge.into_error());
        }

        let response = match sasl::cram_md5_response(username, password, challenge.first_line()) {
            Ok(response) => response,
            Err(err) => {
                // Abort the exchange so the server is not left waiting
                self.send_command(Command::AuthResponse("*".into())).await?;
                return Err(err);
            }
        };

        let reply = self.send_command(Command::AuthResponse(response)).await?;
        if reply.code != ReplyCode::AUTH_SUCCESS {
            return Err(reply.into_error());
        }

        Ok(self.transition())
    }
}

impl<S: Ready> Client<S> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(mut self, from: Address) -> Result<Client<MailTransaction>> {
        let reply = self.send_command(Command::MailFrom { from }).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }

        Ok(self.transition())
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        self.add_recipient(to).await?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.add_recipient(to).await?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command is not answered with 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(reply.into_error());
        }

        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Writes message content.
    ///
    /// Line endings are normalized to CRLF and leading dots are stuffed. May
    /// be called repeatedly; each chunk must end on a line boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the connection fails.
    pub async fn write_message(&mut self, message: &[u8]) -> Result<()> {
        let encoded = encode_data(message);
        trace!(bytes = encoded.len(), "writing message data");
        self.stream.write_all(&encoded).await
    }

    /// Sends the terminating `.` line and waits for the server to accept
    /// the message.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminator cannot be written or the server
    /// rejects the message.
    pub async fn finish(mut self) -> Result<Client<Greeted>> {
        self.stream.write_all(b".\r\n").await?;
        let reply = read_reply(&mut self.stream).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        debug!(reply = %reply.first_line(), "message accepted");

        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S> Client<S> {
    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        debug!(command = %cmd.redacted(), "C:");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        debug!(code = %reply.code, text = %reply.first_line(), "S:");
        Ok(reply)
    }

    async fn add_recipient(&mut self, to: Address) -> Result<()> {
        let reply = self.send_command(Command::RcptTo { to }).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(())
    }

    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            client_hostname: self.client_hostname,
            _state: PhantomData,
        }
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.into_error());
        }

        Ok(())
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    let mut read = 0;
    loop {
        if read >= MAX_REPLY_LINES {
            return Err(Error::Protocol("Reply exceeds line limit".into()));
        }
        let line = stream.read_line().await?;
        read += 1;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

fn parse_extensions(ehlo: &Reply) -> HashSet<Extension> {
    // The first line is the server's greeting, not an extension
    ehlo.message.iter().skip(1).map(|line| Extension::parse(line)).collect()
}
