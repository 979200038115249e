//! relaymail - sendmail-compatible relay forwarder.
//!
//! Reads one message from standard input and hands it to the configured
//! SMTP relay.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use std::process::ExitCode;

use relaymail_core::{Config, Error, compose, deliver, resolve_recipients};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

use cli::Args;

/// Exit status for failures outside the pipeline taxonomy.
const EX_SOFTWARE: u8 = 70;

/// Handle for raising the log level once the config file is known.
type LogHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse_from(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // --help and --version land here too
            if !err.use_stderr() {
                return ExitCode::SUCCESS;
            }
            return ExitCode::from(Error::Usage(err.to_string()).exit_code());
        }
    };

    let log = init_logging(args.verbose);

    match run(&args, &log).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            let code = err
                .downcast_ref::<Error>()
                .map_or(EX_SOFTWARE, Error::exit_code);
            ExitCode::from(code)
        }
    }
}

/// `RUST_LOG` wins; otherwise the success line is always kept and `-v`
/// (or `Verbose=1`) adds the session diagnostics.
fn log_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "relaymail=debug,warn"
    } else {
        "relaymail=info,warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
}

fn init_logging(verbose: bool) -> LogHandle {
    let (filter, handle) = reload::Layer::new(log_filter(verbose));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

async fn run(args: &Args, log: &LogHandle) -> anyhow::Result<()> {
    let mut config = Config::discover();

    // -C picks the file, so flags are applied once before and once after it
    args.apply(&mut config);
    config.load_file().map_err(Error::from)?;
    args.apply(&mut config);

    if config.verbose
        && !args.verbose
        && let Err(err) = log.reload(log_filter(true))
    {
        warn!(error = %err, "could not raise log level");
    }

    config.apply_cron_daemon();
    config.qualify_postmaster();
    config.set_recipients(args.recipients.iter().cloned());

    if config.verbose {
        for (key, value) in config.dump() {
            debug!(key, %value, "config");
        }
    }

    if config.message.to.is_empty() && !config.scan_message {
        return Err(Error::Usage("no recipients supplied".into()).into());
    }

    let mut raw = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut raw)
        .await
        .map_err(Error::Input)?;

    let message = compose(raw, &mut config)?;
    if config.scan_message {
        resolve_recipients(&message, &mut config);
    }

    deliver(&config, &message).await?;

    info!(
        message_id = message.message_id().unwrap_or_default(),
        subject = message.subject().unwrap_or_default(),
        from = %config.message.from,
        to = ?config.message.to,
        "sent mail"
    );
    Ok(())
}
