mod config;

use anyhow::Context;
use clap::Parser;
use soapbind_client_core::{Binding, SendOptions};
use soapbind_protocol::Value;
use tracing::{error, info, instrument};

use config::{Args, create_binding_config, init_logging};

#[instrument(name = "main", level = "info")]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging. If it fails, we can't log, so just print and exit.
    if let Err(e) = init_logging(args.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run_app(&args) {
        error!("Application failed to run: {:?}", e);
        return Err(e);
    }

    Ok(())
}

/// Performs the call and prints the reply, or the fault the server answered with.
fn run_app(args: &Args) -> anyhow::Result<()> {
    info!(
        url = %args.url,
        operation = %args.operation,
        auth = %args.auth_method,
        "calling operation"
    );

    let config = create_binding_config(args)?;
    let binding = Binding::new(config).context("Failed to create binding")?;

    let mut send_options = SendOptions::default();
    send_options.soap_action.clone_from(&args.soap_action);
    send_options.ws_action.clone_from(&args.ws_action);
    let operation = binding
        .operation(&args.operation)
        .with_send_options(send_options);

    let result = if args.params.is_empty() {
        operation.call(args.args.iter().map(|arg| Value::from(arg.as_str())).collect())
    } else {
        operation.call_named(
            args.params
                .iter()
                .map(|(name, value)| (name.clone(), Value::from(value.as_str())))
                .collect(),
        )
    };

    match result {
        Ok(reply) => {
            println!("{reply}");
            Ok(())
        }
        Err(err) => {
            if let Some(fault) = err.as_fault() {
                println!("fault {}: {fault}", fault.code);
            }
            Err(err).with_context(|| format!("{} failed", operation.name()))
        }
    }
}
