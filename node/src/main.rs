use eyre::Result;
use node::rust::configuration::commandline::options;
use node::rust::configuration::{builder, EnvSnapshot, ParseError};
use node::rust::runtime::server_options;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_json_logging()?;

    let env = EnvSnapshot::from_process_env();
    // argv[0] is the program name and is excluded from scanning.
    let args: Vec<String> = std::env::args().skip(1).collect();

    let conf = match builder::build(&env, &args) {
        Ok(conf) => conf,
        Err(ParseError::HelpRequested) => {
            print!("Usage: modelserve [options]\n{}", options::usage());
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Usage: modelserve [options]\n{}", options::usage());
            std::process::exit(1);
        }
    };

    let effective_conf = serde_json::to_string(&conf)?;
    info!(configuration = %effective_conf, "configuration validated");

    // Server bring-up consumes the marshaled option set; a failure reported
    // by the builder is terminal.
    let server_opts = server_options::build_server_options(&conf)?;
    info!(server_id = %server_opts.server_id, "server options ready");

    Ok(())
}

fn init_json_logging() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()?;
    Ok(())
}
