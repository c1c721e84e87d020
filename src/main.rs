use anyhow::Result;
use ydbk::cli::Cli;
use ydbk::logging::{self, LogConfig};
use ydbk::{config, context, core};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_normalized(std::env::args_os());

    let config = config::AppConfig::new(cli.config.as_deref(), Some(&cli.overrides))?;

    logging::init(LogConfig {
        json: config.json_logs,
        verbose: config.verbose,
    });

    let archiver = core::create_archiver(&config);
    let ctx = context::AppContext::new(config)?;
    let notifier = core::create_notifier(&ctx.config, &ctx.http);
    let orchestrator = core::Orchestrator::new(ctx, archiver, notifier);

    // Errors from here on have already been logged and notified; returning
    // them exits with status 1.
    let invocation = match cli.invocation() {
        Ok(invocation) => invocation,
        Err(e) => return Err(orchestrator.fail(e).await),
    };
    orchestrator.run(&invocation).await
}
