use clap::Parser;
use colorindex::Opts;
use colorindex::cli::SubCommandExtend;
use colorindex::config::SubCommand;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Ingest(config) => config.run(&opts).await,
        SubCommand::Build(config) => config.run(&opts).await,
        SubCommand::Lookup(config) => config.run(&opts).await,
        SubCommand::Stats(config) => config.run(&opts).await,
        SubCommand::Clear(config) => config.run(&opts).await,
        SubCommand::Slice(config) => config.run(&opts).await,
        SubCommand::Server(config) => config.run(&opts).await,
    }
}
