use clap::Parser;
use mock_redis::config::Config;
use mock_redis::{server, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::parse();

    server::run(config).await
}
