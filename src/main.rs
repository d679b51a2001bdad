use group_timetable::config::ServerConfig;
use group_timetable::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env()?;
    server::run_server(config).await?;

    Ok(())
}
