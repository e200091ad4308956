use anyhow::Context;
use tickerview::config::AppConfig;
use tickerview::visualizer::TickerVisualizer;
use tickerview::yahoo::YahooClient;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tickerview=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let app_config = AppConfig::load().context("failed to load configuration")?;

    // Every log line below carries the symbol
    let _span = tracing::info_span!("ticker", symbol = %app_config.chart.symbol).entered();

    tracing::info!("Starting tickerview");
    tracing::info!(
        period = %app_config.chart.period,
        interval = %app_config.chart.interval,
        windows = ?app_config.chart.moving_average_windows,
        output = %app_config.output.path.display(),
        "Loaded configuration"
    );

    let provider = YahooClient::new(&app_config.provider).context("failed to build HTTP client")?;
    let mut visualizer = TickerVisualizer::new(provider, &app_config);

    match visualizer.run().await {
        Ok(report) => {
            tracing::info!(
                rows = report.rows,
                title = %report.title,
                artifacts = ?report.artifacts,
                "Visualization complete"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, "Visualization failed");
            Err(err.into())
        }
    }
}
