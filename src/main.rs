use clap::Parser;
use pagbasa::{db::Db, AppState};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// SQLite database URL, e.g. `sqlite://pagbasa.db`.
    #[clap(long, env)]
    database_url: String,

    /// Shared secret used to verify HS256 bearer tokens.
    #[clap(long, env, hide_env_values = true)]
    jwt_secret: String,

    /// The address to bind to.
    #[arg(short, long, env, default_value = "127.0.0.1:5001")]
    address: String,

    /// Leave error details out of responses.
    #[arg(long, env)]
    production: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tower_http=info,pagbasa=debug".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();

    let db = Db::new(&args.database_url).await?;
    let app = pagbasa::router(AppState::new(db, &args.jwt_secret, args.production));

    let address = args.address.parse::<std::net::SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(%address, production = args.production, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
