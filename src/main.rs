use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use agile_manifest::{api, backlog::Backlog, config::Config, services, tree_render};

#[derive(Parser)]
#[command(name = "amfst")]
#[command(about = "Agile backlog with a validated epic/feature/story hierarchy")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the hierarchy of a project
    Tree {
        /// Project id
        project: Uuid,
    },
    /// List registered hierarchy types and their categories
    Types,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
        |_| "agile_manifest=debug,hierarchy_core=debug,tower_http=debug".into(),
    ));

    // stderr keeps stdout clean for `tree` and `types` output
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.port);
    tracing::info!("Starting AgileManifest server on port {}", port);

    let backlog = Backlog::open(config.open_database()?);
    let app = api::create_router_with_cors(backlog, config.cors_origins.as_deref());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("AgileManifest server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load();

    match cli.command {
        Some(Commands::Serve { port }) => serve(&config, port).await?,
        Some(Commands::Tree { project }) => {
            let backlog = Backlog::open(config.open_database()?);
            let tree = backlog.tree(project)?;
            if tree.is_empty() {
                println!("(no records)");
            } else {
                print!("{}", tree_render::render_tree(&tree));
            }
        }
        Some(Commands::Types) => {
            let registry = services::registry();
            for name in registry.type_names() {
                let record_type = registry.resolve_record_type(name)?;
                println!("{:<16} {}", name, record_type.category());
            }
        }
        None => serve(&config, None).await?,
    }

    Ok(())
}
