use tracing::{info, warn};

use cloudshelf::db::UserRepository;
use cloudshelf::{BlobReclaimer, Config, Database, ItemService, LocalBlobStore};

/// Configuration file read at startup.
const CONFIG_PATH: &str = "cloudshelf.toml";

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| CONFIG_PATH.to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = cloudshelf::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        cloudshelf::logging::init_console_only(&config.logging.level);
    }

    info!("cloudshelf - hierarchical item store");

    if let Err(e) = run(&config).await {
        eprintln!("cloudshelf failed: {e}");
        std::process::exit(1);
    }
}

/// Open the store and audit every user's folder sizes.
async fn run(config: &Config) -> cloudshelf::Result<()> {
    let db = Database::open(&config.database.path, config.database.max_connections).await?;
    info!("Database ready (schema version {})", db.schema_version().await?);

    let store = LocalBlobStore::new(&config.blob.root)?;
    info!("Blob store rooted at {:?}", store.root());
    let reclaimer = BlobReclaimer::spawn(store);

    let users = UserRepository::new(db.pool()).list_all().await?;
    let service = ItemService::with_limits(&db, &reclaimer, config.limits);

    let mut mismatched = 0;
    for user in &users {
        let mismatches = service.verify_sizes(&user.id).await?;
        for mismatch in &mismatches {
            warn!(
                "Folder {} ({}) of {} records {} bytes, children hold {}",
                mismatch.folder_id, mismatch.name, user.email, mismatch.recorded, mismatch.expected
            );
        }
        mismatched += mismatches.len();
    }
    info!(
        "Audited {} user(s): {} folder(s) with inconsistent sizes",
        users.len(),
        mismatched
    );

    let stats = reclaimer.shutdown().await;
    info!("Reclaimer drained: {:?}", stats);
    db.close().await;
    Ok(())
}
