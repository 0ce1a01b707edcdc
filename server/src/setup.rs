use anyhow::{Context, Result};
use database::{connect, DemoSeed, SqlTodoRepository};
use std::path::Path;
use std::sync::Arc;
use todo_api::ApiServer;
use tracing::{info, warn};

use crate::config::Config;

/// Login password of the seeded demo account
pub const DEMO_PASSWORD: &str = "demo123";

/// Create the task repository and bring its schema up to date
pub async fn create_repository(config: &Config) -> Result<Arc<SqlTodoRepository>> {
    info!("Creating task repository");

    let executor = connect(
        config.database_url(),
        &config.database.sqlite_path,
        config.pool_settings(),
    )
    .context("Failed to select database backend")?;
    let repo = SqlTodoRepository::new(executor);

    let seed = if config.database.seed_demo_data {
        Some(demo_seed(config).await?)
    } else {
        None
    };

    info!(backend = %repo.backend(), "Bootstrapping database schema");
    repo.bootstrap(seed.as_ref())
        .await
        .context("Failed to bootstrap database")?;

    info!("Task repository created successfully");
    Ok(Arc::new(repo))
}

/// Build the demo seed, hashing its password with the configured work factor
async fn demo_seed(config: &Config) -> Result<DemoSeed> {
    let hasher = config.credential_hasher()?;
    let digest = tokio::task::spawn_blocking(move || hasher.hash(DEMO_PASSWORD))
        .await
        .context("Demo password hashing task failed")?
        .context("Failed to hash demo password")?;
    Ok(DemoSeed::standard(digest))
}

/// Create and configure the HTTP server
pub fn create_server(
    repository: Arc<SqlTodoRepository>,
    config: &Config,
) -> Result<ApiServer<SqlTodoRepository>> {
    info!("Creating HTTP server");

    let mut server = ApiServer::new(repository, config.credential_hasher()?);

    if let Some(dir) = &config.server.static_dir {
        let dir = Path::new(dir);
        if !dir.join("index.html").is_file() {
            warn!(static_dir = %dir.display(), "Static directory has no index.html");
        }
        info!(static_dir = %dir.display(), "Serving static client");
        server = server.with_static_dir(dir);
    }

    Ok(server)
}

/// Initialize the complete application
///
/// Returns the repository alongside the server so the caller can close the
/// pool after the server stops.
pub async fn initialize_app(
    config: &Config,
) -> Result<(ApiServer<SqlTodoRepository>, Arc<SqlTodoRepository>)> {
    info!("Initializing application");

    let repository = create_repository(config)
        .await
        .context("Failed to create repository")?;

    let server = create_server(repository.clone(), config).context("Failed to create server")?;

    info!("Application initialized successfully");
    Ok((server, repository))
}

/// Ensure the embedded store's directory exists, using config
pub fn ensure_database_directory_from_config(config: &Config) -> Result<()> {
    match config.sqlite_file() {
        Some(path) => ensure_database_directory(&path),
        None => Ok(()),
    }
}

/// Ensure the database directory exists and set owner-only permissions
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            info!("Creating database directory: {}", parent.display());
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let permissions = std::fs::Permissions::from_mode(0o700);
                std::fs::set_permissions(parent, permissions)
                    .context("Failed to set directory permissions")?;
            }
        }
    }

    if db_path.exists() {
        set_secure_file_permissions(db_path)?;
    }
    Ok(())
}

/// Set owner-only file permissions on Unix
fn set_secure_file_permissions(file_path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(file_path, permissions)
            .with_context(|| format!("Failed to set permissions for {}", file_path.display()))?;
        info!("Set secure permissions (0600) for database file: {}", file_path.display());
    }

    #[cfg(not(unix))]
    {
        info!("Database file permissions managed by the system: {}", file_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use todo_core::{StoreHealth, UserRepository};

    fn sqlite_config(dir: &TempDir, seed: bool) -> Config {
        let mut config = Config::default();
        config.database.sqlite_path = dir.path().join("data").join("todo.sqlite").display().to_string();
        config.database.seed_demo_data = seed;
        config.auth.hash_memory_kib = 64;
        config.auth.hash_iterations = 1;
        config
    }

    #[tokio::test]
    async fn test_create_repository_with_sqlite_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = sqlite_config(&temp_dir, false);

        ensure_database_directory_from_config(&config).unwrap();
        let repo = create_repository(&config).await.unwrap();

        repo.health_check().await.unwrap();
        assert_eq!(repo.stats().await.unwrap().users, 0);
        repo.close().await;
    }

    #[tokio::test]
    async fn test_demo_seed_logs_in_with_demo_password() {
        let temp_dir = TempDir::new().unwrap();
        let config = sqlite_config(&temp_dir, true);

        ensure_database_directory_from_config(&config).unwrap();
        let repo = create_repository(&config).await.unwrap();

        let demo = repo
            .get_user_by_email(DemoSeed::EMAIL)
            .await
            .unwrap()
            .expect("demo user seeded");
        let hasher = config.credential_hasher().unwrap();
        assert!(hasher.verify(DEMO_PASSWORD, &demo.password_hash).unwrap());
        assert_eq!(repo.stats().await.unwrap().tasks, 3);
        repo.close().await;
    }

    #[tokio::test]
    async fn test_create_repository_rejects_unknown_scheme() {
        let mut config = Config::default();
        config.database.url = Some("mysql://localhost/todo".to_string());

        assert!(create_repository(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_create_repository_unreachable_postgres() {
        let mut config = Config::default();
        config.database.url = Some("postgres://todo@127.0.0.1:1/todo".to_string());
        config.database.connection_timeout = 1;

        assert!(create_repository(&config).await.is_err());
    }

    #[test]
    fn test_ensure_database_directory() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("subdir").join("test.db");

        ensure_database_directory(&db_path).unwrap();
        assert!(db_path.parent().unwrap().exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(db_path.parent().unwrap())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_ensure_database_directory_secures_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("todo.sqlite");
        std::fs::write(&db_path, b"").unwrap();

        ensure_database_directory(&db_path).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&db_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_in_memory_needs_no_directory() {
        let mut config = Config::default();
        config.database.sqlite_path = ":memory:".to_string();
        ensure_database_directory_from_config(&config).unwrap();

        let (_server, repo) = initialize_app(&config).await.unwrap();
        repo.health_check().await.unwrap();
    }
}
