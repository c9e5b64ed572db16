//! Docker container running MySQL with row-based binary logging

use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::SourceOpts;

const ROOT_PASSWORD: &str = "testpass";

/// A throwaway MySQL server for binlog tests.
pub struct MySQLContainer {
    pub container_name: String,
    pub host_port: u16,
    pub image_name: String,
}

impl MySQLContainer {
    pub fn new(container_name: &str, host_port: u16) -> Self {
        Self {
            container_name: container_name.to_string(),
            host_port,
            image_name: "mysql:8.0".to_string(),
        }
    }

    /// Connection options for the root account.
    pub fn source_opts(&self) -> SourceOpts {
        SourceOpts {
            host: "127.0.0.1".to_string(),
            port: self.host_port,
            user: "root".to_string(),
            password: ROOT_PASSWORD.to_string(),
        }
    }

    /// Starts the container, replacing any leftover one with the same name.
    pub fn start(&self) -> Result<()> {
        info!("Starting MySQL container: {}", self.container_name);

        self.remove_quietly();

        let output = Command::new("docker")
            .args([
                "run",
                "--name",
                &self.container_name,
                "-e",
                &format!("MYSQL_ROOT_PASSWORD={ROOT_PASSWORD}"),
                "-e",
                "MYSQL_DATABASE=testdb",
                "-p",
                &format!("{}:3306", self.host_port),
                "-d",
                &self.image_name,
                "--server-id=1",
                "--log-bin=mysql-bin",
                "--binlog-format=ROW",
                "--binlog-row-image=FULL",
            ])
            .output()
            .context("Failed to start Docker container")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to start container: {stderr}");
        }

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Started container: {}", container_id);
        Ok(())
    }

    /// Polls until MySQL accepts connections.
    pub async fn wait_until_ready(&self, timeout_secs: u64) -> Result<()> {
        info!("Waiting for MySQL to be ready...");

        let start = Instant::now();
        let timeout = Duration::from_secs(timeout_secs);

        while start.elapsed() < timeout {
            match self.test_connection().await {
                Ok(()) => {
                    info!("MySQL is ready!");
                    return Ok(());
                }
                Err(e) => {
                    debug!("Connection attempt failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(1000)).await;
                }
            }
        }

        anyhow::bail!("MySQL did not become ready within {timeout_secs} seconds")
    }

    async fn test_connection(&self) -> Result<()> {
        let pool = self.get_pool()?;
        let mut conn = pool.get_conn().await.context("Failed to get connection")?;

        use mysql_async::prelude::*;
        let _: Option<i32> = conn
            .query_first("SELECT 1")
            .await
            .context("Failed to execute test query")?;

        drop(conn);
        pool.disconnect()
            .await
            .context("Failed to disconnect pool")?;
        Ok(())
    }

    pub fn get_pool(&self) -> Result<mysql_async::Pool> {
        crate::new_mysql_pool(&self.source_opts())
    }

    /// Stops and removes the container.
    pub fn stop(&self) -> Result<()> {
        info!("Stopping container: {}", self.container_name);

        for action in ["stop", "rm"] {
            let output = Command::new("docker")
                .args([action, &self.container_name])
                .output()
                .with_context(|| format!("Failed to {action} container"))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                debug!("docker {} failed (may not exist): {}", action, stderr);
            }
        }

        info!("Container stopped and removed");
        Ok(())
    }

    fn remove_quietly(&self) {
        for action in ["stop", "rm"] {
            let _ = Command::new("docker")
                .args([action, &self.container_name])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
    }
}

impl Drop for MySQLContainer {
    fn drop(&mut self) {
        // Best effort cleanup
        let _ = self.stop();
    }
}
