//! Status reporting onto the MySQL status sub-resource

use crate::client::ClusterClient;
use crate::Result;
use mysql_api::{MySQL, MySQLPhase, MySQLStatus};
use tracing::{error, warn};

/// Message written once every dependent has been created
pub const RUNNING_MESSAGE: &str = "MySQL instance is running";

/// Overwrite the status of `mysql` unconditionally
pub async fn report(
    client: &dyn ClusterClient,
    mysql: &MySQL,
    phase: MySQLPhase,
    message: &str,
    ready: bool,
) -> Result<MySQLStatus> {
    let status = MySQLStatus {
        phase: Some(phase),
        message: message.to_string(),
        ready,
    };
    if let Err(e) = client.update_status(mysql, &status).await {
        if e.is_conflict() {
            warn!(error = %e, "MySQL was modified since it was read, status not written");
        } else {
            error!(error = %e, "Failed to update MySQL status");
        }
        return Err(e);
    }
    Ok(status)
}

/// Status written after a fully successful pass.
///
/// It reflects that every dependent exists, not that the database accepts
/// connections yet.
pub async fn report_running(client: &dyn ClusterClient, mysql: &MySQL) -> Result<MySQLStatus> {
    report(client, mysql, MySQLPhase::Running, RUNNING_MESSAGE, true).await
}
