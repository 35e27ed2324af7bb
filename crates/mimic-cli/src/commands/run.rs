//! `mimic run` command implementation.
//!
//! Runs statements through the full interception pipeline against an in-process backend that
//! answers every forwarded statement with the SQL it received. Useful for seeing exactly what a
//! real backend would be sent.

use anyhow::{Context, Result};
use async_trait::async_trait;
use mimic_core::{MimicConfig, ResultSet, Value};
use mimic_proxy::{MimicProxy, Session};
use std::collections::HashMap;
use std::path::Path;

/// Backend that echoes forwarded SQL back as a one-row result.
pub struct EchoBackend;

#[async_trait]
impl Session for EchoBackend {
    async fn query(
        &self,
        sql: &str,
        _attributes: &HashMap<String, String>,
    ) -> anyhow::Result<ResultSet> {
        Ok(ResultSet::new(
            vec!["forwarded".to_string()],
            vec![vec![Value::from(sql)]],
        ))
    }

    async fn set(&self, changed: &[(String, Value)]) -> anyhow::Result<()> {
        for (name, value) in changed {
            tracing::info!(variable = %name, value = %value, "Backend notified of SET");
        }
        Ok(())
    }
}

pub async fn run(
    config_path: Option<&Path>,
    database: Option<&str>,
    user: Option<&str>,
    statements: &[String],
) -> Result<()> {
    let config = match config_path {
        Some(path) => MimicConfig::load_with_context(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MimicConfig::default(),
    };
    let proxy = MimicProxy::from_config(&config).context("Invalid configuration")?;
    let mut conn = proxy
        .connect(EchoBackend, user, database)
        .await
        .context("Failed to open connection")?;

    let mut failed = 0usize;
    for sql in statements {
        println!("mimic> {sql}");
        match conn.handle_query(sql).await {
            Ok(results) => {
                for result in &results {
                    println!("{}", render_table(result));
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("ERROR {}: {e}", e.code());
            }
        }
    }
    conn.close();

    if failed > 0 {
        anyhow::bail!("{failed} of {} statement(s) failed", statements.len());
    }
    Ok(())
}

/// Render a result the way the mysql command line client does.
pub fn render_table(result: &ResultSet) -> String {
    if result.columns.is_empty() {
        return "Query OK".to_string();
    }

    let cells: Vec<Vec<String>> = result
        .text_rows()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| cell.unwrap_or_else(|| "NULL".to_string()))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let line = |values: &[String]| {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!(" {value:<width$} "))
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let mut out = vec![border.clone(), line(result.columns.as_slice()), border.clone()];
    out.extend(cells.iter().map(|row| line(row.as_slice())));
    out.push(border);

    let count = result.row_count();
    out.push(format!(
        "{count} {} in set",
        if count == 1 { "row" } else { "rows" }
    ));
    out.join("\n")
}
