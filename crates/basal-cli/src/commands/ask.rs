//! Ask a natural-language question about basal history via Ollama.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use basal_db::{Database, QueryTable, SCHEMA};
use basal_llm::Client;

use crate::LlmConfig;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &LlmConfig, question: &str) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let client =
        Client::new(&config.endpoint, config.timeout()).context("failed to create LLM client")?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;

    let sql = runtime
        .block_on(client.generate_sql(&config.model, question, SCHEMA))
        .context("failed to generate SQL")?;
    writeln!(writer, "Generated SQL query:")?;
    writeln!(writer, "{sql}")?;
    writeln!(writer)?;

    let table = db
        .run_read_only_query(&sql)
        .with_context(|| format!("failed to run generated query: {sql}"))?;
    let rendered = format_table(&table);
    write!(writer, "{rendered}")?;

    let answer = runtime
        .block_on(client.interpret(&config.model, question, &rendered))
        .context("failed to interpret query results")?;
    writeln!(writer)?;
    writeln!(writer, "Answer: {answer}")?;
    Ok(())
}

/// Format query results as an aligned text table.
pub fn format_table(table: &QueryTable) -> String {
    let mut widths: Vec<usize> = table
        .columns
        .iter()
        .map(|column| column.chars().count())
        .collect();
    for row in &table.rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let mut output = String::new();
    push_row(&mut output, &table.columns, &widths);
    let rule: Vec<String> = widths.iter().map(|width| "─".repeat(*width)).collect();
    push_row(&mut output, &rule, &widths);
    for row in &table.rows {
        push_row(&mut output, row, &widths);
    }
    if table.rows.is_empty() {
        writeln!(output, "(no rows)").unwrap();
    }
    output
}

fn push_row(output: &mut String, values: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (idx, (value, width)) in values.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        line.push_str(value);
        let pad = width.saturating_sub(value.chars().count());
        line.extend(std::iter::repeat_n(' ', pad));
    }
    writeln!(output, "{}", line.trim_end()).unwrap();
}
