use crate::config::Config;
use crate::db::Store;

pub async fn cmd_history(config: &Config, limit: u64) -> anyhow::Result<()> {
    let store = Store::new(&config.database).await?;
    let records = store.recent_queries(limit).await?;

    if records.is_empty() {
        println!("No recorded lookups.");
        return Ok(());
    }

    println!("Recent lookups (last {}):", records.len());
    println!("{:-<70}", "");

    for record in records {
        let field = |name: &str| match record.query_data.get(name) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "?".to_string(),
        };
        let size = record.raw_response.as_ref().map_or(0, String::len);

        println!(
            "#{} {} {}/{}",
            record.id,
            field("caseType"),
            field("caseNumber"),
            field("filingYear")
        );
        println!("  {} | {} bytes of page content", record.timestamp, size);
    }

    Ok(())
}
