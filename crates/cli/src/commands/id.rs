use keel_core::{parse_id, split_id, AppConfig, IdGenerator};

/// Print `count` fresh ids for `shard`, or the configured shard
pub fn next(config: &AppConfig, shard: Option<i64>, count: usize) {
    let generator = IdGenerator::new(shard.unwrap_or(config.id_shard));
    for _ in 0..count {
        println!("{}", generator.next());
    }
}

/// Print the time, shard and sequence packed into `id`
pub fn split(id: &str, json: bool) -> anyhow::Result<()> {
    let parts = split_id(parse_id(id)?);
    if json {
        println!("{}", serde_json::to_string_pretty(&parts)?);
    } else {
        println!("time:     {}", parts.time.to_rfc3339());
        println!("shard:    {}", parts.shard);
        println!("sequence: {}", parts.sequence);
    }
    Ok(())
}
