use tallykv::Builder;
use tempfile::tempdir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // NOTE: Using a temporary directory for demonstration.
    let db_dir = tempdir()?.keep();

    let counters = Builder::new().path(&db_dir).build().await?;

    for _ in 0..3 {
        let hit = counters.increment_counter("foo").await?;
        println!("foo = {} (version {})", hit.value, hit.version);
    }

    println!("\nRestarting store...");
    counters.close().await?;
    drop(counters);

    let counters = Builder::new().path(&db_dir).build().await?;
    let hit = counters.increment_counter("foo").await?;
    println!("foo = {} (version {})", hit.value, hit.version);

    // Cleanup
    counters.close().await?;
    drop(counters);
    let _ = tokio::fs::remove_dir_all(&db_dir).await;

    Ok(())
}
