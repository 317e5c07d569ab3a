use std::sync::Arc;
use std::time::Duration;

use tallykv::{Config, CounterService, ErrorKind, MemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Allow more swaps per increment and fail fast on a stuck store
    let config = Config {
        max_attempts: 50,
        request_timeout: Duration::from_millis(500),
        retry_delay: Duration::from_millis(2),
    };
    let counters = CounterService::with_config(Arc::new(MemoryStore::new()), config);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let counters = counters.clone();
        handles.push(tokio::spawn(async move { counters.increment_counter("jobs").await }));
    }

    for handle in handles {
        if let Err(err) = handle.await? {
            match err.kind() {
                ErrorKind::Contention => eprintln!("retry later: {err}"),
                _ => return Err(err.into()),
            }
        }
    }

    println!("jobs = {}", counters.get_counter("jobs").await?);

    Ok(())
}
