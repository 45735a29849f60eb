//! Channel example
//!
//! Several producer threads hammer one counter channel; the handler keeps
//! its total in plain state because the channel serializes every call.
//!
//! Environment:
//! - `DEMO_PRODUCERS` - producer threads (default 4)
//! - `DEMO_REQUESTS` - requests per producer (default 1000)
//! - `SYNCCHAN_LOG_LEVEL=info` - show channel lifecycle logs

use std::thread;
use std::time::{Duration, Instant};

use syncchan::{
    arg, args, cinfo, cwarn, env_get, ChannelConfig, EndpointRouter, HandlerError, Registry, Value,
};

fn counter() -> EndpointRouter<i64> {
    EndpointRouter::new(0i64)
        .route("inc", |total, args| {
            *total += arg(args, 0)?.as_i64().unwrap_or(1);
            Ok(Value::Int(*total))
        })
        .route("get", |total, _| Ok(Value::Int(*total)))
        .route("fail", |_, _| Err(HandlerError::msg("boom")))
        .with_stop_hook(|total| cinfo!("counter stopping at {}", total))
}

fn main() {
    println!("=== syncchan Channel Example ===\n");

    let producers: usize = env_get("DEMO_PRODUCERS", 4);
    let requests: usize = env_get("DEMO_REQUESTS", 1000);

    let config = ChannelConfig::from_env().capacity(16);
    config.print();
    let registry = Registry::with_config(config);

    let channel = match registry.create("counter", counter()) {
        Ok(ch) => ch,
        Err(e) => {
            eprintln!("failed to create channel: {}", e);
            std::process::exit(1);
        }
    };
    println!("\nCreated {:?}\n", channel);

    let start = Instant::now();
    let handles: Vec<_> = (0..producers)
        .map(|p| {
            let ch = channel.clone();
            thread::spawn(move || {
                let mut ok = 0usize;
                for _ in 0..requests {
                    match ch.request("inc", args![1]) {
                        Ok(_) => ok += 1,
                        Err(e) => cwarn!("[Producer {}] request failed: {}", p, e),
                    }
                }
                println!("[Producer {}] Done, {} ok", p, ok);
                ok
            })
        })
        .collect();

    let sent: usize = handles.into_iter().filter_map(|h| h.join().ok()).sum();
    let elapsed = start.elapsed();

    match channel.request("get", args![]) {
        Ok(total) => println!("\nTotal: {} ({} requests acknowledged)", total, sent),
        Err(e) => println!("\nget failed: {}", e),
    }
    if let Err(e) = channel.request("fail", args![]) {
        println!("Handler error surfaced to caller: {}", e);
    }

    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    println!("Throughput: {:.0} req/s", sent as f64 / secs);

    // Replacing a channel stops the old one
    let replacement = registry.create("counter", counter());
    if let Ok(replacement) = &replacement {
        println!("Replaced with {:?}", replacement);
    }
    let old_stopped = channel.join_timeout(Duration::from_secs(5));
    println!("Old channel stopped: {} ({:?})", old_stopped, channel.stats());

    println!("Stopped {} channel(s)", registry.stop_all());
    if let Ok(replacement) = replacement {
        replacement.join();
    }

    println!("\n=== Example Complete ===");
}
