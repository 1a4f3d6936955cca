// SPDX-License-Identifier: Apache-2.0 OR MIT
// Example demonstrating the rapidlog pipeline
//
// Run with: cargo run --example logging_demo

use rapidlog::{log_error, log_info, log_warning, Config, LogSystem};
use std::thread;

fn main() {
    let config = Config {
        capacity: 8192,
        log_dir: "logs".into(),
        file_size: 32 * 1024 * 1024,
    };
    let system: LogSystem = LogSystem::start(config).expect("demo config is valid");

    println!("=== rapidlog demo ===\n");

    println!("1. Four producer threads, 1000 records each:");
    let mut handles = Vec::new();
    for worker in 0..4 {
        let logger = system.logger();
        handles.push(thread::spawn(move || {
            for i in 0..1000 {
                log_info!(logger, "worker % message % of %", worker, i, 1000);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("producer thread panicked");
    }

    println!("2. Other levels and argument kinds:");
    let logger = system.logger();
    log_warning!(logger, "queue depth approaching % records", 8192);
    log_error!(logger, "demo error with float % and string %", 2.5, "payload");

    let written = system.stop();
    println!("\nwrote {written} records under ./logs");
}
