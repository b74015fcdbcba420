//! Inspection CLI for a live basalt region.
//!
//! ```text
//! basalt-ctl list              list all topics
//! basalt-ctl info <topic>      show topic geometry
//! basalt-ctl tail <topic>      follow new messages on a topic
//! basalt-ctl health <topic>    print a health snapshot as JSON
//! ```
//!
//! The region name comes from `BASALT_REGION` (default `basalt_core`).

use basalt_region::Region;
use basalt_ring::{Recv, RingHealth, Subscriber, clock};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

const DEFAULT_REGION: &str = "basalt_core";

fn usage() -> ! {
    eprintln!("Usage: basalt-ctl <command> [args]");
    eprintln!("Commands:");
    eprintln!("  list            List all topics");
    eprintln!("  info <topic>    Show topic details");
    eprintln!("  tail <topic>    Follow topic data");
    eprintln!("  health <topic>  Print topic health as JSON");
    eprintln!();
    eprintln!("Region name comes from BASALT_REGION (default '{DEFAULT_REGION}')");
    std::process::exit(1);
}

fn attach() -> Arc<Region> {
    let name = std::env::var("BASALT_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
    match Region::attach(&name) {
        Ok(region) => Arc::new(region),
        Err(e) => {
            eprintln!("basalt-ctl: cannot attach region '{name}': {e}");
            eprintln!("Hint: has basalt-init run?");
            std::process::exit(1);
        }
    }
}

fn do_list(region: &Region) {
    let header = region.header();
    println!();
    println!("Basalt Region Status");
    println!("--------------------");
    println!("Size:   {} MB", header.size / (1024 * 1024));
    println!("Topics: {}", header.topic_count);
    println!();
    println!(
        "{:<20} | {:<5} | {:<8} | {:<9} | {:<12}",
        "NAME", "TYPE", "SLOTS", "SLOT SIZE", "MESSAGES"
    );
    println!("{}", "-".repeat(66));

    for topic in region.topics() {
        let desc = region.ring_desc(topic);
        let head = desc.w_head.load(Ordering::Relaxed);
        println!(
            "{:<20} | {:<5} | {:<8} | {:<9} | {:<12}",
            topic.name(),
            topic.ring_kind().map_or("?", |k| k.as_str()),
            topic.slot_count,
            topic.slot_size,
            head
        );
    }
    println!();
}

fn do_info(region: &Region, topic_name: &str) {
    let Some(topic) = region.lookup(topic_name) else {
        eprintln!("Topic '{topic_name}' not found.");
        std::process::exit(1);
    };
    let desc = region.ring_desc(topic);
    let head = desc.w_head.load(Ordering::Relaxed);
    let ring_bytes = desc.slot_count as u64 * desc.slot_size as u64;

    println!();
    println!("Topic: {}", topic.name());
    println!("Type:  {}", topic.ring_kind().map_or("?", |k| k.as_str()));
    println!("Head:  {head}");
    println!();
    println!("Configuration:");
    println!("  Slot Count:  {}", desc.slot_count);
    println!("  Slot Size:   {} bytes", desc.slot_size);
    println!("  Base Offset: {:#x}", desc.base_offset);
    println!();
    println!("Memory:");
    println!(
        "  Ring Size:   {:.2} MB",
        ring_bytes as f64 / (1024.0 * 1024.0)
    );
}

fn do_tail(region: Arc<Region>, topic_name: &str) {
    let mut sub = match Subscriber::attach(region, topic_name) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Only show messages published from now on.
    sub.seek_to_head();
    println!("Tailing topic '{topic_name}' (Ctrl+C to stop)...");

    let mut buf = vec![0u8; sub.max_payload()];
    loop {
        match sub.next(&mut buf) {
            Recv::Msg { len, pub_id, .. } => {
                print!("[{pub_id}] ");
                let payload = &buf[..len];
                if len == 0 {
                    println!("(empty message)");
                } else if is_printable(payload) {
                    println!("{}", String::from_utf8_lossy(trim_nul(payload)));
                } else {
                    print!("({len} bytes) ");
                    hexdump(&payload[..len.min(16)]);
                }
            }
            Recv::NoData => std::thread::sleep(Duration::from_millis(1)),
            Recv::Truncated { len } => {
                // Cannot happen with a max_payload buffer, but keep the
                // stream moving if it somehow does.
                eprintln!("(truncated message of {len} bytes)");
            }
        }
    }
}

fn do_health(region: &Region, topic_name: &str) {
    let Some(health) = RingHealth::capture(region, topic_name) else {
        eprintln!("Topic '{topic_name}' not found.");
        std::process::exit(1);
    };

    match serde_json::to_string_pretty(&health) {
        Ok(json) => {
            println!("{json}");
            if health.is_stalled(clock::now_ns(), 500_000_000) {
                eprintln!("warning: no publish observed in the last 500ms");
            }
        }
        Err(e) => {
            eprintln!("failed to serialize health: {e}");
            std::process::exit(1);
        }
    }
}

fn is_printable(buf: &[u8]) -> bool {
    if buf.is_empty() {
        return false;
    }
    buf.iter().enumerate().all(|(i, &b)| {
        (b == 0 && i == buf.len() - 1)
            || b.is_ascii_graphic()
            || b == b' '
            || b == b'\n'
            || b == b'\r'
            || b == b'\t'
    })
}

fn trim_nul(buf: &[u8]) -> &[u8] {
    match buf.last() {
        Some(0) => &buf[..buf.len() - 1],
        _ => buf,
    }
}

fn hexdump(buf: &[u8]) {
    for (i, b) in buf.iter().enumerate() {
        print!("{b:02X} ");
        if (i + 1) % 16 == 0 {
            println!();
        }
    }
    if buf.len() % 16 != 0 {
        println!();
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let region = attach();

    match args[1].as_str() {
        "list" => do_list(&region),
        "info" => {
            if args.len() < 3 {
                usage();
            }
            do_info(&region, &args[2]);
        }
        "tail" => {
            if args.len() < 3 {
                usage();
            }
            do_tail(region, &args[2]);
        }
        "health" => {
            if args.len() < 3 {
                usage();
            }
            do_health(&region, &args[2]);
        }
        _ => usage(),
    }
}
