#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use registrar_core::{Buckets, MetricDescriptor, MetricsRegistry};

const L: [(&str, &str); 1] = [("route", "/api")];

fn scraped_value(text: &str) -> u64 {
    text.lines()
        .find_map(|l| l.strip_prefix("hits_total{route=\"/api\"} "))
        .map(|v| v.parse().unwrap())
        .unwrap_or(0)
}

#[test]
fn scrape_never_loses_completed_increments() {
    let reg = Arc::new(MetricsRegistry::new());
    let counter = reg
        .register_counter(MetricDescriptor::new("hits_total", "hits", &["route"]).unwrap())
        .unwrap();
    let completed = Arc::new(AtomicU64::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let scraper = {
        let reg = reg.clone();
        let completed = completed.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut scrapes = 0u32;
            while !stop.load(Ordering::SeqCst) || scrapes == 0 {
                let before = completed.load(Ordering::SeqCst);
                let seen = scraped_value(&reg.collect().unwrap());
                assert!(seen >= before, "scrape saw {seen}, {before} already done");
                scrapes += 1;
            }
        })
    };

    let workers: Vec<_> = (0..10)
        .map(|_| {
            let counter = counter.clone();
            let completed = completed.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    counter.inc(&L).unwrap();
                    completed.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    scraper.join().unwrap();

    assert_eq!(counter.get(&L).unwrap(), Some(1000));
    assert_eq!(scraped_value(&reg.collect().unwrap()), 1000);
}

#[test]
fn concurrent_observations_keep_cells_consistent() {
    let reg = MetricsRegistry::new();
    let hist = reg
        .register_histogram(
            MetricDescriptor::new("lat_seconds", "latency", &["route"]).unwrap(),
            Buckets::http_duration(),
        )
        .unwrap();

    thread::scope(|s| {
        for t in 0..8 {
            let hist = &hist;
            s.spawn(move || {
                for i in 0..250 {
                    hist.observe(&L, ((t * 250 + i) % 20) as f64 * 0.5).unwrap();
                }
            });
        }
        s.spawn(|| {
            for _ in 0..50 {
                if let Some(snap) = hist.snapshot(&L).unwrap() {
                    let last = snap.buckets.last().map(|b| b.1).unwrap_or(0);
                    assert!(last <= snap.count);
                }
            }
        });
    });

    let snap = hist.snapshot(&L).unwrap().unwrap();
    assert_eq!(snap.count, 2000);
    assert_eq!(snap.inf_count(), 2000);
}
