use std::sync::LazyLock;

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("conduit-relations"));

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.server.requests")
        .with_description("Total HTTP requests served")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.server.duration")
        .with_description("HTTP request latency")
        .with_unit("ms")
        .build()
});

pub static RELATION_CHANGES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("relation.changes")
        .with_description("Committed relation changes that added or removed a link")
        .build()
});

pub static RELATION_FAILURES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("relation.failures")
        .with_description("Relation changes rolled back or never started")
        .build()
});

pub static RELATION_TX_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("relation.transaction.duration")
        .with_description("Time from begin to commit or rollback of a relation change")
        .with_unit("ms")
        .build()
});
