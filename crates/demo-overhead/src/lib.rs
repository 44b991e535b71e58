//! Runnable examples for `probekit`. See `examples/`.
