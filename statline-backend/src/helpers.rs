use rand::distr::{Alphanumeric, SampleString};
use rand::rng;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn generate_report_key() -> String {
    format!("statline-sk-{}", Alphanumeric.sample_string(&mut rng(), 32))
}

pub fn hash_report_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}
