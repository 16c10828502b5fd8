use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Random reference string for invoices and similar human-facing records.
pub fn generate_reference(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
