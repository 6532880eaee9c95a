use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Mutex;

/// Shared random source behind a mutex. Paper sampling, option shuffling,
/// token and passcode generation all draw from one of these; seeding it in
/// tests pins the whole sequence.
pub struct SharedRng {
    inner: Mutex<StdRng>,
}

impl SharedRng {
    pub fn from_entropy() -> Self {
        Self {
            inner: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut guard = self.inner.lock().expect("rng mutex poisoned");
        f(&mut guard)
    }
}
